//! Top-word reports.
//!
//! ```text
//! \t[0:0: 812] market price trade
//! \t\t[0:0:0: 401] stock share index
//! \t\t[0:0:1: 411] oil barrel crude
//! ```
//!
//! Every non-root node gets a line indented by its level, carrying the mass
//! of the parent topic that routes to it. Leaves add one line per topic.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::corpus::Vocabulary;
use crate::dirmult::DirMult;
use crate::error::{Error, Result};
use crate::inducer::RecursiveLda;
use crate::sampler::TopicSampler;
use crate::tree::TopicTree;

/// Write the indented report for `tree` using `vocabulary` for word names.
pub fn write_tree_report<W: Write>(
    tree: &TopicTree,
    vocabulary: &Vocabulary,
    top_n: usize,
    out: &mut W,
) -> Result<()> {
    if let Some(dim) = tree.root().topics.first().map(DirMult::dimension) {
        if vocabulary.len() < dim {
            return Err(Error::InvalidParameter {
                name: "vocabulary",
                message: format!("{} words for a vocabulary size of {dim}", vocabulary.len()),
            });
        }
    }

    for id in tree.depth_first() {
        let node = tree.node(id);
        let path = tree.path_string(id);
        if let Some(parent) = node.parent {
            let indent = "\t".repeat(node.level);
            match tree.node(parent).topic(node.index) {
                Some(topic) => writeln!(
                    out,
                    "{indent}[{path}: {}] {}",
                    topic.count_sum(),
                    words(topic, vocabulary, top_n)
                )?,
                None => writeln!(out, "{indent}[{path}: 0]")?,
            }
        }
        if node.is_leaf() {
            let indent = "\t".repeat(node.level + 1);
            for (k, topic) in node.topics.iter().enumerate() {
                writeln!(
                    out,
                    "{indent}[{path}:{k}:{}] {}",
                    topic.count_sum(),
                    words(topic, vocabulary, top_n)
                )?;
            }
        }
    }
    Ok(())
}

fn words(topic: &DirMult, vocabulary: &Vocabulary, top_n: usize) -> String {
    topic
        .top_words(top_n)
        .into_iter()
        .map(|w| vocabulary.word(w).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<S: TopicSampler> RecursiveLda<S> {
    /// Write the top-words report of the trained tree to `out`.
    pub fn write_top_words<W: Write>(&self, out: &mut W, top_n: usize) -> Result<()> {
        let (tree, vocabulary) = self.report_inputs()?;
        write_tree_report(tree, vocabulary, top_n, out)
    }

    /// Write the top-words report to a file.
    ///
    /// An existing file is replaced only once the whole report is written.
    pub fn write_top_words_report(&self, path: impl AsRef<Path>, top_n: usize) -> Result<()> {
        let path = path.as_ref();
        let (tree, vocabulary) = self.report_inputs()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file());
            write_tree_report(tree, vocabulary, top_n, &mut out)?;
            out.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        info!(path = %path.display(), top_n, "wrote top words");
        Ok(())
    }

    fn report_inputs(&self) -> Result<(&TopicTree, &Vocabulary)> {
        let vocabulary = self.vocabulary().ok_or(Error::MissingVocabulary)?;
        if !self.is_trained() {
            return Err(Error::NotReady("no trained tree to report"));
        }
        Ok((self.tree()?, vocabulary))
    }
}
