//! Saving, loading and rebuilding a trained tree.
//!
//! A model is stored as one text archive holding two sections:
//!
//! ```text
//! rtopic-archive 1
//! name <model name>
//! section model <line count>
//! 0                      node path, pre-order
//! <topic line> x K[0]    one distribution per topic
//! 0:0
//! ...
//! section assignments <line count>
//! <assignment store text>
//! ```
//!
//! `load_state` needs both sections. `rebuild_from_assignments` reads only the
//! assignments and recounts every topic from the corpus.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::assignments::AssignmentStore;
use crate::corpus::Corpus;
use crate::dirmult::DirMult;
use crate::error::{Error, Result};
use crate::inducer::RecursiveLda;
use crate::sampler::TopicSampler;
use crate::tree::{NodeId, TopicTree};

const MAGIC: &str = "rtopic-archive";
const VERSION: u32 = 1;
const MODEL: &str = "model";
const ASSIGNMENTS: &str = "assignments";

/// Sequential reader over a slice of lines with 1-based line numbers.
pub(crate) struct LineCursor<'a> {
    lines: &'a [String],
    pos: usize,
    first_line: usize,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(lines: &'a [String], first_line: usize) -> Self {
        Self {
            lines,
            pos: 0,
            first_line,
        }
    }

    /// Next line and its number; running out is a malformed input.
    pub(crate) fn next(&mut self, what: &str) -> Result<(usize, &'a str)> {
        let line_no = self.line_no();
        let line = self.lines.get(self.pos).ok_or_else(|| {
            Error::malformed(line_no, format!("unexpected end of section, expected {what}"))
        })?;
        self.pos += 1;
        Ok((line_no, line.trim_end_matches('\r')))
    }

    pub(crate) fn remaining(&self) -> usize {
        self.lines.len() - self.pos
    }

    /// Number of the line `next` would return.
    pub(crate) fn line_no(&self) -> usize {
        self.first_line + self.pos
    }
}

#[derive(Debug)]
struct Section {
    name: String,
    first_line: usize,
    lines: Vec<String>,
}

#[derive(Debug)]
struct Archive {
    name: String,
    sections: Vec<Section>,
}

impl Archive {
    fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut cursor = LineCursor::new(&lines, 1);

        let (line_no, header) = cursor.next("archive header")?;
        let version = header
            .strip_prefix(MAGIC)
            .map(str::trim)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                Error::malformed(line_no, format!("not an archive header: '{header}'"))
            })?;
        if version != VERSION {
            return Err(Error::malformed(
                line_no,
                format!("unsupported archive version {version}"),
            ));
        }

        let (line_no, raw) = cursor.next("name line")?;
        let name = raw
            .strip_prefix("name ")
            .ok_or_else(|| {
                Error::malformed(line_no, format!("expected name line, found '{raw}'"))
            })?
            .to_string();

        let mut sections = Vec::new();
        while cursor.remaining() > 0 {
            let (line_no, raw) = cursor.next("section header")?;
            let mut parts = raw.split(' ');
            let (Some("section"), Some(name), Some(count), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(Error::malformed(
                    line_no,
                    format!("expected section header, found '{raw}'"),
                ));
            };
            let count: usize = count
                .parse()
                .map_err(|_| Error::malformed(line_no, format!("bad section length '{count}'")))?;
            if count > cursor.remaining() {
                return Err(Error::malformed(
                    line_no,
                    format!(
                        "section '{name}' declares {count} lines, only {} remain",
                        cursor.remaining()
                    ),
                ));
            }
            let first_line = cursor.line_no();
            let mut body = Vec::with_capacity(count);
            for _ in 0..count {
                body.push(cursor.next("section line")?.1.to_string());
            }
            if sections.iter().any(|s: &Section| s.name == name) {
                return Err(Error::malformed(line_no, format!("duplicate section '{name}'")));
            }
            sections.push(Section {
                name: name.to_string(),
                first_line,
                lines: body,
            });
        }
        Ok(Self { name, sections })
    }

    fn section(&self, name: &'static str) -> Result<&Section> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .ok_or(Error::MissingSection(name))
    }

    /// Write atomically: a temp file in the target directory, then rename.
    fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file());
            writeln!(out, "{MAGIC} {VERSION}")?;
            writeln!(out, "name {}", self.name)?;
            for section in &self.sections {
                writeln!(out, "section {} {}", section.name, section.lines.len())?;
                for line in &section.lines {
                    writeln!(out, "{line}")?;
                }
            }
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Model section lines: each node's path, then one line per topic.
fn model_lines(tree: &TopicTree) -> Vec<String> {
    let mut lines = Vec::new();
    for id in tree.depth_first() {
        let node = tree.node(id);
        lines.push(tree.path_string(id));
        lines.extend(node.topics.iter().map(DirMult::to_line));
    }
    lines
}

/// Rebuild the tree described by a model section.
fn parse_model(
    lines: &[String],
    first_line: usize,
    ks: &[usize],
    vocab_size: usize,
) -> Result<TopicTree> {
    let mut tree = TopicTree::new(ks.to_vec());
    let mut by_path: HashMap<String, NodeId> = HashMap::new();
    let mut cursor = LineCursor::new(lines, first_line);

    while cursor.remaining() > 0 {
        let (line_no, raw) = cursor.next("node path")?;
        let path = raw.trim();
        let segments = path
            .split(':')
            .map(|s| s.parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::malformed(line_no, format!("bad node path '{path}'")))?;
        if segments.first() != Some(&0) {
            return Err(Error::malformed(
                line_no,
                format!("path '{path}' does not start at the root"),
            ));
        }
        if by_path.contains_key(path) {
            return Err(Error::malformed(line_no, format!("duplicate node '{path}'")));
        }
        let level = segments.len() - 1;
        if level >= ks.len() {
            return Err(Error::malformed(
                line_no,
                format!(
                    "node '{path}' at level {level} exceeds the deepest level {}",
                    ks.len() - 1
                ),
            ));
        }

        let id = if level == 0 {
            if !by_path.is_empty() {
                return Err(Error::malformed(line_no, "root must be the first node"));
            }
            TopicTree::ROOT
        } else {
            let parent_path = &path[..path.rfind(':').unwrap_or(0)];
            let parent = *by_path.get(parent_path).ok_or_else(|| {
                Error::malformed(line_no, format!("parent of '{path}' has not been read"))
            })?;
            let index = segments[level];
            let branches = ks[level - 1];
            if index >= branches {
                return Err(Error::malformed(
                    line_no,
                    format!("index {index} of '{path}' outside parent's {branches} topics"),
                ));
            }
            let next = tree.node(parent).children.len();
            if index != next {
                return Err(Error::malformed(
                    line_no,
                    format!("'{path}' out of order, expected index {next}"),
                ));
            }
            tree.add_child(parent, None)
        };

        let mut topics = Vec::with_capacity(ks[level]);
        for _ in 0..ks[level] {
            let (line_no, raw) = cursor.next("topic distribution")?;
            let topic = DirMult::parse(raw, line_no)?;
            if topic.dimension() != vocab_size {
                return Err(Error::malformed(
                    line_no,
                    format!(
                        "distribution dimension {} does not match vocabulary size {vocab_size}",
                        topic.dimension()
                    ),
                ));
            }
            topics.push(topic);
        }
        tree.node_mut(id).topics = topics;
        by_path.insert(path.to_string(), id);
    }

    if by_path.is_empty() {
        return Err(Error::malformed(first_line, "model section has no nodes"));
    }
    let end = cursor.line_no();
    for node in tree.iter() {
        if node.level + 1 < ks.len() && node.children.len() != ks[node.level] {
            return Err(Error::malformed(
                end,
                format!(
                    "node '{}' has {} children, expected {}",
                    tree.path_string(node.id),
                    node.children.len(),
                    ks[node.level]
                ),
            ));
        }
    }
    Ok(tree)
}

/// Every recorded topic must exist at its level.
fn check_topic_ranges(store: &AssignmentStore, ks: &[usize]) -> Result<()> {
    for (level, &available) in ks.iter().enumerate() {
        for d in 0..store.num_docs() {
            let topics = store.level_doc(level, d);
            if let Some((token, &topic)) = topics.iter().enumerate().find(|(_, &z)| z >= available)
            {
                return Err(Error::TopicOutOfRange {
                    level,
                    document: d,
                    token,
                    topic,
                    available,
                });
            }
        }
    }
    Ok(())
}

/// Every node's topic counts must equal what its routed tokens and their
/// recorded labels add up to.
fn check_counts(tree: &TopicTree, store: &AssignmentStore, corpus: &Corpus) -> Result<()> {
    for node in tree.iter() {
        let Some(mask) = node.mask.as_ref() else {
            continue;
        };
        let mut expected: Vec<Vec<u32>> = node
            .topics
            .iter()
            .map(|t| vec![0; t.dimension()])
            .collect();
        for (d, n) in mask.valid_positions() {
            let topic = store.get(node.level, d, n);
            expected[topic][corpus.doc(d)[n]] += 1;
        }

        let mismatch = |topic: usize, what: String, expected: u64, found: u64| {
            Error::CountMismatch {
                path: tree.path_string(node.id),
                topic,
                what,
                expected,
                found,
            }
        };
        for (k, (topic, counts)) in node.topics.iter().zip(&expected).enumerate() {
            let mass: u64 = counts.iter().map(|&c| u64::from(c)).sum();
            if topic.count_sum() != mass {
                return Err(mismatch(k, "total mass".into(), mass, topic.count_sum()));
            }
            if let Some((w, &c)) = counts
                .iter()
                .enumerate()
                .find(|&(w, &c)| topic.count(w) != c)
            {
                return Err(mismatch(
                    k,
                    format!("word {w}"),
                    u64::from(c),
                    u64::from(topic.count(w)),
                ));
            }
        }
    }
    Ok(())
}

/// Attach each node's mask from the store.
fn derive_masks(tree: &mut TopicTree, store: &AssignmentStore) {
    for id in 0..tree.len() {
        let path = tree.path_indices(id);
        let mask = store.mask_for(&path[1..]);
        tree.node_mut(id).mask = Some(mask);
    }
}

impl<S: TopicSampler> RecursiveLda<S> {
    /// Write the tree and the assignments to one archive at `path`.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.trained {
            return Err(Error::NotReady("nothing to save before iterate"));
        }
        let tree = self.tree()?;
        let assignments = self.assignments()?;
        let archive = Archive {
            name: self.config()?.name(),
            sections: vec![
                Section {
                    name: MODEL.into(),
                    first_line: 0,
                    lines: model_lines(tree),
                },
                Section {
                    name: ASSIGNMENTS.into(),
                    first_line: 0,
                    lines: assignments.to_text().lines().map(str::to_string).collect(),
                },
            ],
        };
        archive.write(path)?;
        info!(path = %path.display(), nodes = tree.len(), "saved model state");
        Ok(())
    }

    /// Restore the tree and assignments saved by [`save_state`](Self::save_state).
    ///
    /// The model must already be configured and hold the corpus the archive
    /// was trained on. Nothing is replaced unless the whole archive is valid.
    pub fn load_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config = self.config()?;
        let corpus = self.corpus()?;
        let archive = Archive::read(path)?;
        self.check_name(&archive.name)?;

        let model = archive.section(MODEL)?;
        let mut tree = parse_model(&model.lines, model.first_line, &config.ks, self.vocab_size)?;
        let section = archive.section(ASSIGNMENTS)?;
        let store = AssignmentStore::parse(
            &section.lines,
            section.first_line,
            config.depth(),
            &corpus.doc_lengths(),
        )?;
        check_topic_ranges(&store, &config.ks)?;
        derive_masks(&mut tree, &store);
        check_counts(&tree, &store, corpus)?;

        let nodes = tree.len();
        self.install(tree, store)?;
        info!(path = %path.display(), nodes, "loaded model state");
        Ok(())
    }

    /// Rebuild the whole tree from the archive's assignments and the corpus.
    ///
    /// The model section is ignored. Every node of the complete tree is
    /// created, and each topic counts the tokens whose path visits it.
    pub fn rebuild_from_assignments(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config = self.config()?;
        let corpus = self.corpus()?;
        let depth = config.depth();
        let archive = Archive::read(path)?;
        self.check_name(&archive.name)?;

        let section = archive.section(ASSIGNMENTS)?;
        let store = AssignmentStore::parse(
            &section.lines,
            section.first_line,
            depth,
            &corpus.doc_lengths(),
        )?;
        check_topic_ranges(&store, &config.ks)?;

        let mut tree = TopicTree::new(config.ks.clone());
        let mut frontier = vec![TopicTree::ROOT];
        for level in 0..depth {
            let params = self.level_params(level, 0)?;
            let prior = if level == 0 {
                self.prior_topics.as_deref()
            } else {
                None
            };
            let empty = self.sampler.empty_topics(&params, prior)?;
            let mut next = Vec::new();
            for id in frontier {
                tree.node_mut(id).topics = empty.clone();
                if level + 1 < depth {
                    for _ in 0..config.ks[level] {
                        next.push(tree.add_child(id, None));
                    }
                }
            }
            frontier = next;
        }

        for (d, doc) in corpus.iter().enumerate() {
            for (n, &word) in doc.iter().enumerate() {
                let mut current = TopicTree::ROOT;
                for level in 0..depth {
                    let topic = store.get(level, d, n);
                    tree.node_mut(current).topics[topic].increment(word);
                    if level + 1 < depth {
                        // complete tree and checked ranges guarantee the child
                        current = tree.child(current, topic).unwrap_or(current);
                    }
                }
            }
        }
        derive_masks(&mut tree, &store);

        let nodes = tree.len();
        self.install(tree, store)?;
        info!(path = %path.display(), nodes, "rebuilt tree from assignments");
        Ok(())
    }

    fn check_name(&self, archived: &str) -> Result<()> {
        let configured = self.config()?.name();
        if configured != archived {
            return Err(Error::NameMismatch {
                archived: archived.to_string(),
                configured,
            });
        }
        debug!(name = archived, "reading archive");
        Ok(())
    }

    /// Adopt a restored tree once every token path resolves in it.
    fn install(&mut self, tree: TopicTree, store: AssignmentStore) -> Result<()> {
        let previous = (
            self.tree.replace(tree),
            self.assignments.replace(store),
            self.trained,
        );
        self.trained = true;
        if let Err(e) = self.verify_paths() {
            self.tree = previous.0;
            self.assignments = previous.1;
            self.trained = previous.2;
            return Err(e);
        }
        Ok(())
    }
}
