//! Per-token topic paths.
//!
//! [`AssignmentStore`] holds the topic chosen for every token at every level,
//! indexed `[level][document][token]`. Entries for tokens a level never saw
//! stay zero.
//!
//! # Text form
//!
//! ```text
//! 0            level header
//! 0            document 0
//! 1\t0\t1      one topic per token
//! 1            document 1
//!              empty document
//! 1            next level ...
//! ```

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::persist::LineCursor;
use crate::tree::TokenMask;

/// Topic indices by level, document and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentStore {
    levels: Vec<Vec<Vec<usize>>>,
}

impl AssignmentStore {
    /// Zero-filled store for `depth` levels over documents of the given lengths.
    pub fn new(depth: usize, doc_lengths: &[usize]) -> Self {
        let level: Vec<Vec<usize>> = doc_lengths.iter().map(|&n| vec![0; n]).collect();
        Self {
            levels: vec![level; depth],
        }
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Number of documents.
    pub fn num_docs(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Topic of token `n` in document `d` at `level`.
    pub fn get(&self, level: usize, d: usize, n: usize) -> usize {
        self.levels[level][d][n]
    }

    /// Record the topic of token `n` in document `d` at `level`.
    pub fn set(&mut self, level: usize, d: usize, n: usize, topic: usize) {
        self.levels[level][d][n] = topic;
    }

    /// Topics of one document at one level.
    pub fn level_doc(&self, level: usize, d: usize) -> &[usize] {
        &self.levels[level][d]
    }

    /// Topics of token `n` in document `d`, one per level.
    pub fn path(&self, d: usize, n: usize) -> Vec<usize> {
        self.levels.iter().map(|level| level[d][n]).collect()
    }

    /// Copy `labels` into `level` wherever `mask` is valid.
    pub fn record(&mut self, level: usize, mask: &TokenMask, labels: &[Vec<usize>]) {
        for (d, n) in mask.valid_positions() {
            self.levels[level][d][n] = labels[d][n];
        }
    }

    /// Tokens whose topics at levels `0..prefix.len()` equal `prefix`.
    ///
    /// For a node with path `0:a:b` the prefix is `[a, b]`.
    pub fn mask_for(&self, prefix: &[usize]) -> TokenMask {
        let docs = self.num_docs();
        let rows = (0..docs)
            .map(|d| {
                let len = self.levels.first().map_or(0, |l| l[d].len());
                (0..len)
                    .map(|n| {
                        prefix
                            .iter()
                            .enumerate()
                            .all(|(level, &k)| self.levels[level][d][n] == k)
                    })
                    .collect()
            })
            .collect();
        TokenMask::from_rows(rows)
    }

    /// Render the text form.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (l, level) in self.levels.iter().enumerate() {
            let _ = writeln!(out, "{l}");
            for (d, doc) in level.iter().enumerate() {
                let _ = writeln!(out, "{d}");
                let topics: Vec<String> = doc.iter().map(|z| z.to_string()).collect();
                let _ = writeln!(out, "{}", topics.join("\t"));
            }
        }
        out
    }

    /// Parse the text form against the corpus it was recorded for.
    ///
    /// `first_line` is the 1-based line number of `lines[0]`, used in errors.
    /// Every level must be present, documents must appear in order, and each
    /// token list must match its document's length exactly.
    pub fn parse(
        lines: &[String],
        first_line: usize,
        depth: usize,
        doc_lengths: &[usize],
    ) -> Result<Self> {
        let mut store = Self::new(depth, doc_lengths);
        let mut cursor = LineCursor::new(lines, first_line);
        let number = |line_no: usize, raw: &str, what: &str| -> Result<usize> {
            raw.trim()
                .parse()
                .map_err(|_| Error::malformed(line_no, format!("expected {what}, found '{raw}'")))
        };

        for level in 0..depth {
            let (line_no, raw) = cursor.next("level header")?;
            let found = number(line_no, raw, "level header")?;
            if found != level {
                return Err(Error::malformed(
                    line_no,
                    format!("expected level {level}, found {found}"),
                ));
            }
            for (d, &expected) in doc_lengths.iter().enumerate() {
                let (line_no, raw) = cursor.next("document header")?;
                let found = number(line_no, raw, "document index")?;
                if found != d {
                    return Err(Error::DocumentMismatch {
                        level,
                        expected: d,
                        found,
                    });
                }
                let (line_no, raw) = cursor.next("token topics")?;
                let raw = raw.trim();
                let topics: Vec<&str> = if raw.is_empty() {
                    Vec::new()
                } else {
                    raw.split('\t').collect()
                };
                if topics.len() != expected {
                    return Err(Error::TokenCountMismatch {
                        level,
                        document: d,
                        expected,
                        found: topics.len(),
                    });
                }
                for (n, t) in topics.iter().enumerate() {
                    store.levels[level][d][n] = number(line_no, t, "topic index")?;
                }
            }
        }
        if cursor.remaining() > 0 {
            return Err(Error::malformed(
                cursor.line_no(),
                format!("{} unexpected lines after the last level", cursor.remaining()),
            ));
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn sample_store() -> AssignmentStore {
        let mut store = AssignmentStore::new(2, &[3, 0, 2]);
        store.set(0, 0, 0, 1);
        store.set(0, 0, 2, 1);
        store.set(0, 2, 1, 1);
        store.set(1, 0, 1, 2);
        store.set(1, 2, 0, 1);
        store
    }

    #[test]
    fn test_text_parses_back() {
        let store = sample_store();
        let text = store.to_text();
        assert!(text.starts_with("0\n0\n1\t0\t1\n1\n\n2\n"));
        let back = AssignmentStore::parse(&lines(&text), 1, 2, &[3, 0, 2]).unwrap();
        assert_eq!(back, store);
        assert_eq!(back.path(0, 1), vec![0, 2]);
    }

    #[test]
    fn test_token_count_mismatch_is_fatal() {
        let text = "0\n0\n1\t0\n1\n\n";
        let err = AssignmentStore::parse(&lines(text), 1, 1, &[3, 0]).unwrap_err();
        assert!(matches!(
            err,
            Error::TokenCountMismatch {
                level: 0,
                document: 0,
                expected: 3,
                found: 2
            }
        ));

        // a padded list is rejected just the same
        let text = "0\n0\n1\t0\t0\t1\n1\n\n";
        assert!(matches!(
            AssignmentStore::parse(&lines(text), 1, 1, &[3, 0]),
            Err(Error::TokenCountMismatch { found: 4, .. })
        ));
    }

    #[test]
    fn test_document_mismatch_is_fatal() {
        let text = "0\n1\n\n";
        let err = AssignmentStore::parse(&lines(text), 1, 1, &[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DocumentMismatch {
                expected: 0,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_level_and_trailing_lines() {
        let store = sample_store();
        let text = store.to_text();
        let all = lines(&text);
        let half = &all[..all.len() / 2];
        assert!(matches!(
            AssignmentStore::parse(half, 1, 2, &[3, 0, 2]),
            Err(Error::Malformed { .. })
        ));
        let mut extra = all.clone();
        extra.push("7".into());
        assert!(matches!(
            AssignmentStore::parse(&extra, 10, 2, &[3, 0, 2]),
            Err(Error::Malformed { line: 24, .. })
        ));
    }

    #[test]
    fn test_mask_for_prefix() {
        let store = sample_store();
        let m = store.mask_for(&[1]);
        assert_eq!(m.count(), 3);
        let m = store.mask_for(&[1, 0]);
        assert_eq!(m.valid_positions().collect::<Vec<_>>(), vec![(0, 0), (0, 2), (2, 1)]);
        let m = store.mask_for(&[0, 2]);
        assert_eq!(m.valid_positions().collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(store.mask_for(&[]).count(), 5);
    }
}
