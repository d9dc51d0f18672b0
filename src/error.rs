/// Result alias for `rtopic`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by induction, persistence and reporting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A per-level array does not have one entry per tree level.
    #[error("{name} has {found} entries but the tree has {expected} levels")]
    LevelMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Declared depth.
        expected: usize,
        /// Array length found.
        found: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// An operation was called before the state it needs exists.
    #[error("model is not ready: {0}")]
    NotReady(&'static str),

    /// Seeded assignments or prior topics have the wrong shape.
    #[error("seed shape mismatch: {0}")]
    SeedShape(String),

    /// A document header in the assignments does not match its position.
    #[error("document index mismatch at level {level}: expected {expected}, found {found}")]
    DocumentMismatch {
        /// Level being read.
        level: usize,
        /// Sequential index expected.
        expected: usize,
        /// Index found in the input.
        found: usize,
    },

    /// A token list does not have one entry per token of its document.
    #[error(
        "token count mismatch in document {document} at level {level}: expected {expected}, found {found}"
    )]
    TokenCountMismatch {
        /// Level being read.
        level: usize,
        /// Document index.
        document: usize,
        /// Tokens in the corpus document.
        expected: usize,
        /// Entries found in the input.
        found: usize,
    },

    /// A recorded topic index has no matching child node.
    #[error(
        "topic {topic} out of range at level {level} (document {document}, token {token}): {available} branches"
    )]
    TopicOutOfRange {
        /// Level of the offending entry.
        level: usize,
        /// Document index.
        document: usize,
        /// Token position.
        token: usize,
        /// Recorded topic index.
        topic: usize,
        /// Number of branches at that point.
        available: usize,
    },

    /// A word id does not fit the vocabulary.
    #[error(
        "word id {word} in document {document} out of range for vocabulary of size {vocab_size}"
    )]
    WordOutOfRange {
        /// Document index.
        document: usize,
        /// Offending word id.
        word: usize,
        /// Vocabulary size.
        vocab_size: usize,
    },

    /// A selected document index does not exist in the corpus.
    #[error("document index {index} out of range for corpus of {size} documents")]
    DocumentOutOfRange {
        /// Requested index.
        index: usize,
        /// Corpus size.
        size: usize,
    },

    /// A persisted file could not be parsed.
    #[error("malformed input at line {line}: {message}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The model section disagrees with the assignments section.
    #[error(
        "node {path} topic {topic}: model holds {found} for {what}, assignments give {expected}"
    )]
    CountMismatch {
        /// Path string of the node.
        path: String,
        /// Topic index at that node.
        topic: usize,
        /// What was counted: total mass or a word id.
        what: String,
        /// Count derived from the assignments.
        expected: u64,
        /// Count stored in the model section.
        found: u64,
    },

    /// The archive was written for a different configuration.
    #[error("archive '{archived}' does not match configured model '{configured}'")]
    NameMismatch {
        /// Name stored in the archive.
        archived: String,
        /// Name derived from the configuration.
        configured: String,
    },

    /// A required archive section is absent.
    #[error("archive section '{0}' is missing")]
    MissingSection(&'static str),

    /// A report was requested without a vocabulary.
    #[error("the word vocabulary has not been assigned")]
    MissingVocabulary,

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Error::Malformed {
            line,
            message: message.into(),
        }
    }

    /// True for errors raised while validating persisted or supplied data.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::DocumentMismatch { .. }
                | Error::TokenCountMismatch { .. }
                | Error::TopicOutOfRange { .. }
                | Error::Malformed { .. }
                | Error::MissingSection(_)
                | Error::CountMismatch { .. }
                | Error::NameMismatch { .. }
                | Error::WordOutOfRange { .. }
                | Error::DocumentOutOfRange { .. }
                | Error::SeedShape(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_indices() {
        let e = Error::TokenCountMismatch {
            level: 1,
            document: 4,
            expected: 7,
            found: 6,
        };
        let s = e.to_string();
        assert!(s.contains("document 4"));
        assert!(s.contains("level 1"));
        assert!(s.contains("expected 7"));
        assert!(s.contains("found 6"));
        assert!(e.is_integrity());
    }

    #[test]
    fn test_config_errors_are_not_integrity() {
        let e = Error::LevelMismatch {
            name: "alphas",
            expected: 2,
            found: 3,
        };
        assert!(!e.is_integrity());
        assert_eq!(e.to_string(), "alphas has 3 entries but the tree has 2 levels");
    }

    #[test]
    fn test_input_errors_are_integrity() {
        assert!(Error::WordOutOfRange {
            document: 0,
            word: 9,
            vocab_size: 4
        }
        .is_integrity());
        assert!(Error::DocumentOutOfRange { index: 5, size: 2 }.is_integrity());
        assert!(Error::SeedShape("2 rows for 3 topics".into()).is_integrity());
        assert!(!Error::MissingVocabulary.is_integrity());
        assert!(!Error::NotReady("x").is_integrity());
    }
}
