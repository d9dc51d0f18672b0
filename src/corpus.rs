//! Documents, vocabulary and the line-oriented readers that load them.

use std::io::BufRead;

use crate::error::{Error, Result};

/// An ordered set of documents, each an ordered sequence of word ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    docs: Vec<Vec<usize>>,
}

impl Corpus {
    /// Wrap already tokenized documents.
    pub fn new(docs: Vec<Vec<usize>>) -> Self {
        Self { docs }
    }

    /// Read one document per line, as whitespace-separated word ids.
    ///
    /// An empty line is an empty document.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut docs = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let doc = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<usize>().map_err(|_| {
                        Error::malformed(i + 1, format!("'{tok}' is not a word id"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            docs.push(doc);
        }
        Ok(Self { docs })
    }

    /// Keep only `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let size = self.docs.len();
        let docs = indices
            .iter()
            .map(|&index| {
                self.docs
                    .get(index)
                    .cloned()
                    .ok_or(Error::DocumentOutOfRange { index, size })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { docs })
    }

    /// Check that every word id fits a vocabulary of `vocab_size` words.
    pub fn validate(&self, vocab_size: usize) -> Result<()> {
        for (document, doc) in self.docs.iter().enumerate() {
            if let Some(&word) = doc.iter().find(|&&w| w >= vocab_size) {
                return Err(Error::WordOutOfRange {
                    document,
                    word,
                    vocab_size,
                });
            }
        }
        Ok(())
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if there are no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Total number of tokens.
    pub fn num_tokens(&self) -> usize {
        self.docs.iter().map(Vec::len).sum()
    }

    /// Word ids of one document.
    pub fn doc(&self, d: usize) -> &[usize] {
        &self.docs[d]
    }

    /// Token count of every document.
    pub fn doc_lengths(&self) -> Vec<usize> {
        self.docs.iter().map(Vec::len).collect()
    }

    /// Iterate over documents.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.docs.iter().map(Vec::as_slice)
    }
}

/// Word-id to surface-form lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Build from words indexed by id.
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    /// Read one word per line; line `i` is word id `i`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let words = reader
            .lines()
            .map(|line| line.map(|l| l.trim().to_string()))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { words })
    }

    /// Surface form of a word id.
    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Read selected document indices, one per line, rejecting any that do not
/// exist in a corpus of `corpus_len` documents.
pub fn read_document_subset<R: BufRead>(reader: R, corpus_len: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let index: usize = line
            .parse()
            .map_err(|_| Error::malformed(i + 1, format!("'{line}' is not a document index")))?;
        if index >= corpus_len {
            return Err(Error::DocumentOutOfRange {
                index,
                size: corpus_len,
            });
        }
        indices.push(index);
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_from_reader_keeps_empty_docs() {
        let input = "0 1 2\n\n3 3\n";
        let corpus = Corpus::from_reader(input.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.doc(1), &[] as &[usize]);
        assert_eq!(corpus.num_tokens(), 5);
    }

    #[test]
    fn test_corpus_rejects_garbage() {
        let err = Corpus::from_reader("0 x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_select_preserves_order() {
        let corpus = Corpus::new(vec![vec![0], vec![1], vec![2]]);
        let sub = corpus.select(&[2, 0]).unwrap();
        assert_eq!(sub.doc(0), &[2]);
        assert_eq!(sub.doc(1), &[0]);
        assert!(matches!(
            corpus.select(&[3]),
            Err(Error::DocumentOutOfRange { index: 3, size: 3 })
        ));
    }

    #[test]
    fn test_validate_vocab() {
        let corpus = Corpus::new(vec![vec![0, 1], vec![5]]);
        assert!(corpus.validate(6).is_ok());
        assert!(matches!(
            corpus.validate(5),
            Err(Error::WordOutOfRange {
                document: 1,
                word: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_vocabulary_and_subset() {
        let vocab = Vocabulary::from_reader("apple\nbanana\n".as_bytes()).unwrap();
        assert_eq!(vocab.word(1), Some("banana"));
        assert_eq!(vocab.word(2), None);

        let subset = read_document_subset("1\n\n0\n".as_bytes(), 2).unwrap();
        assert_eq!(subset, vec![1, 0]);
        assert!(read_document_subset("2\n".as_bytes(), 2).is_err());
    }
}
