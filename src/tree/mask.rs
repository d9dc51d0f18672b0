//! Per-token validity masks.

/// A boolean per (document, token): is the token routed through a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMask {
    rows: Vec<Vec<bool>>,
}

impl TokenMask {
    /// Every token valid. This is the root's mask.
    pub fn full(doc_lengths: &[usize]) -> Self {
        Self {
            rows: doc_lengths.iter().map(|&n| vec![true; n]).collect(),
        }
    }

    /// No token valid.
    pub fn empty(doc_lengths: &[usize]) -> Self {
        Self {
            rows: doc_lengths.iter().map(|&n| vec![false; n]).collect(),
        }
    }

    /// Build from explicit rows.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Self {
        Self { rows }
    }

    /// Check whether token `n` of document `d` is valid.
    pub fn is_valid(&self, d: usize, n: usize) -> bool {
        self.rows[d][n]
    }

    /// Validity flags of one document.
    pub fn row(&self, d: usize) -> &[bool] {
        &self.rows[d]
    }

    /// Number of documents covered.
    pub fn num_docs(&self) -> usize {
        self.rows.len()
    }

    /// Number of valid tokens.
    pub fn count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|&&v| v).count())
            .sum()
    }

    /// Iterate over `(document, token)` positions that are valid.
    pub fn valid_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(d, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v)
                .map(move |(n, _)| (d, n))
        })
    }

    /// Mask of the child that receives topic `k`: valid here and labeled `k`.
    pub fn split(&self, labels: &[Vec<usize>], k: usize) -> TokenMask {
        let rows = self
            .rows
            .iter()
            .zip(labels)
            .map(|(row, doc_labels)| {
                row.iter()
                    .zip(doc_labels)
                    .map(|(&valid, &z)| valid && z == k)
                    .collect()
            })
            .collect();
        TokenMask { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_and_empty() {
        let full = TokenMask::full(&[3, 0, 2]);
        assert_eq!(full.count(), 5);
        assert_eq!(full.num_docs(), 3);
        assert!(full.row(1).is_empty());
        assert_eq!(TokenMask::empty(&[3, 0, 2]).count(), 0);
    }

    #[test]
    fn test_split_partitions_valid_tokens() {
        let mask = TokenMask::from_rows(vec![vec![true, false, true], vec![true]]);
        let labels = vec![vec![0, 1, 1], vec![1]];
        let zero = mask.split(&labels, 0);
        let one = mask.split(&labels, 1);
        assert_eq!(zero.count() + one.count(), mask.count());
        assert!(zero.is_valid(0, 0));
        // invalid at the parent stays invalid even though labeled 1
        assert!(!one.is_valid(0, 1));
        assert_eq!(
            one.valid_positions().collect::<Vec<_>>(),
            vec![(0, 2), (1, 0)]
        );
    }
}
