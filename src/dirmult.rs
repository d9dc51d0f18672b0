//! Dirichlet-multinomial word counts.
//!
//! A [`DirMult`] is one topic: integer word counts plus a Dirichlet prior
//! given as a total concentration and a center (the prior mean). With a
//! uniform center, the smoothed probability of word `w` is:
//!
//! ```text
//! p(w) = (n_w + s / V) / (n + s)
//! ```
//!
//! where `s` is the concentration, `n_w` the count of `w`, and `n` the total count.
//!
//! # Text form
//!
//! One line, four tab-separated fields:
//!
//! ```text
//! <dimension> \t <concentration> \t <center> \t <counts>
//! ```
//!
//! `<center>` is `u` for uniform or space-separated weights. `<counts>` is
//! `-` when empty, or space-separated `word:count` pairs for nonzero words.

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Word-count distribution for a single topic.
#[derive(Debug, Clone, PartialEq)]
pub struct DirMult {
    counts: Vec<u32>,
    count_sum: u64,
    concentration: f64,
    center: Option<Vec<f64>>,
}

impl DirMult {
    /// Empty distribution with a uniform prior.
    pub fn uniform(dimension: usize, concentration: f64) -> Self {
        Self {
            counts: vec![0; dimension],
            count_sum: 0,
            concentration,
            center: None,
        }
    }

    /// Empty distribution whose prior mean is `center`, renormalized.
    ///
    /// A center that sums to zero falls back to uniform.
    pub fn with_center(concentration: f64, center: &[f64]) -> Self {
        let total: f64 = center.iter().sum();
        let normalized = if total > 0.0 {
            Some(center.iter().map(|c| c / total).collect())
        } else {
            None
        };
        Self {
            counts: vec![0; center.len()],
            count_sum: 0,
            concentration,
            center: normalized,
        }
    }

    /// Number of words.
    pub fn dimension(&self) -> usize {
        self.counts.len()
    }

    /// Total prior mass.
    pub fn concentration(&self) -> f64 {
        self.concentration
    }

    /// Prior mean of word `w`.
    pub fn center(&self, w: usize) -> f64 {
        match &self.center {
            Some(c) => c[w],
            None => 1.0 / self.counts.len() as f64,
        }
    }

    /// Observed count of word `w`.
    pub fn count(&self, w: usize) -> u32 {
        self.counts[w]
    }

    /// Total observed count.
    pub fn count_sum(&self) -> u64 {
        self.count_sum
    }

    /// Add one observation of word `w`.
    pub fn increment(&mut self, w: usize) {
        self.counts[w] += 1;
        self.count_sum += 1;
    }

    /// Remove one observation of word `w`.
    pub fn decrement(&mut self, w: usize) {
        debug_assert!(self.counts[w] > 0, "decrement of zero count for word {w}");
        self.counts[w] -= 1;
        self.count_sum -= 1;
    }

    /// Smoothed probability of word `w`.
    pub fn probability(&self, w: usize) -> f64 {
        (self.counts[w] as f64 + self.concentration * self.center(w))
            / (self.count_sum as f64 + self.concentration)
    }

    /// Smoothed probabilities of every word.
    pub fn distribution(&self) -> Vec<f64> {
        (0..self.counts.len()).map(|w| self.probability(w)).collect()
    }

    /// Ids of the `n` most probable words, highest first. Ties go to the lower id.
    pub fn top_words(&self, n: usize) -> Vec<usize> {
        let dist = self.distribution();
        let mut ids: Vec<usize> = (0..dist.len()).collect();
        ids.sort_by(|&a, &b| dist[b].total_cmp(&dist[a]).then(a.cmp(&b)));
        ids.truncate(n);
        ids
    }

    /// Single-line text form.
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    pub(crate) fn parse(line: &str, line_no: usize) -> Result<Self> {
        let bad = |msg: String| Error::malformed(line_no, msg);
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != 4 {
            return Err(bad(format!(
                "distribution needs 4 tab-separated fields, found {}",
                fields.len()
            )));
        }
        let dimension: usize = fields[0]
            .parse()
            .map_err(|_| bad(format!("bad dimension '{}'", fields[0])))?;
        let concentration: f64 = fields[1]
            .parse()
            .map_err(|_| bad(format!("bad concentration '{}'", fields[1])))?;

        let center = match fields[2] {
            "u" => None,
            raw => {
                let c = raw
                    .split(' ')
                    .map(|v| v.parse::<f64>().map_err(|_| bad(format!("bad center value '{v}'"))))
                    .collect::<Result<Vec<_>>>()?;
                if c.len() != dimension {
                    return Err(bad(format!(
                        "center has {} values for dimension {dimension}",
                        c.len()
                    )));
                }
                Some(c)
            }
        };

        let mut counts = vec![0u32; dimension];
        let mut count_sum = 0u64;
        if fields[3] != "-" {
            for pair in fields[3].split(' ') {
                let (w, c) = pair
                    .split_once(':')
                    .ok_or_else(|| bad(format!("bad count entry '{pair}'")))?;
                let w: usize = w.parse().map_err(|_| bad(format!("bad word id '{w}'")))?;
                let c: u32 = c.parse().map_err(|_| bad(format!("bad count '{c}'")))?;
                if w >= dimension {
                    return Err(bad(format!("word id {w} exceeds dimension {dimension}")));
                }
                counts[w] += c;
                count_sum += c as u64;
            }
        }

        Ok(Self {
            counts,
            count_sum,
            concentration,
            center,
        })
    }
}

impl fmt::Display for DirMult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t", self.counts.len(), self.concentration)?;
        match &self.center {
            None => write!(f, "u")?,
            Some(c) => {
                let parts: Vec<String> = c.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))?;
            }
        }
        write!(f, "\t")?;
        let pairs: Vec<String> = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(w, c)| format!("{w}:{c}"))
            .collect();
        if pairs.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", pairs.join(" "))
        }
    }
}

impl FromStr for DirMult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_probability() {
        let mut d = DirMult::uniform(4, 4.0);
        d.increment(1);
        d.increment(1);
        d.increment(3);
        assert_eq!(d.count(1), 2);
        assert_eq!(d.count_sum(), 3);
        // (2 + 4 * 0.25) / (3 + 4)
        assert!((d.probability(1) - 3.0 / 7.0).abs() < 1e-12);
        let total: f64 = d.distribution().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);

        d.decrement(1);
        assert_eq!(d.count(1), 1);
        assert_eq!(d.count_sum(), 2);
    }

    #[test]
    fn test_top_words_ties_break_on_id() {
        let mut d = DirMult::uniform(5, 1.0);
        d.increment(3);
        d.increment(3);
        d.increment(4);
        d.increment(1);
        assert_eq!(d.top_words(3), vec![3, 1, 4]);
        assert_eq!(d.top_words(10).len(), 5);
    }

    #[test]
    fn test_text_form_parses_back() {
        let mut d = DirMult::with_center(2.0, &[1.0, 3.0, 0.0]);
        d.increment(0);
        d.increment(1);
        d.increment(1);
        let line = d.to_line();
        let back: DirMult = line.parse().unwrap();
        assert_eq!(back, d);
        assert!((back.center(1) - 0.75).abs() < 1e-12);

        let empty = DirMult::uniform(3, 0.3);
        assert_eq!(empty.to_line(), "3\t0.3\tu\t-");
    }

    #[test]
    fn test_parse_rejects_out_of_range_word() {
        let err = DirMult::parse("3\t0.3\tu\t5:1", 7).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 7, .. }));
        assert!(DirMult::parse("3\t0.3\tu", 1).is_err());
    }
}
