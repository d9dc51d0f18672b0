//! Collapsed Gibbs sampling for a single masked LDA.
//!
//! Each valid token's topic is resampled from its full conditional:
//!
//! ```text
//! p(z = k | rest) ∝ (n_dk + α) · (n_kw + s·c_kw) / (n_k + s)
//! ```
//!
//! where `n_dk` counts tokens of document `d` on topic `k`, `n_kw` counts word
//! `w` on topic `k`, `s = β·V` is the word-prior mass and `c_k` its center
//! (uniform, or a prior topic row). Tokens outside the mask are neither
//! counted nor resampled.

use ndarray::Array2;
use rand::prelude::*;
use tracing::{debug, trace};

use super::traits::{check_prior_shape, SampledLevel, SamplerParams, TopicSampler};
use crate::config::InitialState;
use crate::corpus::Corpus;
use crate::dirmult::DirMult;
use crate::error::{Error, Result};
use crate::tree::TokenMask;

/// Reference collapsed Gibbs sampler.
#[derive(Debug, Clone, Copy, Default)]
pub struct GibbsLda;

impl GibbsLda {
    /// Create a new sampler.
    pub fn new() -> Self {
        Self
    }

    fn initial_topic(
        params: &SamplerParams,
        prior_topics: Option<&[Vec<f64>]>,
        word: usize,
        position: usize,
        rng: &mut impl Rng,
    ) -> usize {
        let k = params.topic_count;
        match (params.init, prior_topics) {
            (InitialState::Random, _) => rng.random_range(0..k),
            (InitialState::Preset, Some(rows)) => {
                let mut best = 0;
                for (t, row) in rows.iter().enumerate() {
                    if row[word] > rows[best][word] {
                        best = t;
                    }
                }
                best
            }
            (InitialState::Preset, None) => position % k,
        }
    }

    /// Draw an index proportional to `weights`.
    fn draw(weights: &[f64], rng: &mut impl Rng) -> usize {
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return rng.random_range(0..weights.len());
        }
        let mut threshold = rng.random::<f64>() * total;
        for (k, &w) in weights.iter().enumerate() {
            if threshold < w {
                return k;
            }
            threshold -= w;
        }
        weights.len() - 1
    }
}

impl TopicSampler for GibbsLda {
    fn sample(
        &self,
        corpus: &Corpus,
        mask: &TokenMask,
        params: &SamplerParams,
        prior_topics: Option<&[Vec<f64>]>,
    ) -> Result<SampledLevel> {
        let k = params.topic_count;
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "topic_count",
                message: "must be at least 1".into(),
            });
        }
        if mask.num_docs() != corpus.len() {
            return Err(Error::SeedShape(format!(
                "mask covers {} documents, corpus has {}",
                mask.num_docs(),
                corpus.len()
            )));
        }
        if let Some(rows) = prior_topics {
            check_prior_shape(rows, params)?;
        }
        if params.optimize {
            debug!(
                level = params.level,
                "hyperparameter optimization requested; using fixed values"
            );
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut topics = self.empty_topics(params, prior_topics)?;
        let mut doc_topic = Array2::<u32>::zeros((corpus.len(), k));
        let mut labels: Vec<Vec<usize>> = corpus.iter().map(|doc| vec![0; doc.len()]).collect();
        let positions: Vec<(usize, usize)> = mask.valid_positions().collect();

        for &(d, n) in &positions {
            let w = corpus.doc(d)[n];
            let z = Self::initial_topic(params, prior_topics, w, n, &mut rng);
            labels[d][n] = z;
            doc_topic[[d, z]] += 1;
            topics[z].increment(w);
        }

        if positions.is_empty() {
            debug!(level = params.level, "no valid tokens; topics stay empty");
            return Ok(SampledLevel { labels, topics });
        }

        let mut weights = vec![0.0f64; k];
        let mut samples = 0usize;
        for iter in 0..params.max_iter {
            for &(d, n) in &positions {
                let w = corpus.doc(d)[n];
                let old = labels[d][n];
                doc_topic[[d, old]] -= 1;
                topics[old].decrement(w);

                for (t, weight) in weights.iter_mut().enumerate() {
                    *weight = (doc_topic[[d, t]] as f64 + params.alpha) * topics[t].probability(w);
                }
                let new = Self::draw(&weights, &mut rng);

                labels[d][n] = new;
                doc_topic[[d, new]] += 1;
                topics[new].increment(w);
            }

            if iter >= params.burn_in && (iter - params.burn_in) % params.lag.max(1) == 0 {
                samples += 1;
            }
            if params.report_interval > 0 && (iter + 1) % params.report_interval == 0 {
                trace!(
                    level = params.level,
                    iter = iter + 1,
                    max_iter = params.max_iter,
                    log_likelihood = word_log_likelihood(corpus, &positions, &labels, &topics),
                    "gibbs sweep"
                );
            }
        }

        debug!(
            level = params.level,
            tokens = positions.len(),
            sweeps = params.max_iter,
            samples,
            "sampler finished"
        );
        Ok(SampledLevel { labels, topics })
    }
}

/// Sum of `log p(w | z)` over the sampled tokens.
fn word_log_likelihood(
    corpus: &Corpus,
    positions: &[(usize, usize)],
    labels: &[Vec<usize>],
    topics: &[DirMult],
) -> f64 {
    positions
        .iter()
        .map(|&(d, n)| topics[labels[d][n]].probability(corpus.doc(d)[n]).ln())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize, vocab_size: usize) -> SamplerParams {
        SamplerParams {
            level: 0,
            vocab_size,
            topic_count: k,
            alpha: 0.1,
            beta: 0.1,
            init: InitialState::Random,
            optimize: false,
            burn_in: 5,
            max_iter: 20,
            lag: 2,
            report_interval: 5,
            seed: 42,
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            vec![0, 0, 1, 1, 0],
            vec![2, 3, 3, 2],
            vec![],
            vec![0, 1, 2, 3],
        ])
    }

    #[test]
    fn test_labels_in_range_and_counts_match_mask() {
        let corpus = corpus();
        let mask = TokenMask::full(&corpus.doc_lengths());
        let out = GibbsLda.sample(&corpus, &mask, &params(3, 4), None).unwrap();

        assert_eq!(out.topics.len(), 3);
        let mass: u64 = out.topics.iter().map(DirMult::count_sum).sum();
        assert_eq!(mass as usize, corpus.num_tokens());
        for (d, doc) in out.labels.iter().enumerate() {
            assert_eq!(doc.len(), corpus.doc(d).len());
            assert!(doc.iter().all(|&z| z < 3));
        }
    }

    #[test]
    fn test_masked_tokens_are_not_counted() {
        let corpus = corpus();
        let mask = TokenMask::from_rows(vec![
            vec![true, false, false, false, true],
            vec![false; 4],
            vec![],
            vec![true, false, false, false],
        ]);
        let out = GibbsLda.sample(&corpus, &mask, &params(2, 4), None).unwrap();
        let mass: u64 = out.topics.iter().map(DirMult::count_sum).sum();
        assert_eq!(mass, 3);
        // only word 0 was visible
        assert!(out.topics.iter().all(|t| t.count(1) == 0 && t.count(2) == 0));
    }

    #[test]
    fn test_same_seed_same_result() {
        let corpus = corpus();
        let mask = TokenMask::full(&corpus.doc_lengths());
        let a = GibbsLda.sample(&corpus, &mask, &params(2, 4), None).unwrap();
        let b = GibbsLda.sample(&corpus, &mask, &params(2, 4), None).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.topics, b.topics);
    }

    #[test]
    fn test_preset_with_prior_topics() {
        let corpus = corpus();
        let mask = TokenMask::full(&corpus.doc_lengths());
        let mut p = params(2, 4);
        p.init = InitialState::Preset;
        p.max_iter = 0;
        let prior = vec![vec![1.0, 1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0, 1.0]];
        let out = GibbsLda.sample(&corpus, &mask, &p, Some(&prior)).unwrap();
        assert_eq!(out.labels[0], vec![0, 0, 0, 0, 0]);
        assert_eq!(out.labels[1], vec![1, 1, 1, 1]);
        assert_eq!(out.labels[3], vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_bad_prior_shape() {
        let corpus = corpus();
        let mask = TokenMask::full(&corpus.doc_lengths());
        let prior = vec![vec![1.0; 4]];
        let err = GibbsLda
            .sample(&corpus, &mask, &params(2, 4), Some(&prior))
            .unwrap_err();
        assert!(matches!(err, Error::SeedShape(_)));
    }

    #[test]
    fn test_count_topics_from_fixed_labels() {
        let corpus = corpus();
        let mask = TokenMask::full(&corpus.doc_lengths());
        let labels = vec![
            vec![1, 1, 1, 1, 1],
            vec![0, 0, 0, 0],
            vec![],
            vec![1, 0, 1, 0],
        ];
        let topics = GibbsLda
            .count_topics(&corpus, &mask, &labels, &params(2, 4), None)
            .unwrap();
        assert_eq!(topics[0].count_sum(), 6);
        assert_eq!(topics[1].count_sum(), 7);
        assert_eq!(topics[1].count(0), 4);
    }
}
