//! Sampler traits.

use crate::config::InitialState;
use crate::corpus::Corpus;
use crate::dirmult::DirMult;
use crate::error::{Error, Result};
use crate::tree::TokenMask;

/// Everything one node's sampler needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerParams {
    /// Level of the node being trained.
    pub level: usize,
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Number of topics at this node.
    pub topic_count: usize,
    /// Topic-choice concentration.
    pub alpha: f64,
    /// Word-emission concentration.
    pub beta: f64,
    /// Initialization policy.
    pub init: InitialState,
    /// Hyperparameter optimization flag.
    pub optimize: bool,
    /// Sweeps before samples are counted.
    pub burn_in: usize,
    /// Total sweeps.
    pub max_iter: usize,
    /// Sweeps between counted samples.
    pub lag: usize,
    /// Sweeps between progress reports; 0 disables them.
    pub report_interval: usize,
    /// Seed for this node's random stream.
    pub seed: u64,
}

/// Output of one trained node.
#[derive(Debug, Clone)]
pub struct SampledLevel {
    /// Topic per (document, token). Only meaningful where the mask is valid.
    pub labels: Vec<Vec<usize>>,
    /// One word distribution per topic.
    pub topics: Vec<DirMult>,
}

/// A single-level topic model trained over the tokens a mask lets through.
pub trait TopicSampler: Sync {
    /// Train over the valid tokens of `corpus`.
    ///
    /// `prior_topics`, when given, has one row of `vocab_size` weights per
    /// topic and seeds both the word prior and `Preset` initialization.
    fn sample(
        &self,
        corpus: &Corpus,
        mask: &TokenMask,
        params: &SamplerParams,
        prior_topics: Option<&[Vec<f64>]>,
    ) -> Result<SampledLevel>;

    /// Untrained topics carrying this level's priors.
    fn empty_topics(
        &self,
        params: &SamplerParams,
        prior_topics: Option<&[Vec<f64>]>,
    ) -> Result<Vec<DirMult>> {
        let concentration = params.beta * params.vocab_size as f64;
        match prior_topics {
            None => Ok(vec![
                DirMult::uniform(params.vocab_size, concentration);
                params.topic_count
            ]),
            Some(rows) => {
                check_prior_shape(rows, params)?;
                Ok(rows
                    .iter()
                    .map(|row| DirMult::with_center(concentration, row))
                    .collect())
            }
        }
    }

    /// Topics counted directly from fixed labels, without sampling.
    fn count_topics(
        &self,
        corpus: &Corpus,
        mask: &TokenMask,
        labels: &[Vec<usize>],
        params: &SamplerParams,
        prior_topics: Option<&[Vec<f64>]>,
    ) -> Result<Vec<DirMult>> {
        let mut topics = self.empty_topics(params, prior_topics)?;
        for (d, n) in mask.valid_positions() {
            topics[labels[d][n]].increment(corpus.doc(d)[n]);
        }
        Ok(topics)
    }
}

pub(crate) fn check_prior_shape(rows: &[Vec<f64>], params: &SamplerParams) -> Result<()> {
    if rows.len() != params.topic_count {
        return Err(Error::SeedShape(format!(
            "{} prior topics for {} topics",
            rows.len(),
            params.topic_count
        )));
    }
    if let Some((k, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != params.vocab_size)
    {
        return Err(Error::SeedShape(format!(
            "prior topic {k} has {} weights for vocabulary of {}",
            row.len(),
            params.vocab_size
        )));
    }
    Ok(())
}
