//! Tree-level configuration.
//!
//! One [`RecursiveConfig`] describes the whole hierarchy: the branching factor
//! of every level, the per-level Dirichlet concentrations, and the sampler
//! schedule shared by every node. It is built once and handed to
//! [`RecursiveLda::configure`](crate::RecursiveLda::configure).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a node's sampler chooses its starting labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InitialState {
    /// Uniform random topic per token.
    #[default]
    Random,
    /// Deterministic start: argmax of the prior topics, or round-robin.
    Preset,
}

impl fmt::Display for InitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialState::Random => write!(f, "RANDOM"),
            InitialState::Preset => write!(f, "PRESET"),
        }
    }
}

impl core::str::FromStr for InitialState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(InitialState::Random),
            "preset" => Ok(InitialState::Preset),
            other => Err(Error::InvalidParameter {
                name: "init",
                message: format!("initialization '{other}' not supported"),
            }),
        }
    }
}

/// Configuration for a recursive LDA hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecursiveConfig {
    /// Number of children per node at each level. Its length is the tree depth.
    pub ks: Vec<usize>,
    /// Topic-choice concentration per level.
    pub alphas: Vec<f64>,
    /// Word-emission concentration per level.
    pub betas: Vec<f64>,
    /// Initialization policy for every node's sampler.
    #[serde(default)]
    pub init: InitialState,
    /// Hyperparameter optimization flag, passed through to the sampler.
    #[serde(default)]
    pub optimize: bool,
    /// Sweeps before samples are counted.
    pub burn_in: usize,
    /// Total sweeps per node.
    pub max_iter: usize,
    /// Sweeps between counted samples after burn-in.
    pub sample_lag: usize,
    /// Sweeps between progress reports.
    pub report_interval: usize,
    /// Base seed; every node derives its own stream from this and its path.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RecursiveConfig {
    fn default() -> Self {
        Self {
            ks: vec![10, 5],
            alphas: vec![0.1, 0.1],
            betas: vec![0.1, 0.1],
            init: InitialState::Random,
            optimize: false,
            burn_in: 500,
            max_iter: 1000,
            sample_lag: 50,
            report_interval: 25,
            seed: None,
        }
    }
}

impl RecursiveConfig {
    /// Create a configuration with the given branching factors and
    /// default concentrations of 0.1 at every level.
    pub fn new(ks: Vec<usize>) -> Self {
        let depth = ks.len();
        Self {
            ks,
            alphas: vec![0.1; depth],
            betas: vec![0.1; depth],
            ..Self::default()
        }
    }

    /// Set per-level topic-choice concentrations.
    pub fn with_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.alphas = alphas;
        self
    }

    /// Set per-level word-emission concentrations.
    pub fn with_betas(mut self, betas: Vec<f64>) -> Self {
        self.betas = betas;
        self
    }

    /// Set the initialization policy.
    pub fn with_init(mut self, init: InitialState) -> Self {
        self.init = init;
        self
    }

    /// Set the optimization flag.
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Set burn-in, total sweeps and sample lag in one go.
    pub fn with_schedule(mut self, burn_in: usize, max_iter: usize, sample_lag: usize) -> Self {
        self.burn_in = burn_in;
        self.max_iter = max_iter;
        self.sample_lag = sample_lag;
        self
    }

    /// Set the progress report interval.
    pub fn with_report_interval(mut self, report_interval: usize) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Set the base random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of tree levels.
    pub fn depth(&self) -> usize {
        self.ks.len()
    }

    /// Check the configuration against the declared depth and vocabulary size.
    pub fn validate(&self, vocab_size: usize) -> Result<()> {
        let depth = self.depth();
        if depth == 0 {
            return Err(Error::InvalidParameter {
                name: "ks",
                message: "the tree needs at least one level".into(),
            });
        }
        if self.alphas.len() != depth {
            return Err(Error::LevelMismatch {
                name: "alphas",
                expected: depth,
                found: self.alphas.len(),
            });
        }
        if self.betas.len() != depth {
            return Err(Error::LevelMismatch {
                name: "betas",
                expected: depth,
                found: self.betas.len(),
            });
        }
        if let Some(level) = self.ks.iter().position(|&k| k == 0) {
            return Err(Error::InvalidParameter {
                name: "ks",
                message: format!("level {level} has zero topics"),
            });
        }
        for (name, values) in [("alphas", &self.alphas), ("betas", &self.betas)] {
            if let Some((level, v)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| !(v.is_finite() && **v > 0.0))
            {
                return Err(Error::InvalidParameter {
                    name,
                    message: format!("level {level} has non-positive concentration {v}"),
                });
            }
        }
        if vocab_size == 0 {
            return Err(Error::InvalidParameter {
                name: "vocab_size",
                message: "vocabulary is empty".into(),
            });
        }
        if self.sample_lag == 0 {
            return Err(Error::InvalidParameter {
                name: "sample_lag",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Model name derived from every parameter, used as an archive basename.
    pub fn name(&self) -> String {
        let join = |values: &[String]| values.join("-");
        let ks: Vec<String> = self.ks.iter().map(|k| k.to_string()).collect();
        let alphas: Vec<String> = self.alphas.iter().map(|a| a.to_string()).collect();
        let betas: Vec<String> = self.betas.iter().map(|b| b.to_string()).collect();
        format!(
            "{}_RecursiveLDA_K-{}_B-{}_M-{}_L-{}_a-{}_b-{}_opt-{}",
            self.init,
            join(&ks),
            self.burn_in,
            self.max_iter,
            self.sample_lag,
            join(&alphas),
            join(&betas),
            self.optimize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RecursiveConfig::default();
        assert_eq!(config.depth(), 2);
        assert_eq!(config.ks, vec![10, 5]);
        assert!(config.validate(100).is_ok());
    }

    #[test]
    fn test_alpha_length_mismatch() {
        let config = RecursiveConfig::new(vec![2, 2]).with_alphas(vec![0.1]);
        match config.validate(10) {
            Err(Error::LevelMismatch {
                name,
                expected,
                found,
            }) => {
                assert_eq!(name, "alphas");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected LevelMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_beta_length_mismatch() {
        let config = RecursiveConfig::new(vec![2, 2, 2]).with_betas(vec![0.1, 0.1]);
        assert!(matches!(
            config.validate(10),
            Err(Error::LevelMismatch { name: "betas", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_topics_and_bad_concentration() {
        assert!(RecursiveConfig::new(vec![3, 0]).validate(10).is_err());
        assert!(RecursiveConfig::new(vec![]).validate(10).is_err());
        let config = RecursiveConfig::new(vec![2]).with_betas(vec![0.0]);
        assert!(matches!(
            config.validate(10),
            Err(Error::InvalidParameter { name: "betas", .. })
        ));
    }

    #[test]
    fn test_name() {
        let config = RecursiveConfig::new(vec![10, 5]).with_schedule(100, 250, 30);
        assert_eq!(
            config.name(),
            "RANDOM_RecursiveLDA_K-10-5_B-100_M-250_L-30_a-0.1-0.1_b-0.1-0.1_opt-false"
        );
    }

    #[test]
    fn test_init_from_str() {
        assert_eq!("preset".parse::<InitialState>().unwrap(), InitialState::Preset);
        assert_eq!("Random".parse::<InitialState>().unwrap(), InitialState::Random);
        assert!("kmeans".parse::<InitialState>().is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_seed() {
        let config = RecursiveConfig::new(vec![3, 2]).with_seed(9);
        let json = serde_json::to_string(&config).unwrap();
        let back: RecursiveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
