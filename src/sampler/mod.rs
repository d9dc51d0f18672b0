//! Single-level topic samplers.
//!
//! The hierarchy treats one LDA as a unit behind [`TopicSampler`]: hand it a
//! corpus, a [`TokenMask`](crate::tree::TokenMask) and [`SamplerParams`], and
//! it returns a topic label per valid token plus one
//! [`DirMult`](crate::DirMult) per topic. [`GibbsLda`] is the collapsed Gibbs
//! implementation used by default.
//!
//! ## Usage
//!
//! ```rust
//! use rtopic::sampler::{GibbsLda, SamplerParams, TopicSampler};
//! use rtopic::tree::TokenMask;
//! use rtopic::{Corpus, InitialState};
//!
//! let corpus = Corpus::new(vec![vec![0, 1, 1], vec![2, 2, 0]]);
//! let mask = TokenMask::full(&corpus.doc_lengths());
//! let params = SamplerParams {
//!     level: 0,
//!     vocab_size: 3,
//!     topic_count: 2,
//!     alpha: 0.1,
//!     beta: 0.1,
//!     init: InitialState::Random,
//!     optimize: false,
//!     burn_in: 10,
//!     max_iter: 50,
//!     lag: 5,
//!     report_interval: 0,
//!     seed: 7,
//! };
//! let out = GibbsLda.sample(&corpus, &mask, &params, None).unwrap();
//! assert!(out.labels.iter().flatten().all(|&z| z < 2));
//! ```

mod gibbs;
mod traits;

pub use gibbs::GibbsLda;
pub use traits::{SampledLevel, SamplerParams, TopicSampler};
