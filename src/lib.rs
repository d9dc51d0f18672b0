//! # rtopic
//!
//! Recursive topic hierarchies: an LDA at the root splits the corpus into
//! topics, and every topic is modeled again by a child LDA trained only on the
//! tokens it received, down to a fixed depth.
//!
//! The sampler is pluggable through [`sampler::TopicSampler`]; the collapsed
//! Gibbs [`sampler::GibbsLda`] is the default. Enable the `parallel` feature to
//! sample all nodes of a level concurrently.

/// Per-token topic paths.
pub mod assignments;
pub mod config;
pub mod corpus;
pub mod dirmult;
/// Error types used across `rtopic`.
pub mod error;
pub mod inducer;
pub mod persist;
pub mod report;
pub mod sampler;
pub mod tree;


pub use assignments::AssignmentStore;
pub use config::{InitialState, RecursiveConfig};
pub use corpus::{read_document_subset, Corpus, Vocabulary};
pub use dirmult::DirMult;
pub use error::{Error, Result};
pub use inducer::RecursiveLda;
pub use report::write_tree_report;
pub use tree::{HealthCheck, HealthReport, NodeId, TokenMask, TopicNode, TopicTree};
