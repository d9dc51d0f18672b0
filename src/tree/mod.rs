//! The topic hierarchy.
//!
//! ```text
//! Level 0:              [0]            K[0] topics
//!                     /  |  \
//! Level 1:      [0:0] [0:1] [0:2]      K[1] topics each
//!               / \    / \    / \
//! Level 2:    ...  leaves: topics, no children
//! ```
//!
//! Nodes live in an arena ([`TopicTree`]) and refer to each other by
//! [`NodeId`]. A node's [`TokenMask`] says which tokens it sees; its
//! children's masks partition it by the node's own topic labels.

mod mask;
mod node;
#[allow(clippy::module_inception)]
mod tree;
mod validate;

pub use mask::TokenMask;
pub use node::{NodeId, TopicNode};
pub use tree::TopicTree;
pub use validate::{
    HealthCheck, HealthReport, Severity, ValidationIssue, ValidationReport,
};
