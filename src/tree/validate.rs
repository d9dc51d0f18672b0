//! Tree validation and health checking.
//!
//! Checks that a [`TopicTree`] is a proper rooted tree and that the
//! recursive split kept its guarantees:
//! - every node is reachable from the root exactly once
//! - parent and child links agree, and a child's index is its slot
//! - levels increase by one per edge and never exceed the declared depth
//! - every trained node carries `K[level]` topics
//! - a parent's valid tokens are exactly partitioned among its children
//!
//! # Example
//!
//! ```rust,ignore
//! let report = model.health_check()?;
//! if !report.is_healthy() {
//!     eprintln!("{report}");
//! }
//! ```

use std::collections::HashMap;

use super::{NodeId, TopicTree};

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational, not a problem.
    Info,
    /// Something unusual but not necessarily wrong.
    Warning,
    /// A problem that should be fixed.
    Error,
    /// A critical issue that may cause failures.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single issue found during a health check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Path string of the node involved, if any.
    pub path: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path: None,
        }
    }

    /// Attach the node path.
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (node {path})")?;
        }
        Ok(())
    }
}

/// Issues collected by a health check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Check if the report contains no errors or critical issues.
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// Check if there are any issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Count issues by severity.
    pub fn counts(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "Validation passed: no issues found");
        }
        let counts = self.counts();
        let parts: Vec<String> = [
            (Severity::Critical, "critical"),
            (Severity::Error, "errors"),
            (Severity::Warning, "warnings"),
            (Severity::Info, "info"),
        ]
        .iter()
        .filter_map(|(sev, name)| counts.get(sev).map(|c| format!("{c} {name}")))
        .collect();
        writeln!(f, "Validation report: {}", parts.join(", "))?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Health report with tree statistics.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Validation issues.
    pub validation: ValidationReport,
    /// Total number of nodes.
    pub node_count: usize,
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Deepest level present.
    pub max_level: usize,
    /// Topics that received no tokens.
    pub empty_topics: usize,
}

impl HealthReport {
    /// Check if the tree is healthy (no errors or critical issues).
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl std::fmt::Display for HealthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Topic Tree Health Report")?;
        writeln!(f, "========================")?;
        writeln!(f, "Nodes: {} ({} leaves)", self.node_count, self.leaf_count)?;
        writeln!(f, "Max level: {}", self.max_level)?;
        writeln!(f, "Empty topics: {}", self.empty_topics)?;
        writeln!(f)?;
        write!(f, "{}", self.validation)
    }
}

/// Trait for types that can be health-checked.
pub trait HealthCheck {
    /// Perform a health check and return a report.
    fn health_check(&self) -> HealthReport;

    /// Quick check: returns true if healthy.
    fn is_healthy(&self) -> bool {
        self.health_check().is_healthy()
    }
}

impl HealthCheck for TopicTree {
    fn health_check(&self) -> HealthReport {
        let mut validation = check_structure(self);
        let depth = self.depth();

        for node in self.iter() {
            let path = || self.path_string(node.id);
            if node.level >= depth {
                validation.add(
                    ValidationIssue::new(
                        Severity::Error,
                        format!("level {} beyond declared depth {depth}", node.level),
                    )
                    .at(path()),
                );
                continue;
            }
            let k = self.ks()[node.level];
            if !node.topics.is_empty() && node.topics.len() != k {
                validation.add(
                    ValidationIssue::new(
                        Severity::Error,
                        format!("{} topics, expected {k}", node.topics.len()),
                    )
                    .at(path()),
                );
            }
            if node.level + 1 < depth && node.children.len() != k {
                validation.add(
                    ValidationIssue::new(
                        Severity::Warning,
                        format!("{} children, expected {k}", node.children.len()),
                    )
                    .at(path()),
                );
            }
            if node.level + 1 == depth && !node.children.is_empty() {
                validation.add(
                    ValidationIssue::new(Severity::Error, "deepest level node has children")
                        .at(path()),
                );
            }

            // Mask partition: children split the parent's tokens exactly.
            let child_counts: Option<Vec<usize>> = node
                .children
                .iter()
                .map(|&c| self.node(c).valid_count())
                .collect();
            if let (Some(parent_count), Some(counts)) = (node.valid_count(), child_counts) {
                let sum: usize = counts.iter().sum();
                if !counts.is_empty() && sum != parent_count {
                    let message =
                        format!("children hold {sum} valid tokens, parent holds {parent_count}");
                    validation.add(ValidationIssue::new(Severity::Critical, message).at(path()));
                }
            }
        }

        let leaf_count = self.iter().filter(|n| n.is_leaf()).count();
        let max_level = self.iter().map(|n| n.level).max().unwrap_or(0);
        let empty_topics = self
            .iter()
            .flat_map(|n| n.topics.iter())
            .filter(|t| t.count_sum() == 0)
            .count();

        HealthReport {
            validation,
            node_count: self.len(),
            leaf_count,
            max_level,
            empty_topics,
        }
    }
}

/// Reachability, single-parent and link consistency checks.
fn check_structure(tree: &TopicTree) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut seen = vec![false; tree.len()];
    let mut stack: Vec<NodeId> = vec![TopicTree::ROOT];

    if !tree.root().is_root() {
        report.add(ValidationIssue::new(Severity::Critical, "root has a parent"));
    }

    while let Some(id) = stack.pop() {
        if seen[id] {
            report.add(
                ValidationIssue::new(Severity::Critical, "node reached twice")
                    .at(id.to_string()),
            );
            continue;
        }
        seen[id] = true;
        let node = tree.node(id);
        for (slot, &child_id) in node.children.iter().enumerate() {
            let Some(child) = tree.get(child_id) else {
                report.add(
                    ValidationIssue::new(
                        Severity::Error,
                        format!("child id {child_id} does not exist"),
                    )
                    .at(tree.path_string(id)),
                );
                continue;
            };
            if child.parent != Some(id) {
                report.add(
                    ValidationIssue::new(Severity::Error, "child names another parent")
                        .at(child_id.to_string()),
                );
            }
            if child.index != slot {
                report.add(
                    ValidationIssue::new(
                        Severity::Error,
                        format!("child in slot {slot} has index {}", child.index),
                    )
                    .at(tree.path_string(id)),
                );
            }
            if child.level != node.level + 1 {
                report.add(
                    ValidationIssue::new(
                        Severity::Error,
                        format!("child level {} under level {}", child.level, node.level),
                    )
                    .at(child_id.to_string()),
                );
            }
            stack.push(child_id);
        }
    }

    let orphans: Vec<NodeId> = (0..tree.len()).filter(|&id| !seen[id]).collect();
    if !orphans.is_empty() {
        report.add(ValidationIssue::new(
            Severity::Error,
            format!(
                "{} orphaned nodes not reachable from root, first few: {:?}",
                orphans.len(),
                &orphans[..orphans.len().min(5)]
            ),
        ));
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dirmult::DirMult;
    use crate::tree::TokenMask;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(Severity::Error, "Something wrong").at("0:1");
        let s = issue.to_string();
        assert!(s.contains("ERROR"));
        assert!(s.contains("Something wrong"));
        assert!(s.contains("0:1"));
    }

    #[test]
    fn test_partitioned_tree_is_healthy() {
        let mut tree = TopicTree::new(vec![2, 2]);
        tree.node_mut(TopicTree::ROOT).mask = Some(TokenMask::full(&[3]));
        tree.node_mut(TopicTree::ROOT).topics = vec![DirMult::uniform(4, 0.4); 2];
        let a = tree.add_child(
            TopicTree::ROOT,
            Some(TokenMask::from_rows(vec![vec![true, false, true]])),
        );
        let b = tree.add_child(
            TopicTree::ROOT,
            Some(TokenMask::from_rows(vec![vec![false, true, false]])),
        );
        tree.node_mut(a).topics = vec![DirMult::uniform(4, 0.4); 2];
        tree.node_mut(b).topics = vec![DirMult::uniform(4, 0.4); 2];

        let report = tree.health_check();
        assert!(report.is_healthy(), "{report}");
        assert_eq!(report.leaf_count, 2);
        assert_eq!(report.empty_topics, 6);
    }

    #[test]
    fn test_lost_token_is_critical() {
        let mut tree = TopicTree::new(vec![2, 2]);
        tree.node_mut(TopicTree::ROOT).mask = Some(TokenMask::full(&[2]));
        tree.add_child(TopicTree::ROOT, Some(TokenMask::from_rows(vec![vec![true, false]])));
        tree.add_child(TopicTree::ROOT, Some(TokenMask::empty(&[2])));

        let report = tree.health_check();
        assert!(!report.is_healthy());
        assert!(report
            .validation
            .issues
            .iter()
            .any(|i| i.severity == Severity::Critical && i.message.contains("parent holds 2")));
    }

    #[test]
    fn test_wrong_topic_count_is_error() {
        let mut tree = TopicTree::new(vec![3]);
        tree.node_mut(TopicTree::ROOT).topics = vec![DirMult::uniform(2, 0.2); 2];
        assert!(!tree.is_healthy());
    }
}
