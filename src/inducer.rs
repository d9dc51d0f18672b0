//! Recursive induction of the topic tree.
//!
//! # Algorithm
//!
//! 1. The root sees every token.
//! 2. A node's sampler is trained on the tokens its mask lets through.
//! 3. For every topic `k` of that node, a child is created whose mask keeps
//!    the tokens that were valid at the node and labeled `k`.
//! 4. The chosen topic of every valid token is written to the
//!    [`AssignmentStore`] at the node's level.
//! 5. Nodes at the deepest level keep their topics and get no children.
//!
//! Nodes are processed one level at a time from an explicit worklist. Every
//! node draws from its own random stream, seeded from the base seed and its
//! path, so the result does not depend on processing order. With the
//! `parallel` feature all nodes of a level are sampled concurrently.

use rand::prelude::*;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::assignments::AssignmentStore;
use crate::config::RecursiveConfig;
use crate::corpus::{Corpus, Vocabulary};
use crate::error::{Error, Result};
use crate::sampler::{GibbsLda, SampledLevel, SamplerParams, TopicSampler};
use crate::tree::{HealthCheck, HealthReport, NodeId, TokenMask, TopicNode, TopicTree};

/// A hierarchy of LDAs trained top-down.
///
/// ## Usage
///
/// ```rust
/// use rtopic::{Corpus, RecursiveConfig, RecursiveLda};
///
/// let corpus = Corpus::new(vec![vec![0, 1, 0, 1], vec![2, 3, 2], vec![0, 3]]);
/// let config = RecursiveConfig::new(vec![2, 2]).with_schedule(5, 20, 5).with_seed(1);
///
/// let mut model = RecursiveLda::new();
/// model.configure(4, config).unwrap();
/// model.train(&corpus, None).unwrap();
/// model.initialize().unwrap();
/// model.iterate().unwrap();
///
/// let path = model.assigned_path(0, 0).unwrap();
/// assert_eq!(path.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveLda<S = GibbsLda> {
    pub(crate) sampler: S,
    pub(crate) config: Option<RecursiveConfig>,
    pub(crate) vocab_size: usize,
    pub(crate) corpus: Option<Corpus>,
    pub(crate) doc_indices: Vec<usize>,
    pub(crate) prior_topics: Option<Vec<Vec<f64>>>,
    pub(crate) vocabulary: Option<Vocabulary>,
    pub(crate) tree: Option<TopicTree>,
    pub(crate) assignments: Option<AssignmentStore>,
    pub(crate) trained: bool,
}

impl RecursiveLda<GibbsLda> {
    /// Create a model backed by the collapsed Gibbs sampler.
    pub fn new() -> Self {
        Self::with_sampler(GibbsLda)
    }
}

impl Default for RecursiveLda<GibbsLda> {
    fn default() -> Self {
        Self::new()
    }
}

/// What one node produced in a level pass.
struct NodeOutcome {
    id: NodeId,
    sampled: SampledLevel,
}

impl<S: TopicSampler> RecursiveLda<S> {
    /// Create a model backed by a custom sampler.
    pub fn with_sampler(sampler: S) -> Self {
        Self {
            sampler,
            config: None,
            vocab_size: 0,
            corpus: None,
            doc_indices: Vec::new(),
            prior_topics: None,
            vocabulary: None,
            tree: None,
            assignments: None,
            trained: false,
        }
    }

    /// Set the vocabulary size and tree configuration.
    ///
    /// Fails before any work if the per-level arrays do not match the depth.
    pub fn configure(&mut self, vocab_size: usize, config: RecursiveConfig) -> Result<()> {
        config.validate(vocab_size)?;
        info!(
            ks = ?config.ks,
            vocab_size,
            alphas = ?config.alphas,
            betas = ?config.betas,
            burn_in = config.burn_in,
            max_iter = config.max_iter,
            sample_lag = config.sample_lag,
            init = %config.init,
            optimize = config.optimize,
            "configured recursive lda"
        );
        self.vocab_size = vocab_size;
        self.config = Some(config);
        self.reset();
        Ok(())
    }

    /// Set the training documents, optionally restricted to `subset`.
    ///
    /// The subset keeps its order; document `i` of the model is `subset[i]`
    /// of `corpus`.
    pub fn train(&mut self, corpus: &Corpus, subset: Option<&[usize]>) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::NotReady("configure must be called before train"));
        }
        let (selected, indices) = match subset {
            Some(indices) => (corpus.select(indices)?, indices.to_vec()),
            None => (corpus.clone(), (0..corpus.len()).collect()),
        };
        selected.validate(self.vocab_size)?;
        info!(
            all_docs = corpus.len(),
            selected_docs = selected.len(),
            tokens = selected.num_tokens(),
            "training data set"
        );
        self.corpus = Some(selected);
        self.doc_indices = indices;
        self.reset();
        Ok(())
    }

    /// Prior topics for the root level: `K[0]` rows of `vocab_size` weights.
    pub fn set_prior_topics(&mut self, prior_topics: Vec<Vec<f64>>) {
        self.prior_topics = Some(prior_topics);
    }

    /// Attach the word vocabulary used by reports.
    pub fn set_vocabulary(&mut self, vocabulary: Vocabulary) {
        self.vocabulary = Some(vocabulary);
    }

    /// Create an empty assignment store and a root that sees every token.
    pub fn initialize(&mut self) -> Result<()> {
        let config = self.config()?;
        let corpus = self.corpus()?;
        let lengths = corpus.doc_lengths();
        let assignments = AssignmentStore::new(config.depth(), &lengths);
        let mut tree = TopicTree::new(config.ks.clone());
        tree.node_mut(TopicTree::ROOT).mask = Some(TokenMask::full(&lengths));
        debug!(docs = lengths.len(), levels = config.depth(), "initialized");
        self.assignments = Some(assignments);
        self.tree = Some(tree);
        self.trained = false;
        Ok(())
    }

    /// Build the whole tree by sampling every node.
    ///
    /// Any tree left by an earlier run or by [`load_state`](Self::load_state)
    /// is replaced.
    pub fn iterate(&mut self) -> Result<()> {
        self.induce(None)
    }

    /// Build the tree, adopting `root_labels` as the root's assignments
    /// instead of sampling the root.
    ///
    /// `root_labels` has one topic in `0..K[0]` per token of every document.
    pub fn iterate_seeded(&mut self, root_labels: &[Vec<usize>]) -> Result<()> {
        let config = self.config()?;
        let corpus = self.corpus()?;
        if root_labels.len() != corpus.len() {
            return Err(Error::SeedShape(format!(
                "{} seeded documents for {} documents",
                root_labels.len(),
                corpus.len()
            )));
        }
        let available = config.ks[0];
        for (document, (labels, doc)) in root_labels.iter().zip(corpus.iter()).enumerate() {
            if labels.len() != doc.len() {
                return Err(Error::TokenCountMismatch {
                    level: 0,
                    document,
                    expected: doc.len(),
                    found: labels.len(),
                });
            }
            if let Some((token, &topic)) = labels.iter().enumerate().find(|(_, &z)| z >= available)
            {
                return Err(Error::TopicOutOfRange {
                    level: 0,
                    document,
                    token,
                    topic,
                    available,
                });
            }
        }
        self.induce(Some(root_labels))
    }

    fn induce(&mut self, seeded: Option<&[Vec<usize>]>) -> Result<()> {
        if self.tree.is_none() || self.assignments.is_none() {
            return Err(Error::NotReady("initialize must be called before iterate"));
        }
        // Each run grows the tree from a bare root, so reruns never stack children.
        self.initialize()?;
        let config = self.config()?.clone();
        let depth = config.depth();
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        info!(levels = depth, seed = base_seed, seeded = seeded.is_some(), "iterating");

        let mut frontier = vec![TopicTree::ROOT];
        for level in 0..depth {
            let outcomes = self.sample_level(&frontier, level, base_seed, seeded)?;
            frontier = self.apply_level(outcomes, level);
        }
        self.trained = true;

        let tree = self.tree()?;
        info!(nodes = tree.len(), leaves = tree.leaves().len(), "induction finished");
        Ok(())
    }

    /// Train every node of one level. Reads only; results are applied after.
    fn sample_level(
        &self,
        frontier: &[NodeId],
        level: usize,
        base_seed: u64,
        seeded: Option<&[Vec<usize>]>,
    ) -> Result<Vec<NodeOutcome>> {
        let run = |&id: &NodeId| self.sample_node(id, level, base_seed, seeded);

        #[cfg(feature = "parallel")]
        let outcomes = frontier.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes = frontier.iter().map(run).collect();

        outcomes
    }

    fn sample_node(
        &self,
        id: NodeId,
        level: usize,
        base_seed: u64,
        seeded: Option<&[Vec<usize>]>,
    ) -> Result<NodeOutcome> {
        let tree = self.tree()?;
        let corpus = self.corpus()?;
        let path = tree.path_indices(id);
        let mask = tree
            .node(id)
            .mask
            .as_ref()
            .ok_or(Error::NotReady("node has no validity mask"))?;
        let params = self.level_params(level, node_seed(base_seed, &path))?;
        let prior = if level == 0 {
            self.prior_topics.as_deref()
        } else {
            None
        };
        debug!(
            path = %tree.path_string(id),
            tokens = mask.count(),
            topics = params.topic_count,
            "sampling node"
        );

        let sampled = match seeded {
            Some(labels) if level == 0 => {
                debug!("using seeded root assignments");
                let topics = self
                    .sampler
                    .count_topics(corpus, mask, labels, &params, prior)?;
                SampledLevel {
                    labels: labels.to_vec(),
                    topics,
                }
            }
            _ => self.sampler.sample(corpus, mask, &params, prior)?,
        };
        Ok(NodeOutcome { id, sampled })
    }

    /// Record labels, store topics and create the next level's children.
    fn apply_level(&mut self, outcomes: Vec<NodeOutcome>, level: usize) -> Vec<NodeId> {
        let depth = self.tree.as_ref().map_or(0, TopicTree::depth);
        let (Some(tree), Some(assignments)) = (self.tree.as_mut(), self.assignments.as_mut())
        else {
            return Vec::new();
        };

        let mut next = Vec::new();
        for NodeOutcome { id, sampled } in outcomes {
            let Some(mask) = tree.node_mut(id).mask.take() else {
                continue;
            };
            assignments.record(level, &mask, &sampled.labels);

            if level + 1 < depth {
                for k in 0..sampled.topics.len() {
                    let child_mask = mask.split(&sampled.labels, k);
                    if child_mask.count() == 0 {
                        let parent = tree.path_string(id);
                        debug!(parent = %parent, topic = k, "topic received no tokens");
                    }
                    next.push(tree.add_child(id, Some(child_mask)));
                }
            }

            let node = tree.node_mut(id);
            node.topics = sampled.topics;
            node.mask = Some(mask);
        }
        next
    }

    pub(crate) fn level_params(&self, level: usize, seed: u64) -> Result<SamplerParams> {
        let config = self.config()?;
        Ok(SamplerParams {
            level,
            vocab_size: self.vocab_size,
            topic_count: config.ks[level],
            alpha: config.alphas[level],
            beta: config.betas[level],
            init: config.init,
            optimize: config.optimize,
            burn_in: config.burn_in,
            max_iter: config.max_iter,
            lag: config.sample_lag,
            report_interval: config.report_interval,
            seed,
        })
    }

    /// Nodes a token was routed through, from just below the root to its leaf.
    ///
    /// Fails if the model is untrained, or if a recorded topic has no
    /// matching child.
    pub fn assigned_path(&self, d: usize, n: usize) -> Result<Vec<NodeId>> {
        if !self.trained {
            return Err(Error::NotReady("assignments have not been populated"));
        }
        let tree = self.tree()?;
        let assignments = self.assignments()?;
        if d >= assignments.num_docs() {
            return Err(Error::DocumentOutOfRange {
                index: d,
                size: assignments.num_docs(),
            });
        }
        let doc_len = assignments.level_doc(0, d).len();
        if n >= doc_len {
            return Err(Error::InvalidParameter {
                name: "token",
                message: format!("token {n} out of range for document {d} of length {doc_len}"),
            });
        }

        let mut path = Vec::with_capacity(tree.depth().saturating_sub(1));
        let mut current = TopicTree::ROOT;
        for level in 0..tree.depth().saturating_sub(1) {
            let topic = assignments.get(level, d, n);
            current = tree.child(current, topic).ok_or(Error::TopicOutOfRange {
                level,
                document: d,
                token: n,
                topic,
                available: tree.node(current).children.len(),
            })?;
            path.push(current);
        }
        Ok(path)
    }

    /// Deepest node a token was routed through (the root for a one-level tree).
    pub fn assigned_leaf(&self, d: usize, n: usize) -> Result<NodeId> {
        Ok(self
            .assigned_path(d, n)?
            .last()
            .copied()
            .unwrap_or(TopicTree::ROOT))
    }

    /// Check every token's recorded path against the tree.
    pub(crate) fn verify_paths(&self) -> Result<()> {
        let corpus = self.corpus()?;
        for (d, doc) in corpus.iter().enumerate() {
            for n in 0..doc.len() {
                self.assigned_path(d, n)?;
            }
        }
        Ok(())
    }

    /// Tree configuration.
    pub fn config(&self) -> Result<&RecursiveConfig> {
        self.config
            .as_ref()
            .ok_or(Error::NotReady("model has not been configured"))
    }

    /// Training documents, after subset selection.
    pub fn corpus(&self) -> Result<&Corpus> {
        self.corpus
            .as_ref()
            .ok_or(Error::NotReady("no training data has been set"))
    }

    /// Original corpus index of each training document.
    pub fn doc_indices(&self) -> &[usize] {
        &self.doc_indices
    }

    /// Vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Attached vocabulary, if any.
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    /// The topic tree.
    pub fn tree(&self) -> Result<&TopicTree> {
        self.tree
            .as_ref()
            .ok_or(Error::NotReady("the tree has not been built"))
    }

    /// The root node.
    pub fn root(&self) -> Result<&TopicNode> {
        Ok(self.tree()?.root())
    }

    /// Per-level, per-token topic assignments.
    pub fn assignments(&self) -> Result<&AssignmentStore> {
        self.assignments
            .as_ref()
            .ok_or(Error::NotReady("assignments have not been initialized"))
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.config.as_ref().map_or(0, RecursiveConfig::depth)
    }

    /// Check whether the tree has been trained or loaded.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Structural and partition checks over the trained tree.
    pub fn health_check(&self) -> Result<HealthReport> {
        Ok(self.tree()?.health_check())
    }

    fn reset(&mut self) {
        self.tree = None;
        self.assignments = None;
        self.trained = false;
    }
}

/// Seed of a node's random stream: the base seed folded with its path.
pub(crate) fn node_seed(base: u64, path: &[usize]) -> u64 {
    path.iter().fold(splitmix64(base), |h, &i| {
        splitmix64(h ^ (i as u64).wrapping_add(0x9e37_79b9_7f4a_7c15))
    })
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
