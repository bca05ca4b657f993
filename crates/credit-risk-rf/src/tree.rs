//! CART trees grown on bootstrap draws.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::RfError;
use crate::node::{Node, NodeIndex};
use crate::split::{SplitCriterion, Splitter};

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    /// Columns drawn per split, already resolved.
    pub(crate) max_features: usize,
}

impl TreeParams {
    pub(crate) fn validate(&self) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf { min_samples_leaf: 0 });
        }
        Ok(())
    }
}

/// A fitted tree: an arena of [`Node`]s with the root at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on `rows` of column-major data. A repeated row counts
    /// once per occurrence.
    pub(crate) fn grow(
        params: &TreeParams,
        columns: &[Vec<f64>],
        labels: &[usize],
        class_weights: &[f64],
        rows: Vec<usize>,
        seed: u64,
    ) -> Self {
        let mut grower = Grower {
            params,
            splitter: Splitter {
                columns,
                labels,
                class_weights,
                criterion: params.criterion,
                max_features: params.max_features,
                min_samples_leaf: params.min_samples_leaf,
            },
            rng: ChaCha8Rng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        grower.node(rows, 0);
        trace!(n_nodes = grower.nodes.len(), "tree grown");
        Self { nodes: grower.nodes }
    }

    /// The node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaf class distribution for `sample`. The caller checks the width.
    #[must_use]
    pub fn distribution(&self, sample: &[f64]) -> &[f64] {
        let mut at = 0;
        while let Some(next) = self.nodes[at].child_for(sample) {
            at = next.index();
        }
        match &self.nodes[at] {
            Node::Leaf { distribution, .. } => distribution.as_slice(),
            Node::Split { .. } => &[],
        }
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Edges on the longest root-to-leaf path; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn below(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + below(nodes, left.index()).max(below(nodes, right.index()))
                }
            }
        }
        if self.nodes.is_empty() { 0 } else { below(&self.nodes, 0) }
    }

    /// Split gain summed per feature and scaled to sum to 1; all zero for a
    /// single-leaf tree.
    pub(crate) fn gain_shares(&self, n_features: usize) -> Vec<f64> {
        let mut gains = vec![0.0; n_features];
        for node in &self.nodes {
            if let Node::Split { feature, gain, .. } = node {
                gains[feature.index()] += gain.max(0.0);
            }
        }
        let total: f64 = gains.iter().sum();
        if total > 0.0 {
            gains.iter_mut().for_each(|g| *g /= total);
        }
        gains
    }
}

struct Grower<'a> {
    params: &'a TreeParams,
    splitter: Splitter<'a>,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn node(&mut self, rows: Vec<usize>, depth: usize) -> NodeIndex {
        let mass = self.splitter.class_mass(&rows);
        let weight: f64 = mass.iter().sum();
        let impurity = self.params.criterion.impurity(&mass);
        let at = NodeIndex::new(self.nodes.len());

        let may_split = impurity > 0.0
            && rows.len() >= self.params.min_samples_split
            && self.params.max_depth.is_none_or(|d| depth < d);
        let candidate = if may_split {
            self.splitter.best_split(&rows, &mut self.rng)
        } else {
            None
        };

        let leaf = |n_samples| Node::Leaf {
            distribution: if weight > 0.0 {
                mass.iter().map(|m| m / weight).collect()
            } else {
                vec![0.0; mass.len()]
            },
            impurity,
            n_samples,
            weight,
        };

        let Some(c) = candidate else {
            self.nodes.push(leaf(rows.len()));
            return at;
        };

        // Hold the slot so children get later indices.
        self.nodes.push(leaf(rows.len()));
        let column = &self.splitter.columns[c.feature.index()];
        let n_samples = rows.len();
        let (go_left, go_right): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| column[r] <= c.threshold);
        let left = self.node(go_left, depth + 1);
        let right = self.node(go_right, depth + 1);

        self.nodes[at.index()] = Node::Split {
            feature: c.feature,
            threshold: c.threshold,
            left,
            right,
            impurity,
            n_samples,
            weight,
            gain: c.gain,
        };
        at
    }
}
