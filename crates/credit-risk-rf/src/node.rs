//! Arena nodes of a fitted decision tree.

use std::fmt;

macro_rules! arena_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            /// Zero-based position.
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

arena_index!(
    /// Column of the feature matrix tested by a split.
    FeatureIndex
);
arena_index!(
    /// Position of a node in its tree's arena.
    NodeIndex
);

/// One node of a tree stored as `Vec<Node>` with the root at index 0.
///
/// `weight` is the class-weighted training mass reaching the node; the two
/// children of a split always carry their parent's mass between them.
#[derive(Debug, Clone)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left, the rest go right.
    Split {
        /// Tested column.
        feature: FeatureIndex,
        /// Midpoint between the two closest values on either side.
        threshold: f64,
        /// Child for values at or below the threshold.
        left: NodeIndex,
        /// Child for values above the threshold.
        right: NodeIndex,
        /// Weighted impurity before splitting.
        impurity: f64,
        /// Bootstrap rows reaching the node, repeats included.
        n_samples: usize,
        /// Class-weighted mass reaching the node.
        weight: f64,
        /// Mass-weighted impurity removed by the split.
        gain: f64,
    },
    /// A terminal node.
    Leaf {
        /// Class-weighted share of each class; sums to 1 unless `weight` is 0.
        distribution: Vec<f64>,
        /// Weighted impurity of the leaf.
        impurity: f64,
        /// Bootstrap rows in the leaf, repeats included.
        n_samples: usize,
        /// Class-weighted mass in the leaf.
        weight: f64,
    },
}

impl Node {
    /// Class-weighted training mass of the node.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Node::Split { weight, .. } | Node::Leaf { weight, .. } => *weight,
        }
    }

    /// Training rows that reached the node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Impurity of the node's training rows.
    #[must_use]
    pub fn impurity(&self) -> f64 {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return `true` for a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child a sample descends to, or `None` at a leaf.
    #[must_use]
    pub fn child_for(&self, sample: &[f64]) -> Option<NodeIndex> {
        match self {
            Node::Leaf { .. } => None,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => Some(if sample[feature.index()] <= *threshold {
                *left
            } else {
                *right
            }),
        }
    }
}
