//! Forest hyperparameters.

use crate::error::RfError;
use crate::fitted::RandomForestResult;
use crate::split::SplitCriterion;

/// How many columns each split may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `floor(sqrt(n))`, at least 1.
    Sqrt,
    /// `floor(log2(n))`, at least 1.
    Log2,
    /// `floor(f * n)`, at least 1.
    Fraction(f64),
    /// Exactly this many.
    Fixed(usize),
    /// Every column.
    All,
}

impl MaxFeatures {
    /// Column count for data of width `n_features`.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidMaxFeatures`] when the count is 0 or above
    /// `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let n = n_features as f64;
        let at_least_one = |v: f64| v.floor().max(1.0) as usize;
        let max_features = match self {
            MaxFeatures::Sqrt => at_least_one(n.sqrt()),
            MaxFeatures::Log2 => at_least_one(n.log2()),
            MaxFeatures::Fraction(f) => at_least_one(n * f),
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::All => n_features,
        };
        if (1..=n_features).contains(&max_features) {
            Ok(max_features)
        } else {
            Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            })
        }
    }
}

/// Per-class sample weighting used by the split search and leaf values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassWeight {
    /// Weight 1 for every row.
    Uniform,
    /// `n / (k * n_c)` for class `c`, so every class carries equal mass.
    Balanced,
}

impl ClassWeight {
    /// One weight per class code below `n_classes`; an absent class gets 0.
    #[must_use]
    pub fn weights(self, labels: &[usize], n_classes: usize) -> Vec<f64> {
        if self == ClassWeight::Uniform {
            return vec![1.0; n_classes];
        }
        let counts = labels.iter().fold(vec![0usize; n_classes], |mut acc, &l| {
            acc[l] += 1;
            acc
        });
        let n = labels.len() as f64;
        counts
            .into_iter()
            .map(|c| if c == 0 { 0.0 } else { n / (n_classes * c) as f64 })
            .collect()
    }
}

/// Random forest settings.
///
/// | Setting | Default |
/// |---|---|
/// | `max_features` | [`MaxFeatures::Sqrt`] |
/// | `max_depth` | unlimited |
/// | `min_samples_split` | 2 |
/// | `min_samples_leaf` | 1 |
/// | `criterion` | [`SplitCriterion::Gini`] |
/// | `class_weight` | [`ClassWeight::Uniform`] |
/// | `seed` | 42 |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    n_trees: usize,
    max_features: MaxFeatures,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    criterion: SplitCriterion,
    class_weight: ClassWeight,
    seed: u64,
}

impl RandomForestConfig {
    /// Settings for `n_trees` trees with the defaults above.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidTreeCount`] when `n_trees` is 0.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            class_weight: ClassWeight::Uniform,
            seed: 42,
        })
    }

    /// Columns drawn per split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Depth cap; `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fewest rows a node needs before it may split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Fewest rows each side of a split must keep.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Impurity measure.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Class weighting.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Master seed for bootstrap draws and column sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest on row-major `rows` with class codes `labels` and one
    /// name per column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | No rows |
    /// | [`RfError::ZeroFeatures`] | Rows have no columns |
    /// | [`RfError::LabelCountMismatch`] | Row and label counts differ |
    /// | [`RfError::FeatureCountMismatch`] | Ragged rows |
    /// | [`RfError::NonFiniteValue`] | NaN or infinite value |
    /// | [`RfError::FeatureNameMismatch`] | Name count differs from width |
    /// | [`RfError::InvalidMaxFeatures`] | Column subsample outside `1..=width` |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split < 2` |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf == 0` |
    pub fn fit(
        &self,
        rows: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, rows, labels, feature_names)
    }
}
