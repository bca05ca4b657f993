//! The fitted ensemble: parallel bootstrap training and averaged prediction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::fitted::{RandomForestResult, TrainingMetadata, rank_features};
use crate::tree::{DecisionTree, TreeParams};

/// Averaged class probabilities for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Most probable class; the lower code wins a tie.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (class, &p)| {
                if p > best.1 { (class, p) } else { best }
            })
            .0
    }

    /// Probability of `class`; 0.0 for a class the forest never saw.
    #[must_use]
    pub fn probability(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    /// All class probabilities by class code.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

/// A trained forest of CART trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    feature_names: Vec<String>,
}

impl RandomForest {
    /// The fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Width of the training rows.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes, `max(label) + 1` at training time.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Training column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Mean of the trees' leaf distributions for one row.
    ///
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] when the row width differs
    /// from the training width.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in probs.iter_mut().zip(tree.distribution(sample)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        Ok(ClassDistribution { probs })
    }

    /// Most probable class for one row.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::predict_proba`].
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        self.predict_proba(sample).map(|d| d.predicted_class())
    }

    /// [`RandomForest::predict_proba`] over many rows in parallel.
    ///
    /// # Errors
    ///
    /// The first row of the wrong width fails the batch.
    pub fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<ClassDistribution>, RfError> {
        rows.par_iter().map(|r| self.predict_proba(r)).collect()
    }

    /// [`RandomForest::predict`] over many rows in parallel.
    ///
    /// # Errors
    ///
    /// The first row of the wrong width fails the batch.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        rows.par_iter().map(|r| self.predict(r)).collect()
    }
}

/// Transpose row-major data into one `Vec` per column.
pub(crate) fn to_columns(rows: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|f| rows.iter().map(|row| row[f]).collect())
        .collect()
}

/// Validate a training set and return its width.
fn check_training_set(rows: &[Vec<f64>], labels: &[usize], names: &[String]) -> Result<usize, RfError> {
    let Some(first) = rows.first() else {
        return Err(RfError::EmptyDataset);
    };
    let width = first.len();
    if width == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != rows.len() {
        return Err(RfError::LabelCountMismatch {
            n_features_rows: rows.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(RfError::FeatureCountMismatch {
                expected: width,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if names.len() != width {
        return Err(RfError::FeatureNameMismatch {
            expected: width,
            got: names.len(),
        });
    }
    Ok(width)
}

/// Fit `config.n_trees` trees, each on its own bootstrap draw.
///
/// Per-tree seeds come from one master `ChaCha8Rng`, so the result does not
/// depend on how rayon schedules the trees.
#[instrument(skip_all, fields(n_trees = config.n_trees(), n_samples = rows.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    rows: &[Vec<f64>],
    labels: &[usize],
    names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = check_training_set(rows, labels, names)?;
    let n_samples = rows.len();
    let n_classes = labels.iter().copied().max().map_or(1, |m| m + 1);

    let params = TreeParams {
        criterion: config.criterion(),
        max_depth: config.max_depth(),
        min_samples_split: config.min_samples_split(),
        min_samples_leaf: config.min_samples_leaf(),
        max_features: config.max_features().resolve(n_features)?,
    };
    params.validate()?;
    let class_weights = config.class_weight().weights(labels, n_classes);

    info!(
        n_features,
        n_classes,
        max_features = params.max_features,
        class_weight = ?config.class_weight(),
        "training random forest"
    );

    let mut master = ChaCha8Rng::seed_from_u64(config.seed());
    let seeds: Vec<u64> = (0..config.n_trees()).map(|_| master.r#gen()).collect();
    let columns = to_columns(rows, n_features);

    let trees: Vec<DecisionTree> = seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let draw: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            DecisionTree::grow(&params, &columns, labels, &class_weights, draw, rng.r#gen())
        })
        .collect();
    debug!(n_trees = trees.len(), "trees grown");

    let importances = rank_features(&trees, names);
    let mean_depth = trees.iter().map(DecisionTree::depth).sum::<usize>() as f64 / trees.len() as f64;
    info!(mean_depth, "random forest trained");

    let metadata = TrainingMetadata {
        n_samples,
        n_features,
        n_classes,
        max_features: params.max_features,
        class_weights,
        mean_depth,
    };
    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: names.to_vec(),
    };
    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{ClassWeight, MaxFeatures, RandomForestConfig};
    use crate::error::RfError;

    use super::ClassDistribution;

    /// Three bands along the first column; the second is constant.
    fn bands() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let rows = (0..60)
            .map(|i| vec![(i / 20) as f64 * 10.0 + (i % 20) as f64 * 0.2, 1.0])
            .collect();
        let labels = (0..60).map(|i| i / 20).collect();
        (rows, labels, vec!["pay_amt1".into(), "const".into()])
    }

    #[test]
    fn learns_three_bands() {
        let (rows, labels, names) = bands();
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&rows, &labels, &names)
            .unwrap();
        let predicted = result.forest().predict_batch(&rows).unwrap();
        let hits = predicted.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert!(hits >= 57, "{hits}/60");
        assert_eq!(result.forest().n_classes(), 3);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (rows, labels, names) = bands();
        let forest = RandomForestConfig::new(10).unwrap().fit(&rows, &labels, &names).unwrap().into_forest();
        for d in forest.predict_proba_batch(&rows).unwrap() {
            assert!((d.as_slice().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let (rows, labels, names) = bands();
        let fit = |seed| {
            RandomForestConfig::new(12)
                .unwrap()
                .with_seed(seed)
                .fit(&rows, &labels, &names)
                .unwrap()
                .into_forest()
                .predict_proba_batch(&rows)
                .unwrap()
        };
        assert_eq!(fit(5), fit(5));
    }

    #[test]
    fn balanced_weights_in_metadata() {
        let rows: Vec<Vec<f64>> = (0..90).map(|i| vec![f64::from(i), f64::from(i % 5)]).collect();
        let labels: Vec<usize> = (0..90).map(|i| usize::from(i >= 75)).collect();
        let result = RandomForestConfig::new(4)
            .unwrap()
            .with_class_weight(ClassWeight::Balanced)
            .fit(&rows, &labels, &["a".into(), "b".into()])
            .unwrap();
        let w = &result.metadata().class_weights;
        assert!((w[0] - 90.0 / 150.0).abs() < 1e-12);
        assert!((w[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn depth_limit_applies_to_every_tree() {
        let (rows, labels, names) = bands();
        let result = RandomForestConfig::new(6)
            .unwrap()
            .with_max_depth(Some(1))
            .fit(&rows, &labels, &names)
            .unwrap();
        assert!(result.forest().trees().iter().all(|t| t.depth() <= 1));
        assert!(result.metadata().mean_depth <= 1.0);
    }

    #[test]
    fn training_input_errors() {
        let config = RandomForestConfig::new(2).unwrap();
        let names = vec!["x".to_string()];
        assert!(matches!(config.fit(&[], &[], &[]), Err(RfError::EmptyDataset)));
        assert!(matches!(
            config.fit(&[vec![1.0], vec![2.0, 3.0]], &[0, 1], &names),
            Err(RfError::FeatureCountMismatch { sample_index: 1, .. })
        ));
        assert!(matches!(
            config.fit(&[vec![1.0], vec![f64::NAN]], &[0, 1], &names),
            Err(RfError::NonFiniteValue { sample_index: 1, feature_index: 0 })
        ));
        assert!(matches!(
            config.fit(&[vec![1.0, 2.0]], &[0], &names),
            Err(RfError::FeatureNameMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            config.fit(&[vec![1.0]], &[0, 1], &names),
            Err(RfError::LabelCountMismatch { .. })
        ));
    }

    #[test]
    fn wrong_width_at_prediction() {
        let (rows, labels, names) = bands();
        let forest = RandomForestConfig::new(3).unwrap().fit(&rows, &labels, &names).unwrap().into_forest();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn ties_go_to_the_lower_class() {
        let d = ClassDistribution { probs: vec![0.5, 0.5] };
        assert_eq!(d.predicted_class(), 0);
        assert_eq!(d.probability(9), 0.0);
    }
}
