//! Train-once, query-many wrapper used by the pipeline binary.

use tracing::{info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::fitted::{RandomForestResult, RankedFeature};
use crate::forest::{ClassDistribution, RandomForest};

/// A forest classifier with fitted state.
///
/// Every query fails with [`RfError::NotFitted`] until
/// [`ForestClassifier::train`] has succeeded once.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    config: RandomForestConfig,
    fitted: Option<RandomForestResult>,
}

impl ForestClassifier {
    #[must_use]
    pub fn new(config: RandomForestConfig) -> Self {
        Self { config, fitted: None }
    }

    /// Fit on `rows`/`labels`, replacing an earlier fit only on success.
    ///
    /// # Errors
    ///
    /// Any error of [`RandomForestConfig::fit`].
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn train(&mut self, rows: &[Vec<f64>], labels: &[usize], feature_names: &[String]) -> Result<(), RfError> {
        let result = self.config.fit(rows, labels, feature_names)?;
        if let Some(top) = result.importances().first() {
            info!(feature = %top.name, importance = top.importance, "top feature");
        }
        self.fitted = Some(result);
        Ok(())
    }

    fn fitted(&self) -> Result<&RandomForestResult, RfError> {
        self.fitted.as_ref().ok_or(RfError::NotFitted)
    }

    /// Predicted class code per row.
    ///
    /// # Errors
    ///
    /// [`RfError::NotFitted`] or [`RfError::PredictionFeatureMismatch`].
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        self.forest()?.predict_batch(rows)
    }

    /// Class probabilities per row.
    ///
    /// # Errors
    ///
    /// [`RfError::NotFitted`] or [`RfError::PredictionFeatureMismatch`].
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<ClassDistribution>, RfError> {
        self.forest()?.predict_proba_batch(rows)
    }

    /// The fitted forest.
    ///
    /// # Errors
    ///
    /// [`RfError::NotFitted`].
    pub fn forest(&self) -> Result<&RandomForest, RfError> {
        self.fitted().map(RandomForestResult::forest)
    }

    /// Impurity importances, most important first.
    ///
    /// # Errors
    ///
    /// [`RfError::NotFitted`].
    pub fn importances(&self) -> Result<&[RankedFeature], RfError> {
        self.fitted().map(RandomForestResult::importances)
    }

    #[must_use]
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassWeight;

    /// Bill amount above 30 means default; the second column is noise-free filler.
    fn bills() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let rows = (0..40).map(|i| vec![f64::from(i), 1.0]).collect();
        let labels = (0..40).map(|i| usize::from(i >= 30)).collect();
        (rows, labels, vec!["bill_amt1".into(), "const".into()])
    }

    #[test]
    fn queries_fail_before_training() {
        let clf = ForestClassifier::new(RandomForestConfig::new(5).unwrap());
        assert!(!clf.is_fitted());
        assert!(matches!(clf.predict(&[vec![1.0, 1.0]]), Err(RfError::NotFitted)));
        assert!(matches!(clf.predict_proba(&[vec![1.0, 1.0]]), Err(RfError::NotFitted)));
        assert!(matches!(clf.forest(), Err(RfError::NotFitted)));
        assert!(matches!(clf.importances(), Err(RfError::NotFitted)));
    }

    #[test]
    fn trained_classifier_separates_bills() {
        let (rows, labels, names) = bills();
        let mut clf = ForestClassifier::new(
            RandomForestConfig::new(20)
                .unwrap()
                .with_max_depth(Some(10))
                .with_class_weight(ClassWeight::Balanced),
        );
        clf.train(&rows, &labels, &names).unwrap();

        assert_eq!(clf.predict(&[vec![2.0, 1.0], vec![38.0, 1.0]]).unwrap(), vec![0, 1]);
        assert!(clf.predict_proba(&[vec![38.0, 1.0]]).unwrap()[0].probability(1) > 0.5);
        assert_eq!(clf.importances().unwrap()[0].name, "bill_amt1");
        assert_eq!(clf.config().n_trees(), 20);
    }

    #[test]
    fn failed_retrain_keeps_the_old_fit() {
        let (rows, labels, names) = bills();
        let mut clf = ForestClassifier::new(RandomForestConfig::new(3).unwrap());
        clf.train(&rows, &labels, &names).unwrap();
        assert!(clf.train(&[], &[], &[]).is_err());
        assert!(clf.is_fitted());
    }
}
