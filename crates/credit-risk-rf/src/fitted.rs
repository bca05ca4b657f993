//! What training produces: the forest, ranked importances and run facts.

use serde::Serialize;

use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// A column's share of the total impurity reduction, with its rank.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFeature {
    /// Column name.
    pub name: String,
    /// Share of the forest's split gain; shares sum to 1.
    pub importance: f64,
    /// 1 for the most important column.
    pub rank: usize,
}

/// Facts about a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingMetadata {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_classes: usize,
    /// Columns drawn per split.
    pub max_features: usize,
    /// Weight of each class during growth.
    pub class_weights: Vec<f64>,
    /// Mean longest root-to-leaf path.
    pub mean_depth: f64,
}

/// A trained forest with its importances and run facts.
#[derive(Debug, Clone)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(forest: RandomForest, importances: Vec<RankedFeature>, metadata: TrainingMetadata) -> Self {
        Self {
            forest,
            importances,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Drop the importances and metadata.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Columns from most to least important.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}

/// Mean decrease in impurity: each tree's gain shares averaged over the
/// forest, then ranked. Equal shares keep column order.
pub(crate) fn rank_features(trees: &[DecisionTree], names: &[String]) -> Vec<RankedFeature> {
    let mut totals = vec![0.0; names.len()];
    for tree in trees {
        for (t, share) in totals.iter_mut().zip(tree.gain_shares(names.len())) {
            *t += share;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|t| *t /= sum);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, f) in ranked.iter_mut().enumerate() {
        f.rank = i + 1;
    }
    ranked
}
