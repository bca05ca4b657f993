//! Exact path-dependent TreeSHAP over a fitted forest.
//!
//! Each tree is explained by walking every root-to-leaf path once while
//! tracking, per feature on the path, the fraction of subsets in which the
//! path is followed (`one_fraction`, feature known) versus the cover-weighted
//! fraction when the feature is unknown (`zero_fraction`). Node cover is the
//! class-weighted training mass stored on each node. Forest values are the
//! mean over trees, matching how the forest averages leaf distributions.

use credit_risk_rf::{DecisionTree, Node, RandomForest};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Shapley values of one class probability of a forest.
#[derive(Debug, Clone, Copy)]
pub struct TreeShap<'a> {
    forest: &'a RandomForest,
    class: usize,
}

impl<'a> TreeShap<'a> {
    /// Explain the probability of `class`.
    #[must_use]
    pub fn new(forest: &'a RandomForest, class: usize) -> Self {
        Self { forest, class }
    }

    /// Expected model output over the training distribution.
    #[must_use]
    pub fn base_value(&self) -> f64 {
        let trees = self.forest.trees();
        if trees.is_empty() {
            return 0.0;
        }
        trees
            .iter()
            .map(|t| expected_value(t, self.class))
            .sum::<f64>()
            / trees.len() as f64
    }

    /// Attribution of every feature for one sample.
    ///
    /// `base_value() + sum(values)` equals the forest's probability of the
    /// class for `sample`. The caller checks the sample width.
    #[must_use]
    pub fn shap_values(&self, sample: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.forest.n_features()];
        let trees = self.forest.trees();
        for tree in trees {
            let nodes = tree.nodes();
            if nodes.is_empty() {
                continue;
            }
            let walker = Walker {
                nodes,
                sample,
                class: self.class,
            };
            walker.recurse(0, Vec::with_capacity(16), 1.0, 1.0, None, &mut phi);
        }
        let n = trees.len().max(1) as f64;
        phi.iter_mut().for_each(|v| *v /= n);
        phi
    }
}

fn leaf_value(distribution: &[f64], class: usize) -> f64 {
    distribution.get(class).copied().unwrap_or(0.0)
}

/// Cover-weighted mean leaf value of one tree.
fn expected_value(tree: &DecisionTree, class: usize) -> f64 {
    let nodes = tree.nodes();
    let Some(root) = nodes.first() else {
        return 0.0;
    };
    let total = root.weight();
    if total <= 0.0 {
        return 0.0;
    }
    nodes
        .iter()
        .filter_map(|n| match n {
            Node::Leaf {
                distribution,
                weight,
                ..
            } => Some(weight / total * leaf_value(distribution, class)),
            Node::Split { .. } => None,
        })
        .sum()
}

struct Walker<'t> {
    nodes: &'t [Node],
    sample: &'t [f64],
    class: usize,
}

impl Walker<'_> {
    fn recurse(
        &self,
        node: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
        phi: &mut [f64],
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match &self.nodes[node] {
            Node::Leaf { distribution, .. } => {
                let value = leaf_value(distribution, self.class);
                for i in 1..path.len() {
                    let element = path[i];
                    if let Some(f) = element.feature {
                        let w = unwound_path_sum(&path, i);
                        phi[f] += w * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split_feature,
                threshold,
                left,
                right,
                weight,
                ..
            } => {
                let f = split_feature.index();
                let (hot, cold) = if self.sample[f] <= *threshold {
                    (left.index(), right.index())
                } else {
                    (right.index(), left.index())
                };
                let cover = |child: usize| {
                    if *weight > 0.0 {
                        self.nodes[child].weight() / weight
                    } else {
                        0.5
                    }
                };

                // A feature seen higher up is folded into a single path entry.
                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(f)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    cover(hot) * incoming_zero,
                    incoming_one,
                    Some(f),
                    phi,
                );
                self.recurse(cold, path, cover(cold) * incoming_zero, 0.0, Some(f), phi);
            }
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i as f64 + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one);
            next_one_portion = tmp - path[i].pweight * zero * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero * (d - i as f64));
        }
    }
    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (d - i as f64) / (d + 1.0);
        } else if zero != 0.0 {
            total += path[i].pweight / zero / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_risk_rf::{ClassWeight, MaxFeatures, RandomForestConfig};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn forest(n_trees: usize, class_weight: ClassWeight) -> (RandomForest, Vec<Vec<f64>>) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let x: Vec<Vec<f64>> = (0..300)
            .map(|_| (0..5).map(|_| rng.r#gen::<f64>()).collect())
            .collect();
        let y: Vec<usize> = x
            .iter()
            .map(|r| usize::from(r[0] + 0.5 * r[1] > 1.0 || r[2] > 0.9))
            .collect();
        let names: Vec<String> = (0..5).map(|i| format!("x{i}")).collect();
        let forest = RandomForestConfig::new(n_trees)
            .unwrap()
            .with_max_depth(Some(6))
            .with_max_features(MaxFeatures::Fixed(3))
            .with_class_weight(class_weight)
            .with_seed(5)
            .fit(&x, &y, &names)
            .unwrap()
            .into_forest();
        (forest, x)
    }

    #[test]
    fn values_add_up_to_prediction() {
        for weight in [ClassWeight::Uniform, ClassWeight::Balanced] {
            let (forest, x) = forest(15, weight);
            let shap = TreeShap::new(&forest, 1);
            let base = shap.base_value();
            for row in x.iter().take(40) {
                let phi = shap.shap_values(row);
                let p = forest.predict_proba(row).unwrap().probability(1);
                let total = base + phi.iter().sum::<f64>();
                assert!((total - p).abs() < 1e-9, "{total} vs {p}");
            }
        }
    }

    #[test]
    fn unused_feature_gets_zero() {
        let (forest, x) = forest(10, ClassWeight::Uniform);
        let used: Vec<bool> = (0..5)
            .map(|f| {
                forest.trees().iter().any(|t| {
                    t.nodes()
                        .iter()
                        .any(|n| matches!(n, Node::Split { feature, .. } if feature.index() == f))
                })
            })
            .collect();
        let shap = TreeShap::new(&forest, 1);
        for row in x.iter().take(10) {
            let phi = shap.shap_values(row);
            for (f, &u) in used.iter().enumerate() {
                if !u {
                    assert_eq!(phi[f], 0.0);
                }
            }
        }
    }

    #[test]
    fn classes_are_mirror_images_for_binary() {
        let (forest, x) = forest(8, ClassWeight::Balanced);
        let pos = TreeShap::new(&forest, 1);
        let neg = TreeShap::new(&forest, 0);
        assert!((pos.base_value() + neg.base_value() - 1.0).abs() < 1e-9);
        let a = pos.shap_values(&x[3]);
        let b = neg.shap_values(&x[3]);
        for (p, n) in a.iter().zip(&b) {
            assert!((p + n).abs() < 1e-9);
        }
    }

    #[test]
    fn informative_feature_dominates() {
        let (forest, x) = forest(20, ClassWeight::Uniform);
        let shap = TreeShap::new(&forest, 1);
        let mut mean_abs = vec![0.0; 5];
        for row in &x {
            for (m, v) in mean_abs.iter_mut().zip(shap.shap_values(row)) {
                *m += v.abs();
            }
        }
        assert!(mean_abs[0] > mean_abs[3]);
        assert!(mean_abs[0] > mean_abs[4]);
    }

    #[test]
    fn single_feature_path_algebra() {
        // One split on x0 with equal cover: phi = (p_hot - E[f]) exactly.
        let mut path = Vec::new();
        extend_path(&mut path, 1.0, 1.0, None);
        extend_path(&mut path, 0.5, 1.0, Some(0));
        let w = unwound_path_sum(&path, 1);
        assert!((w - 1.0).abs() < 1e-12);
        unwind_path(&mut path, 1);
        assert_eq!(path.len(), 1);
        assert!((path[0].pweight - 1.0).abs() < 1e-12);
    }
}
