//! Decision tree ensembles.
//!
//! Trees are stored as a flat arena of nodes rooted at index 0. A split sends
//! `x[feature] <= threshold` to `left` and everything else to `right`. Every
//! child index must be strictly greater than its parent's, which validation
//! enforces, so traversal always terminates at a leaf.

use super::{argmax, ClassifierError, FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights (sample counts or probabilities) at this leaf
    Leaf { distribution: Vec<f64> },
}

impl TreeNode {
    /// Leaf putting all weight on `class` out of `n_classes`.
    pub fn leaf_for(class: usize, n_classes: usize) -> Self {
        let mut distribution = vec![0.0; n_classes];
        distribution[class] = 1.0;
        TreeNode::Leaf { distribution }
    }
}

/// A single binary decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    fn validate(&self, tree: usize, n_classes: usize) -> Result<(), ClassifierError> {
        if self.nodes.is_empty() {
            return Err(ClassifierError::EmptyTree { tree });
        }

        for (node, entry) in self.nodes.iter().enumerate() {
            match entry {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(ClassifierError::FeatureOutOfRange {
                            tree,
                            node,
                            feature: *feature,
                        });
                    }
                    if !threshold.is_finite() {
                        return Err(ClassifierError::NonFiniteThreshold { tree, node });
                    }
                    for &child in [left, right] {
                        if child <= node || child >= self.nodes.len() {
                            return Err(ClassifierError::InvalidChild { tree, node, child });
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    let invalid = |reason: String| ClassifierError::InvalidLeaf {
                        tree,
                        node,
                        reason,
                    };
                    if distribution.len() != n_classes {
                        return Err(invalid(format!(
                            "distribution has {} entries, expected {n_classes}",
                            distribution.len()
                        )));
                    }
                    if distribution.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(invalid("weights must be finite and non-negative".into()));
                    }
                    if distribution.iter().sum::<f64>() <= 0.0 {
                        return Err(invalid("weights sum to zero".into()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Raw class weights of the leaf reached by `features`.
    ///
    /// Assumes the tree has been validated.
    pub fn leaf_distribution(&self, features: &FeatureVector) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { distribution } => return distribution,
            }
        }
    }
}

/// Ensemble of decision trees voting by averaged leaf probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionForest {
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl DecisionForest {
    pub fn new(n_classes: usize, trees: Vec<DecisionTree>) -> Self {
        Self { n_classes, trees }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn num_classes(&self) -> usize {
        self.n_classes
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.trees.is_empty() {
            return Err(ClassifierError::EmptyForest);
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_classes)?;
        }
        Ok(())
    }

    /// Mean of each tree's normalized leaf distribution.
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_distribution(features);
            let total: f64 = leaf.iter().sum();
            for (p, w) in proba.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Class with the highest mean probability; ties go to the lower index.
    pub fn predict(&self, features: &FeatureVector) -> usize {
        argmax(&self.predict_proba(features))
    }
}
