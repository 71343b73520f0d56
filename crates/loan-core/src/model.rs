//! Stacking ensemble artifact.
//!
//! The trained ensemble is exported from scikit-learn as JSON: three base
//! estimators (logistic regression, decision tree, random forest) whose
//! positive-class probabilities feed a logistic regression meta model.

use crate::classifier::ProbabilityModel;
use crate::error::LoanError;
use serde::{Deserialize, Serialize};

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary logistic regression: `P(1) = sigmoid(coef . x + intercept)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn positive_proba(&self, x: &[f64]) -> Result<f64, LoanError> {
        if x.len() != self.coef.len() {
            return Err(LoanError::shape(
                "logistic regression input",
                format!("{} features", self.coef.len()),
                x.len(),
            ));
        }
        let z = self
            .coef
            .iter()
            .zip(x)
            .fold(self.intercept, |acc, (w, v)| acc + w * v);
        Ok(sigmoid(z))
    }

    fn validate(&self, inputs: usize, context: &str) -> Result<(), LoanError> {
        if self.coef.len() != inputs {
            return Err(LoanError::Configuration(format!(
                "{}: logistic regression has {} coefficients, expected {}",
                context,
                self.coef.len(),
                inputs
            )));
        }
        if !self.intercept.is_finite() || self.coef.iter().any(|w| !w.is_finite()) {
            return Err(LoanError::Configuration(format!(
                "{}: logistic regression has non-finite parameters",
                context
            )));
        }
        Ok(())
    }
}

/// One node of an array-encoded decision tree. `left == -1` marks a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f64,
    pub left: i64,
    pub right: i64,
    /// Class weights reaching this node, `[rejected, approved]`.
    pub value: [f64; 2],
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.left < 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walks from the root to a leaf. A tree that was never validated fails with
    /// a model error instead of panicking or looping.
    pub fn positive_proba(&self, x: &[f64]) -> Result<f64, LoanError> {
        let mut index = 0usize;
        // A path visits each node at most once.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(index).ok_or_else(|| {
                LoanError::Model(format!(
                    "decision tree references missing node {} of {}",
                    index,
                    self.nodes.len()
                ))
            })?;
            if node.is_leaf() {
                let total = node.value[0] + node.value[1];
                if !(total.is_finite() && total > 0.0) {
                    return Err(LoanError::Model(format!(
                        "decision tree leaf {} has invalid class weights {:?}",
                        index, node.value
                    )));
                }
                return Ok(node.value[1] / total);
            }
            let value = x.get(node.feature).ok_or_else(|| {
                LoanError::shape(
                    "decision tree input",
                    format!("more than {} features", node.feature),
                    x.len(),
                )
            })?;
            let next = if *value <= node.threshold {
                node.left
            } else {
                node.right
            };
            index = usize::try_from(next).map_err(|_| {
                LoanError::Model(format!("decision tree has invalid child index {}", next))
            })?;
        }
        Err(LoanError::Model(
            "decision tree path does not reach a leaf".to_string(),
        ))
    }

    fn validate(&self, inputs: usize, context: &str) -> Result<(), LoanError> {
        if self.nodes.is_empty() {
            return Err(LoanError::Configuration(format!(
                "{}: decision tree has no nodes",
                context
            )));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                let total = node.value[0] + node.value[1];
                if !(total.is_finite() && total > 0.0) || node.value.iter().any(|v| *v < 0.0) {
                    return Err(LoanError::Configuration(format!(
                        "{}: leaf {} has invalid class weights {:?}",
                        context, index, node.value
                    )));
                }
                continue;
            }

            if node.feature >= inputs {
                return Err(LoanError::Configuration(format!(
                    "{}: node {} splits on feature {} of {}",
                    context, index, node.feature, inputs
                )));
            }
            if !node.threshold.is_finite() {
                return Err(LoanError::Configuration(format!(
                    "{}: node {} has a non-finite threshold",
                    context, index
                )));
            }
            for child in [node.left, node.right] {
                if child <= index as i64 || child as usize >= self.nodes.len() {
                    return Err(LoanError::Configuration(format!(
                        "{}: node {} has invalid child index {}",
                        context, index, child
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Bagged trees; probability is the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn positive_proba(&self, x: &[f64]) -> Result<f64, LoanError> {
        if self.trees.is_empty() {
            return Err(LoanError::Model("random forest has no trees".to_string()));
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.positive_proba(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn validate(&self, inputs: usize, context: &str) -> Result<(), LoanError> {
        if self.trees.is_empty() {
            return Err(LoanError::Configuration(format!(
                "{}: random forest has no trees",
                context
            )));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(inputs, &format!("{} tree {}", context, index))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseEstimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl BaseEstimator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "Logistic Regression",
            Self::DecisionTree(_) => "Decision Tree",
            Self::RandomForest(_) => "Random Forest",
        }
    }

    pub fn positive_proba(&self, x: &[f64]) -> Result<f64, LoanError> {
        match self {
            Self::LogisticRegression(model) => model.positive_proba(x),
            Self::DecisionTree(model) => model.positive_proba(x),
            Self::RandomForest(model) => model.positive_proba(x),
        }
    }

    fn validate(&self, inputs: usize, context: &str) -> Result<(), LoanError> {
        match self {
            Self::LogisticRegression(model) => model.validate(inputs, context),
            Self::DecisionTree(model) => model.validate(inputs, context),
            Self::RandomForest(model) => model.validate(inputs, context),
        }
    }
}

/// Two-stage stacking ensemble.
///
/// Meta features are each base estimator's `P(class 1)` in estimator order,
/// followed by the raw features when `passthrough` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingClassifier {
    pub n_features: usize,
    pub estimators: Vec<BaseEstimator>,
    pub final_estimator: LogisticRegression,
    #[serde(default)]
    pub passthrough: bool,
}

impl StackingClassifier {
    pub fn validate(&self) -> Result<(), LoanError> {
        if self.estimators.is_empty() {
            return Err(LoanError::Configuration(
                "stacking model has no base estimators".to_string(),
            ));
        }
        for (index, estimator) in self.estimators.iter().enumerate() {
            estimator.validate(self.n_features, &format!("estimator {}", index))?;
        }

        let meta_inputs = self.estimators.len() + if self.passthrough { self.n_features } else { 0 };
        self.final_estimator
            .validate(meta_inputs, "final estimator")
    }

    pub fn architecture(&self) -> ModelArchitecture {
        ModelArchitecture {
            base_models: self
                .estimators
                .iter()
                .map(|estimator| estimator.name().to_string())
                .collect(),
            meta_model: "Logistic Regression".to_string(),
            passthrough: self.passthrough,
        }
    }

    fn meta_features(&self, x: &[f64]) -> Result<Vec<f64>, LoanError> {
        let mut meta = self
            .estimators
            .iter()
            .map(|estimator| estimator.positive_proba(x))
            .collect::<Result<Vec<f64>, LoanError>>()?;
        if self.passthrough {
            meta.extend_from_slice(x);
        }
        Ok(meta)
    }
}

impl ProbabilityModel for StackingClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LoanError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(LoanError::shape(
                        "classifier input",
                        format!("{} features", self.n_features),
                        row.len(),
                    ));
                }
                let approved = self
                    .final_estimator
                    .positive_proba(&self.meta_features(row)?)?;
                Ok(vec![1.0 - approved, approved])
            })
            .collect()
    }
}

/// Human-readable summary of the loaded ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub base_models: Vec<String>,
    pub meta_model: String,
    pub passthrough: bool,
}
