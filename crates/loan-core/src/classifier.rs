use crate::error::LoanError;
use crate::types::{ClassProbabilities, Decision, DecisionLabel, FeatureVector, FEATURE_COUNT};

/// Calibrated approval cutoff on `P(Approved)`. Deliberately below 0.5.
pub const APPROVAL_THRESHOLD: f64 = 0.45;

/// Binary probabilistic classifier over the full feature vector.
///
/// `predict_proba` returns one row per input row; each row holds
/// `[P(Rejected), P(Approved)]` and sums to 1.
pub trait ProbabilityModel: Send + Sync {
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize {
        2
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LoanError>;
}

/// Applies the decision rule to one row of class probabilities.
///
/// The label uses [`APPROVAL_THRESHOLD`] while the confidence is the larger of
/// the two class probabilities. For `0.45 <= P(Approved) < 0.5` the label is
/// Approved and the confidence is `P(Rejected)`.
pub fn decide_from_probabilities(probabilities: ClassProbabilities) -> Decision {
    let label = if probabilities.approved >= APPROVAL_THRESHOLD {
        DecisionLabel::Approved
    } else {
        DecisionLabel::Rejected
    };

    Decision {
        label,
        confidence: probabilities.max() * 100.0,
        probabilities,
    }
}

/// Runs the classifier on a single scaled vector and derives the decision.
pub fn decide(vector: &FeatureVector, model: &dyn ProbabilityModel) -> Result<Decision, LoanError> {
    if model.n_features() != FEATURE_COUNT {
        return Err(LoanError::shape(
            "classifier input",
            format!("{} features", FEATURE_COUNT),
            format!("model trained on {} features", model.n_features()),
        ));
    }
    if model.n_classes() != 2 {
        return Err(LoanError::shape(
            "classifier output",
            "2 classes",
            model.n_classes(),
        ));
    }

    let rows = model.predict_proba(&[vector.to_row()])?;
    let row = match rows.as_slice() {
        [row] => row,
        other => return Err(LoanError::shape("classifier output", "1 row", other.len())),
    };

    let probabilities = ClassProbabilities::from_row(row)?;
    Ok(decide_from_probabilities(probabilities))
}
