use crate::error::LoanError;
use crate::types::FeatureVector;
use serde::{Deserialize, Serialize};

/// Pre-fitted numeric normalisation over the scaled feature columns.
///
/// Implementations are opaque batch transforms: one output row per input row,
/// same width as the input.
pub trait FeatureScaler: Send + Sync {
    fn n_features(&self) -> usize;

    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LoanError>;
}

/// How scaled values are stored back into the feature vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleWriteback {
    /// Keep full `f64` precision.
    #[default]
    Exact,
    /// Hold the vector as integers: amounts are truncated toward zero before
    /// scaling and the standardised values are truncated toward zero after.
    /// Reproduces the Streamlit app, whose form produced an integer array.
    Integer,
}

impl ScaleWriteback {
    fn store(self, value: f64) -> f64 {
        match self {
            Self::Exact => value,
            // `+ 0.0` folds -0.0 into 0.0, as an integer cast would.
            Self::Integer => value.trunc() + 0.0,
        }
    }
}

/// Scales positions 5, 6 and 7 (incomes and loan amount) and leaves every other
/// position untouched.
pub fn apply_scale(
    vector: FeatureVector,
    scaler: &dyn FeatureScaler,
) -> Result<FeatureVector, LoanError> {
    apply_scale_with(vector, scaler, ScaleWriteback::Exact)
}

/// [`apply_scale`] with an explicit writeback mode.
pub fn apply_scale_with(
    vector: FeatureVector,
    scaler: &dyn FeatureScaler,
    writeback: ScaleWriteback,
) -> Result<FeatureVector, LoanError> {
    let positions = FeatureVector::SCALED_POSITIONS;
    if scaler.n_features() != positions.len() {
        return Err(LoanError::shape(
            "scaler input",
            format!("{} columns", positions.len()),
            format!("scaler fitted on {} columns", scaler.n_features()),
        ));
    }

    let sub_vector: Vec<f64> = positions
        .iter()
        .map(|&i| writeback.store(vector.0[i]))
        .collect();
    let mut output = scaler.transform(&[sub_vector])?;
    if output.len() != 1 {
        return Err(LoanError::shape("scaler output", "1 row", output.len()));
    }

    let row = output.remove(0);
    if row.len() != positions.len() {
        return Err(LoanError::shape(
            "scaler output",
            format!("{} columns", positions.len()),
            row.len(),
        ));
    }
    if row.iter().any(|value| !value.is_finite()) {
        return Err(LoanError::Model(format!(
            "scaler produced non-finite values: {:?}",
            row
        )));
    }

    let mut scaled = vector;
    for (&position, value) in positions.iter().zip(row) {
        scaled.0[position] = writeback.store(value);
    }
    Ok(scaled)
}

/// Standardisation parameters exported from a fitted scikit-learn `StandardScaler`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), LoanError> {
        if self.mean.is_empty() {
            return Err(LoanError::Configuration(
                "scaler artifact has no fitted columns".to_string(),
            ));
        }
        if self.mean.len() != self.scale.len() {
            return Err(LoanError::Configuration(format!(
                "scaler artifact has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|value| !value.is_finite())
        {
            return Err(LoanError::Configuration(
                "scaler artifact contains non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LoanError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.mean.len() {
                    return Err(LoanError::shape(
                        "scaler input",
                        format!("{} columns", self.mean.len()),
                        row.len(),
                    ));
                }
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(self.scale.iter()))
                    .map(|(x, (mean, scale))| {
                        // Constant columns are fitted with a zero scale; leave them unit-scaled.
                        let scale = if *scale == 0.0 { 1.0 } else { *scale };
                        (x - mean) / scale
                    })
                    .collect())
            })
            .collect()
    }
}
