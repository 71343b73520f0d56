use thiserror::Error;

/// Loan decision pipeline errors.
#[derive(Debug, Error)]
pub enum LoanError {
    /// Missing or corrupt model/scaler artifact. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid value '{value}' for {field}; expected one of: {expected}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch in {stage}: expected {expected}, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl LoanError {
    pub fn shape(stage: &'static str, expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            stage,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn state_violation(expected: &str, actual: &str) -> Self {
        Self::InvariantViolation(format!(
            "request state violation: expected '{}', got '{}'",
            expected, actual
        ))
    }

    /// True for errors caused by the submitted applicant data rather than the
    /// loaded artifacts.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidEnum { .. } | Self::InvalidInput(_))
    }
}
