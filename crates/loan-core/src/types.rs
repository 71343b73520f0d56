use crate::error::LoanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shortest and longest loan terms the form accepts, in years.
pub const MIN_LOAN_TERM_YEARS: u32 = 1;
pub const MAX_LOAN_TERM_YEARS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditHistory {
    Yes,
    No,
}

impl CreditHistory {
    pub const ALL: [Self; 2] = [Self::Yes, Self::No];

    pub fn parse(value: &str) -> Result<Self, LoanError> {
        match value {
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            other => Err(LoanError::InvalidEnum {
                field: "credit_history",
                value: other.to_string(),
                expected: "Yes, No",
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Employment {
    Salaried,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
}

impl Employment {
    pub const ALL: [Self; 2] = [Self::Salaried, Self::SelfEmployed];

    pub fn parse(value: &str) -> Result<Self, LoanError> {
        match value {
            "Salaried" => Ok(Self::Salaried),
            "Self-Employed" => Ok(Self::SelfEmployed),
            other => Err(LoanError::InvalidEnum {
                field: "employment",
                value: other.to_string(),
                expected: "Salaried, Self-Employed",
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Salaried => "Salaried",
            Self::SelfEmployed => "Self-Employed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyArea {
    Urban,
    #[serde(rename = "Semi-Urban")]
    SemiUrban,
    Rural,
}

impl PropertyArea {
    pub const ALL: [Self; 3] = [Self::Urban, Self::SemiUrban, Self::Rural];

    pub fn parse(value: &str) -> Result<Self, LoanError> {
        match value {
            "Urban" => Ok(Self::Urban),
            "Semi-Urban" => Ok(Self::SemiUrban),
            "Rural" => Ok(Self::Rural),
            other => Err(LoanError::InvalidEnum {
                field: "property_area",
                value: other.to_string(),
                expected: "Urban, Semi-Urban, Rural",
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urban => "Urban",
            Self::SemiUrban => "Semi-Urban",
            Self::Rural => "Rural",
        }
    }

    /// Ordinal code the classifier was trained on.
    pub fn code(self) -> f64 {
        match self {
            Self::Urban => 2.0,
            Self::SemiUrban => 1.0,
            Self::Rural => 0.0,
        }
    }
}

/// Applicant attributes collected by the form. Consumed once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantInput {
    pub applicant_income: f64,
    pub coapplicant_income: f64,
    pub loan_amount: f64,
    pub loan_term_years: u32,
    pub credit_history: CreditHistory,
    pub employment: Employment,
    pub property_area: PropertyArea,
}

impl ApplicantInput {
    /// Enforces the input-boundary constraints before anything is encoded.
    pub fn validate(&self) -> Result<(), LoanError> {
        non_negative("applicant_income", self.applicant_income)?;
        non_negative("coapplicant_income", self.coapplicant_income)?;
        non_negative("loan_amount", self.loan_amount)?;

        if !(MIN_LOAN_TERM_YEARS..=MAX_LOAN_TERM_YEARS).contains(&self.loan_term_years) {
            return Err(LoanError::InvalidInput(format!(
                "loan_term_years must be between {} and {}, got {}",
                MIN_LOAN_TERM_YEARS, MAX_LOAN_TERM_YEARS, self.loan_term_years
            )));
        }

        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), LoanError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LoanError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Untyped form submission, exactly as posted by the HTML form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawApplicantForm {
    pub applicant_income: String,
    pub coapplicant_income: String,
    pub loan_amount: String,
    pub loan_term_years: String,
    pub credit_history: String,
    pub employment: String,
    pub property_area: String,
}

impl Default for RawApplicantForm {
    fn default() -> Self {
        Self {
            applicant_income: "0".to_string(),
            coapplicant_income: "0".to_string(),
            loan_amount: "0".to_string(),
            loan_term_years: MIN_LOAN_TERM_YEARS.to_string(),
            credit_history: CreditHistory::Yes.as_str().to_string(),
            employment: Employment::Salaried.as_str().to_string(),
            property_area: PropertyArea::Urban.as_str().to_string(),
        }
    }
}

impl RawApplicantForm {
    pub fn to_input(&self) -> Result<ApplicantInput, LoanError> {
        let input = ApplicantInput {
            applicant_income: parse_amount("applicant_income", &self.applicant_income)?,
            coapplicant_income: parse_amount("coapplicant_income", &self.coapplicant_income)?,
            loan_amount: parse_amount("loan_amount", &self.loan_amount)?,
            loan_term_years: self.loan_term_years.trim().parse::<u32>().map_err(|_| {
                LoanError::InvalidInput(format!(
                    "loan_term_years must be a whole number of years, got '{}'",
                    self.loan_term_years
                ))
            })?,
            credit_history: CreditHistory::parse(self.credit_history.trim())?,
            employment: Employment::parse(self.employment.trim())?,
            property_area: PropertyArea::parse(self.property_area.trim())?,
        };
        input.validate()?;
        Ok(input)
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<f64, LoanError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| LoanError::InvalidInput(format!("{} must be a number, got '{}'", field, raw)))
}

/// Number of model inputs. Fixed by the training schema.
pub const FEATURE_COUNT: usize = 11;

/// Fixed-order model input.
///
/// Position order is a contract with the trained classifier and must never change:
/// `[1, 1, 0, 1, employment, applicant_income, coapplicant_income, loan_amount,
///   loan_term_months, credit_history, property_area]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Training-time columns that this form does not expose.
    pub const PLACEHOLDERS: [f64; 4] = [1.0, 1.0, 0.0, 1.0];

    pub const EMPLOYMENT: usize = 4;
    pub const APPLICANT_INCOME: usize = 5;
    pub const COAPPLICANT_INCOME: usize = 6;
    pub const LOAN_AMOUNT: usize = 7;
    pub const LOAN_TERM_MONTHS: usize = 8;
    pub const CREDIT_HISTORY: usize = 9;
    pub const PROPERTY_AREA: usize = 10;

    /// The only positions the scaler touches.
    pub const SCALED_POSITIONS: [usize; 3] = [
        Self::APPLICANT_INCOME,
        Self::COAPPLICANT_INCOME,
        Self::LOAN_AMOUNT,
    ];

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, position: usize) -> Option<f64> {
        self.0.get(position).copied()
    }

    pub fn to_row(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLabel {
    Approved,
    Rejected,
}

impl DecisionLabel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Approved => "Loan Approved",
            Self::Rejected => "Loan Rejected",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::Approved => {
                "Based on income, credit history, loan term, and combined predictions \
                 from multiple models, the applicant is likely to repay the loan. \
                 Hence, the system recommends loan approval."
            }
            Self::Rejected => {
                "Based on income, credit history, loan term, and combined predictions \
                 from multiple models, the applicant is unlikely to repay the loan. \
                 Hence, the system recommends loan rejection."
            }
        }
    }
}

/// One row of classifier output. Index 0 is Rejected, index 1 is Approved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub rejected: f64,
    pub approved: f64,
}

impl ClassProbabilities {
    pub fn from_row(row: &[f64]) -> Result<Self, LoanError> {
        if row.len() != 2 {
            return Err(LoanError::shape("classifier output", "2 classes", row.len()));
        }
        if row.iter().any(|p| !p.is_finite()) {
            return Err(LoanError::Model(format!(
                "classifier returned non-finite probabilities: {:?}",
                row
            )));
        }
        Ok(Self {
            rejected: row[0],
            approved: row[1],
        })
    }

    pub fn max(&self) -> f64 {
        self.approved.max(self.rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub label: DecisionLabel,
    /// Highest class probability as a percentage, in `[0, 100]`.
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

impl Decision {
    /// Confidence rounded to two decimals, as shown to the applicant.
    pub fn confidence_display(&self) -> String {
        format!("{:.2}", self.confidence)
    }

    /// False inside the window where the label is Approved but the Rejected
    /// class carries more probability mass, so the reported confidence belongs
    /// to the other class.
    pub fn confidence_matches_label(&self) -> bool {
        match self.label {
            DecisionLabel::Approved => self.probabilities.approved >= self.probabilities.rejected,
            DecisionLabel::Rejected => self.probabilities.rejected >= self.probabilities.approved,
        }
    }
}

/// Full outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub trace_id: String,
    pub input: ApplicantInput,
    pub features: FeatureVector,
    pub scaled_features: FeatureVector,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RawApplicantForm {
        RawApplicantForm {
            applicant_income: "5000".to_string(),
            coapplicant_income: "0".to_string(),
            loan_amount: "128".to_string(),
            loan_term_years: "30".to_string(),
            credit_history: "Yes".to_string(),
            employment: "Salaried".to_string(),
            property_area: "Urban".to_string(),
        }
    }

    #[test]
    fn raw_form_parses_into_typed_input() {
        let input = form().to_input().unwrap();
        assert_eq!(input.applicant_income, 5000.0);
        assert_eq!(input.loan_term_years, 30);
        assert_eq!(input.credit_history, CreditHistory::Yes);
        assert_eq!(input.employment, Employment::Salaried);
        assert_eq!(input.property_area, PropertyArea::Urban);
    }

    #[test]
    fn unknown_property_area_is_invalid_enum() {
        let mut raw = form();
        raw.property_area = "Suburban".to_string();
        let err = raw.to_input().unwrap_err();
        assert!(matches!(
            err,
            LoanError::InvalidEnum {
                field: "property_area",
                ..
            }
        ));
        assert!(err.is_user_error());
    }

    #[test]
    fn enum_spellings_are_exact() {
        assert!(Employment::parse("self-employed").is_err());
        assert!(CreditHistory::parse("yes").is_err());
        assert_eq!(
            PropertyArea::parse("Semi-Urban").unwrap(),
            PropertyArea::SemiUrban
        );
    }

    #[test]
    fn loan_term_bounds_are_enforced() {
        let mut raw = form();
        raw.loan_term_years = "0".to_string();
        assert!(raw.to_input().is_err());

        raw.loan_term_years = "31".to_string();
        let err = raw.to_input().unwrap_err();
        assert!(err.to_string().contains("between 1 and 30"));

        raw.loan_term_years = "2.5".to_string();
        assert!(raw.to_input().is_err());
    }

    #[test]
    fn negative_and_non_numeric_amounts_are_rejected() {
        let mut raw = form();
        raw.loan_amount = "-1".to_string();
        assert!(matches!(
            raw.to_input().unwrap_err(),
            LoanError::InvalidInput(_)
        ));

        raw.loan_amount = "lots".to_string();
        assert!(matches!(
            raw.to_input().unwrap_err(),
            LoanError::InvalidInput(_)
        ));

        raw.loan_amount = "NaN".to_string();
        assert!(raw.to_input().is_err());
    }

    #[test]
    fn enums_use_display_spelling_on_the_wire() {
        let json = serde_json::to_string(&Employment::SelfEmployed).unwrap();
        assert_eq!(json, "\"Self-Employed\"");
        let area: PropertyArea = serde_json::from_str("\"Semi-Urban\"").unwrap();
        assert_eq!(area, PropertyArea::SemiUrban);
    }

    #[test]
    fn class_probabilities_require_two_classes() {
        let err = ClassProbabilities::from_row(&[0.2, 0.3, 0.5]).unwrap_err();
        assert!(matches!(err, LoanError::ShapeMismatch { .. }));
        assert!(ClassProbabilities::from_row(&[f64::NAN, 0.5]).is_err());
    }

    #[test]
    fn confidence_display_uses_two_decimals() {
        let decision = Decision {
            label: DecisionLabel::Approved,
            confidence: 71.23456,
            probabilities: ClassProbabilities {
                rejected: 0.2876544,
                approved: 0.7123456,
            },
        };
        assert_eq!(decision.confidence_display(), "71.23");
        assert!(decision.confidence_matches_label());
    }
}
