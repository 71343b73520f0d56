//! Feature encoding: applicant attributes to the classifier's input layout.

use crate::error::LoanError;
use crate::types::{ApplicantInput, CreditHistory, Employment, FeatureVector, PropertyArea};

/// Months per year. The classifier was trained on month-denominated terms.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Builds the fixed-order feature vector for one applicant.
pub fn encode(input: &ApplicantInput) -> FeatureVector {
    let [p0, p1, p2, p3] = FeatureVector::PLACEHOLDERS;
    FeatureVector([
        p0,
        p1,
        p2,
        p3,
        employment_flag(input.employment),
        input.applicant_income,
        input.coapplicant_income,
        input.loan_amount,
        loan_term_months(input.loan_term_years),
        credit_flag(input.credit_history),
        input.property_area.code(),
    ])
}

pub fn employment_flag(employment: Employment) -> f64 {
    match employment {
        Employment::SelfEmployed => 1.0,
        Employment::Salaried => 0.0,
    }
}

pub fn credit_flag(credit_history: CreditHistory) -> f64 {
    match credit_history {
        CreditHistory::Yes => 1.0,
        CreditHistory::No => 0.0,
    }
}

pub fn loan_term_months(years: u32) -> f64 {
    f64::from(years * MONTHS_PER_YEAR)
}

/// String-level property lookup: `Urban -> 2`, `Semi-Urban -> 1`, `Rural -> 0`.
pub fn property_code(area: &str) -> Result<f64, LoanError> {
    PropertyArea::parse(area).map(PropertyArea::code)
}
