//! Loan approval decision pipeline.
//!
//! Applicant attributes are encoded into the fixed 11-position feature layout the
//! stacking ensemble was trained on, the income and loan amount columns are
//! standardised, and the ensemble's approval probability is thresholded at 0.45.

#![deny(unsafe_code)]

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod flow;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod types;

pub use artifacts::{ArtifactPaths, LoadedArtifacts};
pub use classifier::{decide, decide_from_probabilities, ProbabilityModel, APPROVAL_THRESHOLD};
pub use encoder::{encode, property_code};
pub use error::LoanError;
pub use flow::{DecisionFlow, RequestState};
pub use model::{
    BaseEstimator, DecisionTree, LogisticRegression, ModelArchitecture, RandomForest,
    StackingClassifier, TreeNode,
};
pub use pipeline::DecisionPipeline;
pub use scaler::{
    apply_scale, apply_scale_with, FeatureScaler, ScaleWriteback, StandardScaler,
};
pub use types::{
    ApplicantInput, ClassProbabilities, CreditHistory, Decision, DecisionLabel, DecisionRecord,
    Employment, FeatureVector, PropertyArea, RawApplicantForm, FEATURE_COUNT,
    MAX_LOAN_TERM_YEARS, MIN_LOAN_TERM_YEARS,
};
