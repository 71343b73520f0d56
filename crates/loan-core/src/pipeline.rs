use crate::artifacts::LoadedArtifacts;
use crate::classifier::{decide, ProbabilityModel};
use crate::encoder::encode;
use crate::error::LoanError;
use crate::flow::DecisionFlow;
use crate::scaler::{apply_scale_with, FeatureScaler, ScaleWriteback};
use crate::types::{ApplicantInput, DecisionRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// encode -> scale -> classify over injected, read-only artifact handles.
///
/// Cloning is cheap and clones share the same handles.
#[derive(Clone)]
pub struct DecisionPipeline {
    model: Arc<dyn ProbabilityModel>,
    scaler: Arc<dyn FeatureScaler>,
    writeback: ScaleWriteback,
}

impl DecisionPipeline {
    pub fn new(model: Arc<dyn ProbabilityModel>, scaler: Arc<dyn FeatureScaler>) -> Self {
        Self {
            model,
            scaler,
            writeback: ScaleWriteback::Exact,
        }
    }

    pub fn with_writeback(mut self, writeback: ScaleWriteback) -> Self {
        self.writeback = writeback;
        self
    }

    pub fn writeback(&self) -> ScaleWriteback {
        self.writeback
    }

    pub fn from_artifacts(artifacts: &LoadedArtifacts) -> Self {
        Self::new(artifacts.model.clone(), artifacts.scaler.clone())
    }

    /// Runs one applicant through the full pipeline. Errors are never defaulted.
    pub fn evaluate(&self, input: &ApplicantInput) -> Result<DecisionRecord, LoanError> {
        let mut flow = DecisionFlow::new(Uuid::new_v4().to_string());

        input.validate()?;
        let features = encode(input);
        let scaled_features = apply_scale_with(features, self.scaler.as_ref(), self.writeback)?;
        let decision = decide(&scaled_features, self.model.as_ref())?;
        flow.mark_decided()?;

        if !decision.confidence_matches_label() {
            warn!(
                trace_id = flow.trace_id(),
                p_approved = decision.probabilities.approved,
                "approved below even odds; reported confidence belongs to the rejected class"
            );
        }
        info!(
            trace_id = flow.trace_id(),
            label = ?decision.label,
            confidence = %decision.confidence_display(),
            "loan decision"
        );

        Ok(DecisionRecord {
            trace_id: flow.trace_id().to_string(),
            input: input.clone(),
            features,
            scaled_features,
            decision,
            decided_at: Utc::now(),
        })
    }
}
