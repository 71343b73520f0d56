use crate::error::LoanError;

/// Lifecycle of one form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Decided,
}

impl RequestState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Decided => "decided",
        }
    }
}

/// Enforces the single pending->decided transition per request.
///
/// A new submission starts a fresh flow; a decided flow never changes again.
#[derive(Debug, Clone)]
pub struct DecisionFlow {
    trace_id: String,
    state: RequestState,
}

impl DecisionFlow {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            state: RequestState::Pending,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn mark_decided(&mut self) -> Result<(), LoanError> {
        if self.state != RequestState::Pending {
            return Err(LoanError::state_violation(
                RequestState::Pending.name(),
                self.state.name(),
            ));
        }
        self.state = RequestState::Decided;
        Ok(())
    }
}
