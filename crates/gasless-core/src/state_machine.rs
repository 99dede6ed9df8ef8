use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Idle,
    Validating,
    Signing,
    Relaying,
    Confirming,
    Completed,
    Failed,
}

impl SubmissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Completed | SubmissionStatus::Failed)
    }

    /// Whether a submission is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, SubmissionStatus::Idle) && !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionAction {
    Start,
    Validated,
    Signed,
    Submitted,
    Confirmed,
    Fail,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal submission transition: {from:?} --{action:?}-->")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub action: SubmissionAction,
}

pub fn submission_transition(
    from: SubmissionStatus,
    action: SubmissionAction,
) -> Result<(SubmissionStatus, &'static str), TransitionError> {
    use SubmissionAction as A;
    use SubmissionStatus as S;

    let next = match (from, action) {
        (S::Idle, A::Start) => (S::Validating, "submission started"),
        (S::Validating, A::Validated) => (S::Signing, "inputs validated"),
        (S::Signing, A::Signed) => (S::Relaying, "payload signed"),
        (S::Relaying, A::Submitted) => (S::Confirming, "submitted to relay"),
        (S::Confirming, A::Confirmed) => (S::Completed, "transaction confirmed"),
        (s, A::Fail) if !s.is_terminal() && s != S::Idle => (S::Failed, "submission aborted"),
        (s, A::Reset) if s.is_terminal() => (S::Idle, "ready"),
        _ => return Err(TransitionError { from, action }),
    };
    Ok(next)
}
