use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single strategy step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started yet
    Pending,
    /// Request sent, waiting for the lending endpoint
    Loading,
    /// Endpoint confirmed the action
    Complete,
    /// Endpoint rejected the action or the request failed
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Loading => "loading",
            StepStatus::Complete => "complete",
            StepStatus::Error => "error",
        }
    }

    /// Check if this status can advance to another status during a run.
    ///
    /// Reverting to `Pending` is not an advance; it only happens when the
    /// whole run is reset.
    pub fn can_transition_to(&self, target: StepStatus) -> bool {
        use StepStatus::*;

        matches!(
            (self, target),
            (Pending, Loading) | (Loading, Complete) | (Loading, Error)
        )
    }

    /// Complete or error; the step will not change again this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Error)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of a multi-step strategy, tracked for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Sequence position, 1-based
    pub number: u32,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Step {
    pub fn new(number: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
            tx_hash: None,
        }
    }

    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.tx_hash = None;
    }
}

/// Step status change (for logging and status display)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
    pub step: u32,
    pub from: StepStatus,
    pub to: StepStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StepTransition {
    pub fn new(step: u32, from: StepStatus, to: StepStatus) -> Self {
        Self {
            step,
            from,
            to,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use StepStatus::*;

        assert!(Pending.can_transition_to(Loading));
        assert!(Loading.can_transition_to(Complete));
        assert!(Loading.can_transition_to(Error));

        assert!(!Pending.can_transition_to(Complete));
        assert!(!Pending.can_transition_to(Error));
        assert!(!Complete.can_transition_to(Pending));
        assert!(!Complete.can_transition_to(Loading));
        assert!(!Error.can_transition_to(Loading));
    }

    #[test]
    fn terminal_statuses() {
        assert!(StepStatus::Complete.is_terminal());
        assert!(StepStatus::Error.is_terminal());
        assert!(!StepStatus::Loading.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
    }

    #[test]
    fn step_serializes_with_lowercase_status() {
        let mut step = Step::new(1, "Initial Supply", "Supply USDC to Aave as collateral");
        step.status = StepStatus::Complete;
        step.tx_hash = Some("0xaaa".to_string());

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["tx_hash"], "0xaaa");

        step.reset();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.tx_hash.is_none());
    }
}
