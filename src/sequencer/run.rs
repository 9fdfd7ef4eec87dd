use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::{Step, StepStatus, StepTransition, StrategyKind, StrategyPlan};
use crate::error::{FinAgentError, Result};

/// Lifecycle of a strategy run as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No run yet, or reset after cooldown
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunPhase::Succeeded | RunPhase::Failed | RunPhase::Cancelled
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// In-memory state of one strategy surface: the step list plus the amount
/// of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: StrategyKind,
    pub run_id: Option<Uuid>,
    pub amount: Option<String>,
    pub phase: RunPhase,
    pub steps: Vec<Step>,
    pub success_message: Option<String>,
    pub error: Option<String>,
    pub transitions: Vec<StepTransition>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StrategyRun {
    pub fn new(plan: &StrategyPlan) -> Self {
        Self {
            strategy: plan.kind,
            run_id: None,
            amount: None,
            phase: RunPhase::Idle,
            steps: plan.initial_steps(),
            success_message: None,
            error: None,
            transitions: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub(crate) fn begin(&mut self, run_id: Uuid, amount: &str) {
        for step in &mut self.steps {
            step.reset();
        }
        self.run_id = Some(run_id);
        self.amount = Some(amount.trim().to_string());
        self.phase = RunPhase::Running;
        self.success_message = None;
        self.error = None;
        self.transitions.clear();
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    /// Move a step to a new status, enforcing the step transition table.
    pub fn set_step_status(
        &mut self,
        number: u32,
        status: StepStatus,
        tx_hash: Option<String>,
    ) -> Result<()> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.number == number)
            .ok_or_else(|| FinAgentError::Internal(format!("no step numbered {}", number)))?;

        if !step.status.can_transition_to(status) {
            return Err(FinAgentError::InvalidStepTransition {
                from: step.status.to_string(),
                to: status.to_string(),
            });
        }

        let from = step.status;
        step.status = status;
        if tx_hash.is_some() {
            step.tx_hash = tx_hash;
        }
        self.transitions
            .push(StepTransition::new(number, from, status));
        Ok(())
    }

    pub(crate) fn succeed(&mut self, message: String) {
        self.phase = RunPhase::Succeeded;
        self.success_message = Some(message);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.phase = RunPhase::Failed;
        self.error = Some(message);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn cancel(&mut self) {
        self.phase = RunPhase::Cancelled;
        self.error = Some("Run cancelled".to_string());
        self.finished_at = Some(Utc::now());
    }

    /// The run's future was dropped mid-flight; the outcome of the step that
    /// was loading is unknown.
    pub(crate) fn abandon(&mut self) {
        let loading: Vec<u32> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Loading)
            .map(|s| s.number)
            .collect();
        for number in loading {
            let _ = self.set_step_status(number, StepStatus::Error, None);
        }
        self.phase = RunPhase::Cancelled;
        self.error = Some("Run abandoned before completion".to_string());
        self.finished_at = Some(Utc::now());
    }

    /// Revert every step to pending and clear the amount
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.reset();
        }
        self.run_id = None;
        self.amount = None;
        self.phase = RunPhase::Idle;
        self.success_message = None;
        self.error = None;
        self.transitions.clear();
        self.started_at = None;
        self.finished_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn loading_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Loading)
            .count()
    }

    /// Steps that reached a terminal status this run
    pub fn settled_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_terminal()).count()
    }

    /// Step currently waiting on the endpoint
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Loading)
    }

    pub fn completed_transactions(&self) -> Vec<(u32, &str)> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Complete)
            .filter_map(|s| s.tx_hash.as_deref().map(|tx| (s.number, tx)))
            .collect()
    }

    pub fn has_completed_transactions(&self) -> bool {
        !self.completed_transactions().is_empty()
    }

    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }
}
