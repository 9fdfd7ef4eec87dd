use thiserror::Error;

/// Main error type for the agent service
#[derive(Error, Debug)]
pub enum FinAgentError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Lending endpoint errors
    #[error("{message}")]
    LendingRejected { status: u16, message: String },

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    // Sequencer errors
    #[error("A strategy run is already in progress")]
    RunInProgress,

    #[error("Step {step} ({title}) failed: {message}")]
    StepFailed {
        step: u32,
        title: String,
        message: String,
    },

    #[error("Invalid step transition: from {from} to {to}")]
    InvalidStepTransition { from: String, to: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl FinAgentError {
    /// Message shown to the user when this error ends a run.
    ///
    /// Step failures surface the underlying message only; the step number is
    /// already visible from the step list.
    pub fn user_message(&self) -> String {
        match self {
            FinAgentError::StepFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FinAgentError::Validation(_))
    }
}

/// Result type alias for FinAgentError
pub type Result<T> = std::result::Result<T, FinAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_user_message_is_the_step_message() {
        let err = FinAgentError::StepFailed {
            step: 1,
            title: "Initial Supply".to_string(),
            message: "HTTP error! status: 500".to_string(),
        };
        assert_eq!(err.user_message(), "HTTP error! status: 500");
        assert_eq!(
            err.to_string(),
            "Step 1 (Initial Supply) failed: HTTP error! status: 500"
        );
    }

    #[test]
    fn lending_rejection_displays_backend_message() {
        let err = FinAgentError::LendingRejected {
            status: 400,
            message: "insufficient collateral".to_string(),
        };
        assert_eq!(err.to_string(), "insufficient collateral");
        assert!(!err.is_validation());
        assert!(FinAgentError::Validation("x".into()).is_validation());
    }
}
