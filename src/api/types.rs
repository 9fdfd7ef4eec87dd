use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::domain::{LendingAction, PoolInfo, PoolLendRequest, StrategyKind, StrategyPlan};
use crate::error::FinAgentError;
use crate::sequencer::{RunPhase, StrategyRun};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by every handler, rendered as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<FinAgentError> for ApiError {
    fn from(err: FinAgentError) -> Self {
        let status = match &err {
            FinAgentError::Validation(_) => StatusCode::BAD_REQUEST,
            FinAgentError::UnknownStrategy(_) => StatusCode::NOT_FOUND,
            FinAgentError::RunInProgress => StatusCode::CONFLICT,
            FinAgentError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            FinAgentError::LendingRejected { .. }
            | FinAgentError::Upstream { .. }
            | FinAgentError::UnexpectedResponse(_)
            | FinAgentError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("API request failed: {}", err);
        }
        Self::new(status, err.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Strategy Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub action: LendingAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySummary {
    pub kind: StrategyKind,
    pub title: String,
    pub tagline: String,
    pub chat_title: String,
    pub steps: Vec<StepSummary>,
    pub phase: RunPhase,
    pub running: bool,
}

impl StrategySummary {
    pub fn new(plan: &StrategyPlan, run: &StrategyRun, running: bool) -> Self {
        Self {
            kind: plan.kind,
            title: plan.kind.title().to_string(),
            tagline: plan.kind.tagline().to_string(),
            chat_title: plan.kind.chat_title(),
            steps: plan
                .steps
                .iter()
                .enumerate()
                .map(|(idx, template)| StepSummary {
                    number: idx as u32 + 1,
                    title: template.title.clone(),
                    description: template.description.clone(),
                    action: template.action,
                })
                .collect(),
            phase: run.phase,
            running,
        }
    }
}

/// Body of a strategy run request. The amount may arrive as a string or a
/// JSON number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub amount: Option<Value>,
}

impl RunRequest {
    pub fn amount_text(&self) -> Option<String> {
        match self.amount.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

// ============================================================================
// Lending Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LendingActionRequest {
    pub action: LendingAction,
    #[serde(default)]
    pub amount: Option<Value>,
}

impl LendingActionRequest {
    pub fn amount_text(&self) -> Option<String> {
        RunRequest {
            amount: self.amount.clone(),
        }
        .amount_text()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingActionResponse {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    pub success: bool,
    pub explorer_url: String,
}

/// Pool-targeted lend; `tokenAmount` may be a string or a number
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolLendBody {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub token_amount: Option<Value>,
    #[serde(default)]
    pub pool_address: String,
}

impl PoolLendBody {
    pub fn into_request(self) -> PoolLendRequest {
        let amount = RunRequest {
            amount: self.token_amount,
        }
        .amount_text()
        .unwrap_or_default();
        PoolLendRequest::new(self.asset.trim(), amount.trim(), self.pool_address.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolLendResponse {
    pub success: bool,
    pub transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsResponse {
    pub pools: Vec<PoolInfo>,
}

// ============================================================================
// Health Check Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub gateway: String,
    pub dry_run: bool,
    pub uptime_secs: i64,
}
