use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::api::{
    state::AppState,
    types::{ApiResult, CancelResponse, RunRequest, StrategySummary},
};
use crate::domain::StrategyKind;
use crate::error::FinAgentError;
use crate::sequencer::{CancelFlag, StrategyRun};

/// GET /api/strategies
pub async fn list_strategies(State(state): State<AppState>) -> Json<Vec<StrategySummary>> {
    let summaries = StrategyKind::ALL
        .iter()
        .filter_map(|kind| state.sequencers.get(kind))
        .map(|seq| StrategySummary::new(seq.plan(), &seq.snapshot(), seq.is_running()))
        .collect();
    Json(summaries)
}

/// POST /api/strategies/:kind/run
///
/// Validates the amount and claims the sequencer before answering; the steps
/// themselves run in the background.
pub async fn run_strategy(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Option<Json<RunRequest>>,
) -> ApiResult<(StatusCode, Json<StrategyRun>)> {
    let sequencer = state.sequencer(&kind)?.clone();
    let amount = body.and_then(|Json(req)| req.amount_text());

    let prepared = sequencer.start(amount.as_deref(), CancelFlag::new())?;
    let snapshot = sequencer.snapshot();
    let run_id = prepared.run_id();

    tokio::spawn(async move {
        match prepared.execute().await {
            Ok(outcome) => info!(run_id = %run_id, "{}", outcome.message),
            Err(FinAgentError::Cancelled) => info!(run_id = %run_id, "Run cancelled"),
            Err(e) => warn!(run_id = %run_id, "Run ended with error: {}", e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /api/strategies/:kind/status
pub async fn strategy_status(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<StrategyRun>> {
    Ok(Json(state.sequencer(&kind)?.snapshot()))
}

/// POST /api/strategies/:kind/cancel
pub async fn cancel_strategy(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let cancelled = state.sequencer(&kind)?.cancel_active();
    Ok(Json(CancelResponse { cancelled }))
}
