use axum::{extract::State, Json};

use crate::api::{state::AppState, types::ApiResult};
use crate::domain::{CredentialRequest, CredentialResponse, ReputationRequest, ReputationResponse};

/// POST /api/reputation
pub async fn lookup_reputation(
    State(state): State<AppState>,
    Json(req): Json<ReputationRequest>,
) -> ApiResult<Json<ReputationResponse>> {
    Ok(Json(state.agent.lookup_reputation(&req.address).await?))
}

/// POST /api/credentials
pub async fn issue_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    Ok(Json(state.agent.issue_credential(&req.email).await?))
}
