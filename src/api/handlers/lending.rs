use axum::{extract::State, Json};
use tracing::info;

use crate::api::{
    state::AppState,
    types::{
        ApiResult, LendingActionRequest, LendingActionResponse, PoolLendBody, PoolLendResponse,
        PoolsResponse,
    },
};
use crate::domain::display::explorer_tx_url;
use crate::domain::{parse_principal, LendingRequest};
use crate::error::FinAgentError;

/// POST /api/lending
///
/// One lending action without a step list.
pub async fn execute_action(
    State(state): State<AppState>,
    Json(req): Json<LendingActionRequest>,
) -> ApiResult<Json<LendingActionResponse>> {
    let amount = req.amount_text();
    parse_principal(amount.as_deref())?;

    let request = LendingRequest::new(req.action, amount.unwrap_or_default().trim());
    info!(action = %request.action, amount = %request.amount, "Single lending action");

    let receipt = state.gateway.execute(&request).await?;
    if receipt.is_rejected() {
        return Err(FinAgentError::LendingRejected {
            status: 200,
            message: "Lending endpoint reported failure".to_string(),
        }
        .into());
    }

    Ok(Json(LendingActionResponse {
        explorer_url: explorer_tx_url(&state.explorer_base_url, &receipt.tx_hash),
        tx_hash: receipt.tx_hash,
        success: true,
    }))
}

/// GET /api/lending/pools
pub async fn list_pools(State(state): State<AppState>) -> ApiResult<Json<PoolsResponse>> {
    let pools = state.gateway.list_pools().await?;
    Ok(Json(PoolsResponse { pools }))
}

/// POST /api/lending/lend
///
/// Supply into one of the listed pools.
pub async fn lend_to_pool(
    State(state): State<AppState>,
    Json(body): Json<PoolLendBody>,
) -> ApiResult<Json<PoolLendResponse>> {
    let request = body.into_request();
    request.validate()?;
    info!(
        asset = %request.asset,
        amount = %request.token_amount,
        pool = %request.pool_address,
        "Pool lend"
    );

    let receipt = state.gateway.lend(&request).await?;
    let tx_hash = receipt.transaction_hash.ok_or_else(|| {
        FinAgentError::UnexpectedResponse("lend response has no transaction_hash".to_string())
    })?;

    Ok(Json(PoolLendResponse {
        success: true,
        explorer_url: explorer_tx_url(&state.explorer_base_url, &tx_hash),
        transaction_hash: tx_hash,
        block_number: receipt.block_number,
    }))
}
