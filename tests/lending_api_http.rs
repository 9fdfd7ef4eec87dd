mod common;

use axum::{http::StatusCode, routing::get, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use finagent::domain::{LendingAction, LendingRequest, PoolLendRequest};
use finagent::{FinAgentError, LendingApiClient, LendingGateway};

type Recorded = Arc<Mutex<Vec<Value>>>;

async fn backend() -> (std::net::SocketAddr, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);

    let app = Router::new()
        .route(
            "/ok",
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(body);
                    Json(json!({"txHash": "0xaaa"}))
                }
            }),
        )
        .route(
            "/fail-json",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "Insufficient liquidity"})),
                )
            }),
        )
        .route(
            "/fail-plain",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        )
        .route(
            "/rejected",
            post(|| async { Json(json!({"txHash": "0x1", "success": false})) }),
        )
        .route("/garbled", post(|| async { Json(json!({"foo": 1})) }))
        .route(
            "/limited",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route(
            "/lend",
            post(|Json(body): Json<Value>| async move {
                if body["poolAddress"] == "0xpaused" {
                    Json(json!({"success": false, "error": "execution reverted: pool paused"}))
                } else {
                    Json(json!({
                        "success": true,
                        "transaction_hash": format!("0xlend{}", body["tokenAmount"].as_str().unwrap_or("")),
                        "block_number": 7_000_001
                    }))
                }
            }),
        )
        .route(
            "/pools",
            get(|| async {
                Json(json!({
                    "pools": [{
                        "asset": "USDC",
                        "apy": 4.2,
                        "protocol": "Aave V3",
                        "available": 125000.0,
                        "tokenAddress": "0x94a9D9AC8a22534E3FaCa9F4e7F2E2cf85d5E4C8",
                        "poolAddress": "0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951",
                        "priceUSD": 1.0,
                        "riskLevel": "low",
                        "tvl": 5000000.0
                    }]
                }))
            }),
        );

    (common::spawn_server(app).await, recorded)
}

fn client(addr: std::net::SocketAddr, path: &str) -> LendingApiClient {
    LendingApiClient::new(
        &common::http_url(addr, path),
        Some(&common::http_url(addr, "/pools")),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn posts_action_and_amount_and_returns_hash() {
    let (addr, recorded) = backend().await;
    let receipt = client(addr, "/ok")
        .execute(&LendingRequest::new(LendingAction::Borrow, "300"))
        .await
        .unwrap();

    assert_eq!(receipt.tx_hash, "0xaaa");
    assert!(!receipt.is_rejected());
    assert_eq!(
        recorded.lock().unwrap().as_slice(),
        &[json!({"action": "borrow", "amount": "300"})]
    );
}

#[tokio::test]
async fn non_success_status_uses_body_message() {
    let (addr, _) = backend().await;
    let err = client(addr, "/fail-json")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();

    match err {
        FinAgentError::LendingRejected { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Insufficient liquidity");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_without_message_reports_status() {
    let (addr, _) = backend().await;
    let err = client(addr, "/fail-plain")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP error! status: 500");
}

#[tokio::test]
async fn explicit_failure_flag_is_rejected() {
    let (addr, _) = backend().await;
    let err = client(addr, "/rejected")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();
    assert!(matches!(err, FinAgentError::LendingRejected { status: 200, .. }));
}

#[tokio::test]
async fn body_without_hash_is_unexpected() {
    let (addr, _) = backend().await;
    let err = client(addr, "/garbled")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();
    assert!(matches!(err, FinAgentError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn rate_limit_is_distinguished() {
    let (addr, _) = backend().await;
    let err = client(addr, "/limited")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();
    assert!(matches!(err, FinAgentError::RateLimited(_)));
}

#[tokio::test]
async fn lists_pools() {
    let (addr, _) = backend().await;
    let pools = client(addr, "/ok").list_pools().await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].asset, "USDC");
    assert_eq!(pools[0].risk_level, "low");
    assert_eq!(pools[0].price_usd, 1.0);
}

#[tokio::test]
async fn lends_into_pool() {
    let (addr, _) = backend().await;
    let client = client(addr, "/ok").with_lend_url(&common::http_url(addr, "/lend"));

    let receipt = client
        .lend(&PoolLendRequest::new("USDC", "25", "0xpool"))
        .await
        .unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.transaction_hash.as_deref(), Some("0xlend25"));
    assert_eq!(receipt.block_number, Some(7_000_001));

    let err = client
        .lend(&PoolLendRequest::new("USDC", "25", "0xpaused"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "execution reverted: pool paused");
}

#[tokio::test]
async fn lend_without_url_is_unsupported() {
    let (addr, _) = backend().await;
    let err = client(addr, "/ok")
        .lend(&PoolLendRequest::new("USDC", "25", "0xpool"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, "/ok")
        .execute(&LendingRequest::new(LendingAction::Supply, "100"))
        .await
        .unwrap_err();
    assert!(matches!(err, FinAgentError::Http(_)));
}
