//! HTTP client for the lending action endpoint.
//!
//! One POST per action, no retries: the sequencer owns the step bookkeeping
//! and decides what a failure means for the rest of the run.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LendingConfig;
use crate::domain::{LendingReceipt, LendingRequest, PoolInfo, PoolLendReceipt, PoolLendRequest};
use crate::error::{FinAgentError, Result};
use crate::gateway::LendingGateway;

#[derive(Clone)]
pub struct LendingApiClient {
    http: Client,
    endpoint: String,
    pools_url: Option<String>,
    lend_url: Option<String>,
}

impl LendingApiClient {
    pub fn new(endpoint: &str, pools_url: Option<&str>, timeout: Duration) -> Result<Self> {
        url::Url::parse(endpoint).map_err(|e| {
            FinAgentError::Validation(format!("invalid lending endpoint '{}': {}", endpoint, e))
        })?;

        let http = Client::builder()
            .user_agent("finagent-lending/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                FinAgentError::Internal(format!("failed to build lending HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            pools_url: pools_url.map(str::to_string),
            lend_url: None,
        })
    }

    /// Enable pool-targeted lends against `url`
    pub fn with_lend_url(mut self, url: &str) -> Self {
        self.lend_url = Some(url.to_string());
        self
    }

    pub fn from_config(config: &LendingConfig) -> Result<Self> {
        let client = Self::new(
            &config.endpoint,
            config.pools_url.as_deref(),
            Duration::from_millis(config.timeout_ms),
        )?;
        Ok(match config.lend_url.as_deref() {
            Some(url) => client.with_lend_url(url),
            None => client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Pull a human-readable message out of an error body
    fn error_message(status: StatusCode, body: &str) -> String {
        let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        });

        from_json
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()))
    }

    fn parse_receipt(body: &str) -> Result<LendingReceipt> {
        let receipt: LendingReceipt = serde_json::from_str(body).map_err(|e| {
            FinAgentError::UnexpectedResponse(format!("invalid lending response: {}", e))
        })?;

        if receipt.is_rejected() {
            return Err(FinAgentError::LendingRejected {
                status: StatusCode::OK.as_u16(),
                message: "Lending endpoint reported failure".to_string(),
            });
        }

        Ok(receipt)
    }
}

#[async_trait]
impl LendingGateway for LendingApiClient {
    fn name(&self) -> &'static str {
        "lending-api"
    }

    fn is_dry_run(&self) -> bool {
        false
    }

    async fn execute(&self, request: &LendingRequest) -> Result<LendingReceipt> {
        debug!("POST {} {:?}", self.endpoint, request);

        let resp = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FinAgentError::RateLimited(format!(
                "lending endpoint rate limited {} {}",
                request.action, request.amount
            )));
        }

        if !status.is_success() {
            let message = Self::error_message(status, &text);
            warn!(
                "Lending {} {} failed: status={} body={}",
                request.action, request.amount, status, text
            );
            return Err(FinAgentError::LendingRejected {
                status: status.as_u16(),
                message,
            });
        }

        Self::parse_receipt(&text)
    }

    async fn list_pools(&self) -> Result<Vec<PoolInfo>> {
        let url = self.pools_url.as_deref().ok_or_else(|| {
            FinAgentError::Validation("lending.pools_url is not configured".to_string())
        })?;

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(FinAgentError::LendingRejected {
                status: status.as_u16(),
                message: Self::error_message(status, &text),
            });
        }

        let root: Value = serde_json::from_str(&text)?;
        let pools = root
            .get("pools")
            .cloned()
            .ok_or_else(|| FinAgentError::UnexpectedResponse("missing 'pools' field".into()))?;

        Ok(serde_json::from_value(pools)?)
    }

    async fn lend(&self, request: &PoolLendRequest) -> Result<PoolLendReceipt> {
        let url = self.lend_url.as_deref().ok_or_else(|| {
            FinAgentError::Validation("lending.lend_url is not configured".to_string())
        })?;
        debug!("POST {} {:?}", url, request);

        let resp = self.http.post(url).json(request).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FinAgentError::RateLimited(format!(
                "lend rate limited {} {}",
                request.token_amount, request.asset
            )));
        }

        if !status.is_success() {
            return Err(FinAgentError::LendingRejected {
                status: status.as_u16(),
                message: Self::error_message(status, &text),
            });
        }

        let receipt: PoolLendReceipt = serde_json::from_str(&text).map_err(|e| {
            FinAgentError::UnexpectedResponse(format!("invalid lend response: {}", e))
        })?;

        if !receipt.success {
            warn!(
                "Lend {} {} into {} failed: {:?}",
                request.token_amount, request.asset, request.pool_address, receipt.error
            );
            return Err(FinAgentError::LendingRejected {
                status: status.as_u16(),
                message: receipt
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Lending endpoint reported failure".to_string()),
            });
        }

        Ok(receipt)
    }
}
