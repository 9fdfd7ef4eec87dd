//! Reputation lookup and credential issuance endpoints.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::AgentConfig;
use crate::domain::{CredentialRequest, CredentialResponse, ReputationRequest, ReputationResponse};
use crate::error::{FinAgentError, Result};

#[derive(Clone)]
pub struct AgentApiClient {
    http: Client,
    reputation_url: String,
    credentials_url: String,
}

impl AgentApiClient {
    pub fn new(reputation_url: &str, credentials_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent("finagent-agent/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                FinAgentError::Internal(format!("failed to build agent HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            reputation_url: reputation_url.to_string(),
            credentials_url: credentials_url.to_string(),
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(&config.reputation_url, &config.credentials_url)
    }

    /// Ask the reputation agent about an on-chain address
    pub async fn lookup_reputation(&self, address: &str) -> Result<ReputationResponse> {
        let address = address.trim();
        if address.is_empty() {
            return Err(FinAgentError::Validation("address is required".to_string()));
        }

        self.post_json(
            &self.reputation_url,
            &ReputationRequest {
                address: address.to_string(),
            },
        )
        .await
    }

    /// Request a credential badge for an email recipient
    pub async fn issue_credential(&self, email: &str) -> Result<CredentialResponse> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(FinAgentError::Validation(format!(
                "invalid email address: '{}'",
                email
            )));
        }

        self.post_json(
            &self.credentials_url,
            &CredentialRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R> {
        debug!("POST {}", url);

        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            error!("Agent API {} failed: {} - {}", url, status, text);
            return Err(FinAgentError::Upstream {
                status: status.as_u16(),
                message: format!("HTTP error! status: {}", status.as_u16()),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            FinAgentError::UnexpectedResponse(format!("invalid response from {}: {}", url, e))
        })
    }
}
