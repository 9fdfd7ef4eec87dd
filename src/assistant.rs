//! Scripted reputation assistant.
//!
//! Greets the user, then answers every address it is given with the
//! reputation agent's analysis.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::adapters::AgentApiClient;
use crate::error::Result;

pub const GREETINGS: [&str; 2] = [
    "Hi there!, I am reputation agent. I am ready to help you!",
    "Tell me which address you want to know the reputation of",
];

pub const LOOKUP_FAILED: &str =
    "Sorry, I encountered an error while fetching the reputation. Please try again.";

/// Anything that can describe the reputation of an address
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationSource: Send + Sync {
    async fn reputation_of(&self, address: &str) -> Result<String>;
}

#[async_trait]
impl ReputationSource for AgentApiClient {
    async fn reputation_of(&self, address: &str) -> Result<String> {
        Ok(self.lookup_reputation(address).await?.reputation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatLine {
    fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

pub struct ReputationAssistant<S> {
    source: S,
    transcript: Vec<ChatLine>,
}

impl<S: ReputationSource> ReputationAssistant<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            transcript: GREETINGS.iter().map(|g| ChatLine::assistant(*g)).collect(),
        }
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    /// Answer one user message. Blank input is ignored and returns `None`.
    pub async fn ask(&mut self, input: &str) -> Option<String> {
        let address = input.trim();
        if address.is_empty() {
            return None;
        }

        self.transcript.push(ChatLine {
            speaker: Speaker::User,
            text: address.to_string(),
        });

        let reply = match self.source.reputation_of(address).await {
            Ok(reputation) => {
                debug!(address, "Reputation received");
                format!("Reputation analysis for {}:\n{}", address, reputation)
            }
            Err(e) => {
                warn!(address, "Reputation lookup failed: {}", e);
                LOOKUP_FAILED.to_string()
            }
        };

        self.transcript.push(ChatLine::assistant(reply.clone()));
        Some(reply)
    }
}
