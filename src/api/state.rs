use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::AgentApiClient;
use crate::config::{AppConfig, SequencerSettings};
use crate::domain::StrategyKind;
use crate::error::{FinAgentError, Result};
use crate::gateway::{build_lending_gateway, LendingGateway};
use crate::sequencer::StepSequencer;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// One sequencer per strategy surface
    pub sequencers: Arc<HashMap<StrategyKind, StepSequencer>>,

    /// Gateway used by strategy runs and single lending actions
    pub gateway: Arc<dyn LendingGateway>,

    /// Reputation and credential endpoints
    pub agent: Arc<AgentApiClient>,

    /// Block explorer used for transaction links
    pub explorer_base_url: Arc<str>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn LendingGateway>,
        agent: AgentApiClient,
        settings: &SequencerSettings,
        explorer_base_url: &str,
    ) -> Self {
        let sequencers = StrategyKind::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    StepSequencer::for_strategy(*kind, settings, Arc::clone(&gateway)),
                )
            })
            .collect();

        Self {
            sequencers: Arc::new(sequencers),
            gateway,
            agent: Arc::new(agent),
            explorer_base_url: Arc::from(explorer_base_url),
            start_time: Utc::now(),
        }
    }

    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let gateway = build_lending_gateway(config, dry_run)?;
        let agent = AgentApiClient::from_config(&config.agent)?;
        Ok(Self::new(
            gateway,
            agent,
            &config.sequencer,
            &config.explorer.base_url,
        ))
    }

    /// Resolve a strategy name from the URL to its sequencer
    pub fn sequencer(&self, name: &str) -> Result<&StepSequencer> {
        let kind: StrategyKind = name.parse()?;
        self.sequencers
            .get(&kind)
            .ok_or_else(|| FinAgentError::UnknownStrategy(name.to_string()))
    }

    /// Get system uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
