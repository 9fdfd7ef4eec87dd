use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::domain::StrategyKind;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub lending: LendingConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub sequencer: SequencerSettings,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LendingConfig {
    /// Lending action endpoint (POST {action, amount})
    pub endpoint: String,
    /// Pool listing endpoint (GET)
    #[serde(default)]
    pub pools_url: Option<String>,
    /// Pool-targeted lend endpoint (POST)
    #[serde(default)]
    pub lend_url: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Use the offline gateway instead of the endpoint
    #[serde(default)]
    pub dry_run: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Reputation lookup endpoint (POST {address})
    pub reputation_url: String,
    /// Credential issuance endpoint (POST {email})
    pub credentials_url: String,
    /// Chat WebSocket endpoint
    pub chat_ws_url: String,
    /// Recipient used when no email is given on the command line
    #[serde(default)]
    pub credential_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequencerSettings {
    /// Pause between consecutive steps in milliseconds
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Time after a successful run before the steps revert to pending
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Fraction of the principal borrowed by leveraged strategies (e.g., 0.3 = 30%)
    #[serde(default = "default_borrow_fraction")]
    pub borrow_fraction: f64,
    /// Per-strategy fraction overrides keyed by strategy name
    #[serde(default)]
    pub fraction_overrides: HashMap<String, f64>,
}

fn default_step_delay_ms() -> u64 {
    1_000
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_borrow_fraction() -> f64 {
    0.3
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            cooldown_ms: default_cooldown_ms(),
            borrow_fraction: default_borrow_fraction(),
            fraction_overrides: HashMap::new(),
        }
    }
}

impl SequencerSettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Borrow fraction for a strategy, honoring overrides
    pub fn fraction_for(&self, kind: StrategyKind) -> f64 {
        self.fraction_overrides
            .get(kind.as_str())
            .copied()
            .unwrap_or(self.borrow_fraction)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    /// Block explorer used for transaction and address links
    #[serde(default = "default_explorer_url")]
    pub base_url: String,
}

fn default_explorer_url() -> String {
    "https://sepolia.etherscan.io".to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_explorer_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();

        let builder = Config::builder()
            // Start with default values
            .set_default("lending.endpoint", "http://localhost:5328/aave")?
            .set_default("lending.pools_url", "http://localhost:5328/api/lending/pools")?
            .set_default("lending.lend_url", "http://localhost:5328/api/lending/lend")?
            .set_default("agent.reputation_url", "http://localhost:5328/api/reputation")?
            .set_default("agent.credentials_url", "http://localhost:5328/api/credentials")?
            .set_default("agent.chat_ws_url", "ws://localhost:5328/ws/chat")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FINAGENT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FINAGENT__LENDING__ENDPOINT, etc.)
            .add_source(
                Environment::with_prefix("FINAGENT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(dry_run: bool) -> Self {
        Self {
            lending: LendingConfig {
                endpoint: "http://localhost:5328/aave".to_string(),
                pools_url: Some("http://localhost:5328/api/lending/pools".to_string()),
                lend_url: Some("http://localhost:5328/api/lending/lend".to_string()),
                timeout_ms: default_timeout_ms(),
                dry_run,
            },
            agent: AgentConfig {
                reputation_url: "http://localhost:5328/api/reputation".to_string(),
                credentials_url: "http://localhost:5328/api/credentials".to_string(),
                chat_ws_url: "ws://localhost:5328/ws/chat".to_string(),
                credential_email: None,
            },
            sequencer: SequencerSettings::default(),
            explorer: ExplorerConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("lending.endpoint", &self.lending.endpoint),
            ("agent.reputation_url", &self.agent.reputation_url),
            ("agent.credentials_url", &self.agent.credentials_url),
            ("agent.chat_ws_url", &self.agent.chat_ws_url),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{name} is not a valid URL: {value}"));
            }
        }

        for (name, value) in [
            ("lending.pools_url", &self.lending.pools_url),
            ("lending.lend_url", &self.lending.lend_url),
        ] {
            if let Some(value) = value {
                if url::Url::parse(value).is_err() {
                    errors.push(format!("{name} is not a valid URL: {value}"));
                }
            }
        }

        if self.lending.timeout_ms == 0 {
            errors.push("lending.timeout_ms must be positive".to_string());
        }

        let fraction_ok = |f: f64| f.is_finite() && f > 0.0 && f <= 1.0;
        if !fraction_ok(self.sequencer.borrow_fraction) {
            errors.push("sequencer.borrow_fraction must be in (0, 1]".to_string());
        }

        for (name, fraction) in &self.sequencer.fraction_overrides {
            if name.parse::<StrategyKind>().is_err() {
                errors.push(format!("sequencer.fraction_overrides: unknown strategy '{name}'"));
            }
            if !fraction_ok(*fraction) {
                errors.push(format!(
                    "sequencer.fraction_overrides.{name} must be in (0, 1]"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
