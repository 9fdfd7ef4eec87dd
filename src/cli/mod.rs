//! finagent CLI
//!
//! Commands:
//! - `finagent strategies` - List strategy surfaces and their steps
//! - `finagent run <kind> <amount>` - Execute a strategy step by step
//! - `finagent act <action> <amount>` - Send one lending action
//! - `finagent pools` - List lending pools
//! - `finagent reputation [address]` - Ask the reputation agent
//! - `finagent credential` - Issue a credential badge
//! - `finagent chat` - Talk to a strategy agent
//! - `finagent serve` - Run the HTTP API

pub mod agent;
pub mod lending;
pub mod output;
pub mod strategy;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use output::OutputMode;

/// Financial agent CLI
#[derive(Parser, Debug)]
#[command(name = "finagent")]
#[command(author, version, about = "Multi-step lending strategies with reputation and credential agents")]
pub struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, global = true, default_value = "config", env = "FINAGENT_CONFIG_DIR")]
    pub config: PathBuf,

    /// Use the offline gateway instead of the lending endpoint
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available strategies
    Strategies,

    /// Execute every step of a strategy
    Run {
        /// Strategy name (bearish, buffet, bullish, moon, leveraged)
        kind: String,

        /// Principal in USDC
        amount: String,
    },

    /// Send a single lending action
    Act {
        /// supply, borrow, repay or withdraw
        action: String,

        /// Amount in USDC
        amount: String,
    },

    /// List lending pools
    Pools,

    /// Supply into a listed pool
    Lend {
        /// Asset symbol, e.g. USDC
        asset: String,

        /// Token amount
        amount: String,

        /// Pool contract address
        #[arg(long)]
        pool: String,
    },

    /// Look up the reputation of an address (interactive when omitted)
    Reputation { address: Option<String> },

    /// Issue a credential badge
    Credential {
        /// Recipient email (defaults to agent.credential_email)
        #[arg(long)]
        email: Option<String>,
    },

    /// Chat with a strategy agent
    Chat {
        #[arg(long, default_value = "bullish")]
        strategy: String,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }

    /// Load and validate configuration, applying the `--dry-run` flag
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load_from(&self.config)?;
        if self.dry_run {
            config.lending.dry_run = true;
        }
        if let Err(errors) = config.validate() {
            bail!("invalid configuration:\n  {}", errors.join("\n  "));
        }
        Ok(config)
    }

    pub async fn run(self, config: AppConfig) -> Result<()> {
        let mode = self.output_mode();
        let dry_run = config.lending.dry_run;

        match self.command {
            Commands::Strategies => strategy::list_strategies(&config, mode),
            Commands::Run { kind, amount } => {
                strategy::run_strategy(&config, dry_run, &kind, &amount, mode).await
            }
            Commands::Act { action, amount } => {
                lending::execute_action(&config, dry_run, &action, &amount, mode).await
            }
            Commands::Pools => lending::list_pools(&config, dry_run, mode).await,
            Commands::Lend {
                asset,
                amount,
                pool,
            } => lending::lend_to_pool(&config, dry_run, &asset, &amount, &pool, mode).await,
            Commands::Reputation { address } => match address {
                Some(address) => agent::lookup_reputation(&config, &address, mode).await,
                None => agent::reputation_session(&config).await,
            },
            Commands::Credential { email } => {
                let email = email.or_else(|| config.agent.credential_email.clone());
                let Some(email) = email else {
                    bail!("no email given; pass --email or set agent.credential_email");
                };
                agent::issue_credential(&config, &email, mode).await
            }
            Commands::Chat { strategy } => agent::chat(&config, &strategy).await,
            Commands::Serve { port } => {
                let state = crate::api::AppState::from_config(&config, dry_run)?;
                crate::api::ApiServer::new(state, port.unwrap_or(config.server.port))
                    .run()
                    .await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_flags() {
        let cli = Cli::try_parse_from(["finagent", "--dry-run", "run", "bullish", "1000", "--json"])
            .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.output_mode(), OutputMode::Json);
        match cli.command {
            Commands::Run { kind, amount } => {
                assert_eq!(kind, "bullish");
                assert_eq!(amount, "1000");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lend_requires_pool() {
        assert!(Cli::try_parse_from(["finagent", "lend", "USDC", "25"]).is_err());

        let cli = Cli::try_parse_from(["finagent", "lend", "USDC", "25", "--pool", "0xpool"])
            .unwrap();
        match cli.command {
            Commands::Lend { asset, amount, pool } => {
                assert_eq!((asset.as_str(), amount.as_str(), pool.as_str()), ("USDC", "25", "0xpool"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reputation_address_is_optional() {
        let cli = Cli::try_parse_from(["finagent", "reputation"]).unwrap();
        assert!(matches!(cli.command, Commands::Reputation { address: None }));
    }

    #[test]
    fn chat_defaults_to_bullish() {
        let cli = Cli::try_parse_from(["finagent", "chat"]).unwrap();
        match cli.command {
            Commands::Chat { strategy } => assert_eq!(strategy, "bullish"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
