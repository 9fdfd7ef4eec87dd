pub mod adapters;
pub mod api;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod sequencer;

pub use adapters::{AgentApiClient, ChatSocket, LendingApiClient};
pub use assistant::{ReputationAssistant, ReputationSource};
pub use config::AppConfig;
pub use domain::{LendingAction, LendingReceipt, LendingRequest, StepStatus, StrategyKind};
pub use error::{FinAgentError, Result};
pub use gateway::{build_lending_gateway, DryRunGateway, LendingGateway};
pub use sequencer::{CancelFlag, RunOutcome, RunPhase, SequencerConfig, StepSequencer, StrategyRun};
