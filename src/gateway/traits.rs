use async_trait::async_trait;

use crate::domain::{LendingReceipt, LendingRequest, PoolInfo, PoolLendReceipt, PoolLendRequest};
use crate::error::{FinAgentError, Result};

fn unsupported(feature: &str, gateway: &str) -> FinAgentError {
    FinAgentError::Validation(format!(
        "{} is not implemented for gateway '{}'",
        feature, gateway
    ))
}

/// External lending protocol the sequencer talks to.
///
/// `execute` must issue exactly one request per call and must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LendingGateway: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_dry_run(&self) -> bool;

    async fn execute(&self, request: &LendingRequest) -> Result<LendingReceipt>;

    async fn list_pools(&self) -> Result<Vec<PoolInfo>> {
        Err(unsupported("list_pools", self.name()))
    }

    /// Supply into a specific listed pool
    async fn lend(&self, _request: &PoolLendRequest) -> Result<PoolLendReceipt> {
        Err(unsupported("lend", self.name()))
    }
}
