//! Offline gateway used with `--dry-run`.
//!
//! Accepts every well-formed request and answers with a synthetic
//! transaction hash, so strategies can be exercised without a backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use uuid::Uuid;

use super::LendingGateway;
use crate::domain::{
    to_base_units, LendingReceipt, LendingRequest, PoolInfo, PoolLendReceipt, PoolLendRequest,
    USDC_DECIMALS,
};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct DryRunGateway {
    calls: AtomicU64,
}

impl DryRunGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests accepted so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LendingGateway for DryRunGateway {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn is_dry_run(&self) -> bool {
        true
    }

    async fn execute(&self, request: &LendingRequest) -> Result<LendingReceipt> {
        let units = request.base_units()?;
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = format!("0x{}", Uuid::new_v4().simple());

        info!(
            "[DRY RUN] #{} {} {} USDC ({} units) -> {}",
            n, request.action, request.amount, units, tx_hash
        );

        Ok(LendingReceipt {
            tx_hash,
            success: Some(true),
        })
    }

    async fn list_pools(&self) -> Result<Vec<PoolInfo>> {
        Ok(Vec::new())
    }

    async fn lend(&self, request: &PoolLendRequest) -> Result<PoolLendReceipt> {
        request.validate()?;
        let units = to_base_units(&request.token_amount, USDC_DECIMALS)?;
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = format!("0x{}", Uuid::new_v4().simple());

        info!(
            "[DRY RUN] #{} lend {} {} ({} units) into {} -> {}",
            n, request.token_amount, request.asset, units, request.pool_address, tx_hash
        );

        Ok(PoolLendReceipt {
            success: true,
            transaction_hash: Some(tx_hash),
            block_number: None,
            error: None,
        })
    }
}
