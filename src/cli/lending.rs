//! Lending commands
//!
//! finagent act <action> <amount>   - Send one lending action
//! finagent pools                   - List lending pools
//! finagent lend <asset> <amount> --pool <address>
//!                                  - Supply into a listed pool

use anyhow::Result;
use serde_json::json;

use super::output::{self, OutputMode, PoolRow};
use crate::config::AppConfig;
use crate::domain::display::explorer_tx_url;
use crate::domain::{parse_principal, LendingAction, LendingRequest, PoolLendRequest};
use crate::error::FinAgentError;
use crate::gateway::build_lending_gateway;

pub async fn execute_action(
    config: &AppConfig,
    dry_run: bool,
    action: &str,
    amount: &str,
    mode: OutputMode,
) -> Result<()> {
    let action: LendingAction = action.parse()?;
    parse_principal(Some(amount))?;

    let gateway = build_lending_gateway(config, dry_run)?;
    let request = LendingRequest::new(action, amount.trim());
    let receipt = gateway.execute(&request).await?;
    if receipt.is_rejected() {
        return Err(FinAgentError::LendingRejected {
            status: 200,
            message: "Lending endpoint reported failure".to_string(),
        }
        .into());
    }

    let explorer = explorer_tx_url(&config.explorer.base_url, &receipt.tx_hash);
    match mode {
        OutputMode::Json => output::print_item(&json!({
            "action": request.action,
            "amount": request.amount,
            "txHash": receipt.tx_hash,
            "explorerUrl": explorer,
        }))?,
        OutputMode::Table => {
            output::print_success(&format!("{} {} USDC confirmed", request.action, request.amount));
            output::print_kv("Transaction", &receipt.tx_hash);
            output::print_kv("Explorer", &explorer);
        }
    }
    Ok(())
}

pub async fn list_pools(config: &AppConfig, dry_run: bool, mode: OutputMode) -> Result<()> {
    let gateway = build_lending_gateway(config, dry_run)?;
    let pools = gateway.list_pools().await?;
    let rows: Vec<PoolRow> = pools.iter().map(PoolRow::from).collect();
    output::print_items(&rows, mode)
}

pub async fn lend_to_pool(
    config: &AppConfig,
    dry_run: bool,
    asset: &str,
    amount: &str,
    pool: &str,
    mode: OutputMode,
) -> Result<()> {
    let request = PoolLendRequest::new(asset.trim(), amount.trim(), pool.trim());
    request.validate()?;

    let gateway = build_lending_gateway(config, dry_run)?;
    let receipt = gateway.lend(&request).await?;
    let tx_hash = receipt.transaction_hash.clone().unwrap_or_default();
    let explorer = explorer_tx_url(&config.explorer.base_url, &tx_hash);

    match mode {
        OutputMode::Json => output::print_item(&json!({
            "asset": request.asset,
            "tokenAmount": request.token_amount,
            "poolAddress": request.pool_address,
            "transaction_hash": tx_hash,
            "block_number": receipt.block_number,
            "explorerUrl": explorer,
        }))?,
        OutputMode::Table => {
            output::print_success(&format!(
                "Lent {} {} into {}",
                request.token_amount, request.asset, request.pool_address
            ));
            output::print_kv("Transaction", &tx_hash);
            if let Some(block) = receipt.block_number {
                output::print_kv("Block", &block.to_string());
            }
            output::print_kv("Explorer", &explorer);
        }
    }
    Ok(())
}
