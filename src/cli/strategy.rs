//! Strategy commands
//!
//! finagent strategies              - List strategies
//! finagent run <kind> <amount>     - Execute a strategy, printing progress

use anyhow::Result;
use tracing::debug;

use super::output::{self, OutputMode, StrategyRow};
use crate::config::AppConfig;
use crate::domain::display::explorer_tx_url;
use crate::domain::{StepStatus, StrategyKind};
use crate::error::FinAgentError;
use crate::gateway::build_lending_gateway;
use crate::sequencer::{CancelFlag, StepSequencer};

pub fn list_strategies(config: &AppConfig, mode: OutputMode) -> Result<()> {
    let rows: Vec<StrategyRow> = StrategyKind::ALL
        .iter()
        .map(|kind| StrategyRow::from(&kind.plan(config.sequencer.fraction_for(*kind))))
        .collect();
    output::print_items(&rows, mode)
}

pub async fn run_strategy(
    config: &AppConfig,
    dry_run: bool,
    kind: &str,
    amount: &str,
    mode: OutputMode,
) -> Result<()> {
    let kind: StrategyKind = kind.parse()?;
    let gateway = build_lending_gateway(config, dry_run)?;
    let sequencer = StepSequencer::for_strategy(kind, &config.sequencer, gateway);

    if mode == OutputMode::Table {
        println!("{}", kind.title());
        if dry_run {
            output::print_warn("Dry run: no requests will reach the lending endpoint");
        }
    }

    let mut rx = sequencer.subscribe();
    let printer = tokio::spawn(async move {
        let mut seen: Vec<StepStatus> = Vec::new();
        while rx.changed().await.is_ok() {
            let run = rx.borrow_and_update().clone();
            if mode == OutputMode::Table {
                for (idx, step) in run.steps.iter().enumerate() {
                    if seen.get(idx) == Some(&step.status) || step.status == StepStatus::Pending {
                        continue;
                    }
                    if step.status.is_terminal() {
                        println!(
                            "  {} [{}/{}]",
                            output::step_line(step),
                            run.settled_count(),
                            run.steps.len()
                        );
                    } else {
                        println!("  {}", output::step_line(step));
                    }
                }
            }
            seen = run.statuses();
            if run.phase.is_finished() {
                break;
            }
        }
    });

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::print_warn("Cancelling after the current step...");
            on_interrupt.cancel();
        }
    });

    let result = sequencer.run(Some(amount), cancel).await;
    interrupt.abort();
    drop(sequencer);
    if let Err(e) = printer.await {
        debug!("Progress printer ended: {}", e);
    }

    match result {
        Ok(outcome) => {
            match mode {
                OutputMode::Json => output::print_item(&outcome)?,
                OutputMode::Table => {
                    output::print_success(&outcome.message);
                    for receipt in &outcome.receipts {
                        output::print_kv(
                            &format!("Step {}", receipt.step),
                            &explorer_tx_url(&config.explorer.base_url, &receipt.tx_hash),
                        );
                    }
                }
            }
            Ok(())
        }
        Err(FinAgentError::Cancelled) => {
            output::print_warn("Run cancelled; remaining steps were not sent");
            Err(FinAgentError::Cancelled.into())
        }
        Err(e) => {
            output::print_error(&e.user_message());
            Err(e.into())
        }
    }
}
