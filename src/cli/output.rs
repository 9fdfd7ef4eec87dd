//! Output formatting for `finagent` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::display::short_hash;
use crate::domain::{PoolInfo, Step, StepStatus, StrategyPlan};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print a single Serialize item as pretty JSON.
pub fn print_item<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

/// Print a simple key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("{key}: {value}");
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m{msg}\x1b[0m");
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StrategyRow {
    pub name: String,
    pub title: String,
    pub steps: usize,
    pub tagline: String,
}

impl From<&StrategyPlan> for StrategyRow {
    fn from(plan: &StrategyPlan) -> Self {
        Self {
            name: plan.kind.as_str().to_string(),
            title: plan.kind.title().to_string(),
            steps: plan.steps.len(),
            tagline: plan.kind.tagline().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PoolRow {
    pub asset: String,
    pub protocol: String,
    pub apy: String,
    pub available: f64,
    pub tvl: f64,
    pub risk: String,
}

impl From<&PoolInfo> for PoolRow {
    fn from(pool: &PoolInfo) -> Self {
        Self {
            asset: pool.asset.clone(),
            protocol: pool.protocol.clone(),
            apy: format!("{:.2}%", pool.apy),
            available: pool.available,
            tvl: pool.tvl,
            risk: pool.risk_level.clone(),
        }
    }
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[ ]",
        StepStatus::Loading => "[~]",
        StepStatus::Complete => "[x]",
        StepStatus::Error => "[!]",
    }
}

/// One progress line for a step, e.g. `[x] Step 1: Initial Supply (0x12345678...)`
pub fn step_line(step: &Step) -> String {
    let mut line = format!(
        "{} Step {}: {}",
        status_marker(step.status),
        step.number,
        step.title
    );
    if let Some(tx) = step.tx_hash.as_deref() {
        line.push_str(&format!(" ({})", short_hash(tx)));
    }
    line
}
