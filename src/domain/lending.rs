use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FinAgentError, Result};

/// USDC token decimals
pub const USDC_DECIMALS: u32 = 6;

/// Action accepted by the lending endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingAction {
    Supply,
    Borrow,
    Repay,
    Withdraw,
}

impl LendingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for LendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LendingAction {
    type Err = FinAgentError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supply" => Ok(Self::Supply),
            "borrow" => Ok(Self::Borrow),
            "repay" => Ok(Self::Repay),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(FinAgentError::Validation(format!(
                "invalid action '{}'; expected supply|borrow|repay|withdraw",
                other
            ))),
        }
    }
}

/// Body of a lending endpoint call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingRequest {
    pub action: LendingAction,
    /// Human-readable token amount, e.g. "300"
    pub amount: String,
}

impl LendingRequest {
    pub fn new(action: LendingAction, amount: impl Into<String>) -> Self {
        Self {
            action,
            amount: amount.into(),
        }
    }

    /// Amount in USDC base units
    pub fn base_units(&self) -> Result<u128> {
        to_base_units(&self.amount, USDC_DECIMALS)
    }
}

/// Lending endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingReceipt {
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl LendingReceipt {
    /// Only an explicit `success: false` counts as a rejection
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

/// Lending pool as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub asset: String,
    pub apy: f64,
    pub protocol: String,
    pub available: f64,
    pub token_address: String,
    pub pool_address: String,
    #[serde(rename = "priceUSD")]
    pub price_usd: f64,
    pub risk_level: String,
    pub tvl: f64,
}

/// Body of a pool-targeted lend (supply into a listed pool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolLendRequest {
    pub asset: String,
    /// Human-readable token amount
    pub token_amount: String,
    pub pool_address: String,
}

impl PoolLendRequest {
    pub fn new(
        asset: impl Into<String>,
        token_amount: impl Into<String>,
        pool_address: impl Into<String>,
    ) -> Self {
        Self {
            asset: asset.into(),
            token_amount: token_amount.into(),
            pool_address: pool_address.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.asset.trim().is_empty() {
            return Err(FinAgentError::Validation("asset is required".to_string()));
        }
        if self.pool_address.trim().is_empty() {
            return Err(FinAgentError::Validation("poolAddress is required".to_string()));
        }
        if parse_amount(&self.token_amount)? <= Decimal::ZERO {
            return Err(FinAgentError::Validation(
                "tokenAmount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a pool-targeted lend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLendReceipt {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse a human amount such as `"12.50"` into an exact decimal.
pub fn parse_amount(amount: &str) -> Result<Decimal> {
    Decimal::from_str(amount.trim())
        .map_err(|e| FinAgentError::Validation(format!("invalid amount '{}': {}", amount, e)))
}

/// Convert a human amount into integer token units, exactly.
///
/// `"1.5"` with 6 decimals is `1_500_000`. Fractions finer than the token
/// precision are truncated.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<u128> {
    let value = parse_amount(amount)?;

    if value.is_sign_negative() {
        return Err(FinAgentError::Validation(format!(
            "amount must not be negative: {}",
            amount
        )));
    }

    let scale = Decimal::from(10u64.pow(decimals));
    value
        .checked_mul(scale)
        .and_then(|units| units.trunc().to_u128())
        .ok_or_else(|| FinAgentError::Validation(format!("amount too large: {}", amount)))
}
