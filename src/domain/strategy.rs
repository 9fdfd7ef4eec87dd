//! Strategy catalogue: which lending actions each strategy performs and how
//! the amount of every step is derived from the principal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::lending::LendingAction;
use super::step::Step;
use crate::error::{FinAgentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Conservative: supply only
    Bearish,
    /// Long-term hold: supply only
    Buffet,
    /// Supply, borrow a fraction, re-supply
    Bullish,
    /// Leveraged supply with amounts rounded to cents
    Moon,
    /// Supply, borrow a fraction, re-supply
    Leveraged,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Bearish,
        StrategyKind::Buffet,
        StrategyKind::Bullish,
        StrategyKind::Moon,
        StrategyKind::Leveraged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearish => "bearish",
            Self::Buffet => "buffet",
            Self::Bullish => "bullish",
            Self::Moon => "moon",
            Self::Leveraged => "leveraged",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Bearish => "Bearish Strategy",
            Self::Buffet => "Buffet Strategy",
            Self::Bullish => "Bullish Strategy",
            Self::Moon => "Moon Strategy",
            Self::Leveraged => "Leveraged Strategy",
        }
    }

    pub fn tagline(&self) -> &'static str {
        match self {
            Self::Bearish => "Conservative approach: Supply USDC to Aave for stable yields",
            Self::Buffet => "Value approach: Supply USDC and hold for the long run",
            Self::Bullish => "Optimistic approach: Leverage your position for higher returns",
            Self::Moon => "Leveraged lending strategy for maximum yield potential",
            Self::Leveraged => "Supply, borrow and re-supply to amplify lending yield",
        }
    }

    pub fn chat_title(&self) -> String {
        let mut name = self.as_str().to_string();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        format!("Chat with {} Agent", name)
    }

    /// Whether the strategy borrows against its initial supply
    pub fn is_leveraged(&self) -> bool {
        matches!(self, Self::Bullish | Self::Moon | Self::Leveraged)
    }

    /// Build the step plan for this strategy.
    ///
    /// `borrow_fraction` only matters for leveraged strategies.
    pub fn plan(&self, borrow_fraction: f64) -> StrategyPlan {
        let format = match self {
            Self::Moon => AmountFormat::Cents,
            _ => AmountFormat::Shortest,
        };

        let steps = if self.is_leveraged() {
            vec![
                StepTemplate {
                    title: "Initial Supply".to_string(),
                    description: "Supply USDC to Aave as collateral".to_string(),
                    action: LendingAction::Supply,
                    amount: AmountSource::Principal,
                },
                StepTemplate {
                    title: "Borrow USDC".to_string(),
                    description: format!(
                        "Borrow {}% of supplied USDC",
                        fraction_as_percent(borrow_fraction)
                    ),
                    action: LendingAction::Borrow,
                    amount: AmountSource::FractionOfPrincipal(borrow_fraction),
                },
                StepTemplate {
                    title: "Re-supply Borrowed".to_string(),
                    description: "Supply borrowed USDC back to Aave".to_string(),
                    action: LendingAction::Supply,
                    amount: AmountSource::FractionOfPrincipal(borrow_fraction),
                },
            ]
        } else {
            vec![StepTemplate {
                title: "Supply USDC".to_string(),
                description: "Supply your USDC to Aave to earn interest".to_string(),
                action: LendingAction::Supply,
                amount: AmountSource::Principal,
            }]
        };

        StrategyPlan {
            kind: *self,
            steps,
            format,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = FinAgentError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bearish" => Ok(Self::Bearish),
            "buffet" | "buffett" => Ok(Self::Buffet),
            "bullish" => Ok(Self::Bullish),
            "moon" => Ok(Self::Moon),
            "leveraged" | "leverage" => Ok(Self::Leveraged),
            other => Err(FinAgentError::UnknownStrategy(other.to_string())),
        }
    }
}

fn fraction_as_percent(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}

/// Where a step's amount comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "fraction", rename_all = "snake_case")]
pub enum AmountSource {
    /// The principal exactly as the user entered it
    Principal,
    /// `principal * fraction`, in f64 arithmetic
    FractionOfPrincipal(f64),
}

/// How derived amounts are rendered before being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountFormat {
    /// Shortest decimal that round-trips (e.g., "300", "30.000000000000004", "3e-8")
    Shortest,
    /// Two decimal places (e.g., "300.00")
    Cents,
}

/// Static description of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub title: String,
    pub description: String,
    pub action: LendingAction,
    pub amount: AmountSource,
}

/// Ordered steps of a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub kind: StrategyKind,
    pub steps: Vec<StepTemplate>,
    pub format: AmountFormat,
}

impl StrategyPlan {
    /// Fresh, all-pending step list for display
    pub fn initial_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, template)| {
                Step::new(idx as u32 + 1, template.title.clone(), template.description.clone())
            })
            .collect()
    }

    pub fn success_message(&self) -> String {
        format!(
            "{} successfully executed! All steps completed.",
            self.kind.title()
        )
    }

    /// Amount string sent for `template`, given the raw and parsed principal
    pub fn amount_for(&self, template: &StepTemplate, raw_principal: &str, principal: f64) -> String {
        match template.amount {
            AmountSource::Principal => raw_principal.trim().to_string(),
            AmountSource::FractionOfPrincipal(fraction) => {
                derive_amount(principal, fraction, self.format)
            }
        }
    }
}

/// Derive a step amount from the principal.
///
/// Plain f64 multiplication, so binary rounding noise is kept in `Shortest`
/// format (`0.1 * 3.0` renders as "0.30000000000000004"). Not decimal-exact.
pub fn derive_amount(principal: f64, fraction: f64, format: AmountFormat) -> String {
    let value = principal * fraction;
    match format {
        AmountFormat::Shortest => shortest_number(value),
        AmountFormat::Cents => format!("{:.2}", value),
    }
}

/// Shortest round-trip rendering with the browser's exponent cut-offs:
/// magnitudes below 1e-6 or from 1e21 up use `3e-8` / `1e+21` notation.
fn shortest_number(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || (1e-6..1e21).contains(&magnitude) {
        return format!("{}", value);
    }

    let exp = format!("{:e}", value);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

/// Parse and validate a user-entered principal.
pub fn parse_principal(raw: Option<&str>) -> Result<f64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(FinAgentError::Validation("Amount is required".to_string()));
    }

    let value: f64 = raw
        .parse()
        .map_err(|_| FinAgentError::Validation(format!("Amount is not a number: {}", raw)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(FinAgentError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }

    Ok(value)
}
