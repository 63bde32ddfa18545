//! Scenario Fixtures
//!
//! YAML representation of a [`Scenario`]:
//!
//! ```yaml
//! name: PBM_A formulary rebate
//! penalty: 10000
//! penalty_form: expanded
//! base_losses:
//!   1: "4.3"
//!   2: "4.0"
//! follow_on:
//!   trigger_level: 9
//!   observers:
//!     PBM_B: "12%"
//!     PBM_C: "15%"
//!   annual_volume: 100000
//!   unit_price: "525.00 USD"
//!   spillover: "3%"
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;

use crate::{
    encoding::PenaltyForm,
    levels::RebateLevel,
    scenario::{DEFAULT_PENALTY, FollowOnRule, Observer, Scenario, ScenarioError},
};

/// Scenario document
#[derive(Debug, Deserialize)]
pub struct ScenarioFixture {
    /// Scenario name
    pub name: String,

    /// One-hot penalty constant
    #[serde(default = "default_penalty")]
    pub penalty: f64,

    /// Penalty expansion
    #[serde(default)]
    pub penalty_form: PenaltyForm,

    /// Rebate level -> base loss in millions (e.g. "3.2")
    pub base_losses: BTreeMap<u8, String>,

    /// Follow-on rule
    pub follow_on: FollowOnFixture,
}

/// Follow-on rule document
#[derive(Debug, Deserialize)]
pub struct FollowOnFixture {
    /// First level that triggers the follow-on cost
    pub trigger_level: u8,

    /// Observer name -> share of volume (e.g. "12%")
    pub observers: BTreeMap<String, String>,

    /// Assumed annual volume in units
    pub annual_volume: u64,

    /// Unit price (e.g. "525.00 USD")
    pub unit_price: String,

    /// Expected extra rebate once triggered (e.g. "3%")
    pub spillover: String,
}

impl ScenarioFixture {
    /// Read a scenario document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a scenario document.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_norway::from_str(yaml)?)
    }
}

impl TryFrom<ScenarioFixture> for Scenario {
    type Error = ScenarioError;

    fn try_from(fixture: ScenarioFixture) -> Result<Self, Self::Error> {
        let base_losses = fixture
            .base_losses
            .iter()
            .map(|(level, loss)| -> Result<(RebateLevel, Decimal), ScenarioError> {
                Ok((RebateLevel::new(*level)?, parse_loss(loss)?))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        let follow_on = FollowOnRule::try_from(fixture.follow_on)?;

        Ok(Scenario::new(fixture.name, base_losses, follow_on, fixture.penalty)?
            .with_penalty_form(fixture.penalty_form))
    }
}

impl TryFrom<FollowOnFixture> for FollowOnRule {
    type Error = ScenarioError;

    fn try_from(fixture: FollowOnFixture) -> Result<Self, Self::Error> {
        let observers = fixture
            .observers
            .iter()
            .map(|(name, share)| -> Result<Observer, ScenarioError> {
                Ok(Observer::new(name.clone(), parse_percentage(share)?))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        let (minor_units, currency) = parse_price(&fixture.unit_price)?;

        Ok(FollowOnRule::new(
            fixture.trigger_level,
            observers,
            fixture.annual_volume,
            Money::from_minor(minor_units, currency),
            parse_percentage(&fixture.spillover)?,
        ))
    }
}

fn default_penalty() -> f64 {
    DEFAULT_PENALTY
}

/// Parse price string (e.g., "525.00 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), ScenarioError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(currency_code), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ScenarioError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let minor_units = amount
        .parse::<Decimal>()
        .map_err(|_err| ScenarioError::InvalidPrice(s.to_string()))?
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| ScenarioError::InvalidPrice(s.to_string()))?;

    let currency = match currency_code {
        "GBP" => GBP,
        "USD" => USD,
        "EUR" => EUR,
        other => return Err(ScenarioError::UnknownCurrency(other.to_string())),
    };

    Ok((minor_units, currency))
}

/// Parse percentage string (e.g., "12%" or "0.12") into a `Percentage`
///
/// # Errors
///
/// Returns an error if the string cannot be parsed.
pub fn parse_percentage(s: &str) -> Result<Percentage, ScenarioError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        let value = percent_str
            .trim()
            .parse::<f64>()
            .map_err(|_err| ScenarioError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value / 100.0))
    } else {
        let value = trimmed
            .parse::<f64>()
            .map_err(|_err| ScenarioError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value))
    }
}

/// Parse a base loss in millions (e.g. "3.2").
///
/// # Errors
///
/// Returns an error if the string is not a decimal number.
pub fn parse_loss(s: &str) -> Result<Decimal, ScenarioError> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_err| ScenarioError::InvalidLoss(s.to_string()))
}
