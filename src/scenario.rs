//! Scenarios
//!
//! A [`Scenario`] is the immutable set of inputs to a run: the base-loss table, the
//! follow-on rule and the one-hot penalty settings. The default scenario is the PBM
//! formulary negotiation; alternate scenarios can be loaded from YAML (see [`fixture`]).

use std::path::Path;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    encoding::PenaltyForm,
    levels::{LevelError, RebateLevel},
};

pub mod fixture;

/// Default one-hot penalty constant.
pub const DEFAULT_PENALTY: f64 = 10_000.0;

/// Scenario construction and loading errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// IO error reading a scenario file
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Invalid base loss amount
    #[error("Invalid loss amount: {0}")]
    InvalidLoss(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Rebate level out of range
    #[error(transparent)]
    Level(#[from] LevelError),

    /// The base-loss table is empty.
    #[error("scenario has no rebate levels")]
    NoLevels,

    /// The base-loss table lists a level more than once.
    #[error("rebate level {0} appears more than once")]
    DuplicateLevel(RebateLevel),

    /// The penalty constant is not a finite positive number.
    #[error("penalty must be finite and positive, got {0}")]
    InvalidPenalty(f64),
}

/// A party watching the negotiation that may demand matching terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Observer {
    /// Display name (e.g. `PBM_B`)
    pub name: String,

    /// Share of prescription volume held by this party.
    pub share: Percentage,
}

impl Observer {
    /// Create an observer.
    pub fn new(name: impl Into<String>, share: Percentage) -> Self {
        Self {
            name: name.into(),
            share,
        }
    }
}

/// Threshold rule for the follow-on risk triggered by a generous offer.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowOnRule {
    /// Levels at or above this trigger the follow-on cost. May exceed the highest level,
    /// which disables the rule.
    trigger_level: u8,

    /// Parties that may demand matching terms.
    observers: SmallVec<[Observer; 4]>,

    /// Assumed annual volume in units.
    annual_volume: u64,

    /// Price per unit (wholesale acquisition cost).
    unit_price: Money<'static, Currency>,

    /// Extra rebate the observers are expected to demand once triggered.
    spillover: Percentage,
}

impl FollowOnRule {
    /// Create a follow-on rule.
    pub fn new(
        trigger_level: u8,
        observers: impl IntoIterator<Item = Observer>,
        annual_volume: u64,
        unit_price: Money<'static, Currency>,
        spillover: Percentage,
    ) -> Self {
        Self {
            trigger_level,
            observers: observers.into_iter().collect(),
            annual_volume,
            unit_price,
            spillover,
        }
    }

    /// Level at which the rule starts to apply.
    pub fn trigger_level(&self) -> u8 {
        self.trigger_level
    }

    /// Whether the rule applies to `level`.
    pub fn is_triggered(&self, level: RebateLevel) -> bool {
        level.get() >= self.trigger_level
    }

    /// Parties that may demand matching terms.
    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    /// Assumed annual volume in units.
    pub fn annual_volume(&self) -> u64 {
        self.annual_volume
    }

    /// Price per unit.
    pub fn unit_price(&self) -> Money<'static, Currency> {
        self.unit_price
    }

    /// Expected extra rebate once triggered.
    pub fn spillover(&self) -> &Percentage {
        &self.spillover
    }

    /// Combined volume share of every observer, as a fraction.
    pub fn combined_share(&self) -> Decimal {
        self.observers
            .iter()
            .map(|observer| fraction(&observer.share))
            .sum()
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: String,

    /// Base loss in millions per level, strictly ascending by level.
    base_losses: SmallVec<[(RebateLevel, Decimal); 10]>,

    follow_on: FollowOnRule,

    penalty: f64,

    penalty_form: PenaltyForm,
}

impl Scenario {
    /// Create a validated scenario. Levels are sorted ascending.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::NoLevels`]: the base-loss table is empty.
    /// - [`ScenarioError::DuplicateLevel`]: a level is listed twice.
    /// - [`ScenarioError::InvalidPenalty`]: the penalty is not finite and positive.
    pub fn new(
        name: impl Into<String>,
        base_losses: impl IntoIterator<Item = (RebateLevel, Decimal)>,
        follow_on: FollowOnRule,
        penalty: f64,
    ) -> Result<Self, ScenarioError> {
        let mut base_losses: SmallVec<[(RebateLevel, Decimal); 10]> =
            base_losses.into_iter().collect();

        if base_losses.is_empty() {
            return Err(ScenarioError::NoLevels);
        }

        base_losses.sort_by_key(|(level, _)| *level);

        for pair in base_losses.windows(2) {
            if let [(a, _), (b, _)] = pair
                && a == b
            {
                return Err(ScenarioError::DuplicateLevel(*a));
            }
        }

        if !penalty.is_finite() || penalty <= 0.0 {
            return Err(ScenarioError::InvalidPenalty(penalty));
        }

        Ok(Self {
            name: name.into(),
            base_losses,
            follow_on,
            penalty,
            penalty_form: PenaltyForm::default(),
        })
    }

    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        fixture::ScenarioFixture::from_file(path)?.try_into()
    }

    /// Parse a scenario from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] if the document cannot be parsed or validated.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        fixture::ScenarioFixture::from_yaml_str(yaml)?.try_into()
    }

    /// Same scenario with a different penalty form.
    #[must_use]
    pub fn with_penalty_form(self, penalty_form: PenaltyForm) -> Self {
        Self {
            penalty_form,
            ..self
        }
    }

    /// Same scenario with the follow-on rule triggering at `trigger_level`.
    #[must_use]
    pub fn with_trigger_level(self, trigger_level: u8) -> Self {
        Self {
            follow_on: FollowOnRule {
                trigger_level,
                ..self.follow_on
            },
            ..self
        }
    }

    /// Same scenario with observers demanding `spillover` once triggered.
    #[must_use]
    pub fn with_spillover(self, spillover: Percentage) -> Self {
        Self {
            follow_on: FollowOnRule {
                spillover,
                ..self.follow_on
            },
            ..self
        }
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Levels under consideration, ascending.
    pub fn levels(&self) -> impl Iterator<Item = RebateLevel> + '_ {
        self.base_losses.iter().map(|(level, _)| *level)
    }

    /// Base-loss table, ascending by level.
    pub fn base_losses(&self) -> &[(RebateLevel, Decimal)] {
        &self.base_losses
    }

    /// Base loss in millions for `level`, if the level is under consideration.
    pub fn base_loss(&self, level: RebateLevel) -> Option<Decimal> {
        self.base_losses
            .iter()
            .find(|(candidate, _)| *candidate == level)
            .map(|(_, loss)| *loss)
    }

    /// Follow-on rule
    pub fn follow_on(&self) -> &FollowOnRule {
        &self.follow_on
    }

    /// One-hot penalty constant
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// How the one-hot penalty is expanded into linear terms and an offset.
    pub fn penalty_form(&self) -> PenaltyForm {
        self.penalty_form
    }

    /// Currency of every monetary value in the scenario.
    pub fn currency(&self) -> &'static Currency {
        self.follow_on.unit_price.currency()
    }
}

impl Default for Scenario {
    /// `PBM_A` requests a rebate increase to keep `DRUG_X` in formulary while `PBM_B`
    /// (12% of volume) and `PBM_C` (15%) watch for a generous deal.
    fn default() -> Self {
        let base_losses = [43, 40, 36, 33, 32, 25, 22, 20, 17, 15];

        Self {
            name: "PBM_A formulary rebate".to_string(),
            base_losses: RebateLevel::all()
                .zip(base_losses)
                .map(|(level, tenths)| (level, Decimal::new(tenths, 1)))
                .collect(),
            follow_on: FollowOnRule::new(
                9,
                [
                    Observer::new("PBM_B", Percentage::from(0.12)),
                    Observer::new("PBM_C", Percentage::from(0.15)),
                ],
                100_000,
                Money::from_minor(52_500, iso::USD),
                Percentage::from(0.03),
            ),
            penalty: DEFAULT_PENALTY,
            penalty_form: PenaltyForm::default(),
        }
    }
}

/// A percentage as a plain fraction (e.g. 12% -> 0.12).
pub(crate) fn fraction(percentage: &Percentage) -> Decimal {
    percentage.clone() * Decimal::ONE
}
