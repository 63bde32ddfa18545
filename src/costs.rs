//! Cost Model
//!
//! Total impact per rebate level: the base revenue loss plus the follow-on risk from
//! observers demanding matching terms once the offer crosses the trigger level. All
//! amounts are in millions of the scenario currency.

use rust_decimal::Decimal;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    levels::RebateLevel,
    scenario::{FollowOnRule, Scenario, fraction},
};

/// One million, the divisor turning currency units into millions.
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Currencies supported by scenarios all have two minor-unit digits.
const MINOR_UNIT_SCALE: u32 = 2;

/// Errors raised by the cost model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CostError {
    /// Follow-on exposure overflowed decimal arithmetic.
    #[error("follow-on cost overflowed for rebate level {0}")]
    Overflow(RebateLevel),

    /// Base loss and follow-on cost could not be added.
    #[error("total impact overflowed for rebate level {0}")]
    TotalOverflow(RebateLevel),
}

/// Follow-on cost in millions for `level`.
///
/// Zero below the trigger level; from the trigger level on it is
/// `combined share * volume * unit price * spillover / 1e6`.
///
/// # Errors
///
/// Returns [`CostError::Overflow`] if the exposure overflows.
pub fn follow_on_cost(rule: &FollowOnRule, level: RebateLevel) -> Result<Decimal, CostError> {
    if !rule.is_triggered(level) {
        return Ok(Decimal::ZERO);
    }

    let unit_price = Decimal::new(rule.unit_price().to_minor_units(), MINOR_UNIT_SCALE);

    rule.combined_share()
        .checked_mul(Decimal::from(rule.annual_volume()))
        .and_then(|exposure| exposure.checked_mul(unit_price))
        .and_then(|exposure| exposure.checked_mul(fraction(rule.spillover())))
        .and_then(|exposure| exposure.checked_div(MILLION))
        .ok_or(CostError::Overflow(level))
}

/// Base loss plus follow-on cost for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelImpact {
    /// Rebate level
    pub level: RebateLevel,

    /// Base revenue loss in millions
    pub base_loss: Decimal,

    /// Follow-on risk in millions
    pub follow_on: Decimal,

    /// `base_loss + follow_on`
    pub total: Decimal,
}

impl LevelImpact {
    /// Compute the impact of `level` given its base loss.
    ///
    /// # Errors
    ///
    /// Returns a [`CostError`] if the arithmetic overflows.
    pub fn new(
        rule: &FollowOnRule,
        level: RebateLevel,
        base_loss: Decimal,
    ) -> Result<Self, CostError> {
        let follow_on = follow_on_cost(rule, level)?;
        let total = base_loss
            .checked_add(follow_on)
            .ok_or(CostError::TotalOverflow(level))?;

        Ok(Self {
            level,
            base_loss,
            follow_on,
            total,
        })
    }
}

/// Total impact for every level of a scenario, ascending by level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactTable {
    rows: SmallVec<[LevelImpact; 10]>,
}

impl ImpactTable {
    /// Evaluate the cost model for every level in the scenario.
    ///
    /// # Errors
    ///
    /// Returns a [`CostError`] if any level overflows.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, CostError> {
        let rows = scenario
            .base_losses()
            .iter()
            .map(|&(level, base_loss)| -> Result<LevelImpact, CostError> {
                let impact = LevelImpact::new(scenario.follow_on(), level, base_loss)?;

                debug!(
                    level = level.get(),
                    base_loss = %impact.base_loss,
                    follow_on = %impact.follow_on,
                    total = %impact.total,
                    "evaluated rebate level"
                );

                Ok(impact)
            })
            .collect::<Result<SmallVec<_>, CostError>>()?;

        Ok(Self { rows })
    }

    /// Impact rows, ascending by level.
    pub fn iter(&self) -> impl Iterator<Item = &LevelImpact> {
        self.rows.iter()
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no level is under consideration.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Impact row for `level`.
    pub fn get(&self, level: RebateLevel) -> Option<&LevelImpact> {
        self.rows.iter().find(|row| row.level == level)
    }

    /// Total impact for `level`.
    pub fn total_impact(&self, level: RebateLevel) -> Option<Decimal> {
        self.get(level).map(|row| row.total)
    }
}

impl<'a> IntoIterator for &'a ImpactTable {
    type Item = &'a LevelImpact;
    type IntoIter = std::slice::Iter<'a, LevelImpact>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
