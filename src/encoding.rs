//! One-Hot Penalty Encoding
//!
//! "Exactly one rebate level is offered" becomes the penalty `P·(Σx_i − 1)^2` added to
//! the per-level impacts. Expanding with `x_i^2 = x_i`:
//!
//! `P·(Σx_i − 1)^2 = −P·Σx_i + 2P·Σ_{i<j} x_i x_j + P`
//!
//! so every pair of levels is coupled with `2P`, and the remaining linear and constant
//! terms depend on the [`PenaltyForm`]. Either way, a one-hot assignment has energy
//! equal to the impact of its level.

use clap::ValueEnum;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    costs::{ImpactTable, LevelImpact},
    levels::RebateLevel,
    qubo::{BinaryQuadraticModel, QuboError},
};

/// How the one-hot penalty contributes to the linear biases and the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyForm {
    /// `h_i = impact_i − P`, `c = +P`: the expansion of `P·(Σx_i − 1)^2`. Assignments
    /// violating the constraint pay at least `P` on top of their impacts.
    #[default]
    Expanded,

    /// `h_i = impact_i + P`, `c = −2P + P`. One-hot energies are unchanged, but the
    /// all-zero assignment sits at `−P`, below every valid one.
    Shifted,
}

impl PenaltyForm {
    /// Shift added to each linear bias for penalty `p`.
    pub fn linear_shift(self, penalty: f64) -> f64 {
        match self {
            PenaltyForm::Expanded => -penalty,
            PenaltyForm::Shifted => penalty,
        }
    }

    /// Constant offset for penalty `p`.
    pub fn offset(self, penalty: f64) -> f64 {
        match self {
            PenaltyForm::Expanded => penalty,
            PenaltyForm::Shifted => -2.0 * penalty + penalty,
        }
    }
}

/// Errors raised while encoding impacts.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    /// An impact cannot be turned into an `f64` solver coefficient.
    #[error("impact for rebate level {level} cannot be represented as a solver coefficient: {impact}")]
    NotRepresentable {
        /// Level whose impact failed to convert
        level: RebateLevel,
        /// The impact in millions
        impact: Decimal,
    },

    /// No levels to encode.
    #[error("no rebate levels to encode")]
    Empty,

    /// Wrapped model construction error
    #[error(transparent)]
    Qubo(#[from] QuboError),
}

/// Notified while a one-hot model is assembled.
///
/// All methods default to no-ops.
pub trait FormulationObserver {
    /// Called once before any variable, with the penalty settings.
    fn on_penalty(&mut self, _penalty: f64, _form: PenaltyForm) {}

    /// Called for each indicator variable with its final linear bias.
    fn on_variable(&mut self, _index: usize, _label: &str, _level: RebateLevel, _bias: f64) {}

    /// Called for each pairwise coupling.
    fn on_interaction(&mut self, _i: usize, _j: usize, _bias: f64) {}

    /// Called once with the constant offset.
    fn on_offset(&mut self, _offset: f64) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FormulationObserver for NoopObserver {}

/// A QUBO with one indicator variable per rebate level.
#[derive(Debug, Clone)]
pub struct OneHotModel {
    levels: SmallVec<[RebateLevel; 10]>,
    model: BinaryQuadraticModel,
}

impl OneHotModel {
    /// Levels in variable index order.
    pub fn levels(&self) -> &[RebateLevel] {
        &self.levels
    }

    /// Level of variable `index`.
    pub fn level_at(&self, index: usize) -> Option<RebateLevel> {
        self.levels.get(index).copied()
    }

    /// Underlying binary quadratic model.
    pub fn model(&self) -> &BinaryQuadraticModel {
        &self.model
    }
}

/// Encode impacts and the one-hot constraint as a QUBO.
///
/// # Errors
///
/// Returns an [`EncodeError`] if the table is empty or an impact does not fit an `f64`.
pub fn encode_one_hot(
    impacts: &ImpactTable,
    penalty: f64,
    form: PenaltyForm,
) -> Result<OneHotModel, EncodeError> {
    encode_one_hot_with_observer(impacts, penalty, form, &mut NoopObserver)
}

/// Encode impacts and the one-hot constraint, reporting every term to `observer`.
///
/// # Errors
///
/// Returns an [`EncodeError`] if the table is empty or an impact does not fit an `f64`.
pub fn encode_one_hot_with_observer<O: FormulationObserver + ?Sized>(
    impacts: &ImpactTable,
    penalty: f64,
    form: PenaltyForm,
    observer: &mut O,
) -> Result<OneHotModel, EncodeError> {
    if impacts.is_empty() {
        return Err(EncodeError::Empty);
    }

    observer.on_penalty(penalty, form);

    let offset = form.offset(penalty);
    let mut model = BinaryQuadraticModel::new(offset);
    let mut levels = SmallVec::new();
    let mut spread = (f64::INFINITY, f64::NEG_INFINITY);

    for row in impacts {
        let impact = coefficient(row)?;
        let bias = impact + form.linear_shift(penalty);
        let label = row.level.variable_name();
        let index = model.add_variable(label.as_str(), bias);

        observer.on_variable(index, &label, row.level, bias);

        levels.push(row.level);
        spread = (spread.0.min(impact), spread.1.max(impact));
    }

    let coupling = 2.0 * penalty;

    for i in 0..model.num_variables() {
        for j in (i + 1)..model.num_variables() {
            model.add_interaction(i, j, coupling)?;
            observer.on_interaction(i, j, coupling);
        }
    }

    observer.on_offset(offset);

    if penalty <= spread.1 - spread.0 {
        warn!(
            penalty,
            spread = spread.1 - spread.0,
            "penalty does not dominate the spread of impacts"
        );
    }

    debug!(
        variables = model.num_variables(),
        interactions = model.interactions().len(),
        offset,
        ?form,
        "encoded one-hot model"
    );

    Ok(OneHotModel { levels, model })
}

/// Impact of a level as an `f64` solver coefficient.
pub(crate) fn coefficient(row: &LevelImpact) -> Result<f64, EncodeError> {
    row.total
        .to_f64()
        .filter(|value| value.is_finite())
        .ok_or(EncodeError::NotRepresentable {
            level: row.level,
            impact: row.total,
        })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::scenario::Scenario;

    use super::*;

    const P: f64 = 10_000.0;

    fn default_impacts() -> Result<ImpactTable, crate::costs::CostError> {
        ImpactTable::from_scenario(&Scenario::default())
    }

    fn one_hot(n: usize, active: usize) -> Vec<bool> {
        (0..n).map(|i| i == active).collect()
    }

    #[test]
    fn expanded_form_matches_first_principles() -> TestResult {
        let impacts = default_impacts()?;
        let encoded = encode_one_hot(&impacts, P, PenaltyForm::Expanded)?;
        let model = encoded.model();

        assert_eq!(model.num_variables(), 10);
        assert!((model.offset() - P).abs() < f64::EPSILON);

        for (row, bias) in impacts.iter().zip(model.linear()) {
            assert!((bias - (coefficient(row)? - P)).abs() < 1e-9);
        }

        Ok(())
    }

    #[test]
    fn shifted_form_keeps_literal_offset() -> TestResult {
        let impacts = default_impacts()?;
        let encoded = encode_one_hot(&impacts, P, PenaltyForm::Shifted)?;
        let model = encoded.model();

        assert!((model.offset() + P).abs() < f64::EPSILON);

        for (row, bias) in impacts.iter().zip(model.linear()) {
            assert!((bias - (coefficient(row)? + P)).abs() < 1e-9);
        }

        Ok(())
    }

    #[test]
    fn every_pair_is_coupled_with_twice_the_penalty() -> TestResult {
        let encoded = encode_one_hot(&default_impacts()?, P, PenaltyForm::Expanded)?;
        let model = encoded.model();

        assert_eq!(model.interactions().len(), 45);

        for i in 0..10 {
            for j in (i + 1)..10 {
                assert_eq!(model.interaction(i, j), Some(2.0 * P));
            }
        }

        Ok(())
    }

    #[test]
    fn one_hot_energy_equals_impact_in_both_forms() -> TestResult {
        let impacts = default_impacts()?;

        for form in [PenaltyForm::Expanded, PenaltyForm::Shifted] {
            let encoded = encode_one_hot(&impacts, P, form)?;

            for (index, row) in impacts.iter().enumerate() {
                let energy = encoded.model().energy(&one_hot(10, index))?;

                assert!(
                    (energy - coefficient(row)?).abs() < 1e-9,
                    "{form:?} energy {energy} for level {}",
                    row.level
                );
            }
        }

        Ok(())
    }

    #[test]
    fn expanded_form_penalises_violations() -> TestResult {
        let encoded = encode_one_hot(&default_impacts()?, P, PenaltyForm::Expanded)?;
        let model = encoded.model();

        let none = model.energy(&[false; 10])?;
        let two: Vec<bool> = (0..10).map(|i| i < 2).collect();
        let two = model.energy(&two)?;

        assert!((none - P).abs() < f64::EPSILON);
        // 4.3 + 4.0 + P
        assert!((two - (8.3 + P)).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn shifted_form_rewards_empty_assignment() -> TestResult {
        let encoded = encode_one_hot(&default_impacts()?, P, PenaltyForm::Shifted)?;

        let none = encoded.model().energy(&[false; 10])?;

        assert!((none + P).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn variables_are_named_by_level() -> TestResult {
        let encoded = encode_one_hot(&default_impacts()?, P, PenaltyForm::Expanded)?;

        assert_eq!(encoded.model().label(0), Some("r1"));
        assert_eq!(encoded.model().label(9), Some("r10"));
        assert_eq!(encoded.level_at(4), Some(RebateLevel::new(5)?));
        assert_eq!(encoded.level_at(10), None);

        Ok(())
    }

    #[derive(Default)]
    struct CountingObserver {
        variables: usize,
        interactions: usize,
        offsets: usize,
        penalties: usize,
    }

    impl FormulationObserver for CountingObserver {
        fn on_penalty(&mut self, _penalty: f64, _form: PenaltyForm) {
            self.penalties += 1;
        }

        fn on_variable(&mut self, _index: usize, _label: &str, _level: RebateLevel, _bias: f64) {
            self.variables += 1;
        }

        fn on_interaction(&mut self, _i: usize, _j: usize, _bias: f64) {
            self.interactions += 1;
        }

        fn on_offset(&mut self, _offset: f64) {
            self.offsets += 1;
        }
    }

    #[test]
    fn observer_sees_every_term() -> TestResult {
        let mut observer = CountingObserver::default();

        encode_one_hot_with_observer(
            &default_impacts()?,
            P,
            PenaltyForm::Expanded,
            &mut observer,
        )?;

        assert_eq!(observer.penalties, 1);
        assert_eq!(observer.variables, 10);
        assert_eq!(observer.interactions, 45);
        assert_eq!(observer.offsets, 1);

        Ok(())
    }
}
