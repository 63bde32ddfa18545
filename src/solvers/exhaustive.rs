//! Exhaustive Solver
//!
//! Enumerates every assignment of a one-hot QUBO, keeps the assignments that select
//! exactly one level and ranks them by energy.

use smallvec::SmallVec;
use tracing::{debug, info};

use crate::{
    costs::ImpactTable,
    encoding::{
        FormulationObserver, NoopObserver, OneHotModel, PenaltyForm,
        encode_one_hot_with_observer,
    },
    qubo::BinaryQuadraticModel,
    ranking::Ranking,
    scenario::{DEFAULT_PENALTY, Scenario},
    solvers::{Solver, SolverError, SolverResult},
};

/// Largest model enumerated (2^20 assignments).
pub const MAX_EXHAUSTIVE_VARIABLES: usize = 20;

/// One assignment and its energy.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    assignment: SmallVec<[bool; 16]>,

    /// Model energy of the assignment
    pub energy: f64,
}

impl Sample {
    /// Create a sample from an assignment and its energy.
    pub fn new(assignment: impl IntoIterator<Item = bool>, energy: f64) -> Self {
        Self {
            assignment: assignment.into_iter().collect(),
            energy,
        }
    }

    /// Variable values in index order.
    pub fn assignment(&self) -> &[bool] {
        &self.assignment
    }

    /// Indices of the variables set to 1.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| value.then_some(index))
    }

    /// The single active variable, if exactly one is set.
    pub fn one_hot_index(&self) -> Option<usize> {
        let mut active = self.active();

        match (active.next(), active.next()) {
            (Some(index), None) => Some(index),
            _ => None,
        }
    }
}

/// Every sample produced by a solve, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Wrap samples in the order they were produced.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Samples in production order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of one-hot samples
    pub fn valid_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.one_hot_index().is_some())
            .count()
    }

    /// Lowest-energy sample of any kind. Earlier samples win ties.
    pub fn lowest(&self) -> Option<&Sample> {
        self.samples.iter().reduce(|best, sample| {
            if sample.energy < best.energy {
                sample
            } else {
                best
            }
        })
    }
}

/// Evaluate every assignment of `model`. Bit `j` of the counter `k` sets variable `j`,
/// so `k = 0` is the all-zero assignment.
///
/// # Errors
///
/// - [`SolverError::TooManyVariables`]: the model has more than
///   [`MAX_EXHAUSTIVE_VARIABLES`] variables.
/// - [`SolverError::Qubo`]: an assignment could not be evaluated.
pub fn enumerate(model: &BinaryQuadraticModel) -> Result<SampleSet, SolverError> {
    let n = model.num_variables();

    if n > MAX_EXHAUSTIVE_VARIABLES {
        return Err(SolverError::TooManyVariables {
            count: n,
            max: MAX_EXHAUSTIVE_VARIABLES,
        });
    }

    let total = 1_usize << n;
    let mut samples = Vec::with_capacity(total);
    let mut assignment: SmallVec<[bool; 16]> = SmallVec::from_elem(false, n);

    for k in 0..total {
        for (j, value) in assignment.iter_mut().enumerate() {
            *value = (k >> j) & 1 == 1;
        }

        let energy = model.energy(&assignment)?;

        samples.push(Sample {
            assignment: assignment.clone(),
            energy,
        });
    }

    info!(variables = n, assignments = total, "enumerated assignments");

    Ok(SampleSet::from_samples(samples))
}

/// Solver that builds the one-hot QUBO and enumerates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExhaustiveSolver {
    penalty: f64,
    form: PenaltyForm,
}

impl ExhaustiveSolver {
    /// Create a solver with the given penalty settings.
    pub fn new(penalty: f64, form: PenaltyForm) -> Self {
        Self { penalty, form }
    }

    /// Solver using the scenario's penalty settings.
    pub fn for_scenario(scenario: &Scenario) -> Self {
        Self::new(scenario.penalty(), scenario.penalty_form())
    }

    /// One-hot penalty constant
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Penalty expansion
    pub fn form(&self) -> PenaltyForm {
        self.form
    }

    /// Encode `impacts` and evaluate every assignment of the resulting model.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if encoding or enumeration fails.
    pub fn sample(&self, impacts: &ImpactTable) -> Result<(OneHotModel, SampleSet), SolverError> {
        self.sample_with_observer(impacts, &mut NoopObserver)
    }

    fn sample_with_observer<O: FormulationObserver + ?Sized>(
        &self,
        impacts: &ImpactTable,
        observer: &mut O,
    ) -> Result<(OneHotModel, SampleSet), SolverError> {
        let model = encode_one_hot_with_observer(impacts, self.penalty, self.form, observer)?;
        let samples = enumerate(model.model())?;

        Ok((model, samples))
    }

    /// Solve, reporting the model formulation to `observer`.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if encoding, enumeration or ranking fails.
    pub fn solve_with_observer<O: FormulationObserver + ?Sized>(
        &self,
        impacts: &ImpactTable,
        observer: &mut O,
    ) -> Result<SolverResult, SolverError> {
        let (model, samples) = self.sample_with_observer(impacts, observer)?;
        let ranking = Ranking::from_samples(&samples, &model)?;

        let best = *ranking.best().ok_or(SolverError::NoFeasibleAssignment)?;

        debug!(
            valid = ranking.len(),
            level = best.level.get(),
            impact = best.impact,
            "ranked one-hot assignments"
        );

        Ok(SolverResult {
            best,
            ranking,
            evaluated: samples.len(),
        })
    }
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self::new(DEFAULT_PENALTY, PenaltyForm::default())
    }
}

impl Solver for ExhaustiveSolver {
    fn solve(&self, impacts: &ImpactTable) -> Result<SolverResult, SolverError> {
        self.solve_with_observer(impacts, &mut NoopObserver)
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::levels::RebateLevel;

    use super::*;

    fn solve(scenario: &Scenario) -> Result<SolverResult, SolverError> {
        let impacts = ImpactTable::from_scenario(scenario)?;

        ExhaustiveSolver::for_scenario(scenario).solve(&impacts)
    }

    #[test]
    fn enumerates_every_assignment() -> TestResult {
        let scenario = Scenario::default();
        let impacts = ImpactTable::from_scenario(&scenario)?;

        let (_, samples) = ExhaustiveSolver::for_scenario(&scenario).sample(&impacts)?;

        assert_eq!(samples.len(), 1024);
        assert_eq!(samples.valid_count(), 10);

        let first = samples.iter().next().map(|sample| sample.active().count());
        assert_eq!(first, Some(0));

        Ok(())
    }

    #[test]
    fn one_hot_energies_equal_impacts() -> TestResult {
        let scenario = Scenario::default();
        let impacts = ImpactTable::from_scenario(&scenario)?;
        let result = ExhaustiveSolver::for_scenario(&scenario).solve(&impacts)?;

        assert_eq!(result.ranking.len(), 10);

        for row in &impacts {
            let expected = row.total.to_string().parse::<f64>()?;
            let ranked = result.ranking.get(row.level).map(|entry| entry.impact);

            assert!(
                ranked.is_some_and(|impact| (impact - expected).abs() < 1e-6),
                "level {} ranked at {ranked:?}, expected {expected}",
                row.level
            );
        }

        Ok(())
    }

    #[test]
    fn default_scenario_selects_lowest_impact_level() -> TestResult {
        let result = solve(&Scenario::default())?;

        // 1.5 base loss plus 0.42525 follow-on still beats 2.0 at level 8.
        assert_eq!(result.best.level, RebateLevel::new(10)?);
        assert!((result.best.impact - 1.925_25).abs() < 1e-6);
        assert_eq!(result.evaluated, 1024);

        Ok(())
    }

    #[test]
    fn unreachable_trigger_selects_deepest_rebate() -> TestResult {
        let result = solve(&Scenario::default().with_trigger_level(11))?;

        assert_eq!(result.best.level, RebateLevel::new(10)?);
        assert!((result.best.impact - 1.5).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn early_trigger_keeps_deepest_rebate_when_follow_on_is_small() -> TestResult {
        let result = solve(&Scenario::default().with_trigger_level(6))?;

        assert_eq!(result.best.level, RebateLevel::new(10)?);
        assert!((result.best.impact - 1.925_25).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn steep_follow_on_selects_level_below_trigger() -> TestResult {
        let steep = Scenario::default().with_spillover(Percentage::from(0.30));

        // 4.2525 follow-on pushes levels 9 and 10 above 2.0.
        let result = solve(&steep)?;

        assert_eq!(result.best.level, RebateLevel::new(8)?);
        assert!((result.best.impact - 2.0).abs() < 1e-6);

        let result = solve(&steep.with_trigger_level(6))?;

        assert_eq!(result.best.level, RebateLevel::new(5)?);
        assert!((result.best.impact - 3.2).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn solving_twice_is_idempotent() -> TestResult {
        let scenario = Scenario::default();

        assert_eq!(solve(&scenario)?, solve(&scenario)?);

        Ok(())
    }

    #[test]
    fn both_penalty_forms_rank_identically() -> TestResult {
        let expanded = Scenario::default();
        let shifted = Scenario::default().with_penalty_form(PenaltyForm::Shifted);

        let a = solve(&expanded)?;
        let b = solve(&shifted)?;

        assert_eq!(a.best.level, b.best.level);

        for (x, y) in a.ranking.iter().zip(b.ranking.iter()) {
            assert_eq!(x.level, y.level);
            assert!((x.impact - y.impact).abs() < 1e-6);
        }

        Ok(())
    }

    #[test]
    fn shifted_form_puts_empty_assignment_lowest() -> TestResult {
        let scenario = Scenario::default().with_penalty_form(PenaltyForm::Shifted);
        let impacts = ImpactTable::from_scenario(&scenario)?;

        let (_, samples) = ExhaustiveSolver::for_scenario(&scenario).sample(&impacts)?;
        let lowest = samples.lowest().map(|sample| sample.active().count());

        assert_eq!(lowest, Some(0));

        Ok(())
    }

    #[test]
    fn single_level_scenario_has_two_assignments() -> TestResult {
        let scenario = Scenario::new(
            "single",
            [(RebateLevel::new(4)?, Decimal::new(33, 1))],
            Scenario::default().follow_on().clone(),
            DEFAULT_PENALTY,
        )?;

        let result = solve(&scenario)?;

        assert_eq!(result.evaluated, 2);
        assert_eq!(result.best.level, RebateLevel::new(4)?);

        Ok(())
    }

    #[test]
    fn too_many_variables_is_rejected() {
        let mut model = BinaryQuadraticModel::new(0.0);

        for i in 0..=MAX_EXHAUSTIVE_VARIABLES {
            model.add_variable(format!("x{i}"), 0.0);
        }

        let result = enumerate(&model);

        assert!(matches!(
            result,
            Err(SolverError::TooManyVariables { count: 21, max: 20 })
        ));
    }

    #[test]
    fn one_hot_index_requires_exactly_one_active_variable() {
        assert_eq!(Sample::new([false, true, false], 0.0).one_hot_index(), Some(1));
        assert_eq!(Sample::new([false, false], 0.0).one_hot_index(), None);
        assert_eq!(Sample::new([true, true], 0.0).one_hot_index(), None);
    }
}
