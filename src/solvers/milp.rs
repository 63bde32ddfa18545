//! MILP Solver

use good_lp::{Expression, ProblemVariables, Solution, SolverModel, Variable, variable};
use smallvec::SmallVec;
use tracing::debug;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    costs::ImpactTable,
    encoding::coefficient,
    ranking::{RankedLevel, Ranking},
    solvers::{Solver, SolverError, SolverResult},
};

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Solver using Mixed Integer Linear Programming (MILP)
///
/// The one-hot rule is a hard constraint `Σx_i = 1` instead of a penalty, so no
/// penalty constant is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl Solver for MilpSolver {
    fn solve(&self, impacts: &ImpactTable) -> Result<SolverResult, SolverError> {
        if impacts.is_empty() {
            return Err(SolverError::NoFeasibleAssignment);
        }

        let mut pb = ProblemVariables::new();

        let (x, objective) = build_level_variables_and_objective(impacts, &mut pb)?;

        let mut model = pb.minimise(objective).using(default_solver);

        // Exactly one rebate level is offered.
        let mut selected = Expression::default();

        for var in &x {
            selected += *var;
        }

        model = model.with(selected.eq(1));

        let solution = model.solve()?;

        let best = selected_level(impacts, &solution, &x)?;
        let ranking = Ranking::from_impacts(impacts)?;

        debug!(level = best.level.get(), impact = best.impact, "solved MILP");

        Ok(SolverResult {
            best,
            ranking,
            evaluated: x.len(),
        })
    }
}

/// Add one binary indicator per level and the impact-weighted objective.
fn build_level_variables_and_objective(
    impacts: &ImpactTable,
    pb: &mut ProblemVariables,
) -> Result<(SmallVec<[Variable; 10]>, Expression), SolverError> {
    let x: SmallVec<[Variable; 10]> = impacts
        .iter()
        .map(|_| pb.add(variable().binary()))
        .collect();

    let mut objective = Expression::default();

    x.iter().copied().zip(impacts.iter()).try_for_each(
        |(var, row)| -> Result<(), SolverError> {
            objective += var * coefficient(row)?;

            Ok(())
        },
    )?;

    Ok((x, objective))
}

/// The level whose indicator the solver switched on.
fn selected_level(
    impacts: &ImpactTable,
    solution: &impl Solution,
    x: &[Variable],
) -> Result<RankedLevel, SolverError> {
    let row = x
        .iter()
        .copied()
        .zip(impacts.iter())
        .find_map(|(var, row)| (solution.value(var) > BINARY_THRESHOLD).then_some(row))
        .ok_or(SolverError::InvariantViolation {
            message: "no level indicator is set in the MILP solution",
        })?;

    Ok(RankedLevel {
        level: row.level,
        impact: coefficient(row)?,
    })
}
