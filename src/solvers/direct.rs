//! Direct Solver

use tracing::debug;

use crate::{
    costs::ImpactTable,
    ranking::Ranking,
    solvers::{Solver, SolverError, SolverResult},
};

/// Linear scan over the impact table, no QUBO involved.
///
/// Useful as a cross-check: it must agree with [`super::exhaustive::ExhaustiveSolver`]
/// whenever the penalty dominates the impacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSolver;

impl Solver for DirectSolver {
    fn solve(&self, impacts: &ImpactTable) -> Result<SolverResult, SolverError> {
        let ranking = Ranking::from_impacts(impacts)?;
        let best = *ranking.best().ok_or(SolverError::NoFeasibleAssignment)?;

        debug!(level = best.level.get(), impact = best.impact, "scanned impacts");

        Ok(SolverResult {
            best,
            ranking,
            evaluated: impacts.len(),
        })
    }
}
