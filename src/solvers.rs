//! Solvers for Rebate Selection

use clap::ValueEnum;
use good_lp::ResolutionError;
use thiserror::Error;

use crate::{
    costs::{CostError, ImpactTable},
    encoding::EncodeError,
    qubo::QuboError,
    ranking::{RankedLevel, Ranking},
};

pub mod direct;
pub mod exhaustive;
pub mod milp;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// The model is too large to enumerate.
    #[error("cannot enumerate {count} variables, the limit is {max}")]
    TooManyVariables {
        /// Variables in the model
        count: usize,
        /// Largest supported model
        max: usize,
    },

    /// No assignment selected exactly one rebate level.
    #[error("no assignment selects exactly one rebate level")]
    NoFeasibleAssignment,

    /// Wrapped cost model error
    #[error(transparent)]
    Cost(#[from] CostError),

    /// Wrapped encoding error
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Wrapped model evaluation error
    #[error(transparent)]
    Qubo(#[from] QuboError),

    /// Wrapped MILP resolution error
    #[error(transparent)]
    ResolutionError(#[from] ResolutionError),

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    /// Selected rebate level and its impact
    pub best: RankedLevel,

    /// Every valid level, ascending by impact
    pub ranking: Ranking,

    /// Number of candidate assignments the solver evaluated
    pub evaluated: usize,
}

/// Trait for choosing a rebate level from an impact table
pub trait Solver {
    /// Select the rebate level with the lowest total impact.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the solver encounters an error.
    fn solve(&self, impacts: &ImpactTable) -> Result<SolverResult, SolverError>;
}

/// Available solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SolverKind {
    /// Enumerate every assignment of the one-hot QUBO.
    #[default]
    Exhaustive,

    /// Scan the levels directly.
    Direct,

    /// Mixed integer linear program with an explicit one-hot constraint.
    Milp,
}
