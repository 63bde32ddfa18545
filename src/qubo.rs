//! Binary Quadratic Models
//!
//! A QUBO objective over binary variables:
//!
//! `E(x) = Σ h_i x_i + Σ_{i<j} J_ij x_i x_j + c`
//!
//! Interactions are stored once per unordered pair in insertion order, so energies are
//! summed in the same order on every run.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors raised while building or evaluating a model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuboError {
    /// Referenced a variable index that was never added.
    #[error("unknown variable index {0}")]
    UnknownVariable(usize),

    /// Assignment length does not match the number of variables.
    #[error("assignment has {actual} values but the model has {expected} variables")]
    AssignmentLength {
        /// Number of variables in the model
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },
}

/// Pairwise coupling between two distinct variables, `i < j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Lower variable index
    pub i: usize,

    /// Higher variable index
    pub j: usize,

    /// Coefficient on `x_i x_j`
    pub bias: f64,
}

/// Linear, quadratic and constant terms over labelled binary variables.
#[derive(Debug, Clone, Default)]
pub struct BinaryQuadraticModel {
    labels: SmallVec<[String; 10]>,
    linear: SmallVec<[f64; 10]>,
    interactions: Vec<Interaction>,
    interaction_index: FxHashMap<(usize, usize), usize>,
    offset: f64,
}

impl BinaryQuadraticModel {
    /// Create an empty model with a constant offset.
    pub fn new(offset: f64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Add a variable with a linear bias, returning its index.
    pub fn add_variable(&mut self, label: impl Into<String>, bias: f64) -> usize {
        self.labels.push(label.into());
        self.linear.push(bias);

        self.linear.len() - 1
    }

    /// Add `bias` to the coupling between `i` and `j`.
    ///
    /// Since `x_i^2 = x_i` for binary variables, a self-interaction is folded into the
    /// linear bias of `i`.
    ///
    /// # Errors
    ///
    /// Returns [`QuboError::UnknownVariable`] if either index is out of range.
    pub fn add_interaction(&mut self, i: usize, j: usize, bias: f64) -> Result<(), QuboError> {
        for index in [i, j] {
            if index >= self.num_variables() {
                return Err(QuboError::UnknownVariable(index));
            }
        }

        if i == j {
            if let Some(linear) = self.linear.get_mut(i) {
                *linear += bias;
            }

            return Ok(());
        }

        let (i, j) = (i.min(j), i.max(j));

        match self.interaction_index.get(&(i, j)) {
            Some(&position) => {
                if let Some(existing) = self.interactions.get_mut(position) {
                    existing.bias += bias;
                }
            }
            None => {
                self.interaction_index.insert((i, j), self.interactions.len());
                self.interactions.push(Interaction { i, j, bias });
            }
        }

        Ok(())
    }

    /// Number of variables
    pub fn num_variables(&self) -> usize {
        self.linear.len()
    }

    /// Variable labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label of variable `i`.
    pub fn label(&self, i: usize) -> Option<&str> {
        self.labels.get(i).map(String::as_str)
    }

    /// Linear biases in index order.
    pub fn linear(&self) -> &[f64] {
        &self.linear
    }

    /// Pairwise couplings in insertion order.
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Coupling between `i` and `j`, in either order.
    pub fn interaction(&self, i: usize, j: usize) -> Option<f64> {
        self.interaction_index
            .get(&(i.min(j), i.max(j)))
            .and_then(|&position| self.interactions.get(position))
            .map(|interaction| interaction.bias)
    }

    /// Constant offset
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Energy of a full assignment.
    ///
    /// # Errors
    ///
    /// Returns [`QuboError::AssignmentLength`] if `assignment` does not cover every
    /// variable exactly.
    pub fn energy(&self, assignment: &[bool]) -> Result<f64, QuboError> {
        if assignment.len() != self.num_variables() {
            return Err(QuboError::AssignmentLength {
                expected: self.num_variables(),
                actual: assignment.len(),
            });
        }

        let linear: f64 = self
            .linear
            .iter()
            .zip(assignment)
            .filter(|(_, active)| **active)
            .map(|(bias, _)| bias)
            .sum();

        let quadratic: f64 = self
            .interactions
            .iter()
            .filter(|interaction| {
                assignment.get(interaction.i).copied().unwrap_or(false)
                    && assignment.get(interaction.j).copied().unwrap_or(false)
            })
            .map(|interaction| interaction.bias)
            .sum();

        Ok(linear + quadratic + self.offset)
    }
}
