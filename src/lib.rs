//! Rebate QUBO
//!
//! Chooses a rebate level for a formulary negotiation by scoring each level's base
//! revenue loss plus the follow-on risk it triggers, encoding "offer exactly one level"
//! as a one-hot QUBO and enumerating every assignment.

pub mod cli;
pub mod costs;
pub mod encoding;
pub mod levels;
pub mod qubo;
pub mod ranking;
pub mod renderers;
pub mod report;
pub mod scenario;
pub mod solvers;
