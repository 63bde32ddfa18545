//! Command Line Arguments

use std::path::PathBuf;

use clap::Parser;

use crate::{encoding::PenaltyForm, report::ReportOptions, solvers::SolverKind};

/// Pick the rebate level with the lowest total impact.
#[derive(Debug, Parser)]
#[command(name = "rebate-qubo", version, about, long_about = None)]
pub struct Args {
    /// YAML scenario file (defaults to the built-in scenario)
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Solver backend
    #[arg(long, value_enum, default_value_t = SolverKind::Exhaustive)]
    pub solver: SolverKind,

    /// Override the scenario's penalty expansion
    #[arg(long, value_enum)]
    pub penalty_form: Option<PenaltyForm>,

    /// Rows shown in the ranked table
    #[arg(short, long, default_value_t = 5)]
    pub top: usize,

    /// Do not draw the bar chart
    #[arg(long)]
    pub no_chart: bool,

    /// Write the QUBO formulation as a Typst document
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    /// Report options selected on the command line.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top: self.top,
            chart: !self.no_chart,
        }
    }
}
