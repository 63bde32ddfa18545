//! Rebate QUBO
//!
//! Scores every rebate level, encodes "offer exactly one level" as a one-hot QUBO and
//! prints the level with the lowest total impact.
//!
//! Use `-s` to load a scenario file
//! Use `--solver` to pick the exhaustive, direct or MILP backend
//! Use `-o` to write the QUBO formulation as a Typst document, whichever backend solves it

use std::{io, time::Instant};

use anyhow::Result;
use clap::Parser;
use humanize_duration::{Truncate, prelude::DurationExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rebate_qubo::{
    cli::Args,
    costs::ImpactTable,
    encoding::encode_one_hot_with_observer,
    renderers::typst::TypstRenderer,
    report::Report,
    scenario::Scenario,
    solvers::{
        Solver, SolverKind, SolverResult, direct::DirectSolver, exhaustive::ExhaustiveSolver,
        milp::MilpSolver,
    },
};

/// Rebate QUBO entry point
#[expect(clippy::print_stdout, reason = "CLI output")]
pub fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut scenario = match args.scenario.as_deref() {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::default(),
    };

    if let Some(form) = args.penalty_form {
        scenario = scenario.with_penalty_form(form);
    }

    info!(
        scenario = scenario.name(),
        levels = scenario.base_losses().len(),
        penalty = scenario.penalty(),
        form = ?scenario.penalty_form(),
        "loaded scenario"
    );

    let start = Instant::now();

    let impacts = ImpactTable::from_scenario(&scenario)?;
    let result = solve(&args, &scenario, &impacts)?;

    let elapsed = start.elapsed();

    info!(
        level = result.best.level.get(),
        impact = result.best.impact,
        "selected rebate level"
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Report::new(&scenario, &result).write_to(&mut handle, &args.report_options())?;

    println!(
        "Solved in {} ({} assignments evaluated)",
        elapsed.human(Truncate::Nano),
        result.evaluated
    );

    Ok(())
}

fn solve(args: &Args, scenario: &Scenario, impacts: &ImpactTable) -> Result<SolverResult> {
    let mut renderer = args.out.clone().map(TypstRenderer::new);

    let result = match args.solver {
        SolverKind::Exhaustive => {
            let solver = ExhaustiveSolver::for_scenario(scenario);

            if let Some(renderer) = renderer.as_mut() {
                solver.solve_with_observer(impacts, renderer)?
            } else {
                solver.solve(impacts)?
            }
        }
        SolverKind::Direct => {
            capture_formulation(scenario, impacts, renderer.as_mut())?;
            DirectSolver.solve(impacts)?
        }
        SolverKind::Milp => {
            capture_formulation(scenario, impacts, renderer.as_mut())?;
            MilpSolver.solve(impacts)?
        }
    };

    if let Some(renderer) = renderer {
        renderer.write()?;

        info!(path = %renderer.output_path().display(), "wrote formulation");
    }

    Ok(result)
}

/// Backends that never build the QUBO still get the formulation for `--out`.
fn capture_formulation(
    scenario: &Scenario,
    impacts: &ImpactTable,
    renderer: Option<&mut TypstRenderer>,
) -> Result<()> {
    if let Some(renderer) = renderer {
        encode_one_hot_with_observer(
            impacts,
            scenario.penalty(),
            scenario.penalty_form(),
            renderer,
        )?;
    }

    Ok(())
}
