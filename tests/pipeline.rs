//! Integration tests for the rebate selection pipeline

use decimal_percentage::Percentage;
use testresult::TestResult;

use rebate_qubo::{
    costs::ImpactTable,
    encoding::{PenaltyForm, encode_one_hot},
    levels::RebateLevel,
    ranking::Ranking,
    report::{Report, ReportOptions},
    scenario::Scenario,
    solvers::{
        Solver, SolverResult, direct::DirectSolver, exhaustive::ExhaustiveSolver,
        milp::MilpSolver,
    },
};

fn solve_all(scenario: &Scenario) -> TestResult<[SolverResult; 3]> {
    let impacts = ImpactTable::from_scenario(scenario)?;

    Ok([
        ExhaustiveSolver::for_scenario(scenario).solve(&impacts)?,
        DirectSolver.solve(&impacts)?,
        MilpSolver.solve(&impacts)?,
    ])
}

#[test]
fn all_solvers_select_the_same_level() -> TestResult {
    for scenario in [
        Scenario::default(),
        Scenario::default().with_trigger_level(6),
        Scenario::default().with_trigger_level(11),
        Scenario::default().with_penalty_form(PenaltyForm::Shifted),
        Scenario::default().with_spillover(Percentage::from(0.30)),
        Scenario::default()
            .with_spillover(Percentage::from(0.30))
            .with_trigger_level(6),
    ] {
        let [exhaustive, direct, milp] = solve_all(&scenario)?;

        assert_eq!(exhaustive.best.level, direct.best.level);
        assert_eq!(exhaustive.best.level, milp.best.level);
        assert!((exhaustive.best.impact - direct.best.impact).abs() < 1e-6);
    }

    Ok(())
}

#[test]
fn default_scenario_selects_ten_percent() -> TestResult {
    let [exhaustive, ..] = solve_all(&Scenario::default())?;

    assert_eq!(exhaustive.best.level, RebateLevel::new(10)?);
    assert!((exhaustive.best.impact - 1.925_25).abs() < 1e-6);
    assert_eq!(exhaustive.evaluated, 1024);

    Ok(())
}

#[test]
fn steep_follow_on_moves_selection_below_trigger() -> TestResult {
    let steep = Scenario::default().with_spillover(Percentage::from(0.30));

    let [at_nine, ..] = solve_all(&steep)?;
    let [at_six, ..] = solve_all(&steep.with_trigger_level(6))?;

    assert_eq!(at_nine.best.level, RebateLevel::new(8)?);
    assert_eq!(at_six.best.level, RebateLevel::new(5)?);
    assert!((at_six.best.impact - 3.2).abs() < 1e-6);

    Ok(())
}

#[test]
fn only_one_hot_assignments_are_ranked() -> TestResult {
    let scenario = Scenario::default();
    let impacts = ImpactTable::from_scenario(&scenario)?;

    let (model, samples) = ExhaustiveSolver::for_scenario(&scenario).sample(&impacts)?;
    let ranking = Ranking::from_samples(&samples, &model)?;

    assert_eq!(samples.len(), 1024);
    assert_eq!(ranking.len(), 10);

    let mut levels: Vec<u8> = ranking.iter().map(|entry| entry.level.get()).collect();
    levels.sort_unstable();

    assert_eq!(levels, (1..=10).collect::<Vec<u8>>());

    Ok(())
}

#[test]
fn encoded_model_is_reported_end_to_end() -> TestResult {
    let scenario = Scenario::default();
    let impacts = ImpactTable::from_scenario(&scenario)?;

    let model = encode_one_hot(&impacts, scenario.penalty(), scenario.penalty_form())?;
    assert_eq!(model.levels().len(), 10);

    let result = ExhaustiveSolver::for_scenario(&scenario).solve(&impacts)?;

    let mut out = Vec::new();
    Report::new(&scenario, &result).write_to(&mut out, &ReportOptions::default())?;
    let output = String::from_utf8(out)?;

    assert!(output.contains("Best: 10% $1.93M"));
    assert!(output.contains("Total Impact"));

    Ok(())
}
