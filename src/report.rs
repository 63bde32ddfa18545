//! Report

use std::{fmt::Write as _, io};

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    costs::{CostError, follow_on_cost},
    ranking::RankedLevel,
    scenario::Scenario,
    solvers::SolverResult,
};

pub mod chart;

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// An impact cannot be shown as a currency amount.
    #[error("impact {0} cannot be formatted as money")]
    NotRepresentable(f64),

    /// Wrapped cost model error
    #[error(transparent)]
    Cost(#[from] CostError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// What to include in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Rows shown in the ranked table
    pub top: usize,

    /// Whether to draw the bar chart
    pub chart: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top: 5,
            chart: true,
        }
    }
}

/// Outcome of a run, ready to print.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    scenario: &'a Scenario,
    result: &'a SolverResult,
}

impl<'a> Report<'a> {
    /// Create a report for `result` solved under `scenario`.
    pub fn new(scenario: &'a Scenario, result: &'a SolverResult) -> Self {
        Self { scenario, result }
    }

    /// Selected level and its impact.
    pub fn best(&self) -> RankedLevel {
        self.result.best
    }

    /// Writes the summary, the ranked table and optionally the bar chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        options: &ReportOptions,
    ) -> Result<(), ReportError> {
        write_summary(&mut out, self.scenario, self.result.best)?;

        write_ranked_table(
            &mut out,
            self.result.ranking.top(options.top),
            self.result.best,
            self.scenario.currency(),
        )?;

        if options.chart {
            chart::write_chart(
                &mut out,
                &self.result.ranking.by_level(),
                self.result.best,
                self.scenario.currency(),
            )?;
        }

        Ok(())
    }
}

fn write_summary(
    out: &mut impl io::Write,
    scenario: &Scenario,
    best: RankedLevel,
) -> Result<(), ReportError> {
    let currency = scenario.currency();
    let rule = scenario.follow_on();

    let mut summary = format!(
        "\n\x1b[1m{}\x1b[0m\n\nA {} rebate minimises the total impact at {}.",
        scenario.name(),
        best.level,
        millions(best.impact, currency)?,
    );

    // Lowest level the rule applies to, regardless of where the threshold sits.
    if let Some(trigger) = scenario.levels().find(|level| rule.is_triggered(*level)) {
        let names: Vec<&str> = rule
            .observers()
            .iter()
            .map(|observer| observer.name.as_str())
            .collect();

        let cost = follow_on_cost(rule, trigger)?;

        _ = write!(
            summary,
            " Rebates of {trigger} or more let {} ({}% combined share) demand matching \
             terms, adding {} of follow-on risk.",
            names.join(" and "),
            percent_points(rule.combined_share()),
            decimal_millions(cost, currency)?,
        );

        if rule.is_triggered(best.level) {
            summary.push_str(" The selected level carries that risk.");
        } else {
            summary.push_str(" The selected level stays below the trigger.");
        }
    } else {
        summary.push_str(" No rebate level triggers follow-on demands.");
    }

    writeln!(out, "{summary}").map_err(|_err| ReportError::IO)
}

fn write_ranked_table<'r>(
    out: &mut impl io::Write,
    entries: impl Iterator<Item = &'r RankedLevel>,
    best: RankedLevel,
    currency: &'static Currency,
) -> Result<(), ReportError> {
    let mut builder = Builder::default();
    let mut best_rows: Vec<usize> = Vec::new();

    builder.push_record(["Rank", "Rebate", "Total Impact", "vs Best"]);

    for (rank, entry) in entries.enumerate() {
        let delta = if entry.level == best.level {
            best_rows.push(rank + 1);
            String::new()
        } else {
            format!("+{}", millions(entry.impact - best.impact, currency)?)
        };

        builder.push_record([
            format!("{}", rank + 1),
            entry.level.to_string(),
            millions(entry.impact, currency)?,
            delta,
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..4), Alignment::right());

    for row in best_rows {
        for col in 0..4 {
            table.modify((row, col), Color::FG_GREEN);
        }
    }

    let table_str = dim_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReportError::IO)
}

/// Format an impact in millions as currency, e.g. `$2.00M`.
pub(crate) fn millions(impact: f64, currency: &'static Currency) -> Result<String, ReportError> {
    let minor = (impact * 100.0)
        .round()
        .to_i64()
        .ok_or(ReportError::NotRepresentable(impact))?;

    Ok(format!("{}M", Money::from_minor(minor, currency)))
}

fn decimal_millions(amount: Decimal, currency: &'static Currency) -> Result<String, ReportError> {
    let minor = (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ReportError::NotRepresentable(amount.to_f64().unwrap_or(f64::NAN)))?;

    Ok(format!("{}M", Money::from_minor(minor, currency)))
}

/// Converts a fraction to percent points for display.
fn percent_points(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).round_dp(2).normalize()
}

/// Wraps runs of box-drawing characters (U+2500..U+257F) in dark grey.
fn dim_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let border = ('\u{2500}'..='\u{257F}').contains(&ch);

        if border != in_run {
            out.push_str(if border { "\x1b[90m" } else { "\x1b[0m" });
            in_run = border;
        }

        out.push(ch);
    }

    if in_run {
        out.push_str("\x1b[0m");
    }

    out
}
