//! Terminal bar chart of total impact per rebate level.

use std::io;

use num_traits::ToPrimitive;
use rusty_money::iso::Currency;

use crate::{
    ranking::RankedLevel,
    report::{ReportError, millions},
};

/// Width of the longest bar, in cells.
pub const BAR_WIDTH: u8 = 40;

const BAR: char = '█';

/// Bar length for `impact` scaled against `max`. Non-positive impacts get no bar.
pub fn bar_len(impact: f64, max: f64) -> usize {
    if max <= 0.0 || impact <= 0.0 {
        return 0;
    }

    (impact / max * f64::from(BAR_WIDTH))
        .round()
        .to_usize()
        .map_or(0, |len| len.clamp(1, usize::from(BAR_WIDTH)))
}

/// Writes one bar per entry, in the order given, highlighting `best`.
///
/// # Errors
///
/// Returns an error if an impact cannot be formatted or the output cannot be written.
pub fn write_chart(
    out: &mut impl io::Write,
    entries: &[RankedLevel],
    best: RankedLevel,
    currency: &'static Currency,
) -> Result<(), ReportError> {
    let max = entries
        .iter()
        .map(|entry| entry.impact)
        .fold(f64::NEG_INFINITY, f64::max);

    let label_width = entries
        .iter()
        .map(|entry| entry.level.to_string().len())
        .max()
        .unwrap_or(0);

    writeln!(out, "\x1b[1mTotal impact by rebate level\x1b[0m\n").map_err(|_err| ReportError::IO)?;

    for entry in entries {
        let bar: String = std::iter::repeat_n(BAR, bar_len(entry.impact, max)).collect();
        let label = entry.level.to_string();
        let amount = millions(entry.impact, currency)?;

        let line = if entry.level == best.level {
            format!(
                "{label:>label_width$} \x1b[90m│\x1b[0m\x1b[32m{bar}\x1b[0m {amount}  \x1b[1m◀ Best: {label} {amount}\x1b[0m"
            )
        } else {
            format!("{label:>label_width$} \x1b[90m│\x1b[0m{bar} {amount}")
        };

        writeln!(out, "{line}").map_err(|_err| ReportError::IO)?;
    }

    writeln!(out).map_err(|_err| ReportError::IO)
}
