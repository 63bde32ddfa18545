//! QUBO Typst Renderer
//!
//! Captures the one-hot QUBO while it is assembled and writes it as a Typst document.
//!
//! # Example
//!
//! ```rust,no_run
//! use rebate_qubo::{
//!     costs::ImpactTable, renderers::typst::TypstRenderer, scenario::Scenario,
//!     solvers::exhaustive::ExhaustiveSolver,
//! };
//! use std::path::PathBuf;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scenario = Scenario::default();
//! let impacts = ImpactTable::from_scenario(&scenario)?;
//!
//! let mut renderer = TypstRenderer::new(PathBuf::from("formulation.typ"));
//!
//! let _result = ExhaustiveSolver::for_scenario(&scenario).solve_with_observer(&impacts, &mut renderer)?;
//!
//! renderer.write()?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use smallvec::SmallVec;

use crate::{
    encoding::{FormulationObserver, PenaltyForm},
    levels::RebateLevel,
};

/// Errors that can occur during Typst rendering.
#[derive(Debug, thiserror::Error)]
pub enum TypstRenderError {
    /// Failed to write to the output file.
    #[error("Failed to write to output file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Indicator variable captured from the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct QuboVariable {
    /// Variable name (e.g. `r5`)
    pub label: String,

    /// Rebate level the variable selects
    pub level: RebateLevel,

    /// Linear bias
    pub bias: f64,
}

/// Captured QUBO formulation.
#[derive(Debug, Clone, Default)]
pub struct QuboFormulation {
    /// Penalty constant and expansion, once known.
    pub penalty: Option<(f64, PenaltyForm)>,

    /// Variables by index; the encoder assigns indices densely and in order.
    pub variables: SmallVec<[QuboVariable; 16]>,

    /// Pairwise couplings `(i, j, bias)` in assembly order
    pub interactions: SmallVec<[(usize, usize, f64); 32]>,

    /// Constant offset
    pub offset: f64,
}

/// Typst renderer that implements [`FormulationObserver`].
#[derive(Debug, Clone)]
pub struct TypstRenderer {
    formulation: QuboFormulation,

    /// Output path for the .typ file
    output_path: PathBuf,
}

impl TypstRenderer {
    /// Create a new Typst renderer.
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            formulation: QuboFormulation::default(),
            output_path,
        }
    }

    /// The formulation captured so far.
    pub fn formulation(&self) -> &QuboFormulation {
        &self.formulation
    }

    /// Where [`TypstRenderer::write`] puts the document.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Render the captured formulation to Typst syntax.
    pub fn render(&self) -> String {
        let mut output = String::new();

        output.push_str("= QUBO Formulation for Rebate Selection\n\n");

        output.push_str("== Decision Variables\n\n");
        self.render_variables(&mut output);

        output.push_str("\n== Penalty\n\n");
        self.render_penalty(&mut output);

        output.push_str("\n== Objective Function\n\n");
        self.render_objective(&mut output);

        output
    }

    /// Write the rendered formulation to the output file.
    ///
    /// # Errors
    ///
    /// Returns [`TypstRenderError::IoError`] if the file cannot be created or written.
    pub fn write(&self) -> Result<(), TypstRenderError> {
        let content = self.render();
        let mut file = File::create(&self.output_path)?;

        file.write_all(content.as_bytes())?;

        Ok(())
    }

    fn label(&self, index: usize) -> String {
        self.formulation
            .variables
            .get(index)
            .map_or_else(|| format!("x_{index}"), |variable| typst_var(&variable.label))
    }

    fn render_variables(&self, output: &mut String) {
        output.push_str("All decision variables are binary.\n\n");

        for variable in &self.formulation.variables {
            output.push_str("- $");
            output.push_str(&typst_var(&variable.label));
            output.push_str("$: offer the ");
            output.push_str(&variable.level.to_string());
            output.push_str(" rebate (bias ");
            output.push_str(&render_number(variable.bias));
            output.push_str(")\n");
        }
    }

    fn render_penalty(&self, output: &mut String) {
        let Some((penalty, form)) = self.formulation.penalty else {
            output.push_str("No penalty recorded.\n");
            return;
        };

        output.push_str("Exactly one level is offered: $P (sum_i x_i - 1)^2$ with $P = ");
        output.push_str(&render_number(penalty));
        output.push_str("$ (");
        output.push_str(match form {
            PenaltyForm::Expanded => "expanded",
            PenaltyForm::Shifted => "shifted",
        });
        output.push_str(" form).\n");
    }

    fn render_objective(&self, output: &mut String) {
        let mut terms: Vec<String> = self
            .formulation
            .variables
            .iter()
            .map(|variable| {
                format!("{} {}", render_number(variable.bias), typst_var(&variable.label))
            })
            .collect();

        terms.extend(self.formulation.interactions.iter().map(|&(i, j, bias)| {
            format!("{} {} {}", render_number(bias), self.label(i), self.label(j))
        }));

        terms.push(render_number(self.formulation.offset));

        output.push_str("$ \"minimize\" quad ");

        for (n, term) in terms.iter().enumerate() {
            if n > 0 {
                if let Some(negative) = term.strip_prefix('-') {
                    output.push_str(" - ");
                    output.push_str(negative);
                } else {
                    output.push_str(" + ");
                    output.push_str(term);
                }
            } else {
                output.push_str(term);
            }

            // Break long sums every six terms.
            if n % 6 == 5 && n + 1 < terms.len() {
                output.push_str(" $\n$ quad");
            }
        }

        output.push_str(" $\n");
    }
}

impl FormulationObserver for TypstRenderer {
    fn on_penalty(&mut self, penalty: f64, form: PenaltyForm) {
        self.formulation.penalty = Some((penalty, form));
    }

    fn on_variable(&mut self, index: usize, label: &str, level: RebateLevel, bias: f64) {
        let variable = QuboVariable {
            label: label.to_string(),
            level,
            bias,
        };

        if let Some(slot) = self.formulation.variables.get_mut(index) {
            *slot = variable;
        } else {
            self.formulation.variables.push(variable);
        }
    }

    fn on_interaction(&mut self, i: usize, j: usize, bias: f64) {
        self.formulation.interactions.push((i, j, bias));
    }

    fn on_offset(&mut self, offset: f64) {
        self.formulation.offset = offset;
    }
}

/// `r10` becomes `r_10`.
fn typst_var(label: &str) -> String {
    match label.find(|ch: char| ch.is_ascii_digit()) {
        Some(split) if split > 0 => {
            let (name, index) = label.split_at(split);
            format!("{name}_{index}")
        }
        _ => label.to_string(),
    }
}

fn render_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{}", (value * 1e4).round() / 1e4)
    }
}
