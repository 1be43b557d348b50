//! Code generation and textual dumps.
//!
//! The generated code lists one `label = \tname` line per representative
//! node in admission order, a blank line, and the binding of the final
//! expression:
//!
//! ```text
//! E0 = 	A
//! E1 = 	B
//!
//! Expr_1 = E0 => E1
//! ```

use super::{Phase, SyntacticGraph};
use crate::error::{BuildError, Result};
use crate::term::{Binding, Term};
use std::fmt::Write;

impl SyntacticGraph {
    /// Renders the definitions and the final expression.
    ///
    /// Available once permutations are inserted; generating twice yields the
    /// same text.
    pub fn generate_code(&self) -> Result<String> {
        if self.phase < Phase::PermutationsInserted {
            return Err(BuildError::Phase {
                pass: "generate_code",
                expected: Phase::PermutationsInserted,
                found: self.phase,
            });
        }

        let mut code = String::new();
        for &node in &self.admitted {
            let Some(represented) = self.network.node(node).represented() else {
                continue;
            };
            let label = self.labels.label(node).unwrap_or_default();
            let _ = writeln!(code, "{label} = \t{}", represented.name);
        }
        code.push('\n');

        let expression = self
            .expression
            .clone()
            .unwrap_or_else(|| Term::Series(self.series.clone()));
        let binding = Binding::new(self.options.expression_name.clone(), expression);
        code.push_str(&binding.definition(&self.network, &self.labels, &self.options));
        code.push('\n');
        Ok(code)
    }

    /// Human-readable dump of the nodes, exterior nodes and columns.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "graph {} ({})", self.name, self.phase);

        let _ = writeln!(out, "nodes:");
        for &node in &self.admitted {
            let shape = self.network.node(node);
            let label = self.labels.label(node).unwrap_or("?");
            let _ = write!(out, "  {label:<6} {:<14} {}", shape.kind(), shape.boundary_code());
            if let Some(represented) = shape.represented() {
                let _ = write!(out, "  {}", represented.name);
            }
            if let Some(location) = shape.location() {
                let _ = write!(out, "  @({}, {})", location.x, location.y);
            }
            out.push('\n');
        }

        for (title, nodes) in [
            ("exterior inputs", self.exterior_inputs().collect::<Vec<_>>()),
            ("exterior outputs", self.exterior_outputs().collect::<Vec<_>>()),
        ] {
            if nodes.is_empty() {
                continue;
            }
            let labels: Vec<&str> = nodes.iter().filter_map(|&n| self.labels.label(n)).collect();
            let _ = writeln!(out, "{title}: {}", labels.join(" "));
        }

        if !self.feedback.is_empty() {
            let _ = writeln!(out, "feedback:");
            for pair in &self.feedback {
                let send = self.labels.label(pair.send).unwrap_or("?");
                let receive = self.labels.label(pair.receive).unwrap_or("?");
                let _ = writeln!(out, "  {send} -> {receive}");
            }
        }

        if !self.series.is_empty() {
            let _ = writeln!(out, "columns:");
            for (index, column) in self.series.columns().enumerate() {
                let labels: Vec<&str> = column.nodes().filter_map(|n| self.labels.label(n)).collect();
                let rank = column
                    .rank(&self.network)
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "no rank".to_owned());
                let _ = writeln!(out, "  {index}: [{}]  {rank}", labels.join(" "));
            }
        }
        out
    }
}
