//! Permutation insertion.
//!
//! After structuring, output `n` of a column need not feed input `n` of the
//! next one. For each adjacent pair the mapping `perm[n]` (index among the
//! right column's inputs of the port fed by left output `n`) is computed.
//! A non-identity mapping gets its own column holding one permutation node,
//! so every join of the final series is straight.

use super::{Phase, SyntacticGraph};
use crate::arena::{NodeId, PortId};
use crate::doctrine::Layered;
use crate::error::{BuildError, Result, RewireError};
use crate::term::{Column, Contraction, Series, Term};
use crate::trace::{Pass, RewriteStep};
use tracing::{debug, info};

impl SyntacticGraph {
    /// Straightens every join with a permutation column and builds the final
    /// expression.
    pub fn insert_permutations(&mut self) -> Result<()> {
        self.require("insert_permutations", Phase::Structured)?;

        let columns: Vec<Column> = self.series.columns().filter(|c| !c.is_empty()).cloned().collect();
        let mut permuted: Vec<Column> = Vec::with_capacity(columns.len());
        let mut previous: Option<&Column> = None;
        for column in &columns {
            if let Some(left) = previous {
                match self.join_permutation(left, column) {
                    Ok(Some(permutation)) => {
                        let node = self.add_permutation_node(left, column, permutation.clone());
                        self.trace.record(RewriteStep::Permutation {
                            node,
                            position: permuted.len(),
                            permutation,
                        });
                        permuted.push(Column::from_nodes([node]));
                    }
                    Ok(None) => {}
                    Err(reason) => self.skip(Pass::Permutation, reason),
                }
            }
            permuted.push(column.clone());
            previous = Some(column);
        }

        let series = Series::from_columns(permuted);
        let expression = self.close_expression(&series)?;
        self.series = series;
        self.expression = Some(expression);
        self.phase = Phase::PermutationsInserted;
        info!(graph = %self.name, columns = self.series.len(), "permutations inserted");
        self.validate_with(&Layered)
    }

    /// The mapping between `left` and `right`, or `None` if it is the identity.
    fn join_permutation(&self, left: &Column, right: &Column) -> std::result::Result<Option<Vec<usize>>, RewireError> {
        let sources = left.outputs(&self.network);
        let targets = right.inputs(&self.network);
        if sources.len() != targets.len() {
            return Err(RewireError::Arity {
                expected: sources.len(),
                found: targets.len(),
            });
        }

        let mut permutation = Vec::with_capacity(sources.len());
        for &source in &sources {
            let index = self
                .network
                .connected_port(source)
                .and_then(|peer| right.input_index(&self.network, peer))
                .ok_or(RewireError::Unmatched(source))?;
            permutation.push(index);
        }

        let mut seen = vec![false; permutation.len()];
        for &target in &permutation {
            if std::mem::replace(&mut seen[target], true) {
                return Err(RewireError::NotPermutation(permutation));
            }
        }
        let identity = permutation.iter().enumerate().all(|(n, &target)| n == target);
        Ok((!identity).then_some(permutation))
    }

    /// Routes every `left -> right` edge through a new permutation node.
    fn add_permutation_node(&mut self, left: &Column, right: &Column, permutation: Vec<usize>) -> NodeId {
        let sources = left.outputs(&self.network);
        let targets = right.inputs(&self.network);
        let node = self.network.add_permutation(permutation.clone());
        let (node_in, node_out): (Vec<PortId>, Vec<PortId>) = {
            let n = self.network.node(node);
            (n.inputs().to_vec(), n.outputs().to_vec())
        };

        for (n, (&source, &target)) in sources.iter().zip(&permutation).enumerate() {
            let destination = targets[target];
            self.network.disconnect(source, destination);
            self.network.connect(source, node_in[n]);
            self.network.connect(node_out[target], destination);
        }
        self.admit(node);
        debug!(node = %node, ?permutation, "inserted permutation");
        node
    }

    /// Wraps the series in a contraction closing the feedback pairs and
    /// checks that every join fits.
    fn close_expression(&self, series: &Series) -> Result<Term> {
        if let Some((position, left, right)) = series.first_mismatch(&self.network) {
            return Err(BuildError::RankMismatch { position, left, right });
        }
        let degree = self.feedback.len();
        if degree == 0 {
            return Ok(Term::Series(series.clone()));
        }
        let contraction = Contraction::new(Term::Series(series.clone()), degree);
        if contraction.rank(&self.network).is_none() {
            let rank = series.rank(&self.network).unwrap_or_default();
            return Err(BuildError::ContractionOverflow { degree, rank });
        }
        Ok(Term::Contraction(contraction))
    }
}
