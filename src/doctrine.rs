//! Doctrines: structural invariants of a syntactic graph.
//!
//! A doctrine is a named set of constraints a graph must satisfy once a given
//! pass has run:
//! - [`Bijective`]: every port has at most one link, recorded on both ends
//!   between an output and an input.
//! - [`Acyclic`]: the wiring has no directed cycle.
//! - [`Layered`]: every join of the series is straight, every node sits in
//!   exactly one column, and the contraction folds each send into its own
//!   receive.
//!
//! The pipeline runs them after the matching pass when
//! [`BuildOptions::validate`](crate::config::BuildOptions::validate) is set;
//! tests run them directly.

use crate::arena::{NodeId, PortId};
use crate::graph::SyntacticGraph;
use crate::term::{Channel, Term};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// A violated structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoctrineError {
    #[error("{port} has {count} links")]
    MultiplyConnected { port: PortId, count: usize },

    #[error("{port} links to {peer}, which does not link back")]
    Asymmetric { port: PortId, peer: PortId },

    #[error("{port} links to {peer} of the same direction")]
    WrongDirection { port: PortId, peer: PortId },

    #[error("cycle detected: {remaining} nodes left unsorted")]
    CycleDetected { remaining: usize },

    #[error("join {position}: {outputs} outputs cannot feed {inputs} inputs")]
    ArityMismatch { position: usize, outputs: usize, inputs: usize },

    #[error("join {column}: output {index} does not feed input {index}")]
    CrossedWire { column: usize, index: usize },

    #[error("{node} appears {count} times in the series")]
    Misplaced { node: NodeId, count: usize },

    #[error("feedback pair {pair} is not folded onto itself")]
    MisfoldedFeedback { pair: usize },
}

/// Structural constraints checked against a whole graph.
pub trait Doctrine {
    fn name(&self) -> &'static str;

    fn validate(&self, graph: &SyntacticGraph) -> Result<(), DoctrineError>;
}

/// Every port has at most one link, and links are symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bijective;

impl Doctrine for Bijective {
    fn name(&self) -> &'static str {
        "bijective"
    }

    fn validate(&self, graph: &SyntacticGraph) -> Result<(), DoctrineError> {
        let network = graph.network();
        for (id, port) in network.ports() {
            if port.connection_count() > 1 {
                return Err(DoctrineError::MultiplyConnected {
                    port: id,
                    count: port.connection_count(),
                });
            }
            let Some(peer) = port.connection() else {
                continue;
            };
            let other = network.port(peer);
            if other.connection() != Some(id) {
                return Err(DoctrineError::Asymmetric { port: id, peer });
            }
            if other.direction() != port.direction().opposite() {
                return Err(DoctrineError::WrongDirection { port: id, peer });
            }
        }
        Ok(())
    }
}

/// The wiring between admitted nodes has no directed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acyclic;

impl Doctrine for Acyclic {
    fn name(&self) -> &'static str {
        "acyclic"
    }

    /// Kahn's algorithm over the downstream links, seeded in admission order.
    fn validate(&self, graph: &SyntacticGraph) -> Result<(), DoctrineError> {
        let network = graph.network();
        let nodes = graph.nodes();

        let mut indegree: HashMap<NodeId, usize> = nodes.iter().map(|&n| (n, 0)).collect();
        for &node in nodes {
            for next in network.downstream_nodes(node) {
                *indegree.entry(next).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<NodeId> = nodes.iter().copied().filter(|n| indegree[n] == 0).collect();
        let mut sorted = 0;
        while let Some(node) = queue.pop_front() {
            sorted += 1;
            for next in network.downstream_nodes(node) {
                if let Some(degree) = indegree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if sorted == indegree.len() {
            Ok(())
        } else {
            Err(DoctrineError::CycleDetected {
                remaining: indegree.len() - sorted,
            })
        }
    }
}

/// Output `n` of every column feeds input `n` of the next, every admitted
/// node appears in exactly one column, and the folded channels of the
/// contraction are the feedback pairs in cut order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layered;

impl Doctrine for Layered {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn validate(&self, graph: &SyntacticGraph) -> Result<(), DoctrineError> {
        let network = graph.network();
        let columns: Vec<_> = graph.series().columns().collect();

        for (position, pair) in columns.windows(2).enumerate() {
            let outputs = pair[0].outputs(network);
            let inputs = pair[1].inputs(network);
            if outputs.len() != inputs.len() {
                return Err(DoctrineError::ArityMismatch {
                    position,
                    outputs: outputs.len(),
                    inputs: inputs.len(),
                });
            }
            for (index, (&out, &inp)) in outputs.iter().zip(&inputs).enumerate() {
                if network.connected_port(out) != Some(inp) {
                    return Err(DoctrineError::CrossedWire { column: position, index });
                }
            }
        }

        let mut placements: HashMap<NodeId, usize> = HashMap::new();
        for column in &columns {
            for node in column.nodes() {
                *placements.entry(node).or_insert(0) += 1;
            }
        }
        for &node in graph.nodes() {
            let count = placements.get(&node).copied().unwrap_or(0);
            if count != 1 {
                return Err(DoctrineError::Misplaced { node, count });
            }
        }

        if let Some(Term::Contraction(contraction)) = graph.expression() {
            let folded = contraction.folded(network);
            for (pair, feedback) in graph.feedback_pairs().iter().enumerate() {
                let expected = (Channel::Boundary(feedback.send), Channel::Boundary(feedback.receive));
                if folded.get(pair) != Some(&expected) {
                    return Err(DoctrineError::MisfoldedFeedback { pair });
                }
            }
        }
        Ok(())
    }
}
