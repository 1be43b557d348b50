//! Feedback extraction.
//!
//! A depth-first search over output links finds the back edges; each one is
//! cut and replaced by a receive node feeding the destination and a send
//! node absorbing the source. The search keeps two bitsets, `on_path`
//! (expanded and not yet finished) and `visited` (expanded), so it holds no
//! state on the nodes themselves.
//!
//! Seeds are the initial nodes in admission order, followed by every other
//! node in admission order; a seed already visited is skipped. A closed
//! cycle with no initial node is therefore entered at its first admitted
//! node.

use super::{FeedbackPair, Phase, SyntacticGraph};
use crate::arena::{HandleSet, NodeId, PortId};
use crate::doctrine::Acyclic;
use crate::error::{Result, RewireError};
use crate::network::Network;
use crate::trace::{Pass, RewriteStep};
use tracing::{debug, info};

/// A back edge from output `source` to input `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackEdge {
    pub source: PortId,
    pub destination: PortId,
}

/// Finds the back edges of a depth-first search seeded in `seeds` order.
///
/// Removing the returned edges leaves the wiring acyclic.
pub fn back_edges(network: &Network, seeds: impl IntoIterator<Item = NodeId>) -> Vec<BackEdge> {
    let capacity = network.node_count();
    let mut on_path: HandleSet<NodeId> = HandleSet::with_capacity(capacity);
    let mut visited: HandleSet<NodeId> = HandleSet::with_capacity(capacity);
    let mut stack: Vec<NodeId> = Vec::new();
    let mut edges = Vec::new();

    for seed in seeds {
        if visited.contains(seed) {
            continue;
        }
        stack.push(seed);
        while let Some(&top) = stack.last() {
            if visited.contains(top) {
                // Finished, or a stale duplicate of a node expanded elsewhere.
                on_path.remove(top);
                stack.pop();
                continue;
            }
            on_path.insert(top);
            for &source in network.node(top).outputs() {
                let Some(destination) = network.connected_port(source) else {
                    continue;
                };
                let next = network.port(destination).owner();
                if on_path.contains(next) {
                    edges.push(BackEdge { source, destination });
                } else if !visited.contains(next) {
                    stack.push(next);
                }
            }
            visited.insert(top);
        }
    }
    edges
}

impl SyntacticGraph {
    /// Cuts every back edge into a send/receive pair.
    pub fn remove_feedback(&mut self) -> Result<()> {
        self.require("remove_feedback", Phase::Bijective)?;

        let seeds: Vec<NodeId> = self
            .root_set()
            .into_iter()
            .chain(self.admitted.iter().copied())
            .collect();
        let edges = back_edges(&self.network, seeds);
        for edge in edges {
            match self.cut_feedback(edge) {
                Ok(pair) => self.feedback.push(pair),
                Err(reason) => self.skip(Pass::Feedback, reason),
            }
        }

        self.phase = Phase::FeedbackRemoved;
        info!(graph = %self.name, feedback = self.feedback.len(), "feedback removed");
        self.validate_with(&Acyclic)
    }

    fn cut_feedback(&mut self, edge: BackEdge) -> std::result::Result<FeedbackPair, RewireError> {
        if !self.network.disconnect(edge.source, edge.destination) {
            return Err(RewireError::NotConnected(edge.source));
        }
        let receive = self.network.add_receive();
        let send = self.network.add_send();
        let receive_out = self.network.node(receive).outputs()[0];
        let send_in = self.network.node(send).inputs()[0];
        self.network.connect(receive_out, edge.destination);
        self.network.connect(edge.source, send_in);
        self.admit(receive);
        self.admit(send);

        debug!(source = %edge.source, destination = %edge.destination, "cut feedback edge");
        self.trace.record(RewriteStep::FeedbackCut {
            send,
            receive,
            source: edge.source,
            destination: edge.destination,
        });
        Ok(FeedbackPair { send, receive })
    }
}
