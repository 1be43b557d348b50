//! Layering into columns.
//!
//! The first column is the root set. Each following column collects, in
//! output port order of the current column, the nodes all of whose inputs
//! are fed from the current column. An edge reaching a node that does not
//! follow yet gets an identity, which carries the wire into the next column.
//!
//! Terminal nodes may only appear in the last column. When a column would
//! mix terminal and non-terminal nodes, the terminal ones are pushed out:
//! they leave the column and an identity takes the place of each of their
//! inputs, so they are picked up again one column later. Isolated nodes have
//! no inputs to delay, so they go straight to the last column.
//!
//! The contraction folds the last channels of the series, so the first and
//! last columns finally move their receive and send nodes to the tail, in
//! feedback pair order.

use super::{Phase, SyntacticGraph};
use crate::arena::{HandleSet, NodeId, PortId};
use crate::error::Result;
use crate::term::{Column, Series, Term};
use crate::trace::RewriteStep;
use tracing::{debug, info};

impl SyntacticGraph {
    /// Layers the acyclic graph into a series of columns.
    pub fn structure(&mut self) -> Result<()> {
        self.require("structure", Phase::FeedbackRemoved)?;

        let (isolated, mut roots): (Vec<NodeId>, Vec<NodeId>) = self
            .root_set()
            .into_iter()
            .partition(|&n| self.network.node(n).is_isolated());
        let deferred = if roots.is_empty() {
            roots = isolated;
            Vec::new()
        } else {
            isolated
        };
        if roots.is_empty() {
            self.series = Series::new();
            self.phase = Phase::Structured;
            info!(graph = %self.name, "nothing to structure");
            return Ok(());
        }

        let mut visited: HandleSet<NodeId> = HandleSet::with_capacity(self.network.node_count());
        for &root in &roots {
            visited.insert(root);
        }
        let mut current = Column::from_nodes(roots);
        current.sort(&self.network);

        let mut columns = Vec::new();
        loop {
            let next = self.next_column(&current, &mut visited);
            columns.push(current);
            if next.is_empty() {
                break;
            }
            current = next;
        }

        if let Some(last) = columns.last_mut() {
            for node in deferred {
                last.push(Term::Node(node));
            }
            last.sort(&self.network);
        }
        self.order_feedback(&mut columns);

        debug!(columns = columns.len(), "structured");
        self.series = Series::from_columns(columns);
        self.phase = Phase::Structured;
        info!(graph = %self.name, columns = self.series.len(), "graph structured");
        Ok(())
    }

    fn next_column(&mut self, current: &Column, visited: &mut HandleSet<NodeId>) -> Column {
        let mut nodes = Vec::new();
        let mut has_terminal = false;
        let mut all_terminal = true;

        for port in current.outputs(&self.network) {
            let Some(peer) = self.network.connected_port(port) else {
                continue;
            };
            let owner = self.network.port(peer).owner();
            if visited.contains(owner) {
                continue;
            }
            if current.does_follow(&self.network, owner) {
                visited.insert(owner);
                let terminal = self.network.node(owner).is_terminal();
                has_terminal |= terminal;
                all_terminal &= terminal;
                nodes.push(owner);
            } else {
                let identity = self.splice_identity(port, peer, false);
                visited.insert(identity);
                all_terminal = false;
                nodes.push(identity);
            }
        }

        if has_terminal && !all_terminal {
            nodes = self.push_out_terminals(nodes, visited);
        }
        let mut column = Column::from_nodes(nodes);
        column.sort(&self.network);
        column
    }

    /// Moves the feedback nodes of the first and last columns to their tail,
    /// in the order the pairs were cut.
    fn order_feedback(&self, columns: &mut [Column]) {
        let pair_index = |node: NodeId| {
            self.feedback
                .iter()
                .position(|pair| pair.send == node || pair.receive == node)
        };
        if let Some(first) = columns.first_mut() {
            first.move_to_tail(pair_index);
        }
        if let Some(last) = columns.last_mut() {
            last.move_to_tail(pair_index);
        }
    }

    /// Delays the terminal nodes of a mixed column by one column.
    fn push_out_terminals(&mut self, nodes: Vec<NodeId>, visited: &mut HandleSet<NodeId>) -> Vec<NodeId> {
        let (terminals, mut kept): (Vec<NodeId>, Vec<NodeId>) = nodes
            .into_iter()
            .partition(|&n| self.network.node(n).is_terminal());

        for terminal in terminals {
            visited.remove(terminal);
            let inputs = self.network.node(terminal).inputs().to_vec();
            for input in inputs {
                let Some(source) = self.network.connected_port(input) else {
                    continue;
                };
                let identity = self.splice_identity(source, input, true);
                visited.insert(identity);
                kept.push(identity);
            }
            debug!(node = %terminal, "pushed out terminal node");
        }
        kept
    }

    /// Inserts an identity on the edge `source -> destination`.
    fn splice_identity(&mut self, source: PortId, destination: PortId, push_out: bool) -> NodeId {
        self.network.disconnect(source, destination);
        let identity = self.network.add_identity();
        let (id_in, id_out) = {
            let node = self.network.node(identity);
            (node.inputs()[0], node.outputs()[0])
        };
        self.network.connect(source, id_in);
        self.network.connect(id_out, destination);
        self.admit(identity);
        self.trace.record(RewriteStep::Identity {
            identity,
            port: destination,
            push_out,
        });
        identity
    }
}
