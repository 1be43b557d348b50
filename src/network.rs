//! Node and port storage with symmetric wiring primitives.
//!
//! `Network` owns the node and port arenas. Every connection is recorded on
//! both ports, so traversal in either direction is a slot lookup. The typed
//! constructors build each synthetic node shape with its fixed port lists.
//!
//! # Invariants
//! - A port appears in exactly one node's input or output list.
//! - `connect(a, b)` and `disconnect(a, b)` update both ends.

use crate::arena::{Arena, NodeId, PortId};
use crate::error::RewireError;
use crate::model::{EntityKey, PortKey};
use crate::node::{Node, NodeKind};
use crate::port::{Direction, ModelChannel, Port};
use tracing::debug;

/// Arena-backed node/port graph.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Arena<NodeId, Node>,
    ports: Arena<PortId, Port>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// All nodes in allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// All ports in allocation order.
    pub fn ports(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter()
    }

    /// Appends a port to `node` and returns it.
    pub(crate) fn add_port(&mut self, node: NodeId, direction: Direction, represented: Option<ModelChannel>) -> PortId {
        let position = match direction {
            Direction::Input => self.nodes[node].inputs.len(),
            Direction::Output => self.nodes[node].outputs.len(),
        };
        let port = self.ports.allocate(Port::new(node, direction, position, represented));
        match direction {
            Direction::Input => self.nodes[node].inputs.push(port),
            Direction::Output => self.nodes[node].outputs.push(port),
        }
        port
    }

    /// Adds `width` ports standing for the channels of one model port.
    ///
    /// Returns the position of the first one.
    pub(crate) fn add_represented_ports(
        &mut self,
        node: NodeId,
        direction: Direction,
        port: PortKey,
        width: usize,
    ) -> usize {
        let base = match direction {
            Direction::Input => self.nodes[node].inputs.len(),
            Direction::Output => self.nodes[node].outputs.len(),
        };
        for channel in 0..width {
            self.add_port(node, direction, Some(ModelChannel::new(port, channel)));
        }
        self.nodes[node].record_span(port, direction, base, width);
        base
    }

    fn add_shaped(&mut self, node: Node, inputs: usize, outputs: usize) -> NodeId {
        let id = self.nodes.allocate(node);
        for _ in 0..inputs {
            self.add_port(id, Direction::Input, None);
        }
        for _ in 0..outputs {
            self.add_port(id, Direction::Output, None);
        }
        id
    }

    pub(crate) fn add_representative(&mut self, entity: EntityKey, name: &str) -> NodeId {
        self.nodes.allocate(Node::representative(entity, name))
    }

    pub(crate) fn add_identity(&mut self) -> NodeId {
        self.add_shaped(Node::new(NodeKind::Identity), 1, 1)
    }

    /// Cap feeding an input that has nothing upstream.
    pub(crate) fn add_source_cap(&mut self) -> NodeId {
        self.add_shaped(Node::new(NodeKind::Cap), 0, 1)
    }

    /// Cap absorbing an output that has nothing downstream.
    pub(crate) fn add_sink_cap(&mut self) -> NodeId {
        self.add_shaped(Node::new(NodeKind::Cap), 1, 0)
    }

    pub(crate) fn add_split(&mut self, valence: usize) -> Result<NodeId, RewireError> {
        if valence < 2 {
            return Err(RewireError::Valence(valence));
        }
        Ok(self.add_shaped(Node::new(NodeKind::Split), 1, valence))
    }

    pub(crate) fn add_merge(&mut self, valence: usize) -> Result<NodeId, RewireError> {
        if valence < 2 {
            return Err(RewireError::Valence(valence));
        }
        Ok(self.add_shaped(Node::new(NodeKind::Merge), valence, 1))
    }

    pub(crate) fn add_send(&mut self) -> NodeId {
        self.add_shaped(Node::new(NodeKind::Send), 1, 0)
    }

    pub(crate) fn add_receive(&mut self) -> NodeId {
        self.add_shaped(Node::new(NodeKind::Receive), 0, 1)
    }

    pub(crate) fn add_permutation(&mut self, permutation: Vec<usize>) -> NodeId {
        let len = permutation.len();
        self.add_shaped(Node::with_permutation(permutation), len, len)
    }

    pub(crate) fn add_exterior_input(&mut self, channel: ModelChannel) -> NodeId {
        self.add_shaped(Node::exterior(NodeKind::Input, channel), 0, 1)
    }

    pub(crate) fn add_exterior_output(&mut self, channel: ModelChannel) -> NodeId {
        self.add_shaped(Node::exterior(NodeKind::Output, channel), 1, 0)
    }

    /// Connects output `from` to input `to`.
    pub(crate) fn connect(&mut self, from: PortId, to: PortId) {
        debug_assert_eq!(self.ports[from].direction(), Direction::Output);
        debug_assert_eq!(self.ports[to].direction(), Direction::Input);
        debug!(
            from = %from,
            to = %to,
            source = %self.ports[from].owner(),
            target = %self.ports[to].owner(),
            "connect"
        );
        self.ports[from].link(to);
        self.ports[to].link(from);
    }

    /// Removes the link between `a` and `b`; returns `false` if there was none.
    pub(crate) fn disconnect(&mut self, a: PortId, b: PortId) -> bool {
        let forward = self.ports[a].unlink(b);
        let backward = self.ports[b].unlink(a);
        forward && backward
    }

    /// Removes every link of `port`, returning the former peers in link order.
    pub(crate) fn disconnect_all(&mut self, port: PortId) -> Vec<PortId> {
        let peers = self.ports[port].take_links();
        for &peer in &peers {
            self.ports[peer].unlink(port);
        }
        peers
    }

    pub(crate) fn mark_empty(&mut self, port: PortId) {
        self.ports[port].mark_empty();
    }

    /// The port connected to `port`, if any.
    #[inline]
    pub fn connected_port(&self, port: PortId) -> Option<PortId> {
        self.ports[port].connection()
    }

    /// The node owning the port connected to `port`, if any.
    pub fn connected_node(&self, port: PortId) -> Option<NodeId> {
        self.connected_port(port).map(|peer| self.ports[peer].owner())
    }

    /// Output port standing for `channel` of a represented model port.
    pub fn represented_output(&self, node: NodeId, channel: ModelChannel) -> Option<PortId> {
        let node = &self.nodes[node];
        node.outputs().get(node.output_position(channel)?).copied()
    }

    /// Input port standing for `channel` of a represented model port.
    pub fn represented_input(&self, node: NodeId, channel: ModelChannel) -> Option<PortId> {
        let node = &self.nodes[node];
        node.inputs().get(node.input_position(channel)?).copied()
    }

    /// Nodes feeding `node`, in input order (one entry per connected input).
    pub fn upstream_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node]
            .inputs()
            .iter()
            .flat_map(|&p| self.ports[p].links().iter().map(|&peer| self.ports[peer].owner()))
            .collect()
    }

    /// Nodes fed by `node`, in output order (one entry per connected output).
    pub fn downstream_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node]
            .outputs()
            .iter()
            .flat_map(|&p| self.ports[p].links().iter().map(|&peer| self.ports[peer].owner()))
            .collect()
    }

    /// Position of `port` among the inputs of its owner.
    pub fn input_index(&self, port: PortId) -> Option<usize> {
        let p = self.ports.get(port)?;
        (p.direction() == Direction::Input).then(|| p.position())
    }

    /// Position of `port` among the outputs of its owner.
    pub fn output_index(&self, port: PortId) -> Option<usize> {
        let p = self.ports.get(port)?;
        (p.direction() == Direction::Output).then(|| p.position())
    }
}
