//! Node admission and wiring reconstruction.
//!
//! Admitting an entity creates its representative node, expands each model
//! port into one syntactic port per channel (inputs and outputs separately;
//! a `Both` port gets both) and reconstructs the links to everything admitted
//! so far:
//!
//! - a channel with no model link gets a cap;
//! - a link to an exterior port goes through the shared exterior node for
//!   that port channel, created on first use;
//! - a link to an admitted entity connects to the matching channel port of
//!   its representative. Links to entities admitted later are picked up
//!   when those are admitted.
//!
//! Caps and exterior nodes are admitted before the representative node, so
//! they take the lower label numbers.

use super::{SyntacticGraph, Phase};
use crate::arena::{NodeId, PortId};
use crate::error::{BuildError, Result};
use crate::model::{ChannelLink, EntityKey, ModelSource, PortOwner};
use crate::port::{Direction, ModelChannel};
use crate::trace::RewriteStep;
use tracing::debug;

impl SyntacticGraph {
    /// Whether new nodes may still be admitted.
    pub fn can_admit(&self) -> bool {
        self.phase <= Phase::NodesAdmitted
    }

    /// Admits `entity` and reconstructs its wiring.
    pub fn admit_entity<M: ModelSource + ?Sized>(&mut self, model: &M, entity: EntityKey) -> Result<NodeId> {
        if !self.can_admit() {
            return Err(BuildError::AdmissionClosed { phase: self.phase });
        }
        let name = model.entity_name(entity);
        if self.representing.contains_key(&entity) {
            return Err(BuildError::DuplicateEntity {
                entity,
                name: name.to_owned(),
            });
        }

        let node = self.network.add_representative(entity, name);
        for port in model.entity_ports(entity) {
            let direction = model.port_direction(port);
            let width = model.port_width(port).max(1);
            if direction.accepts_input() {
                self.network.add_represented_ports(node, Direction::Input, port, width);
            }
            if direction.accepts_output() {
                self.network.add_represented_ports(node, Direction::Output, port, width);
            }
        }
        // Registered before wiring so links from the entity to itself resolve.
        self.representing.insert(entity, node);

        let inputs = self.network.node(node).inputs().to_vec();
        for port in inputs {
            self.wire_input(model, port);
        }
        let outputs = self.network.node(node).outputs().to_vec();
        for port in outputs {
            self.wire_output(model, entity, port);
        }

        self.admit(node);
        self.phase = Phase::NodesAdmitted;
        debug!(entity = %entity, name, node = %node, "admitted entity");
        Ok(node)
    }

    fn channel_links<M: ModelSource + ?Sized>(model: &M, channel: ModelChannel) -> Vec<ChannelLink> {
        model
            .links(channel.port)
            .into_iter()
            .filter(|link| link.channel == channel.channel)
            .collect()
    }

    fn wire_input<M: ModelSource + ?Sized>(&mut self, model: &M, port: PortId) {
        let Some(channel) = self.network.port(port).represented() else {
            return;
        };
        let links = Self::channel_links(model, channel);
        if links.is_empty() {
            self.network.mark_empty(port);
            self.cap_port(port);
            return;
        }

        for link in links {
            let peer = ModelChannel::new(link.peer, link.peer_channel);
            let source = match model.port_owner(link.peer) {
                PortOwner::Exterior => {
                    if !model.port_direction(link.peer).accepts_input() {
                        continue;
                    }
                    let node = self.exterior_input_node(peer);
                    self.network.node(node).outputs().first().copied()
                }
                PortOwner::Entity(other) => match self.representing.get(&other) {
                    Some(&node) => self.network.represented_output(node, peer),
                    None => None,
                },
            };
            if let Some(source) = source {
                self.network.connect(source, port);
            }
        }
    }

    fn wire_output<M: ModelSource + ?Sized>(&mut self, model: &M, entity: EntityKey, port: PortId) {
        let Some(channel) = self.network.port(port).represented() else {
            return;
        };
        let links = Self::channel_links(model, channel);
        if links.is_empty() {
            self.network.mark_empty(port);
            self.cap_port(port);
            return;
        }

        for link in links {
            let peer = ModelChannel::new(link.peer, link.peer_channel);
            let target = match model.port_owner(link.peer) {
                PortOwner::Exterior => {
                    if !model.port_direction(link.peer).accepts_output() {
                        continue;
                    }
                    let node = self.exterior_output_node(peer);
                    self.network.node(node).inputs().first().copied()
                }
                // Links back into the same entity were made from its inputs.
                PortOwner::Entity(other) if other == entity => None,
                PortOwner::Entity(other) => match self.representing.get(&other) {
                    Some(&node) => self.network.represented_input(node, peer),
                    None => None,
                },
            };
            if let Some(target) = target {
                self.network.connect(port, target);
            }
        }
    }

    /// Attaches a cap to `port`: a source cap for an input, a sink cap for an
    /// output.
    pub(crate) fn cap_port(&mut self, port: PortId) -> NodeId {
        let cap = match self.network.port(port).direction() {
            Direction::Input => {
                let cap = self.network.add_source_cap();
                let out = self.network.node(cap).outputs()[0];
                self.network.connect(out, port);
                cap
            }
            Direction::Output => {
                let cap = self.network.add_sink_cap();
                let inp = self.network.node(cap).inputs()[0];
                self.network.connect(port, inp);
                cap
            }
        };
        self.admit(cap);
        self.trace.record(RewriteStep::Cap { cap, port });
        cap
    }

    fn exterior_input_node(&mut self, channel: ModelChannel) -> NodeId {
        if let Some(&node) = self.exterior_inputs.get(&channel) {
            return node;
        }
        let node = self.network.add_exterior_input(channel);
        self.exterior_inputs.insert(channel, node);
        self.admit(node);
        node
    }

    fn exterior_output_node(&mut self, channel: ModelChannel) -> NodeId {
        if let Some(&node) = self.exterior_outputs.get(&channel) {
            return node;
        }
        let node = self.network.add_exterior_output(channel);
        self.exterior_outputs.insert(channel, node);
        self.admit(node);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{actor, chain};
    use super::*;
    use crate::model::{Model, PortDirection};
    use crate::node::NodeKind;

    fn admit_all(model: &Model) -> SyntacticGraph {
        let mut graph = SyntacticGraph::new(model.name());
        for entity in model.entities() {
            graph.admit_entity(model, entity).unwrap();
        }
        graph
    }

    #[test]
    fn chain_wiring_is_reconstructed() {
        let graph = admit_all(&chain());
        assert_eq!(graph.phase(), Phase::NodesAdmitted);
        assert_eq!(graph.nodes().len(), 3);
        let [a, b, c] = [0, 1, 2].map(|i| graph.node_for_entity(EntityKey(i)).unwrap());
        let net = graph.network();
        assert_eq!(net.downstream_nodes(a), vec![b]);
        assert_eq!(net.downstream_nodes(b), vec![c]);
        assert_eq!(net.upstream_nodes(a), vec![]);
        assert_eq!(graph.label_of(a), Some("E0"));
        assert_eq!(graph.label_of(c), Some("E2"));
    }

    #[test]
    fn empty_channels_are_capped_before_the_entity() {
        let mut model = Model::new("lonely");
        actor(&mut model, "A", 1, 1);
        let graph = admit_all(&model);
        let kinds: Vec<NodeKind> = graph
            .nodes()
            .iter()
            .map(|&n| graph.network().node(n).kind())
            .collect();
        assert_eq!(kinds, [NodeKind::Cap, NodeKind::Cap, NodeKind::Representative]);
        assert_eq!(graph.label_of(graph.nodes()[2]), Some("E2"));
        let a = graph.node_for_entity(EntityKey(0)).unwrap();
        let input = graph.network().node(a).inputs()[0];
        assert!(graph.network().port(input).is_empty());
        assert_eq!(graph.report().caps, 2);
    }

    #[test]
    fn multiports_expand_by_width() {
        let mut model = Model::new("wide");
        let a = model.add_entity("A");
        let b = model.add_entity("B");
        let out = model.add_port(a, "out", PortDirection::Output, 2).unwrap();
        let inp = model.add_port(b, "in", PortDirection::Input, 2).unwrap();
        model.connect_channels(out, 0, inp, 1).unwrap();
        model.connect_channels(out, 1, inp, 0).unwrap();
        let graph = admit_all(&model);
        let net = graph.network();
        let a_node = graph.node_for_entity(a).unwrap();
        let b_node = graph.node_for_entity(b).unwrap();
        let outs = net.node(a_node).outputs();
        let ins = net.node(b_node).inputs();
        assert_eq!(net.connected_port(outs[0]), Some(ins[1]));
        assert_eq!(net.connected_port(outs[1]), Some(ins[0]));
    }

    #[test]
    fn exterior_ports_share_one_node_per_channel() {
        let mut model = Model::new("ext");
        let src = model.add_exterior_port("x", PortDirection::Input, 1);
        let sink = model.add_exterior_port("y", PortDirection::Output, 1);
        let a = actor(&mut model, "A", 1, 1);
        let b = actor(&mut model, "B", 1, 0);
        model.connect(src, a.inputs[0]).unwrap();
        model.connect(src, b.inputs[0]).unwrap();
        model.connect(a.outputs[0], sink).unwrap();
        let graph = admit_all(&model);

        let ins: Vec<_> = graph.exterior_inputs().collect();
        let outs: Vec<_> = graph.exterior_outputs().collect();
        assert_eq!((ins.len(), outs.len()), (1, 1));
        let net = graph.network();
        let fan = net.node(ins[0]).outputs()[0];
        assert_eq!(net.port(fan).connection_count(), 2);
        assert_eq!(graph.label_of(ins[0]), Some("I0"));
        assert_eq!(graph.label_of(outs[0]), Some("O1"));
    }

    #[test]
    fn self_loops_are_connected_once() {
        let mut model = Model::new("self");
        let a = actor(&mut model, "A", 1, 1);
        model.connect(a.outputs[0], a.inputs[0]).unwrap();
        let graph = admit_all(&model);
        let node = graph.node_for_entity(a.entity).unwrap();
        let net = graph.network();
        assert_eq!(net.downstream_nodes(node), vec![node]);
        assert_eq!(net.port(net.node(node).outputs()[0]).connection_count(), 1);
    }

    #[test]
    fn bidirectional_ports_get_both_sides() {
        let mut model = Model::new("both");
        let a = model.add_entity("A");
        let p = model.add_port(a, "io", PortDirection::Both, 1).unwrap();
        let none = model.add_port(a, "nc", PortDirection::None, 1).unwrap();
        let graph = admit_all(&model);
        let node = graph.network().node(graph.node_for_entity(a).unwrap());
        assert_eq!((node.inputs().len(), node.outputs().len()), (1, 1));
        assert!(node.input_position(ModelChannel::new(p, 0)).is_some());
        assert!(node.input_position(ModelChannel::new(none, 0)).is_none());
    }

    #[test]
    fn admission_rejects_duplicates_and_closes_after_bijection() {
        let model = chain();
        let mut graph = admit_all(&model);
        assert!(matches!(
            graph.admit_entity(&model, EntityKey(0)),
            Err(BuildError::DuplicateEntity { .. })
        ));
        graph.make_bijective().unwrap();
        assert!(!graph.can_admit());
        assert_eq!(
            graph.admit_entity(&model, EntityKey(1)),
            Err(BuildError::AdmissionClosed { phase: Phase::Bijective })
        );
    }
}
