//! Bijection normalization.
//!
//! A port linked to `k > 1` peers is a fan. Each fan is replaced by a
//! mediator of valence `k`: a merge for an input port, a split for an output
//! port. The peers are reattached one per mediator port in their original
//! link order, and the mediator's single remaining port is connected back to
//! the fanned port. Each mediation only touches the fanned port and its
//! peers, so the order in which fans are visited does not matter.

use super::{Phase, SyntacticGraph};
use crate::arena::{NodeId, PortId};
use crate::doctrine::Bijective;
use crate::error::{Result, RewireError};
use crate::port::Direction;
use crate::trace::{Pass, RewriteStep};
use tracing::{debug, info, warn};

impl SyntacticGraph {
    /// Replaces every fan by a split or merge mediator.
    ///
    /// Closes admission. Ports still dangling at this point (their model
    /// link leads to an entity that was never admitted) are capped first.
    pub fn make_bijective(&mut self) -> Result<()> {
        if self.phase == Phase::Empty {
            self.phase = Phase::NodesAdmitted;
        }
        self.require("make_bijective", Phase::NodesAdmitted)?;
        self.seal_dangling_ports();

        let snapshot = self.admitted.clone();
        let mut mediators = Vec::new();
        for node in snapshot {
            let inputs = self.network.node(node).inputs().to_vec();
            let outputs = self.network.node(node).outputs().to_vec();
            for port in inputs.into_iter().chain(outputs) {
                let valence = self.network.port(port).connection_count();
                if valence < 2 {
                    continue;
                }
                match self.mediate(port) {
                    Ok(mediator) => {
                        debug!(node = %node, port = %port, valence, mediator = %mediator, "mediated fan");
                        self.trace.record(RewriteStep::Mediator { mediator, port, valence });
                        mediators.push(mediator);
                    }
                    Err(reason) => self.skip(Pass::Bijection, reason),
                }
            }
        }
        let count = mediators.len();
        for mediator in mediators {
            self.admit(mediator);
        }

        self.phase = Phase::Bijective;
        info!(graph = %self.name, mediators = count, "graph made bijective");
        self.validate_with(&Bijective)
    }

    /// Caps every admitted port that has no link.
    fn seal_dangling_ports(&mut self) {
        let snapshot = self.admitted.clone();
        for node in snapshot {
            let ports: Vec<PortId> = {
                let n = self.network.node(node);
                n.inputs().iter().chain(n.outputs()).copied().collect()
            };
            for port in ports {
                if !self.network.port(port).is_connected() {
                    warn!(node = %node, port = %port, "capping dangling port");
                    self.cap_port(port);
                }
            }
        }
    }

    /// Replaces the fan at `port` by a mediator and returns the mediator.
    fn mediate(&mut self, port: PortId) -> std::result::Result<NodeId, RewireError> {
        let direction = self.network.port(port).direction();
        let peers = self.network.port(port).links().to_vec();
        let mediator = match direction {
            Direction::Input => self.network.add_merge(peers.len())?,
            Direction::Output => self.network.add_split(peers.len())?,
        };

        let node = self.network.node(mediator);
        let (fan, single) = match direction {
            Direction::Input => (node.inputs().to_vec(), node.outputs().first().copied()),
            Direction::Output => (node.outputs().to_vec(), node.inputs().first().copied()),
        };
        if fan.len() != peers.len() {
            return Err(RewireError::Arity {
                expected: peers.len(),
                found: fan.len(),
            });
        }
        let single = single.ok_or(RewireError::Arity { expected: 1, found: 0 })?;

        self.network.disconnect_all(port);
        for (&peer, &branch) in peers.iter().zip(&fan) {
            match direction {
                Direction::Input => self.network.connect(peer, branch),
                Direction::Output => self.network.connect(branch, peer),
            }
        }
        match direction {
            Direction::Input => self.network.connect(single, port),
            Direction::Output => self.network.connect(port, single),
        }
        Ok(mediator)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{actor, chain, fan_out};
    use super::*;
    use crate::config::BuildOptions;
    use crate::model::{Model, ModelSource};
    use crate::node::NodeKind;

    fn bijective(model: &Model) -> SyntacticGraph {
        let mut graph = SyntacticGraph::with_options(model.name(), BuildOptions::validating());
        for entity in model.entities() {
            graph.admit_entity(model, entity).unwrap();
        }
        graph.make_bijective().unwrap();
        graph
    }

    fn mediators(graph: &SyntacticGraph) -> Vec<NodeId> {
        graph
            .nodes()
            .iter()
            .copied()
            .filter(|&n| graph.network().node(n).kind().is_mediator())
            .collect()
    }

    #[test]
    fn chain_needs_no_mediators() {
        let graph = bijective(&chain());
        assert!(mediators(&graph).is_empty());
        assert_eq!(graph.phase(), Phase::Bijective);
    }

    #[test]
    fn fan_out_gets_one_split_of_valence_two() {
        let graph = bijective(&fan_out());
        let found = mediators(&graph);
        assert_eq!(found.len(), 1);
        let net = graph.network();
        let split = net.node(found[0]);
        assert_eq!(split.kind(), NodeKind::Split);
        assert_eq!(split.outputs().len(), 2);

        let [a, b, c] = [0, 1, 2].map(|i| graph.node_for_entity(crate::model::EntityKey(i)).unwrap());
        assert_eq!(net.downstream_nodes(a), vec![found[0]]);
        assert_eq!(net.downstream_nodes(found[0]), vec![b, c]);
        assert_eq!(graph.label_of(found[0]), Some("M3"));
    }

    #[test]
    fn fan_in_gets_a_merge() {
        let mut model = Model::new("fan_in");
        let a = actor(&mut model, "A", 0, 1);
        let b = actor(&mut model, "B", 0, 1);
        let c = actor(&mut model, "C", 1, 0);
        model.connect(a.outputs[0], c.inputs[0]).unwrap();
        model.connect(b.outputs[0], c.inputs[0]).unwrap();
        let graph = bijective(&model);
        let found = mediators(&graph);
        assert_eq!(found.len(), 1);
        let net = graph.network();
        assert_eq!(net.node(found[0]).kind(), NodeKind::Merge);
        let a_node = graph.node_for_entity(a.entity).unwrap();
        let b_node = graph.node_for_entity(b.entity).unwrap();
        assert_eq!(net.upstream_nodes(found[0]), vec![a_node, b_node]);
    }

    #[test]
    fn every_port_has_at_most_one_link() {
        let mut model = Model::new("dense");
        let a = actor(&mut model, "A", 0, 2);
        let b = actor(&mut model, "B", 2, 1);
        let c = actor(&mut model, "C", 1, 0);
        for &out in &a.outputs {
            for &inp in &b.inputs {
                model.connect(out, inp).unwrap();
            }
        }
        model.connect(b.outputs[0], c.inputs[0]).unwrap();
        model.connect(a.outputs[0], c.inputs[0]).unwrap();
        let graph = bijective(&model);
        assert!(graph
            .network()
            .ports()
            .all(|(_, port)| port.connection_count() <= 1));
    }

    #[test]
    fn dangling_ports_are_sealed() {
        let mut model = Model::new("dangling");
        let a = actor(&mut model, "A", 0, 1);
        let b = actor(&mut model, "B", 1, 0);
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        let mut graph = SyntacticGraph::new("partial");
        graph.admit_entity(&model, a.entity).unwrap();
        graph.make_bijective().unwrap();
        let node = graph.node_for_entity(a.entity).unwrap();
        let out = graph.network().node(node).outputs()[0];
        let cap = graph.network().connected_node(out).unwrap();
        assert_eq!(graph.network().node(cap).kind(), NodeKind::Cap);
        assert!(graph.network().node(cap).is_terminal());
    }
}
