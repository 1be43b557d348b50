//! Ports of syntactic nodes.
//!
//! A port is one channel of one directional endpoint of a node. It is owned
//! by exactly one node and may stand for one channel of a model port.
//! Connection state is a symmetric adjacency list: if `a` lists `b` then `b`
//! lists `a`. Several links are allowed while the model is being admitted;
//! once the graph is bijective each port has at most one.

use crate::arena::{NodeId, PortId};
use crate::model::PortKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a syntactic port relative to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("in"),
            Direction::Output => f.write_str("out"),
        }
    }
}

/// One channel of a model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelChannel {
    pub port: PortKey,
    pub channel: usize,
}

impl ModelChannel {
    #[inline]
    pub const fn new(port: PortKey, channel: usize) -> Self {
        Self { port, channel }
    }
}

impl fmt::Display for ModelChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.port, self.channel)
    }
}

/// A port in the syntactic graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    owner: NodeId,
    direction: Direction,
    /// Position in the owner's input or output list.
    position: usize,
    represented: Option<ModelChannel>,
    empty: bool,
    links: Vec<PortId>,
}

impl Port {
    pub(crate) fn new(owner: NodeId, direction: Direction, position: usize, represented: Option<ModelChannel>) -> Self {
        Self {
            owner,
            direction,
            position,
            represented,
            empty: false,
            links: Vec::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Index of this port in its owner's input or output list.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The model port channel this port stands for, if any.
    #[inline]
    pub fn represented(&self) -> Option<ModelChannel> {
        self.represented
    }

    /// Whether the represented channel had no model link and was capped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Connected peers in link order.
    #[inline]
    pub fn links(&self) -> &[PortId] {
        &self.links
    }

    /// The connected peer. Meaningful once the graph is bijective.
    #[inline]
    pub fn connection(&self) -> Option<PortId> {
        self.links.first().copied()
    }

    #[inline]
    pub fn connection_count(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    pub(crate) fn mark_empty(&mut self) {
        self.empty = true;
    }

    pub(crate) fn link(&mut self, peer: PortId) {
        self.links.push(peer);
    }

    pub(crate) fn unlink(&mut self, peer: PortId) -> bool {
        match self.links.iter().position(|p| *p == peer) {
            Some(idx) => {
                self.links.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_links(&mut self) -> Vec<PortId> {
        std::mem::take(&mut self.links)
    }
}
