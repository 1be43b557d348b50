//! Read-only view of the dataflow model being rewritten.
//!
//! The rewriting core consumes a model through [`ModelSource`] only: entities
//! in admission order, their ordered ports, port direction and channel width,
//! and the channel-level links between ports. Ports owned by the enclosing
//! composite rather than an entity are *exterior* ports.
//!
//! [`Model`] is an in-memory implementation with a builder API and CBOR
//! persistence.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a model entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub u32);

/// Identifier of a model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortKey(pub u32);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// Direction of a model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
    Both,
    None,
}

impl PortDirection {
    /// Whether data enters the owner through this port.
    #[inline]
    pub fn accepts_input(self) -> bool {
        matches!(self, PortDirection::Input | PortDirection::Both)
    }

    /// Whether data leaves the owner through this port.
    #[inline]
    pub fn accepts_output(self) -> bool {
        matches!(self, PortDirection::Output | PortDirection::Both)
    }
}

/// Owner of a model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortOwner {
    Entity(EntityKey),
    /// The enclosing composite.
    Exterior,
}

/// One channel-level link as seen from a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLink {
    /// Channel on the port the link was requested for.
    pub channel: usize,
    pub peer: PortKey,
    pub peer_channel: usize,
}

/// Read-only traversal surface over a dataflow model.
///
/// Links must be reported from both ends: if port `a` lists a link to `b`,
/// then `b` lists the mirrored link to `a`.
pub trait ModelSource {
    /// Name of the enclosing composite.
    fn name(&self) -> &str;

    /// Entities in admission order.
    fn entities(&self) -> Vec<EntityKey>;

    fn entity_name(&self, entity: EntityKey) -> &str;

    /// Ports of `entity`, in declaration order.
    fn entity_ports(&self, entity: EntityKey) -> Vec<PortKey>;

    fn port_name(&self, port: PortKey) -> &str;

    fn port_owner(&self, port: PortKey) -> PortOwner;

    fn port_direction(&self, port: PortKey) -> PortDirection;

    /// Declared channel width; values below 1 are treated as 1 by the core.
    fn port_width(&self, port: PortKey) -> usize;

    /// All channel links of `port`, in connection order.
    fn links(&self, port: PortKey) -> Vec<ChannelLink>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EntityRecord {
    name: String,
    ports: Vec<PortKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PortRecord {
    name: String,
    owner: PortOwner,
    direction: PortDirection,
    width: usize,
    links: Vec<ChannelLink>,
}

/// In-memory dataflow model.
///
/// ```
/// use syntactic::model::{Model, PortDirection};
///
/// let mut model = Model::new("pipeline");
/// let a = model.add_entity("A");
/// let b = model.add_entity("B");
/// let out = model.add_port(a, "out", PortDirection::Output, 1).unwrap();
/// let inp = model.add_port(b, "in", PortDirection::Input, 1).unwrap();
/// model.connect(out, inp).unwrap();
/// assert_eq!(model.link_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    entities: Vec<EntityRecord>,
    ports: Vec<PortRecord>,
    exterior: Vec<PortKey>,
}

impl Model {
    /// Creates an empty model for a composite named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            ports: Vec::new(),
            exterior: Vec::new(),
        }
    }

    /// Adds an entity; entities are admitted in the order they are added.
    pub fn add_entity(&mut self, name: impl Into<String>) -> EntityKey {
        let key = EntityKey(self.entities.len() as u32);
        self.entities.push(EntityRecord {
            name: name.into(),
            ports: Vec::new(),
        });
        key
    }

    /// Adds a port to `entity`.
    pub fn add_port(
        &mut self,
        entity: EntityKey,
        name: impl Into<String>,
        direction: PortDirection,
        width: usize,
    ) -> Result<PortKey, ModelError> {
        let key = PortKey(self.ports.len() as u32);
        let record = self
            .entities
            .get_mut(entity.0 as usize)
            .ok_or(ModelError::UnknownEntity(entity))?;
        record.ports.push(key);
        self.ports.push(PortRecord {
            name: name.into(),
            owner: PortOwner::Entity(entity),
            direction,
            width,
            links: Vec::new(),
        });
        Ok(key)
    }

    /// Adds a port on the enclosing composite.
    ///
    /// An exterior `Input` port delivers data to the entities linked to it;
    /// an exterior `Output` port collects data from them.
    pub fn add_exterior_port(&mut self, name: impl Into<String>, direction: PortDirection, width: usize) -> PortKey {
        let key = PortKey(self.ports.len() as u32);
        self.ports.push(PortRecord {
            name: name.into(),
            owner: PortOwner::Exterior,
            direction,
            width,
            links: Vec::new(),
        });
        self.exterior.push(key);
        key
    }

    /// Links channel 0 of `from` to channel 0 of `to`.
    pub fn connect(&mut self, from: PortKey, to: PortKey) -> Result<(), ModelError> {
        self.connect_channels(from, 0, to, 0)
    }

    /// Links one channel of `from` to one channel of `to`.
    ///
    /// The link is recorded on both ports.
    pub fn connect_channels(
        &mut self,
        from: PortKey,
        from_channel: usize,
        to: PortKey,
        to_channel: usize,
    ) -> Result<(), ModelError> {
        self.check_channel(from, from_channel)?;
        self.check_channel(to, to_channel)?;
        self.ports[from.0 as usize].links.push(ChannelLink {
            channel: from_channel,
            peer: to,
            peer_channel: to_channel,
        });
        if from != to || from_channel != to_channel {
            self.ports[to.0 as usize].links.push(ChannelLink {
                channel: to_channel,
                peer: from,
                peer_channel: from_channel,
            });
        }
        Ok(())
    }

    fn check_channel(&self, port: PortKey, channel: usize) -> Result<(), ModelError> {
        let record = self.ports.get(port.0 as usize).ok_or(ModelError::UnknownPort(port))?;
        let width = record.width.max(1);
        if channel >= width {
            return Err(ModelError::ChannelOutOfRange { port, channel, width });
        }
        Ok(())
    }

    /// Exterior ports in declaration order.
    pub fn exterior_ports(&self) -> &[PortKey] {
        &self.exterior
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of distinct channel links.
    pub fn link_count(&self) -> usize {
        let ends: usize = self.ports.iter().map(|p| p.links.len()).sum();
        let loops = self
            .ports
            .iter()
            .enumerate()
            .flat_map(|(idx, p)| {
                p.links
                    .iter()
                    .filter(move |l| l.peer.0 as usize == idx && l.peer_channel == l.channel)
            })
            .count();
        (ends - loops) / 2 + loops
    }

    /// Serializes the model to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    /// Deserializes a model from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    /// Saves the model to a file.
    ///
    /// Uses CBOR format.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let bytes = self.to_cbor()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Loads a model from a file.
    ///
    /// Uses CBOR format.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_cbor(&bytes)?)
    }

    fn port(&self, port: PortKey) -> Option<&PortRecord> {
        self.ports.get(port.0 as usize)
    }
}

impl ModelSource for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn entities(&self) -> Vec<EntityKey> {
        (0..self.entities.len() as u32).map(EntityKey).collect()
    }

    fn entity_name(&self, entity: EntityKey) -> &str {
        self.entities
            .get(entity.0 as usize)
            .map(|e| e.name.as_str())
            .unwrap_or("")
    }

    fn entity_ports(&self, entity: EntityKey) -> Vec<PortKey> {
        self.entities
            .get(entity.0 as usize)
            .map(|e| e.ports.clone())
            .unwrap_or_default()
    }

    fn port_name(&self, port: PortKey) -> &str {
        self.port(port).map(|p| p.name.as_str()).unwrap_or("")
    }

    fn port_owner(&self, port: PortKey) -> PortOwner {
        self.port(port).map(|p| p.owner).unwrap_or(PortOwner::Exterior)
    }

    fn port_direction(&self, port: PortKey) -> PortDirection {
        self.port(port).map(|p| p.direction).unwrap_or(PortDirection::None)
    }

    fn port_width(&self, port: PortKey) -> usize {
        self.port(port).map(|p| p.width).unwrap_or(0)
    }

    fn links(&self, port: PortKey) -> Vec<ChannelLink> {
        self.port(port).map(|p| p.links.clone()).unwrap_or_default()
    }
}
