//! Syntactic nodes: the atomic terms of the combinator expression.
//!
//! A node is either *representative* (it wraps one model entity and exposes
//! the entity's ports as ordered input and output lists) or *purely
//! syntactic* (identity, cap, permutation, split/merge mediator, feedback
//! send/receive, exterior input/output).
//!
//! # Kind table
//!
//! | Kind | order | prefix | category |
//! |---|---|---|---|
//! | `Permutation` | 0 | `P` | pure |
//! | `Representative` | 1 | `E` | |
//! | `Split`, `Merge` | 3 | `M` | pure, mediator |
//! | `Cap` | 4 | `C` | pure |
//! | `Send` | 5 | `Sn` | pure, feedback, outgoing |
//! | `Receive` | 5 | `Re` | pure, feedback, incoming |
//! | `Input` | 6 | `I` | exterior, incoming |
//! | `Output` | 6 | `O` | exterior, outgoing |
//! | `Identity` | 7 | `_` | pure |
//! | `Unknown` | 100 | `M` | |
//!
//! Columns sort their members by ascending order; ties keep insertion order.
//! The first and last columns of a structured series then move their
//! receive and send nodes behind the exterior ones, in feedback pair order,
//! since the contraction folds the last channels.

use crate::arena::PortId;
use crate::model::{EntityKey, PortKey};
use crate::port::{Direction, ModelChannel};
use crate::rank::Rank;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Variant of a syntactic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Permutation,
    Representative,
    Split,
    Merge,
    Cap,
    Send,
    Receive,
    Input,
    Output,
    Identity,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
struct KindInfo {
    order: u32,
    prefix: &'static str,
    pure: bool,
    exterior: bool,
    feedback: bool,
    mediator: bool,
    incoming: bool,
    outgoing: bool,
}

impl KindInfo {
    const fn pure(order: u32, prefix: &'static str) -> Self {
        Self {
            order,
            prefix,
            pure: true,
            exterior: false,
            feedback: false,
            mediator: false,
            incoming: false,
            outgoing: false,
        }
    }

    const fn opaque(order: u32, prefix: &'static str) -> Self {
        Self {
            pure: false,
            ..Self::pure(order, prefix)
        }
    }
}

impl NodeKind {
    const fn info(self) -> KindInfo {
        match self {
            NodeKind::Permutation => KindInfo::pure(0, "P"),
            NodeKind::Representative => KindInfo::opaque(1, "E"),
            NodeKind::Split | NodeKind::Merge => KindInfo {
                mediator: true,
                ..KindInfo::pure(3, "M")
            },
            NodeKind::Cap => KindInfo::pure(4, "C"),
            NodeKind::Send => KindInfo {
                feedback: true,
                outgoing: true,
                ..KindInfo::pure(5, "Sn")
            },
            NodeKind::Receive => KindInfo {
                feedback: true,
                incoming: true,
                ..KindInfo::pure(5, "Re")
            },
            NodeKind::Input => KindInfo {
                exterior: true,
                incoming: true,
                ..KindInfo::opaque(6, "I")
            },
            NodeKind::Output => KindInfo {
                exterior: true,
                outgoing: true,
                ..KindInfo::opaque(6, "O")
            },
            NodeKind::Identity => KindInfo::pure(7, "_"),
            NodeKind::Unknown => KindInfo::opaque(100, "M"),
        }
    }

    /// Column sort order; lower is emitted earlier.
    #[inline]
    pub const fn order(self) -> u32 {
        self.info().order
    }

    /// Label prefix.
    #[inline]
    pub const fn label_prefix(self) -> &'static str {
        self.info().prefix
    }

    /// Purely syntactic: introduced by the rewriting, stands for no model element.
    #[inline]
    pub const fn is_pure(self) -> bool {
        self.info().pure
    }

    #[inline]
    pub const fn is_exterior(self) -> bool {
        self.info().exterior
    }

    #[inline]
    pub const fn is_feedback(self) -> bool {
        self.info().feedback
    }

    #[inline]
    pub const fn is_mediator(self) -> bool {
        self.info().mediator
    }

    /// Stands for a channel entering the expression.
    #[inline]
    pub const fn is_incoming(self) -> bool {
        self.info().incoming
    }

    /// Stands for a channel leaving the expression.
    #[inline]
    pub const fn is_outgoing(self) -> bool {
        self.info().outgoing
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Layout position for external visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// The model entity a representative node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Represented {
    pub entity: EntityKey,
    pub name: String,
}

/// A node in the syntactic graph.
///
/// # Invariants
/// - `inputs` and `outputs` are in port order; a port's `position` is its
///   index in the matching list.
/// - `is_initial`, `is_terminal` and `is_isolated` are derived from the port
///   lists, so they always reflect the current shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    pub(crate) inputs: Vec<PortId>,
    pub(crate) outputs: Vec<PortId>,
    represented: Option<Represented>,
    exterior: Option<ModelChannel>,
    permutation: Option<Vec<usize>>,
    location: Option<Location>,
    /// Model port -> (first position, width) among the inputs.
    input_spans: BTreeMap<PortKey, (usize, usize)>,
    output_spans: BTreeMap<PortKey, (usize, usize)>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            represented: None,
            exterior: None,
            permutation: None,
            location: None,
            input_spans: BTreeMap::new(),
            output_spans: BTreeMap::new(),
        }
    }

    pub(crate) fn representative(entity: EntityKey, name: impl Into<String>) -> Self {
        Self {
            represented: Some(Represented {
                entity,
                name: name.into(),
            }),
            ..Self::new(NodeKind::Representative)
        }
    }

    pub(crate) fn exterior(kind: NodeKind, channel: ModelChannel) -> Self {
        Self {
            exterior: Some(channel),
            ..Self::new(kind)
        }
    }

    pub(crate) fn with_permutation(permutation: Vec<usize>) -> Self {
        Self {
            permutation: Some(permutation),
            ..Self::new(NodeKind::Permutation)
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn inputs(&self) -> &[PortId] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[PortId] {
        &self.outputs
    }

    #[inline]
    pub fn represented(&self) -> Option<&Represented> {
        self.represented.as_ref()
    }

    /// Exterior model channel for `Input`/`Output` nodes.
    #[inline]
    pub fn exterior_channel(&self) -> Option<ModelChannel> {
        self.exterior
    }

    /// Permutation array (0-based targets) for permutation nodes.
    #[inline]
    pub fn permutation(&self) -> Option<&[usize]> {
        self.permutation.as_deref()
    }

    #[inline]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    #[inline]
    pub fn is_initial(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.outputs.is_empty()
    }

    #[inline]
    pub fn is_isolated(&self) -> bool {
        self.is_initial() && self.is_terminal()
    }

    #[inline]
    pub fn is_representative(&self) -> bool {
        self.kind == NodeKind::Representative
    }

    /// Inputs as seen by the expression: an incoming node stands for one
    /// channel entering from outside.
    pub fn reported_inputs(&self) -> usize {
        if self.kind.is_incoming() {
            1
        } else {
            self.inputs.len()
        }
    }

    /// Outputs as seen by the expression: an outgoing node stands for one
    /// channel leaving to the outside.
    pub fn reported_outputs(&self) -> usize {
        if self.kind.is_outgoing() {
            1
        } else {
            self.outputs.len()
        }
    }

    pub fn rank(&self) -> Rank {
        Rank::forward(self.reported_inputs(), self.reported_outputs())
    }

    /// Boundary as `"inputs --> outputs"`.
    pub fn boundary_code(&self) -> String {
        format!("{} --> {}", self.reported_inputs(), self.reported_outputs())
    }

    /// Code for this node, or `None` if it does not print.
    ///
    /// Representative nodes print their label.
    pub fn identifier(&self, label: &str) -> Option<String> {
        match self.kind {
            NodeKind::Representative => Some(label.to_owned()),
            NodeKind::Permutation => {
                let targets: Vec<String> = self
                    .permutation
                    .iter()
                    .flatten()
                    .map(|target| (target + 1).to_string())
                    .collect();
                Some(format!("[{}]", targets.join(" ")))
            }
            NodeKind::Split => Some(format!("[< {}]", self.outputs.len())),
            NodeKind::Merge => Some(format!("[{} >]", self.inputs.len())),
            NodeKind::Input | NodeKind::Receive => Some("in".to_owned()),
            NodeKind::Output | NodeKind::Send => Some("out".to_owned()),
            NodeKind::Identity | NodeKind::Cap | NodeKind::Unknown => None,
        }
    }

    /// Input position of `channel` of a represented model port.
    pub fn input_position(&self, channel: ModelChannel) -> Option<usize> {
        Self::position_in(&self.input_spans, channel)
    }

    /// Output position of `channel` of a represented model port.
    pub fn output_position(&self, channel: ModelChannel) -> Option<usize> {
        Self::position_in(&self.output_spans, channel)
    }

    fn position_in(spans: &BTreeMap<PortKey, (usize, usize)>, channel: ModelChannel) -> Option<usize> {
        let &(base, width) = spans.get(&channel.port)?;
        (channel.channel < width).then_some(base + channel.channel)
    }

    pub(crate) fn record_span(&mut self, port: PortKey, direction: Direction, base: usize, width: usize) {
        match direction {
            Direction::Input => self.input_spans.insert(port, (base, width)),
            Direction::Output => self.output_spans.insert(port, (base, width)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_table() {
        let ordered = [
            NodeKind::Permutation,
            NodeKind::Representative,
            NodeKind::Split,
            NodeKind::Cap,
            NodeKind::Send,
            NodeKind::Input,
            NodeKind::Identity,
            NodeKind::Unknown,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].order() < pair[1].order(), "{} before {}", pair[0], pair[1]);
        }
        assert_eq!(NodeKind::Split.order(), NodeKind::Merge.order());
        assert_eq!(NodeKind::Send.order(), NodeKind::Receive.order());
        assert_eq!(NodeKind::Input.order(), NodeKind::Output.order());
    }

    #[test]
    fn category_predicates() {
        assert!(NodeKind::Input.is_exterior() && NodeKind::Input.is_incoming());
        assert!(NodeKind::Output.is_exterior() && NodeKind::Output.is_outgoing());
        assert!(NodeKind::Receive.is_feedback() && NodeKind::Receive.is_incoming());
        assert!(NodeKind::Send.is_feedback() && NodeKind::Send.is_outgoing());
        assert!(NodeKind::Split.is_mediator() && NodeKind::Merge.is_mediator());
        assert!(!NodeKind::Representative.is_pure());
        assert!(!NodeKind::Input.is_pure());
        assert!(NodeKind::Identity.is_pure() && NodeKind::Cap.is_pure());
        assert!(!NodeKind::Identity.is_mediator());
    }

    #[test]
    fn incoming_nodes_report_one_input() {
        let mut node = Node::new(NodeKind::Receive);
        node.outputs.push(PortId::new(0));
        assert!(node.is_initial());
        assert_eq!(node.rank(), Rank::forward(1, 1));
        assert_eq!(node.boundary_code(), "1 --> 1");
    }

    #[test]
    fn identifiers() {
        let perm = Node::with_permutation(vec![1, 0, 2]);
        assert_eq!(perm.identifier("P3").as_deref(), Some("[2 1 3]"));

        let mut split = Node::new(NodeKind::Split);
        split.inputs.push(PortId::new(0));
        split.outputs.extend([PortId::new(1), PortId::new(2)]);
        assert_eq!(split.identifier("M1").as_deref(), Some("[< 2]"));

        let rep = Node::representative(EntityKey(0), "Ramp");
        assert_eq!(rep.identifier("E4").as_deref(), Some("E4"));
        assert_eq!(Node::new(NodeKind::Identity).identifier("_2"), None);
        assert_eq!(Node::new(NodeKind::Cap).identifier("C0"), None);
    }
}
