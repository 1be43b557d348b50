//! Composite terms of the combinator expression.
//!
//! - [`Column`]: parallel composition. Rank is the product of the member
//!   ranks; ports are the member ports concatenated in member order.
//! - [`Series`]: sequential composition. Adjacent members must agree on the
//!   join arity; rank is `(forward_in(first), forward_out(last))`.
//! - [`Contraction`]: folds the last `degree` input/output channels of its
//!   kernel into a loop, closing the feedback edges cut out of the graph.
//! - [`Binding`]: binds a name to a term for code generation.
//!
//! Terms refer to nodes by handle, so every query takes the [`Network`].
//!
//! `inputs`/`outputs` list physical ports and are what joins are wired
//! through. `input_channels`/`output_channels` list the boundary as the rank
//! counts it: an incoming or outgoing node stands for one channel of its own.

use crate::arena::{NodeId, PortId};
use crate::config::BuildOptions;
use crate::labels::Labels;
use crate::network::Network;
use crate::node::NodeKind;
use crate::rank::Rank;

/// One channel on the boundary of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Port(PortId),
    /// The outside channel an incoming or outgoing node stands for.
    Boundary(NodeId),
}

fn node_input_channels(network: &Network, id: NodeId) -> Vec<Channel> {
    let node = network.node(id);
    if node.kind().is_incoming() {
        vec![Channel::Boundary(id)]
    } else {
        node.inputs().iter().copied().map(Channel::Port).collect()
    }
}

fn node_output_channels(network: &Network, id: NodeId) -> Vec<Channel> {
    let node = network.node(id);
    if node.kind().is_outgoing() {
        vec![Channel::Boundary(id)]
    } else {
        node.outputs().iter().copied().map(Channel::Port).collect()
    }
}

/// Any term of the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Node(NodeId),
    Column(Column),
    Series(Series),
    Contraction(Contraction),
}

impl Term {
    /// Rank of the term, or `None` if a composition inside it does not fit.
    pub fn rank(&self, network: &Network) -> Option<Rank> {
        match self {
            Term::Node(id) => Some(network.node(*id).rank()),
            Term::Column(column) => column.rank(network),
            Term::Series(series) => series.rank(network),
            Term::Contraction(contraction) => contraction.rank(network),
        }
    }

    pub fn inputs(&self, network: &Network) -> Vec<PortId> {
        match self {
            Term::Node(id) => network.node(*id).inputs().to_vec(),
            Term::Column(column) => column.inputs(network),
            Term::Series(series) => series.inputs(network),
            Term::Contraction(contraction) => contraction.kernel().inputs(network),
        }
    }

    pub fn outputs(&self, network: &Network) -> Vec<PortId> {
        match self {
            Term::Node(id) => network.node(*id).outputs().to_vec(),
            Term::Column(column) => column.outputs(network),
            Term::Series(series) => series.outputs(network),
            Term::Contraction(contraction) => contraction.kernel().outputs(network),
        }
    }

    /// Input channels; as many as `rank().forward_in` whenever the rank exists.
    pub fn input_channels(&self, network: &Network) -> Vec<Channel> {
        match self {
            Term::Node(id) => node_input_channels(network, *id),
            Term::Column(column) => column.input_channels(network),
            Term::Series(series) => series.input_channels(network),
            Term::Contraction(contraction) => contraction.input_channels(network),
        }
    }

    /// Output channels; as many as `rank().forward_out` whenever the rank exists.
    pub fn output_channels(&self, network: &Network) -> Vec<Channel> {
        match self {
            Term::Node(id) => node_output_channels(network, *id),
            Term::Column(column) => column.output_channels(network),
            Term::Series(series) => series.output_channels(network),
            Term::Contraction(contraction) => contraction.output_channels(network),
        }
    }

    /// Sort order inside a column; composites sort last.
    pub fn order(&self, network: &Network) -> u32 {
        match self {
            Term::Node(id) => network.node(*id).kind().order(),
            _ => NodeKind::Unknown.order(),
        }
    }

    /// Generated code, or `None` if the term prints nothing.
    pub fn code(&self, network: &Network, labels: &Labels, options: &BuildOptions) -> Option<String> {
        match self {
            Term::Node(id) => network.node(*id).identifier(labels.label(*id).unwrap_or_default()),
            Term::Column(column) => column.code(network, labels, options),
            Term::Series(series) => series.code(network, labels, options),
            Term::Contraction(contraction) => contraction.code(network, labels, options),
        }
    }

    #[inline]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Term::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// Parallel composition.
///
/// # Invariants
/// - Members are mutually unconnected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    members: Vec<Term>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            members: nodes.into_iter().map(Term::Node).collect(),
        }
    }

    pub fn push(&mut self, term: Term) {
        self.members.push(term);
    }

    pub fn members(&self) -> &[Term] {
        &self.members
    }

    /// Node members in member order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().filter_map(Term::as_node)
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes().any(|n| n == node)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stable sort by member order.
    pub fn sort(&mut self, network: &Network) {
        self.members.sort_by_key(|term| term.order(network));
    }

    /// Moves the node members that have a `key` to the tail, ascending by
    /// key. The other members keep their relative order.
    pub fn move_to_tail(&mut self, key: impl Fn(NodeId) -> Option<usize>) {
        self.members
            .sort_by_key(|term| match term.as_node().and_then(|node| key(node)) {
                Some(k) => (1, k),
                None => (0, 0),
            });
    }

    pub fn rank(&self, network: &Network) -> Option<Rank> {
        self.members
            .iter()
            .try_fold(Rank::zero(), |acc, term| Some(Rank::product(acc, term.rank(network)?)))
    }

    pub fn inputs(&self, network: &Network) -> Vec<PortId> {
        self.members.iter().flat_map(|t| t.inputs(network)).collect()
    }

    pub fn outputs(&self, network: &Network) -> Vec<PortId> {
        self.members.iter().flat_map(|t| t.outputs(network)).collect()
    }

    pub fn input_channels(&self, network: &Network) -> Vec<Channel> {
        self.members.iter().flat_map(|t| t.input_channels(network)).collect()
    }

    pub fn output_channels(&self, network: &Network) -> Vec<Channel> {
        self.members.iter().flat_map(|t| t.output_channels(network)).collect()
    }

    /// Position of `port` among the column inputs.
    pub fn input_index(&self, network: &Network, port: PortId) -> Option<usize> {
        self.inputs(network).iter().position(|p| *p == port)
    }

    /// Whether every connected input of `node` is fed from this column.
    pub fn does_follow(&self, network: &Network, node: NodeId) -> bool {
        network.node(node).inputs().iter().all(|&input| {
            match network.connected_node(input) {
                Some(source) => self.contains_node(source),
                None => true,
            }
        })
    }

    fn code(&self, network: &Network, labels: &Labels, options: &BuildOptions) -> Option<String> {
        let parts: Vec<String> = self
            .members
            .iter()
            .filter_map(|t| t.code(network, labels, options))
            .collect();
        match parts.len() {
            0 => None,
            1 => parts.into_iter().next(),
            _ => Some(format!("({})", parts.join(&options.parallel_infix))),
        }
    }
}

/// Sequential composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    members: Vec<Term>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            members: columns.into_iter().map(Term::Column).collect(),
        }
    }

    pub fn push(&mut self, term: Term) {
        self.members.push(term);
    }

    pub fn members(&self) -> &[Term] {
        &self.members
    }

    /// Column members in order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.members.iter().filter_map(|t| match t {
            Term::Column(column) => Some(column),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First adjacent pair whose join does not match: `(position, left, right)`.
    pub fn first_mismatch(&self, network: &Network) -> Option<(usize, Rank, Rank)> {
        let ranks: Vec<Rank> = self
            .members
            .iter()
            .map(|t| t.rank(network).unwrap_or_default())
            .collect();
        ranks
            .windows(2)
            .position(|pair| Rank::compose(pair[0], pair[1]).is_none())
            .map(|position| (position, ranks[position], ranks[position + 1]))
    }

    pub fn rank(&self, network: &Network) -> Option<Rank> {
        let mut members = self.members.iter();
        let Some(first) = members.next() else {
            return Some(Rank::zero());
        };
        members.try_fold(first.rank(network)?, |acc, term| Rank::compose(acc, term.rank(network)?))
    }

    pub fn inputs(&self, network: &Network) -> Vec<PortId> {
        self.members.first().map(|t| t.inputs(network)).unwrap_or_default()
    }

    pub fn outputs(&self, network: &Network) -> Vec<PortId> {
        self.members.last().map(|t| t.outputs(network)).unwrap_or_default()
    }

    pub fn input_channels(&self, network: &Network) -> Vec<Channel> {
        self.members.first().map(|t| t.input_channels(network)).unwrap_or_default()
    }

    pub fn output_channels(&self, network: &Network) -> Vec<Channel> {
        self.members.last().map(|t| t.output_channels(network)).unwrap_or_default()
    }

    fn code(&self, network: &Network, labels: &Labels, options: &BuildOptions) -> Option<String> {
        let parts: Vec<String> = self
            .members
            .iter()
            .filter_map(|t| t.code(network, labels, options))
            .collect();
        (!parts.is_empty()).then(|| parts.join(&options.series_infix))
    }
}

/// Feedback-closing wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contraction {
    kernel: Box<Term>,
    degree: usize,
}

impl Contraction {
    pub fn new(kernel: Term, degree: usize) -> Self {
        Self {
            kernel: Box::new(kernel),
            degree,
        }
    }

    pub fn kernel(&self) -> &Term {
        &self.kernel
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn rank(&self, network: &Network) -> Option<Rank> {
        Rank::contract(self.kernel.rank(network)?, self.degree)
    }

    /// Kernel input channels without the last `degree`.
    pub fn input_channels(&self, network: &Network) -> Vec<Channel> {
        let mut channels = self.kernel.input_channels(network);
        channels.truncate(channels.len().saturating_sub(self.degree));
        channels
    }

    /// Kernel output channels without the last `degree`.
    pub fn output_channels(&self, network: &Network) -> Vec<Channel> {
        let mut channels = self.kernel.output_channels(network);
        channels.truncate(channels.len().saturating_sub(self.degree));
        channels
    }

    /// The folded `(output, input)` channel pairs: kernel output `k` loops
    /// back into kernel input `k` for each of the last `degree` positions.
    pub fn folded(&self, network: &Network) -> Vec<(Channel, Channel)> {
        let outputs = self.kernel.output_channels(network);
        let inputs = self.kernel.input_channels(network);
        let tail = |len: usize| len.saturating_sub(self.degree);
        outputs[tail(outputs.len())..]
            .iter()
            .copied()
            .zip(inputs[tail(inputs.len())..].iter().copied())
            .collect()
    }

    fn code(&self, network: &Network, labels: &Labels, options: &BuildOptions) -> Option<String> {
        let kernel = self.kernel.code(network, labels, options).unwrap_or_default();
        Some(format!("{}{}({})", options.contraction_prefix, self.degree, kernel))
    }
}

/// A name bound to a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub term: Term,
}

impl Binding {
    pub fn new(name: impl Into<String>, term: Term) -> Self {
        Self {
            name: name.into(),
            term,
        }
    }

    /// `"{name} = {code}"`.
    pub fn definition(&self, network: &Network, labels: &Labels, options: &BuildOptions) -> String {
        let code = self.term.code(network, labels, options).unwrap_or_default();
        format!("{} = {}", self.name, code)
    }
}
