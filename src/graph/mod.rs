//! The syntactic graph orchestrator.
//!
//! `SyntacticGraph` owns the node/port network and drives the rewriting
//! pipeline, one pass per submodule:
//!
//! 1. [`admit`]: entities become representative nodes and the model wiring
//!    is reconstructed, with caps on empty channels and exterior nodes for
//!    the composite's own ports.
//! 2. [`bijection`]: fans are replaced by split/merge mediators.
//! 3. [`feedback`]: back edges are cut into send/receive pairs.
//! 4. [`structure`]: nodes are layered into columns.
//! 5. [`permute`]: permutation columns straighten the wiring between columns.
//! 6. [`layout`]: advisory coordinates.
//!
//! [`codegen`] renders the result.
//!
//! # Determinism
//! Every pass iterates nodes in admission order and ports in port order, so
//! the same model always yields the same labels, columns and code.

pub mod admit;
pub mod bijection;
pub mod codegen;
pub mod feedback;
pub mod layout;
pub mod permute;
pub mod structure;

use crate::arena::NodeId;
use crate::config::BuildOptions;
use crate::doctrine::Doctrine;
use crate::error::{BuildError, Result, RewireError};
use crate::labels::Labels;
use crate::model::{EntityKey, ModelSource};
use crate::network::Network;
use crate::port::ModelChannel;
use crate::term::{Series, Term};
use crate::trace::{BuildReport, BuildTrace, Pass, RewriteStep};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Pipeline state. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Empty,
    NodesAdmitted,
    Bijective,
    FeedbackRemoved,
    Structured,
    PermutationsInserted,
    LaidOut,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Empty => "empty",
            Phase::NodesAdmitted => "populated",
            Phase::Bijective => "bijective",
            Phase::FeedbackRemoved => "free of feedback",
            Phase::Structured => "structured",
            Phase::PermutationsInserted => "permuted",
            Phase::LaidOut => "laid out",
        };
        f.write_str(name)
    }
}

/// A send/receive pair standing for one cut feedback edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackPair {
    pub send: NodeId,
    pub receive: NodeId,
}

/// Syntactic representation of one dataflow model.
///
/// Exclusively owned for the duration of a build: every pass takes
/// `&mut self`, and sharing one graph between concurrent builds is not
/// supported.
#[derive(Debug, Clone)]
pub struct SyntacticGraph {
    name: String,
    options: BuildOptions,
    phase: Phase,
    network: Network,
    /// Nodes in admission order; labels follow this order.
    admitted: Vec<NodeId>,
    representing: BTreeMap<EntityKey, NodeId>,
    exterior_inputs: BTreeMap<ModelChannel, NodeId>,
    exterior_outputs: BTreeMap<ModelChannel, NodeId>,
    feedback: Vec<FeedbackPair>,
    series: Series,
    expression: Option<Term>,
    labels: Labels,
    trace: BuildTrace,
}

impl SyntacticGraph {
    /// Creates an empty graph with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, BuildOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: BuildOptions) -> Self {
        Self {
            name: name.into(),
            options,
            phase: Phase::Empty,
            network: Network::new(),
            admitted: Vec::new(),
            representing: BTreeMap::new(),
            exterior_inputs: BTreeMap::new(),
            exterior_outputs: BTreeMap::new(),
            feedback: Vec::new(),
            series: Series::new(),
            expression: None,
            labels: Labels::new(),
            trace: BuildTrace::new(),
        }
    }

    /// Builds the syntactic graph of `model`: admits every entity and runs
    /// every pass.
    ///
    /// ```
    /// use syntactic::prelude::*;
    ///
    /// let mut model = Model::new("chain");
    /// let a = model.add_entity("A");
    /// let b = model.add_entity("B");
    /// let out = model.add_port(a, "out", PortDirection::Output, 1).unwrap();
    /// let inp = model.add_port(b, "in", PortDirection::Input, 1).unwrap();
    /// model.connect(out, inp).unwrap();
    ///
    /// let (graph, report) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
    /// assert_eq!(report.feedback_loops, 0);
    /// assert!(graph.generate_code().unwrap().ends_with("Expr_1 = E0 => E1\n"));
    /// ```
    pub fn build<M: ModelSource + ?Sized>(model: &M, options: BuildOptions) -> Result<(Self, BuildReport)> {
        let mut graph = Self::with_options(model.name(), options);
        for entity in model.entities() {
            graph.admit_entity(model, entity)?;
        }
        graph.make_bijective()?;
        graph.remove_feedback()?;
        graph.structure()?;
        graph.insert_permutations()?;
        graph.layout_graph()?;

        let report = graph.report();
        info!(graph = %graph.name, %report, "syntactic graph built");
        Ok((graph, report))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Nodes in admission order.
    #[inline]
    pub fn nodes(&self) -> &[NodeId] {
        &self.admitted
    }

    /// The node representing `entity`, once admitted.
    pub fn node_for_entity(&self, entity: EntityKey) -> Option<NodeId> {
        self.representing.get(&entity).copied()
    }

    /// Exterior input nodes, ordered by model port and channel.
    pub fn exterior_inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.exterior_inputs.values().copied()
    }

    /// Exterior output nodes, ordered by model port and channel.
    pub fn exterior_outputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.exterior_outputs.values().copied()
    }

    /// Feedback pairs in the order the back edges were cut.
    #[inline]
    pub fn feedback_pairs(&self) -> &[FeedbackPair] {
        &self.feedback
    }

    /// The structured series (empty before structuring).
    #[inline]
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// The final expression: the series, inside a contraction when feedback
    /// was cut. Available once permutations are inserted.
    #[inline]
    pub fn expression(&self) -> Option<&Term> {
        self.expression.as_ref()
    }

    #[inline]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label_of(&self, node: NodeId) -> Option<&str> {
        self.labels.label(node)
    }

    pub fn node_from_label(&self, label: &str) -> Option<NodeId> {
        self.labels.node(label)
    }

    #[inline]
    pub fn trace(&self) -> &BuildTrace {
        &self.trace
    }

    pub fn is_bijective(&self) -> bool {
        self.phase >= Phase::Bijective
    }

    pub fn is_feedback_removed(&self) -> bool {
        self.phase >= Phase::FeedbackRemoved
    }

    /// Summary of the rewrites applied so far.
    pub fn report(&self) -> BuildReport {
        self.trace.summarize(self.series.len(), self.admitted.len())
    }

    /// Initial nodes in admission order.
    pub fn root_set(&self) -> Vec<NodeId> {
        self.admitted
            .iter()
            .copied()
            .filter(|&n| self.network.node(n).is_initial())
            .collect()
    }

    /// Appends `node` to the admission order and labels it.
    fn admit(&mut self, node: NodeId) {
        let kind = self.network.node(node).kind();
        self.admitted.push(node);
        self.labels.assign(node, kind);
    }

    fn require(&self, pass: &'static str, expected: Phase) -> Result<()> {
        if self.phase != expected {
            return Err(BuildError::Phase {
                pass,
                expected,
                found: self.phase,
            });
        }
        Ok(())
    }

    /// Logs and records a rewiring that could not be applied.
    fn skip(&mut self, pass: Pass, reason: RewireError) {
        warn!(%pass, %reason, "skipping rewiring");
        self.trace.record(RewriteStep::Skipped { pass, reason });
    }

    /// Runs `doctrine` when validation is enabled.
    fn validate_with(&self, doctrine: &impl Doctrine) -> Result<()> {
        if self.options.validate {
            doctrine.validate(self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small models shared by the pass tests.

    use crate::model::{EntityKey, Model, PortDirection, PortKey};

    pub struct Actor {
        pub entity: EntityKey,
        pub inputs: Vec<PortKey>,
        pub outputs: Vec<PortKey>,
    }

    /// Adds an entity with `inputs` input and `outputs` output ports of width 1.
    pub fn actor(model: &mut Model, name: &str, inputs: usize, outputs: usize) -> Actor {
        let entity = model.add_entity(name);
        let inputs = (0..inputs)
            .map(|i| model.add_port(entity, format!("in{i}"), PortDirection::Input, 1).unwrap())
            .collect();
        let outputs = (0..outputs)
            .map(|i| model.add_port(entity, format!("out{i}"), PortDirection::Output, 1).unwrap())
            .collect();
        Actor { entity, inputs, outputs }
    }

    /// `A -> B -> C`.
    pub fn chain() -> Model {
        let mut model = Model::new("chain");
        let a = actor(&mut model, "A", 0, 1);
        let b = actor(&mut model, "B", 1, 1);
        let c = actor(&mut model, "C", 1, 0);
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        model.connect(b.outputs[0], c.inputs[0]).unwrap();
        model
    }

    /// `A` feeding both `B` and `C` from one output.
    pub fn fan_out() -> Model {
        let mut model = Model::new("fan_out");
        let a = actor(&mut model, "A", 0, 1);
        let b = actor(&mut model, "B", 1, 0);
        let c = actor(&mut model, "C", 1, 0);
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        model.connect(a.outputs[0], c.inputs[0]).unwrap();
        model
    }

    /// `A -> B -> A`.
    pub fn two_cycle() -> Model {
        let mut model = Model::new("two_cycle");
        let a = actor(&mut model, "A", 1, 1);
        let b = actor(&mut model, "B", 1, 1);
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        model.connect(b.outputs[0], a.inputs[0]).unwrap();
        model
    }

    /// `A` feeding `B` and, through the same output, itself; beside it the
    /// loop `P -> Q -> P`.
    pub fn split_loop_and_cycle() -> Model {
        let mut model = Model::new("split_loop_and_cycle");
        let a = actor(&mut model, "A", 1, 1);
        let b = actor(&mut model, "B", 1, 0);
        let p = actor(&mut model, "P", 1, 1);
        let q = actor(&mut model, "Q", 1, 1);
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        model.connect(a.outputs[0], a.inputs[0]).unwrap();
        model.connect(p.outputs[0], q.inputs[0]).unwrap();
        model.connect(q.outputs[0], p.inputs[0]).unwrap();
        model
    }

    /// Exterior `x -> A -> B -> y`, with `B` also feeding `A` back.
    pub fn loop_with_exterior() -> Model {
        let mut model = Model::new("loop_with_exterior");
        let x = model.add_exterior_port("x", PortDirection::Input, 1);
        let y = model.add_exterior_port("y", PortDirection::Output, 1);
        let a = actor(&mut model, "A", 2, 1);
        let b = actor(&mut model, "B", 1, 2);
        model.connect(x, a.inputs[0]).unwrap();
        model.connect(a.outputs[0], b.inputs[0]).unwrap();
        model.connect(b.outputs[0], a.inputs[1]).unwrap();
        model.connect(b.outputs[1], y).unwrap();
        model
    }

    /// `A -> C` and `B -> D`, with `C` reaching the second input of `M` and
    /// `D` the first.
    pub fn crossed() -> Model {
        let mut model = Model::new("crossed");
        let a = actor(&mut model, "A", 0, 1);
        let b = actor(&mut model, "B", 0, 1);
        let c = actor(&mut model, "C", 1, 1);
        let d = actor(&mut model, "D", 1, 1);
        let m = actor(&mut model, "M", 2, 0);
        model.connect(a.outputs[0], c.inputs[0]).unwrap();
        model.connect(b.outputs[0], d.inputs[0]).unwrap();
        model.connect(c.outputs[0], m.inputs[1]).unwrap();
        model.connect(d.outputs[0], m.inputs[0]).unwrap();
        model
    }
}
