//! Build trace: the local rewrites applied while building a syntactic graph.
//!
//! Every pass records the synthetic nodes it introduces as `RewriteStep`s,
//! in application order. Rewirings that could not be applied are recorded as
//! `Skipped` with the pass and reason. `BuildReport` summarizes a trace.

use crate::arena::{NodeId, PortId};
use crate::error::RewireError;
use std::fmt;

/// The pass that produced a rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Bijection,
    Feedback,
    Permutation,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pass::Bijection => "bijection",
            Pass::Feedback => "feedback removal",
            Pass::Permutation => "permutation insertion",
        };
        f.write_str(name)
    }
}

/// A single local rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteStep {
    /// A cap was attached to a port with nothing on the other side.
    Cap { cap: NodeId, port: PortId },
    /// A split or merge replaced the fan at `port`.
    Mediator { mediator: NodeId, port: PortId, valence: usize },
    /// The back edge `source -> destination` was cut into a send/receive pair.
    FeedbackCut {
        send: NodeId,
        receive: NodeId,
        source: PortId,
        destination: PortId,
    },
    /// An identity was spliced into the edge ending at `port`. `push_out`
    /// marks identities that delay a terminal node.
    Identity { identity: NodeId, port: PortId, push_out: bool },
    /// A permutation column was inserted before series position `position`.
    Permutation { node: NodeId, position: usize, permutation: Vec<usize> },
    /// A rewiring that could not be applied.
    Skipped { pass: Pass, reason: RewireError },
}

/// Ordered record of the rewrites of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildTrace {
    steps: Vec<RewriteStep>,
}

impl BuildTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: RewriteStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> impl Iterator<Item = &RewriteStep> {
        self.steps.iter()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn count(&self, pred: impl Fn(&RewriteStep) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(s)).count()
    }

    pub fn summarize(&self, columns: usize, nodes: usize) -> BuildReport {
        BuildReport {
            nodes,
            columns,
            caps: self.count(|s| matches!(s, RewriteStep::Cap { .. })),
            mediators: self.count(|s| matches!(s, RewriteStep::Mediator { .. })),
            feedback_loops: self.count(|s| matches!(s, RewriteStep::FeedbackCut { .. })),
            identities: self.count(|s| matches!(s, RewriteStep::Identity { .. })),
            permutations: self.count(|s| matches!(s, RewriteStep::Permutation { .. })),
            skipped: self.count(|s| matches!(s, RewriteStep::Skipped { .. })),
        }
    }
}

/// Summary of a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildReport {
    /// Admitted nodes, synthetic ones included.
    pub nodes: usize,
    /// Columns in the final series, permutation columns included.
    pub columns: usize,
    pub caps: usize,
    pub mediators: usize,
    pub feedback_loops: usize,
    pub identities: usize,
    pub permutations: usize,
    /// Rewirings that were skipped.
    pub skipped: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "built, with {} feedback loops / {} permutations inserted",
            self.feedback_loops, self.permutations
        )
    }
}
