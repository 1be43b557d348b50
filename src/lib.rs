//! Syntactic: rewrites dataflow models into combinator expressions.
//!
//! A dataflow model is a set of entities with typed, possibly multi-channel
//! ports and the links between them. This crate builds its *syntactic
//! graph*: a normalized graph of atomic nodes that reads directly as an
//! expression of parallel columns (`|`), sequential series (`=>`) and a
//! feedback contraction (`#n(...)`).
//!
//! The build is a pipeline of local rewrites:
//! - every entity becomes a representative node, with caps on empty channels
//!   and exterior nodes for the composite's own ports;
//! - fans are replaced by split and merge mediators, so every port has
//!   exactly one link;
//! - back edges are cut into send/receive pairs;
//! - nodes are layered into columns, with identities carrying long wires;
//! - permutation columns straighten every join.
//!
//! # Structure
//!
//! - [`arena`]: dense handles and append-only storage.
//! - [`network`], [`node`], [`port`]: the wired node/port graph.
//! - [`term`], [`rank`]: composite terms and their arity algebra.
//! - [`graph`]: the orchestrator and its passes.
//! - [`doctrine`]: structural validators.
//! - [`model`]: the input surface and an in-memory model.
//! - [`trace`], [`fingerprint`], [`labels`], [`config`], [`error`].
//!
//! # Example
//!
//! ```
//! use syntactic::prelude::*;
//!
//! let mut model = Model::new("split");
//! let a = model.add_entity("A");
//! let b = model.add_entity("B");
//! let c = model.add_entity("C");
//! let out = model.add_port(a, "out", PortDirection::Output, 1).unwrap();
//! let b_in = model.add_port(b, "in", PortDirection::Input, 1).unwrap();
//! let c_in = model.add_port(c, "in", PortDirection::Input, 1).unwrap();
//! model.connect(out, b_in).unwrap();
//! model.connect(out, c_in).unwrap();
//!
//! let (graph, report) = SyntacticGraph::build(&model, BuildOptions::validating()).unwrap();
//! assert_eq!(report.mediators, 1);
//! assert_eq!(
//!     graph.generate_code().unwrap(),
//!     "E0 = \tA\nE1 = \tB\nE2 = \tC\n\nExpr_1 = E0 => [< 2] => (E1 | E2)\n"
//! );
//! ```

pub mod arena;
pub mod config;
pub mod doctrine;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod labels;
pub mod model;
pub mod network;
pub mod node;
pub mod port;
pub mod rank;
pub mod term;
pub mod trace;

#[cfg(test)]
mod proptests;

pub use arena::{NodeId, PortId};
pub use config::BuildOptions;
pub use doctrine::{Acyclic, Bijective, Doctrine, DoctrineError, Layered};
pub use error::{BuildError, Result, RewireError};
pub use graph::{FeedbackPair, Phase, SyntacticGraph};
pub use model::{Model, ModelSource};
pub use trace::{BuildReport, BuildTrace, RewriteStep};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::arena::{NodeId, PortId};
    pub use crate::config::BuildOptions;
    pub use crate::doctrine::{Acyclic, Bijective, Doctrine, DoctrineError, Layered};
    pub use crate::error::{BuildError, ModelError, RewireError};
    pub use crate::fingerprint::{graph_fingerprint, HashValue};
    pub use crate::graph::{FeedbackPair, Phase, SyntacticGraph};
    pub use crate::model::{ChannelLink, EntityKey, Model, ModelSource, PortDirection, PortKey, PortOwner};
    pub use crate::node::{Location, NodeKind};
    pub use crate::rank::Rank;
    pub use crate::term::{Channel, Column, Contraction, Series, Term};
    pub use crate::trace::{BuildReport, BuildTrace, Pass, RewriteStep};
}
