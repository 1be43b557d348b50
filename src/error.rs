//! Error types.
//!
//! `BuildError` aborts the pipeline. `RewireError` describes a single local
//! rewiring that could not be applied; passes log it, record it in the build
//! trace and carry on. `ModelError` covers misuse of the model builder.

use crate::arena::PortId;
use crate::doctrine::DoctrineError;
use crate::graph::Phase;
use crate::model::{EntityKey, PortKey};
use crate::rank::Rank;
use thiserror::Error;

/// Fatal pipeline error: the model has no valid syntactic graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("cannot admit nodes once the graph is {phase}")]
    AdmissionClosed { phase: Phase },

    #[error("{pass} requires a graph that is {expected}, found {found}")]
    Phase {
        pass: &'static str,
        expected: Phase,
        found: Phase,
    },

    #[error("entity `{name}` ({entity}) was already admitted")]
    DuplicateEntity { entity: EntityKey, name: String },

    #[error("series position {position}: {left} cannot feed {right}")]
    RankMismatch { position: usize, left: Rank, right: Rank },

    #[error("contraction of degree {degree} exceeds kernel rank {rank}")]
    ContractionOverflow { degree: usize, rank: Rank },

    #[error(transparent)]
    Doctrine(#[from] DoctrineError),
}

/// A local rewiring step that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewireError {
    #[error("mediator valence {0} is below 2")]
    Valence(usize),

    #[error("expected {expected} ports, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("{0} is not connected")]
    NotConnected(PortId),

    #[error("{0} does not feed the following column")]
    Unmatched(PortId),

    #[error("{0:?} is not a permutation")]
    NotPermutation(Vec<usize>),
}

/// Invalid use of the in-memory model builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityKey),

    #[error("unknown port {0}")]
    UnknownPort(PortKey),

    #[error("channel {channel} is out of range for {port} of width {width}")]
    ChannelOutOfRange { port: PortKey, channel: usize, width: usize },
}

pub type Result<T> = std::result::Result<T, BuildError>;
