//! Deterministic fingerprints of built graphs.
//!
//! A fingerprint hashes the canonical structure of the final series (node
//! kinds, labels, permutations, column boundaries) together with the
//! generated code. Two builds of the same model with the same options yield
//! the same fingerprint; any change to the structure or the rendering
//! changes it.
//!
//! Hashing is SHA-256 with a domain tag and a length prefix, so a byte string
//! hashed under one domain never collides with the same bytes under another.

use crate::error::Result;
use crate::graph::SyntacticGraph;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// SHA-256 of `b"SYN:" || domain || b":v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"SYN:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Full lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

fn push_str(data: &mut Vec<u8>, s: &str) {
    data.extend_from_slice(&(s.len() as u64).to_le_bytes());
    data.extend_from_slice(s.as_bytes());
}

/// Canonical bytes of the series: per column its width, then per node its
/// kind order, label and permutation.
fn structure_bytes(graph: &SyntacticGraph) -> Vec<u8> {
    let network = graph.network();
    let mut data = Vec::new();
    data.extend_from_slice(&(graph.series().len() as u64).to_le_bytes());
    for column in graph.series().columns() {
        data.extend_from_slice(&(column.len() as u64).to_le_bytes());
        for node in column.nodes() {
            let shape = network.node(node);
            data.extend_from_slice(&shape.kind().order().to_le_bytes());
            push_str(&mut data, graph.label_of(node).unwrap_or_default());
            let permutation = shape.permutation().unwrap_or_default();
            data.extend_from_slice(&(permutation.len() as u64).to_le_bytes());
            for &target in permutation {
                data.extend_from_slice(&(target as u64).to_le_bytes());
            }
        }
    }
    data.extend_from_slice(&(graph.feedback_pairs().len() as u64).to_le_bytes());
    data
}

/// Fingerprint of a graph whose permutations are inserted.
pub fn graph_fingerprint(graph: &SyntacticGraph) -> Result<HashValue> {
    let code = graph.generate_code()?;
    let structure = HashValue::hash_with_domain(b"STRUCTURE", &structure_bytes(graph));
    let text = HashValue::hash_with_domain(b"CODE", code.as_bytes());

    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(structure.as_bytes());
    combined.extend_from_slice(text.as_bytes());
    Ok(HashValue::hash_with_domain(b"GRAPH_FINGERPRINT", &combined))
}

impl SyntacticGraph {
    /// See [`graph_fingerprint`].
    pub fn fingerprint(&self) -> Result<HashValue> {
        graph_fingerprint(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::graph::fixtures::{chain, crossed, fan_out};

    #[test]
    fn domains_separate_equal_bytes() {
        let a = HashValue::hash_with_domain(b"A", b"data");
        let b = HashValue::hash_with_domain(b"B", b"data");
        assert_ne!(a, b);
        assert_eq!(a, HashValue::hash_with_domain(b"A", b"data"));
        assert_eq!(a.to_hex().len(), 64);
        assert!(a.to_string().starts_with("HashValue("));
        assert_ne!(a, HashValue::zero());
    }

    #[test]
    fn fresh_builds_agree() {
        let (g1, _) = SyntacticGraph::build(&crossed(), BuildOptions::default()).unwrap();
        let (g2, _) = SyntacticGraph::build(&crossed(), BuildOptions::default()).unwrap();
        assert_eq!(g1.fingerprint().unwrap(), g2.fingerprint().unwrap());
    }

    #[test]
    fn different_models_and_renderings_differ() {
        let (chain_graph, _) = SyntacticGraph::build(&chain(), BuildOptions::default()).unwrap();
        let (fan_graph, _) = SyntacticGraph::build(&fan_out(), BuildOptions::default()).unwrap();
        assert_ne!(chain_graph.fingerprint().unwrap(), fan_graph.fingerprint().unwrap());

        let renamed = BuildOptions {
            expression_name: "Other".to_owned(),
            ..BuildOptions::default()
        };
        let (renamed_graph, _) = SyntacticGraph::build(&chain(), renamed).unwrap();
        assert_ne!(chain_graph.fingerprint().unwrap(), renamed_graph.fingerprint().unwrap());
    }

    #[test]
    fn unfinished_graphs_have_no_fingerprint() {
        assert!(SyntacticGraph::new("g").fingerprint().is_err());
    }
}
