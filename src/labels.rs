//! Node labels.
//!
//! Labels are a bijection between nodes and short identifiers. Each label is
//! the kind prefix followed by one counter shared by all kinds, so numbering
//! follows admission order. Labelling is idempotent.

use crate::arena::NodeId;
use crate::node::NodeKind;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Labels {
    by_node: HashMap<NodeId, String>,
    by_label: HashMap<String, NodeId>,
    counter: usize,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels `node`, or returns its existing label.
    pub fn assign(&mut self, node: NodeId, kind: NodeKind) -> &str {
        if !self.by_node.contains_key(&node) {
            let label = format!("{}{}", kind.label_prefix(), self.counter);
            self.counter += 1;
            self.by_label.insert(label.clone(), node);
            self.by_node.insert(node, label);
        }
        &self.by_node[&node]
    }

    #[inline]
    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.by_node.get(&node).map(String::as_str)
    }

    #[inline]
    pub fn node(&self, label: &str) -> Option<NodeId> {
        self.by_label.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_idempotent_and_unique() {
        let mut labels = Labels::new();
        let a = NodeId::new(0);
        let b = NodeId::new(1);
        assert_eq!(labels.assign(a, NodeKind::Cap), "C0");
        assert_eq!(labels.assign(b, NodeKind::Representative), "E1");
        assert_eq!(labels.assign(a, NodeKind::Cap), "C0");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.node("E1"), Some(b));
        assert_eq!(labels.label(a), Some("C0"));
        assert_eq!(labels.node("E0"), None);
    }

    #[test]
    fn prefixes_follow_kind() {
        let mut labels = Labels::new();
        let kinds = [
            NodeKind::Permutation,
            NodeKind::Input,
            NodeKind::Output,
            NodeKind::Receive,
            NodeKind::Send,
            NodeKind::Identity,
            NodeKind::Split,
        ];
        let assigned: Vec<String> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| labels.assign(NodeId::new(i as u32), *kind).to_owned())
            .collect();
        assert_eq!(assigned, ["P0", "I1", "O2", "Re3", "Sn4", "_5", "M6"]);
    }
}
