//! Advisory coordinates for external visualization.
//!
//! Columns are placed left to right, nodes top to bottom within a column.
//! Coordinates never affect the generated code.

use super::{Phase, SyntacticGraph};
use crate::error::Result;
use crate::node::{Location, NodeKind};
use tracing::info;

impl SyntacticGraph {
    /// Assigns a location to every node of the series.
    pub fn layout_graph(&mut self) -> Result<()> {
        self.require("layout_graph", Phase::PermutationsInserted)?;

        let options = &self.options;
        let mut placements = Vec::new();
        let mut x = options.origin;
        for column in self.series.columns() {
            let mut y = options.origin;
            for node in column.nodes() {
                let shape = self.network.node(node);
                let (at, advance) = match shape.kind() {
                    NodeKind::Permutation => (shape.inputs().len() as f64 * options.permutation_row, 0.0),
                    NodeKind::Identity => (y, options.identity_spacing),
                    _ => (y, options.node_spacing),
                };
                placements.push((node, Location { x, y: at }));
                y += advance;
            }
            x += options.column_pitch;
        }

        for (node, location) in placements {
            self.network.node_mut(node).set_location(location);
        }
        self.phase = Phase::LaidOut;
        info!(graph = %self.name, "graph laid out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{crossed, fan_out};
    use super::*;
    use crate::config::BuildOptions;

    fn location(graph: &SyntacticGraph, label: &str) -> Location {
        let node = graph.node_from_label(label).unwrap();
        graph.network().node(node).location().unwrap()
    }

    #[test]
    fn columns_advance_by_pitch_and_nodes_by_spacing() {
        let (graph, _) = SyntacticGraph::build(&fan_out(), BuildOptions::default()).unwrap();
        assert_eq!(location(&graph, "E0"), Location { x: 10.0, y: 10.0 });
        assert_eq!(location(&graph, "M3"), Location { x: 190.0, y: 10.0 });
        assert_eq!(location(&graph, "E1"), Location { x: 370.0, y: 10.0 });
        assert_eq!(location(&graph, "E2"), Location { x: 370.0, y: 110.0 });
    }

    #[test]
    fn permutations_sit_by_their_width() {
        let (graph, _) = SyntacticGraph::build(&crossed(), BuildOptions::default()).unwrap();
        assert_eq!(location(&graph, "P5"), Location { x: 370.0, y: 70.0 });
    }

    #[test]
    fn options_drive_the_grid() {
        let options = BuildOptions {
            origin: 0.0,
            column_pitch: 50.0,
            ..BuildOptions::default()
        };
        let (graph, _) = SyntacticGraph::build(&fan_out(), options).unwrap();
        assert_eq!(location(&graph, "E2"), Location { x: 100.0, y: 100.0 });
    }
}
