//! Build options.
//!
//! Every field has a default, so a partial serialized configuration fills in
//! the rest.

use serde::{Deserialize, Serialize};

/// Layout and rendering options for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Coordinate of the first column and of the first node in a column.
    pub origin: f64,
    /// Horizontal distance between columns.
    pub column_pitch: f64,
    /// Vertical space taken by an identity node.
    pub identity_spacing: f64,
    /// Vertical space taken by any other non-permutation node.
    pub node_spacing: f64,
    /// Vertical offset per port of a permutation node.
    pub permutation_row: f64,
    /// Infix between the members of a column.
    pub parallel_infix: String,
    /// Infix between the members of a series.
    pub series_infix: String,
    /// Prefix of a contraction, followed by its degree.
    pub contraction_prefix: String,
    /// Name bound to the final expression.
    pub expression_name: String,
    /// Run the structural doctrines after each pass.
    pub validate: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            origin: 10.0,
            column_pitch: 180.0,
            identity_spacing: 50.0,
            node_spacing: 100.0,
            permutation_row: 35.0,
            parallel_infix: " | ".to_owned(),
            series_infix: " => ".to_owned(),
            contraction_prefix: "#".to_owned(),
            expression_name: "Expr_1".to_owned(),
            validate: false,
        }
    }
}

impl BuildOptions {
    /// Defaults with validation after every pass.
    pub fn validating() -> Self {
        Self {
            validate: true,
            ..Self::default()
        }
    }
}
