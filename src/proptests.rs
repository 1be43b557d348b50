//! Property-based tests over randomly generated models.
//!
//! These check that for any model:
//! 1. the build succeeds with every doctrine validated after its pass
//! 2. every join of the final series is straight and the expression has a rank
//! 3. labels are a bijection in admission order
//! 4. code generation and fingerprints are deterministic
//! 5. the contraction folds each send into its own receive and leaves only
//!    exterior channels on the boundary

use proptest::prelude::*;
use std::collections::BTreeSet;

use crate::config::BuildOptions;
use crate::graph::SyntacticGraph;
use crate::model::{Model, PortDirection, PortKey};
use crate::node::NodeKind;
use crate::term::{Channel, Term};

/// Shape of a random model: per-entity port counts, links between them and
/// exterior links.
#[derive(Debug, Clone)]
struct ModelShape {
    entities: Vec<(usize, usize)>,
    links: BTreeSet<(usize, usize, usize, usize)>,
    exterior_inputs: Vec<(usize, usize)>,
    exterior_outputs: Vec<(usize, usize)>,
}

fn shape_strategy() -> impl Strategy<Value = ModelShape> {
    let entities = prop::collection::vec((0usize..3, 0usize..3), 1..7);
    let links = prop::collection::btree_set((0usize..7, 0usize..3, 0usize..7, 0usize..3), 0..12);
    let exterior = prop::collection::vec((0usize..7, 0usize..3), 0..3);
    (entities, links, exterior.clone(), exterior).prop_map(
        |(entities, links, exterior_inputs, exterior_outputs)| ModelShape {
            entities,
            links,
            exterior_inputs,
            exterior_outputs,
        },
    )
}

/// Shapes with a ring through the first entities, plus one exterior input
/// and one exterior output on it.
fn looped_shape_strategy() -> impl Strategy<Value = ModelShape> {
    (2usize..6, shape_strategy()).prop_map(|(ring, mut shape)| {
        let len = shape.entities.len().max(ring);
        shape.entities.resize(len, (1, 1));
        for i in 0..ring {
            let entity = &mut shape.entities[i];
            entity.0 = entity.0.max(1);
            entity.1 = entity.1.max(1);
            shape.links.insert((i, 0, (i + 1) % ring, 0));
        }
        shape.exterior_inputs.push((0, 0));
        shape.exterior_outputs.push((ring - 1, 0));
        shape
    })
}

fn port(ports: &[Vec<PortKey>], entity: usize, index: usize) -> Option<PortKey> {
    ports.get(entity)?.get(index).copied()
}

/// Builds the model, dropping links that name missing ports.
fn build_model(shape: &ModelShape) -> Model {
    let mut model = Model::new("random");
    let mut inputs: Vec<Vec<PortKey>> = Vec::new();
    let mut outputs: Vec<Vec<PortKey>> = Vec::new();
    for (index, &(ins, outs)) in shape.entities.iter().enumerate() {
        let entity = model.add_entity(format!("N{index}"));
        inputs.push(
            (0..ins)
                .map(|i| model.add_port(entity, format!("in{i}"), PortDirection::Input, 1).unwrap())
                .collect(),
        );
        outputs.push(
            (0..outs)
                .map(|i| model.add_port(entity, format!("out{i}"), PortDirection::Output, 1).unwrap())
                .collect(),
        );
    }

    for &(from, out, to, inp) in &shape.links {
        if let (Some(out), Some(inp)) = (port(&outputs, from, out), port(&inputs, to, inp)) {
            model.connect(out, inp).unwrap();
        }
    }
    for (n, &(to, inp)) in shape.exterior_inputs.iter().enumerate() {
        if let Some(inp) = port(&inputs, to, inp) {
            let ext = model.add_exterior_port(format!("x{n}"), PortDirection::Input, 1);
            model.connect(ext, inp).unwrap();
        }
    }
    for (n, &(from, out)) in shape.exterior_outputs.iter().enumerate() {
        if let Some(out) = port(&outputs, from, out) {
            let ext = model.add_exterior_port(format!("y{n}"), PortDirection::Output, 1);
            model.connect(out, ext).unwrap();
        }
    }
    model
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_model_builds_under_validation(shape in shape_strategy()) {
        let model = build_model(&shape);
        let (graph, report) = match SyntacticGraph::build(&model, BuildOptions::validating()) {
            Ok(built) => built,
            Err(err) => return Err(TestCaseError::fail(format!("build failed: {err}"))),
        };
        prop_assert_eq!(report.skipped, 0);
        prop_assert_eq!(report.feedback_loops, graph.feedback_pairs().len());
    }

    #[test]
    fn expression_rank_closes(shape in shape_strategy()) {
        let model = build_model(&shape);
        let (graph, _) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
        let network = graph.network();
        prop_assert!(graph.series().first_mismatch(network).is_none());
        let expression = graph.expression().unwrap();
        prop_assert!(expression.rank(network).is_some());

        // Feedback never leaks out of the contraction.
        let rank = expression.rank(network).unwrap();
        let incoming = graph
            .nodes()
            .iter()
            .filter(|&&n| network.node(n).kind() == NodeKind::Input)
            .count();
        prop_assert_eq!(rank.forward_in, incoming);
    }

    #[test]
    fn terminals_only_end_the_series(shape in shape_strategy()) {
        let model = build_model(&shape);
        let (graph, _) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
        let network = graph.network();
        let columns: Vec<_> = graph.series().columns().collect();
        if let Some((_, earlier)) = columns.split_last() {
            for column in earlier {
                prop_assert!(column.nodes().all(|n| !network.node(n).is_terminal()));
            }
        }
    }

    #[test]
    fn feedback_folds_onto_itself(shape in looped_shape_strategy()) {
        let model = build_model(&shape);
        let (graph, report) = SyntacticGraph::build(&model, BuildOptions::validating())
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert!(report.feedback_loops >= 1);

        let network = graph.network();
        let Some(Term::Contraction(contraction)) = graph.expression() else {
            return Err(TestCaseError::fail("expected a contraction"));
        };
        let expected: Vec<(Channel, Channel)> = graph
            .feedback_pairs()
            .iter()
            .map(|pair| (Channel::Boundary(pair.send), Channel::Boundary(pair.receive)))
            .collect();
        prop_assert_eq!(contraction.folded(network), expected);

        let inputs = contraction.input_channels(network);
        let outputs = contraction.output_channels(network);
        let rank = contraction.rank(network).unwrap();
        prop_assert_eq!((rank.forward_in, rank.forward_out), (inputs.len(), outputs.len()));
        for channel in inputs.into_iter().chain(outputs) {
            prop_assert!(
                matches!(channel, Channel::Boundary(node) if network.node(node).kind().is_exterior()),
                "{:?} on the boundary",
                channel
            );
        }
    }

    #[test]
    fn labels_are_a_bijection(shape in shape_strategy()) {
        let model = build_model(&shape);
        let (graph, _) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
        prop_assert_eq!(graph.labels().len(), graph.nodes().len());
        for (index, &node) in graph.nodes().iter().enumerate() {
            let label = graph.label_of(node).unwrap();
            prop_assert!(label.ends_with(&index.to_string()));
            prop_assert_eq!(graph.node_from_label(label), Some(node));
        }
    }

    #[test]
    fn builds_are_deterministic(shape in shape_strategy()) {
        let model = build_model(&shape);
        let (first, _) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
        let (second, _) = SyntacticGraph::build(&model, BuildOptions::default()).unwrap();
        prop_assert_eq!(first.generate_code().unwrap(), second.generate_code().unwrap());
        prop_assert_eq!(first.generate_code().unwrap(), first.generate_code().unwrap());
        prop_assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }
}

#[test]
fn build_logs_through_a_subscriber() {
    use tracing_subscriber::EnvFilter;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("syntactic=debug"))
        .with_test_writer()
        .finish();
    let shape = ModelShape {
        entities: vec![(1, 1), (1, 1)],
        links: [(0, 0, 1, 0), (1, 0, 0, 0)].into_iter().collect(),
        exterior_inputs: Vec::new(),
        exterior_outputs: Vec::new(),
    };
    let model = build_model(&shape);
    let report = tracing::subscriber::with_default(subscriber, || {
        SyntacticGraph::build(&model, BuildOptions::validating()).map(|(_, report)| report)
    })
    .unwrap();
    assert_eq!(report.feedback_loops, 1);
}
