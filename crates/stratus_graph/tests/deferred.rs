//! Tests for deferred values: laziness, composition and resolution.


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stratus_graph::prelude::*;
use test_utils::{GROUP, WEB_APP};

fn two_resources() -> (ResourceGraph, ResourceHandle, ResourceHandle) {
    let mut graph = ResourceGraph::new();
    let x = graph.declare(ResourceInput::new("x", GROUP)).unwrap();
    let y = graph.declare(ResourceInput::new("y", WEB_APP)).unwrap();
    (graph, x, y)
}

fn materialized(x: &ResourceHandle, y: &ResourceHandle) -> Materialized {
    let mut store = Materialized::new();
    store.insert(x.id(), OutputBag::new().with("value", "1"));
    store.insert(y.id(), OutputBag::new().with("value", "2"));
    store
}

#[test]
fn combine_preserves_order() {
    let (_graph, x, y) = two_resources();
    let value = combine([
        "a".into(),
        x.output_str("value").into(),
        "b".into(),
        y.output_str("value").into(),
    ]);

    assert_eq!(value.resolve(&materialized(&x, &y)), Ok("a1b2".to_string()));
}

#[test]
fn combine_unions_dependencies() {
    let (_graph, x, y) = two_resources();
    let value = combine([x.output_str("value").into(), "-".into(), y.output_str("value").into()]);

    let ids: Vec<ResourceId> = value.resource_dependencies().collect();
    assert_eq!(ids, vec![x.id(), y.id()]);
    assert!(!value.is_secret());
}

#[test]
fn combine_with_a_secret_is_secret() {
    let (_graph, x, _y) = two_resources();
    let value = combine([
        "Password=".into(),
        Deferred::from_secret("dbPassword").into(),
        ";Server=".into(),
        x.output_str("value").into(),
    ]);

    assert!(value.is_secret());
    assert_eq!(value.dependencies().len(), 2);
    assert!(
        value
            .dependencies()
            .contains(&Dependency::Secret("dbPassword".into()))
    );
}

#[test]
fn projectors_run_only_on_resolve() {
    let (_graph, x, y) = two_resources();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let value = x
        .defer(move |bag| {
            counter.fetch_add(1, Ordering::SeqCst);
            bag.str("value").map(str::to_owned)
        })
        .map(|v| format!("<{v}>"));
    let composed = combine([value.clone().into(), "!".into()]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let store = materialized(&x, &y);
    assert_eq!(composed.resolve(&store), Ok("<1>!".to_string()));
    assert_eq!(value.resolve(&store), Ok("<1>".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn zip_and_all_resolve_together() {
    let (_graph, x, y) = two_resources();
    let pair = x.output_str("value").zip(y.output_str("value"));
    let list = Deferred::all([y.output_str("value"), x.output_str("value")]);

    let store = materialized(&x, &y);
    assert_eq!(pair.resolve(&store), Ok(("1".to_string(), "2".to_string())));
    assert_eq!(list.resolve(&store), Ok(vec!["2".to_string(), "1".to_string()]));
    assert_eq!(list.dependencies().len(), 2);
}

#[test]
fn try_map_surfaces_errors() {
    let (_graph, x, y) = two_resources();
    let number = x.output_str("value").try_map(|v| {
        v.parse::<u32>().map_err(|_| ResolveError::TypeMismatch {
            field: "value".into(),
            expected: "number",
        })
    });
    assert_eq!(number.resolve(&materialized(&x, &y)), Ok(1));

    let bad = y.output_str("missing");
    assert_eq!(
        bad.resolve(&materialized(&x, &y)),
        Err(ResolveError::MissingOutput {
            field: "missing".into()
        })
    );
}

#[test]
fn resolving_before_materialization_fails() {
    let (_graph, x, _y) = two_resources();
    let value = x.output_str("value");

    assert_eq!(
        value.resolve(&Materialized::new()),
        Err(ResolveError::Unresolved { resource: x.id() })
    );
}

#[test]
fn as_secret_marks_outputs() {
    let (_graph, x, _y) = two_resources();
    let value = x.output_str("value");
    assert!(!value.is_secret());
    assert!(value.as_secret().is_secret());
}
