//! Tests for the `ResourceGraph` builder API.
//!
//! These tests verify declaration-time behavior:
//! - Name uniqueness per parent scope
//! - Parent, `depends_on` and reference edges
//! - Handle ownership across graphs
//! - Secret-marked properties
//! - Stack outputs


use serde_json::json;
use stratus_graph::edge::Edge;
use stratus_graph::prelude::*;
use test_utils::{GROUP, PLAN, WEB_APP, group};

// ─────────────────────────────────────────────────────────────────────────────
// Names and scopes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn new_graph_is_empty() {
    let graph = ResourceGraph::new();
    assert!(graph.is_empty());
    assert_eq!(graph.len(), 0);
    assert_eq!(graph.component_count(), 0);
}

#[test]
fn ids_follow_declaration_order() {
    let mut graph = ResourceGraph::new();
    let a = graph.declare(ResourceInput::new("a", GROUP)).unwrap();
    let b = graph.declare(ResourceInput::new("b", GROUP)).unwrap();

    assert_eq!(a.id(), ResourceId::new(0));
    assert_eq!(b.id(), ResourceId::new(1));
    assert!(a.id() < b.id());
    assert_eq!(graph.get(b.id()).unwrap().name(), "b");
}

#[test]
fn duplicate_name_in_same_scope_fails() {
    let mut graph = ResourceGraph::new();
    graph.declare(ResourceInput::new("lab", GROUP)).unwrap();
    let err = graph.declare(ResourceInput::new("lab", GROUP)).unwrap_err();

    assert!(matches!(
        err,
        DeclarationError::DuplicateName { ref name, ref scope } if name == "lab" && scope == "<root>"
    ));
    assert_eq!(graph.len(), 1);
}

#[test]
fn duplicate_name_under_same_parent_fails() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    graph
        .declare(ResourceInput::new("farm", PLAN).parent(&rg))
        .unwrap();
    let err = graph
        .declare(ResourceInput::new("farm", WEB_APP).parent(&rg))
        .unwrap_err();

    assert!(matches!(err, DeclarationError::DuplicateName { .. }));
    assert!(err.to_string().contains("'lab'"));
}

#[test]
fn same_name_under_different_parents_is_accepted() {
    let mut graph = ResourceGraph::new();
    let one = group(&mut graph, "one");
    let two = group(&mut graph, "two");

    graph
        .declare(ResourceInput::new("farm", PLAN).parent(&one))
        .unwrap();
    graph
        .declare(ResourceInput::new("farm", PLAN).parent(&two))
        .unwrap();
    graph.declare(ResourceInput::new("farm", PLAN)).unwrap();

    assert!(graph.validate().is_ok());
    assert_eq!(graph.len(), 5);
}

// ─────────────────────────────────────────────────────────────────────────────
// Edges
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parent_and_reference_edges_are_recorded() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    let farm = graph
        .declare(
            ResourceInput::new("farm", PLAN)
                .property("resourceGroupName", rg.output_str("name"))
                .property("location", rg.output_str("location"))
                .parent(&rg),
        )
        .unwrap();

    let edges: Vec<&Edge> = graph
        .edges()
        .iter()
        .filter(|edge| edge.from() == farm.id())
        .collect();
    assert_eq!(edges.len(), 3);
    assert!(edges.iter().all(|edge| edge.to() == rg.id()));
    assert_eq!(
        edges.iter().filter(|edge| edge.kind() == "reference").count(),
        2
    );
    assert_eq!(graph.get(farm.id()).unwrap().dependencies(), vec![rg.id()]);
}

#[test]
fn depends_on_is_deduplicated() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    let app = graph
        .declare(
            ResourceInput::new("app", WEB_APP)
                .depends_on(&rg)
                .depends_on(&rg),
        )
        .unwrap();

    let spec = graph.get(app.id()).unwrap();
    assert_eq!(spec.depends_on(), [rg.id()]);
    assert_eq!(spec.parent(), None);
    assert_eq!(
        graph
            .edges()
            .iter()
            .filter(|edge| matches!(edge, Edge::DependsOn(_)))
            .count(),
        1
    );
}

#[test]
fn handles_from_another_graph_are_rejected() {
    let mut first = ResourceGraph::new();
    let mut second = ResourceGraph::new();
    let foreign = group(&mut first, "lab");

    let err = second
        .declare(ResourceInput::new("farm", PLAN).parent(&foreign))
        .unwrap_err();
    assert!(matches!(err, DeclarationError::ForeignHandle { .. }));

    let err = second
        .declare(ResourceInput::new("farm", PLAN).property("rg", foreign.output_str("name")))
        .unwrap_err();
    assert!(matches!(err, DeclarationError::ForeignHandle { .. }));

    let err = second.defer_from(&foreign, |bag| bag.str("name").map(str::to_owned));
    assert!(matches!(err, Err(DeclarationError::ForeignHandle { .. })));
    assert!(second.is_empty());
}

#[test]
fn read_resources_cannot_own_children() {
    let mut graph = ResourceGraph::new();
    let client = graph
        .declare(ResourceInput::read("client", "azure-native:authorization:getClientConfig"))
        .unwrap();
    assert_eq!(client.mode(), ResourceMode::Read);

    let err = graph
        .declare(ResourceInput::new("vault", "azure-native:keyvault:Vault").parent(&client))
        .unwrap_err();
    assert!(matches!(err, DeclarationError::Invalid(_)));

    // Reading its outputs is fine.
    graph
        .declare(
            ResourceInput::new("vault", "azure-native:keyvault:Vault")
                .property("tenantId", client.output_str("tenantId")),
        )
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred values and secrets
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn defer_from_never_runs_the_projector() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");

    let value = graph
        .defer_from(&rg, |_| -> Result<String, ResolveError> {
            panic!("projector must not run during declaration")
        })
        .unwrap();
    graph
        .declare(ResourceInput::new("farm", PLAN).property("rg", value))
        .unwrap();
    graph.finalize().unwrap();
}

#[test]
fn secret_properties_require_secret_values() {
    let mut graph = ResourceGraph::new();
    let err = graph
        .declare(ResourceInput::new("sql", "azure-native:sql:Server").secret("administratorLoginPassword", "hunter2"))
        .unwrap_err();
    assert!(matches!(
        err,
        DeclarationError::PlaintextSecret { ref property, .. } if property == "administratorLoginPassword"
    ));

    let sql = graph
        .declare(
            ResourceInput::new("sql", "azure-native:sql:Server")
                .property("administratorLogin", "infraadmin")
                .secret("administratorLoginPassword", Deferred::from_secret("dbPassword")),
        )
        .unwrap();
    let spec = graph.get(sql.id()).unwrap();
    assert_eq!(spec.secret_properties(), ["administratorLoginPassword".to_string()]);
}

#[test]
fn structured_properties_keep_literal_leaves() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    let vault = graph
        .declare(
            ResourceInput::new("vault", "azure-native:keyvault:Vault").property(
                "properties",
                Property::object([
                    ("tenantId", Property::from(rg.output_str("tenantId"))),
                    ("sku", Property::object([("family", "A"), ("name", "standard")])),
                ]),
            ),
        )
        .unwrap();

    let spec = graph.get(vault.id()).unwrap();
    let rendered = spec.property("properties").unwrap().placeholder();
    assert_eq!(rendered["sku"], json!({ "family": "A", "name": "standard" }));
    assert_eq!(rendered["tenantId"]["$deferred"]["dependsOn"], json!(["res_0"]));
    assert_eq!(spec.dependencies(), vec![rg.id()]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn duplicate_outputs_fail() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    graph.export("group", rg.output_str("name")).unwrap();

    let err = graph.export("group", rg.output_str("id")).unwrap_err();
    assert!(matches!(err, DeclarationError::DuplicateOutput(ref name) if name == "group"));
    assert_eq!(graph.output_names().collect::<Vec<_>>(), ["group"]);
}

#[test]
fn outputs_from_another_graph_are_rejected() {
    let mut first = ResourceGraph::new();
    let foreign = group(&mut first, "lab");
    let mut second = ResourceGraph::new();

    let err = second.export("name", foreign.output_str("name")).unwrap_err();
    assert!(matches!(err, DeclarationError::ForeignHandle { .. }));
}

#[test]
fn finalize_returns_resources_in_declaration_order() {
    let mut graph = ResourceGraph::new();
    let rg = group(&mut graph, "lab");
    graph
        .declare(ResourceInput::new("farm", PLAN).parent(&rg))
        .unwrap();
    graph
        .declare(ResourceInput::new("app", WEB_APP).depends_on(&rg))
        .unwrap();

    let plan = graph.finalize().unwrap();
    let names: Vec<&str> = plan.resources().iter().map(ResourceSpec::name).collect();
    assert_eq!(names, ["lab", "farm", "app"]);
    assert_eq!(plan.by_kind(PLAN).count(), 1);
    assert_eq!(plan.find("app").unwrap().kind().as_str(), WEB_APP);
}
