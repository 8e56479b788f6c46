//! End-to-end tests of the reference stack.

use example::kinds;
use example::{WEBSITE_ADDRESS, declare_stack, preview_engine};
use stratus_config::StackConfig;
use stratus_graph::prelude::*;

const REGISTRY_PASSWORD: &str = "registry-password-value";
const VAULT_SECRET: &str = "vault-secret-value";

fn config(tier: &str) -> StackConfig {
    StackConfig::new("InfraLab", "dev")
        .with_value("appServicePlanSize", "S1")
        .with_value("appServicePlanTier", tier)
        .with_secret("registryPassword", REGISTRY_PASSWORD)
        .with_secret("keyVaultTestSecret", VAULT_SECRET)
}

fn only<'a>(plan: &'a Plan, kind: &'a str) -> &'a ResourceSpec {
    let mut matches = plan.by_kind(kind);
    let spec = matches.next().unwrap_or_else(|| panic!("no {kind} declared"));
    assert!(matches.next().is_none(), "more than one {kind} declared");
    spec
}

fn keys(spec: &ResourceSpec, property: &str) -> Vec<String> {
    match spec.property(property) {
        Some(Property::Object(entries)) => entries.keys().cloned().collect(),
        other => panic!("expected object property {property}, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Topology
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn declares_full_topology() {
    let plan = declare_stack(&config("Standard")).unwrap();

    let group = only(&plan, kinds::RESOURCE_GROUP);
    let app_plan = only(&plan, kinds::APP_SERVICE_PLAN);
    let component = only(&plan, "InfraLab:class:WebAppWithApplicationInsights");
    let app = only(&plan, kinds::WEB_APP);
    let insights = only(&plan, kinds::INSIGHTS);
    let vault = only(&plan, kinds::KEY_VAULT);
    let secret = only(&plan, kinds::KEY_VAULT_SECRET);
    let sql = only(&plan, kinds::SQL_SERVER);
    let db = only(&plan, kinds::SQL_DATABASE);
    let rule = only(&plan, kinds::SQL_FIREWALL_RULE);

    assert_eq!(group.name(), "InfraLab");
    assert_eq!(app_plan.name(), "infralab-plan-");
    assert_eq!(app_plan.parent(), Some(group.id()));
    assert_eq!(component.name(), "infralab-web-app-");
    assert_eq!(component.mode(), ResourceMode::Component);
    assert_eq!(component.parent(), Some(app_plan.id()));
    assert_eq!(app.parent(), Some(component.id()));
    assert_eq!(insights.parent(), Some(app.id()));
    assert_eq!(vault.parent(), Some(group.id()));
    assert_eq!(secret.parent(), Some(vault.id()));
    assert_eq!(db.parent(), Some(sql.id()));
    assert_eq!(rule.name(), "AllowAllWindowsAzureIps");
    assert_eq!(rule.parent(), Some(sql.id()));

    assert_eq!(only(&plan, kinds::CLIENT_CONFIG).mode(), ResourceMode::Read);
    assert_eq!(only(&plan, kinds::RANDOM_PASSWORD).parent(), None);
}

#[test]
fn app_settings_merge_defaults_and_external_keys() {
    let plan = declare_stack(&config("Standard")).unwrap();
    let app = only(&plan, kinds::WEB_APP);

    let settings = plan.find_in(Some(app.id()), "AppSettings").unwrap();
    assert_eq!(
        keys(settings, "properties"),
        [
            "DOCKER_REGISTRY_SERVER_URL",
            "DOCKER_REGISTRY_SERVER_USERNAME",
            "DOCKER_REGISTRY_SERVER_PASSWORD",
            "APPINSIGHTS_INSTRUMENTATIONKEY",
            "APPLICATIONINSIGHTS_CONNECTION_STRING",
            "ApplicationInsightsAgent_EXTENSION_VERSION",
            "XDT_MicrosoftApplicationInsights_Mode",
            "KeyVaultName",
        ]
    );

    let connections = plan.find_in(Some(app.id()), "ConnectionStrings").unwrap();
    assert_eq!(keys(connections, "properties"), ["infradb"]);
}

#[test]
fn tier_toggles_follow_configuration() {
    for (tier, free) in [("Free", true), ("free", true), ("Standard", false), ("Basic", false)] {
        let plan = declare_stack(&config(tier)).unwrap();
        let site = only(&plan, kinds::WEB_APP)
            .property("siteConfig")
            .map(Property::placeholder)
            .unwrap();
        assert_eq!(site["alwaysOn"], !free, "tier {tier}");
        assert_eq!(site["use32BitWorkerProcess"], free, "tier {tier}");
    }
}

#[test]
fn exports_exactly_the_website_address() {
    let plan = declare_stack(&config("Free")).unwrap();
    assert_eq!(
        plan.outputs().keys().collect::<Vec<_>>(),
        [WEBSITE_ADDRESS]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Secrets
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn plan_document_holds_no_secret_plaintext() {
    let plan = declare_stack(&config("Free")).unwrap();
    let json = plan.to_json_pretty().unwrap();

    assert!(!json.contains(REGISTRY_PASSWORD));
    assert!(!json.contains(VAULT_SECRET));
    assert!(json.contains("$deferred"));
    assert!(json.contains("secret:registryPassword"));
}

#[test]
fn secret_bearing_properties_are_marked() {
    let plan = declare_stack(&config("Free")).unwrap();
    let secret = only(&plan, kinds::KEY_VAULT_SECRET);
    assert_eq!(secret.secret_properties(), ["properties".to_owned()]);

    let app = only(&plan, kinds::WEB_APP);
    let settings = plan.find_in(Some(app.id()), "AppSettings").unwrap();
    assert!(settings.secret_properties().contains(&"properties".to_owned()));
}

// ═══════════════════════════════════════════════════════════════════════════
// Preview
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn preview_resolves_website_address() {
    let config = config("Free");
    let plan = declare_stack(&config).unwrap();

    let (_, resolved) = preview_engine(config.secret_store()).preview(&plan).unwrap();

    assert_eq!(
        resolved.output(WEBSITE_ADDRESS).and_then(|v| v.as_str()),
        Some("https://infralab-web-.azurewebsites.net/")
    );
    let connections = resolved.resource("ConnectionStrings").unwrap();
    assert_eq!(
        connections.properties["properties"]["infradb"]["value"],
        "Data Source=tcp:infralab-sql-.database.windows.net,1433;Initial Catalog=infradb;Authentication=Active Directory Interactive;"
    );
    assert_eq!(connections.properties["properties"]["infradb"]["type"], "SQLAzure");

    let settings = resolved.resource("AppSettings").unwrap();
    assert_eq!(
        settings.properties["properties"]["DOCKER_REGISTRY_SERVER_PASSWORD"],
        REGISTRY_PASSWORD
    );
}

#[test]
fn preview_without_secrets_fails() {
    let plan = declare_stack(&config("Free")).unwrap();
    let err = preview_engine(&stratus_config::SecretStore::new())
        .preview(&plan)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Property { ref resource, ref source, .. }
            if resource == "testSecret"
                && matches!(**source, ResolveError::MissingSecret { ref key } if key == "keyVaultTestSecret")
    ));
}
