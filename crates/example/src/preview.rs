//! Preview synthesizers for the resource kinds of the reference stack.
//!
//! Fake outputs are deterministic so previews and tests compare stably.

use serde_json::json;
use stratus_config::SecretStore;
use stratus_graph::dev::PreviewEngine;
use stratus_graph::output::OutputBag;

use crate::kinds;

/// Tenant reported for previewed identities and lookups.
pub const PREVIEW_TENANT_ID: &str = "00000000-0000-0000-0000-00000000a0a0";

/// Object id reported for the caller.
pub const PREVIEW_CLIENT_OBJECT_ID: &str = "00000000-0000-0000-0000-00000000c11e";

/// Principal id reported for web app identities.
pub const PREVIEW_PRINCIPAL_ID: &str = "00000000-0000-0000-0000-0000000000a9";

const PREVIEW_INSTRUMENTATION_KEY: &str = "00000000-0000-0000-0000-0000000000a1";

/// Builds a preview engine that knows the reference stack's resource kinds
/// and resolves secrets from `secrets`.
#[must_use]
pub fn preview_engine(secrets: &SecretStore) -> PreviewEngine {
    PreviewEngine::new()
        .with_secrets(secrets.iter())
        .synthesize(kinds::WEB_APP, |spec, bag| {
            let host = format!("{}.azurewebsites.net", name_of(bag, spec.name()));
            bag.insert("defaultHostName", host);
            if let Some(group) = bag.get("resourceGroupName").cloned() {
                bag.insert("resourceGroup", group);
            }
            bag.insert(
                "identity",
                json!({
                    "type": "SystemAssigned",
                    "principalId": PREVIEW_PRINCIPAL_ID,
                    "tenantId": PREVIEW_TENANT_ID,
                }),
            );
        })
        .synthesize(kinds::INSIGHTS, |_, bag| {
            bag.insert("instrumentationKey", PREVIEW_INSTRUMENTATION_KEY);
            bag.insert(
                "connectionString",
                format!("InstrumentationKey={PREVIEW_INSTRUMENTATION_KEY}"),
            );
        })
        .synthesize(kinds::CLIENT_CONFIG, |_, bag| {
            bag.insert("tenantId", PREVIEW_TENANT_ID);
            bag.insert("objectId", PREVIEW_CLIENT_OBJECT_ID);
        })
        .synthesize(kinds::RANDOM_PASSWORD, |spec, bag| {
            bag.insert("result", format!("preview-{}", spec.name()));
        })
        .synthesize(kinds::SQL_SERVER, |spec, bag| {
            let host = format!("{}.database.windows.net", name_of(bag, spec.name()));
            bag.insert("fullyQualifiedDomainName", host);
        })
}

fn name_of(bag: &OutputBag, fallback: &str) -> String {
    bag.get("name")
        .and_then(|value| value.as_str())
        .unwrap_or(fallback)
        .to_owned()
}
