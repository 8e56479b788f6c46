//! The reference stack: web app, SQL database, key vault and monitoring.

use stratus_component::ComponentExt;
use stratus_config::{ConfigError, StackConfig};
use stratus_graph::prelude::*;

use crate::kinds;
use crate::tier::PricingTier;
use crate::web_app::{ContainerRegistry, WebAppWithInsights};

/// Name of the single stack output.
pub const WEBSITE_ADDRESS: &str = "websiteAddress";

/// SQL database created by the stack.
pub const DATABASE_NAME: &str = "infradb";

/// Errors raised by the stack program.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// Configuration was missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A declaration was rejected.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    /// The plan could not be resolved against materialized outputs.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The plan could not be rendered.
    #[error("failed to render plan: {0}")]
    Render(#[from] serde_json::Error),
}

/// Settings read from the stack configuration before any declaration.
#[derive(Debug, Clone)]
pub struct StackSettings {
    /// Project name; prefixes generated resource names.
    pub project: String,
    /// Name of the resource group.
    pub resource_group_name: String,
    /// App service plan sku size, e.g. `F1` or `S1`.
    pub plan_size: String,
    /// App service plan tier.
    pub plan_tier: PricingTier,
    /// Container registry password.
    pub registry_password: Deferred<String>,
    /// Value of the vault's test secret.
    pub vault_secret: Deferred<String>,
}

impl StackSettings {
    /// Reads the required settings and secrets.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] if `appServicePlanSize`, `appServicePlanTier`,
    /// `registryPassword` or `keyVaultTestSecret` is absent, and
    /// [`ConfigError::Invalid`] for an unknown tier.
    pub fn from_config(config: &StackConfig) -> Result<Self, ConfigError> {
        let plan_size = config.require("appServicePlanSize")?.to_owned();
        let plan_tier =
            PricingTier::from_setting("appServicePlanTier", config.require("appServicePlanTier")?)?;
        Ok(Self {
            project: config.project().to_owned(),
            resource_group_name: config
                .get_or("resourceGroupName", config.project())
                .to_owned(),
            plan_size,
            plan_tier,
            registry_password: config.require_secret("registryPassword")?,
            vault_secret: config.require_secret("keyVaultTestSecret")?,
        })
    }

    /// Returns the generated logical name for a resource type, e.g.
    /// `infralab-plan-`.
    #[must_use]
    pub fn name(&self, resource_type: &str) -> String {
        format!("{}-{}-", self.project.to_lowercase(), resource_type)
    }
}

/// Reads the configuration and declares the whole stack.
pub fn declare_stack(config: &StackConfig) -> Result<Plan, StackError> {
    let settings = StackSettings::from_config(config)?;
    Ok(declare(&settings)?)
}

/// Declares the stack from already validated settings.
pub fn declare(settings: &StackSettings) -> Result<Plan, DeclarationError> {
    let mut graph = ResourceGraph::new();

    let group = graph.declare(
        ResourceInput::new(settings.resource_group_name.as_str(), kinds::RESOURCE_GROUP)
            .property("resourceGroupName", settings.resource_group_name.as_str()),
    )?;
    let group_name = group.output_str("name");

    let plan = graph.declare(
        ResourceInput::new(settings.name("plan"), kinds::APP_SERVICE_PLAN)
            .property("resourceGroupName", &group_name)
            .property("kind", "linux")
            .property("reserved", true)
            .property(
                "sku",
                Property::object([
                    ("name", settings.plan_size.as_str()),
                    ("size", settings.plan_size.as_str()),
                    ("tier", settings.plan_tier.as_str()),
                ]),
            )
            .parent(&group),
    )?;

    let workspace = graph.declare(
        ResourceInput::new(settings.name("laws"), kinds::WORKSPACE)
            .property("resourceGroupName", &group_name)
            .parent(&group),
    )?;

    let web = WebAppWithInsights {
        project: settings.project.clone(),
        web_name: settings.name("web"),
        insights_name: settings.name("ai"),
        resource_group_name: group_name.clone(),
        app_service_plan_id: plan.output_str("id"),
        workspace_id: workspace.output_str("id"),
        free_tier: settings.plan_tier.is_free(),
        registry: ContainerRegistry::workshop(settings.registry_password.clone()),
    };
    let (component, app) = web.declare_in(&mut graph, &settings.name("web-app"), Some(&plan))?;

    let client = graph.declare(ResourceInput::read("clientConfig", kinds::CLIENT_CONFIG))?;
    let tenant_id = client.output_str("tenantId");

    let vault = graph.declare(
        ResourceInput::new(settings.name("kv"), kinds::KEY_VAULT)
            .property("resourceGroupName", &group_name)
            .property(
                "properties",
                Property::object([
                    ("tenantId", Property::from(&tenant_id)),
                    (
                        "sku",
                        Property::object([("family", "A"), ("name", "standard")]),
                    ),
                    (
                        "accessPolicies",
                        Property::list([
                            access_policy(
                                client.output_str("objectId"),
                                tenant_id.clone(),
                                &["get", "list", "set", "delete"],
                            ),
                            access_policy(
                                app.principal_id.clone(),
                                app.tenant_id.clone(),
                                &["get", "list"],
                            ),
                        ]),
                    ),
                ]),
            )
            .parent(&group),
    )?;
    component.add_setting("KeyVaultName", vault.output_str("name"))?;

    graph.declare(
        ResourceInput::new("testSecret", kinds::KEY_VAULT_SECRET)
            .property("resourceGroupName", &group_name)
            .property("vaultName", vault.output_str("name"))
            .property("secretName", "testSecret")
            .property(
                "properties",
                Property::object([("value", &settings.vault_secret)]),
            )
            .parent(&vault),
    )?;

    let password = graph.declare(
        ResourceInput::new("password", kinds::RANDOM_PASSWORD)
            .property("length", 16)
            .property("special", true),
    )?;

    let sql = graph.declare(
        ResourceInput::new(settings.name("sql"), kinds::SQL_SERVER)
            .property("resourceGroupName", &group_name)
            .property("administratorLogin", "infraadmin")
            .secret(
                "administratorLoginPassword",
                password.output_str("result").as_secret(),
            )
            .property(
                "administrators",
                Property::object([("login", &app.name), ("sid", &app.principal_id)]),
            )
            .parent(&group),
    )?;
    let sql_name = sql.output_str("name");

    component.add_connection_string(
        DATABASE_NAME,
        ConnectionStringKind::SqlAzure,
        combine([
            "Data Source=tcp:".into(),
            (&sql_name).into(),
            format!(
                ".database.windows.net,1433;Initial Catalog={DATABASE_NAME};Authentication=Active Directory Interactive;"
            )
            .into(),
        ]),
    )?;

    graph.declare(
        ResourceInput::new(settings.name("db"), kinds::SQL_DATABASE)
            .property("databaseName", DATABASE_NAME)
            .property("resourceGroupName", &group_name)
            .property("serverName", &sql_name)
            .property("collation", "SQL_Latin1_General_CP1_CI_AS")
            .property("sku", Property::object([("name", "Basic")]))
            .property("maxSizeBytes", 1024_u64 * 1024 * 1024)
            .parent(&sql),
    )?;

    graph.declare(
        ResourceInput::new("AllowAllWindowsAzureIps", kinds::SQL_FIREWALL_RULE)
            .property("firewallRuleName", "AllowAllWindowsAzureIps")
            .property("serverName", &sql_name)
            .property("resourceGroupName", &group_name)
            .property("startIpAddress", "0.0.0.0")
            .property("endIpAddress", "0.0.0.0")
            .parent(&sql),
    )?;

    graph.export(
        WEBSITE_ADDRESS,
        combine([
            "https://".into(),
            (&app.default_host_name).into(),
            "/".into(),
        ]),
    )?;

    tracing::debug!(
        project = %settings.project,
        tier = %settings.plan_tier,
        resources = graph.len(),
        "declared stack"
    );
    graph.finalize()
}

fn access_policy(
    object_id: Deferred<String>,
    tenant_id: Deferred<String>,
    secrets: &[&str],
) -> Property {
    Property::object([
        ("objectId", Property::from(object_id)),
        ("tenantId", Property::from(tenant_id)),
        (
            "permissions",
            Property::object([("secrets", Property::list(secrets.iter().copied()))]),
        ),
    ])
}
