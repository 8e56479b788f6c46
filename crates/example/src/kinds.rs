//! Resource type tokens used by the reference stack.

/// Resource group.
pub const RESOURCE_GROUP: &str = "azure-native:resources:ResourceGroup";
/// App service plan.
pub const APP_SERVICE_PLAN: &str = "azure-native:web:AppServicePlan";
/// Log Analytics workspace.
pub const WORKSPACE: &str = "azure-native:operationalinsights:Workspace";
/// Application Insights (classic provider).
pub const INSIGHTS: &str = "azure:appinsights:Insights";
/// Web app.
pub const WEB_APP: &str = "azure-native:web:WebApp";
/// Application settings of a web app.
pub const WEB_APP_SETTINGS: &str = "azure-native:web:WebAppApplicationSettings";
/// Connection strings of a web app.
pub const WEB_APP_CONNECTION_STRINGS: &str = "azure-native:web:WebAppConnectionStrings";
/// Lookup of the caller's tenant and object id.
pub const CLIENT_CONFIG: &str = "azure-native:authorization:getClientConfig";
/// Key vault.
pub const KEY_VAULT: &str = "azure-native:keyvault:Vault";
/// Key vault secret.
pub const KEY_VAULT_SECRET: &str = "azure-native:keyvault:Secret";
/// Random password generator.
pub const RANDOM_PASSWORD: &str = "random:index:RandomPassword";
/// SQL server.
pub const SQL_SERVER: &str = "azure-native:sql:Server";
/// SQL database.
pub const SQL_DATABASE: &str = "azure-native:sql:Database";
/// SQL server firewall rule.
pub const SQL_FIREWALL_RULE: &str = "azure-native:sql:FirewallRule";

/// Returns the component type token for a project.
#[must_use]
pub fn web_app_component(project: &str) -> String {
    format!("{project}:class:WebAppWithApplicationInsights")
}
