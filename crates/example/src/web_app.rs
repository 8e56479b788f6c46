//! Web app with Application Insights, as one reusable component.

use stratus_component::Component;
use stratus_graph::prelude::*;

use crate::kinds;

/// Container registry the web app pulls its image from.
#[derive(Debug, Clone)]
pub struct ContainerRegistry {
    /// Registry URL, e.g. `https://iacworkshop.azurecr.io`.
    pub server: String,
    /// Registry user.
    pub username: String,
    /// Registry password. Must be secret.
    pub password: Deferred<String>,
    /// Image reference without the registry host, e.g. `infrawebapp:v1`.
    pub image: String,
}

impl ContainerRegistry {
    /// The workshop registry serving `infrawebapp:v1`.
    #[must_use]
    pub fn workshop(password: Deferred<String>) -> Self {
        Self {
            server: "https://iacworkshop.azurecr.io".into(),
            username: "iacworkshop".into(),
            password,
            image: "infrawebapp:v1".into(),
        }
    }

    /// Returns the registry host without scheme.
    #[must_use]
    pub fn host(&self) -> &str {
        self.server
            .strip_prefix("https://")
            .or_else(|| self.server.strip_prefix("http://"))
            .unwrap_or(&self.server)
    }

    /// Returns the `linuxFxVersion` of a container site running the image.
    #[must_use]
    pub fn linux_fx_version(&self) -> String {
        format!("DOCKER|{}/{}", self.host(), self.image)
    }
}

/// A Linux web app running a container, monitored by Application Insights.
///
/// The component declares the web app and its Insights resource. Application
/// settings and connection strings stay open for extension until the graph
/// finalizes; the component then emits one `AppSettings` and one
/// `ConnectionStrings` resource under the web app.
///
/// # Example
///
/// ```
/// use example::{ContainerRegistry, WebAppWithInsights};
/// use stratus_component::ComponentExt;
/// use stratus_graph::prelude::*;
///
/// let app = WebAppWithInsights {
///     project: "InfraLab".into(),
///     web_name: "infralab-web-".into(),
///     insights_name: "infralab-ai-".into(),
///     resource_group_name: Deferred::known("InfraLab".to_owned()),
///     app_service_plan_id: Deferred::known("/plans/p".to_owned()),
///     workspace_id: Deferred::known("/workspaces/w".to_owned()),
///     free_tier: true,
///     registry: ContainerRegistry::workshop(Deferred::from_secret("registryPassword")),
/// };
///
/// let (graph, (component, outputs)) = app.to_graph("web-app").unwrap();
/// component.add_setting("FEATURE_FLAG", "on").unwrap();
/// let plan = graph.finalize().unwrap();
///
/// let settings = plan.find_in(Some(outputs.app.id()), "AppSettings").unwrap();
/// assert!(settings.secret_properties().contains(&"properties".to_owned()));
/// ```
#[derive(Debug, Clone)]
pub struct WebAppWithInsights {
    /// Project the component belongs to; prefixes the component type token.
    pub project: String,
    /// Logical name of the web app.
    pub web_name: String,
    /// Logical name of the Insights resource.
    pub insights_name: String,
    /// Resource group the resources live in.
    pub resource_group_name: Deferred<String>,
    /// Id of the hosting app service plan.
    pub app_service_plan_id: Deferred<String>,
    /// Id of the Log Analytics workspace backing Insights.
    pub workspace_id: Deferred<String>,
    /// Whether the plan runs on the free tier.
    pub free_tier: bool,
    /// Where the container image comes from.
    pub registry: ContainerRegistry,
}

/// Values a [`WebAppWithInsights`] hands back.
#[derive(Debug, Clone)]
pub struct WebAppOutputs {
    /// The web app resource.
    pub app: ResourceHandle,
    /// The Insights resource.
    pub insights: ResourceHandle,
    /// Web app name.
    pub name: Deferred<String>,
    /// Public host name of the web app.
    pub default_host_name: Deferred<String>,
    /// Object id of the web app's system identity.
    pub principal_id: Deferred<String>,
    /// Tenant of the web app's system identity.
    pub tenant_id: Deferred<String>,
}

impl Component for WebAppWithInsights {
    type Outputs = WebAppOutputs;

    fn build(&self, ctx: &mut ComponentContext<'_>) -> Result<WebAppOutputs, DeclarationError> {
        let app = ctx.declare(
            ResourceInput::new(self.web_name.as_str(), kinds::WEB_APP)
                .property("resourceGroupName", &self.resource_group_name)
                .property("serverFarmId", &self.app_service_plan_id)
                .property(
                    "siteConfig",
                    Property::object([
                        ("linuxFxVersion", Property::from(self.registry.linux_fx_version())),
                        ("alwaysOn", Property::from(!self.free_tier)),
                        ("use32BitWorkerProcess", Property::from(self.free_tier)),
                    ]),
                )
                .property("identity", Property::object([("type", "SystemAssigned")])),
        )?;

        let insights = ctx.declare(
            ResourceInput::new(self.insights_name.as_str(), kinds::INSIGHTS)
                .property("resourceGroupName", &self.resource_group_name)
                .property("workspaceId", &self.workspace_id)
                .property("applicationType", "web")
                .parent(&app),
        )?;

        ctx.add_setting("DOCKER_REGISTRY_SERVER_URL", self.registry.server.as_str())?;
        ctx.add_setting("DOCKER_REGISTRY_SERVER_USERNAME", self.registry.username.as_str())?;
        ctx.add_secret_setting("DOCKER_REGISTRY_SERVER_PASSWORD", &self.registry.password)?;
        ctx.add_setting(
            "APPINSIGHTS_INSTRUMENTATIONKEY",
            insights.output_str("instrumentationKey"),
        )?;
        ctx.add_setting(
            "APPLICATIONINSIGHTS_CONNECTION_STRING",
            insights.output_str("connectionString"),
        )?;
        ctx.add_setting("ApplicationInsightsAgent_EXTENSION_VERSION", "~3")?;
        ctx.add_setting("XDT_MicrosoftApplicationInsights_Mode", "recommended")?;

        let owner = app.clone();
        ctx.on_finalize(move |fin| {
            let settings = fin.pending().settings_property();
            let connection_strings = fin.pending().connection_strings_property();
            fin.declare(
                ResourceInput::new("AppSettings", kinds::WEB_APP_SETTINGS)
                    .property("name", owner.output_str("name"))
                    .property("resourceGroupName", owner.output_str("resourceGroup"))
                    .property("properties", settings)
                    .parent(&owner),
            )?;
            fin.declare(
                ResourceInput::new("ConnectionStrings", kinds::WEB_APP_CONNECTION_STRINGS)
                    .property("name", owner.output_str("name"))
                    .property("resourceGroupName", owner.output_str("resourceGroup"))
                    .property("properties", connection_strings)
                    .parent(&owner),
            )?;
            Ok(())
        });

        Ok(WebAppOutputs {
            name: app.output_str("name"),
            default_host_name: app.output_str("defaultHostName"),
            principal_id: identity_field(&app, "principalId"),
            tenant_id: identity_field(&app, "tenantId"),
            insights,
            app,
        })
    }

    fn kind(&self) -> ResourceKind {
        kinds::web_app_component(&self.project).into()
    }
}

fn identity_field(app: &ResourceHandle, field: &'static str) -> Deferred<String> {
    app.defer(move |bag| {
        let pointer = format!("/identity/{field}");
        bag.pointer(&pointer)?
            .as_str()
            .map(str::to_owned)
            .ok_or(ResolveError::TypeMismatch {
                field: pointer,
                expected: "string",
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_component::ComponentExt;

    fn component(free_tier: bool) -> WebAppWithInsights {
        WebAppWithInsights {
            project: "InfraLab".into(),
            web_name: "web".into(),
            insights_name: "ai".into(),
            resource_group_name: Deferred::known("rg".to_owned()),
            app_service_plan_id: Deferred::known("/plans/p".to_owned()),
            workspace_id: Deferred::known("/workspaces/w".to_owned()),
            free_tier,
            registry: ContainerRegistry::workshop(Deferred::from_secret("registryPassword")),
        }
    }

    fn site_config(plan: &Plan, outputs: &WebAppOutputs) -> serde_json::Value {
        plan.get(outputs.app.id())
            .and_then(|spec| spec.property("siteConfig"))
            .map(Property::placeholder)
            .unwrap()
    }

    #[test]
    fn registry_image_reference() {
        let registry = ContainerRegistry::workshop(Deferred::from_secret("pw"));
        assert_eq!(registry.host(), "iacworkshop.azurecr.io");
        assert_eq!(
            registry.linux_fx_version(),
            "DOCKER|iacworkshop.azurecr.io/infrawebapp:v1"
        );
    }

    #[test]
    fn free_tier_toggles() {
        let (graph, (_, outputs)) = component(true).to_graph("site").unwrap();
        let plan = graph.finalize().unwrap();
        let config = site_config(&plan, &outputs);
        assert_eq!(config["alwaysOn"], false);
        assert_eq!(config["use32BitWorkerProcess"], true);

        let (graph, (_, outputs)) = component(false).to_graph("site").unwrap();
        let plan = graph.finalize().unwrap();
        let config = site_config(&plan, &outputs);
        assert_eq!(config["alwaysOn"], true);
        assert_eq!(config["use32BitWorkerProcess"], false);
    }

    #[test]
    fn component_kind_uses_project() {
        let (graph, (handle, _)) = component(true).to_graph("site").unwrap();
        assert_eq!(
            handle.resource().kind().as_str(),
            "InfraLab:class:WebAppWithApplicationInsights"
        );
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn insights_sits_under_the_app() {
        let (graph, (handle, outputs)) = component(true).to_graph("site").unwrap();
        let plan = graph.finalize().unwrap();

        assert_eq!(plan.get(outputs.app.id()).unwrap().parent(), Some(handle.id()));
        assert_eq!(
            plan.get(outputs.insights.id()).unwrap().parent(),
            Some(outputs.app.id())
        );
    }

    #[test]
    fn plaintext_registry_password_is_rejected() {
        let mut app = component(true);
        app.registry.password = Deferred::known("hunter2".to_owned());

        let err = app.to_graph("site").unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::PlaintextSecret { ref property, .. }
                if property == "DOCKER_REGISTRY_SERVER_PASSWORD"
        ));
    }

    #[test]
    fn identity_fields_read_nested_outputs() {
        let (_graph, (_, outputs)) = component(true).to_graph("site").unwrap();
        let mut store = Materialized::new();
        store.insert(
            outputs.app.id(),
            OutputBag::new().with(
                "identity",
                serde_json::json!({ "principalId": "p-1", "tenantId": "t-1" }),
            ),
        );

        assert_eq!(outputs.principal_id.resolve(&store).unwrap(), "p-1");
        assert_eq!(outputs.tenant_id.resolve(&store).unwrap(), "t-1");
    }
}
