//! IPLB Provider Implementation
//!
//! Registers resources by type name and dispatches the plugin lifecycle
//! calls (schema, validate, plan, apply, read, import) to them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use iplb_common::{ApiClient, ClientConfig, Error, OvhClient, Result};

use crate::diagnostics::{has_errors, Diagnostic};
use crate::resources::{http_farm::HttpFarmResource, Resource};
use crate::schema::{Attribute, Block, Schema};
use crate::state::{get_optional_int_attr, get_optional_string_attr, DynamicValue};

/// Every schema the provider serves
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resource_schemas: HashMap<String, Schema>,
}

#[derive(Debug, Clone)]
pub struct PlanResponse {
    pub planned_state: DynamicValue,
    /// Attributes whose change forces a replacement
    pub requires_replace: Vec<String>,
}

/// Outcome of apply, read and import calls
#[derive(Debug, Clone)]
pub struct StateResponse {
    /// Null when the resource no longer exists
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

impl StateResponse {
    fn ok(new_state: DynamicValue) -> Self {
        Self {
            new_state,
            diagnostics: vec![],
        }
    }

    /// Report `e` and keep `state`, the last state known to exist
    fn failed(summary: &str, e: &Error, state: DynamicValue) -> Self {
        Self {
            new_state: state,
            diagnostics: vec![Diagnostic::error(summary, e.to_string(), None)],
        }
    }
}

/// IPLB Terraform-style provider
pub struct IplbProvider {
    /// Client for the remote API, set by configure or injected
    client: Arc<RwLock<Option<Arc<dyn ApiClient>>>>,
    resources: HashMap<&'static str, Arc<dyn Resource>>,
}

impl Default for IplbProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IplbProvider {
    pub fn new() -> Self {
        let mut provider = Self {
            client: Arc::new(RwLock::new(None)),
            resources: HashMap::new(),
        };
        provider.register(Arc::new(HttpFarmResource));
        provider
    }

    /// Provider already wired to a client, skipping configuration
    pub fn with_client(client: Arc<dyn ApiClient>) -> Self {
        let mut provider = Self::new();
        provider.client = Arc::new(RwLock::new(Some(client)));
        provider
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.resources.keys().copied().collect();
        types.sort_unstable();
        types
    }

    fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| Error::UnknownResourceType(type_name.to_string()))
    }

    async fn get_client(&self) -> Result<Arc<dyn ApiClient>> {
        self.client.read().await.clone().ok_or(Error::NotConfigured)
    }

    pub fn get_provider_schema(&self) -> ProviderSchema {
        info!("GetProviderSchema called");

        ProviderSchema {
            provider: provider_schema(),
            resource_schemas: self
                .resources
                .iter()
                .map(|(name, r)| (name.to_string(), r.schema()))
                .collect(),
        }
    }

    pub fn validate_provider_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        debug!("ValidateProviderConfig called");

        let mut diagnostics = provider_schema().block.validate(config);
        if !has_errors(&diagnostics) {
            if let Err(e) = client_config(ClientConfig::default(), config).base_url() {
                diagnostics.push(Diagnostic::error(
                    "Invalid endpoint",
                    e.to_string(),
                    Some("endpoint".to_string()),
                ));
            }
        }
        diagnostics
    }

    /// Build the API client from the provider block, falling back to the
    /// `OVH_*` environment for attributes the block leaves unset
    pub async fn configure_provider(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        info!("ConfigureProvider called");

        let diagnostics = self.validate_provider_config(config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        self.configure_with(client_config(ClientConfig::default().with_env(), config))
            .await
    }

    /// Build the API client from an already assembled configuration
    pub async fn configure_with(&self, config: ClientConfig) -> Vec<Diagnostic> {
        match OvhClient::new(&config) {
            Ok(client) => {
                info!("Configured API client for {}", client.base_url());
                *self.client.write().await = Some(Arc::new(client));
                vec![]
            }
            Err(e) => {
                error!("Failed to configure API client: {}", e);
                vec![Diagnostic::error(
                    "Failed to configure API client",
                    e.to_string(),
                    None,
                )]
            }
        }
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Result<Vec<Diagnostic>> {
        debug!("ValidateResourceConfig called for {}", type_name);
        Ok(self.resource(type_name)?.validate(config))
    }

    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior_state: &DynamicValue,
        proposed_new_state: &DynamicValue,
    ) -> Result<PlanResponse> {
        debug!("PlanResourceChange called for {}", type_name);
        let resource = self.resource(type_name)?;
        let schema = resource.schema();

        // Destroy
        if proposed_new_state.is_null() {
            return Ok(PlanResponse {
                planned_state: DynamicValue::Null,
                requires_replace: vec![],
            });
        }

        let mut planned_state = schema.block.apply_defaults(proposed_new_state);

        let requires_replace = if prior_state.is_null() {
            planned_state.set("id", DynamicValue::Null);
            vec![]
        } else {
            let replace = schema.block.requires_replace(prior_state, &planned_state);
            let id = if replace.is_empty() {
                prior_state.get("id").cloned().unwrap_or_default()
            } else {
                DynamicValue::Null
            };
            planned_state.set("id", id);
            replace
        };

        Ok(PlanResponse {
            planned_state,
            requires_replace,
        })
    }

    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: &DynamicValue,
        planned_state: &DynamicValue,
    ) -> Result<StateResponse> {
        info!("ApplyResourceChange called for {}", type_name);
        let resource = self.resource(type_name)?;
        let client = self.get_client().await?;

        let result = match (prior_state.is_null(), planned_state.is_null()) {
            // Create
            (true, false) => resource.create(client.as_ref(), planned_state).await,
            // Delete
            (false, true) => resource
                .delete(client.as_ref(), prior_state)
                .await
                .map(|_| DynamicValue::Null),
            // Update
            (false, false) => {
                resource
                    .update(client.as_ref(), prior_state, planned_state)
                    .await
            }
            // No change
            (true, true) => Ok(DynamicValue::Null),
        };

        Ok(match result {
            Ok(new_state) => StateResponse::ok(new_state),
            Err(e) => {
                error!("ApplyResourceChange failed for {}: {}", type_name, e);
                // Null prior state means nothing was created
                StateResponse::failed("Failed to apply resource change", &e, prior_state.clone())
            }
        })
    }

    pub async fn read_resource(
        &self,
        type_name: &str,
        current_state: &DynamicValue,
    ) -> Result<StateResponse> {
        info!("ReadResource called for {}", type_name);
        let resource = self.resource(type_name)?;
        let client = self.get_client().await?;

        Ok(match resource.read(client.as_ref(), current_state).await {
            Ok(state) => StateResponse::ok(state),
            // Resource not found - return null state
            Err(e) if e.is_not_found() => {
                info!("{} no longer exists, removing from state: {}", type_name, e);
                StateResponse::ok(DynamicValue::Null)
            }
            Err(e) => StateResponse::failed("Failed to read resource", &e, current_state.clone()),
        })
    }

    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<StateResponse> {
        info!("ImportResourceState called for {} with ID {}", type_name, id);
        let resource = self.resource(type_name)?;
        let client = self.get_client().await?;

        Ok(match resource.import(client.as_ref(), id).await {
            Ok(state) => StateResponse::ok(state),
            Err(e) => StateResponse::failed("Failed to import resource", &e, DynamicValue::Null),
        })
    }

    pub async fn stop_provider(&self) {
        info!("StopProvider called");
        *self.client.write().await = None;
    }
}

/// Schema of the provider block itself
pub fn provider_schema() -> Schema {
    Schema {
        version: 0,
        block: Block::new(vec![
            Attribute::string("endpoint")
                .optional()
                .description("API endpoint alias or base URL, defaults to ovh-eu"),
            Attribute::string("application_key").optional().sensitive(),
            Attribute::string("application_secret").optional().sensitive(),
            Attribute::string("consumer_key").optional().sensitive(),
            Attribute::int("timeout").optional().description("Request timeout in seconds"),
        ]),
    }
}

/// Overlay the attributes set in the provider block on `client_config`
fn client_config(mut client_config: ClientConfig, config: &DynamicValue) -> ClientConfig {
    if let Some(v) = get_optional_string_attr(config, "endpoint") {
        client_config.endpoint = v;
    }
    if let Some(v) = get_optional_string_attr(config, "application_key") {
        client_config.application_key = v;
    }
    if let Some(v) = get_optional_string_attr(config, "application_secret") {
        client_config.application_secret = v;
    }
    if let Some(v) = get_optional_string_attr(config, "consumer_key") {
        client_config.consumer_key = v;
    }
    if let Some(v) = get_optional_int_attr(config, "timeout") {
        client_config.timeout_secs = v.max(1) as u64;
    }
    client_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::http_farm::TYPE_NAME;
    use crate::state::{get_string_attr, int_value, make_state, string_value};
    use crate::testing::RecordingClient;
    use serde_json::json;

    fn farm_config() -> DynamicValue {
        make_state(vec![
            ("service_name", string_value("loadbalancer-1")),
            ("zone", string_value("gra")),
            ("port", int_value(80)),
            ("probe", DynamicValue::List(vec![make_state(vec![("type", string_value("http"))])])),
        ])
    }

    fn provider() -> (IplbProvider, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient::new());
        (IplbProvider::with_client(client.clone()), client)
    }

    #[test]
    fn test_schema_lists_http_farm() {
        let (provider, _) = provider();
        let schema = provider.get_provider_schema();
        assert!(schema.resource_schemas.contains_key("iplb_http_farm"));
        assert_eq!(provider.resource_types(), vec!["iplb_http_farm"]);
    }

    #[test]
    fn test_unknown_type() {
        let (provider, _) = provider();
        let err = provider
            .validate_resource_config("iplb_tcp_farm", &farm_config())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(_)));
    }

    #[test]
    fn test_plan_create_applies_defaults() {
        let (provider, _) = provider();
        let plan = provider
            .plan_resource_change(TYPE_NAME, &DynamicValue::Null, &farm_config())
            .unwrap();

        assert!(plan.requires_replace.is_empty());
        assert!(plan.planned_state.get("id").is_none());
        let probe = &plan.planned_state.get("probe").and_then(|p| p.as_list()).unwrap()[0];
        assert_eq!(probe.get("interval"), Some(&int_value(30)));
    }

    #[test]
    fn test_plan_zone_change_requires_replace() {
        let (provider, _) = provider();
        let mut prior = farm_config();
        prior.set("id", string_value("17"));
        let mut proposed = farm_config();
        proposed.set("zone", string_value("rbx"));

        let plan = provider.plan_resource_change(TYPE_NAME, &prior, &proposed).unwrap();
        assert_eq!(plan.requires_replace, vec!["zone".to_string()]);
        assert!(plan.planned_state.get("id").is_none());
    }

    #[test]
    fn test_plan_update_keeps_id() {
        let (provider, _) = provider();
        let mut prior = farm_config();
        prior.set("id", string_value("17"));
        let mut proposed = farm_config();
        proposed.set("port", int_value(443));

        let plan = provider.plan_resource_change(TYPE_NAME, &prior, &proposed).unwrap();
        assert!(plan.requires_replace.is_empty());
        assert_eq!(get_string_attr(&plan.planned_state, "id"), "17");
    }

    #[tokio::test]
    async fn test_apply_dispatches_create_update_delete() {
        let (provider, client) = provider();
        client.respond(Ok(json!({"farmId": 99})));

        let created = provider
            .apply_resource_change(TYPE_NAME, &DynamicValue::Null, &farm_config())
            .await
            .unwrap();
        assert!(created.diagnostics.is_empty());
        assert_eq!(get_string_attr(&created.new_state, "id"), "99");

        let mut planned = created.new_state.clone();
        planned.set("port", int_value(443));
        let updated = provider
            .apply_resource_change(TYPE_NAME, &created.new_state, &planned)
            .await
            .unwrap();
        assert_eq!(updated.new_state.get("port"), Some(&int_value(443)));

        let deleted = provider
            .apply_resource_change(TYPE_NAME, &updated.new_state, &DynamicValue::Null)
            .await
            .unwrap();
        assert!(deleted.new_state.is_null());

        let methods: Vec<_> = client.calls().iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["POST", "PUT", "DELETE"]);
    }

    #[tokio::test]
    async fn test_apply_failure_becomes_diagnostic() {
        let (provider, client) = provider();
        client.respond(Err(Error::Api {
            status: 409,
            message: "Conflict".to_string(),
            class: None,
            query_id: None,
        }));

        let response = provider
            .apply_resource_change(TYPE_NAME, &DynamicValue::Null, &farm_config())
            .await
            .unwrap();
        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("calling POST"));
    }

    #[tokio::test]
    async fn test_failed_update_and_delete_keep_prior_state() {
        let (provider, client) = provider();
        let conflict = || Error::Api {
            status: 409,
            message: "Conflict".to_string(),
            class: None,
            query_id: None,
        };
        client.respond(Err(conflict()));
        client.respond(Err(conflict()));

        let mut prior = farm_config();
        prior.set("id", string_value("17"));
        let mut planned = prior.clone();
        planned.set("port", int_value(443));

        let updated = provider
            .apply_resource_change(TYPE_NAME, &prior, &planned)
            .await
            .unwrap();
        assert_eq!(updated.diagnostics.len(), 1);
        assert_eq!(updated.new_state, prior);

        let deleted = provider
            .apply_resource_change(TYPE_NAME, &prior, &DynamicValue::Null)
            .await
            .unwrap();
        assert_eq!(deleted.diagnostics.len(), 1);
        assert_eq!(get_string_attr(&deleted.new_state, "id"), "17");
    }

    #[tokio::test]
    async fn test_read_missing_farm_clears_state() {
        let (provider, client) = provider();
        client.respond(Err(Error::Api {
            status: 404,
            message: "not found".to_string(),
            class: None,
            query_id: None,
        }));

        let mut state = farm_config();
        state.set("id", string_value("17"));
        let response = provider.read_resource(TYPE_NAME, &state).await.unwrap();
        assert!(response.new_state.is_null());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_read_other_error_is_reported() {
        let (provider, client) = provider();
        client.respond(Err(Error::Api {
            status: 500,
            message: "boom".to_string(),
            class: None,
            query_id: None,
        }));

        let mut state = farm_config();
        state.set("id", string_value("17"));
        let response = provider.read_resource(TYPE_NAME, &state).await.unwrap();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.new_state, state);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_id_without_calling() {
        let (provider, client) = provider();
        let response = provider.import_resource_state(TYPE_NAME, "17").await.unwrap();
        assert_eq!(response.diagnostics.len(), 1);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let provider = IplbProvider::new();
        let err = provider
            .read_resource(TYPE_NAME, &farm_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[test]
    fn test_validate_provider_config_endpoint() {
        let provider = IplbProvider::new();
        let bad = make_state(vec![("endpoint", string_value("ovh-moon"))]);
        let diags = provider.validate_provider_config(&bad);
        assert_eq!(diags[0].attribute.as_deref(), Some("endpoint"));

        let good = make_state(vec![("endpoint", string_value("ovh-ca"))]);
        assert!(provider.validate_provider_config(&good).is_empty());
    }

    #[test]
    fn test_block_values_win_over_environment() {
        let env = ClientConfig::default().with_lookup(|key| match key {
            "OVH_ENDPOINT" => Some("ovh-ca".to_string()),
            "OVH_APPLICATION_KEY" => Some("env-ak".to_string()),
            "OVH_CONSUMER_KEY" => Some("env-ck".to_string()),
            _ => None,
        });
        let block = make_state(vec![
            ("endpoint", string_value("ovh-us")),
            ("application_key", string_value("block-ak")),
            ("timeout", int_value(30)),
        ]);

        let config = client_config(env, &block);
        assert_eq!(config.endpoint, "ovh-us");
        assert_eq!(config.application_key, "block-ak");
        // Unset in the block, so the environment value stays
        assert_eq!(config.consumer_key, "env-ck");
        assert_eq!(config.timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_configure_provider_from_block() {
        let provider = IplbProvider::new();
        let block = make_state(vec![
            ("endpoint", string_value("ovh-eu")),
            ("application_key", string_value("ak")),
            ("application_secret", string_value("as")),
            ("consumer_key", string_value("ck")),
        ]);
        assert!(provider.configure_provider(&block).await.is_empty());
        assert!(provider.get_client().await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_with_credentials() {
        let provider = IplbProvider::new();
        let config = ClientConfig {
            application_key: "ak".to_string(),
            application_secret: "as".to_string(),
            consumer_key: "ck".to_string(),
            ..Default::default()
        };
        assert!(provider.configure_with(config).await.is_empty());
        assert!(provider.get_client().await.is_ok());

        provider.stop_provider().await;
        assert!(provider.get_client().await.is_err());
    }
}
