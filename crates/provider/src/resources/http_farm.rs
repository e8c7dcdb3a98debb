//! HTTP farm resource handler
//!
//! Maps the `iplb_http_farm` block onto
//! `/ipLoadbalancing/{service}/http/farm[/{id}]`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use iplb_common::types::{
    http_farm_collection_endpoint, http_farm_endpoint, Balance, BackendProbe, HttpFarm,
    ProbeMatch, ProbeMethod, ProbeType, Stickiness, PROBE_INTERVAL_MAX, PROBE_INTERVAL_MIN,
};
use iplb_common::{ApiClient, Error, Result};

use super::Resource;
use crate::diagnostics::Diagnostic;
use crate::schema::{Attribute, Block, Schema, Validator};
use crate::state::{
    get_list_attr, get_optional_bool_attr, get_optional_int_attr, get_optional_string_attr,
    get_string_attr, int_value, make_state, optional_bool_value, optional_int_value,
    optional_string_value, string_value, DynamicValue,
};

pub const TYPE_NAME: &str = "iplb_http_farm";

pub struct HttpFarmResource;

pub fn http_farm_schema() -> Schema {
    let probe = Block::new(vec![
        Attribute::string("match")
            .optional()
            .validate_with(Validator::StringEnum(ProbeMatch::VALUES)),
        Attribute::int("port").optional(),
        Attribute::int("interval")
            .optional()
            .default_value(int_value(PROBE_INTERVAL_MIN))
            .description("Probe interval in seconds")
            .validate_with(Validator::IntRange {
                min: PROBE_INTERVAL_MIN,
                max: PROBE_INTERVAL_MAX,
                message: "Probe interval not in 30..3600 range",
            }),
        Attribute::bool("negate").optional(),
        Attribute::string("pattern").optional(),
        Attribute::bool("force_ssl").optional(),
        Attribute::string("url").optional(),
        Attribute::string("method")
            .optional()
            .validate_with(Validator::StringEnum(ProbeMethod::VALUES)),
        Attribute::string("type")
            .required()
            .validate_with(Validator::StringEnum(ProbeType::VALUES)),
    ]);

    Schema {
        version: 0,
        block: Block {
            description: "HTTP farm of an IP load balancer".to_string(),
            attributes: vec![
                Attribute::string("id").computed().description("Farm id assigned by the service"),
                Attribute::string("service_name").required().force_new(),
                Attribute::string("zone").required().force_new(),
                Attribute::string("balance")
                    .optional()
                    .validate_with(Validator::StringEnum(Balance::VALUES)),
                Attribute::string("display_name").optional(),
                Attribute::int("port").optional(),
                Attribute::string("stickiness")
                    .optional()
                    .validate_with(Validator::StringEnum(Stickiness::VALUES)),
                Attribute::int("vrack_network_id").optional(),
                Attribute::set("probe", probe)
                    .optional()
                    .description("Backend health check; only the first element is used"),
            ],
        },
    }
}

#[async_trait]
impl Resource for HttpFarmResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        http_farm_schema()
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema().block.validate(config);
        if get_list_attr(config, "probe").len() > 1 {
            diagnostics.push(Diagnostic::warning(
                "Multiple probes",
                "Only the first probe block is sent to the load balancer",
            ));
        }
        diagnostics
    }

    async fn create(&self, client: &dyn ApiClient, config: &DynamicValue) -> Result<DynamicValue> {
        let service = service_name(config)?;
        let farm = farm_from_config(config, true)?;
        let endpoint = http_farm_collection_endpoint(&service);
        info!("Creating HTTP farm on {}", service);

        let created = client
            .post(&endpoint, &serde_json::to_value(&farm)?)
            .await
            .map_err(|e| Error::calling("POST", &endpoint, e))?;
        let farm_id = created.get("farmId").and_then(Value::as_i64).ok_or_else(|| {
            Error::calling("POST", &endpoint, Error::Internal("no farmId in response".to_string()))
        })?;
        debug!("HTTP farm {} created", farm_id);

        let mut state = config.clone();
        state.set("id", string_value(farm_id.to_string()));
        Ok(state)
    }

    async fn read(&self, client: &dyn ApiClient, state: &DynamicValue) -> Result<DynamicValue> {
        let service = service_name(state)?;
        let id = farm_id(state)?;
        let endpoint = http_farm_endpoint(&service, &id);

        let remote = client
            .get(&endpoint)
            .await
            .map_err(|e| Error::calling("GET", &endpoint, e))?;
        let display_name = remote.get("displayName").and_then(Value::as_str);

        let mut state = state.clone();
        state.set("display_name", optional_string_value(display_name));
        Ok(state)
    }

    async fn update(
        &self,
        client: &dyn ApiClient,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let service = service_name(state)?;
        let id = farm_id(state)?;
        let endpoint = http_farm_endpoint(&service, &id);
        let farm = farm_from_config(config, false)?;
        info!("Updating HTTP farm {} on {}", id, service);

        client
            .put(&endpoint, &serde_json::to_value(&farm)?)
            .await
            .map_err(|e| Error::calling("PUT", &endpoint, e))?;

        let mut new_state = config.clone();
        new_state.set("id", string_value(id));
        Ok(new_state)
    }

    async fn delete(&self, client: &dyn ApiClient, state: &DynamicValue) -> Result<()> {
        let service = service_name(state)?;
        let id = farm_id(state)?;
        let endpoint = http_farm_endpoint(&service, &id);
        info!("Deleting HTTP farm {} on {}", id, service);

        client
            .delete(&endpoint)
            .await
            .map_err(|e| Error::calling("DELETE", &endpoint, e))?;
        Ok(())
    }

    async fn import(&self, client: &dyn ApiClient, id: &str) -> Result<DynamicValue> {
        let (service, farm_id) = parse_import_id(id)?;
        let endpoint = http_farm_endpoint(service, farm_id);

        let remote = client
            .get(&endpoint)
            .await
            .map_err(|e| Error::calling("GET", &endpoint, e))?;

        Ok(farm_to_state(service, farm_id, &DynamicValue::from(remote)))
    }
}

fn service_name(value: &DynamicValue) -> Result<String> {
    get_optional_string_attr(value, "service_name")
        .ok_or_else(|| Error::Validation("service_name is required".to_string()))
}

fn farm_id(state: &DynamicValue) -> Result<String> {
    get_optional_string_attr(state, "id")
        .ok_or_else(|| Error::InvalidId("resource has no id".to_string()))
}

/// Split an import id of the form `<service_name>/<farm_id>`
pub fn parse_import_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once('/') {
        Some((service, farm)) if !service.is_empty() && farm.parse::<i64>().is_ok() => {
            Ok((service, farm))
        }
        _ => Err(Error::InvalidId(format!(
            "'{}' should be formatted as service_name/farm_id",
            id
        ))),
    }
}

fn parse_enum<T>(value: &DynamicValue, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = Error>,
{
    get_optional_string_attr(value, key)
        .map(|s| s.parse())
        .transpose()
}

fn probe_from_config(config: &DynamicValue) -> Result<Option<BackendProbe>> {
    let probe = match get_list_attr(config, "probe").first() {
        Some(p) => p,
        None => return Ok(None),
    };

    Ok(Some(BackendProbe {
        match_kind: parse_enum(probe, "match")?,
        port: get_optional_int_attr(probe, "port"),
        interval: Some(get_optional_int_attr(probe, "interval").unwrap_or(PROBE_INTERVAL_MIN)),
        negate: get_optional_bool_attr(probe, "negate"),
        pattern: get_optional_string_attr(probe, "pattern"),
        force_ssl: get_optional_bool_attr(probe, "force_ssl"),
        url: get_optional_string_attr(probe, "url"),
        method: parse_enum(probe, "method")?,
        probe_type: parse_enum(probe, "type")?,
    }))
}

/// Build the request payload; zone is only sent on create
fn farm_from_config(config: &DynamicValue, with_zone: bool) -> Result<HttpFarm> {
    Ok(HttpFarm {
        farm_id: None,
        zone: if with_zone {
            Some(get_string_attr(config, "zone"))
        } else {
            None
        },
        vrack_network_id: get_optional_int_attr(config, "vrack_network_id"),
        port: get_optional_int_attr(config, "port"),
        stickiness: parse_enum(config, "stickiness")?,
        balance: parse_enum(config, "balance")?,
        probe: probe_from_config(config)?,
        display_name: get_optional_string_attr(config, "display_name"),
    })
}

/// Map an API answer onto state. Enum fields are kept as returned, values
/// the validators do not list included.
fn probe_to_state(probe: &DynamicValue) -> DynamicValue {
    make_state(vec![
        ("match", optional_string_value(get_optional_string_attr(probe, "match"))),
        ("port", optional_int_value(get_optional_int_attr(probe, "port"))),
        ("interval", optional_int_value(get_optional_int_attr(probe, "interval"))),
        ("negate", optional_bool_value(get_optional_bool_attr(probe, "negate"))),
        ("pattern", optional_string_value(get_optional_string_attr(probe, "pattern"))),
        ("force_ssl", optional_bool_value(get_optional_bool_attr(probe, "forceSsl"))),
        ("url", optional_string_value(get_optional_string_attr(probe, "url"))),
        ("method", optional_string_value(get_optional_string_attr(probe, "method"))),
        ("type", optional_string_value(get_optional_string_attr(probe, "type"))),
    ])
}

fn farm_to_state(service: &str, id: &str, farm: &DynamicValue) -> DynamicValue {
    let probe = match farm.get("probe") {
        Some(p) if p.as_map().is_some() => DynamicValue::List(vec![probe_to_state(p)]),
        _ => DynamicValue::Null,
    };
    let string = |key: &str| optional_string_value(get_optional_string_attr(farm, key));

    make_state(vec![
        ("id", string_value(id)),
        ("service_name", string_value(service)),
        ("zone", string("zone")),
        ("balance", string("balance")),
        ("display_name", string("displayName")),
        ("port", optional_int_value(get_optional_int_attr(farm, "port"))),
        ("stickiness", string("stickiness")),
        ("vrack_network_id", optional_int_value(get_optional_int_attr(farm, "vrackNetworkId"))),
        ("probe", probe),
    ])
}
