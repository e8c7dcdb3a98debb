//! HTTP Farm Commands

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use iplb_provider::resources::http_farm::TYPE_NAME;
use iplb_provider::state::{
    bool_value, get_list_attr, get_optional_int_attr, get_string_attr, int_value, make_state,
    string_value, DynamicValue,
};
use iplb_provider::{IplbProvider, StateResponse};

use crate::output::{print_diagnostics, print_item, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum FarmCommands {
    /// Create a new HTTP farm
    Create {
        /// IP load balancer service name
        service_name: String,

        #[command(flatten)]
        args: FarmArgs,
    },

    /// Get HTTP farm details
    Get {
        /// IP load balancer service name
        service_name: String,

        /// Farm ID
        id: String,
    },

    /// Update an HTTP farm in place
    Update {
        /// IP load balancer service name
        service_name: String,

        /// Farm ID
        id: String,

        #[command(flatten)]
        args: FarmArgs,
    },

    /// Delete an HTTP farm
    Delete {
        /// IP load balancer service name
        service_name: String,

        /// Farm ID
        id: String,
    },
}

/// Farm attributes; only the flags given are set
#[derive(Args, Debug, Default)]
pub struct FarmArgs {
    /// Zone (cannot be changed after creation)
    #[arg(long)]
    zone: Option<String>,

    /// Balance algorithm (first, leastconn, roundrobin, source)
    #[arg(long)]
    balance: Option<String>,

    /// Stickiness mode (sourceIp)
    #[arg(long)]
    stickiness: Option<String>,

    /// Backend port
    #[arg(long)]
    port: Option<i64>,

    /// vRack network ID
    #[arg(long)]
    vrack_network_id: Option<i64>,

    /// Display name
    #[arg(long)]
    display_name: Option<String>,

    /// Probe type (http, internal, mysql, oko, pgsql, smtp, tcp)
    #[arg(long)]
    probe_type: Option<String>,

    /// Probe match mode (contains, default, internal, matches, status)
    #[arg(long)]
    probe_match: Option<String>,

    /// Probe port
    #[arg(long)]
    probe_port: Option<i64>,

    /// Probe interval in seconds (30-3600)
    #[arg(long)]
    probe_interval: Option<i64>,

    /// Negate the probe result
    #[arg(long)]
    probe_negate: Option<bool>,

    /// Probe match pattern
    #[arg(long)]
    probe_pattern: Option<String>,

    /// Force SSL for the probe
    #[arg(long)]
    probe_force_ssl: Option<bool>,

    /// Probe URL
    #[arg(long)]
    probe_url: Option<String>,

    /// Probe HTTP method (GET, HEAD, OPTIONS, internal)
    #[arg(long)]
    probe_method: Option<String>,
}

impl FarmArgs {
    fn has_probe(&self) -> bool {
        self.probe_type.is_some()
            || self.probe_match.is_some()
            || self.probe_port.is_some()
            || self.probe_interval.is_some()
            || self.probe_negate.is_some()
            || self.probe_pattern.is_some()
            || self.probe_force_ssl.is_some()
            || self.probe_url.is_some()
            || self.probe_method.is_some()
    }

    /// Overlay the given flags on a configuration
    pub fn apply_to(&self, config: &mut DynamicValue) {
        set_string(config, "zone", &self.zone);
        set_string(config, "balance", &self.balance);
        set_string(config, "stickiness", &self.stickiness);
        set_int(config, "port", self.port);
        set_int(config, "vrack_network_id", self.vrack_network_id);
        set_string(config, "display_name", &self.display_name);

        if self.has_probe() {
            let mut probe = get_list_attr(config, "probe")
                .first()
                .cloned()
                .unwrap_or_else(|| make_state(vec![]));
            set_string(&mut probe, "type", &self.probe_type);
            set_string(&mut probe, "match", &self.probe_match);
            set_int(&mut probe, "port", self.probe_port);
            set_int(&mut probe, "interval", self.probe_interval);
            set_bool(&mut probe, "negate", self.probe_negate);
            set_string(&mut probe, "pattern", &self.probe_pattern);
            set_bool(&mut probe, "force_ssl", self.probe_force_ssl);
            set_string(&mut probe, "url", &self.probe_url);
            set_string(&mut probe, "method", &self.probe_method);
            config.set("probe", DynamicValue::List(vec![probe]));
        }
    }
}

fn set_string(config: &mut DynamicValue, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        config.set(key, string_value(v.as_str()));
    }
}

fn set_int(config: &mut DynamicValue, key: &str, value: Option<i64>) {
    if let Some(v) = value {
        config.set(key, int_value(v));
    }
}

fn set_bool(config: &mut DynamicValue, key: &str, value: Option<bool>) {
    if let Some(v) = value {
        config.set(key, bool_value(v));
    }
}

/// Farm display wrapper for serialization
#[derive(Serialize)]
pub struct FarmDisplay {
    pub id: String,
    pub service_name: String,
    pub zone: String,
    pub display_name: String,
    pub balance: String,
    pub port: Option<i64>,
    pub stickiness: String,
    pub vrack_network_id: Option<i64>,
    pub probe: String,
}

impl From<&DynamicValue> for FarmDisplay {
    fn from(state: &DynamicValue) -> Self {
        let probe = get_list_attr(state, "probe")
            .first()
            .map(|p| {
                let interval = get_optional_int_attr(p, "interval")
                    .map(|i| format!(" every {}s", i))
                    .unwrap_or_default();
                format!("{}{}", get_string_attr(p, "type"), interval)
            })
            .unwrap_or_default();

        Self {
            id: get_string_attr(state, "id"),
            service_name: get_string_attr(state, "service_name"),
            zone: get_string_attr(state, "zone"),
            display_name: get_string_attr(state, "display_name"),
            balance: get_string_attr(state, "balance"),
            port: get_optional_int_attr(state, "port"),
            stickiness: get_string_attr(state, "stickiness"),
            vrack_network_id: get_optional_int_attr(state, "vrack_network_id"),
            probe,
        }
    }
}

impl TableDisplay for FarmDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Service", "Zone", "Name", "Balance", "Port", "Stickiness", "vRack", "Probe"]
    }

    fn row(&self) -> Vec<String> {
        let opt = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        vec![
            self.id.clone(),
            self.service_name.clone(),
            self.zone.clone(),
            self.display_name.clone(),
            self.balance.clone(),
            opt(self.port),
            self.stickiness.clone(),
            opt(self.vrack_network_id),
            self.probe.clone(),
        ]
    }
}

/// Fail with the diagnostics of a response, or hand back its state
fn into_state(response: StateResponse) -> Result<DynamicValue> {
    if print_diagnostics(&response.diagnostics) {
        bail!("operation failed");
    }
    Ok(response.new_state)
}

async fn fetch(provider: &IplbProvider, service_name: &str, id: &str) -> Result<DynamicValue> {
    let response = provider
        .import_resource_state(TYPE_NAME, &format!("{}/{}", service_name, id))
        .await?;
    into_state(response)
}

fn validate(provider: &IplbProvider, config: &DynamicValue) -> Result<()> {
    let diagnostics = provider.validate_resource_config(TYPE_NAME, config)?;
    if print_diagnostics(&diagnostics) {
        bail!("invalid farm configuration");
    }
    Ok(())
}

pub async fn execute(cmd: FarmCommands, provider: &IplbProvider, format: OutputFormat) -> Result<()> {
    match cmd {
        FarmCommands::Create { service_name, args } => {
            let mut config = make_state(vec![("service_name", string_value(service_name.as_str()))]);
            args.apply_to(&mut config);
            validate(provider, &config)?;

            let plan = provider.plan_resource_change(TYPE_NAME, &DynamicValue::Null, &config)?;
            let response = provider
                .apply_resource_change(TYPE_NAME, &DynamicValue::Null, &plan.planned_state)
                .await?;
            let state = into_state(response)?;

            let display = FarmDisplay::from(&state);
            print_success(&format!("HTTP farm {} created on {}", display.id, service_name));
            print_item(&display, format);
        }

        FarmCommands::Get { service_name, id } => {
            let state = fetch(provider, &service_name, &id).await?;
            print_item(&FarmDisplay::from(&state), format);
        }

        FarmCommands::Update { service_name, id, args } => {
            let prior = fetch(provider, &service_name, &id).await?;
            let mut config = prior.clone();
            config.set("id", DynamicValue::Null);
            args.apply_to(&mut config);
            validate(provider, &config)?;

            let plan = provider.plan_resource_change(TYPE_NAME, &prior, &config)?;
            if !plan.requires_replace.is_empty() {
                bail!(
                    "cannot update {} in place, delete and recreate the farm",
                    plan.requires_replace.join(", ")
                );
            }
            let response = provider
                .apply_resource_change(TYPE_NAME, &prior, &plan.planned_state)
                .await?;
            let state = into_state(response)?;

            print_success(&format!("HTTP farm {} updated", id));
            print_item(&FarmDisplay::from(&state), format);
        }

        FarmCommands::Delete { service_name, id } => {
            let prior = make_state(vec![
                ("service_name", string_value(service_name.as_str())),
                ("id", string_value(id.as_str())),
            ]);
            let response = provider
                .apply_resource_change(TYPE_NAME, &prior, &DynamicValue::Null)
                .await?;
            into_state(response)?;
            print_success(&format!("HTTP farm {} deleted", id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_overlay_existing_probe() {
        let mut config = make_state(vec![
            ("service_name", string_value("lb")),
            ("probe", DynamicValue::List(vec![make_state(vec![
                ("type", string_value("http")),
                ("url", string_value("/health")),
            ])])),
        ]);
        let args = FarmArgs {
            balance: Some("source".to_string()),
            probe_interval: Some(120),
            ..Default::default()
        };
        args.apply_to(&mut config);

        assert_eq!(get_string_attr(&config, "balance"), "source");
        let probe = &get_list_attr(&config, "probe")[0];
        assert_eq!(get_string_attr(probe, "url"), "/health");
        assert_eq!(get_optional_int_attr(probe, "interval"), Some(120));
    }

    #[test]
    fn test_no_probe_flags_leave_probe_absent() {
        let mut config = make_state(vec![]);
        FarmArgs {
            port: Some(80),
            ..Default::default()
        }
        .apply_to(&mut config);
        assert!(config.get("probe").is_none());
        assert_eq!(get_optional_int_attr(&config, "port"), Some(80));
    }

    #[test]
    fn test_display_summarizes_probe() {
        let state = make_state(vec![
            ("id", string_value("12")),
            ("probe", DynamicValue::List(vec![make_state(vec![
                ("type", string_value("tcp")),
                ("interval", int_value(60)),
            ])])),
        ]);
        let display = FarmDisplay::from(&state);
        assert_eq!(display.probe, "tcp every 60s");
        assert_eq!(display.row().len(), FarmDisplay::headers().len());
    }
}
