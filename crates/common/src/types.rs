//! Core types for the IP Load Balancing HTTP farm API
//!
//! These mirror the JSON payloads exchanged with
//! `/ipLoadbalancing/{service}/http/farm`. Enum spellings match the
//! wire format exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted wire value, in declaration order
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        "{} must be one of {:?}, got {:?}",
                        stringify!($name),
                        Self::VALUES,
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// Load balancing algorithm of a farm
    Balance {
        First => "first",
        LeastConn => "leastconn",
        RoundRobin => "roundrobin",
        Source => "source",
    }
}

wire_enum! {
    /// Session stickiness mode
    Stickiness {
        SourceIp => "sourceIp",
    }
}

wire_enum! {
    /// How a probe matches the backend answer
    ProbeMatch {
        Contains => "contains",
        Default => "default",
        Internal => "internal",
        Matches => "matches",
        Status => "status",
    }
}

wire_enum! {
    /// HTTP method used by http probes
    ProbeMethod {
        Get => "GET",
        Head => "HEAD",
        Options => "OPTIONS",
        Internal => "internal",
    }
}

wire_enum! {
    /// Probe protocol
    ProbeType {
        Http => "http",
        Internal => "internal",
        Mysql => "mysql",
        Oko => "oko",
        Pgsql => "pgsql",
        Smtp => "smtp",
        Tcp => "tcp",
    }
}

/// Lower and upper bound of a probe interval, in seconds
pub const PROBE_INTERVAL_MIN: i64 = 30;
pub const PROBE_INTERVAL_MAX: i64 = 3600;

/// Health check attached to a farm
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendProbe {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<ProbeMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ProbeMethod>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub probe_type: Option<ProbeType>,
}

/// HTTP farm (backend pool) of an IP load balancer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFarm {
    /// Assigned by the remote service, never sent on create or update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrack_network_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<Stickiness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<BackendProbe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Collection endpoint for the HTTP farms of a service
pub fn http_farm_collection_endpoint(service: &str) -> String {
    format!("/ipLoadbalancing/{}/http/farm", service)
}

/// Endpoint of a single HTTP farm
pub fn http_farm_endpoint(service: &str, farm_id: &str) -> String {
    format!("/ipLoadbalancing/{}/http/farm/{}", service, farm_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_spelling() {
        assert_eq!(Stickiness::SourceIp.as_str(), "sourceIp");
        assert_eq!(ProbeMethod::Get.to_string(), "GET");
        assert_eq!("leastconn".parse::<Balance>().unwrap(), Balance::LeastConn);
        assert!("LEASTCONN".parse::<Balance>().is_err());
        assert_eq!(ProbeType::VALUES.len(), 7);
    }

    #[test]
    fn test_farm_serializes_camel_case_and_skips_absent() {
        let farm = HttpFarm {
            zone: Some("gra".to_string()),
            vrack_network_id: Some(7),
            balance: Some(Balance::RoundRobin),
            probe: Some(BackendProbe {
                force_ssl: Some(true),
                probe_type: Some(ProbeType::Http),
                match_kind: Some(ProbeMatch::Status),
                ..Default::default()
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&farm).unwrap();
        assert_eq!(
            value,
            json!({
                "zone": "gra",
                "vrackNetworkId": 7,
                "balance": "roundrobin",
                "probe": { "forceSsl": true, "type": "http", "match": "status" }
            })
        );
    }

    #[test]
    fn test_farm_deserializes_server_answer() {
        let farm: HttpFarm = serde_json::from_value(json!({
            "farmId": 1234,
            "zone": "rbx",
            "port": 80,
            "displayName": null,
            "stickiness": "sourceIp",
            "probe": null
        }))
        .unwrap();

        assert_eq!(farm.farm_id, Some(1234));
        assert_eq!(farm.stickiness, Some(Stickiness::SourceIp));
        assert!(farm.display_name.is_none());
        assert!(farm.probe.is_none());
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(http_farm_collection_endpoint("lb-1"), "/ipLoadbalancing/lb-1/http/farm");
        assert_eq!(http_farm_endpoint("lb-1", "42"), "/ipLoadbalancing/lb-1/http/farm/42");
    }
}
