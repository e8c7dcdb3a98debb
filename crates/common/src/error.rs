//! Error types for the IPLB provider

use thiserror::Error;

/// Result type alias using the IPLB Error
pub type Result<T> = std::result::Result<T, Error>;

/// IPLB error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the remote API
    #[error("Error {status}: {message:?}{}", query_suffix(.query_id))]
    Api {
        status: u16,
        message: String,
        class: Option<String>,
        query_id: Option<String>,
    },

    /// A failed remote call, annotated with the endpoint that failed
    #[error("calling {method} {endpoint}:\n\t {source}")]
    Call {
        method: String,
        endpoint: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid resource id: {0}")]
    InvalidId(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Provider is not configured")]
    NotConfigured,

    #[error("Internal error: {0}")]
    Internal(String),
}

fn query_suffix(query_id: &Option<String>) -> String {
    query_id
        .as_deref()
        .map(|q| format!(" (X-OVH-Query-Id: {})", q))
        .unwrap_or_default()
}

impl Error {
    /// Wrap an error with the method and endpoint of the call that produced it
    pub fn calling(method: &str, endpoint: &str, source: Error) -> Self {
        Error::Call {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            source: Box::new(source),
        }
    }

    /// HTTP status of the underlying API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Call { source, .. } => source.status(),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the remote side reported the object as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> Error {
        Error::Api {
            status: 404,
            message: "The requested object (farmId = 42) does not exist".to_string(),
            class: Some("Client::NotFound".to_string()),
            query_id: Some("EU.ext-1.abc".to_string()),
        }
    }

    #[test]
    fn test_call_wraps_endpoint() {
        let err = Error::calling("GET", "/ipLoadbalancing/lb-1/http/farm/42", not_found());
        let msg = err.to_string();
        assert!(msg.starts_with("calling GET /ipLoadbalancing/lb-1/http/farm/42:"));
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn test_not_found_seen_through_wrapper() {
        let err = Error::calling("GET", "/x", not_found());
        assert!(err.is_not_found());
        assert!(!Error::NotConfigured.is_not_found());
    }

    #[test]
    fn test_api_error_mentions_query_id() {
        assert!(not_found().to_string().contains("X-OVH-Query-Id: EU.ext-1.abc"));
    }
}
