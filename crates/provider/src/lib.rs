//! IPLB Terraform-style Provider
//!
//! This crate implements the `iplb_http_farm` resource and the provider
//! host that validates, plans and applies it against the IP Load
//! Balancing API.

pub mod diagnostics;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod state;

#[cfg(test)]
mod testing;

pub use diagnostics::{Diagnostic, Severity};
pub use provider::{IplbProvider, PlanResponse, ProviderSchema, StateResponse};
pub use resources::{http_farm::HttpFarmResource, Resource};
pub use state::DynamicValue;
