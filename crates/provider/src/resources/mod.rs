//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod http_farm;

use async_trait::async_trait;
use iplb_common::{ApiClient, Result};

use crate::diagnostics::Diagnostic;
use crate::schema::Schema;
use crate::state::DynamicValue;

/// Trait for resource operations
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Check a configuration before planning
    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        self.schema().block.validate(config)
    }

    /// Create a new resource
    async fn create(&self, client: &dyn ApiClient, config: &DynamicValue) -> Result<DynamicValue>;

    /// Read an existing resource
    async fn read(&self, client: &dyn ApiClient, state: &DynamicValue) -> Result<DynamicValue>;

    /// Update an existing resource
    async fn update(
        &self,
        client: &dyn ApiClient,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue>;

    /// Delete a resource
    async fn delete(&self, client: &dyn ApiClient, state: &DynamicValue) -> Result<()>;

    /// Build a full state for an existing remote object
    async fn import(&self, client: &dyn ApiClient, id: &str) -> Result<DynamicValue>;
}
