//! Cloud provider trait definition

use crate::error::Result;
use crate::model::{Image, Instance, InstanceSpec, Region, SshKey};
use async_trait::async_trait;

/// Compute provider capability
///
/// Every call either succeeds or fails with a [`CloudError`](crate::CloudError);
/// a non-success API response is a hard failure for that call and is never
/// retried by the implementation.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "digitalocean")
    fn name(&self) -> &str;

    /// All instances visible to the account
    async fn list_instances(&self) -> Result<Vec<Instance>>;

    /// Fresh snapshot of a single instance
    async fn get_instance(&self, id: u64) -> Result<Instance>;

    /// Request a new instance.
    ///
    /// Creation is asynchronous: the returned snapshot normally has no
    /// address and is not yet active.
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<Instance>;

    /// Destroy an instance, returning the provider event id if one is reported
    async fn destroy_instance(&self, id: u64) -> Result<Option<u64>>;

    async fn list_images(&self) -> Result<Vec<Image>>;

    async fn list_regions(&self) -> Result<Vec<Region>>;

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>>;
}
