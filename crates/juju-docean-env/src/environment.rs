//! Orchestration environment trait definition

use crate::error::Result;
use crate::status::EnvironmentStatus;
use async_trait::async_trait;

/// Orchestration environment capability
///
/// Each call is an external process invocation. Any failure surfaces as a
/// single opaque [`EnvError`](crate::EnvError) carrying the captured output.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Environment name
    fn name(&self) -> &str;

    /// Current machine listing
    async fn status(&self) -> Result<EnvironmentStatus>;

    /// Register a running host (by address) as a managed machine
    async fn add_machine(&self, address: &str, ssh_key: Option<&str>) -> Result<()>;

    /// Forcefully remove machines from the environment
    async fn terminate_machines(&self, machine_ids: &[String]) -> Result<()>;

    /// Whether the environment's state server is up and reachable
    async fn is_running(&self) -> Result<bool>;

    async fn destroy_environment(&self) -> Result<()>;

    /// Drop the local client cache for this environment without contacting it
    async fn destroy_environment_jenv(&self) -> Result<()>;

    /// Bootstrap the environment with `host` as its state server
    async fn bootstrap(&self, host: &str) -> Result<()>;
}
