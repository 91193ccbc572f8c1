pub mod environments;
pub mod error;

pub use environments::{EnvironmentConf, EnvironmentsFile};
pub use error::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default series for new machines
pub const DEFAULT_SERIES: &str = "precise";

/// Default worker count for concurrent machine operations
pub const DEFAULT_WORKERS: usize = 8;

/// Provider API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub api_key: String,
}

impl Credentials {
    /// Build credentials from optional values, rejecting missing or blank ones
    pub fn from_parts(client_id: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client_id = client_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingCredentials("DO_CLIENT_ID"))?;
        let api_key = api_key
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingCredentials("DO_API_KEY"))?;
        Ok(Self { client_id, api_key })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Bounded polling policy: total deadline plus a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitConfig {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Instance boot: active status, address, and ssh
    pub const fn provisioning() -> Self {
        Self::new(Duration::from_secs(360), Duration::from_secs(8))
    }

    /// New machine showing up in the environment status
    pub const fn registration() -> Self {
        Self::new(Duration::from_secs(120), Duration::from_secs(5))
    }
}

/// Runtime configuration, constructed once at startup and shared by reference
#[derive(Debug, Clone)]
pub struct Config {
    /// Juju environment name
    pub env_name: String,
    /// Juju client home (holds environments.yaml and the .jenv cache)
    pub juju_home: PathBuf,
    /// Ubuntu series for new machines
    pub series: String,
    /// Constraint string, e.g. "mem=2G region=nyc3"
    pub constraints: String,
    pub credentials: Credentials,
    pub upload_tools: bool,
    pub verbose: bool,
    /// Maximum concurrently running machine operations
    pub workers: usize,
    pub provisioning_wait: WaitConfig,
    pub registration_wait: WaitConfig,
    /// Wait for sshd on new instances before handing them to juju
    pub wait_for_ssh: bool,
    /// Pause between terminating machines and destroying the environment
    pub settle_delay: Duration,
}

impl Config {
    pub fn new(
        env_name: impl Into<String>,
        juju_home: impl Into<PathBuf>,
        credentials: Credentials,
    ) -> Self {
        Self {
            env_name: env_name.into(),
            juju_home: juju_home.into(),
            series: DEFAULT_SERIES.to_string(),
            constraints: String::new(),
            credentials,
            upload_tools: false,
            verbose: false,
            workers: DEFAULT_WORKERS,
            provisioning_wait: WaitConfig::provisioning(),
            registration_wait: WaitConfig::registration(),
            wait_for_ssh: true,
            settle_delay: Duration::from_secs(10),
        }
    }

    /// Reject configurations that cannot drive any command
    pub fn validate(&self) -> Result<()> {
        if self.env_name.trim().is_empty() {
            return Err(ConfigError::MissingEnvironmentName);
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidSetting(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `<juju_home>/environments.yaml`
    pub fn env_conf_path(&self) -> PathBuf {
        self.juju_home.join("environments.yaml")
    }

    /// `<juju_home>/environments/<env>.jenv`
    pub fn jenv_path(&self) -> PathBuf {
        jenv_path(&self.juju_home, &self.env_name)
    }

    /// Prefix shared by every instance of this environment
    pub fn instance_prefix(&self) -> String {
        format!("{}-", self.env_name)
    }
}

/// `<juju_home>/environments/<env>.jenv`
pub fn jenv_path(juju_home: &Path, env_name: &str) -> PathBuf {
    juju_home
        .join("environments")
        .join(format!("{}.jenv", env_name))
}

/// Default juju home: `~/.juju`
pub fn default_juju_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".juju"))
        .ok_or(ConfigError::HomeDirNotFound)
}
