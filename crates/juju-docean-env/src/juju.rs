//! juju CLI wrapper
//!
//! Wraps the juju 1.x client for a manual-provider environment.

use crate::environment::Environment;
use crate::error::{EnvError, Result};
use crate::probe::port_open;
use crate::status::EnvironmentStatus;
use async_trait::async_trait;
use juju_docean_config::{EnvironmentConf, EnvironmentsFile, jenv_path};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;

/// API port of a juju 1.x state server
pub const STATE_SERVER_PORT: u16 = 17070;

const STATE_SERVER_PROBE_TIMEOUT: Duration = Duration::from_millis(1200);

/// juju CLI wrapper bound to one environment
pub struct JujuCli {
    env_name: String,
    juju_home: PathBuf,
    program: PathBuf,
    upload_series: Option<Vec<String>>,
}

impl JujuCli {
    pub fn new(env_name: impl Into<String>, juju_home: impl Into<PathBuf>) -> Self {
        Self {
            env_name: env_name.into(),
            juju_home: juju_home.into(),
            program: PathBuf::from("juju"),
            upload_series: None,
        }
    }

    /// Use a different juju executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Bootstrap with `--upload-tools` for the given series
    pub fn with_upload_tools(mut self, series: Vec<String>) -> Self {
        self.upload_series = Some(series);
        self
    }

    fn jenv_path(&self) -> PathBuf {
        jenv_path(&self.juju_home, &self.env_name)
    }

    /// Run a juju command and return stdout
    async fn run(&self, args: &[String], juju_home: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.env("JUJU_ENV", &self.env_name);
        match juju_home {
            Some(home) => {
                cmd.env("JUJU_HOME", home);
                cmd.env("JUJU_LOGGING", "<root>=DEBUG");
            }
            None => {
                cmd.env("JUJU_HOME", &self.juju_home);
            }
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // an abandoned wait must not leave juju running
        cmd.kill_on_drop(true);

        let command = format!("juju {}", args.join(" "));
        tracing::debug!("Running juju command: {}", command);

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EnvError::JujuNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let transcript = format!("{}{}", stdout, stderr);
            tracing::error!("Failed to run command {}\n{}", command, transcript);
            return Err(EnvError::CommandFailed {
                command,
                transcript,
            });
        }

        Ok(stdout)
    }

    async fn bootstrap_in(&self, boot_home: &Path, host: &str) -> Result<()> {
        fs::create_dir_all(boot_home.join("environments")).await?;
        fs::create_dir_all(self.juju_home.join("environments")).await?;

        // juju generates its client ssh keys on first use
        let ssh_key_dir = self.juju_home.join("ssh");
        if !ssh_key_dir.exists() {
            self.run(&["switch".to_string()], None).await?;
        }
        copy_dir(&ssh_key_dir, &boot_home.join("ssh")).await?;

        let environments = EnvironmentsFile::load(&self.juju_home.join("environments.yaml"))?;
        let mut conf: EnvironmentConf = environments.environment(&self.env_name)?.clone();
        conf.bootstrap_host = Some(host.to_string());
        let sandbox_conf = EnvironmentsFile::single(&self.env_name, conf).to_yaml()?;
        fs::write(boot_home.join("environments.yaml"), sandbox_conf).await?;

        let args = bootstrap_args(self.upload_series.as_deref());
        self.run(&args, Some(boot_home)).await?;

        fs::copy(jenv_path(boot_home, &self.env_name), self.jenv_path()).await?;
        Ok(())
    }
}

/// Arguments for `juju add-machine` against a manually provisioned host
pub fn add_machine_args(address: &str, ssh_key: Option<&str>) -> Vec<String> {
    let mut args = vec!["add-machine".to_string(), format!("ssh:root@{}", address)];
    if let Some(key) = ssh_key {
        args.push("--ssh-key".to_string());
        args.push(key.to_string());
    }
    args
}

/// Arguments for `juju bootstrap`, optionally uploading tools for `series`
pub fn bootstrap_args(upload_series: Option<&[String]>) -> Vec<String> {
    let mut args = vec!["bootstrap".to_string(), "--debug".to_string()];
    if let Some(series) = upload_series {
        let mut series = series.to_vec();
        series.sort();
        args.push("--upload-tools".to_string());
        args.push("--series".to_string());
        args.push(series.join(","));
    }
    args
}

/// Recursively copy a directory tree
async fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        fs::create_dir_all(&to).await?;
        let mut entries = fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

/// Client cache written by a successful bootstrap
#[derive(Debug, Deserialize)]
struct Jenv {
    #[serde(rename = "bootstrap-config")]
    bootstrap_config: Option<EnvironmentConf>,
}

#[async_trait]
impl Environment for JujuCli {
    fn name(&self) -> &str {
        &self.env_name
    }

    async fn status(&self) -> Result<EnvironmentStatus> {
        let output = self
            .run(&["status".to_string(), "--format".to_string(), "yaml".to_string()], None)
            .await?;
        EnvironmentStatus::parse(&output)
    }

    async fn add_machine(&self, address: &str, ssh_key: Option<&str>) -> Result<()> {
        self.run(&add_machine_args(address, ssh_key), None).await?;
        Ok(())
    }

    async fn terminate_machines(&self, machine_ids: &[String]) -> Result<()> {
        let mut args = vec!["terminate-machine".to_string(), "--force".to_string()];
        args.extend(machine_ids.iter().cloned());
        self.run(&args, None).await?;
        Ok(())
    }

    async fn is_running(&self) -> Result<bool> {
        let path = self.jenv_path();
        if !path.exists() {
            return Ok(false);
        }

        let content = fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(false);
        }
        let jenv: Jenv = serde_yaml::from_str(&content)?;

        let Some(conf) = jenv.bootstrap_config else {
            return Ok(false);
        };
        if !conf.is_manual() {
            return Ok(false);
        }
        let Some(host) = conf.bootstrap_host.filter(|h| !h.trim().is_empty()) else {
            return Ok(false);
        };

        Ok(port_open(&host, STATE_SERVER_PORT, STATE_SERVER_PROBE_TIMEOUT).await)
    }

    async fn destroy_environment(&self) -> Result<()> {
        self.run(
            &[
                "destroy-environment".to_string(),
                "-y".to_string(),
                self.env_name.clone(),
            ],
            None,
        )
        .await?;
        Ok(())
    }

    async fn destroy_environment_jenv(&self) -> Result<()> {
        let path = self.jenv_path();
        if path.exists() {
            fs::remove_file(&path).await?;
            tracing::debug!("Removed {}", path.display());
        }
        Ok(())
    }

    async fn bootstrap(&self, host: &str) -> Result<()> {
        let boot_home = self.juju_home.join(format!("boot-{}", self.env_name));
        if boot_home.exists() {
            fs::remove_dir_all(&boot_home).await?;
        }

        let result = self.bootstrap_in(&boot_home, host).await;

        if let Err(e) = fs::remove_dir_all(&boot_home).await {
            tracing::warn!("Failed to remove {}: {}", boot_home.display(), e);
        }
        result
    }
}
