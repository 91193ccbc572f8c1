//! `environments.yaml` handling
//!
//! Only the `null`/`manual` provider is supported: juju does not manage the
//! machines itself, this tool provisions them and hands juju their addresses.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed `environments.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<BTreeMap<String, EnvironmentConf>>,
}

/// One environment block. Unknown keys are carried through untouched so the
/// block can be written back out for a sandboxed bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConf {
    /// `null` in YAML (the null provider) decodes to `None`
    #[serde(rename = "type", default)]
    pub provider_type: Option<String>,

    #[serde(rename = "bootstrap-host", default)]
    pub bootstrap_host: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl EnvironmentConf {
    pub fn is_manual(&self) -> bool {
        matches!(self.provider_type.as_deref(), None | Some("null") | Some("manual"))
    }

    pub fn has_bootstrap_host(&self) -> bool {
        self.bootstrap_host
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
    }
}

impl EnvironmentsFile {
    /// Load from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::EnvironmentsFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// A file holding exactly one environment
    pub fn single(name: impl Into<String>, conf: EnvironmentConf) -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(name.into(), conf);
        Self {
            environments: Some(environments),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a named environment
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConf> {
        let environments = self.environments.as_ref().ok_or_else(|| {
            ConfigError::InvalidEnvironmentsFile("no 'environments' section".to_string())
        })?;
        environments
            .get(name)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(name.to_string()))
    }

    /// Check that `name` is a manual environment that has not been bootstrapped
    pub fn check_unbootstrapped_manual(&self, name: &str) -> Result<&EnvironmentConf> {
        let env = self.environment(name)?;
        if !env.is_manual() {
            return Err(ConfigError::UnsupportedProviderType {
                name: name.to_string(),
                provider_type: env.provider_type.clone().unwrap_or_default(),
            });
        }
        if env.has_bootstrap_host() {
            return Err(ConfigError::BootstrapHostAlreadySet(name.to_string()));
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = r#"
environments:
  prod:
    type: manual
    bootstrap-host:
    bootstrap-user: root
    admin-secret: sekrit
  aws:
    type: ec2
  booted:
    type: "null"
    bootstrap-host: 10.0.0.1
  legacy:
    type: null
"#;

    #[test]
    fn test_manual_environment_ok() {
        let file = EnvironmentsFile::parse(SAMPLE).unwrap();
        let env = file.check_unbootstrapped_manual("prod").unwrap();
        assert!(env.is_manual());
        assert_eq!(
            env.extra.get("bootstrap-user"),
            Some(&serde_yaml::Value::String("root".to_string()))
        );
    }

    #[test]
    fn test_yaml_null_type_is_manual() {
        let file = EnvironmentsFile::parse(SAMPLE).unwrap();
        assert!(file.check_unbootstrapped_manual("legacy").is_ok());
    }

    #[test]
    fn test_wrong_provider_type() {
        let file = EnvironmentsFile::parse(SAMPLE).unwrap();
        match file.check_unbootstrapped_manual("aws") {
            Err(ConfigError::UnsupportedProviderType { provider_type, .. }) => {
                assert_eq!(provider_type, "ec2");
            }
            other => panic!("Expected UnsupportedProviderType, got {:?}", other),
        }
    }

    #[test]
    fn test_bootstrap_host_already_set() {
        let file = EnvironmentsFile::parse(SAMPLE).unwrap();
        assert!(matches!(
            file.check_unbootstrapped_manual("booted"),
            Err(ConfigError::BootstrapHostAlreadySet(_))
        ));
    }

    #[test]
    fn test_missing_environment() {
        let file = EnvironmentsFile::parse(SAMPLE).unwrap();
        assert!(matches!(
            file.environment("staging"),
            Err(ConfigError::EnvironmentNotFound(_))
        ));
    }

    #[test]
    fn test_missing_environments_section() {
        let file = EnvironmentsFile::parse("default: prod\n").unwrap();
        assert!(matches!(
            file.environment("prod"),
            Err(ConfigError::InvalidEnvironmentsFile(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EnvironmentsFile::load(&dir.path().join("environments.yaml"));
        assert!(matches!(
            result,
            Err(ConfigError::EnvironmentsFileNotFound(_))
        ));
    }

    #[test]
    fn test_single_roundtrip_keeps_extra_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let file = EnvironmentsFile::load(&path).unwrap();
        let mut conf = file.environment("prod").unwrap().clone();
        conf.bootstrap_host = Some("10.0.0.5".to_string());

        let yaml = EnvironmentsFile::single("prod", conf).to_yaml().unwrap();
        let reparsed = EnvironmentsFile::parse(&yaml).unwrap();
        let env = reparsed.environment("prod").unwrap();
        assert_eq!(env.bootstrap_host.as_deref(), Some("10.0.0.5"));
        assert!(env.extra.contains_key("admin-secret"));
        assert!(reparsed.environment("aws").is_err());
    }
}
