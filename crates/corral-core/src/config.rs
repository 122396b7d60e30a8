//! Configuration for deployment defaults.
//!
//! Load order: `corral.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level corral configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorralConfig {
    pub deploy: DeployConfig,
}

/// Deployment defaults. Every field can be overridden per invocation by
/// a CLI flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// IAM role created for (and assumed by) deployed functions.
    pub role_name: String,
    /// REST API that fronts deployed functions. Looked up by name, so
    /// repeated deploys reuse the same API.
    pub api_name: String,
    /// Deployment stage. Lowercased when the stage is created.
    pub stage: String,
    /// AWS region override. Empty means the SDK default chain decides.
    pub region: String,
    /// Lambda runtime identifier, e.g. `python3.12`. Overridden by the
    /// probed interpreter version when probing is enabled.
    pub runtime: String,
    /// Function timeout in seconds.
    pub timeout: i32,
    /// Interpreter probed for search paths and the runtime tag. Empty
    /// disables probing.
    pub python: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            role_name: "corral-lambda-role".to_string(),
            api_name: "corral-lambda-api".to_string(),
            stage: "dev".to_string(),
            region: String::new(),
            runtime: "python3.12".to_string(),
            timeout: 300,
            python: "python3".to_string(),
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl CorralConfig {
    /// Load config from `corral.toml` in the given directory, with env
    /// var overrides. Falls back to defaults if no config file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("corral.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Environment variable overrides
        env_override("CORRAL_ROLE_NAME", &mut config.deploy.role_name);
        env_override("CORRAL_API_NAME", &mut config.deploy.api_name);
        env_override("CORRAL_STAGE", &mut config.deploy.stage);
        env_override("CORRAL_REGION", &mut config.deploy.region);
        env_override("CORRAL_RUNTIME", &mut config.deploy.runtime);
        env_override("CORRAL_TIMEOUT", &mut config.deploy.timeout);
        env_override("CORRAL_PYTHON", &mut config.deploy.python);

        if config.deploy.timeout <= 0 {
            anyhow::bail!(
                "deploy timeout must be positive, got {}",
                config.deploy.timeout
            );
        }
        if config.deploy.role_name.is_empty() || config.deploy.api_name.is_empty() {
            anyhow::bail!("role_name and api_name must not be empty");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorralConfig::default();
        assert_eq!(config.deploy.role_name, "corral-lambda-role");
        assert_eq!(config.deploy.api_name, "corral-lambda-api");
        assert_eq!(config.deploy.stage, "dev");
        assert_eq!(config.deploy.runtime, "python3.12");
        assert_eq!(config.deploy.timeout, 300);
        assert_eq!(config.deploy.python, "python3");
        assert!(config.deploy.region.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[deploy]
role_name = "team-lambda-role"
stage = "prod"
timeout = 60
"#;
        let config: CorralConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deploy.role_name, "team-lambda-role");
        assert_eq!(config.deploy.stage, "prod");
        assert_eq!(config.deploy.timeout, 60);
        // Defaults for unspecified fields
        assert_eq!(config.deploy.api_name, "corral-lambda-api");
        assert_eq!(config.deploy.runtime, "python3.12");
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = CorralConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.deploy.timeout, 300);
    }

    #[test]
    fn test_config_rejects_bad_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("corral.toml"),
            "[deploy]\ntimeout = 0\n",
        )
        .unwrap();
        assert!(CorralConfig::load(tmp.path()).is_err());
    }
}
