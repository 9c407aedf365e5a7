use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = ".cluster-upgrade.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .cluster-upgrade.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Where cluster metadata lives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Precheck defaults
    #[serde(default)]
    pub precheck: PrecheckConfig,

    /// External program performing the actual upgrade
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Root of the deployment home (the directory holding `storage/cluster`).
    /// If None, falls back to TIUP_HOME, then $HOME/.tiup.
    pub home: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrecheckConfig {
    /// Default report format when --precheck-output is not given
    pub output: Option<String>,

    /// What to do in execute mode when the precheck itself fails to run
    #[serde(default)]
    pub on_failure: AssessmentFailurePolicy,
}

/// Execute-mode reaction to a precheck that could not run at all
/// (as opposed to one that ran and found risks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentFailurePolicy {
    /// Log a warning and still ask the operator
    #[default]
    Continue,
    /// Fail the command
    Abort,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorConfig {
    /// Program invoked to upgrade the cluster.
    /// If None, falls back to CLUSTER_UPGRADE_EXECUTOR, then "tiup-cluster".
    pub program: Option<String>,

    /// Leading arguments placed before the generated ones
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from .cluster-upgrade.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the deployment home: config value, then TIUP_HOME, then ~/.tiup.
    pub fn home_dir(&self) -> PathBuf {
        self.storage
            .home
            .clone()
            .or_else(|| std::env::var_os("TIUP_HOME").map(PathBuf::from))
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".tiup")))
            .unwrap_or_else(|| PathBuf::from(".tiup"))
    }

    /// Resolve the executor program: env var wins over the config file.
    pub fn executor_program(&self) -> String {
        std::env::var("CLUSTER_UPGRADE_EXECUTOR")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.executor.program.clone())
            .unwrap_or_else(|| "tiup-cluster".to_string())
    }

    pub fn executor_args(&self) -> Vec<String> {
        self.executor
            .args
            .clone()
            .unwrap_or_else(|| vec!["upgrade".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.storage.home.is_none());
        assert!(config.precheck.output.is_none());
        assert_eq!(config.precheck.on_failure, AssessmentFailurePolicy::Continue);
        assert_eq!(config.executor_args(), vec!["upgrade"]);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[storage]
home = "/data/tiup"

[precheck]
output = "markdown"
on_failure = "abort"

[executor]
program = "/usr/local/bin/tiup-cluster"
args = ["upgrade", "--wait-timeout", "300"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.home_dir(), PathBuf::from("/data/tiup"));
        assert_eq!(config.precheck.output.as_deref(), Some("markdown"));
        assert_eq!(config.precheck.on_failure, AssessmentFailurePolicy::Abort);
        assert_eq!(config.executor_args().len(), 3);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let toml_str = "[precheck]\non_failure = \"maybe\"\n";
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[precheck]\noutput = \"html\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.precheck.output.as_deref(), Some("html"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }
}
