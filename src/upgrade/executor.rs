use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::types::UpgradeRequest;

#[derive(Debug, Error)]
pub enum UpgradeActionError {
    #[error("Failed to start upgrade executor {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upgrade executor {program} exited with {status}")]
    Exit { program: String, status: String },
}

/// The action that actually upgrades a cluster.
#[async_trait]
pub trait Upgrader: Send + Sync {
    async fn upgrade(&self, request: &UpgradeRequest) -> Result<(), UpgradeActionError>;
}

/// Delegates the upgrade to an external program, e.g. `tiup-cluster upgrade`.
pub struct ExternalExecutor {
    program: String,
    leading_args: Vec<String>,
}

impl ExternalExecutor {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    /// Full argument list for one request. The delegate is told to skip its
    /// own precheck since this process already ran it.
    pub fn args(&self, request: &UpgradeRequest) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(request.cluster.clone());
        args.push(request.version.clone());
        args.push("--without-precheck".to_string());

        for (component, version) in request.pinned() {
            args.push(format!("--{}-version", component.replace('_', "-")));
            args.push(version.to_string());
        }

        let options = &request.options;
        let flags = [
            (request.skip_confirm, "--yes"),
            (request.offline, "--offline"),
            (request.ignore_version_check, "--ignore-version-check"),
            (options.force, "--force"),
            (options.ignore_config_check, "--ignore-config-check"),
        ];
        args.extend(flags.iter().filter(|(on, _)| *on).map(|(_, f)| f.to_string()));

        args.push("--transfer-timeout".to_string());
        args.push(options.transfer_timeout.to_string());
        if !request.restart_timeout.is_zero() {
            args.push("--restart-timeout".to_string());
            args.push(format_duration(request.restart_timeout));
        }
        if let Some(script) = &options.pre_upgrade_script {
            args.push("--pre-upgrade-script".to_string());
            args.push(script.clone());
        }
        if let Some(script) = &options.post_upgrade_script {
            args.push("--post-upgrade-script".to_string());
            args.push(script.clone());
        }
        args
    }
}

#[async_trait]
impl Upgrader for ExternalExecutor {
    #[instrument(skip(self, request), fields(program = %self.program, cluster = %request.cluster, version = %request.version))]
    async fn upgrade(&self, request: &UpgradeRequest) -> Result<(), UpgradeActionError> {
        let args = self.args(request);
        debug!(?args, "starting upgrade executor");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .await
            .map_err(|source| UpgradeActionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(UpgradeActionError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Go-style duration string accepted by the executor's `--restart-timeout`.
fn format_duration(d: std::time::Duration) -> String {
    let nanos = d.subsec_nanos();
    if nanos == 0 {
        format!("{}s", d.as_secs())
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", d.as_millis())
    } else if nanos % 1_000 == 0 {
        format!("{}us", d.as_micros())
    } else {
        format!("{}ns", d.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_args() {
        let executor = ExternalExecutor::new("tiup-cluster", vec!["upgrade".to_string()]);
        let request = UpgradeRequest::new("cluster1", "v7.1.0");
        assert_eq!(
            executor.args(&request),
            vec!["upgrade", "cluster1", "v7.1.0", "--without-precheck", "--transfer-timeout", "600"]
        );
    }

    #[test]
    fn test_full_args() {
        let executor = ExternalExecutor::new("tiup-cluster", vec![]);
        let mut request = UpgradeRequest::new("cluster1", "v7.1.0");
        request.skip_confirm = true;
        request.offline = true;
        request.restart_timeout = Duration::from_secs(90);
        request.options.force = true;
        request.options.pre_upgrade_script = Some("/opt/pre.sh".to_string());
        request
            .component_versions
            .insert("node_exporter".to_string(), "v1.5.0".to_string());

        let args = executor.args(&request);
        let joined = args.join(" ");
        assert!(joined.contains("--node-exporter-version v1.5.0"));
        assert!(joined.contains("--yes"));
        assert!(joined.contains("--offline"));
        assert!(joined.contains("--force"));
        assert!(joined.contains("--restart-timeout 90s"));
        assert!(joined.contains("--pre-upgrade-script /opt/pre.sh"));
        assert!(!joined.contains("--ignore-version-check"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_micros(500)), "500us");
        assert_eq!(format_duration(Duration::from_nanos(1_000_000_250)), "1000000250ns");
    }

    #[test]
    fn test_sub_millisecond_restart_timeout_is_forwarded() {
        let executor = ExternalExecutor::new("tiup-cluster", vec![]);
        let mut request = UpgradeRequest::new("cluster1", "v7.1.0");
        request.restart_timeout = Duration::from_micros(500);
        assert!(executor.args(&request).join(" ").contains("--restart-timeout 500us"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let executor = ExternalExecutor::new("false", vec![]);
        let err = executor
            .upgrade(&UpgradeRequest::new("cluster1", "v7.1.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeActionError::Exit { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = ExternalExecutor::new("definitely-not-a-real-upgrade-binary", vec![]);
        let err = executor
            .upgrade(&UpgradeRequest::new("cluster1", "v7.1.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeActionError::Spawn { .. }));
    }
}
