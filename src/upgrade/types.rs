use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::report::OutputFormat;

/// Components whose version can be pinned independently of the cluster.
pub const COMPONENTS: [&str; 13] = [
    "tidb",
    "tikv",
    "pd",
    "tso",
    "scheduling",
    "tiflash",
    "tikv-cdc",
    "cdc",
    "tiproxy",
    "tidb-dashboard",
    "alertmanager",
    "node_exporter",
    "blackbox_exporter",
];

/// Per-component version overrides. An empty value means "follow the
/// cluster-wide target version".
pub type ComponentVersions = BTreeMap<String, String>;

/// Everything the external upgrade action needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub cluster: String,
    /// Normalized target version, e.g. "v7.1.0"
    pub version: String,
    pub component_versions: ComponentVersions,
    pub skip_confirm: bool,
    pub offline: bool,
    pub ignore_version_check: bool,
    pub restart_timeout: Duration,
    pub options: UpgradeOptions,
}

impl UpgradeRequest {
    pub fn new(cluster: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            version: version.into(),
            component_versions: COMPONENTS
                .iter()
                .map(|c| (c.to_string(), String::new()))
                .collect(),
            skip_confirm: false,
            offline: false,
            ignore_version_check: false,
            restart_timeout: Duration::ZERO,
            options: UpgradeOptions::default(),
        }
    }

    /// Components pinned to a version other than the cluster-wide one.
    pub fn pinned(&self) -> impl Iterator<Item = (&str, &str)> {
        self.component_versions
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// Pass-through knobs of the upgrade procedure itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    pub force: bool,
    pub ignore_config_check: bool,
    /// Seconds allowed for leader transfer per store
    pub transfer_timeout: u64,
    pub pre_upgrade_script: Option<String>,
    pub post_upgrade_script: Option<String>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            force: false,
            ignore_config_check: false,
            transfer_timeout: 600,
            pre_upgrade_script: None,
            post_upgrade_script: None,
        }
    }
}

/// Operating mode, resolved once from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `upgrade precheck <cluster> <version>`: report only, whatever happens
    AssessOnly,
    /// `--without-precheck`: straight to the upgrade action
    SkipAssessment,
    /// `--precheck`: report, then stop
    PlanOnly,
    /// Default: report, confirm, upgrade
    Execute,
}

impl Mode {
    /// First matching flag wins, in this order.
    pub fn resolve(standalone: bool, skip_assessment: bool, plan_only: bool) -> Mode {
        if standalone {
            Mode::AssessOnly
        } else if skip_assessment {
            Mode::SkipAssessment
        } else if plan_only {
            Mode::PlanOnly
        } else {
            Mode::Execute
        }
    }
}

/// Where and how the precheck report is emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTarget {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

/// How a command execution ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Report emitted; the upgrade was never meant to run
    Assessed,
    /// Operator declined at the confirmation gate
    Aborted,
    /// The upgrade action ran and succeeded
    Upgraded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_precedence() {
        assert_eq!(Mode::resolve(true, true, true), Mode::AssessOnly);
        assert_eq!(Mode::resolve(false, true, true), Mode::SkipAssessment);
        assert_eq!(Mode::resolve(false, false, true), Mode::PlanOnly);
        assert_eq!(Mode::resolve(false, false, false), Mode::Execute);
    }

    #[test]
    fn test_request_has_every_component_unpinned() {
        let request = UpgradeRequest::new("c1", "v7.1.0");
        assert_eq!(request.component_versions.len(), COMPONENTS.len());
        assert_eq!(request.pinned().count(), 0);
    }

    #[test]
    fn test_pinned_components() {
        let mut request = UpgradeRequest::new("c1", "v7.1.0");
        request
            .component_versions
            .insert("tikv".to_string(), "v7.1.1".to_string());
        let pinned: Vec<_> = request.pinned().collect();
        assert_eq!(pinned, vec![("tikv", "v7.1.1")]);
    }
}
