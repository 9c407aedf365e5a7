use async_trait::async_trait;
use tracing::debug;

use super::{
    EngineSeverity, FindingMetadata, RawFinding, Rule, RuleError, Snapshot, SysvarChange,
    FORCED_GLOBAL_SYSVARS,
};
use crate::catalog::{Catalog, DefaultChange};
use crate::version::Version;

/// Forced Upgrade Logic
///
/// Reports every global system variable whose default the upgrade
/// bootstrap rewrites unconditionally between the two versions. Operators
/// who tuned one of these variables lose their value after the upgrade.
pub struct ForcedGlobalSysvarsRule {
    catalog: &'static Catalog,
}

impl ForcedGlobalSysvarsRule {
    pub fn new(catalog: &'static Catalog) -> Self {
        Self { catalog }
    }

    fn finding(&self, change: &DefaultChange) -> RawFinding {
        let mut finding = RawFinding::new(
            self.id(),
            EngineSeverity::Warning,
            format!(
                "Upgrading to {} forcibly sets {} to {} (previous default {})",
                change.version, change.name, change.to_default, change.from_default
            ),
        )
        .suggest(format!(
            "Record the current value of {} and reapply it after the upgrade if it was tuned",
            change.name
        ));
        if !change.details.trim().is_empty() {
            finding = finding.detail(change.details.clone());
        }
        finding.with_metadata(FindingMetadata::ForcedSysvar(SysvarChange {
            component: change.component.clone(),
            name: change.name.clone(),
            scope: change.scope.label().to_string(),
            previous_default: change.from_default.clone(),
            default_value: change.to_default.clone(),
            summary: change.summary.clone(),
            details: change.details.clone(),
        }))
    }
}

#[async_trait]
impl Rule for ForcedGlobalSysvarsRule {
    fn id(&self) -> &'static str {
        FORCED_GLOBAL_SYSVARS
    }

    async fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<RawFinding>, RuleError> {
        let (Ok(source), Ok(target)) = (
            Version::parse(&snapshot.source_version),
            Version::parse(&snapshot.target_version),
        ) else {
            debug!(
                source = %snapshot.source_version,
                target = %snapshot.target_version,
                "version range not comparable, skipping forced sysvar lookup"
            );
            return Ok(Vec::new());
        };

        Ok(self
            .catalog
            .forced_global_sysvars(&source, &target)
            .map(|change| self.finding(change))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> ForcedGlobalSysvarsRule {
        ForcedGlobalSysvarsRule::new(Catalog::embedded().unwrap())
    }

    #[tokio::test]
    async fn test_reports_memory_limit_between_65_and_71() {
        let findings = rule().evaluate(&Snapshot::new("v6.5.0", "v7.1.0")).await.unwrap();
        let memory_limit = findings
            .iter()
            .find(|f| f.message.contains("tidb_server_memory_limit"))
            .expect("memory limit finding");
        assert_eq!(memory_limit.severity, EngineSeverity::Warning);
        match &memory_limit.metadata {
            FindingMetadata::ForcedSysvar(change) => {
                assert_eq!(change.name, "tidb_server_memory_limit");
                assert_eq!(change.scope, "Global");
                assert_eq!(change.default_value, "80%");
                assert_eq!(change.previous_default, "0");
            }
            other => panic!("unexpected metadata {other:?}"),
        }
        assert!(!memory_limit.details.is_empty());
    }

    #[tokio::test]
    async fn test_findings_follow_catalog_order() {
        let findings = rule().evaluate(&Snapshot::new("v6.5.0", "v8.0.0")).await.unwrap();
        let names: Vec<String> = findings
            .iter()
            .filter_map(|f| match &f.metadata {
                FindingMetadata::ForcedSysvar(c) => Some(c.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "tidb_server_memory_limit",
                "tidb_enable_resource_control",
                "tidb_enable_async_merge_global_stats",
                "tidb_enable_historical_stats",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_source_yields_nothing() {
        let findings = rule()
            .evaluate(&Snapshot::new(crate::version::UNKNOWN_VERSION, "v7.1.0"))
            .await
            .unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_patch_upgrade_yields_nothing() {
        let findings = rule().evaluate(&Snapshot::new("v7.1.0", "v7.1.5")).await.unwrap();
        assert!(findings.is_empty());
    }
}
