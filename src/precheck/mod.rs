pub mod normalize;
pub mod types;

pub use types::{RiskItem, RiskLevel, RiskReport};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, CatalogError};
use crate::rules::default_changes::DefaultValueChangesRule;
use crate::rules::forced_sysvars::ForcedGlobalSysvarsRule;
use crate::rules::target_missing::TargetVersionMissingRule;
use crate::rules::version_order::TargetVersionOrderRule;
use crate::rules::{Engine, EngineError, Rule, Snapshot};
use crate::version;

#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("Failed to load upgrade metadata: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Precheck engine failed: {0}")]
    Engine(#[from] EngineError),
}

impl PrecheckError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PrecheckError::Engine(EngineError::Cancelled))
    }
}

/// Core rule set, in the order findings are reported.
pub fn default_rules(catalog: &'static Catalog) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(TargetVersionOrderRule::new()),
        Box::new(ForcedGlobalSysvarsRule::new(catalog)),
        Box::new(DefaultValueChangesRule::new(catalog)),
        Box::new(TargetVersionMissingRule::new()),
    ]
}

/// Assess an upgrade from `source_version` to `target_version` with the
/// core rule set.
///
/// Findings are not errors: a report full of high risks is still `Ok`.
/// Only a catalog or engine failure (including cancellation) is an `Err`.
#[instrument(skip(cancel))]
pub async fn run(
    source_version: &str,
    target_version: &str,
    cancel: &CancellationToken,
) -> Result<RiskReport, PrecheckError> {
    let catalog = Catalog::embedded()?;
    let engine = Engine::new(default_rules(catalog));
    run_with(&engine, source_version, target_version, cancel).await
}

/// Same as [`run`], against a caller-provided engine.
pub async fn run_with(
    engine: &Engine,
    source_version: &str,
    target_version: &str,
    cancel: &CancellationToken,
) -> Result<RiskReport, PrecheckError> {
    let snapshot = Snapshot::new(source_version, target_version);
    if version::is_unknown(&snapshot.source_version) {
        warn!("current cluster version is unknown; upgrade path checks are limited");
    }

    let findings = engine.run(&snapshot, cancel).await?;
    let report = normalize::normalize(&snapshot, &findings);

    let summary = report.summary();
    info!(
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        "precheck finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forced_sysvar_warning() {
        let report = run("v6.5.0", "v7.1.0", &CancellationToken::new()).await.unwrap();
        let item = report
            .medium()
            .iter()
            .find(|i| i.parameter.eq_ignore_ascii_case("tidb_server_memory_limit"))
            .expect("expected forced sysvar warning for tidb_server_memory_limit");
        assert_eq!(item.level, RiskLevel::Medium);
        assert!(item.impact.contains("tidb_server_memory_limit"));
        assert!(item.category.to_lowercase().contains("forced"));
        assert_eq!(item.scope, "Global");
        assert_eq!(item.component, "TiDB");
        assert!(report.high().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_version_warning() {
        let report = run("v7.5.0", "", &CancellationToken::new()).await.unwrap();
        assert!(report
            .medium()
            .iter()
            .any(|i| i.impact.contains("Target version is empty")));
        assert!(report.high().is_empty());
    }

    #[tokio::test]
    async fn test_downgrade_is_high_risk() {
        let report = run("v7.5.0", "v7.1.0", &CancellationToken::new()).await.unwrap();
        assert_eq!(report.high().len(), 1);
        assert_eq!(report.high()[0].category, "Upgrade Path Validation");
    }

    #[tokio::test]
    async fn test_unknown_source_is_not_fatal() {
        let report = run(version::UNKNOWN_VERSION, "v7.1.0", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.source_version, version::UNKNOWN_VERSION);
        // Nothing could be compared, and the report says so.
        assert_eq!(report.summary().total, 1);
        assert!(report.low()[0].impact.contains("version is unknown"));
    }

    #[tokio::test]
    async fn test_versions_are_trimmed() {
        let report = run(" v6.5.0 ", " v7.1.0\n", &CancellationToken::new()).await.unwrap();
        assert_eq!(report.source_version, "v6.5.0");
        assert_eq!(report.target_version, "v7.1.0");
    }

    #[tokio::test]
    async fn test_new_cluster_defaults_are_low_risk() {
        let report = run("v6.5.0", "v7.1.0", &CancellationToken::new()).await.unwrap();
        let item = report
            .low()
            .iter()
            .find(|i| i.parameter == "tidb_enable_non_prepared_plan_cache")
            .expect("expected a low risk entry for the non-prepared plan cache");
        assert_eq!(item.category, "Default Value Change");
        assert_eq!(item.component, "TiDB");
        assert_eq!(item.new_default, "ON");
        assert_eq!(item.reason, "Existing clusters keep their current value");
    }

    #[tokio::test]
    async fn test_cancelled_run_is_distinguishable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run("v6.5.0", "v7.1.0", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
