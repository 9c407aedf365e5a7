use async_trait::async_trait;
use tracing::debug;

use super::{
    EngineSeverity, FindingMetadata, ParameterNote, RawFinding, Rule, RuleError, Snapshot,
    DEFAULT_VALUE_CHANGES,
};
use crate::catalog::{Catalog, DefaultChange};
use crate::version::Version;

/// Default Value Change
///
/// Lists catalog changes in the upgrade range that the bootstrap does not
/// force onto the cluster: new-cluster-only defaults, session or instance
/// scoped variables and config items. Existing settings survive these, so
/// they are informational.
pub struct DefaultValueChangesRule {
    catalog: &'static Catalog,
}

impl DefaultValueChangesRule {
    pub fn new(catalog: &'static Catalog) -> Self {
        Self { catalog }
    }

    fn finding(&self, change: &DefaultChange) -> RawFinding {
        let reason = if change.forced {
            format!(
                "Applied at {} scope only; global settings are kept",
                change.scope.label().to_lowercase()
            )
        } else {
            "Existing clusters keep their current value".to_string()
        };
        RawFinding::new(
            self.id(),
            EngineSeverity::Info,
            format!(
                "Default of {} changes from {} to {} in {}",
                change.name, change.from_default, change.to_default, change.version
            ),
        )
        .suggest(format!(
            "Decide whether {} should follow the new default after the upgrade",
            change.name
        ))
        .with_metadata(FindingMetadata::Parameter(ParameterNote {
            component: Some(change.component.clone()),
            target: Some(change.name.clone()),
            default_value: Some(change.to_default.clone()),
            scope: Some(change.scope.label().to_string()),
            reason: Some(reason),
            summary: Some(change.summary.clone()),
            details: Some(change.details.clone()),
        }))
    }
}

#[async_trait]
impl Rule for DefaultValueChangesRule {
    fn id(&self) -> &'static str {
        DEFAULT_VALUE_CHANGES
    }

    async fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<RawFinding>, RuleError> {
        let (Ok(source), Ok(target)) = (
            Version::parse(&snapshot.source_version),
            Version::parse(&snapshot.target_version),
        ) else {
            debug!("version range not comparable, skipping default change lookup");
            return Ok(Vec::new());
        };

        Ok(self
            .catalog
            .changes_between(&source, &target)
            .filter(|change| !change.is_forced_global())
            .map(|change| self.finding(change))
            .collect())
    }
}
