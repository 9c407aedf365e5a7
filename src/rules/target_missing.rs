use async_trait::async_trait;

use super::{EngineSeverity, FindingMetadata, RawFinding, Rule, RuleError, Snapshot, TARGET_VERSION_MISSING};

/// Warns when the snapshot carries no target version at all.
pub struct TargetVersionMissingRule;

impl TargetVersionMissingRule {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Rule for TargetVersionMissingRule {
    fn id(&self) -> &'static str {
        TARGET_VERSION_MISSING
    }

    async fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<RawFinding>, RuleError> {
        if !snapshot.target_version.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![RawFinding::new(
            self.id(),
            EngineSeverity::Warning,
            "Target version is empty; upgrade path and parameter changes cannot be checked",
        )
        .suggest("Pass the version to upgrade to, e.g. v7.5.0")
        .with_metadata(FindingMetadata::MissingTarget)])
    }
}
