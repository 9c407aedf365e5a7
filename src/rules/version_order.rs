use async_trait::async_trait;
use tracing::debug;

use super::{EngineSeverity, FindingMetadata, RawFinding, Rule, RuleError, Snapshot, TARGET_VERSION_ORDER};
use crate::version::{self, Version};

/// Upgrade Path Validation
///
/// The target must be a parseable version strictly newer than the running
/// cluster. Downgrades and same-version "upgrades" are reported as blockers.
pub struct TargetVersionOrderRule;

impl TargetVersionOrderRule {
    pub fn new() -> Self {
        Self
    }

    fn finding(&self, snapshot: &Snapshot, severity: EngineSeverity, message: String) -> RawFinding {
        RawFinding::new(self.id(), severity, message)
            .suggest("Choose a target version newer than the running cluster version")
            .with_metadata(FindingMetadata::VersionOrder {
                source: snapshot.source_version.clone(),
                target: snapshot.target_version.clone(),
            })
    }
}

#[async_trait]
impl Rule for TargetVersionOrderRule {
    fn id(&self) -> &'static str {
        TARGET_VERSION_ORDER
    }

    async fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<RawFinding>, RuleError> {
        let source_unknown = version::is_unknown(&snapshot.source_version);
        let mut findings = Vec::new();
        if source_unknown {
            findings.push(
                RawFinding::new(
                    self.id(),
                    EngineSeverity::Info,
                    "Current cluster version is unknown; the upgrade path and forced default changes were not checked",
                )
                .suggest("Make sure the cluster metadata records its version, then rerun the precheck")
                .with_metadata(FindingMetadata::VersionOrder {
                    source: snapshot.source_version.clone(),
                    target: snapshot.target_version.clone(),
                }),
            );
        }

        // An empty target is reported by the missing-target rule.
        if snapshot.target_version.is_empty() {
            return Ok(findings);
        }

        let target = match Version::parse(&snapshot.target_version) {
            Ok(v) => v,
            Err(_) => {
                findings.push(self.finding(
                    snapshot,
                    EngineSeverity::Error,
                    format!(
                        "Target version {} cannot be parsed; the upgrade path cannot be validated",
                        snapshot.target_version
                    ),
                ));
                return Ok(findings);
            }
        };

        if source_unknown {
            debug!("source version unknown, skipping upgrade path comparison");
            return Ok(findings);
        }

        let source = match Version::parse(&snapshot.source_version) {
            Ok(v) => v,
            Err(_) => {
                return Ok(vec![self.finding(
                    snapshot,
                    EngineSeverity::Error,
                    format!(
                        "Current cluster version {} cannot be compared with target version {}",
                        snapshot.source_version, snapshot.target_version
                    ),
                )])
            }
        };

        if target <= source {
            return Ok(vec![self.finding(
                snapshot,
                EngineSeverity::Blocker,
                format!(
                    "Target version {} is not newer than the current cluster version {}; downgrades are not supported",
                    target, source
                ),
            )]);
        }

        Ok(findings)
    }
}
