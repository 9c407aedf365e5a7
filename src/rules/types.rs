/// Version pair fed to every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Running cluster version, possibly the unknown placeholder
    pub source_version: String,
    /// Requested version, possibly empty
    pub target_version: String,
}

impl Snapshot {
    pub fn new(source_version: &str, target_version: &str) -> Self {
        Self {
            source_version: source_version.trim().to_string(),
            target_version: target_version.trim().to_string(),
        }
    }
}

/// Severity as reported by a rule, before it is bucketed for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSeverity {
    Blocker,
    Error,
    Warning,
    Info,
}

/// Rule-specific payload attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FindingMetadata {
    #[default]
    None,
    /// Source/target ordering problem.
    VersionOrder { source: String, target: String },
    /// A system variable the upgrade rewrites unconditionally.
    ForcedSysvar(SysvarChange),
    /// No target version was supplied.
    MissingTarget,
    /// Generic parameter finding for rules without a dedicated shape.
    Parameter(ParameterNote),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SysvarChange {
    pub component: String,
    pub name: String,
    pub scope: String,
    pub previous_default: String,
    pub default_value: String,
    pub summary: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterNote {
    pub component: Option<String>,
    pub target: Option<String>,
    pub default_value: Option<String>,
    pub scope: Option<String>,
    pub reason: Option<String>,
    pub summary: Option<String>,
    pub details: Option<String>,
}

/// One finding as emitted by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFinding {
    /// Identifier of the rule that produced it (e.g. "core.target-version-order")
    pub rule: String,
    pub severity: EngineSeverity,
    pub message: String,
    pub suggestions: Vec<String>,
    pub details: Vec<String>,
    pub metadata: FindingMetadata,
}

impl RawFinding {
    pub fn new(rule: &str, severity: EngineSeverity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            suggestions: Vec::new(),
            details: Vec::new(),
            metadata: FindingMetadata::None,
        }
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_metadata(mut self, metadata: FindingMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_trims_versions() {
        let snapshot = Snapshot::new("  v6.5.0 ", "\tv7.1.0\n");
        assert_eq!(snapshot.source_version, "v6.5.0");
        assert_eq!(snapshot.target_version, "v7.1.0");
    }

    #[test]
    fn test_finding_builder() {
        let finding = RawFinding::new("core.sample", EngineSeverity::Warning, "msg")
            .suggest("do a")
            .suggest("do b")
            .detail("because")
            .with_metadata(FindingMetadata::MissingTarget);
        assert_eq!(finding.suggestions, vec!["do a", "do b"]);
        assert_eq!(finding.details, vec!["because"]);
        assert_eq!(finding.metadata, FindingMetadata::MissingTarget);
    }
}
