//! Converts raw rule findings into the operator-facing risk taxonomy.

use super::types::{RiskItem, RiskLevel, RiskReport};
use crate::rules::{
    EngineSeverity, FindingMetadata, RawFinding, Snapshot, DEFAULT_VALUE_CHANGES,
    FORCED_GLOBAL_SYSVARS, TARGET_VERSION_ORDER,
};

/// Component name of the SQL layer.
pub const SQL_COMPONENT: &str = "TiDB";

const SUGGESTION_SEPARATOR: &str = "; ";

/// Build a report from findings, keeping their evaluation order inside each bucket.
pub fn normalize(snapshot: &Snapshot, findings: &[RawFinding]) -> RiskReport {
    let mut report = RiskReport::new(
        snapshot.source_version.clone(),
        snapshot.target_version.clone(),
    );
    for finding in findings {
        report.push(normalize_finding(finding));
    }
    report
}

pub fn normalize_finding(finding: &RawFinding) -> RiskItem {
    let mut item = RiskItem::new(
        map_severity(finding.severity),
        map_category(&finding.rule),
        finding.message.trim(),
    );
    item.suggestion = join_trimmed(&finding.suggestions);
    item.comments = join_trimmed(&finding.details);

    let fields = MetadataFields::from(&finding.metadata);
    item.parameter = fields.target;
    item.new_default = fields.default_value;
    item.current = fields.current;
    item.scope = fields.scope;
    item.reason = if fields.reason.is_empty() {
        fields.summary
    } else {
        fields.reason
    };
    if item.comments.is_empty() {
        item.comments = fields.details;
    }
    item.component = if fields.component.is_empty() {
        infer_component(&finding.rule).to_string()
    } else {
        fields.component
    };

    if item.scope.is_empty() && finding.rule == FORCED_GLOBAL_SYSVARS {
        item.scope = "Global".to_string();
    }
    item
}

pub fn map_severity(severity: EngineSeverity) -> RiskLevel {
    match severity {
        EngineSeverity::Blocker | EngineSeverity::Error => RiskLevel::High,
        EngineSeverity::Warning => RiskLevel::Medium,
        EngineSeverity::Info => RiskLevel::Low,
    }
}

pub fn map_category(rule: &str) -> String {
    match rule {
        TARGET_VERSION_ORDER => "Upgrade Path Validation".to_string(),
        FORCED_GLOBAL_SYSVARS => "Forced Upgrade Logic".to_string(),
        DEFAULT_VALUE_CHANGES => "Default Value Change".to_string(),
        other => other.trim().to_string(),
    }
}

fn infer_component(rule: &str) -> &'static str {
    match rule {
        FORCED_GLOBAL_SYSVARS => SQL_COMPONENT,
        _ => "",
    }
}

fn join_trimmed(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(SUGGESTION_SEPARATOR)
}

/// Flattened, trimmed view of the per-rule metadata.
#[derive(Debug, Default)]
struct MetadataFields {
    target: String,
    default_value: String,
    current: String,
    scope: String,
    reason: String,
    summary: String,
    details: String,
    component: String,
}

impl From<&FindingMetadata> for MetadataFields {
    fn from(metadata: &FindingMetadata) -> Self {
        match metadata {
            FindingMetadata::None
            | FindingMetadata::MissingTarget
            | FindingMetadata::VersionOrder { .. } => MetadataFields::default(),
            FindingMetadata::ForcedSysvar(change) => MetadataFields {
                target: trimmed(&change.name),
                default_value: trimmed(&change.default_value),
                current: trimmed(&change.previous_default),
                scope: trimmed(&change.scope),
                reason: String::new(),
                summary: trimmed(&change.summary),
                details: trimmed(&change.details),
                component: trimmed(&change.component),
            },
            FindingMetadata::Parameter(note) => MetadataFields {
                target: trimmed_opt(&note.target),
                default_value: trimmed_opt(&note.default_value),
                current: String::new(),
                scope: trimmed_opt(&note.scope),
                reason: trimmed_opt(&note.reason),
                summary: trimmed_opt(&note.summary),
                details: trimmed_opt(&note.details),
                component: trimmed_opt(&note.component),
            },
        }
    }
}

fn trimmed(s: &str) -> String {
    s.trim().to_string()
}

fn trimmed_opt(s: &Option<String>) -> String {
    s.as_deref().map(str::trim).unwrap_or_default().to_string()
}
