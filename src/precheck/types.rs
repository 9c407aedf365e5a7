/// Severity bucket of a normalized risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Buckets in display priority order.
    pub const DISPLAY_ORDER: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW RISK"),
            RiskLevel::Medium => write!(f, "MEDIUM RISK"),
            RiskLevel::High => write!(f, "HIGH RISK"),
        }
    }
}

/// A single normalized risk. Empty strings mean "not applicable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskItem {
    pub level: RiskLevel,
    /// e.g. "Forced Upgrade Logic", "Upgrade Path Validation"
    pub category: String,
    pub component: String,
    pub parameter: String,
    pub scope: String,
    pub current: String,
    pub new_default: String,
    pub impact: String,
    pub suggestion: String,
    pub reason: String,
    /// Extra context from the knowledge base
    pub comments: String,
}

impl RiskItem {
    pub fn new(level: RiskLevel, category: impl Into<String>, impact: impl Into<String>) -> Self {
        Self {
            level,
            category: category.into(),
            component: String::new(),
            parameter: String::new(),
            scope: String::new(),
            current: String::new(),
            new_default: String::new(),
            impact: impact.into(),
            suggestion: String::new(),
            reason: String::new(),
            comments: String::new(),
        }
    }

    /// Labelled non-empty fields in display order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Component", self.component.as_str()),
            ("Parameter", self.parameter.as_str()),
            ("Scope", self.scope.as_str()),
            ("Current", self.current.as_str()),
            ("New Default", self.new_default.as_str()),
            ("Impact", self.impact.as_str()),
            ("Suggestion", self.suggestion.as_str()),
            ("R&D Comments", self.comments.as_str()),
            ("Reason", self.reason.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

/// Counts per bucket, always derived from the report contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

/// All risks found for one source/target pair, bucketed by severity.
///
/// Items can only enter through [`RiskReport::push`], which files each
/// item under its own level, so bucket membership never disagrees with
/// the item. Order inside a bucket is insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskReport {
    pub source_version: String,
    pub target_version: String,
    high: Vec<RiskItem>,
    medium: Vec<RiskItem>,
    low: Vec<RiskItem>,
}

impl RiskReport {
    pub fn new(source_version: impl Into<String>, target_version: impl Into<String>) -> Self {
        Self {
            source_version: source_version.into(),
            target_version: target_version.into(),
            high: Vec::new(),
            medium: Vec::new(),
            low: Vec::new(),
        }
    }

    pub fn push(&mut self, item: RiskItem) {
        match item.level {
            RiskLevel::High => self.high.push(item),
            RiskLevel::Medium => self.medium.push(item),
            RiskLevel::Low => self.low.push(item),
        }
    }

    pub fn items(&self, level: RiskLevel) -> &[RiskItem] {
        match level {
            RiskLevel::High => &self.high,
            RiskLevel::Medium => &self.medium,
            RiskLevel::Low => &self.low,
        }
    }

    pub fn high(&self) -> &[RiskItem] {
        &self.high
    }

    pub fn medium(&self) -> &[RiskItem] {
        &self.medium
    }

    pub fn low(&self) -> &[RiskItem] {
        &self.low
    }

    /// Every item, highest bucket first.
    pub fn iter(&self) -> impl Iterator<Item = &RiskItem> {
        self.high.iter().chain(&self.medium).chain(&self.low)
    }

    pub fn summary(&self) -> Summary {
        let (high, medium, low) = (self.high.len(), self.medium.len(), self.low.len());
        Summary {
            high,
            medium,
            low,
            total: high + medium + low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(level: RiskLevel, impact: &str) -> RiskItem {
        RiskItem::new(level, "Test", impact)
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::Low.to_string(), "LOW RISK");
        assert_eq!(RiskLevel::Medium.to_string(), "MEDIUM RISK");
        assert_eq!(RiskLevel::High.to_string(), "HIGH RISK");
    }

    #[test]
    fn test_summary_counts_buckets() {
        let mut report = RiskReport::new("v6.5.0", "v7.1.0");
        report.push(item(RiskLevel::High, "a"));
        report.push(item(RiskLevel::High, "b"));
        report.push(item(RiskLevel::Medium, "c"));
        let s = report.summary();
        assert_eq!(s, Summary { high: 2, medium: 1, low: 0, total: 3 });
    }

    #[test]
    fn test_push_files_item_under_its_level() {
        let mut report = RiskReport::new("v6.5.0", "v7.1.0");
        report.push(item(RiskLevel::Low, "l1"));
        report.push(item(RiskLevel::Medium, "m1"));
        report.push(item(RiskLevel::Low, "l2"));
        for level in RiskLevel::DISPLAY_ORDER {
            assert!(report.items(level).iter().all(|i| i.level == level));
        }
        let lows: Vec<&str> = report.low().iter().map(|i| i.impact.as_str()).collect();
        assert_eq!(lows, vec!["l1", "l2"]);
        assert_eq!(report.summary().total, report.iter().count());
    }

    #[test]
    fn test_fields_skip_empty_and_keep_order() {
        let mut it = item(RiskLevel::Medium, "impact");
        it.reason = "why".to_string();
        it.component = "TiDB".to_string();
        it.new_default = "ON".to_string();
        let labels: Vec<&str> = it.fields().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Component", "New Default", "Impact", "Reason"]);
    }
}
