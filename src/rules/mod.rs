pub mod default_changes;
pub mod forced_sysvars;
pub mod target_missing;
pub mod types;
pub mod version_order;

pub use types::{
    EngineSeverity, FindingMetadata, ParameterNote, RawFinding, Snapshot, SysvarChange,
};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};

use crate::cancel::CancellationToken;

pub const TARGET_VERSION_ORDER: &str = "core.target-version-order";
pub const FORCED_GLOBAL_SYSVARS: &str = "core.forced-global-sysvars";
pub const TARGET_VERSION_MISSING: &str = "core.target-version-missing";
pub const DEFAULT_VALUE_CHANGES: &str = "core.default-value-changes";

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rule {rule} failed: {reason}")]
    #[allow(dead_code)] // Core rules are infallible; reserved for rules reading live cluster state
    Failed { rule: String, reason: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Precheck cancelled before all rules completed")]
    Cancelled,

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// A single upgrade compatibility check.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Stable identifier, also used to pick the report category.
    fn id(&self) -> &'static str;

    /// Inspect the snapshot and return zero or more findings.
    async fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<RawFinding>, RuleError>;
}

/// Ordered set of registered rules.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Engine {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Evaluate every rule concurrently.
    ///
    /// Findings come back grouped by rule in registration order, whatever
    /// order the rules happen to finish in. Cancellation wins over any
    /// rule still in flight.
    pub async fn run(
        &self,
        snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawFinding>, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let evaluations = self.rules.iter().map(|rule| {
            rule.evaluate(snapshot)
                .instrument(info_span!("rule", rule = rule.id()))
        });

        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("precheck cancelled while rules were running");
                return Err(EngineError::Cancelled);
            }
            outcomes = join_all(evaluations) => outcomes,
        };

        let mut findings = Vec::new();
        for (rule, outcome) in self.rules.iter().zip(outcomes) {
            let produced = outcome?;
            debug!(rule = rule.id(), findings = produced.len(), "rule evaluated");
            findings.extend(produced);
        }
        Ok(findings)
    }
}
