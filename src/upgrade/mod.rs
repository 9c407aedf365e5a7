pub mod executor;
pub mod metadata;
pub mod types;

pub use executor::{ExternalExecutor, UpgradeActionError, Upgrader};
pub use metadata::{ClusterMetadata, FileMetadataStore};
pub use types::{Mode, Outcome, ReportTarget, UpgradeOptions, UpgradeRequest, COMPONENTS};

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{error, info, info_span, instrument, warn, Instrument};

use crate::cancel::CancellationToken;
use crate::config::AssessmentFailurePolicy;
use crate::precheck::{self, PrecheckError, RiskReport};
use crate::rules::Engine;
use crate::prompt::{Console, PromptError};
use crate::report::{self, ReportError};
use crate::version::UNKNOWN_VERSION;

const CONFIRM_QUESTION: &str = "Do you want to continue with the upgrade?";

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Parameter precheck failed: {0}")]
    Precheck(#[from] PrecheckError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Upgrade(#[from] UpgradeActionError),
}

impl UpgradeError {
    /// True when the precheck could not run, as opposed to I/O or input problems.
    pub fn is_assessment_failure(&self) -> bool {
        matches!(self, UpgradeError::Precheck(_))
    }
}

/// One fully parsed `upgrade` invocation.
#[derive(Debug, Clone)]
pub struct UpgradePlan {
    pub mode: Mode,
    pub request: UpgradeRequest,
    pub report: ReportTarget,
}

/// Drives one upgrade command through precheck, confirmation and upgrade.
///
/// Collaborators are injected so the flow can run against test doubles.
pub struct Orchestrator<'a> {
    metadata: &'a dyn ClusterMetadata,
    upgrader: &'a dyn Upgrader,
    on_failure: AssessmentFailurePolicy,
    cancel: CancellationToken,
    engine: Option<Engine>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(metadata: &'a dyn ClusterMetadata, upgrader: &'a dyn Upgrader) -> Self {
        Self {
            metadata,
            upgrader,
            on_failure: AssessmentFailurePolicy::default(),
            cancel: CancellationToken::new(),
            engine: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: AssessmentFailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the core rule set.
    #[cfg(test)]
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    #[instrument(skip_all, fields(cluster = %plan.request.cluster, version = %plan.request.version, mode = ?plan.mode))]
    pub async fn run<R: BufRead, W: Write>(
        &self,
        plan: &UpgradePlan,
        console: &mut Console<R, W>,
    ) -> Result<Outcome, UpgradeError> {
        let request = &plan.request;
        match plan.mode {
            Mode::AssessOnly => {
                self.assess(plan, console).await?;
                info!("Precheck complete. This was a dry run; no upgrade performed.");
                return Ok(Outcome::Assessed);
            }
            Mode::SkipAssessment => {
                warn!("Skipping parameter precheck (--without-precheck). Proceeding at your own risk.");
                if self.interrupted() {
                    return Ok(Outcome::Aborted);
                }
                self.invoke(request).await?;
                return Ok(Outcome::Upgraded);
            }
            Mode::PlanOnly | Mode::Execute => {}
        }

        match self.assess(plan, console).await {
            Ok(_) => {}
            Err(err) if err.is_assessment_failure() => {
                error!("parameter precheck failed: {}", err);
                if plan.mode == Mode::PlanOnly
                    || self.on_failure == AssessmentFailurePolicy::Abort
                    || self.cancel.is_cancelled()
                {
                    return Err(err);
                }
                warn!("continuing without a precheck report; the operator decides at the confirmation prompt");
            }
            Err(err) => return Err(err),
        }

        if plan.mode == Mode::PlanOnly {
            info!("Precheck complete. No upgrade performed (planning mode).");
            return Ok(Outcome::Assessed);
        }

        if self.interrupted() {
            return Ok(Outcome::Aborted);
        }
        if !request.skip_confirm && !console.confirm(CONFIRM_QUESTION)? {
            info!("Aborting upgrade per user response.");
            return Ok(Outcome::Aborted);
        }
        // An interrupt while the prompt was blocked on input outranks the answer.
        if self.interrupted() {
            return Ok(Outcome::Aborted);
        }

        self.invoke(request).await?;
        Ok(Outcome::Upgraded)
    }

    fn interrupted(&self) -> bool {
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!("Interrupted; aborting before the upgrade starts.");
        }
        cancelled
    }

    /// Look up the running version, assess, and emit the report.
    async fn assess<R: BufRead, W: Write>(
        &self,
        plan: &UpgradePlan,
        console: &mut Console<R, W>,
    ) -> Result<RiskReport, UpgradeError> {
        let cluster = &plan.request.cluster;
        info!("Running parameter precheck...");
        let source_version = match self.metadata.current_version(cluster) {
            Ok(version) if !version.is_empty() => version,
            Ok(_) => {
                warn!(cluster = %cluster, "cluster metadata carries no version");
                UNKNOWN_VERSION.to_string()
            }
            Err(err) => {
                warn!(cluster = %cluster, "unable to read current cluster metadata: {}", err);
                UNKNOWN_VERSION.to_string()
            }
        };

        let assessment = match &self.engine {
            Some(engine) => {
                precheck::run_with(engine, &source_version, &plan.request.version, &self.cancel).await
            }
            None => precheck::run(&source_version, &plan.request.version, &self.cancel).await,
        };
        let report = assessment.map_err(|err| {
                if err.is_cancelled() {
                    warn!("parameter precheck was cancelled");
                }
                err
            })?;
        report::output(
            &report,
            plan.report.format,
            plan.report.file.as_deref(),
            console.output(),
        )?;
        Ok(report)
    }

    async fn invoke(&self, request: &UpgradeRequest) -> Result<(), UpgradeError> {
        info!(pinned = request.pinned().count(), "starting cluster upgrade");
        self.upgrader
            .upgrade(request)
            .instrument(info_span!("upgrade_action", cluster = %request.cluster))
            .await?;
        info!("Upgraded cluster `{}` successfully", request.cluster);
        Ok(())
    }
}
