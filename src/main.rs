mod cancel;
mod catalog;
mod config;
mod precheck;
mod prompt;
mod report;
mod rules;
mod upgrade;
mod version;

use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::cancel::CancellationToken;
use crate::report::OutputFormat;
use crate::upgrade::types::ComponentVersions;
use crate::upgrade::{
    ExternalExecutor, FileMetadataStore, Mode, Orchestrator, ReportTarget, UpgradeOptions,
    UpgradePlan, UpgradeRequest,
};

/// Exit status after an interrupt, matching what a shell reports for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How long in-flight work gets to wind down after an interrupt.
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// Upgrade a cluster to a specified version, after a parameter precheck
/// that warns about forced default changes and invalid upgrade paths.
#[derive(Parser, Debug)]
#[command(
    name = "cluster-upgrade",
    version,
    about,
    override_usage = "cluster-upgrade [precheck] <CLUSTER_NAME> <VERSION> [OPTIONS]"
)]
struct Cli {
    /// `[precheck] <cluster-name> <version>`; a leading `precheck` only
    /// runs the precheck and never upgrades
    #[arg(value_name = "ARGS", num_args = 2..=3, required = true)]
    args: Vec<String>,

    /// Run parameter precheck and exit without upgrading
    #[arg(long, conflicts_with = "without_precheck")]
    precheck: bool,

    /// Skip parameter precheck (dangerous)
    #[arg(long)]
    without_precheck: bool,

    /// Format for the precheck report (text, markdown, html)
    #[arg(long, value_name = "FORMAT")]
    precheck_output: Option<String>,

    /// Write the precheck report to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    precheck_output_file: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Force upgrade without transferring PD leader
    #[arg(long)]
    force: bool,

    /// Upgrade a stopped cluster
    #[arg(long)]
    offline: bool,

    /// Ignore checking if target version is bigger than current version
    #[arg(long)]
    ignore_version_check: bool,

    /// Ignore the config check result
    #[arg(long)]
    ignore_config_check: bool,

    /// Timeout in seconds when transferring PD and TiKV store leaders
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    transfer_timeout: u64,

    /// Timeout for after upgrade prompt (e.g. 90s, 5m)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "0s")]
    restart_timeout: Duration,

    /// Custom script to be executed on each server before the server is upgraded
    #[arg(long, value_name = "PATH")]
    pre_upgrade_script: Option<String>,

    /// Custom script to be executed on each server after the server is upgraded
    #[arg(long, value_name = "PATH")]
    post_upgrade_script: Option<String>,

    #[command(flatten)]
    components: ComponentVersionArgs,
}

/// Version pins; an empty value follows the cluster version.
#[derive(Args, Debug, Default)]
struct ComponentVersionArgs {
    /// Fix the version of tidb and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tidb_version: String,
    /// Fix the version of tikv and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tikv_version: String,
    /// Fix the version of pd and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    pd_version: String,
    /// Fix the version of tso and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tso_version: String,
    /// Fix the version of scheduling and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    scheduling_version: String,
    /// Fix the version of tiflash and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tiflash_version: String,
    /// Fix the version of tikv-cdc and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tikv_cdc_version: String,
    /// Fix the version of cdc and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    cdc_version: String,
    /// Fix the version of tiproxy and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tiproxy_version: String,
    /// Fix the version of tidb-dashboard and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    tidb_dashboard_version: String,
    /// Fix the version of alertmanager and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    alertmanager_version: String,
    /// Fix the version of node-exporter and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    node_exporter_version: String,
    /// Fix the version of blackbox-exporter and no longer follows the cluster version
    #[arg(long, value_name = "VERSION", default_value = "")]
    blackbox_exporter_version: String,
}

impl ComponentVersionArgs {
    /// Map keyed by component name; every component is present.
    fn into_map(self) -> Result<ComponentVersions, version::VersionError> {
        let pins = [
            ("tidb", self.tidb_version),
            ("tikv", self.tikv_version),
            ("pd", self.pd_version),
            ("tso", self.tso_version),
            ("scheduling", self.scheduling_version),
            ("tiflash", self.tiflash_version),
            ("tikv-cdc", self.tikv_cdc_version),
            ("cdc", self.cdc_version),
            ("tiproxy", self.tiproxy_version),
            ("tidb-dashboard", self.tidb_dashboard_version),
            ("alertmanager", self.alertmanager_version),
            ("node_exporter", self.node_exporter_version),
            ("blackbox_exporter", self.blackbox_exporter_version),
        ];
        pins.into_iter()
            .map(|(component, pin)| -> Result<(String, String), version::VersionError> {
                let pin = pin.trim();
                let pin = if pin.is_empty() {
                    String::new()
                } else {
                    version::normalize(pin)?
                };
                Ok((component.to_string(), pin))
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;
    let plan = build_plan(cli, &config)?;
    let _main_span = info_span!("upgrade", cluster = %plan.request.cluster, version = %plan.request.version).entered();
    debug!(mode = ?plan.mode, format = %plan.report.format, "resolved upgrade plan");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, aborting");
        on_interrupt.cancel();
        // A confirmation prompt blocked on stdin never looks at the token.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = tokio::time::sleep(INTERRUPT_GRACE) => {}
        }
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });

    let metadata = FileMetadataStore::new(config.home_dir());
    let executor = ExternalExecutor::new(config.executor_program(), config.executor_args());
    let orchestrator = Orchestrator::new(&metadata, &executor)
        .with_failure_policy(config.precheck.on_failure)
        .with_cancellation(cancel);

    let stdin = std::io::stdin();
    let mut console = prompt::Console::new(stdin.lock(), std::io::stdout());
    let outcome = orchestrator.run(&plan, &mut console).await?;
    info!(?outcome, "done");

    Ok(())
}

/// Turn parsed flags into a validated plan. Input errors surface here,
/// before any cluster is looked at.
fn build_plan(cli: Cli, config: &config::Config) -> Result<UpgradePlan, Box<dyn std::error::Error>> {
    let format_flag = cli
        .precheck_output
        .as_deref()
        .or(config.precheck.output.as_deref())
        .unwrap_or("text");
    let format = OutputFormat::parse(format_flag)?;

    let (standalone, cluster, target) = match cli.args.as_slice() {
        [first, cluster, target] if first.as_str() == "precheck" => (true, cluster, target),
        [cluster, target] => (false, cluster, target),
        _ => {
            return Err(
                "expected `[precheck] <cluster-name> <version>`; run with --help for usage".into(),
            )
        }
    };

    let mut request = UpgradeRequest::new(cluster.as_str(), version::normalize(target)?);
    request.component_versions = cli.components.into_map()?;
    request.skip_confirm = cli.yes;
    request.offline = cli.offline;
    request.ignore_version_check = cli.ignore_version_check;
    request.restart_timeout = cli.restart_timeout;
    request.options = UpgradeOptions {
        force: cli.force,
        ignore_config_check: cli.ignore_config_check,
        transfer_timeout: cli.transfer_timeout,
        pre_upgrade_script: cli.pre_upgrade_script,
        post_upgrade_script: cli.post_upgrade_script,
    };

    Ok(UpgradePlan {
        mode: Mode::resolve(standalone, cli.without_precheck, cli.precheck),
        request,
        report: ReportTarget {
            format,
            file: cli.precheck_output_file,
        },
    })
}

/// Parse a Go-style duration such as `90s`, `1m30s`, `1.5h` or `0`.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = 0f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {raw:?}"))?;
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;
        if !value.is_finite() {
            return Err(format!("invalid duration {raw:?}"));
        }
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(format!("unknown unit {unit:?} in duration {raw:?}")),
        };
        total += value * seconds_per_unit;
        rest = &rest[unit_len..];
    }
    Duration::try_from_secs_f64(total).map_err(|e| format!("invalid duration {raw:?}: {e}"))
}
