pub mod format;
pub mod html;
pub mod markdown;
pub mod text;

pub use format::OutputFormat;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::precheck::RiskReport;
use crate::version::UNKNOWN_VERSION;

/// Product name used in report headings.
pub const PRODUCT_NAME: &str = "TiDB";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unsupported precheck output format {0:?} (expected text, markdown or html)")]
    UnsupportedFormat(String),

    #[error("Failed to write precheck report: {0}")]
    Write(#[from] std::io::Error),
}

/// Render a report into a standalone payload.
pub fn render(report: &RiskReport, format: OutputFormat) -> Result<Vec<u8>, ReportError> {
    let payload = match format {
        OutputFormat::Text => {
            let mut buf = Vec::new();
            text::write_report(&mut buf, report, false)?;
            buf
        }
        OutputFormat::Markdown => markdown::render(report).into_bytes(),
        OutputFormat::Html => html::render(report).into_bytes(),
    };
    Ok(payload)
}

/// Emit the report to the console stream or to a file.
///
/// Plain text without a file goes straight to `out` with terminal colors.
/// Every other combination renders a payload first, then writes it to
/// `out` or to `path`.
#[instrument(skip(report, format, out), fields(format = %format, high = report.high().len(), medium = report.medium().len(), low = report.low().len()))]
pub fn output<W: Write>(
    report: &RiskReport,
    format: OutputFormat,
    path: Option<&Path>,
    out: &mut W,
) -> Result<(), ReportError> {
    if format == OutputFormat::Text && path.is_none() {
        debug!("writing report to console");
        text::write_report(out, report, true)?;
        out.flush()?;
        return Ok(());
    }

    let payload = render(report, format)?;
    match path {
        None => {
            debug!(bytes = payload.len(), "writing rendered report to console");
            out.write_all(&payload)?;
            writeln!(out)?;
            out.flush()?;
        }
        Some(path) => {
            debug!(path = %path.display(), bytes = payload.len(), "writing report to file");
            write_file(path, &payload)?;
            info!("Precheck report saved to {}", path.display());
        }
    }
    Ok(())
}

/// Write `payload` to `path`, creating it as rw-r--r-- on unix.
fn write_file(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(payload)?;
    file.sync_all()
}

fn or_unknown(version: &str) -> &str {
    if version.is_empty() {
        UNKNOWN_VERSION
    } else {
        version
    }
}
