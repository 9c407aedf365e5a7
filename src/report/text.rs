use std::io::{self, Write};

use colored::Colorize;

use super::or_unknown;
use crate::precheck::{RiskItem, RiskLevel, RiskReport};

const RULE: &str = "-------------------------------------------------------------------";

/// Write the human-readable report.
///
/// With `colorize` set, severity tags are colored for a terminal; the
/// `colored` crate still drops the escapes when stdout is not a TTY.
pub fn write_report<W: Write>(w: &mut W, report: &RiskReport, colorize: bool) -> io::Result<()> {
    writeln!(w, "Running parameter precheck...")?;
    writeln!(w, "  Source Version: {}", or_unknown(&report.source_version))?;
    writeln!(w, "  Target Version: {}", or_unknown(&report.target_version))?;
    writeln!(w)?;

    let summary = report.summary();
    writeln!(w, "[PRECHECK REPORT - SUMMARY]")?;
    writeln!(w, "Found {} potential risks:", summary.total)?;
    writeln!(w, "  - [{}]: {}", RiskLevel::High, summary.high)?;
    writeln!(w, "  - [{}]: {}", RiskLevel::Medium, summary.medium)?;
    writeln!(w)?;

    for level in RiskLevel::DISPLAY_ORDER {
        let items = report.items(level);
        if items.is_empty() {
            continue;
        }
        writeln!(w, "{}", RULE)?;
        for item in items {
            write_item(w, item, colorize)?;
        }
    }

    if summary.total == 0 {
        writeln!(w, "No parameter risks detected.")?;
    }
    writeln!(w, "{}", RULE)?;
    Ok(())
}

fn write_item<W: Write>(w: &mut W, item: &RiskItem, colorize: bool) -> io::Result<()> {
    let tag = format!("[{}]", item.level);
    let tag = if colorize {
        colorize_risk(item.level, &tag).to_string()
    } else {
        tag
    };
    if item.category.is_empty() {
        writeln!(w, "{}", tag)?;
    } else {
        writeln!(w, "{} ({})", tag, item.category)?;
    }
    for (label, value) in item.fields() {
        writeln!(w, "  - {}: {}", label, value)?;
    }
    writeln!(w)
}

/// Helper to colorize a severity tag for terminal output.
fn colorize_risk(level: RiskLevel, tag: &str) -> colored::ColoredString {
    match level {
        RiskLevel::High => tag.red().bold(),
        RiskLevel::Medium => tag.yellow().bold(),
        RiskLevel::Low => tag.green().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    fn render(report: &RiskReport) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, report, false).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_report_contents() {
        let out = render(&sample_report());
        for expect in [
            "Source Version: v6.5.0",
            "Target Version: v7.1.0",
            "[PRECHECK REPORT - SUMMARY]",
            "Found 2 potential risks:",
            "  - [HIGH RISK]: 1",
            "  - [MEDIUM RISK]: 1",
            "[HIGH RISK] (Config Deprecated)",
            "  - Component: TiKV",
            "  - Parameter: raftstore.notify-capacity",
            "  - R&D Comments: Adjust capacity planning",
            "[MEDIUM RISK]",
            "  - New Default: 1024",
            "tidb_index_join_batch_size",
        ] {
            assert!(out.contains(expect), "expected {expect:?} in:\n{out}");
        }
        assert!(!out.contains("No parameter risks detected."));
    }

    #[test]
    fn test_high_bucket_printed_before_medium() {
        let out = render(&sample_report());
        let high = out.find("raftstore.notify-capacity").unwrap();
        let medium = out.find("tidb_index_join_batch_size").unwrap();
        assert!(high < medium);
    }

    #[test]
    fn test_field_order_within_item() {
        let out = render(&sample_report());
        let positions: Vec<usize> = ["Component:", "Parameter:", "Scope:", "Current:", "Impact:", "Suggestion:", "R&D Comments:"]
            .iter()
            .map(|label| out.find(label).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_report() {
        let out = render(&RiskReport::new("", ""));
        assert!(out.contains("Source Version: (unknown)"));
        assert!(out.contains("Target Version: (unknown)"));
        assert!(out.contains("Found 0 potential risks:"));
        assert!(out.contains("No parameter risks detected."));
    }

    #[test]
    fn test_uncolored_output_has_no_escapes() {
        assert!(!render(&sample_report()).contains('\u{1b}'));
    }
}
