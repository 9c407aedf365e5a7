use std::fmt::Write;

use super::{or_unknown, PRODUCT_NAME};
use crate::precheck::{RiskLevel, RiskReport};

pub fn render(report: &RiskReport) -> String {
    let mut md = String::new();
    let summary = report.summary();

    let _ = writeln!(md, "# {} Upgrade Precheck Report\n", PRODUCT_NAME);
    let _ = writeln!(
        md,
        "**Source Version:** {} | **Target Version:** {}\n",
        cell(or_unknown(&report.source_version)),
        cell(or_unknown(&report.target_version))
    );

    md.push_str("## Summary\n\n");
    md.push_str("| Severity | Count |\n|---|---|\n");
    let _ = writeln!(md, "| High | {} |", summary.high);
    let _ = writeln!(md, "| Medium | {} |", summary.medium);
    let _ = writeln!(md, "| Low | {} |", summary.low);
    let _ = writeln!(md, "| **Total** | **{}** |\n", summary.total);

    if summary.total == 0 {
        md.push_str("No parameter risks detected.\n");
        return md;
    }

    for level in RiskLevel::DISPLAY_ORDER {
        let items = report.items(level);
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(md, "## {} ({})\n", level, items.len());
        for (n, item) in items.iter().enumerate() {
            if item.category.is_empty() {
                let _ = writeln!(md, "### {}. {}\n", n + 1, level);
            } else {
                let _ = writeln!(md, "### {}. {}\n", n + 1, cell(&item.category));
            }
            md.push_str("| Field | Value |\n|---|---|\n");
            for (label, value) in item.fields() {
                let _ = writeln!(md, "| {} | {} |", label, cell(value));
            }
            md.push('\n');
        }
    }
    md
}

/// Keep a value on one table row.
///
/// Plain parameter names pass through untouched; only `|` and line breaks
/// are rewritten.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', "<br>")
}
