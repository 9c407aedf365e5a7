use std::fmt::Write;

use super::{or_unknown, PRODUCT_NAME};
use crate::precheck::{RiskLevel, RiskReport};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:1.5em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left;vertical-align:top}\
.high h3{color:#b00020}.medium h3{color:#b36b00}.low h3{color:#2e7d32}";

pub fn render(report: &RiskReport) -> String {
    let summary = report.summary();
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{} Upgrade Precheck Report</title>", PRODUCT_NAME);
    let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>", STYLE);
    let _ = writeln!(html, "<h1>{} Upgrade Precheck Report</h1>", PRODUCT_NAME);
    let _ = writeln!(
        html,
        "<p><strong>Source Version:</strong> {} &nbsp; <strong>Target Version:</strong> {}</p>",
        escape(or_unknown(&report.source_version)),
        escape(or_unknown(&report.target_version))
    );

    html.push_str("<h2>Summary</h2>\n<table>\n<tr><th>Severity</th><th>Count</th></tr>\n");
    let _ = writeln!(html, "<tr><td>High</td><td>{}</td></tr>", summary.high);
    let _ = writeln!(html, "<tr><td>Medium</td><td>{}</td></tr>", summary.medium);
    let _ = writeln!(html, "<tr><td>Low</td><td>{}</td></tr>", summary.low);
    let _ = writeln!(html, "<tr><th>Total</th><th>{}</th></tr>\n</table>", summary.total);

    if summary.total == 0 {
        html.push_str("<p>No parameter risks detected.</p>\n");
    }

    for level in RiskLevel::DISPLAY_ORDER {
        let items = report.items(level);
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(
            html,
            "<section class=\"{}\">\n<h2>{} ({})</h2>",
            css_class(level),
            level,
            items.len()
        );
        for item in items {
            let heading = if item.category.is_empty() {
                level.to_string()
            } else {
                item.category.clone()
            };
            let _ = writeln!(html, "<h3>{}</h3>\n<table>", escape(&heading));
            for (label, value) in item.fields() {
                let _ = writeln!(
                    html,
                    "<tr><th>{}</th><td>{}</td></tr>",
                    escape(label),
                    escape(value)
                );
            }
            html.push_str("</table>\n");
        }
        html.push_str("</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn css_class(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "high",
        RiskLevel::Medium => "medium",
        RiskLevel::Low => "low",
    }
}

/// Entity-encode markup characters. Identifiers made of letters, digits,
/// `_`, `.` and `-` are left as they are.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precheck::RiskItem;
    use crate::report::tests::sample_report;

    #[test]
    fn test_html_doctype_and_items() {
        let html = render(&sample_report());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("raftstore.notify-capacity"));
        assert!(html.contains("tidb_index_join_batch_size"));
        assert!(html.contains("<section class=\"high\">"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let mut report = RiskReport::new("v6.5.0", "v7.1.0");
        report.push(RiskItem::new(RiskLevel::Medium, "A & B", "<script>x</script>"));
        let html = render(&report);
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_parameter_names_are_verbatim_or_entity_encoded() {
        let mut report = RiskReport::new("v6.5.0", "v7.1.0");
        for name in ["tidb_server_memory_limit", "raftstore.store-pool-size", "a<b&\"c\""] {
            let mut item = RiskItem::new(RiskLevel::Low, "c", "i");
            item.parameter = name.to_string();
            report.push(item);
        }
        let html = render(&report);
        assert!(html.contains("tidb_server_memory_limit"));
        assert!(html.contains("raftstore.store-pool-size"));
        assert!(html.contains("a&lt;b&amp;&quot;c&quot;"));
        assert!(!html.contains("a<b&"));
    }

    #[test]
    fn test_unknown_versions() {
        let html = render(&RiskReport::new("", ""));
        assert!(html.contains("(unknown)"));
        assert!(html.contains("No parameter risks detected."));
    }
}
