use std::fmt;
use std::str::FromStr;

use super::ReportError;

/// Output format for a rendered precheck report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

impl OutputFormat {
    /// Parse a user-supplied format name. Matching is case-insensitive;
    /// an empty string selects text.
    pub fn parse(raw: &str) -> Result<OutputFormat, ReportError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "txt" => Ok(OutputFormat::Text),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "html" | "htm" => Ok(OutputFormat::Html),
            _ => Err(ReportError::UnsupportedFormat(raw.to_string())),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}
