//! Report rendering for the CLI

use serde::Serialize;

/// Output format selected with `--format`
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Render a report as pretty JSON or as the caller's text form.
///
/// The text form is built lazily; JSON rendering never invokes it.
pub fn render<T: Serialize>(
    data: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => text(),
    }
}
