use clap::Subcommand;
use com_moniker::{
    Comparison, FileTime, MonikerError, MonikerInfo, MonikerProvider, MonikerResult,
    filetime_to_string, friendly_com_hint,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Parse a display name and print what the moniker reports.
    Describe {
        /// Display name, e.g. `C:\data\book.xls!Sheet1`.
        name: String,
    },
    /// Compare two display names.
    Compare { left: String, right: String },
    /// List the monikers registered in the Running Object Table.
    Running,
}

pub struct App {
    provider: Arc<dyn MonikerProvider>,
}

impl App {
    pub fn new(provider: Arc<dyn MonikerProvider>) -> Self {
        Self { provider }
    }

    /// Runs one command and returns the lines to print.
    pub async fn run(&self, command: &Command) -> MonikerResult<Vec<String>> {
        match command {
            Command::Describe { name } => {
                let info = self.provider.describe(name).await?;
                tracing::info!(name = %name, kind = %info.kind, "Described moniker");
                Ok(render_info(&info))
            }
            Command::Compare { left, right } => {
                let cmp = self.provider.compare(left, right).await?;
                Ok(render_comparison(&cmp))
            }
            Command::Running => {
                let names = self.provider.list_running().await?;
                tracing::info!(count = names.len(), "Listed running objects");
                Ok(render_running(&names))
            }
        }
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

pub fn render_info(info: &MonikerInfo) -> Vec<String> {
    let last_change = info
        .last_change
        .map_or_else(|| "N/A".to_string(), |t| filetime_to_string(FileTime::from_datetime(t)));
    let size_max = info
        .size_max
        .map_or_else(|| "unknown".to_string(), |s| format!("{s} bytes"));

    let mut lines = vec![
        format!("Display name : {}", info.display_name),
        format!("Kind         : {}", info.kind),
        format!("Hash         : {}", info.hash),
        format!("Eaten        : {}", info.eaten),
        format!("Running      : {}", if info.running { "yes" } else { "no" }),
        format!("Last change  : {last_change}"),
        format!("Class id     : {}", or_unknown(info.class_id.as_deref())),
        format!("Size max     : {size_max}"),
    ];
    if !info.components.is_empty() {
        lines.push(format!("Components   : {}", info.components.len()));
        lines.extend(
            info.components
                .iter()
                .enumerate()
                .map(|(i, c)| format!("  [{i}] {c}")),
        );
    }
    lines
}

pub fn render_comparison(cmp: &Comparison) -> Vec<String> {
    vec![
        format!("Equal         : {}", if cmp.equal { "yes" } else { "no" }),
        format!(
            "Common prefix : {}",
            cmp.common_prefix.as_deref().unwrap_or("(none)")
        ),
        format!(
            "Relative path : {}",
            cmp.relative_path.as_deref().unwrap_or("(none)")
        ),
    ]
}

pub fn render_running(names: &[String]) -> Vec<String> {
    if names.is_empty() {
        return vec!["No objects registered in the Running Object Table".to_string()];
    }
    let mut lines = vec![format!("{} running object(s):", names.len())];
    lines.extend(names.iter().map(|n| format!("  {n}")));
    lines
}

/// One-line error message, with a hint when the status code has one.
///
/// COM failures already carry their hint in `Display`.
pub fn error_message(e: &MonikerError) -> String {
    match (e, friendly_com_hint(e)) {
        (MonikerError::Com { .. }, _) | (_, None) => format!("Error: {e}"),
        (_, Some(hint)) => format!("Error: {hint} ({e})"),
    }
}
