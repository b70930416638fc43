//! Output formatting utilities

use crate::OutputFormat;
use console::style;
use gatekeep_types::{LoginType, SessionField, UpdateStatus};
use serde::Serialize;
use std::fmt;

/// Print output in the specified format
pub fn print_output<T: Serialize + fmt::Display>(
    value: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Human => {
            println!("{}", value);
        }
    }
    Ok(())
}

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Print a success line
pub fn success(message: impl fmt::Display) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Outcome of a login, without the token
#[derive(Debug, Serialize)]
pub struct LoginReport {
    pub principal: String,
    pub login_type: LoginType,
    pub expiry: Option<SessionField>,
    pub points: Option<SessionField>,
}

impl fmt::Display for LoginReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.login_type {
            LoginType::Password => "password",
            LoginType::SingleCode => "single code",
        };
        write!(
            f,
            "{} Logged in as {} ({})",
            style("✓").green().bold(),
            style(&self.principal).cyan(),
            kind
        )?;
        if let Some(expiry) = &self.expiry {
            write!(f, "\n  Expires: {}", expiry)?;
        }
        if let Some(points) = &self.points {
            write!(f, "\n  Points:  {}", points)?;
        }
        Ok(())
    }
}

/// Update check result
#[derive(Debug, Serialize)]
pub struct UpdateReport {
    pub current: String,
    #[serde(flatten)]
    pub status: UpdateStatus,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            UpdateStatus::UpToDate { .. } => write!(
                f,
                "{} Version {} is up to date",
                style("✓").green().bold(),
                self.current
            ),
            UpdateStatus::Available { version, url } => write!(
                f,
                "{} New version {} available (current {})\n  Download: {}",
                style("↑").yellow().bold(),
                style(version).bold(),
                self.current,
                url
            ),
        }
    }
}

/// Render an announcement in a box
pub fn format_announcement(content: &str) -> String {
    let width = content
        .lines()
        .map(|l| console::measure_text_width(l))
        .max()
        .unwrap_or(0)
        .max(12);
    let rule = "─".repeat(width + 2);

    let mut out = format!("┌{}┐\n", rule);
    out.push_str(&format!("│ {:<width$} │\n", "Announcement", width = width));
    out.push_str(&format!("├{}┤\n", rule));
    for line in content.lines() {
        let pad = width - console::measure_text_width(line);
        out.push_str(&format!("│ {}{} │\n", line, " ".repeat(pad)));
    }
    out.push_str(&format!("└{}┘", rule));
    out
}
