//! Progress bar for update downloads

use crate::output::format_bytes;
use console::style;
use gatekeep_types::CoreEvent;
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

/// Terminal outcome of a tracked download
#[derive(Debug, Clone, PartialEq)]
pub enum Finished {
    Completed,
    Failed(String),
}

/// Renders progress events for one download
pub struct DownloadProgress {
    id: Uuid,
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new(id: Uuid, label: &str) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        bar.set_style(style);
        bar.set_message(label.to_string());
        Self { id, bar }
    }

    /// Apply an event; returns the outcome once the download ends
    pub fn handle_event(&self, event: &CoreEvent) -> Option<Finished> {
        match event {
            CoreEvent::DownloadProgress {
                id,
                downloaded,
                total,
                speed_mbps,
                ..
            } if *id == self.id => {
                self.bar.set_length(*total);
                self.bar.set_position(*downloaded);
                self.bar.set_message(format!(
                    "{} / {}  {:.2} Mbps",
                    format_bytes(*downloaded),
                    format_bytes(*total),
                    speed_mbps
                ));
                None
            }

            CoreEvent::DownloadCompleted { id, path } if *id == self.id => {
                self.bar.finish_with_message(format!(
                    "{} Saved to {}",
                    style("✓").green().bold(),
                    path.display()
                ));
                Some(Finished::Completed)
            }

            CoreEvent::DownloadFailed { id, error } if *id == self.id => {
                self.bar.abandon_with_message(format!(
                    "{} Failed: {}",
                    style("✗").red().bold(),
                    error
                ));
                Some(Finished::Failed(error.clone()))
            }

            _ => None,
        }
    }
}
