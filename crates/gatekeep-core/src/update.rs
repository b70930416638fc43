//! Update check and destination naming

use crate::error::CallError;
use crate::transport::ApiClient;
use gatekeep_types::UpdateStatus;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used when the download URL has no usable last segment
const FALLBACK_FILE_NAME: &str = "update.bin";

/// Compare the published version against the running one
pub async fn check_update(api: &ApiClient) -> Result<UpdateStatus, CallError> {
    let latest = api.get_latest_version().await?;

    if !is_newer(&latest, api.version()) {
        info!(current = api.version(), latest = %latest, "Client is up to date");
        return Ok(UpdateStatus::UpToDate { version: latest });
    }

    let url = api.get_download_url().await?;
    info!(current = api.version(), latest = %latest, url = %url, "Update available");
    Ok(UpdateStatus::Available {
        version: latest,
        url,
    })
}

/// Whether `candidate` is a later version than `current`.
///
/// Dot-separated numeric versions compare component-wise, with missing
/// components treated as zero. Anything else compares as plain strings.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let candidate = candidate.trim();
    let current = current.trim();

    match (numeric_parts(candidate), numeric_parts(current)) {
        (Some(a), Some(b)) => compare_parts(&a, &b) == Ordering::Greater,
        _ => candidate > current,
    }
}

fn numeric_parts(version: &str) -> Option<Vec<u64>> {
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
    if version.is_empty() {
        return None;
    }
    version.split('.').map(|p| p.parse().ok()).collect()
}

fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Where an update downloaded from `url` is saved: `<dir>/<last path segment>`
pub fn update_destination(dir: &Path, url: &str) -> PathBuf {
    let name = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    dir.join(name)
}
