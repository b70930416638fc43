//! Single-stream file downloader with live progress
//!
//! One tokio task per download. The body is read in fixed 8 KiB chunks and
//! each chunk is written straight to the destination file.

use crate::engine::throughput::ThroughputWindow;
use crate::error::DownloadError;
use futures::TryStreamExt;
use gatekeep_types::CoreEvent;
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Read size for the response body
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Progress bookkeeping for one transfer
#[derive(Debug)]
pub struct DownloadState {
    total: u64,
    downloaded: u64,
    window: ThroughputWindow,
}

/// One progress sample, ready to publish
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub downloaded: u64,
    pub total: u64,
    pub percent: u8,
    pub speed_mbps: f64,
}

impl DownloadState {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            downloaded: 0,
            window: ThroughputWindow::new(),
        }
    }

    /// Account for a chunk read at `at`
    pub fn advance(&mut self, at: Instant, bytes: u64) -> ProgressSample {
        self.downloaded += bytes;
        let speed_mbps = self.window.record(at, bytes);
        ProgressSample {
            downloaded: self.downloaded,
            total: self.total,
            percent: self.percent(),
            speed_mbps,
        }
    }

    /// Whole percent, rounded down
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.downloaded as u128 * 100) / self.total as u128;
        pct.min(100) as u8
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// A running download
#[derive(Debug)]
pub struct DownloadHandle {
    pub id: Uuid,
    pub destination: PathBuf,
    task: JoinHandle<Result<PathBuf, DownloadError>>,
}

impl DownloadHandle {
    /// Wait for the transfer to finish
    pub async fn join(self) -> Result<PathBuf, DownloadError> {
        self.task
            .await
            .map_err(|e| DownloadError::Worker(e.to_string()))?
    }
}

/// Starts downloads and reports their progress on the event bus
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl Downloader {
    pub fn new(event_tx: broadcast::Sender<CoreEvent>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("Gatekeep/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, event_tx })
    }

    /// Start downloading `url` into `destination` on a background task.
    ///
    /// Outcome events are published whether or not the handle is joined.
    pub fn start(
        &self,
        url: &str,
        destination: impl Into<PathBuf>,
    ) -> Result<DownloadHandle, DownloadError> {
        let url = url::Url::parse(url).map_err(|_| DownloadError::InvalidUrl(url.to_string()))?;
        let destination = destination.into();
        let id = Uuid::new_v4();

        info!(%id, url = %url, path = ?destination, "Starting download");

        let client = self.client.clone();
        let event_tx = self.event_tx.clone();
        let dest = destination.clone();
        let task = tokio::spawn(async move {
            let result = transfer(id, &client, url, &dest, &event_tx).await;
            match &result {
                Ok(path) => {
                    info!(%id, path = ?path, "Download completed");
                    let _ = event_tx.send(CoreEvent::DownloadCompleted {
                        id,
                        path: path.clone(),
                    });
                }
                Err(e) => {
                    error!(%id, error = %e, "Download failed");
                    let _ = event_tx.send(CoreEvent::DownloadFailed {
                        id,
                        error: e.to_string(),
                    });
                }
            }
            result
        });

        Ok(DownloadHandle {
            id,
            destination,
            task,
        })
    }
}

async fn transfer(
    id: Uuid,
    client: &Client,
    url: url::Url,
    destination: &Path,
    event_tx: &broadcast::Sender<CoreEvent>,
) -> Result<PathBuf, DownloadError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status(status.as_u16()));
    }

    let total: u64 = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(DownloadError::MissingContentLength)?;

    debug!(%id, total, "Content length");

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut file = File::create(destination).await?;

    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let mut body = StreamReader::new(stream);

    let mut state = DownloadState::new(total);
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = fill_chunk(&mut body, &mut buf).await?;
        if read == 0 {
            break;
        }

        file.write_all(&buf[..read]).await?;

        let sample = state.advance(Instant::now(), read as u64);
        let _ = event_tx.send(CoreEvent::DownloadProgress {
            id,
            downloaded: sample.downloaded,
            total: sample.total,
            percent: sample.percent,
            speed_mbps: sample.speed_mbps,
        });
    }

    // An empty body never enters the loop but still reports completion once
    if total == 0 {
        let sample = state.advance(Instant::now(), 0);
        let _ = event_tx.send(CoreEvent::DownloadProgress {
            id,
            downloaded: sample.downloaded,
            total: sample.total,
            percent: sample.percent,
            speed_mbps: sample.speed_mbps,
        });
    }

    file.flush().await?;
    file.sync_all().await?;

    if state.downloaded() < total {
        return Err(DownloadError::Truncated {
            received: state.downloaded(),
            expected: total,
        });
    }

    Ok(destination.to_path_buf())
}

/// Read until `buf` is full or the body ends
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_accumulates_and_reaches_100_once() {
        let start = Instant::now();
        let total = 20_000u64;
        let mut state = DownloadState::new(total);

        let mut samples = Vec::new();
        let mut remaining = total;
        let mut i = 0;
        while remaining > 0 {
            let chunk = remaining.min(CHUNK_SIZE as u64);
            samples.push(state.advance(start + Duration::from_millis(i * 10), chunk));
            remaining -= chunk;
            i += 1;
        }

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.last().unwrap().downloaded, total);
        assert!(samples.windows(2).all(|w| w[0].downloaded < w[1].downloaded));
        assert!(samples.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(samples.iter().filter(|s| s.percent == 100).count(), 1);
        assert_eq!(samples[0].percent, 40);
    }

    #[test]
    fn percent_rounds_down() {
        let mut state = DownloadState::new(3);
        let sample = state.advance(Instant::now(), 2);
        assert_eq!(sample.percent, 66);
    }

    #[test]
    fn zero_length_body_is_complete() {
        let state = DownloadState::new(0);
        assert_eq!(state.percent(), 100);
        assert_eq!(state.total(), 0);
    }

    #[tokio::test]
    async fn fill_chunk_spans_short_reads() {
        let data: Vec<u8> = (0..CHUNK_SIZE + 100).map(|i| i as u8).collect();
        let parts: Vec<io::Result<&[u8]>> = data.chunks(1000).map(Ok).collect();
        let mut reader = StreamReader::new(futures::stream::iter(parts));
        let mut buf = vec![0u8; CHUNK_SIZE];

        assert_eq!(fill_chunk(&mut reader, &mut buf).await.unwrap(), CHUNK_SIZE);
        assert_eq!(&buf[..], &data[..CHUNK_SIZE]);
        assert_eq!(fill_chunk(&mut reader, &mut buf).await.unwrap(), 100);
        assert_eq!(fill_chunk(&mut reader, &mut buf).await.unwrap(), 0);
    }
}
