//! Execution engine
//!
//! - Task chain runner on a dedicated worker thread
//! - Single-stream downloader with sliding-window speed
//! - Pause/resume/stop control for chains

mod downloader;
mod task_chain;
mod throughput;

pub use downloader::*;
pub use task_chain::*;
pub use throughput::*;
