//! Transport - requests against the multi-mirror licensing service
//!
//! - Form-encoded POST per call, software identifier injected
//! - Fixed-order mirror failover, first answering mirror wins
//! - Plain-text responses, leading `-` marks an error code

mod client;
mod endpoints;
pub mod error_codes;

pub use client::*;
pub use endpoints::*;
