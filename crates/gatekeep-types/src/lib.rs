//! Shared types for Gatekeep
//!
//! This crate contains the data structures shared between the core
//! runtime and the front ends that drive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Session Types
// ============================================================================

/// How a session was authenticated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    #[default]
    Password,
    #[serde(alias = "code")]
    SingleCode,
}

/// An authenticated identity.
///
/// Sessions are immutable once created. Re-authentication produces a new
/// session that replaces the old one.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    /// User name, or the card code for single-code sessions
    pub principal: String,
    /// Password for password sessions; single-code sessions have none
    pub credential: Option<String>,
    /// Bearer token returned by the login endpoint
    pub token: String,
    pub login_type: LoginType,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        principal: impl Into<String>,
        credential: Option<String>,
        token: impl Into<String>,
        login_type: LoginType,
    ) -> Self {
        Self {
            principal: principal.into(),
            credential,
            token: token.into(),
            login_type,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("token", &"<redacted>")
            .field("login_type", &self.login_type)
            .field("created_at", &self.created_at)
            .finish()
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Client configuration supplied by the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Software identifier sent with every request
    pub soft_id: String,
    /// Client version reported to the service
    pub version: String,
    /// Hardware identifier bound to the account
    pub mac: String,
    /// Mirror base addresses, in priority order
    pub mirrors: Vec<String>,
    /// Per-mirror request timeout
    pub request_timeout_ms: u64,
    /// Interval between watchdog status checks
    pub watchdog_interval_secs: u64,
    /// Interval between announcement polls
    pub announcement_interval_secs: u64,
    /// Directory updates are downloaded into
    pub update_dir: PathBuf,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn announcement_interval(&self) -> Duration {
        Duration::from_secs(self.announcement_interval_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            soft_id: String::new(),
            version: String::new(),
            mac: String::new(),
            mirrors: vec![
                "http://api.1wxyun.com/".to_string(),
                "http://api2.1wxyun.com/".to_string(),
            ],
            request_timeout_ms: 2_000,
            watchdog_interval_secs: 5 * 60,
            announcement_interval_secs: 20 * 60,
            update_dir: PathBuf::from("update"),
        }
    }
}

// ============================================================================
// Update Types
// ============================================================================

/// Result of comparing the published version with the running one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    UpToDate { version: String },
    Available { version: String, url: String },
}

// ============================================================================
// Event Types
// ============================================================================

/// A session detail that may fail to load independently of the others
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionField {
    Value(String),
    Unavailable(String),
}

impl fmt::Display for SessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionField::Value(v) => write!(f, "{}", v),
            SessionField::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

/// Events emitted by the core to the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Display line produced by a chain step
    ChainOutput {
        run_id: Uuid,
        text: String,
    },
    ChainFinished {
        run_id: Uuid,
    },
    /// Result of one watchdog poll
    StatusCheck {
        healthy: bool,
        detail: String,
    },
    SessionInfo {
        expiry: SessionField,
        points: SessionField,
    },
    /// Authorization was lost; the process must shut down
    FatalFault {
        message: String,
    },
    Announcement {
        content: String,
    },
    DownloadProgress {
        id: Uuid,
        downloaded: u64,
        total: u64,
        percent: u8,
        speed_mbps: f64,
    },
    DownloadCompleted {
        id: Uuid,
        path: PathBuf,
    },
    DownloadFailed {
        id: Uuid,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_hides_secrets() {
        let session = Session::new("alice", Some("hunter22".into()), "TOKEN123", LoginType::Password);
        let rendered = format!("{:?}", session);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter22"));
        assert!(!rendered.contains("TOKEN123"));
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"soft_id":"abc","version":"1.2"}"#).unwrap();
        assert_eq!(config.soft_id, "abc");
        assert_eq!(config.mirrors.len(), 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.watchdog_interval(), Duration::from_secs(300));
    }

    #[test]
    fn login_type_accepts_short_code_name() {
        let parsed: LoginType = serde_json::from_str(r#""code""#).unwrap();
        assert_eq!(parsed, LoginType::SingleCode);
        assert_eq!(serde_json::to_string(&LoginType::SingleCode).unwrap(), r#""single_code""#);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = CoreEvent::FatalFault {
            message: "account locked".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FatalFault");
        assert_eq!(json["payload"]["message"], "account locked");
    }
}
