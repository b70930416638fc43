//! Saved login details
//!
//! One record per data directory, stored as `login_info.json`. Password and
//! single-code logins keep their own remember / auto-login flags; saving a
//! login of one kind resets the other kind's fields.

use chrono::{DateTime, Utc};
use gatekeep_types::LoginType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the credential record
pub const CREDENTIAL_FILE: &str = "login_info.json";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to access credential file: {0}")]
    Io(#[from] io::Error),

    #[error("credential file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRecord {
    pub username: String,
    /// Only kept when `remember_password` is set
    pub password: String,
    pub remember_password: bool,
    pub auto_login: bool,
    /// Only kept when `code_remember_password` is set
    pub code_password: String,
    pub code_remember_password: bool,
    pub code_auto_login: bool,
    pub last_login_type: LoginType,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Credentials for an unattended login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoLogin {
    Password { username: String, password: String },
    Code { code: String },
}

impl CredentialRecord {
    pub fn for_password(username: &str, password: &str, remember: bool, auto_login: bool) -> Self {
        Self {
            username: username.to_string(),
            password: if remember { password.to_string() } else { String::new() },
            remember_password: remember,
            auto_login,
            last_login_type: LoginType::Password,
            saved_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn for_code(code: &str, remember: bool, auto_login: bool) -> Self {
        Self {
            code_password: if remember { code.to_string() } else { String::new() },
            code_remember_password: remember,
            code_auto_login: auto_login,
            last_login_type: LoginType::SingleCode,
            saved_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Credentials to log in with unattended, if the record allows it.
    /// Password auto-login wins when both are enabled.
    pub fn auto_login(&self) -> Option<AutoLogin> {
        if self.auto_login && !self.username.is_empty() && !self.password.is_empty() {
            return Some(AutoLogin::Password {
                username: self.username.clone(),
                password: self.password.clone(),
            });
        }
        if self.code_auto_login && !self.code_password.is_empty() {
            return Some(AutoLogin::Code {
                code: self.code_password.clone(),
            });
        }
        None
    }
}

/// Storage for the credential record
pub trait CredentialRepository {
    /// Load the record; `None` when nothing was saved yet
    fn load(&self) -> Result<Option<CredentialRecord>, CredentialError>;

    fn save(&self, record: &CredentialRecord) -> Result<(), CredentialError>;

    fn clear(&self) -> Result<(), CredentialError>;
}

/// JSON file backed credential store
#[derive(Debug, Clone)]
pub struct JsonCredentialStore {
    path: PathBuf,
}

impl JsonCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in `<data_dir>/login_info.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CREDENTIAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialRepository for JsonCredentialStore {
    fn load(&self) -> Result<Option<CredentialRecord>, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_the_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonCredentialStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);

        let record = CredentialRecord::for_password("alice01", "secret01", true, true);
        store.save(&record).unwrap();
        assert!(store.path().ends_with(CREDENTIAL_FILE));
        assert_eq!(store.load().unwrap(), Some(record));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn password_is_dropped_unless_remembered() {
        let record = CredentialRecord::for_password("alice01", "secret01", false, true);
        assert_eq!(record.password, "");
        assert_eq!(record.username, "alice01");
        assert_eq!(record.auto_login(), None);
    }

    #[test]
    fn each_login_type_keeps_its_own_flags() {
        let password = CredentialRecord::for_password("alice01", "secret01", true, false);
        assert!(password.remember_password);
        assert!(!password.code_remember_password);
        assert_eq!(password.last_login_type, LoginType::Password);

        let code = CredentialRecord::for_code("ABCDEF0123456789", true, true);
        assert!(code.code_remember_password);
        assert!(code.code_auto_login);
        assert!(!code.remember_password);
        assert_eq!(code.username, "");
        assert_eq!(code.last_login_type, LoginType::SingleCode);
        assert_eq!(
            code.auto_login(),
            Some(AutoLogin::Code {
                code: "ABCDEF0123456789".into()
            })
        );
    }

    #[test]
    fn password_auto_login_wins() {
        let record = CredentialRecord {
            username: "alice01".into(),
            password: "secret01".into(),
            auto_login: true,
            code_password: "ABCDEF0123456789".into(),
            code_auto_login: true,
            ..Default::default()
        };
        assert!(matches!(record.auto_login(), Some(AutoLogin::Password { .. })));
    }

    #[test]
    fn reads_records_without_newer_fields() {
        let dir = TempDir::new().unwrap();
        let store = JsonCredentialStore::in_dir(dir.path());
        fs::write(
            store.path(),
            r#"{"username": "", "password": "", "remember_password": false,
                "auto_login": false, "code_password": "ABCDEF0123456789",
                "code_remember_password": true, "code_auto_login": true,
                "last_login_type": "code"}"#,
        )
        .unwrap();

        let record = store.load().unwrap().unwrap();
        assert_eq!(record.last_login_type, LoginType::SingleCode);
        assert_eq!(record.saved_at, None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonCredentialStore::in_dir(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(CredentialError::Json(_))));
    }
}
