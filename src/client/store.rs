use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::error::ClientError;

const SESSION_FILE: &str = "session.json";
const TOKEN_FILE: &str = "token";

/// The locally persisted attempt session. Surviving a restart is what keeps
/// the deadline from resetting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub quiz_id: i64,
    pub session_id: String,
    pub deadline: DateTime<Utc>,
}

/// File-backed client state: the current session and the credential token,
/// stored separately.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load_session(&self) -> Result<Option<SessionRecord>, ClientError> {
        match fs::read(self.dir.join(SESSION_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_session(&self, record: &SessionRecord) -> Result<(), ClientError> {
        self.write_atomic(SESSION_FILE, &serde_json::to_vec_pretty(record)?)
    }

    pub fn clear_session(&self) -> Result<(), ClientError> {
        match fs::remove_file(self.dir.join(SESSION_FILE)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn load_token(&self) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(self.dir.join(TOKEN_FILE)) {
            Ok(token) => Ok(Some(token.trim().to_string()).filter(|t| !t.is_empty())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_token(&self, token: &str) -> Result<(), ClientError> {
        self.write_atomic(TOKEN_FILE, token.as_bytes())
    }

    // Write-then-rename so a crash never leaves a half-written file behind.
    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", name));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }
}
