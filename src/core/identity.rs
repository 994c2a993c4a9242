//! # Visitor Identity
//!
//! The `user_id`/`session_id` pair attached to analytics. Stored as a small
//! JSON file (`~/.concierge/identity.json`) so the same visitor keeps the same
//! user id across runs, while every widget session gets a fresh session id.
//!
//! Writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub session_id: String,
    /// Unix seconds when this session id was issued.
    #[serde(default)]
    pub issued_at: i64,
}

impl Identity {
    /// An identity that is never persisted (tests, no home directory).
    pub fn ephemeral() -> Self {
        Self {
            user_id: new_user_id(),
            session_id: new_session_id(),
            issued_at: Utc::now().timestamp(),
        }
    }
}

/// Generate a new UUID v4 user ID.
pub fn new_user_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short, human-friendly session ID (first 8 hex chars of a UUID v4).
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn identity_path(dir: &Path) -> PathBuf {
    dir.join("identity.json")
}

/// Loads the stored user id (if any), issues a new session id, and writes
/// the pair back.
pub fn load_or_create(dir: &Path) -> io::Result<Identity> {
    fs::create_dir_all(dir)?;
    let path = identity_path(dir);

    let user_id = match fs::read_to_string(&path) {
        Ok(json) => match serde_json::from_str::<Identity>(&json) {
            Ok(stored) if !stored.user_id.is_empty() => stored.user_id,
            Ok(_) => new_user_id(),
            Err(e) => {
                warn!("Ignoring unreadable identity file {}: {}", path.display(), e);
                new_user_id()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_user_id(),
        Err(e) => return Err(e),
    };

    let identity = Identity {
        user_id,
        session_id: new_session_id(),
        issued_at: Utc::now().timestamp(),
    };
    atomic_write_json(&path, &identity)?;
    debug!(
        "Identity ready: user={} session={}",
        identity.user_id, identity.session_id
    );
    Ok(identity)
}
