//! Directory-backed session persistence: `<root>/<id>/session.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::core::language::Language;
use crate::core::session::{Iteration, Session, validate_session};
use crate::error::{AiterateError, Result};
use crate::io::fsutil::write_atomic;

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (and create if needed) the storage root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("create storage directory {}", root.display()))
            .map_err(AiterateError::persistence)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join(SESSION_FILE_NAME)
    }

    #[instrument(skip_all, fields(language = %language))]
    pub fn create_session(&self, description: &str, language: Language) -> Result<Session> {
        let session = Session::new(description, language, Utc::now());
        self.write(&session)?;
        debug!(id = %session.id, "session created");
        Ok(session)
    }

    /// Append the next-numbered iteration and rewrite the whole record.
    #[instrument(skip_all, fields(id = %id, success))]
    pub fn add_iteration(
        &self,
        id: &str,
        test_code: &str,
        code: &str,
        test_logs: &str,
        success: bool,
    ) -> Result<Iteration> {
        let mut session = self.get_session(id)?;
        let iteration = session
            .push_iteration(test_code, code, test_logs, success, Utc::now())
            .clone();
        self.write(&session)?;
        debug!(number = iteration.number, "iteration recorded");
        Ok(iteration)
    }

    pub fn get_session(&self, id: &str) -> Result<Session> {
        // Ids are path components; anything but a uuid cannot name a stored session.
        if Uuid::parse_str(id).is_err() {
            return Err(AiterateError::NotFound(id.to_string()));
        }
        let path = self.session_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(AiterateError::NotFound(id.to_string()));
            }
            Err(err) => {
                return Err(AiterateError::Persistence(format!(
                    "read {}: {err}",
                    path.display()
                )));
            }
        };
        let session: Session =
            serde_json::from_str(&contents).map_err(|err| AiterateError::CorruptRecord {
                id: id.to_string(),
                message: err.to_string(),
            })?;
        if session.id != id {
            return Err(AiterateError::CorruptRecord {
                id: id.to_string(),
                message: format!("record carries id '{}'", session.id),
            });
        }
        let errors = validate_session(&session);
        if !errors.is_empty() {
            return Err(AiterateError::CorruptRecord {
                id: id.to_string(),
                message: errors.join("; "),
            });
        }
        Ok(session)
    }

    /// Every readable session, oldest first. Unreadable records are skipped.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("read storage directory {}", self.root.display()))
            .map_err(AiterateError::persistence)?;

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry
                .context("read storage entry")
                .map_err(AiterateError::persistence)?;
            if !entry.path().join(SESSION_FILE_NAME).is_file() {
                continue;
            }
            let name = entry.file_name();
            let id = name.to_string_lossy();
            match self.get_session(&id) {
                Ok(session) => sessions.push(session),
                Err(err) => warn!(id = %id, err = %err, "skipping unreadable session"),
            }
        }
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    fn write(&self, session: &Session) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(session)
            .context("serialize session")
            .map_err(AiterateError::persistence)?;
        buf.push('\n');
        write_atomic(&self.session_path(&session.id), &buf).map_err(AiterateError::persistence)
    }
}
