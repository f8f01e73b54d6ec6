use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State file name in the config directory
pub const STATE_FILE: &str = "state.json";

/// What survives between runs: the session token, who it belongs to and the
/// preferred language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ClientState {
    path: PathBuf,
    pub data: StateData,
}

impl ClientState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: StateData::default(),
        }
    }

    /// Open the state file at `path`, starting empty when it does not exist.
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut state = Self::new(path);
        state.load()?;
        Ok(state)
    }

    /// Load state from disk. Returns whether a file was found.
    pub fn load(&mut self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&self.path).context("Failed to read state file")?;
        self.data = serde_json::from_str(&contents).context("Failed to parse state file")?;
        debug!(path = %self.path.display(), has_token = self.data.token.is_some(), "Loaded client state");
        Ok(true)
    }

    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.data.saved_at = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, contents).context("Failed to write state file")?;
        Ok(())
    }

    /// Forget the session but keep the language preference.
    pub fn clear_session(&mut self) -> Result<()> {
        self.data.token = None;
        self.data.user_id = None;
        self.save()
    }

    /// Remove the state file entirely
    pub fn clear(&mut self) -> Result<()> {
        self.data = StateData::default();
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove state file")?;
        }
        Ok(())
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.data.token = token.filter(|t| !t.trim().is_empty());
    }

    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.data.user_id = user_id;
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.data.lang = Some(lang.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.data.user_id.as_deref()
    }

    pub fn lang(&self) -> Option<&str> {
        self.data.lang.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = ClientState::open(dir.path().join(STATE_FILE)).unwrap();
        assert_eq!(state.data, StateData::default());
        assert!(state.token().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STATE_FILE);

        let mut state = ClientState::new(path.clone());
        state.set_token(Some("tok".to_string()));
        state.set_user_id(Some("U1".to_string()));
        state.set_lang("zh-TW");
        state.save().unwrap();

        let reloaded = ClientState::open(path).unwrap();
        assert_eq!(reloaded.token(), Some("tok"));
        assert_eq!(reloaded.user_id(), Some("U1"));
        assert_eq!(reloaded.lang(), Some("zh-TW"));
        assert!(reloaded.data.saved_at.is_some());
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let mut state = ClientState::new(PathBuf::from("unused.json"));
        state.set_token(Some("  ".to_string()));
        assert!(state.token().is_none());
    }

    #[test]
    fn test_clear_session_keeps_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        let mut state = ClientState::new(path.clone());
        state.set_token(Some("tok".to_string()));
        state.set_lang("en");
        state.save().unwrap();

        state.clear_session().unwrap();
        let reloaded = ClientState::open(path.clone()).unwrap();
        assert!(reloaded.token().is_none());
        assert_eq!(reloaded.lang(), Some("en"));

        state.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let err = ClientState::open(path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
