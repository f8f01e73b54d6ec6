//! Key lookup translation tables.
//!
//! A language is a flat JSON object mapping message keys to display
//! templates with `{name}` placeholders. Tables are loaded once per language
//! and swapped wholesale.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Translations {
    lang: String,
    messages: HashMap<String, String>,
}

impl Translations {
    pub fn new(lang: impl Into<String>, messages: HashMap<String, String>) -> Self {
        Self {
            lang: lang.into(),
            messages,
        }
    }

    pub fn from_json(lang: &str, json: &str) -> Result<Self> {
        let messages: HashMap<String, String> = serde_json::from_str(json)
            .with_context(|| format!("Failed to parse translations for {}", lang))?;
        Ok(Self::new(lang, messages))
    }

    /// Load `<dir>/<lang>.json`
    pub fn load(dir: &Path, lang: &str) -> Result<Self> {
        let path = dir.join(format!("{}.json", lang));
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read translations: {}", path.display()))?;
        let table = Self::from_json(lang, &contents)?;
        debug!(lang = lang, count = table.messages.len(), "Loaded translations from disk");
        Ok(table)
    }

    /// Fetch `<base_url>/<lang>.json`
    pub async fn fetch(client: &reqwest::Client, base_url: &str, lang: &str) -> Result<Self> {
        let url = format!("{}/{}.json", base_url.trim_end_matches('/'), lang);
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch translations from {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {} while fetching translations from {}", response.status(), url);
        }
        let body = response.text().await.context("Failed to read translations body")?;
        Self::from_json(lang, &body)
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// Translate `key`, substituting `{name}` placeholders.
    ///
    /// Unknown keys render as the key itself. A parameter value that is
    /// itself a known key is translated before substitution.
    pub fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut text = self.get(key).unwrap_or(key).to_string();
        for (name, value) in params {
            let value = self.get(value).unwrap_or(value);
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

/// The active translation table, shared by everything that renders text.
#[derive(Debug, Default)]
pub struct I18n {
    current: RwLock<Arc<Translations>>,
}

impl I18n {
    pub fn new(table: Translations) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    pub fn current(&self) -> Arc<Translations> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the whole table, e.g. after a language switch.
    pub fn swap(&self, table: Translations) {
        debug!(lang = %table.lang, "Switching translation table");
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::new(table),
            Err(poisoned) => {
                warn!("Translation lock poisoned, replacing table anyway");
                *poisoned.into_inner() = Arc::new(table);
            }
        }
    }

    pub fn lang(&self) -> String {
        self.current().lang().to_string()
    }

    pub fn t(&self, key: &str) -> String {
        self.current().t(key, &[])
    }

    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.current().t(key, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Translations {
        Translations::from_json(
            "en",
            r#"{
                "CONNECTION_FAILED": "Connection failed",
                "MONTH_YEAR_TEMPLATE": "{month}/{year}",
                "SALARY_NO_RECORD_TEXT": "No salary record for {month}",
                "STATUS_PUNCH_NORMAL": "Normal",
                "REASON_TEMPLATE": "Reason: {reason} ({reason})"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_key_renders_as_key() {
        assert_eq!(table().t("NOPE", &[]), "NOPE");
    }

    #[test]
    fn test_placeholder_substitution() {
        let t = table();
        assert_eq!(t.t("MONTH_YEAR_TEMPLATE", &[("year", "2025"), ("month", "6")]), "6/2025");
        assert_eq!(
            t.t("SALARY_NO_RECORD_TEXT", &[("month", "2025-06")]),
            "No salary record for 2025-06"
        );
    }

    #[test]
    fn test_param_values_are_translated() {
        let t = table();
        assert_eq!(
            t.t("REASON_TEMPLATE", &[("reason", "STATUS_PUNCH_NORMAL")]),
            "Reason: Normal (Normal)"
        );
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ja.json"), r#"{"LOADING": "読み込み中"}"#).unwrap();
        let t = Translations::load(dir.path(), "ja").unwrap();
        assert_eq!(t.lang(), "ja");
        assert_eq!(t.t("LOADING", &[]), "読み込み中");
        assert!(Translations::load(dir.path(), "fr").is_err());
    }

    #[test]
    fn test_swap_replaces_table() {
        let i18n = I18n::new(table());
        assert_eq!(i18n.t("CONNECTION_FAILED"), "Connection failed");
        i18n.swap(Translations::default());
        assert_eq!(i18n.t("CONNECTION_FAILED"), "CONNECTION_FAILED");
        assert_eq!(i18n.lang(), "");
    }
}
