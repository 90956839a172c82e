use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::api::ApiClient;
use crate::error::Result;

/// The configuration blocks exposed by the settings screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSection {
    Ui,
    Security,
    Execution,
    Storage,
    Integrations,
    Developer,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 6] = [
        SettingsSection::Ui,
        SettingsSection::Security,
        SettingsSection::Execution,
        SettingsSection::Storage,
        SettingsSection::Integrations,
        SettingsSection::Developer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsSection::Ui => "ui",
            SettingsSection::Security => "security",
            SettingsSection::Execution => "execution",
            SettingsSection::Storage => "storage",
            SettingsSection::Integrations => "integrations",
            SettingsSection::Developer => "developer",
        }
    }
}

impl fmt::Display for SettingsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key/value settings document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub Map<String, Value>);

impl Settings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Copies every key of `other` over this document.
    pub fn merge(&mut self, other: Settings) {
        self.0.extend(other.0);
    }
}

impl ApiClient {
    pub async fn get_settings(&self, section: SettingsSection) -> Result<Settings> {
        self.get_json(&["settings", section.as_str()]).await
    }

    /// Stores `settings` and returns the document as saved by the server.
    pub async fn update_settings(
        &self,
        section: SettingsSection,
        settings: &Settings,
    ) -> Result<Settings> {
        let saved = self
            .send_json(Method::PUT, &["settings", section.as_str()], settings)
            .await?;
        tracing::info!(section = %section, keys = settings.0.len(), "Updated settings");
        Ok(saved)
    }
}
