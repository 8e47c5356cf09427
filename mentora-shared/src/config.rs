use serde::Deserialize;

use crate::errors::{AppError, AppResult};

/// Connection parameters for the Remote Data Service.
///
/// The service URL and publishable key have no fallback: a missing value is
/// a fatal startup error rather than a client that silently points nowhere.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub service_url: String,
    pub anon_key: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_changes_path")]
    pub changes_path: String,
}

fn default_schema() -> String { "public".into() }
fn default_changes_path() -> String { "/realtime/v1/changes".into() }

impl ClientConfig {
    pub fn new(service_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            anon_key: anon_key.into(),
            schema: default_schema(),
            changes_path: default_changes_path(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MENTORA").separator("__"))
            .build()?;
        let loaded: Self = config.try_deserialize().map_err(|e| {
            anyhow::anyhow!("missing or invalid MENTORA_* configuration: {e}")
        })?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.service_url.trim().is_empty() {
            return Err(AppError::config("service_url must not be empty"));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AppError::config("anon_key must not be empty"));
        }
        Ok(())
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.service_url.trim_end_matches('/'))
    }

    pub fn functions_url(&self) -> String {
        format!("{}/functions/v1", self.service_url.trim_end_matches('/'))
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.service_url.trim_end_matches('/'))
    }

    pub fn changes_url(&self) -> String {
        format!(
            "{}{}",
            self.service_url.trim_end_matches('/'),
            self.changes_path
        )
    }
}
