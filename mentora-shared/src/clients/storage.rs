use reqwest::StatusCode;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::Session;

/// Desired shape of one storage bucket.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSpec {
    pub name: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_mime_types: Vec<String>,
}

impl BucketSpec {
    pub fn new(name: impl Into<String>, public: bool) -> Self {
        Self {
            name: name.into(),
            public,
            file_size_limit: None,
            allowed_mime_types: Vec::new(),
        }
    }

    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.file_size_limit = Some(bytes);
        self
    }

    pub fn with_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// Client for the hosted storage bucket API.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl StorageClient {
    pub fn new(config: &ClientConfig) -> AppResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.storage_url(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Create the bucket if it does not already exist. An "already exists"
    /// conflict is success, so startup provisioning can run every time.
    pub async fn ensure_bucket(&self, session: &Session, spec: &BucketSpec) -> AppResult<()> {
        let url = format!("{}/bucket", self.base_url);
        let bearer = session.access_token().unwrap_or(&self.anon_key);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .json(spec)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(bucket = %spec.name, public = spec.public, "bucket created");
            return Ok(());
        }

        if status == StatusCode::CONFLICT {
            tracing::debug!(bucket = %spec.name, "bucket already exists");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(bucket = %spec.name, status = status.as_u16(), detail = %body, "bucket creation failed");
        Err(AppError::new(
            ErrorCode::BucketCreateFailed,
            format!("could not create bucket {}", spec.name),
        ))
    }
}
