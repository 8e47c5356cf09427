use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::Session;

#[derive(Debug, Deserialize)]
struct FunctionErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for named remote functions (link preview resolution, checkout
/// session creation). Request body is a small JSON object; response is
/// JSON on success or a non-2xx status with an error message.
#[derive(Clone)]
pub struct FunctionsClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl FunctionsClient {
    pub fn new(config: &ClientConfig) -> AppResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.functions_url(),
            anon_key: config.anon_key.clone(),
        })
    }

    pub async fn invoke<T: DeserializeOwned>(
        &self,
        session: &Session,
        name: &str,
        body: &impl Serialize,
    ) -> AppResult<T> {
        let url = format!("{}/{name}", self.base_url);
        let bearer = session.access_token().unwrap_or(&self.anon_key);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let value = response.json::<T>().await?;
            return Ok(value);
        }

        let error_body = response
            .json::<FunctionErrorBody>()
            .await
            .unwrap_or(FunctionErrorBody { error: None, message: None });
        let message = error_body
            .error
            .or(error_body.message)
            .unwrap_or_else(|| format!("function {name} failed with {status}"));

        tracing::warn!(function = name, status = status.as_u16(), detail = %message, "function invocation failed");
        Err(AppError::new(ErrorCode::FunctionFailed, message))
    }
}
