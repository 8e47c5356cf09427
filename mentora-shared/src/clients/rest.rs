use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::Session;

/// Backend code for "query matched no rows". Application logic treats it as
/// an empty result, not an error.
const NO_ROWS_CODE: &str = "PGRST116";

/// Error body returned by the Remote Data Service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Table-scoped read/update client for the Remote Data Service.
///
/// Every request carries the publishable key plus a bearer token: the
/// session's access token when signed in, the publishable key otherwise.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> AppResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.rest_url(),
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn table(&self, name: &str) -> TableQuery<'_> {
        TableQuery {
            client: self,
            table: name.to_string(),
            params: Vec::new(),
        }
    }

    /// Invoke a named database procedure with a JSON parameter map.
    pub async fn rpc(
        &self,
        session: &Session,
        name: &str,
        params: &serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let url = format!("{}/rpc/{name}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(session))
            .json(params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let value = response.json::<serde_json::Value>().await?;
            return Ok(value);
        }

        Err(self.error_from_response(status, response, ErrorCode::QueryFailed).await)
    }

    fn bearer<'a>(&'a self, session: &'a Session) -> &'a str {
        session.access_token().unwrap_or(&self.anon_key)
    }

    async fn error_from_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
        fallback: ErrorCode,
    ) -> AppError {
        let body = response
            .json::<ServiceErrorBody>()
            .await
            .unwrap_or(ServiceErrorBody { code: None, message: None });

        let message = body.message.unwrap_or_else(|| format!("request failed with {status}"));

        if body.code.as_deref() == Some(NO_ROWS_CODE) {
            return AppError::not_found(message);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::permission_denied(message)
            }
            StatusCode::NOT_FOUND => AppError::not_found(message),
            _ => AppError::with_details(
                fallback,
                message,
                serde_json::json!({ "status": status.as_u16(), "code": body.code }),
            ),
        }
    }
}

/// Builder for one table-scoped request: equality filters, ordering, limit.
pub struct TableQuery<'a> {
    client: &'a RestClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> TableQuery<'a> {
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params.push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{column}.desc")));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params.push(("order".to_string(), format!("{column}.asc")));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    /// Apply a limit/offset window in one step.
    pub fn page(self, page: &crate::types::PageRequest) -> Self {
        self.limit(page.limit()).offset(page.offset())
    }

    /// Fetch all matching rows. A "no rows found" backend code comes back
    /// as an empty vec.
    pub async fn select<T: DeserializeOwned>(mut self, session: &Session) -> AppResult<Vec<T>> {
        if !self.params.iter().any(|(k, _)| k == "select") {
            self.params.push(("select".to_string(), "*".to_string()));
        }

        let url = format!("{}/{}", self.client.base_url, self.table);
        let response = self
            .client
            .http
            .get(&url)
            .header("apikey", &self.client.anon_key)
            .bearer_auth(self.client.bearer(session))
            .query(&self.params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let rows = response.json::<Vec<T>>().await?;
            return Ok(rows);
        }

        let err = self
            .client
            .error_from_response(status, response, ErrorCode::QueryFailed)
            .await;
        if err.is_not_found() {
            tracing::debug!(table = %self.table, "no rows matched, returning empty result");
            return Ok(Vec::new());
        }
        Err(err)
    }

    /// Update all rows matching the accumulated filters. Returns the
    /// updated rows; an empty result means no row matched the filters.
    pub async fn update<T: DeserializeOwned>(
        self,
        session: &Session,
        patch: &impl Serialize,
    ) -> AppResult<Vec<T>> {
        let url = format!("{}/{}", self.client.base_url, self.table);
        let response = self
            .client
            .http
            .patch(&url)
            .header("apikey", &self.client.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.client.bearer(session))
            .query(&self.params)
            .json(patch)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let rows = response.json::<Vec<T>>().await?;
            return Ok(rows);
        }

        Err(self
            .client
            .error_from_response(status, response, ErrorCode::UpdateFailed)
            .await)
    }

    #[cfg(test)]
    fn query_params(&self) -> &[(String, String)] {
        &self.params
    }
}
