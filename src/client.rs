//! HTTP client for a remote weekplan store (`wkpl serve`).
//!
//! Configuration comes from [`PlannerConfig`]; the URL and API key can be
//! overridden with `WEEKPLAN_URL` and `WEEKPLAN_API_KEY`.
//!
//! Every request carries a timeout. Idempotent reads are retried with a
//! linear backoff; writes are sent exactly once, because replaying a bulk
//! write or a move would double-allocate hours.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::models::*;
use crate::store::{ScheduleStore, StoreError, StoreResult};

/// Delay added per retry attempt for idempotent reads.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// HTTP client for the weekplan store API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    read_retries: u32,
    client: Client,
}

impl StoreClient {
    /// Create a client from loaded configuration.
    pub fn from_config(config: &PlannerConfig) -> StoreResult<Self> {
        Self::new(
            config.store_url.clone(),
            config.api_key.clone(),
            config.request_timeout(),
            config.read_retries,
        )
    }

    /// Create with explicit configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        read_retries: u32,
    ) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
            read_retries,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Http(e)
        }
    }

    /// Convert a non-success status into a StoreError.
    async fn status_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(body),
            StatusCode::BAD_REQUEST => StoreError::BadRequest(body),
            StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
            _ => StoreError::Server(format!("{}: {}", status, body)),
        }
    }

    /// Handle response, converting HTTP errors to StoreError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> StoreResult<T> {
        if response.status().is_success() {
            response.json().await.map_err(|e| self.transport_error(e))
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// Handle response that may return empty body (204 No Content).
    async fn handle_empty_response(&self, response: reqwest::Response) -> StoreResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// GET with retries on transport failures and 5xx responses.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> StoreResult<T> {
        let mut attempt = 0;
        loop {
            let result = match self.request(Method::GET, path).send().await {
                Ok(response) => self.handle_response(response).await,
                Err(e) => Err(self.transport_error(e)),
            };

            match result {
                Err(e) if attempt < self.read_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!("GET {} failed ({}), retry {}/{}", path, e, attempt, self.read_retries);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn send_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> StoreResult<T> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(response).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> StoreResult<()> {
        let response = self
            .request(method, path)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_empty_response(response).await
    }
}

fn is_retryable(e: &StoreError) -> bool {
    matches!(
        e,
        StoreError::Http(_) | StoreError::Timeout(_) | StoreError::Server(_)
    )
}

#[async_trait]
impl ScheduleStore for StoreClient {
    async fn list_tasks(&self, include_deleted: bool) -> StoreResult<Vec<Task>> {
        self.get_json(&format!("/tasks?include_deleted={}", include_deleted))
            .await
    }

    async fn create_task(&self, input: &CreateTaskInput) -> StoreResult<Task> {
        self.send_json(Method::POST, "/tasks", input).await
    }

    async fn update_task(&self, id: Uuid, input: &UpdateTaskInput) -> StoreResult<Task> {
        self.send_json(Method::PUT, &format!("/tasks/{}", id), input)
            .await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.send_empty(Method::DELETE, &format!("/tasks/{}", id))
            .await
    }

    async fn soft_delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.send_empty(Method::POST, &format!("/tasks/{}/soft_delete", id))
            .await
    }

    async fn list_schedule_rows(&self) -> StoreResult<Vec<ScheduleRow>> {
        self.get_json("/schedules").await
    }

    async fn replace_schedule(&self, rows: &[NewScheduleRow]) -> StoreResult<Vec<ScheduleRow>> {
        let body = BulkScheduleInput {
            schedules: rows.to_vec(),
        };
        self.send_json(Method::POST, "/schedules/bulk", &body).await
    }

    async fn set_completed(&self, row_id: Uuid, completed: bool) -> StoreResult<()> {
        let action = if completed { "complete" } else { "incomplete" };
        self.send_empty(Method::POST, &format!("/schedules/{}/{}", row_id, action))
            .await
    }

    async fn move_hours(&self, input: &MoveHoursInput) -> StoreResult<()> {
        // Not retried: a replayed move would shift the hours twice.
        let response = self
            .request(Method::POST, "/schedules/move")
            .json(input)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_empty_response(response).await
    }

    async fn weekly_progress(&self) -> StoreResult<WeeklyProgress> {
        self.get_json("/schedules/progress").await
    }
}
