//! HTTP client for a running planner server.
//!
//! Configuration is via environment variables:
//! - `STUDY_PLANNER_URL` - Base URL (default: `http://localhost:3000/api/v1`)
//! - `STUDY_PLANNER_API_KEY` - API key for authentication (optional for local)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

/// Default URL for local development.
const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct PlannerClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl PlannerClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("STUDY_PLANNER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("STUDY_PLANNER_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }

    /// Check that the server is up.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .request(reqwest::Method::GET, "/health")
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<StudyPlanWithTopics, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/plans/{}", id))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn get_dashboard(&self, plan_id: Uuid) -> Result<Dashboard, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/plans/{}/dashboard", plan_id))
            .send()
            .await?;
        self.handle_response(response).await
    }
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        _ => ClientError::Server(format!("{}: {}", status, body)),
    }
}
