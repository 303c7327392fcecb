//! HTTP implementation of [`SessionBackend`].
//!
//! The backend's JSON is loosely typed: ids may be strings or numbers and
//! may arrive under several keys, and a 200 response can still carry
//! `"success": false`. Each call is a single request: no retries, no
//! timeouts beyond the client defaults.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    backend::SessionBackend,
    config::TrackerConfig,
    errors::ApiError,
    metrics::{format_duration, format_pace},
    models::{CourseUpload, LocationPoint, RunningStats, SessionId},
};

const SESSION_ID_KEYS: &[&str] = &["sessionId", "session_id", "id"];
const COURSE_ID_KEYS: &[&str] = &["courseId", "course_id", "id"];

/// Stats body: the numeric fields plus the formatted strings the result
/// screen shows.
#[derive(Debug, Serialize)]
struct SubmitStatsRequest<'a> {
    #[serde(flatten)]
    stats: &'a RunningStats,
    duration: String,
    pace: String,
}

/// Session backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns `None` when no backend URL is configured.
    pub fn from_config(config: &TrackerConfig) -> Option<Self> {
        let backend = Self::new(config.backend_url.clone()?);
        Some(match &config.auth_token {
            Some(token) => backend.with_token(token.clone()),
            None => backend,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks if the backend is reachable.
    pub async fn check_health(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["health"])?;
        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(ApiError::BackendNotReachable(format!(
                "Health check returned status {}",
                resp.status()
            ))),
            Err(e) => Err(ApiError::BackendNotReachable(e.to_string())),
        }
    }

    /// Joins escaped path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn post(&self, url: Url) -> RequestBuilder {
        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends `request` and returns the parsed body, `Null` when empty.
    async fn send(request: RequestBuilder) -> Result<Value, ApiError> {
        let resp: Response = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            // The status is the error; the body is only context.
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;

        let value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::Null)
        };

        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let message = value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            return Err(ApiError::Rejected(message.to_string()));
        }

        Ok(value)
    }
}

/// Finds an id under any of `keys`, at the top level or under `data`.
fn extract_id(value: &Value, keys: &[&str]) -> Option<String> {
    let scopes = [Some(value), value.get("data")];
    scopes.into_iter().flatten().find_map(|scope| {
        keys.iter().find_map(|key| match scope.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn start_session(&self) -> Result<SessionId, ApiError> {
        let url = self.endpoint(&["sessions", "start"])?;
        let body = Self::send(self.post(url).json(&json!({}))).await?;
        let id = extract_id(&body, SESSION_ID_KEYS).ok_or(ApiError::MissingField("sessionId"))?;
        debug!("Backend issued session {id}");
        Ok(SessionId::new(id))
    }

    async fn upload_location(
        &self,
        session_id: &SessionId,
        point: &LocationPoint,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "locations"])?;
        Self::send(self.post(url).json(point)).await?;
        Ok(())
    }

    async fn submit_stats(
        &self,
        session_id: &SessionId,
        stats: &RunningStats,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "finish"])?;
        let body = SubmitStatsRequest {
            stats,
            duration: format_duration(stats.duration_sec),
            pace: format_pace(stats.pace_sec_per_km),
        };
        Self::send(self.post(url).json(&body)).await
    }

    async fn acquire_badges(&self, session_id: &SessionId) -> Result<(), ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "badges"])?;
        Self::send(self.post(url).json(&json!({}))).await?;
        Ok(())
    }

    async fn upload_course(&self, course: &CourseUpload) -> Result<String, ApiError> {
        let url = self.endpoint(&["courses"])?;
        let body = Self::send(self.post(url).json(course)).await?;
        extract_id(&body, COURSE_ID_KEYS).ok_or(ApiError::MissingField("courseId"))
    }
}
