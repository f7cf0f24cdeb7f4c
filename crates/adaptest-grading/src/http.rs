//! HTTP grading service client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use adaptest_core::traits::{GradingClient, GradingRequest, GradingResult};

use crate::error::GradingError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Posts finished exams to `{base_url}/v1/exams/{exam_id}/attempts`.
pub struct HttpGradingClient {
    api_key: String,
    base_url: reqwest::Url,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpGradingClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: Option<u64>) -> anyhow::Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid grading base URL: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "grading base URL cannot carry a path: {base_url}"
        );

        Ok(Self {
            api_key: api_key.to_string(),
            base_url,
            timeout_secs,
            client,
        })
    }

    /// The exam id is a single percent-encoded path segment.
    fn attempts_url(&self, exam_id: &str) -> anyhow::Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                anyhow::anyhow!("grading base URL cannot carry a path: {}", self.base_url)
            })?
            .pop_if_empty()
            .extend(["v1", "exams", exam_id, "attempts"]);
        Ok(url)
    }
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[async_trait]
impl GradingClient for HttpGradingClient {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(exam = %request.exam_id, session = %request.session_id, answers = request.answers.len()))]
    async fn submit(&self, request: &GradingRequest) -> anyhow::Result<GradingResult> {
        let mut builder = self
            .client
            .post(self.attempts_url(&request.exam_id)?)
            .header("content-type", "application/json")
            .json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GradingError::Timeout(self.timeout_secs)
            } else {
                GradingError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(GradingError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(GradingError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(GradingError::ExamNotFound(request.exam_id.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GradingError::ApiError { status, message }.into());
        }

        let result: GradingResult = response.json().await.map_err(|e| GradingError::ApiError {
            status,
            message: format!("failed to parse response: {e}"),
        })?;

        tracing::debug!(attempt = %result.attempt_id, score = result.score, "graded");
        Ok(result)
    }
}
