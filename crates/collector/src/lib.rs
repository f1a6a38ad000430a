//! Client for the build collector service.
//!
//! The collector's `CreateBuild` call is reached through its JSON gateway:
//! one authenticated `POST /v1alpha1/builds` per invocation, returning the
//! identifier of the newly created occurrence.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use build_occurrence_core::{
    config::CollectorConfig,
    models::{Artifact, BuildRequest},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

/// How long to wait for the initial connection to the collector.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the collector channel. These surface as the opaque cause
/// behind the orchestration's "error creating build occurrence" stage label.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("collector returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("collector response is missing the build occurrence id")]
    MissingOccurrenceId,
}

/// Capability interface over the collector service. A single method so tests
/// can substitute a deterministic implementation.
#[async_trait]
pub trait BuildCollector: Send + Sync {
    /// Submit the request and return the server-assigned occurrence id.
    /// All-or-nothing: no occurrence exists unless this returns `Ok` with a
    /// non-empty identifier. Never retries.
    async fn create_build(&self, request: &BuildRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct CollectorClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

impl CollectorClient {
    /// Create a client for the configured collector host. The insecure flag
    /// selects plaintext HTTP; otherwise the channel uses TLS.
    pub fn new(config: &CollectorConfig, access_token: Option<String>) -> Result<Self> {
        let scheme = if config.insecure { "http" } else { "https" };
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create collector HTTP client")?;
        Ok(Self {
            base_url: format!("{scheme}://{}", config.host.trim_end_matches('/')),
            client,
            access_token,
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }
}

#[async_trait]
impl BuildCollector for CollectorClient {
    async fn create_build(&self, request: &BuildRequest) -> Result<String> {
        let body = CreateBuildBody::new(request)?;
        let url = format!("{}/v1alpha1/builds", self.base_url);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(CollectorError::from)?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(status, response.text().await.ok());
            return Err(CollectorError::Api { status: status.as_u16(), message }.into());
        }

        let response: CreateBuildResponse =
            response.json().await.map_err(CollectorError::from)?;
        if response.build_occurrence_id.is_empty() {
            return Err(CollectorError::MissingOccurrenceId.into());
        }
        Ok(response.build_occurrence_id)
    }
}

/// Prefer the response body as the failure detail; an unreadable or empty
/// body falls back to the status code's canonical reason.
fn error_message(status: reqwest::StatusCode, body: Option<String>) -> String {
    match body {
        Some(text) if !text.is_empty() => text,
        _ => status.canonical_reason().unwrap_or("unreadable response body").to_owned(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBuildBody {
    artifacts: Vec<Artifact>,
    build_start: String,
    build_end: String,
    commit_id: String,
    commit_uri: String,
    creator: String,
    logs_uri: String,
    provenance_id: String,
    repository: String,
}

impl CreateBuildBody {
    fn new(request: &BuildRequest) -> Result<Self> {
        Ok(Self {
            artifacts: request.artifacts.clone(),
            build_start: request
                .build_start
                .format(&Rfc3339)
                .context("Failed to format build start timestamp")?,
            build_end: request
                .build_end
                .format(&Rfc3339)
                .context("Failed to format build end timestamp")?,
            commit_id: request.commit_id.clone(),
            commit_uri: request.commit_uri.clone(),
            creator: request.creator.clone(),
            logs_uri: request.logs_uri.clone(),
            provenance_id: request.provenance_id.clone(),
            repository: request.repository.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBuildResponse {
    #[serde(default)]
    build_occurrence_id: String,
}
