//! Job listing against the GitHub Actions API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use build_occurrence_core::{config::GitHubConfig, models::WorkflowJob};
use octocrab::Octocrab;
use serde::Deserialize;
use time::{OffsetDateTime, UtcDateTime};

/// Capability interface over the platform's job-listing API. A single method
/// so tests can substitute a deterministic implementation.
#[async_trait]
pub trait JobLister: Send + Sync {
    /// List the jobs belonging to a workflow run, in provider order.
    /// Issues exactly one call; no pagination.
    async fn list_jobs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<WorkflowJob>>;
}

#[derive(Clone)]
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(config.token.clone())
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobLister for GitHub {
    async fn list_jobs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<WorkflowJob>> {
        let response: WorkflowJobs = self
            .client
            .get(format!("/repos/{owner}/{repo}/actions/runs/{run_id}/jobs"), None::<&()>)
            .await?;
        tracing::debug!("Fetched {} jobs for run {}", response.jobs.len(), run_id);
        Ok(response.jobs.into_iter().map(WorkflowJob::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowJobs {
    jobs: Vec<JobPayload>,
}

#[derive(Debug, Deserialize)]
struct JobPayload {
    id: u64,
    name: String,
    html_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    started_at: Option<OffsetDateTime>,
}

impl From<JobPayload> for WorkflowJob {
    fn from(job: JobPayload) -> Self {
        Self {
            id: job.id,
            name: job.name,
            html_url: job.html_url.unwrap_or_default(),
            started_at: job
                .started_at
                .and_then(|dt| UtcDateTime::from_unix_timestamp_nanos(dt.unix_timestamp_nanos()).ok())
                .unwrap_or(UtcDateTime::UNIX_EPOCH),
        }
    }
}
