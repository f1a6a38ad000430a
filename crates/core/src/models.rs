use serde::Serialize;
use time::UtcDateTime;

use crate::config::{ArtifactConfig, Config};

/// A job within a workflow run, as reported by the CI platform. Fetched fresh
/// for every invocation, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowJob {
    pub id: u64,
    pub name: String,
    /// The job detail page. Used verbatim as the occurrence's provenance id.
    pub html_url: String,
    pub started_at: UtcDateTime,
}

/// The artifact a build occurrence asserts provenance for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl Artifact {
    /// Build the artifact from configuration. The optional names string is
    /// split on the configured delimiter; tokens are trimmed and empty ones
    /// dropped, preserving order and duplicates.
    pub fn from_config(config: &ArtifactConfig) -> Self {
        let names = match &config.names {
            Some(names) => names
                .split(config.names_delimiter.as_str())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect(),
            None => Vec::new(),
        };
        Self { id: config.id.clone(), names }
    }
}

/// Everything the build collector needs to record an occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub artifacts: Vec<Artifact>,
    pub build_start: UtcDateTime,
    pub build_end: UtcDateTime,
    pub commit_id: String,
    pub commit_uri: String,
    pub creator: String,
    pub logs_uri: String,
    pub provenance_id: String,
    pub repository: String,
}

impl BuildRequest {
    /// Derive the request from static configuration and the resolved job.
    ///
    /// URIs are composed by plain concatenation of the server URL, the
    /// repository slug and fixed path segments; slug contents are not
    /// encoded or validated. `build_end` is the instant of assembly, not the
    /// completion time the platform reports for the job.
    pub fn assemble(config: &Config, job: &WorkflowJob) -> Self {
        let github = &config.github;
        let repository = format!("{}/{}", github.server_url, github.repo_slug);
        let commit_uri = format!("{}/commit/{}", repository, github.commit_id);
        let logs_uri = format!("{}/checks/{}/logs", commit_uri, job.id);

        Self {
            artifacts: vec![Artifact::from_config(&config.artifact)],
            build_start: job.started_at,
            build_end: UtcDateTime::now(),
            commit_id: github.commit_id.clone(),
            commit_uri,
            creator: github.actor.clone(),
            logs_uri,
            provenance_id: job.html_url.clone(),
            repository,
        }
    }
}
