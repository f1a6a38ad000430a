//! The single orchestration routine: resolve the originating job, assemble
//! the occurrence request, submit it to the collector.

use std::{sync::Arc, time::Duration};

use build_occurrence_collector::BuildCollector;
use build_occurrence_core::{
    config::Config,
    models::{BuildRequest, WorkflowJob},
};
use build_occurrence_github::JobLister;
use thiserror::Error;

/// Every failure is terminal for the invocation; nothing is retried and no
/// partial state is left behind.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("error listing jobs: {0:#}")]
    Listing(anyhow::Error),

    #[error("unable to find job with id {0}")]
    JobNotFound(String),

    #[error("error creating build occurrence: {0:#}")]
    Submission(anyhow::Error),

    #[error("deadline of {0:?} exceeded while creating build occurrence")]
    Cancelled(Duration),
}

pub struct CreateBuildOccurrenceAction {
    config: Config,
    jobs: Arc<dyn JobLister>,
    collector: Arc<dyn BuildCollector>,
}

impl CreateBuildOccurrenceAction {
    pub fn new(
        config: Config,
        jobs: Arc<dyn JobLister>,
        collector: Arc<dyn BuildCollector>,
    ) -> Self {
        Self { config, jobs, collector }
    }

    /// Run the pipeline once: resolve job, build request, submit. Returns the
    /// occurrence id the collector assigned, or the first error encountered.
    /// The collector is never contacted unless job resolution succeeded.
    /// A configured deadline bounds the whole invocation; when it fires, the
    /// in-flight call is dropped and no subsequent step is attempted.
    pub async fn run(&self) -> Result<String, ActionError> {
        match self.config.deadline {
            Some(timeout) => match tokio::time::timeout(timeout, self.execute()).await {
                Ok(result) => result,
                Err(_) => Err(ActionError::Cancelled(timeout)),
            },
            None => self.execute().await,
        }
    }

    async fn execute(&self) -> Result<String, ActionError> {
        let job = self.find_job().await?;
        let request = BuildRequest::assemble(&self.config, &job);

        tracing::info!("Sending request to build collector");
        let occurrence_id =
            self.collector.create_build(&request).await.map_err(ActionError::Submission)?;

        tracing::info!("Successfully created build occurrence, id is {occurrence_id}");
        Ok(occurrence_id)
    }

    /// Fetch the run's jobs and select the first whose name matches the
    /// configured job name exactly. Zero matches is an error.
    async fn find_job(&self) -> Result<WorkflowJob, ActionError> {
        let github = &self.config.github;
        let slug = &github.repo_slug;

        tracing::info!("Fetching jobs for workflow");
        let jobs = self
            .jobs
            .list_jobs(&slug.owner, &slug.repo, github.run_id)
            .await
            .map_err(ActionError::Listing)?;

        jobs.into_iter()
            .find(|job| job.name == github.job_name)
            .ok_or_else(|| ActionError::JobNotFound(github.job_name.clone()))
    }
}
