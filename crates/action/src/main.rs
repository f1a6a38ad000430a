//! Entry point for the create-build-occurrence action.
//!
//! Bootstrap only: logging, configuration, client construction. The actual
//! pipeline lives in [`action`]. On success the occurrence id is published
//! as the action's single output variable; any failure exits non-zero with a
//! one-line message and no output.

mod action;

use std::{process::ExitCode, sync::Arc};

use build_occurrence_collector::CollectorClient;
use build_occurrence_core::config::Config;
use build_occurrence_github::GitHub;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::action::CreateBuildOccurrenceAction;

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => return fatal(&format!("unable to build config: {err:#}")),
    };

    let github = match GitHub::new(&config.github) {
        Ok(github) => github,
        Err(err) => return fatal(&format!("unable to create GitHub client: {err:#}")),
    };
    let collector = match CollectorClient::new(&config.collector, config.access_token.clone()) {
        Ok(collector) => collector,
        Err(err) => return fatal(&format!("unable to create collector client: {err:#}")),
    };

    let action = CreateBuildOccurrenceAction::new(config, Arc::new(github), Arc::new(collector));

    match action.run().await {
        Ok(occurrence_id) => {
            set_output_variable("id", &occurrence_id);
            ExitCode::SUCCESS
        }
        Err(err) => fatal(&err.to_string()),
    }
}

/// Publish an action output via the workflow command protocol.
fn set_output_variable(name: &str, value: &str) { println!("::set-output name={name}::{value}"); }

fn fatal(message: &str) -> ExitCode {
    eprintln!("{message}");
    ExitCode::FAILURE
}
