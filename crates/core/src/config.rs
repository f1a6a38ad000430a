use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};

/// Runtime configuration for the action, built once in `main` and handed to
/// the orchestration by value. All values come from the environment, matching
/// the input surface GitHub Actions exposes to composite steps.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional bearer credential for the build collector channel.
    pub access_token: Option<String>,
    pub artifact: ArtifactConfig,
    pub collector: CollectorConfig,
    pub github: GitHubConfig,
    /// Optional overall deadline for the whole invocation.
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub id: String,
    pub names: Option<String>,
    pub names_delimiter: String,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Collector host, optionally with a port. No scheme.
    pub host: String,
    /// Use plaintext HTTP instead of TLS.
    pub insecure: bool,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub actor: String,
    pub commit_id: String,
    /// Name of the workflow job to match, exactly as it appears in the run.
    pub job_name: String,
    pub repo_slug: RepoSlug,
    pub run_id: u64,
    pub server_url: String,
    pub token: String,
}

/// An `owner/repo` pair, split on the first separator at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoSlug {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((owner, repo)) = s.split_once('/') else {
            bail!("expected repository slug in owner/repo form, got {s:?}");
        };
        Ok(Self { owner: owner.to_owned(), repo: repo.to_owned() })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> { Self::from_vars(&std::env::vars().collect()) }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            access_token: optional(vars, "ACCESS_TOKEN"),
            artifact: ArtifactConfig {
                id: required(vars, "ARTIFACT_ID")?,
                names: optional(vars, "ARTIFACT_NAMES"),
                names_delimiter: required(vars, "ARTIFACT_NAMES_DELIMITER")?,
            },
            collector: CollectorConfig {
                host: required(vars, "BUILD_COLLECTOR_HOST")?,
                insecure: flag(vars, "BUILD_COLLECTOR_INSECURE")?,
            },
            github: GitHubConfig {
                actor: required(vars, "GITHUB_ACTOR")?,
                commit_id: required(vars, "GITHUB_SHA")?,
                job_name: required(vars, "GITHUB_JOB")?,
                repo_slug: required(vars, "GITHUB_REPOSITORY")?.parse()?,
                run_id: required(vars, "GITHUB_RUN_ID")?
                    .parse()
                    .context("invalid value for GITHUB_RUN_ID")?,
                server_url: required(vars, "GITHUB_SERVER_URL")?,
                token: required(vars, "GITHUB_TOKEN")?,
            },
            deadline: match optional(vars, "DEADLINE_SECONDS") {
                Some(value) => Some(Duration::from_secs(
                    value.parse().context("invalid value for DEADLINE_SECONDS")?,
                )),
                None => None,
            },
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String> {
    match vars.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => bail!("missing required environment variable {name}"),
    }
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|value| !value.is_empty()).cloned()
}

fn flag(vars: &HashMap<String, String>, name: &str) -> Result<bool> {
    let Some(value) = optional(vars, name) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => bail!("invalid boolean value {value:?} for {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        [
            ("ARTIFACT_ID", "docker.io/rode/demo@sha256:abc123"),
            ("ARTIFACT_NAMES_DELIMITER", "\n"),
            ("BUILD_COLLECTOR_HOST", "collector.example.com:8443"),
            ("GITHUB_ACTOR", "octocat"),
            ("GITHUB_SHA", "foobar"),
            ("GITHUB_JOB", "build"),
            ("GITHUB_REPOSITORY", "rode/create-build-occurrence-action"),
            ("GITHUB_RUN_ID", "1234"),
            ("GITHUB_SERVER_URL", "https://github.com"),
            ("GITHUB_TOKEN", "ghp_token"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    #[test]
    fn parses_a_complete_environment() {
        let config = Config::from_vars(&vars()).unwrap();
        assert_eq!(config.artifact.id, "docker.io/rode/demo@sha256:abc123");
        assert_eq!(config.collector.host, "collector.example.com:8443");
        assert!(!config.collector.insecure);
        assert_eq!(config.github.run_id, 1234);
        assert_eq!(config.github.repo_slug.owner, "rode");
        assert_eq!(config.github.repo_slug.repo, "create-build-occurrence-action");
        assert_eq!(config.access_token, None);
        assert_eq!(config.artifact.names, None);
        assert_eq!(config.deadline, None);
    }

    #[test]
    fn rejects_a_missing_required_variable() {
        let mut vars = vars();
        vars.remove("GITHUB_TOKEN");
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn treats_an_empty_value_as_missing() {
        let mut vars = vars();
        vars.insert("GITHUB_SHA".to_owned(), String::new());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn rejects_a_slug_without_a_separator() {
        let mut vars = vars();
        vars.insert("GITHUB_REPOSITORY".to_owned(), "no-separator".to_owned());
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("owner/repo"));
    }

    #[test]
    fn splits_the_slug_on_the_first_separator() {
        let slug: RepoSlug = "owner/repo/extra".parse().unwrap();
        assert_eq!(slug.owner, "owner");
        assert_eq!(slug.repo, "repo/extra");
        assert_eq!(slug.to_string(), "owner/repo/extra");
    }

    #[test]
    fn parses_the_insecure_flag() {
        for (value, expected) in [("true", true), ("1", true), ("false", false), ("0", false)] {
            let mut vars = vars();
            vars.insert("BUILD_COLLECTOR_INSECURE".to_owned(), value.to_owned());
            let config = Config::from_vars(&vars).unwrap();
            assert_eq!(config.collector.insecure, expected, "value {value:?}");
        }

        let mut vars = vars();
        vars.insert("BUILD_COLLECTOR_INSECURE".to_owned(), "maybe".to_owned());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn parses_the_optional_deadline() {
        let mut vars = vars();
        vars.insert("DEADLINE_SECONDS".to_owned(), "30".to_owned());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.deadline, Some(Duration::from_secs(30)));

        vars.insert("DEADLINE_SECONDS".to_owned(), "soon".to_owned());
        assert!(Config::from_vars(&vars).is_err());
    }
}
