use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a changelog run.
#[derive(Debug, Error)]
pub enum ChangelogError
{
    /// The history provider answered without usable data.
    #[error("commit history is unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("no commits found since the last tag or the beginning of the git history")]
    NoCommitsFound,

    #[error("no valid conventional commits found since the last tag or the beginning of the git history")]
    NoValidCommits,

    #[error("GitHub request failed: {0}")]
    Github(#[from] octocrab::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems with the run configuration, raised before the pipeline starts.
#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("failed to read configuration `{path}`: {source}")]
    Read
    {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("commit type `{commit_type}` is listed in both `{first}` and `{second}` groups")]
    DuplicateType
    {
        commit_type: String,
        first: String,
        second: String,
    },

    #[error("no repository given (set GITHUB_REPOSITORY or pass --repository)")]
    MissingRepository,

    #[error("repository `{0}` is not in the `owner/repo` form")]
    InvalidRepository(String),

    #[error("a GitHub token is required to read the remote history (set GITHUB_TOKEN or pass --gh-token)")]
    MissingToken,
}
