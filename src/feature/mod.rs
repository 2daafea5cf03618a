use log::{info, warn};

use crate::libs::{config::RunContext, error::ChangelogError};

pub mod classify;
pub mod compose;
pub mod conventional;
pub mod history;
pub mod output;
pub mod render;

use history::HistorySource;

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changelog
{
    Published
    {
        text:   String,
        lines:  Vec<String>,
    },
    /// Every classified commit was excluded or ungrouped and nothing broke.
    NothingToPublish,
}

/// History -> classification -> composition -> template.
pub async fn generate<S>(source: &S, context: &RunContext) -> Result<Changelog, ChangelogError>
where
    S: HistorySource + ?Sized,
{
    let latest_tag = source.resolve_latest_tag().await?;
    match &latest_tag
    {
        Some(tag) => info!("Latest Tag: {} ({})", tag.name, tag.commit_id),
        None => info!("No latest tag found, the history starts at the first commit."),
    }

    let commits = history::collect_release_commits(source, latest_tag.as_ref()).await?;
    if commits.is_empty()
    {
        return Err(ChangelogError::NoCommitsFound);
    }

    let classification = classify::classify(&commits, &context.config);
    if classification.parsed.is_empty()
    {
        return Err(ChangelogError::NoValidCommits);
    }

    let lines = compose::compose(&classification.parsed, &classification.breaking, &context.config, context.use_icons);
    if lines.is_empty()
    {
        warn!("Nothing to add to the changelog: every commit type is excluded or ungrouped.");
        return Ok(Changelog::NothingToPublish);
    }

    for line in lines.iter()
    {
        info!("{}", line);
    }

    let text = render::render(context.config.template.as_deref(), &lines);
    Ok(Changelog::Published { text, lines })
}

#[cfg(test)]
fn context(config: crate::libs::config::ChangelogConfig) -> RunContext
{
    RunContext::new("octo/hello", "master", false, config).unwrap()
}

#[tokio::test]
async fn test_generate()
{
    use crate::libs::commit::ReleaseTag;

    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let tag = ReleaseTag { name: "v1.0.0".to_string(), commit_id: "p1c0".to_string() };
    let source = history::MockHistory::numbered(Some(tag), &[2, 3]);

    let mut config = crate::libs::config::ChangelogConfig::builtin();
    config.template = Some("## Changes\n\n$changes".to_string());

    match generate(&source, &context(config)).await.unwrap()
    {
        Changelog::Published { text, lines } =>
        {
            assert_eq!(lines.len(), 4);
            assert_eq!(lines[0], "### Новая функциональность");
            assert!(lines[1].starts_with("- [`p0c0`](https://github.com/octo/hello/commit/p0c0) - change 0-0"));
            assert!(lines[3].contains("change 1-0"));
            assert!(text.starts_with("## Changes\n\n### Новая функциональность\n"));
        }
        other => panic!("Expected a changelog, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_outcomes()
{
    use crate::libs::{commit::RawCommit, config::ChangelogConfig};

    let commit = |message: &str| RawCommit { commit_id: "abcdef012".to_string(), message: message.to_string(), ..Default::default() };

    let empty = history::MockHistory::new(None, vec![vec![]]);
    assert!(matches!(generate(&empty, &context(ChangelogConfig::builtin())).await, Err(ChangelogError::NoCommitsFound)));

    let unparsable = history::MockHistory::new(None, vec![vec![commit("wip"), commit("chore: release [skip-ci]")]]);
    assert!(matches!(generate(&unparsable, &context(ChangelogConfig::builtin())).await, Err(ChangelogError::NoValidCommits)));

    let mut excluded = ChangelogConfig::builtin();
    excluded.exclude_types.insert("chore".to_string());
    let chores = history::MockHistory::new(None, vec![vec![commit("chore: tidy"), commit("unknown: type")]]);
    assert_eq!(generate(&chores, &context(excluded)).await.unwrap(), Changelog::NothingToPublish);

    let breaking = history::MockHistory::new(None, vec![vec![commit("chore!: drop node 16")]]);
    let mut config = ChangelogConfig::builtin();
    config.exclude_types.insert("chore".to_string());
    config.template = None;
    match generate(&breaking, &context(config)).await.unwrap()
    {
        Changelog::Published { text, .. } => assert_eq!(text, "\n### КРИТИЧЕСКИЕ ИЗМЕНЕНИЯ\n- из-за [`abcdef0`]() - drop node 16 *(коммит от @)*:  drop node 16"),
        other => panic!("Expected breaking changes, got {:?}", other),
    }
}
