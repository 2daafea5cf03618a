use log::{debug, info, warn};

use crate::{feature::conventional, libs::{commit::{BreakingChange, ParsedCommit, RawCommit, BREAKING_CHANGE_TITLE}, config::ChangelogConfig}};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification
{
    pub parsed:         Vec<ParsedCommit>,
    pub breaking:       Vec<BreakingChange>,
    pub skipped_count:  usize,
    pub failed_count:   usize,
}

/// Splits raw commits into conventional commits and breaking changes, keeping input order.
pub fn classify(commits: &[RawCommit], config: &ChangelogConfig) -> Classification
{
    let mut classification = Classification::default();

    for commit in commits.iter()
    {
        if let Some(marker) = config.skip_markers.iter().find(|x| commit.message.contains(x.as_str()))
        {
            debug!("Commit: [SKIPPED: {}] {}", marker, commit.commit_id);
            classification.skipped_count += 1;
            continue;
        }

        let message = match conventional::parse_message(&commit.message)
        {
            Ok(message) => message,
            Err(failure) =>
            {
                warn!("Commit: [NON-FORMATTED] {} - {}", commit.commit_id, failure);
                classification.failed_count += 1;
                continue;
            }
        };

        debug!(
            "Commit: [{}{}{}] {} - {} ({} body lines)",
            message.commit_type,
            message.scope.as_ref().map(|x| format!("({})", x)).unwrap_or_default(),
            if message.breaking { "!" } else { "" },
            commit.commit_id,
            message.subject,
            message.body.as_deref().map_or(0, |x| x.lines().count())
        );

        let parsed = ParsedCommit {
            commit_type: message.commit_type,
            scope: message.scope,
            subject: message.subject,
            notes: message.notes,
            commit_id: commit.commit_id.clone(),
            url: commit.url.clone(),
            author_login: commit.author_login.clone(),
            author_url: commit.author_url.clone(),
        };

        for note in parsed.notes.iter().filter(|x| x.title == BREAKING_CHANGE_TITLE)
        {
            classification.breaking.push(BreakingChange {
                commit_id: parsed.commit_id.clone(),
                url: parsed.url.clone(),
                subject: parsed.subject.clone(),
                author_login: parsed.author_login.clone(),
                author_url: parsed.author_url.clone(),
                text: note.text.clone(),
            });
        }

        classification.parsed.push(parsed);
    }

    info!("Valid Commits: {}", classification.parsed.len());
    info!("Breaking Changes: {}", classification.breaking.len());
    debug!("Skipped: {}, Non-Formatted: {}", classification.skipped_count, classification.failed_count);

    classification
}

#[cfg(test)]
fn raw(commit_id: &str, message: &str) -> RawCommit
{
    RawCommit {
        commit_id: commit_id.to_string(),
        message: message.to_string(),
        url: format!("https://github.com/octo/hello/commit/{}", commit_id),
        author_login: "alice".to_string(),
        author_url: "https://github.com/alice".to_string(),
    }
}

#[test]
fn test_classify()
{
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .try_init();

    let commits = vec![
        raw("c3", "feat(ui): dark mode (#7)"),
        raw("c2", "update readme"),
        raw("c1", "fix!: drop v1 endpoints\n\nBREAKING CHANGE: v1 clients stop working\nupgrade to v2"),
    ];

    let result = classify(&commits, &ChangelogConfig::builtin());

    assert_eq!(result.parsed.len(), 2);
    assert_eq!(result.parsed[0].commit_id, "c3");
    assert_eq!(result.parsed[0].scope.as_deref(), Some("ui"));
    assert_eq!(result.parsed[0].author_login, "alice");
    assert_eq!(result.parsed[1].commit_type, "fix");
    assert_eq!(result.failed_count, 1);
    assert_eq!(result.skipped_count, 0);

    assert_eq!(result.breaking.len(), 1);
    assert_eq!(result.breaking[0].commit_id, "c1");
    assert_eq!(result.breaking[0].subject, "drop v1 endpoints");
    assert_eq!(result.breaking[0].text, "v1 clients stop working\nupgrade to v2");
}

#[test]
fn test_classify_skip_markers()
{
    let mut config = ChangelogConfig::default();
    config.skip_markers.insert("skip-ci".to_string());

    let commits = vec![
        raw("c2", "chore: bump version [skip-ci]"),
        raw("c1", "chore: tidy up"),
    ];

    let result = classify(&commits, &config);

    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.failed_count, 0);
    assert_eq!(result.parsed.len(), 1);
    assert!(result.parsed.iter().all(|x| x.commit_id != "c2"));
}

#[test]
fn test_classify_is_repeatable()
{
    let commits = vec![
        raw("c2", "feat!: new api"),
        raw("c1", "fix: typo"),
    ];
    let config = ChangelogConfig::builtin();

    assert_eq!(classify(&commits, &config), classify(&commits, &config));
}

#[test]
fn test_classify_only_unparsable()
{
    let commits = vec![raw("c2", "wip"), raw("c1", "")];

    let result = classify(&commits, &ChangelogConfig::default());

    assert!(result.parsed.is_empty());
    assert!(result.breaking.is_empty());
    assert_eq!(result.failed_count, 2);
}
