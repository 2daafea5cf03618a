use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::libs::{commit::{abbreviate, BreakingChange, ParsedCommit}, config::ChangelogConfig};

static PR_ENDING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(#(\d+)\)$").expect("Invalid pull request regex")
});

const BREAKING_TITLE: &str = "КРИТИЧЕСКИЕ ИЗМЕНЕНИЯ";
const BREAKING_ICON: &str = ":boom:";

/// Attributes a subject to its author, turning a trailing `(#N)` into a PR attribution.
pub fn render_subject(subject: &str, author: &str) -> String
{
    match PR_ENDING_REGEX.captures(subject)
    {
        Some(captures) =>
        {
            let marker = captures.get(0).map_or(subject.len(), |x| x.start());
            format!("{}*(PR #{} от @{})*", &subject[..marker], &captures[1], author)
        }
        None => format!("{} *(коммит от @{})*", subject, author),
    }
}

fn heading(title: &str, icon: Option<&str>, use_icons: bool) -> String
{
    match icon
    {
        Some(icon) if use_icons => format!("### {} {}", icon, title),
        _ => format!("### {}", title),
    }
}

/// Builds the changelog lines: one section per non-empty group in configuration order,
/// then the breaking changes. Blank entries are intentional separators.
pub fn compose(parsed: &[ParsedCommit], breaking: &[BreakingChange], config: &ChangelogConfig, use_icons: bool) -> Vec<String>
{
    let mut changes = Vec::<String>::new();
    let mut emitted = 0;

    for group in config.groups.iter()
    {
        if !group.types.is_disjoint(&config.exclude_types)
        {
            continue;
        }

        let matching = parsed.iter()
            .filter(|x| group.types.contains(&x.commit_type))
            .collect::<Vec<&ParsedCommit>>();
        if matching.is_empty()
        {
            continue;
        }

        if emitted > 0
        {
            changes.push(String::new());
        }

        changes.push(heading(&group.title, group.icon.as_deref(), use_icons));
        for commit in matching
        {
            let scope = commit.scope.as_ref().map(|x| format!("**{}**: ", x)).unwrap_or_default();
            changes.push(format!(
                "- [`{}`]({}) - {}{}",
                abbreviate(&commit.commit_id),
                commit.url,
                scope,
                render_subject(&commit.subject, &commit.author_login)
            ));
        }
        emitted += 1;
    }

    if !breaking.is_empty()
    {
        changes.push(String::new());
        changes.push(heading(BREAKING_TITLE, Some(BREAKING_ICON), use_icons));
        for change in breaking.iter()
        {
            debug!("Breaking Change: {} by {} <{}>", change.commit_id, change.author_login, change.author_url);

            // Two trailing spaces keep the markdown line breaks inside the bullet.
            let body = change.text.split('\n').map(|x| format!("  {}", x)).collect::<Vec<String>>().join("  \n");
            changes.push(format!(
                "- из-за [`{}`]({}) - {}:{}",
                abbreviate(&change.commit_id),
                change.url,
                render_subject(&change.subject, &change.author_login),
                body
            ));
        }
    }

    changes
}

#[cfg(test)]
fn parsed(commit_id: &str, commit_type: &str, scope: Option<&str>, subject: &str) -> ParsedCommit
{
    ParsedCommit {
        commit_type: commit_type.to_string(),
        scope: scope.map(|x| x.to_string()),
        subject: subject.to_string(),
        notes: vec![],
        commit_id: commit_id.to_string(),
        url: format!("https://github.com/octo/hello/commit/{}", commit_id),
        author_login: "alice".to_string(),
        author_url: "https://github.com/alice".to_string(),
    }
}

#[cfg(test)]
fn config() -> ChangelogConfig
{
    use crate::libs::config::GroupConfig;
    use maplit::btreeset;

    ChangelogConfig {
        template: None,
        groups: vec![
            GroupConfig { title: "Features".to_string(), icon: Some(":sparkles:".to_string()), types: btreeset!{"feat".to_string()} },
            GroupConfig { title: "Fixes".to_string(), icon: None, types: btreeset!{"fix".to_string(), "bugfix".to_string()} },
        ],
        skip_markers: Default::default(),
        exclude_types: Default::default(),
    }
}

#[test]
fn test_render_subject()
{
    assert_eq!(render_subject("Add feature (#42)", "alice"), "Add feature *(PR #42 от @alice)*");
    assert_eq!(render_subject("Add feature", "alice"), "Add feature *(коммит от @alice)*");
    assert_eq!(render_subject("Revert (#42) partially", "bob"), "Revert (#42) partially *(коммит от @bob)*");
    assert_eq!(render_subject("Add feature (#42) ", "bob"), "Add feature (#42)  *(коммит от @bob)*");
}

#[test]
fn test_compose_groups()
{
    let commits = vec![
        parsed("aaaaaaa111", "fix", Some("api"), "handle timeouts (#12)"),
        parsed("bbbbbbb222", "feat", None, "dark mode"),
        parsed("ccccccc333", "bugfix", None, "typo"),
        parsed("ddddddd444", "chore", None, "not grouped"),
    ];

    let lines = compose(&commits, &[], &config(), true);

    assert_eq!(lines, vec![
        "### :sparkles: Features".to_string(),
        "- [`bbbbbbb`](https://github.com/octo/hello/commit/bbbbbbb222) - dark mode *(коммит от @alice)*".to_string(),
        "".to_string(),
        "### Fixes".to_string(),
        "- [`aaaaaaa`](https://github.com/octo/hello/commit/aaaaaaa111) - **api**: handle timeouts *(PR #12 от @alice)*".to_string(),
        "- [`ccccccc`](https://github.com/octo/hello/commit/ccccccc333) - typo *(коммит от @alice)*".to_string(),
    ]);
}

#[test]
fn test_compose_without_icons()
{
    let commits = vec![parsed("bbbbbbb222", "feat", None, "dark mode")];

    let lines = compose(&commits, &[], &config(), false);

    assert_eq!(lines[0], "### Features");
}

#[test]
fn test_compose_excluded_group()
{
    let mut config = config();
    config.exclude_types.insert("fix".to_string());
    let commits = vec![
        parsed("aaaaaaa111", "fix", None, "a"),
        parsed("ccccccc333", "bugfix", None, "b"),
    ];

    assert!(compose(&commits, &[], &config, true).is_empty());
}

#[test]
fn test_compose_breaking_last()
{
    let commits = vec![
        parsed("aaaaaaa111", "fix", None, "a"),
        parsed("bbbbbbb222", "feat", None, "b"),
    ];
    let breaking = vec![BreakingChange {
        commit_id: "bbbbbbb222".to_string(),
        url: "https://github.com/octo/hello/commit/bbbbbbb222".to_string(),
        subject: "b".to_string(),
        author_login: "alice".to_string(),
        author_url: "https://github.com/alice".to_string(),
        text: "first\nsecond".to_string(),
    }];

    let lines = compose(&commits, &breaking, &config(), true);

    let heading = lines.iter().position(|x| x == "### :boom: КРИТИЧЕСКИЕ ИЗМЕНЕНИЯ").unwrap();
    assert_eq!(heading, lines.len() - 2);
    assert_eq!(lines[heading - 1], "");
    assert_ne!(lines[heading - 2], "");
    assert_eq!(
        lines[heading + 1],
        "- из-за [`bbbbbbb`](https://github.com/octo/hello/commit/bbbbbbb222) - b *(коммит от @alice)*:  first  \n  second"
    );

    let plain = compose(&commits, &breaking, &config(), false);
    assert!(plain.contains(&"### КРИТИЧЕСКИЕ ИЗМЕНЕНИЯ".to_string()));
}

#[test]
fn test_compose_empty()
{
    assert!(compose(&[], &[], &config(), true).is_empty());
    assert!(compose(&[], &[], &ChangelogConfig::builtin(), false).is_empty());
}
