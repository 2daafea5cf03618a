use async_trait::async_trait;
use log::debug;

use super::{HistoryPage, HistorySource, PAGE_SIZE};
use crate::libs::{commit::{RawCommit, ReleaseTag}, config::RunContext, error::{ChangelogError, ConfigError}};

const LATEST_TAG_QUERY: &str = r#"
query findLatestTag($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    refs(first: 1, refPrefix: "refs/tags/", orderBy: {field: TAG_COMMIT_DATE, direction: DESC}) {
      nodes {
        name
        target {
          oid
          ... on Tag {
            target {
              oid
            }
          }
        }
      }
    }
  }
}"#;

const HISTORY_QUERY: &str = r#"
query findCommits($owner: String!, $name: String!, $branch: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $branch) {
      target {
        ... on Commit {
          history(first: $first, after: $after) {
            pageInfo {
              hasNextPage
              endCursor
            }
            edges {
              node {
                message
                oid
                commitUrl
                committer {
                  name
                  user {
                    login
                    url
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}"#;

#[derive(serde::Deserialize, Debug)]
struct GraphQlResponse<T>
{
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(serde::Deserialize, Debug)]
struct GraphQlError
{
    message: String,
}

impl<T> GraphQlResponse<T>
{
    fn into_data(self) -> Result<Option<T>, ChangelogError>
    {
        if let Some(error) = self.errors.unwrap_or_default().into_iter().next()
        {
            return Err(ChangelogError::HistoryUnavailable(error.message));
        }
        Ok(self.data)
    }
}

#[derive(serde::Deserialize, Debug)]
struct TagData
{
    repository: Option<TagRepository>,
}

#[derive(serde::Deserialize, Debug)]
struct TagRepository
{
    refs: Option<TagRefs>,
}

#[derive(serde::Deserialize, Debug)]
struct TagRefs
{
    nodes: Option<Vec<TagNode>>,
}

#[derive(serde::Deserialize, Debug)]
struct TagNode
{
    name: String,
    target: Option<TagTarget>,
}

/// Lightweight tags point at the commit, annotated tags at a tag object that points at it.
#[derive(serde::Deserialize, Debug)]
struct TagTarget
{
    oid: String,
    target: Option<PeeledTarget>,
}

#[derive(serde::Deserialize, Debug)]
struct PeeledTarget
{
    oid: String,
}

#[derive(serde::Deserialize, Debug)]
struct HistoryData
{
    repository: Option<HistoryRepository>,
}

#[derive(serde::Deserialize, Debug)]
struct HistoryRepository
{
    #[serde(rename = "ref")]
    branch: Option<BranchRef>,
}

#[derive(serde::Deserialize, Debug)]
struct BranchRef
{
    target: Option<BranchTarget>,
}

#[derive(serde::Deserialize, Debug)]
struct BranchTarget
{
    history: Option<CommitHistory>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitHistory
{
    page_info: PageInfo,
    edges: Option<Vec<CommitEdge>>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PageInfo
{
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct CommitEdge
{
    node: Option<CommitNode>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitNode
{
    message: String,
    oid: String,
    commit_url: String,
    committer: Option<GitActor>,
}

#[derive(serde::Deserialize, Debug)]
struct GitActor
{
    name: Option<String>,
    user: Option<GitUser>,
}

#[derive(serde::Deserialize, Debug)]
struct GitUser
{
    login: String,
    url: String,
}

fn latest_tag(data: TagData) -> Option<ReleaseTag>
{
    let node = data.repository?.refs?.nodes?.into_iter().next()?;
    let target = node.target?;
    let commit_id = match target.target
    {
        Some(peeled) => peeled.oid,
        None => target.oid,
    };

    Some(ReleaseTag { name: node.name, commit_id })
}

fn history_page(data: HistoryData) -> Option<HistoryPage>
{
    let history = data.repository?.branch?.target?.history?;

    let entries = history.edges.unwrap_or_default().into_iter()
        .filter_map(|x| x.node)
        .map(|node| {
            let (author_login, author_url) = match node.committer
            {
                Some(GitActor { user: Some(user), .. }) => (user.login, user.url),
                Some(GitActor { name: Some(name), user: None }) => (name, String::new()),
                _ => (String::new(), String::new()),
            };

            RawCommit { commit_id: node.oid, message: node.message, url: node.commit_url, author_login, author_url }
        })
        .collect();

    Some(HistoryPage {
        entries,
        has_more: history.page_info.has_next_page,
        next_cursor: history.page_info.end_cursor,
    })
}

/// Branch history read through the GitHub GraphQL API.
pub struct GithubHistory
{
    octocrab:   octocrab::Octocrab,
    owner:      String,
    repo:       String,
    branch:     String,
}

impl GithubHistory
{
    pub fn new(token: Option<String>, context: &RunContext) -> Result<GithubHistory, ChangelogError>
    {
        let token = token.filter(|x| !x.is_empty()).ok_or(ConfigError::MissingToken)?;

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token)
            .build()?;

        debug!("Loading Repository: {}/{} ({})", context.owner, context.repo, context.branch);

        Ok(GithubHistory {
            octocrab,
            owner: context.owner.clone(),
            repo: context.repo.clone(),
            branch: context.branch.clone(),
        })
    }
}

#[async_trait]
impl HistorySource for GithubHistory
{
    async fn resolve_latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>
    {
        let payload = serde_json::json!({
            "query": LATEST_TAG_QUERY,
            "variables": { "owner": self.owner, "name": self.repo },
        });

        let response: GraphQlResponse<TagData> = self.octocrab.graphql(&payload).await?;
        Ok(response.into_data()?.and_then(latest_tag))
    }

    async fn fetch_history_page(&self, after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>
    {
        let payload = serde_json::json!({
            "query": HISTORY_QUERY,
            "variables": {
                "owner": self.owner,
                "name": self.repo,
                "branch": self.branch,
                "first": PAGE_SIZE,
                "after": after,
            },
        });

        debug!("Fetching History Page: {}/{}@{} after {:?}", self.owner, self.repo, self.branch, after);

        let response: GraphQlResponse<HistoryData> = self.octocrab.graphql(&payload).await?;
        Ok(response.into_data()?.and_then(history_page))
    }
}

#[test]
fn test_history_page_from_response()
{
    let body = serde_json::json!({
        "data": { "repository": { "ref": { "target": { "history": {
            "pageInfo": { "hasNextPage": true, "endCursor": "abc 9" },
            "edges": [
                { "node": {
                    "message": "feat: dark mode (#7)",
                    "oid": "1111111aaaa",
                    "commitUrl": "https://github.com/octo/hello/commit/1111111aaaa",
                    "committer": { "name": "Alice", "user": { "login": "alice", "url": "https://github.com/alice" } }
                } },
                { "node": {
                    "message": "fix: typo",
                    "oid": "2222222bbbb",
                    "commitUrl": "https://github.com/octo/hello/commit/2222222bbbb",
                    "committer": { "name": "Ghost Writer", "user": null }
                } }
            ]
        } } } } }
    });

    let response: GraphQlResponse<HistoryData> = serde_json::from_value(body).unwrap();
    let page = response.into_data().unwrap().and_then(history_page).unwrap();

    assert!(page.has_more);
    assert_eq!(page.next_cursor.as_deref(), Some("abc 9"));
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].author_login, "alice");
    assert_eq!(page.entries[0].author_url, "https://github.com/alice");
    assert_eq!(page.entries[1].author_login, "Ghost Writer");
    assert_eq!(page.entries[1].author_url, "");
}

#[test]
fn test_history_page_missing_branch()
{
    let body = serde_json::json!({ "data": { "repository": { "ref": null } } });

    let response: GraphQlResponse<HistoryData> = serde_json::from_value(body).unwrap();

    assert!(response.into_data().unwrap().and_then(history_page).is_none());
}

#[test]
fn test_graphql_errors()
{
    let body = serde_json::json!({ "data": null, "errors": [{ "message": "Could not resolve to a Repository" }] });

    let response: GraphQlResponse<HistoryData> = serde_json::from_value(body).unwrap();

    match response.into_data()
    {
        Err(ChangelogError::HistoryUnavailable(message)) => assert_eq!(message, "Could not resolve to a Repository"),
        other => panic!("Expected an unavailable history, got {:?}", other),
    }
}

#[test]
fn test_latest_tag_from_response()
{
    let annotated = serde_json::json!({ "data": { "repository": { "refs": { "nodes": [
        { "name": "v1.2.0", "target": { "oid": "tagobject", "target": { "oid": "commit120" } } }
    ] } } } });
    let lightweight = serde_json::json!({ "data": { "repository": { "refs": { "nodes": [
        { "name": "v1.1.0", "target": { "oid": "commit110" } }
    ] } } } });
    let none = serde_json::json!({ "data": { "repository": { "refs": { "nodes": [] } } } });

    let resolve = |body: serde_json::Value| {
        let response: GraphQlResponse<TagData> = serde_json::from_value(body).unwrap();
        response.into_data().unwrap().and_then(latest_tag)
    };

    assert_eq!(resolve(annotated), Some(ReleaseTag { name: "v1.2.0".to_string(), commit_id: "commit120".to_string() }));
    assert_eq!(resolve(lightweight), Some(ReleaseTag { name: "v1.1.0".to_string(), commit_id: "commit110".to_string() }));
    assert_eq!(resolve(none), None);
}
