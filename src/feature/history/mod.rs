use async_trait::async_trait;
use log::{debug, info};

use crate::libs::{commit::{RawCommit, ReleaseTag}, error::ChangelogError};

pub mod github;
pub mod local;

/// Commits requested per history page.
pub const PAGE_SIZE: usize = 10;

/// One page of branch history, newest commit first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage
{
    pub entries:        Vec<RawCommit>,
    pub has_more:       bool,
    pub next_cursor:    Option<String>,
}

/// Where the branch history and its latest tag come from.
#[async_trait]
pub trait HistorySource: Send + Sync
{
    /// Most recently created tag, `None` when the repository has no tags yet.
    async fn resolve_latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>;

    /// One page of history starting at the branch tip, or after `after` when given.
    /// `None` means the provider answered without usable data.
    async fn fetch_history_page(&self, after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>;
}

/// Walks the history page by page until the upstream runs out or the tagged commit is
/// reached. The tagged commit itself is the last entry collected.
pub async fn collect_release_commits<S>(source: &S, latest_tag: Option<&ReleaseTag>) -> Result<Vec<RawCommit>, ChangelogError>
where
    S: HistorySource + ?Sized,
{
    let mut commits = Vec::<RawCommit>::new();
    let mut cursor: Option<String> = None;

    loop
    {
        let page = source.fetch_history_page(cursor.as_deref()).await?
            .ok_or_else(|| ChangelogError::HistoryUnavailable(format!("empty history page after cursor {:?}", cursor)))?;
        debug!("History Page: {} commits, more: {}", page.entries.len(), page.has_more);

        for commit in page.entries
        {
            let is_boundary = latest_tag.is_some_and(|x| x.commit_id == commit.commit_id);
            commits.push(commit);

            if is_boundary
            {
                info!("Commits: {}", commits.len());
                return Ok(commits);
            }
        }

        if !page.has_more
        {
            break;
        }

        match page.next_cursor
        {
            Some(next) => cursor = Some(next),
            None => return Err(ChangelogError::HistoryUnavailable("history reports more pages without a cursor".to_string())),
        }
    }

    info!("Commits: {}", commits.len());
    Ok(commits)
}

/// In-memory paged history used by the pipeline tests.
#[cfg(test)]
pub struct MockHistory
{
    pub tag:        Option<ReleaseTag>,
    pub pages:      Vec<Vec<RawCommit>>,
    pub requests:   std::sync::Mutex<Vec<Option<String>>>,
}

#[cfg(test)]
impl MockHistory
{
    pub fn new(tag: Option<ReleaseTag>, pages: Vec<Vec<RawCommit>>) -> MockHistory
    {
        MockHistory { tag, pages, requests: Default::default() }
    }

    /// Pages of `sizes` commits named `p{page}c{index}` with messages `feat: change {n}`.
    pub fn numbered(tag: Option<ReleaseTag>, sizes: &[usize]) -> MockHistory
    {
        let pages: Vec<Vec<RawCommit>> = sizes.iter().enumerate()
            .map(|(page, size)| (0..*size).map(|index| RawCommit {
                commit_id: format!("p{}c{}", page, index),
                message: format!("feat: change {}-{}", page, index),
                url: format!("https://github.com/octo/hello/commit/p{}c{}", page, index),
                author_login: "alice".to_string(),
                author_url: "https://github.com/alice".to_string(),
            }).collect::<Vec<RawCommit>>())
            .collect();
        MockHistory::new(tag, pages)
    }
}

#[cfg(test)]
#[async_trait]
impl HistorySource for MockHistory
{
    async fn resolve_latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>
    {
        Ok(self.tag.clone())
    }

    async fn fetch_history_page(&self, after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>
    {
        self.requests.lock().unwrap().push(after.map(|x| x.to_string()));

        let index = match after
        {
            Some(cursor) => cursor.parse::<usize>().unwrap(),
            None => 0,
        };
        let Some(entries) = self.pages.get(index) else { return Ok(None) };

        let has_more = index + 1 < self.pages.len();
        Ok(Some(HistoryPage {
            entries: entries.clone(),
            has_more,
            next_cursor: if has_more { Some((index + 1).to_string()) } else { None },
        }))
    }
}

#[tokio::test]
async fn test_collect_stops_at_tag()
{
    let tag = ReleaseTag { name: "v1.0.0".to_string(), commit_id: "p1c2".to_string() };
    let source = MockHistory::numbered(Some(tag.clone()), &[3, 5, 4]);

    let commits = collect_release_commits(&source, Some(&tag)).await.unwrap();

    let ids = commits.iter().map(|x| x.commit_id.as_str()).collect::<Vec<&str>>();
    assert_eq!(ids, vec!["p0c0", "p0c1", "p0c2", "p1c0", "p1c1", "p1c2"]);
    assert_eq!(*source.requests.lock().unwrap(), vec![None, Some("1".to_string())]);
}

#[tokio::test]
async fn test_collect_without_tag()
{
    let source = MockHistory::numbered(None, &[3, 5, 4]);

    let commits = collect_release_commits(&source, None).await.unwrap();

    assert_eq!(commits.len(), 12);
    assert_eq!(commits.last().unwrap().commit_id, "p2c3");
    assert_eq!(source.requests.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_collect_unknown_tag_reads_everything()
{
    let tag = ReleaseTag { name: "v0.1.0".to_string(), commit_id: "elsewhere".to_string() };
    let source = MockHistory::numbered(Some(tag.clone()), &[2, 2]);

    let commits = collect_release_commits(&source, Some(&tag)).await.unwrap();

    assert_eq!(commits.len(), 4);
}

#[tokio::test]
async fn test_collect_fails_on_missing_page()
{
    let source = MockHistory::new(None, vec![]);

    let result = collect_release_commits(&source, None).await;

    assert!(matches!(result, Err(ChangelogError::HistoryUnavailable(_))));
}

#[tokio::test]
async fn test_collect_fails_without_cursor()
{
    struct Stuck;

    #[async_trait]
    impl HistorySource for Stuck
    {
        async fn resolve_latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>
        {
            Ok(None)
        }

        async fn fetch_history_page(&self, _after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>
        {
            Ok(Some(HistoryPage { entries: vec![RawCommit::default()], has_more: true, next_cursor: None }))
        }
    }

    let result = collect_release_commits(&Stuck, None).await;

    assert!(matches!(result, Err(ChangelogError::HistoryUnavailable(_))));
}
