use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};

use super::{HistoryPage, HistorySource, PAGE_SIZE};
use crate::libs::{commit::{RawCommit, ReleaseTag}, error::ChangelogError};

/// Branch history read from a local clone. Cursors are commit offsets from the branch tip.
pub struct LocalHistory
{
    path:   PathBuf,
    branch: String,
}

/// `https://github.com/owner/repo` for a GitHub `origin` remote.
fn remote_web_url(repository: &git2::Repository) -> Option<String>
{
    let remote = repository.find_remote("origin").ok()?;
    let url = remote.url()?;

    let path = url.split_once("github.com:")
        .or_else(|| url.split_once("github.com/"))
        .map(|(_, path)| path)?;
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    Some(format!("https://github.com/{}", path))
}

impl LocalHistory
{
    pub fn new(path: &Path, branch: &str) -> LocalHistory
    {
        LocalHistory { path: path.to_path_buf(), branch: branch.to_string() }
    }

    fn open(&self) -> Result<git2::Repository, ChangelogError>
    {
        Ok(git2::Repository::open(&self.path)?)
    }

    fn latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>
    {
        let repository = self.open()?;

        let mut latest: Option<(i64, ReleaseTag)> = None;
        let tags = repository.tag_names(None)?;
        for tag_name in tags.iter().flatten()
        {
            // Lightweight and annotated tags both peel down to their commit.
            let commit = repository.revparse_single(&format!("refs/tags/{}", tag_name))?.peel_to_commit()?;
            let time = commit.time().seconds();
            debug!("Tag: {} - {}", commit.id(), tag_name);

            if latest.as_ref().map_or(true, |(seconds, _)| time > *seconds)
            {
                latest = Some((time, ReleaseTag { name: tag_name.to_string(), commit_id: commit.id().to_string() }));
            }
        }

        Ok(latest.map(|(_, tag)| tag))
    }

    fn page(&self, after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>
    {
        let offset = match after
        {
            Some(cursor) => match cursor.parse::<usize>()
            {
                Ok(offset) => offset,
                Err(_) => return Ok(None),
            },
            None => 0,
        };

        let repository = self.open()?;
        let web_url = remote_web_url(&repository);

        let branch = match repository.find_branch(&self.branch, git2::BranchType::Local)
        {
            Ok(branch) => branch,
            Err(error) if error.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let Some(tip) = branch.get().target() else { return Ok(None) };

        let mut revwalk = repository.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(tip)?;

        // One extra commit tells whether another page follows.
        let ids = revwalk.skip(offset).take(PAGE_SIZE + 1).collect::<Result<Vec<git2::Oid>, git2::Error>>()?;
        let has_more = ids.len() > PAGE_SIZE;

        let mut entries = Vec::<RawCommit>::new();
        for id in ids.into_iter().take(PAGE_SIZE)
        {
            let commit = repository.find_commit(id)?;
            let author = commit.author();

            entries.push(RawCommit {
                commit_id: id.to_string(),
                message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
                url: web_url.as_ref().map(|x| format!("{}/commit/{}", x, id)).unwrap_or_default(),
                author_login: author.name().unwrap_or_default().to_string(),
                author_url: author.email().map(|x| format!("mailto:{}", x)).unwrap_or_default(),
            });
        }

        Ok(Some(HistoryPage {
            next_cursor: if has_more { Some((offset + entries.len()).to_string()) } else { None },
            entries,
            has_more,
        }))
    }
}

#[async_trait]
impl HistorySource for LocalHistory
{
    async fn resolve_latest_tag(&self) -> Result<Option<ReleaseTag>, ChangelogError>
    {
        let tag = self.latest_tag()?;
        if tag.is_none()
        {
            info!("No tags in {}", self.path.display());
        }
        Ok(tag)
    }

    async fn fetch_history_page(&self, after: Option<&str>) -> Result<Option<HistoryPage>, ChangelogError>
    {
        self.page(after)
    }
}

/// Builds a linear repository with one commit per message, oldest first.
#[cfg(test)]
fn build_repository(dir: &Path, messages: &[&str]) -> (git2::Repository, Vec<git2::Oid>)
{
    let repository = git2::Repository::init(dir).unwrap();
    let tree_id = repository.index().unwrap().write_tree().unwrap();

    let mut ids = Vec::<git2::Oid>::new();
    for (index, message) in messages.iter().enumerate()
    {
        let signature = git2::Signature::new("alice", "alice@example.com", &git2::Time::new(1_700_000_000 + index as i64 * 60, 0)).unwrap();
        let tree = repository.find_tree(tree_id).unwrap();
        let parent = ids.last().map(|x| repository.find_commit(*x).unwrap());
        let parents = parent.iter().collect::<Vec<&git2::Commit>>();

        let id = repository.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents).unwrap();
        ids.push(id);
    }

    (repository, ids)
}

#[cfg(test)]
fn head_branch(repository: &git2::Repository) -> String
{
    repository.head().unwrap().shorthand().unwrap().to_string()
}

#[tokio::test]
async fn test_local_history_pages()
{
    let dir = tempfile::tempdir().unwrap();
    let messages = (0..23).map(|x| format!("feat: change {}", x)).collect::<Vec<String>>();
    let (repository, ids) = build_repository(dir.path(), &messages.iter().map(|x| x.as_str()).collect::<Vec<&str>>());
    repository.remote("origin", "git@github.com:octo/hello.git").unwrap();

    let source = LocalHistory::new(dir.path(), &head_branch(&repository));

    let first = source.fetch_history_page(None).await.unwrap().unwrap();
    assert_eq!(first.entries.len(), 10);
    assert!(first.has_more);
    assert_eq!(first.next_cursor.as_deref(), Some("10"));
    assert_eq!(first.entries[0].commit_id, ids[22].to_string());
    assert_eq!(first.entries[0].message, "feat: change 22");
    assert_eq!(first.entries[0].author_login, "alice");
    assert_eq!(first.entries[0].url, format!("https://github.com/octo/hello/commit/{}", ids[22]));

    let last = source.fetch_history_page(Some("20")).await.unwrap().unwrap();
    assert_eq!(last.entries.len(), 3);
    assert!(!last.has_more);
    assert_eq!(last.next_cursor, None);
    assert_eq!(last.entries[2].commit_id, ids[0].to_string());

    assert!(source.fetch_history_page(Some("not a cursor")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_local_history_latest_tag()
{
    let dir = tempfile::tempdir().unwrap();
    let (repository, ids) = build_repository(dir.path(), &["feat: one", "fix: two", "feat: three", "docs: four"]);
    let source = LocalHistory::new(dir.path(), &head_branch(&repository));

    assert_eq!(source.resolve_latest_tag().await.unwrap(), None);

    let first = repository.find_commit(ids[0]).unwrap();
    let second = repository.find_commit(ids[1]).unwrap();
    repository.tag_lightweight("v0.1.0", first.as_object(), false).unwrap();
    let signature = git2::Signature::now("alice", "alice@example.com").unwrap();
    repository.tag("v0.2.0", second.as_object(), &signature, "Release: v0.2.0", false).unwrap();

    let tag = source.resolve_latest_tag().await.unwrap().unwrap();
    assert_eq!(tag.name, "v0.2.0");
    assert_eq!(tag.commit_id, ids[1].to_string());

    let commits = super::collect_release_commits(&source, Some(&tag)).await.unwrap();
    assert_eq!(commits.iter().map(|x| x.message.as_str()).collect::<Vec<&str>>(), vec!["docs: four", "feat: three", "fix: two"]);
}

#[test]
fn test_remote_web_url()
{
    let dir = tempfile::tempdir().unwrap();
    let repository = git2::Repository::init(dir.path()).unwrap();
    assert_eq!(remote_web_url(&repository), None);

    repository.remote("origin", "https://github.com/octo/hello.git").unwrap();
    assert_eq!(remote_web_url(&repository).as_deref(), Some("https://github.com/octo/hello"));
}
