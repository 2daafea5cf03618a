/// Title a footer note must carry to be lifted into the breaking changes section.
pub const BREAKING_CHANGE_TITLE: &str = "BREAKING CHANGE";

/// Most recent tag reachable from the target branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag
{
    pub name:       String,
    pub commit_id:  String,
}

/// One commit of the branch history, as delivered by a history source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawCommit
{
    pub commit_id:      String,
    pub message:        String,
    pub url:            String,
    pub author_login:   String,
    pub author_url:     String,
}

/// Footer note of a conventional commit (`Token: text`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note
{
    pub title:  String,
    pub text:   String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit
{
    pub commit_type:    String,
    pub scope:          Option<String>,
    pub subject:        String,
    pub notes:          Vec<Note>,

    // Identity, carried over from the raw commit.
    pub commit_id:      String,
    pub url:            String,
    pub author_login:   String,
    pub author_url:     String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakingChange
{
    pub commit_id:      String,
    pub url:            String,
    pub subject:        String,
    pub author_login:   String,
    pub author_url:     String,
    pub text:           String,
}

/// First seven characters of a commit id.
pub fn abbreviate(commit_id: &str) -> &str
{
    match commit_id.char_indices().nth(7)
    {
        Some((index, _)) => &commit_id[..index],
        None => commit_id,
    }
}

#[test]
fn test_abbreviate()
{
    assert_eq!(abbreviate("0123456789abcdef"), "0123456");
    assert_eq!(abbreviate("abc"), "abc");
    assert_eq!(abbreviate(""), "");
}
