//! Conventional Commits grammar: `type[(scope)][!]: subject`, an optional body and
//! footer notes (`Token: text` or `Token #text`).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::libs::commit::{Note, BREAKING_CHANGE_TITLE};

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[^\s():!]+)(?:\((?P<scope>[^()\r\n]+)\))?(?P<breaking>!)?:[ \t]+(?P<subject>\S.*)$")
        .expect("Invalid header regex")
});

static FOOTER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<token>BREAKING[ -]CHANGE|[A-Za-z0-9][A-Za-z0-9-]*)(?::[ \t]+(?P<text>.*)|[ \t]+(?P<issue>#.*))$")
        .expect("Invalid footer regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalMessage
{
    pub commit_type:    String,
    pub scope:          Option<String>,
    pub breaking:       bool,
    pub subject:        String,
    pub body:           Option<String>,
    pub notes:          Vec<Note>,
}

/// Why a message is not a conventional commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure
{
    #[error("commit message is empty")]
    Empty,

    #[error("header `{0}` does not match `type(scope): subject`")]
    MalformedHeader(String),
}

fn footer_note(line: &str) -> Option<Note>
{
    let captures = FOOTER_REGEX.captures(line)?;
    let token = captures.name("token")?.as_str();
    let text = captures.name("text").or_else(|| captures.name("issue"))?.as_str();

    let title = if token == "BREAKING-CHANGE" { BREAKING_CHANGE_TITLE } else { token };
    Some(Note { title: title.to_string(), text: text.trim_end().to_string() })
}

pub fn parse_message(message: &str) -> Result<ConventionalMessage, ParseFailure>
{
    let mut lines = message.lines().skip_while(|x| x.trim().is_empty());

    let header = lines.next().ok_or(ParseFailure::Empty)?.trim_end();
    let captures = HEADER_REGEX.captures(header)
        .ok_or_else(|| ParseFailure::MalformedHeader(header.to_string()))?;

    let commit_type = captures["type"].to_string();
    let scope = captures.name("scope").map(|x| x.as_str().trim().to_string()).filter(|x| !x.is_empty());
    let breaking = captures.name("breaking").is_some();
    let subject = captures["subject"].trim_end().to_string();

    // Footers only open at the start of a paragraph; anything after the first one
    // either starts another note or continues the previous one.
    let mut body_lines = Vec::<&str>::new();
    let mut notes = Vec::<Note>::new();
    let mut previous_blank = true;
    for line in lines
    {
        let line = line.trim_end();
        let in_footer = !notes.is_empty();

        match footer_note(line)
        {
            Some(note) if in_footer || previous_blank => notes.push(note),
            _ if in_footer =>
            {
                if let Some(last) = notes.last_mut()
                {
                    last.text.push('\n');
                    last.text.push_str(line);
                }
            }
            _ => body_lines.push(line),
        }

        previous_blank = line.is_empty();
    }

    for note in notes.iter_mut()
    {
        let trimmed = note.text.trim_end().len();
        note.text.truncate(trimmed);
    }

    if breaking && !notes.iter().any(|x| x.title == BREAKING_CHANGE_TITLE)
    {
        notes.push(Note { title: BREAKING_CHANGE_TITLE.to_string(), text: subject.clone() });
    }

    let body = body_lines.join("\n").trim().to_string();

    Ok(ConventionalMessage {
        commit_type,
        scope,
        breaking,
        subject,
        body: if body.is_empty() { None } else { Some(body) },
        notes,
    })
}

#[test]
fn test_parse_simple()
{
    let parsed = parse_message("feat: add new feature").unwrap();

    assert_eq!(parsed.commit_type, "feat");
    assert_eq!(parsed.scope, None);
    assert_eq!(parsed.subject, "add new feature");
    assert!(!parsed.breaking);
    assert!(parsed.notes.is_empty());
    assert_eq!(parsed.body, None);
}

#[test]
fn test_parse_scope_and_bang()
{
    let parsed = parse_message("refactor(core)!: drop the old loader").unwrap();

    assert_eq!(parsed.commit_type, "refactor");
    assert_eq!(parsed.scope.as_deref(), Some("core"));
    assert!(parsed.breaking);
    assert_eq!(parsed.notes, vec![Note { title: "BREAKING CHANGE".to_string(), text: "drop the old loader".to_string() }]);
}

#[test]
fn test_parse_type_is_case_sensitive()
{
    let parsed = parse_message("Fix: Something").unwrap();

    assert_eq!(parsed.commit_type, "Fix");
}

#[test]
fn test_parse_rejects_non_conventional()
{
    assert_eq!(parse_message(""), Err(ParseFailure::Empty));
    assert_eq!(parse_message("\n\n"), Err(ParseFailure::Empty));
    assert!(matches!(parse_message("Merge branch 'dev'"), Err(ParseFailure::MalformedHeader(_))));
    assert!(matches!(parse_message("fix:no space"), Err(ParseFailure::MalformedHeader(_))));
    assert!(matches!(parse_message("fix(): empty scope"), Err(ParseFailure::MalformedHeader(_))));
    assert!(matches!(parse_message("fix:   "), Err(ParseFailure::MalformedHeader(_))));
}

#[test]
fn test_parse_body_and_footers()
{
    let message = "fix(api): handle timeouts (#12)\n\nThe client now retries.\nSecond line of body.\n\nRefs #123\nReviewed-by: bob\n";
    let parsed = parse_message(message).unwrap();

    assert_eq!(parsed.subject, "handle timeouts (#12)");
    assert_eq!(parsed.body.as_deref(), Some("The client now retries.\nSecond line of body."));
    assert_eq!(parsed.notes, vec![
        Note { title: "Refs".to_string(), text: "#123".to_string() },
        Note { title: "Reviewed-by".to_string(), text: "bob".to_string() },
    ]);
}

#[test]
fn test_parse_breaking_footer_multiline()
{
    let message = "feat: new config format\n\nBREAKING-CHANGE: the `groups` key is required\nold files must be migrated\n\n";
    let parsed = parse_message(message).unwrap();

    assert!(!parsed.breaking);
    assert_eq!(parsed.notes.len(), 1);
    assert_eq!(parsed.notes[0].title, "BREAKING CHANGE");
    assert_eq!(parsed.notes[0].text, "the `groups` key is required\nold files must be migrated");
}

#[test]
fn test_parse_footer_needs_paragraph_start()
{
    let message = "docs: explain setup\n\nInstall the tool first.\nNote: this line is still body.";
    let parsed = parse_message(message).unwrap();

    assert!(parsed.notes.is_empty());
    assert_eq!(parsed.body.as_deref(), Some("Install the tool first.\nNote: this line is still body."));
}

#[test]
fn test_parse_bang_keeps_explicit_breaking_note()
{
    let parsed = parse_message("feat!: rename flags\n\nBREAKING CHANGE: `--x` is now `--y`").unwrap();

    assert_eq!(parsed.notes, vec![Note { title: "BREAKING CHANGE".to_string(), text: "`--x` is now `--y`".to_string() }]);
}
