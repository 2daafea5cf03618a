use crate::libs::config::CHANGES_PLACEHOLDER;

/// Joins the changelog lines and places them at the first `$changes` of the template.
pub fn render(template: Option<&str>, lines: &[String]) -> String
{
    let body = lines.join("\n");
    match template
    {
        Some(template) => template.replacen(CHANGES_PLACEHOLDER, &body, 1),
        None => body,
    }
}

#[test]
fn test_render()
{
    let lines = vec!["### Fix".to_string(), "- a".to_string()];

    assert_eq!(render(Some("## Changes\n\n$changes"), &lines), "## Changes\n\n### Fix\n- a");
    assert_eq!(render(None, &["x".to_string()]), "x");
    assert_eq!(render(Some("$changes / $changes"), &["x".to_string()]), "x / $changes");
    assert_eq!(render(Some("no placeholder"), &lines), "no placeholder");
}
