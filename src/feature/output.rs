use std::{io::Write, path::Path};

use log::debug;

/// Appends a (possibly multi-line) step output to the `GITHUB_OUTPUT` file using the
/// heredoc form `name<<DELIMITER`.
pub fn write_github_output(path: &Path, name: &str, value: &str) -> std::io::Result<()>
{
    let mut delimiter = format!("ghadelimiter_{:016x}", rand::random::<u64>());
    while value.contains(&delimiter)
    {
        delimiter = format!("ghadelimiter_{:016x}", rand::random::<u64>());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}<<{}", name, delimiter)?;
    writeln!(file, "{}", value)?;
    writeln!(file, "{}", delimiter)?;

    debug!("Output `{}` written to {}", name, path.display());
    Ok(())
}

#[test]
fn test_write_github_output()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output");
    std::fs::write(&path, "previous=1\n").unwrap();

    write_github_output(&path, "changelog", "### Fix\n- a").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines = content.lines().collect::<Vec<&str>>();
    assert_eq!(lines[0], "previous=1");

    let delimiter = lines[1].strip_prefix("changelog<<").unwrap();
    assert!(delimiter.starts_with("ghadelimiter_"));
    assert_eq!(&lines[2..], &["### Fix", "- a", delimiter]);
}
