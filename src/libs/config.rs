use std::{collections::{BTreeSet, HashMap}, path::Path};

use log::{debug, info};
use maplit::btreeset;

use super::error::ConfigError;

/// Literal placeholder replaced by the composed changelog inside a template.
pub const CHANGES_PLACEHOLDER: &str = "$changes";

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig
{
    pub title:  String,
    #[serde(default)]
    pub icon:   Option<String>,
    #[serde(default)]
    pub types:  BTreeSet<String>,
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangelogConfig
{
    pub template:       Option<String>,
    pub groups:         Vec<GroupConfig>,
    #[serde(alias = "skips")]
    pub skip_markers:   BTreeSet<String>,
    pub exclude_types:  BTreeSet<String>,
}

/// Everything a run needs, built once in `main` and passed down by reference.
#[derive(Debug, Clone)]
pub struct RunContext
{
    pub owner:      String,
    pub repo:       String,
    pub branch:     String,
    pub use_icons:  bool,
    pub config:     ChangelogConfig,
}

impl RunContext
{
    /// Splits an `owner/repo` string into the context's repository coordinates.
    pub fn new(repository: &str, branch: &str, use_icons: bool, config: ChangelogConfig) -> Result<RunContext, ConfigError>
    {
        let (owner, repo) = match repository.split_once('/')
        {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => (owner, repo),
            _ => return Err(ConfigError::InvalidRepository(repository.to_string())),
        };

        Ok(RunContext {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            use_icons,
            config,
        })
    }
}

fn group(title: &str, icon: &str, types: BTreeSet<String>) -> GroupConfig
{
    GroupConfig { title: title.to_string(), icon: Some(icon.to_string()), types }
}

impl ChangelogConfig
{
    /// Configuration used when the caller does not supply one.
    pub fn builtin() -> ChangelogConfig
    {
        ChangelogConfig {
            template: Some(format!("## Новые изменения\n\n{}", CHANGES_PLACEHOLDER)),
            groups: vec![
                group("Новая функциональность", ":sparkles:", btreeset!{"feat".to_string(), "feature".to_string()}),
                group("Исправление багов", ":bug:", btreeset!{"fix".to_string(), "bugfix".to_string()}),
                group("Повышение производительности", ":zap:", btreeset!{"perf".to_string(), "optimize".to_string()}),
                group("Рефакторинг", ":recycle:", btreeset!{"refactor".to_string(), "code-clean".to_string()}),
                group("Тесты", ":white_check_mark:", btreeset!{"test".to_string(), "tests".to_string()}),
                group("Сборка системы", ":construction_worker:", btreeset!{"build".to_string(), "ci".to_string()}),
                group("Изменения в документации", ":memo:", btreeset!{"doc".to_string(), "docs".to_string()}),
                group("Изменения стиля кода", ":art:", btreeset!{"style".to_string()}),
                group("Рутина", ":wrench:", btreeset!{"chore".to_string()}),
                group("Остальные изменения", ":flying_saucer:", btreeset!{"other".to_string()}),
                group("Откат изменений", ":x:", btreeset!{"revert".to_string()}),
            ],
            skip_markers: btreeset!{"skip".to_string(), "skip-ci".to_string()},
            exclude_types: BTreeSet::new(),
        }
    }

    /// Reads a configuration file. `.json` files go through serde_json, everything else is YAML.
    pub fn load(path: &Path) -> Result<ChangelogConfig, ConfigError>
    {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let config: ChangelogConfig = if path.extension().is_some_and(|x| x == "json")
        {
            serde_json::from_str(&content)?
        }
        else
        {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        info!("Read Changelog Configuration: {} ({} groups)", path.display(), config.groups.len());

        Ok(config)
    }

    /// Rejects a commit type that belongs to more than one group.
    pub fn validate(&self) -> Result<(), ConfigError>
    {
        let mut owners = HashMap::<&str, &str>::new();
        for group in self.groups.iter()
        {
            for commit_type in group.types.iter()
            {
                if let Some(first) = owners.insert(commit_type.as_str(), group.title.as_str())
                {
                    return Err(ConfigError::DuplicateType {
                        commit_type: commit_type.clone(),
                        first: first.to_string(),
                        second: group.title.clone(),
                    });
                }
            }
        }

        debug!("Configuration has {} distinct grouped types", owners.len());
        Ok(())
    }
}

#[test]
fn test_builtin_is_valid()
{
    let config = ChangelogConfig::builtin();

    assert!(config.validate().is_ok());
    assert_eq!(config.groups.len(), 11);
    assert_eq!(config.groups[0].title, "Новая функциональность");
    assert!(config.skip_markers.contains("skip-ci"));
}

#[test]
fn test_load_yaml()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("changelog.yml");
    std::fs::write(&path, "template: |\n  # Release\n  $changes\ngroups:\n  - title: Features\n    icon: \":sparkles:\"\n    types: [feat, feature]\n  - title: Fixes\n    types: [fix]\nskips: [skip-ci]\nexcludeTypes: [chore]\n").unwrap();

    let config = ChangelogConfig::load(&path).unwrap();

    assert_eq!(config.template.as_deref(), Some("# Release\n$changes\n"));
    assert_eq!(config.groups.len(), 2);
    assert_eq!(config.groups[0].icon.as_deref(), Some(":sparkles:"));
    assert_eq!(config.groups[1].icon, None);
    assert!(config.groups[0].types.contains("feature"));
    assert_eq!(config.skip_markers, btreeset!{"skip-ci".to_string()});
    assert_eq!(config.exclude_types, btreeset!{"chore".to_string()});
}

#[test]
fn test_load_json()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("changelog.json");
    std::fs::write(&path, r#"{"groups": [{"title": "Fixes", "types": ["fix"]}], "skipMarkers": ["[no-log]"]}"#).unwrap();

    let config = ChangelogConfig::load(&path).unwrap();

    assert_eq!(config.template, None);
    assert_eq!(config.groups[0].title, "Fixes");
    assert!(config.skip_markers.contains("[no-log]"));
    assert!(config.exclude_types.is_empty());
}

#[test]
fn test_load_rejects_duplicate_types()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("changelog.yaml");
    std::fs::write(&path, "groups:\n  - title: Fixes\n    types: [fix]\n  - title: Bugs\n    types: [bugfix, fix]\n").unwrap();

    match ChangelogConfig::load(&path)
    {
        Err(ConfigError::DuplicateType { commit_type, first, second }) =>
        {
            assert_eq!(commit_type, "fix");
            assert_eq!(first, "Fixes");
            assert_eq!(second, "Bugs");
        }
        other => panic!("Expected a duplicate type error, got {:?}", other),
    }
}

#[test]
fn test_load_missing_file()
{
    let result = ChangelogConfig::load(Path::new("/definitely/not/here.yml"));

    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_run_context_repository()
{
    let context = RunContext::new("octo/hello", "main", true, ChangelogConfig::default()).unwrap();
    assert_eq!(context.owner, "octo");
    assert_eq!(context.repo, "hello");
    assert_eq!(context.branch, "main");

    assert!(RunContext::new("octo", "main", false, ChangelogConfig::default()).is_err());
    assert!(RunContext::new("/hello", "main", false, ChangelogConfig::default()).is_err());
    assert!(RunContext::new("a/b/c", "main", false, ChangelogConfig::default()).is_err());
}
