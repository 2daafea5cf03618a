use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};

mod feature;
mod libs;

use feature::{history::{github::GithubHistory, local::LocalHistory, HistorySource}, Changelog};
use libs::{config::{ChangelogConfig, RunContext}, error::{ChangelogError, ConfigError}};

#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args
{
    /// Token used for the GitHub GraphQL API.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    gh_token: Option<String>,

    /// Repository in the `owner/repo` form.
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    #[arg(short, long, default_value = "master")]
    branch: String,

    /// YAML (or `.json`) changelog configuration; the built-in one is used when omitted.
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    #[arg(long, action)]
    use_icons: bool,

    /// Read the history from a local clone instead of GitHub.
    #[arg(long)]
    local: Option<PathBuf>,

    /// Step output file; the changelog is printed to stdout when unset.
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    #[arg(short, long, action)]
    verbose: bool,
}

fn init_logger(verbose: bool)
{
    // Initialize the logger, while in debug mode, log everything; otherwise, log only errors, warnings and info.
    let level = if cfg!(debug_assertions)
    {
        log::LevelFilter::max()
    }
    else if verbose
    {
        log::LevelFilter::Debug
    }
    else
    {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .init();
}

async fn run(args: Args) -> Result<Changelog, ChangelogError>
{
    let config = match &args.config_path
    {
        Some(path) => ChangelogConfig::load(path)?,
        None =>
        {
            info!("No configuration given, using the built-in groups.");
            ChangelogConfig::builtin()
        }
    };

    // A local clone does not need real coordinates, only the branch.
    let repository = match (&args.repository, &args.local)
    {
        (Some(repository), _) => repository.clone(),
        (None, Some(_)) => "local/repository".to_string(),
        (None, None) => return Err(ConfigError::MissingRepository.into()),
    };
    let context = RunContext::new(&repository, &args.branch, args.use_icons, config)?;

    let source: Box<dyn HistorySource> = match &args.local
    {
        Some(path) => Box::new(LocalHistory::new(path, &context.branch)),
        None => Box::new(GithubHistory::new(args.gh_token.clone(), &context)?),
    };

    let changelog = feature::generate(source.as_ref(), &context).await?;

    let text = match &changelog
    {
        Changelog::Published { text, .. } => text.as_str(),
        Changelog::NothingToPublish => "",
    };
    match &args.github_output
    {
        Some(path) => feature::output::write_github_output(path, "changelog", text)?,
        None => println!("{}", text),
    }

    Ok(changelog)
}

#[tokio::main]
async fn main()
{
    let args = Args::parse();
    init_logger(args.verbose);

    match run(args).await
    {
        Ok(Changelog::Published { lines, .. }) => info!("Release notes created: {} lines.", lines.len()),
        Ok(Changelog::NothingToPublish) => warn!("Release notes are empty."),
        Err(error) =>
        {
            error!("{}", error);
            std::process::exit(1);
        }
    }
}
