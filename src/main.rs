use chrono::Utc;
use clap::Parser;
use day0guard::cli::{Cli, Command};
use day0guard::config::Config;
use day0guard::github::{GithubClient, RepoRef};
use day0guard::local::LocalTree;
use day0guard::node::NpmRegistry;
use day0guard::output::{self, CheckOutcome, ConsoleSink};
use day0guard::run::{self, CheckRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Exit code of `scan` when a Day-0 dependency was found
const EXIT_VIOLATIONS: i32 = 2;

fn main() {
    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,day0guard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let (result, is_scan) = match cli.command {
        Some(Command::Check {
            repo,
            sha,
            pr,
            token,
            api_url,
        }) => (run_github(&config, repo, sha, pr, token, &api_url), false),
        Some(Command::Scan { path }) => (run_scan(&config, path), true),
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if json_output {
        output::print_json(&outcome);
    } else {
        output::print_text(&outcome);
    }

    if is_scan && outcome.is_failure() {
        std::process::exit(EXIT_VIOLATIONS);
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn run_github(
    config: &Config,
    repo: RepoRef,
    sha: String,
    pr: Option<u64>,
    token: Option<String>,
    api_url: &str,
) -> Result<CheckOutcome, Box<dyn std::error::Error>> {
    if token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set, check runs will be rejected");
    }
    let timeout = config.request_timeout();
    let github = GithubClient::new(api_url, repo, token, timeout);
    let registry = NpmRegistry::new(&config.registry_url, timeout);
    let request = CheckRequest {
        revision: sha,
        pull_request: pr,
    };

    let outcome = run::run_check(
        &github,
        &registry,
        &github,
        &request,
        &config.settings(),
        Utc::now(),
    )?;
    Ok(outcome)
}

fn run_scan(config: &Config, path: PathBuf) -> Result<CheckOutcome, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("{} is not a directory", path.display()).into());
    }
    let tree = LocalTree::new(path);
    let registry = NpmRegistry::new(&config.registry_url, config.request_timeout());
    let request = CheckRequest {
        revision: "HEAD".to_string(),
        pull_request: None,
    };

    let outcome = run::run_check(
        &tree,
        &registry,
        &ConsoleSink,
        &request,
        &config.settings(),
        Utc::now(),
    )?;
    Ok(outcome)
}
