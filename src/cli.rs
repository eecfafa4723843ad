use crate::config::Config;
use crate::github::{DEFAULT_API_URL, RepoRef};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fails pull requests that pull in packages published in the last day
#[derive(Parser, Debug)]
#[command(name = "day0guard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ~/.config/day0guard/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Trailing window in hours
    #[arg(long, global = true, value_name = "HOURS")]
    pub window_hours: Option<u64>,

    /// Stop after this many violations
    #[arg(long, global = true, value_name = "N")]
    pub max_violations: Option<usize>,

    /// Cap on distinct dependencies collected
    #[arg(long, global = true, value_name = "N")]
    pub max_dependencies: Option<usize>,

    /// npm registry base URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a GitHub revision and report through a check run
    Check {
        /// Repository as owner/name
        #[arg(long)]
        repo: RepoRef,

        /// Head commit SHA of the pull request
        #[arg(long)]
        sha: String,

        /// Pull request number to comment on
        #[arg(long)]
        pr: Option<u64>,

        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, hide = true)]
        token: Option<String>,

        #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, hide = true)]
        api_url: String,
    },
    /// Check a local working tree
    Scan {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

impl Cli {
    /// Apply flag overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(hours) = self.window_hours {
            config.window_hours = hours;
        }
        if let Some(max) = self.max_violations {
            config.max_violations = max;
        }
        if let Some(max) = self.max_dependencies {
            config.max_dependencies = max;
        }
        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
    }
}
