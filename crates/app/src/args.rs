pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitfs")]
#[command(about = "Mount a branch of a remote repository as a local filesystem")]
pub struct Args {
    /// Path to the gitfs config directory (defaults to ~/.gitfs)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}

/// Overrides for the configured remote, shared by every command that
/// talks to the repository
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RemoteArgs {
    /// Repository URL, e.g. https://github.com/owner/repo
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to read from and commit to
    #[arg(long)]
    pub branch: Option<String>,

    /// Access token
    #[arg(long, env = "GITFS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}
