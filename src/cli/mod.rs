// src/cli/mod.rs

use clap::Parser;
use std::path::PathBuf;

pub mod dispatcher;
pub mod handlers;
pub mod render;

/// netscope: an interactive, context-aware shell for cloud network topology.
///
/// Without `--command`, starts a REPL. Type `?` at any prompt for the commands
/// legal in the current context, `exit` to leave a context and `end` to return
/// to the top.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Account profile. Cached data is tagged with it.
    #[arg(long)]
    pub profile: Option<String>,

    /// Path to config.toml. Defaults to ~/.config/netscope/config.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the JSON inventory served as the resource provider.
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Ignore cached data for this session; fresh results are still written.
    #[arg(long)]
    pub no_cache: bool,

    /// Output format: table or json.
    #[arg(long)]
    pub format: Option<String>,

    /// Run a command and exit. Repeat to run several in order.
    #[arg(long, short = 'c')]
    pub command: Vec<String>,
}
