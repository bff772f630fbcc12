//! Command-line interface for Gangway
//!
//! Uses clap with derive for type-safe CLI parsing

use crate::escalate::BecomeMethod;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Gangway - remote jail command execution and file transfer
#[derive(Parser)]
#[command(name = "gangway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (default: gangway.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Shell used for command execution (overrides config)
    #[arg(long)]
    pub shell: Option<String>,

    /// Escalation program on the jail host (overrides config)
    #[arg(long, value_enum)]
    pub become_method: Option<BecomeMethod>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a command inside a jail on a remote host
    Exec {
        /// Target jail, addressed as jail[:owner]@host
        target: String,

        /// Escalate privileges on the jail host before entering the jail
        #[arg(short, long)]
        escalate: bool,

        /// Command to execute (use -- to separate from options)
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Copy a local file into a jail
    Put {
        /// Target jail, addressed as jail[:owner]@host
        target: String,

        /// Local source file
        local: PathBuf,

        /// Destination path inside the jail
        remote: String,
    },

    /// Copy a file out of a jail
    Fetch {
        /// Target jail, addressed as jail[:owner]@host
        target: String,

        /// Source path inside the jail
        remote: String,

        /// Local destination file
        local: PathBuf,
    },

    /// List active jails on a remote host
    Jails {
        /// Supervisor host to query
        host: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "gangway", &mut std::io::stdout());
    }
}
