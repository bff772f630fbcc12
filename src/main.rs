//! Gangway - remote jail command execution and file transfer
//!
//! Addresses FreeBSD jails behind a supervisor host as
//! `jail[:owner]@host`: commands are rewritten to enter the jail via
//! the best available connector, files are staged through the host and
//! relayed across the jail's filesystem boundary.

mod address;
mod cli;
mod config;
mod connector;
mod directory;
mod error;
mod escalate;
mod rewrite;
mod session;
mod transfer;
mod transport;

use address::JailSpec;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use escalate::Escalation;
use session::JailSession;
use transport::ssh::SshTransport;

use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = config::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Commands::Completion { shell } => {
            Cli::generate_completion(*shell);
            Ok(())
        }

        Commands::Jails { host, json } => {
            let transport = SshTransport::connect(host, &config.ssh)?;
            let records = directory::list(&transport)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!(
                        "{:>5}  {:<16} {:<24} {}",
                        record.jid, record.name, record.hostname, record.path
                    );
                }
            }
            Ok(())
        }

        Commands::Exec {
            target,
            escalate,
            command,
        } => {
            let session = open_session(target, &cli, &config, *escalate)?;
            let output = session.exec(&command.join(" "))?;
            io::stdout().write_all(&output.stdout)?;
            io::stderr().write_all(&output.stderr)?;
            std::process::exit(output.code);
        }

        Commands::Put {
            target,
            local,
            remote,
        } => {
            let session = open_session(target, &cli, &config, true)?;
            session.put_file(local, remote)
        }

        Commands::Fetch {
            target,
            remote,
            local,
        } => {
            let session = open_session(target, &cli, &config, true)?;
            session.fetch_file(remote, local)
        }
    }
}

/// Parse the target address and open a session to its supervisor host
///
/// `escalate` arms the session's supervisor-context escalation when a
/// become method is configured; transfers always arm it so boundary
/// copies run in the right context.
fn open_session(
    target: &str,
    cli: &Cli,
    config: &Config,
    escalate: bool,
) -> Result<JailSession<SshTransport>> {
    let mut spec: JailSpec = target.parse()?;
    if spec.owner.is_none() {
        spec.owner = config.defaults.owner.clone();
    }

    let transport = SshTransport::connect(&spec.host, &config.ssh)?;
    let shell = cli
        .shell
        .clone()
        .unwrap_or_else(|| config.defaults.shell.clone());

    let mut session = JailSession::new(spec, transport).with_shell(shell);

    if escalate {
        let method = cli.become_method.or(config.defaults.become_method);
        if let Some(method) = method {
            session = session
                .with_escalation(Escalation::new(method, config.defaults.become_user.as_str()));
        }
    }

    Ok(session)
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "gangway=debug" } else { "gangway=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
