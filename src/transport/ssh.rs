//! SSH transport over libssh2
//!
//! One blocking SSH session per supervisor host. Authentication tries
//! an explicit key file, then the SSH agent, then the default key
//! locations. Everything above this layer is transport-agnostic.

use crate::config::SshConfig;
use crate::error::{Error, Result};
use crate::transport::{ExecOutput, Transport};
use ssh2::Session;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub struct SshTransport {
    session: Session,
}

impl SshTransport {
    /// Open a connection to the supervisor host and authenticate
    pub fn connect(host: &str, config: &SshConfig) -> Result<Self> {
        let addr = (host, config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Transport(format!("could not resolve host '{host}'")))?;

        let tcp = TcpStream::connect_timeout(
            &addr,
            Duration::from_secs(config.connect_timeout_secs),
        )?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        let user = config
            .user
            .clone()
            .or_else(|| env::var("USER").ok())
            .ok_or_else(|| Error::Transport("no SSH user configured and $USER unset".to_string()))?;

        authenticate(&session, &user, config)?;
        debug!(host = %host, user = %user, "SSH session established");

        Ok(SshTransport { session })
    }
}

fn authenticate(session: &Session, user: &str, config: &SshConfig) -> Result<()> {
    if let Some(key_file) = &config.key_file {
        session.userauth_pubkey_file(user, None, key_file, None)?;
    } else if session.userauth_agent(user).is_err() {
        for key_file in default_key_files() {
            if session
                .userauth_pubkey_file(user, None, &key_file, None)
                .is_ok()
            {
                break;
            }
        }
    }

    if !session.authenticated() {
        return Err(Error::Transport(format!(
            "SSH authentication failed for user '{user}'"
        )));
    }
    Ok(())
}

fn default_key_files() -> Vec<PathBuf> {
    let Ok(home) = env::var("HOME") else {
        return Vec::new();
    };
    ["id_ed25519", "id_rsa"]
        .iter()
        .map(|name| Path::new(&home).join(".ssh").join(name))
        .filter(|path| path.exists())
        .collect()
}

impl Transport for SshTransport {
    fn exec(&self, command: &str) -> Result<ExecOutput> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        let mut stdout = Vec::new();
        channel.read_to_end(&mut stdout)?;
        let mut stderr = Vec::new();
        channel.stderr().read_to_end(&mut stderr)?;

        channel.wait_close()?;
        let code = channel.exit_status()?;

        Ok(ExecOutput {
            code,
            stdout,
            stderr,
        })
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let contents = fs::read(local)?;
        let mut channel =
            self.session
                .scp_send(Path::new(remote), 0o644, contents.len() as u64, None)?;
        channel.write_all(&contents)?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(())
    }

    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let (mut channel, stat) = self.session.scp_recv(Path::new(remote))?;
        let mut contents = Vec::with_capacity(stat.size() as usize);
        channel.read_to_end(&mut contents)?;
        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        fs::write(local, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SshConfig;

    #[test]
    #[ignore] // Requires a reachable SSH host
    fn test_exec_basic() {
        // Run against localhost: requires sshd and agent/key auth for $USER
        let transport = SshTransport::connect("localhost", &SshConfig::default()).unwrap();
        let output = transport.exec("echo hello").unwrap();
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout_text().trim(), "hello");
    }
}
