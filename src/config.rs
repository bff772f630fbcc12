//! Configuration file parsing for Gangway
//!
//! Parses `gangway.toml` configuration files using serde

use crate::error::{Error, Result};
use crate::escalate::BecomeMethod;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_FILE: &str = "gangway.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Session defaults, overridable per invocation
#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    /// Shell used for `-c` execution on the jail host and inside jails
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Escalation program on the jail host; none means commands run as
    /// the SSH login user
    pub become_method: Option<BecomeMethod>,
    /// User the escalation program becomes
    #[serde(default = "default_become_user")]
    pub become_user: String,
    /// Owner for in-jail file operations when the address declares none
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user; falls back to $USER
    pub user: Option<String>,
    /// Private key file; falls back to the SSH agent, then default key
    /// locations
    pub key_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_become_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            shell: default_shell(),
            become_method: None,
            become_user: default_become_user(),
            owner: None,
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            port: default_port(),
            user: None,
            key_file: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Load configuration from a file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Load the given config file, or fall back to `gangway.toml` in the
/// working directory, or to built-in defaults
///
/// An explicitly passed path that does not exist is an error; a missing
/// default file is not.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load(path),
        None => {
            let default = Path::new(DEFAULT_FILE);
            if default.exists() {
                load(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[defaults]
shell = "/bin/csh"
become_method = "doas"
become_user = "operator"
owner = "deploy"

[ssh]
port = 2222
user = "admin"
key_file = "/home/admin/.ssh/id_ed25519"
connect_timeout_secs = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.shell, "/bin/csh");
        assert_eq!(config.defaults.become_method, Some(BecomeMethod::Doas));
        assert_eq!(config.defaults.become_user, "operator");
        assert_eq!(config.defaults.owner.as_deref(), Some("deploy"));
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.ssh.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.defaults.shell, "/bin/sh");
        assert_eq!(config.defaults.become_user, "root");
        assert_eq!(config.ssh.port, 22);
        assert!(config.defaults.become_method.is_none());
    }

    #[test]
    fn test_load_missing_file_is_config_read_error() {
        let result = load(Path::new("/nonexistent/gangway.toml"));
        assert!(matches!(result, Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "defaults = not toml").unwrap();
        let result = load(file.path());
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }
}
