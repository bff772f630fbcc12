//! Privilege escalation wrappers
//!
//! Builds the supervisor-host command prefix that crosses the privilege
//! boundary (sudo or doas). Every wrapped command echoes a unique
//! success key before the payload so callers can tell an accepted
//! escalation from a password prompt, and so the rewriter can recognize
//! and strip a wrapper that was meant for a different execution context.

use crate::error::Result;
use crate::rewrite::quote;
use clap::ValueEnum;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

/// Marker prefix echoed by every escalation wrapper
pub const SUCCESS_MARK: &str = "ESCALATE-SUCCESS";

/// Supported escalation programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BecomeMethod {
    Sudo,
    Doas,
}

/// An escalation context: which program, and which user to become
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub method: BecomeMethod,
    pub user: String,
}

impl Escalation {
    pub fn new(method: BecomeMethod, user: impl Into<String>) -> Self {
        Escalation {
            method,
            user: user.into(),
        }
    }

    /// Same method, different target user
    pub fn for_user(&self, user: impl Into<String>) -> Self {
        Escalation {
            method: self.method,
            user: user.into(),
        }
    }

    /// Wrap `command` so it runs as `self.user` via `shell`
    ///
    /// The wrapped form is `<program> <flags> -u <user> <shell> -c
    /// '<echo key> ; <command>'`, with a fresh random success key per
    /// call.
    pub fn wrap(&self, command: &str, shell: &str) -> Result<String> {
        let key = success_key();
        let payload = quote(&format!("echo {key} ; {command}"))?;
        Ok(match self.method {
            BecomeMethod::Sudo => {
                format!("sudo -H -S -n -u {} {} -c {}", self.user, shell, payload)
            }
            BecomeMethod::Doas => {
                format!("doas -n -u {} {} -c {}", self.user, shell, payload)
            }
        })
    }
}

/// A fresh success key, unique per wrapped command
fn success_key() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("{SUCCESS_MARK}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_sudo_shape() {
        let esc = Escalation::new(BecomeMethod::Sudo, "root");
        let wrapped = esc.wrap("whoami", "/bin/sh").unwrap();
        assert!(wrapped.starts_with("sudo -H -S -n -u root /bin/sh -c "));
        assert!(wrapped.contains(SUCCESS_MARK));
        assert!(wrapped.contains("whoami"));
    }

    #[test]
    fn test_wrap_doas_shape() {
        let esc = Escalation::new(BecomeMethod::Doas, "deploy");
        let wrapped = esc.wrap("id", "/bin/sh").unwrap();
        assert!(wrapped.starts_with("doas -n -u deploy /bin/sh -c "));
    }

    #[test]
    fn test_success_keys_are_unique() {
        assert_ne!(success_key(), success_key());
    }

    #[test]
    fn test_for_user_keeps_method() {
        let esc = Escalation::new(BecomeMethod::Doas, "root");
        let retargeted = esc.for_user("deploy");
        assert_eq!(retargeted.method, BecomeMethod::Doas);
        assert_eq!(retargeted.user, "deploy");
    }
}
