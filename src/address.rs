//! Jail address parsing
//!
//! A target is addressed as `jail[:owner]@host`: the jail's name or
//! hostname, an optional user that owns in-jail file operations, and the
//! host that supervises the jail.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed jail address
///
/// Immutable once parsed; the session binds to it for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailSpec {
    /// Jail name or hostname to match against the host's jail listing
    pub jail: String,
    /// User performing in-jail file operations, when declared
    pub owner: Option<String>,
    /// Supervisor host reachable over the transport
    pub host: String,
}

impl FromStr for JailSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (jail_part, host) = s
            .split_once('@')
            .ok_or_else(|| Error::Address(s.to_string()))?;

        let (jail, owner) = match jail_part.split_once(':') {
            Some((jail, owner)) => {
                if owner.is_empty() {
                    return Err(Error::Address(s.to_string()));
                }
                (jail, Some(owner.to_string()))
            }
            None => (jail_part, None),
        };

        if jail.is_empty() || host.is_empty() {
            return Err(Error::Address(s.to_string()));
        }

        Ok(JailSpec {
            jail: jail.to_string(),
            owner,
            host: host.to_string(),
        })
    }
}

impl fmt::Display for JailSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}:{}@{}", self.jail, owner, self.host),
            None => write!(f, "{}@{}", self.jail, self.host),
        }
    }
}
