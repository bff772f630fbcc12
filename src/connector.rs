//! Jail-entry connector selection
//!
//! A connector is the host-side broker that executes a command inside a
//! jail's namespace. Which one is available depends on what the
//! supervisor host has installed; jexec(8) ships with the base system
//! and is the fallback.

use crate::directory::JailRecord;
use crate::error::Result;
use crate::transport::Transport;
use std::fmt;

/// Available jail-entry strategies, in probe priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    /// iocage(8) - addresses jails by name
    Iocage,
    /// jailme(8) - addresses jails by jid, allows unprivileged entry
    Jailme,
    /// jexec(8) - base system fallback, addresses jails by jid
    Jexec,
}

/// Helpers probed for, highest priority first. Jexec is not probed; it
/// is always present on a jail host.
const PROBE_ORDER: [ConnectorKind; 2] = [ConnectorKind::Iocage, ConnectorKind::Jailme];

impl ConnectorKind {
    /// The helper binary this connector invokes
    pub fn program(&self) -> &'static str {
        match self {
            ConnectorKind::Iocage => "iocage",
            ConnectorKind::Jailme => "jailme",
            ConnectorKind::Jexec => "jexec",
        }
    }

    /// Build the jail-entry prefix for a resolved jail
    ///
    /// Each variant supplies its own argument rule: iocage wants the
    /// jail name, jailme and jexec want the jid.
    pub fn invocation(&self, record: &JailRecord) -> String {
        match self {
            ConnectorKind::Iocage => format!("iocage exec {}", record.name),
            ConnectorKind::Jailme => format!("jailme {}", record.jid),
            ConnectorKind::Jexec => format!("jexec {}", record.jid),
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Probe the supervisor host for the best available connector
///
/// Existence probes are side-effect-free (`which -s`); a non-zero exit
/// means absent and falls through to the next candidate. Transport
/// failures propagate - they mean the host is unreachable, not that a
/// helper is missing.
pub fn detect<T: Transport>(transport: &T) -> Result<ConnectorKind> {
    for kind in PROBE_ORDER {
        let probe = transport.exec(&format!("which -s {}", kind.program()))?;
        if probe.success() {
            return Ok(kind);
        }
    }
    Ok(ConnectorKind::Jexec)
}
