//! Per-target jail session
//!
//! Binds one jail address to one supervisor-host connection and layers
//! jail addressing on top of it. The resolved jail record and the
//! selected connector are looked up on first need and then cached for
//! the session's lifetime; a session is sequential by construction, so
//! the caches need no locking. Fan-out across jails means one session
//! per target, each with its own connection.

use crate::address::JailSpec;
use crate::connector::{self, ConnectorKind};
use crate::directory::{self, JailRecord};
use crate::error::Result;
use crate::escalate::Escalation;
use crate::rewrite;
use crate::transfer::Stager;
use crate::transport::{ExecOutput, Transport};
use once_cell::unsync::OnceCell;
use std::path::Path;
use tracing::{debug, warn};

/// A session against one jail on one supervisor host
pub struct JailSession<T: Transport> {
    spec: JailSpec,
    transport: T,
    shell: String,
    escalation: Option<Escalation>,
    record: OnceCell<JailRecord>,
    connector: OnceCell<ConnectorKind>,
}

impl<T: Transport> JailSession<T> {
    pub fn new(spec: JailSpec, transport: T) -> Self {
        JailSession {
            spec,
            transport,
            shell: "/bin/sh".to_string(),
            escalation: None,
            record: OnceCell::new(),
            connector: OnceCell::new(),
        }
    }

    /// Shell used for `-c` execution on both sides of the jail boundary
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Escalation applied in the supervisor-host context
    pub fn with_escalation(mut self, escalation: Escalation) -> Self {
        self.escalation = Some(escalation);
        self
    }

    /// The resolved jail record, queried once per session
    pub fn record(&self) -> Result<&JailRecord> {
        self.record.get_or_try_init(|| {
            debug!(jail = %self.spec.jail, "resolving jail");
            directory::resolve(&self.transport, &self.spec.jail)
        })
    }

    /// The selected jail-entry connector, probed once per session
    pub fn connector(&self) -> Result<ConnectorKind> {
        self.connector
            .get_or_try_init(|| {
                let kind = connector::detect(&self.transport)?;
                debug!(connector = %kind, "selected jail connector");
                Ok(kind)
            })
            .copied()
    }

    /// Run a command inside the jail
    ///
    /// The command is rewritten to cross the jail boundary via the
    /// selected connector; see [`rewrite::rewrite`] for sentinel and
    /// escalation handling.
    pub fn exec(&self, command: &str) -> Result<ExecOutput> {
        let record = self.record()?;
        let kind = self.connector()?;
        let rewritten =
            rewrite::rewrite(command, &self.shell, record, kind, self.escalation.as_ref())?;
        debug!(command = %rewritten, "jail exec");
        self.transport.exec(&rewritten)
    }

    /// Copy a local file to a path inside the jail
    pub fn put_file(&self, local: &Path, jail_path: &str) -> Result<()> {
        let jail_root = self.record()?.path.clone();
        self.stager().put(local, jail_path, &jail_root)
    }

    /// Copy a file from inside the jail to a local path
    pub fn fetch_file(&self, jail_path: &str, local: &Path) -> Result<()> {
        let jail_root = self.record()?.path.clone();
        self.stager().fetch(jail_path, &jail_root, local)
    }

    fn stager(&self) -> Stager<'_, T> {
        Stager::new(&self.transport, self.shell.clone(), self.copy_escalation())
    }

    /// Context for the in-jail copy: the declared owner when the address
    /// names one, else the session's escalation user
    fn copy_escalation(&self) -> Option<Escalation> {
        match (&self.spec.owner, &self.escalation) {
            (Some(owner), Some(escalation)) => Some(escalation.for_user(owner)),
            (Some(owner), None) => {
                warn!(owner = %owner, "owner declared but no escalation method configured");
                None
            }
            (None, Some(escalation)) => Some(escalation.clone()),
            (None, None) => None,
        }
    }
}
