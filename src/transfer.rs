//! Staged file transfer through the supervisor host
//!
//! Files never cross directly into a jail: they hop through a temporary
//! staging file on the supervisor host, then a privileged copy moves
//! them across the jail's filesystem boundary. The staging file's
//! lifetime is strictly bounded by the operation - it is removed on
//! every exit path.

use crate::error::{Error, Result};
use crate::escalate::Escalation;
use crate::rewrite::quote;
use crate::transport::Transport;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Lexically normalize a jail-relative path
///
/// Non-absolute paths are rooted at `/`; `.`, `..` and repeated
/// separators collapse. `..` can never climb above the root, so the
/// result is always a clean absolute path. Idempotent.
pub fn normalize(path: &str) -> String {
    let rooted = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let mut normalized = PathBuf::from("/");
    for component in Path::new(&rooted).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }

    normalized.display().to_string()
}

/// Map a jail-relative path to its absolute location under the jail's
/// filesystem root
pub fn jail_absolute(path: &str, jail_root: &str) -> String {
    let normalized = normalize(path);
    let relative = normalized.trim_start_matches('/');
    if relative.is_empty() {
        jail_root.to_string()
    } else {
        format!("{}/{}", jail_root.trim_end_matches('/'), relative)
    }
}

/// Runs staged put/fetch operations against one supervisor host
///
/// `copy_escalation` is the context for the relocation step across the
/// jail boundary: the declared jail owner when the address names one,
/// otherwise the session's escalation user. `None` runs the copy as the
/// transport's login user.
pub struct Stager<'a, T: Transport> {
    transport: &'a T,
    shell: String,
    copy_escalation: Option<Escalation>,
}

impl<'a, T: Transport> Stager<'a, T> {
    pub fn new(
        transport: &'a T,
        shell: impl Into<String>,
        copy_escalation: Option<Escalation>,
    ) -> Self {
        Stager {
            transport,
            shell: shell.into(),
            copy_escalation,
        }
    }

    /// Copy a local file into the jail
    pub fn put(&self, local: &Path, jail_path: &str, jail_root: &str) -> Result<()> {
        let dest = jail_absolute(jail_path, jail_root);
        debug!(local = %local.display(), dest = %dest, "staged put");

        let staging = self.acquire_staging()?;
        let result = (|| {
            self.transport.upload(local, &staging)?;
            self.host_copy(&staging, &dest)
        })();
        self.finish(&staging, result)
    }

    /// Copy a file out of the jail to a local path
    pub fn fetch(&self, jail_path: &str, jail_root: &str, local: &Path) -> Result<()> {
        let src = jail_absolute(jail_path, jail_root);
        debug!(src = %src, local = %local.display(), "staged fetch");

        let staging = self.acquire_staging()?;
        let result = (|| {
            self.host_copy(&src, &staging)?;
            self.transport.download(&staging, local)
        })();
        self.finish(&staging, result)
    }

    /// Create a uniquely-named staging file, world-readable so the
    /// in-jail copy user can read it
    fn acquire_staging(&self) -> Result<String> {
        let output = self.transport.exec("mktemp")?;
        if !output.success() {
            return Err(Error::Transfer {
                step: "mktemp",
                output: output.diagnostics(),
            });
        }

        // Last line only: login banners may precede it
        let staging = output
            .stdout_text()
            .lines()
            .last()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or(Error::Transfer {
                step: "mktemp",
                output: "mktemp produced no path".to_string(),
            })?;

        let output = self
            .transport
            .exec(&format!("chmod 0644 {}", quote(&staging)?))?;
        if !output.success() {
            let err = Error::Transfer {
                step: "chmod",
                output: output.diagnostics(),
            };
            self.cleanup_after_failure(&staging);
            return Err(err);
        }

        Ok(staging)
    }

    /// Relocate across the jail boundary in the privileged context
    fn host_copy(&self, from: &str, to: &str) -> Result<()> {
        let mut command = format!("cp {} {}", quote(from)?, quote(to)?);
        if let Some(escalation) = &self.copy_escalation {
            command = escalation.wrap(&command, &self.shell)?;
        }

        let output = self.transport.exec(&command)?;
        if !output.success() {
            return Err(Error::Transfer {
                step: "copy",
                output: output.diagnostics(),
            });
        }
        Ok(())
    }

    /// Remove the staging file
    fn release_staging(&self, staging: &str) -> Result<()> {
        let output = self.transport.exec(&format!("rm {}", quote(staging)?))?;
        if !output.success() {
            return Err(Error::Transfer {
                step: "remove",
                output: output.diagnostics(),
            });
        }
        Ok(())
    }

    /// Release the staging file on every exit path
    ///
    /// After a failed step the removal is best-effort and the step's
    /// error propagates; after success a failed removal is itself an
    /// error.
    fn finish(&self, staging: &str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => self.release_staging(staging),
            Err(err) => {
                self.cleanup_after_failure(staging);
                Err(err)
            }
        }
    }

    fn cleanup_after_failure(&self, staging: &str) {
        if let Err(cleanup_err) = self.release_staging(staging) {
            warn!(staging = %staging, error = %cleanup_err, "staging cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalate::{BecomeMethod, Escalation};
    use crate::transport::testing::FakeHost;
    use std::fs;

    #[test]
    fn test_normalize_relative_rooted_at_slash() {
        assert_eq!(normalize("etc/rc.conf"), "/etc/rc.conf");
    }

    #[test]
    fn test_normalize_collapses_dots_and_separators() {
        assert_eq!(normalize("/etc/./..//usr/local"), "/usr/local");
        assert_eq!(normalize("a/b/../c"), "/a/c");
    }

    #[test]
    fn test_normalize_idempotent() {
        for path in ["etc/rc.conf", "/a/b/../c", "../../etc/passwd", "/", ""] {
            let once = normalize(path);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_jail_absolute_traversal_cannot_escape() {
        assert_eq!(
            jail_absolute("../../etc/passwd", "/jails/myjail"),
            "/jails/myjail/etc/passwd"
        );
    }

    #[test]
    fn test_jail_absolute_stays_under_root() {
        for path in ["/etc/conf", "etc/conf", "../etc/conf", "/../../x"] {
            let absolute = jail_absolute(path, "/usr/jails/web1");
            assert!(absolute.starts_with("/usr/jails/web1/"), "{absolute}");
        }
    }

    #[test]
    fn test_put_stages_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("rc.conf");
        fs::write(&local, b"hostname=\"web1\"\n").unwrap();

        let host = FakeHost::new("");
        let stager = Stager::new(&host, "/bin/sh", None);
        stager.put(&local, "/etc/rc.conf", "/usr/jails/web1").unwrap();

        let files = host.files.borrow();
        assert_eq!(
            files.get("/usr/jails/web1/etc/rc.conf").map(Vec::as_slice),
            Some(b"hostname=\"web1\"\n".as_slice())
        );
        // Staging file is gone
        assert!(!files.keys().any(|k| k.starts_with("/tmp/gangway.")));
        drop(files);

        let commands = host.commands.borrow();
        assert_eq!(commands[0], "mktemp");
        assert!(commands[1].starts_with("chmod 0644 /tmp/gangway."));
        assert!(commands[2].starts_with("cp /tmp/gangway."));
        assert!(commands[3].starts_with("rm /tmp/gangway."));
    }

    #[test]
    fn test_fetch_failure_still_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out");

        let host = FakeHost::new("");
        let stager = Stager::new(&host, "/bin/sh", None);
        let err = stager
            .fetch("/etc/missing", "/usr/jails/web1", &local)
            .unwrap_err();

        match err {
            Error::Transfer { step, output } => {
                assert_eq!(step, "copy");
                assert!(output.contains("No such file"));
            }
            other => panic!("expected Transfer, got {other:?}"),
        }
        // Best-effort cleanup ran anyway
        assert!(!host.files.borrow().keys().any(|k| k.starts_with("/tmp/gangway.")));
        assert_eq!(host.count_commands(|c| c.starts_with("rm ")), 1);
    }

    #[test]
    fn test_put_fetch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("original.db");
        let copy = dir.path().join("copy.db");
        fs::write(&original, b"\x00\x01binary payload\xff").unwrap();

        let host = FakeHost::new("");
        let stager = Stager::new(&host, "/bin/sh", None);
        stager.put(&original, "/var/db/app.db", "/usr/jails/db1").unwrap();
        stager.fetch("/var/db/app.db", "/usr/jails/db1", &copy).unwrap();

        assert_eq!(fs::read(&original).unwrap(), fs::read(&copy).unwrap());
    }

    #[test]
    fn test_copy_runs_in_declared_context() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("f");
        fs::write(&local, b"x").unwrap();

        let host = FakeHost::new("");
        let escalation = Escalation::new(BecomeMethod::Doas, "deploy");
        let stager = Stager::new(&host, "/bin/sh", Some(escalation));
        stager.put(&local, "/tmp/f", "/usr/jails/web1").unwrap();

        assert_eq!(
            host.count_commands(|c| c.starts_with("doas -n -u deploy ") && c.contains("; cp ")),
            1
        );
    }
}
