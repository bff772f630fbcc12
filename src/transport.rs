//! Transport abstraction for the supervisor host
//!
//! The session core is transport-agnostic: anything that can run a
//! command on the jail host and move files to/from it satisfies
//! [`Transport`]. The shipped implementation rides on libssh2
//! (see [`ssh`]); tests use a scripted in-memory host.

pub mod ssh;

use crate::error::Result;
use std::path::Path;

/// Captured result of one blocking remote command
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code
    pub code: i32,
    /// Raw standard output
    pub stdout: Vec<u8>,
    /// Raw standard error
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    /// True if the command exited zero
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Standard output as text, lossily decoded
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Combined stdout/stderr for error diagnostics
    pub fn diagnostics(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        let mut out = String::new();
        if !stdout.trim().is_empty() {
            out.push_str(stdout.trim());
        }
        if !stderr.trim().is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(stderr.trim());
        }
        out
    }
}

/// A blocking connection to the supervisor host
///
/// Every call is a synchronous round-trip. Cancellation and timeouts are
/// the implementation's concern; callers see completed results only.
pub trait Transport {
    /// Run a shell command on the supervisor host
    fn exec(&self, command: &str) -> Result<ExecOutput>;

    /// Copy a local file to a path on the supervisor host
    fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Copy a file on the supervisor host to a local path
    fn download(&self, remote: &str, local: &Path) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_combines_streams() {
        let output = ExecOutput {
            code: 1,
            stdout: b"partial output\n".to_vec(),
            stderr: b"jls: unknown parameter\n".to_vec(),
        };
        assert_eq!(output.diagnostics(), "partial output\njls: unknown parameter");
    }

    #[test]
    fn test_diagnostics_empty_streams() {
        let output = ExecOutput {
            code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(output.success());
        assert_eq!(output.diagnostics(), "");
    }
}
