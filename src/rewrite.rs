//! Command rewriting across the jail boundary
//!
//! Turns a command meant for "the remote host" into one that executes
//! inside the resolved jail via the selected connector. Two caller-side
//! artifacts must not survive the rewrite in the wrong place:
//! - the keep-alive sentinel (` && sleep 0`) must end up as the
//!   outermost suffix, not inside the jail-entry quoting
//! - an escalation wrapper built for the final execution context must be
//!   stripped, because the jail-entry helper is what crosses the
//!   privilege boundary and wrapping twice corrupts the quoting

use crate::connector::ConnectorKind;
use crate::directory::JailRecord;
use crate::error::{Error, Result};
use crate::escalate::{self, Escalation};

/// Trailing marker callers append to detect command completion on
/// pty-backed sessions
pub const KEEPALIVE_SENTINEL: &str = " && sleep 0";

/// Quote a string as a single shell argument
pub(crate) fn quote(s: &str) -> Result<String> {
    shlex::try_quote(s)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| Error::Rewrite("command contains a NUL byte".to_string()))
}

/// Rewrite `inner` to execute inside the jail
///
/// `outer` is the escalation applied in the supervisor-host context,
/// wrapping the whole connector invocation. An escalation wrapper
/// already embedded in `inner` (recognized by its success marker) is
/// stripped first; jail entry supplies those privileges.
pub fn rewrite(
    inner: &str,
    shell: &str,
    record: &JailRecord,
    connector: ConnectorKind,
    outer: Option<&Escalation>,
) -> Result<String> {
    let (command, had_sentinel) = strip_sentinel(inner);

    let command = if command.contains(escalate::SUCCESS_MARK) {
        strip_escalation(command, shell)?
    } else {
        command.to_string()
    };

    let mut rewritten = format!(
        "{} {} -c {}",
        connector.invocation(record),
        shell,
        quote(&command)?
    );

    if let Some(escalation) = outer {
        rewritten = escalation.wrap(&rewritten, shell)?;
    }

    if had_sentinel {
        rewritten.push_str(KEEPALIVE_SENTINEL);
    }

    Ok(rewritten)
}

/// Split a trailing keep-alive sentinel off the command
///
/// Mid-command occurrences are payload, not sentinel; only the suffix
/// position counts.
fn strip_sentinel(command: &str) -> (&str, bool) {
    match command.strip_suffix(KEEPALIVE_SENTINEL) {
        Some(stripped) => (stripped, true),
        None => (command, false),
    }
}

/// Recover the payload from an escalation-wrapped command
///
/// Expects the shape `escalate::Escalation::wrap` produces:
/// `<prefix> <shell> -c <quotes>echo <key> ; <payload><quotes>`.
/// Anything else, with the success marker present, is a caller/contract
/// mismatch and a hard error - passing the command through unrewritten
/// would run it in the wrong execution context.
fn strip_escalation(command: &str, shell: &str) -> Result<String> {
    let needle = format!("{shell} -c ");
    let (_, tail) = command.split_once(needle.as_str()).ok_or_else(|| {
        Error::Rewrite(format!(
            "escalation marker present but '{needle}' wrapper missing in '{command}'"
        ))
    })?;

    // The quoting introduced by the wrapper sits between "-c " and the
    // echo; the same characters close the payload at the end.
    let mark = tail.find("echo ").ok_or_else(|| {
        Error::Rewrite(format!(
            "escalation wrapper missing its success echo in '{command}'"
        ))
    })?;
    let quotes = &tail[..mark];
    if tail.len() < 2 * quotes.len() || (!quotes.is_empty() && !tail.ends_with(quotes)) {
        return Err(Error::Rewrite(format!(
            "unbalanced quoting in escalated command '{command}'"
        )));
    }

    let body = &tail[quotes.len()..tail.len() - quotes.len()];
    let (_, payload) = body.split_once(" ; ").ok_or_else(|| {
        Error::Rewrite(format!(
            "escalation wrapper missing its payload separator in '{command}'"
        ))
    })?;

    Ok(payload.to_string())
}
