//! Jail directory lookup on the supervisor host
//!
//! Queries the live jail registry with jls(8) and resolves a jail token
//! (name or hostname) to its jid and filesystem root. Listing order is
//! authoritative: the first matching record wins.

use crate::error::{Error, Result};
use crate::transport::Transport;
use serde::Serialize;

/// Listing command issued on the supervisor host; one jail per line,
/// four whitespace-separated fields
pub const LIST_COMMAND: &str = "jls -q jid name host.hostname path";

/// One resolved jail, as reported by the supervisor host
///
/// Populated once per session and treated as authoritative afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JailRecord {
    /// Numeric jail identifier, kept as text (jls prints it, we pass it
    /// back to the connector verbatim)
    pub jid: String,
    /// Jail name
    pub name: String,
    /// Jail hostname
    pub hostname: String,
    /// Jail filesystem root on the supervisor host
    pub path: String,
}

/// Parse jls output into records
///
/// A blank line or end of output terminates the list. Lines with the
/// wrong field count indicate a jls we don't understand and fail the
/// whole listing.
pub fn parse_listing(stdout: &[u8]) -> Result<Vec<JailRecord>> {
    let text = String::from_utf8_lossy(stdout);
    let mut records = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(Error::Resolution(format!(
                "unexpected jls record '{line}'"
            )));
        }

        records.push(JailRecord {
            jid: fields[0].to_string(),
            name: fields[1].to_string(),
            hostname: fields[2].to_string(),
            path: fields[3].to_string(),
        });
    }

    Ok(records)
}

/// Find the first record whose name or hostname equals `token`
pub fn find_record<'a>(records: &'a [JailRecord], token: &str) -> Option<&'a JailRecord> {
    records
        .iter()
        .find(|r| r.name == token || r.hostname == token)
}

/// List all active jails on the supervisor host
///
/// Read-only: never mutates host state.
pub fn list<T: Transport>(transport: &T) -> Result<Vec<JailRecord>> {
    let output = transport.exec(LIST_COMMAND)?;
    if !output.success() {
        return Err(Error::Resolution(output.diagnostics()));
    }
    parse_listing(&output.stdout)
}

/// Resolve a jail token to its record
///
/// First match in listing order wins; no match is fatal.
pub fn resolve<T: Transport>(transport: &T, token: &str) -> Result<JailRecord> {
    let records = list(transport)?;
    find_record(&records, token)
        .cloned()
        .ok_or_else(|| Error::JailNotFound(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::FakeHost;

    const LISTING: &str = "\
1 web1 web1.example.com /usr/jails/web1
2 db1 db1.example.com /usr/jails/db1
7 web2 web1.example.com /usr/jails/web2
";

    #[test]
    fn test_parse_listing() {
        let records = parse_listing(LISTING.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].jid, "1");
        assert_eq!(records[1].name, "db1");
        assert_eq!(records[2].path, "/usr/jails/web2");
    }

    #[test]
    fn test_parse_listing_blank_line_terminates() {
        let listing = "1 web1 web1.example.com /usr/jails/web1\n\n2 db1 db1.example.com /usr/jails/db1\n";
        let records = parse_listing(listing.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_listing_malformed_line() {
        let listing = "1 web1 web1.example.com\n";
        assert!(matches!(
            parse_listing(listing.as_bytes()),
            Err(Error::Resolution(_))
        ));
    }

    #[test]
    fn test_resolve_by_name() {
        let host = FakeHost::new(LISTING);
        let record = resolve(&host, "db1").unwrap();
        assert_eq!(record.jid, "2");
        assert_eq!(record.path, "/usr/jails/db1");
    }

    #[test]
    fn test_resolve_by_hostname_first_match_wins() {
        // web1.example.com appears twice; listing order decides
        let host = FakeHost::new(LISTING);
        let record = resolve(&host, "web1.example.com").unwrap();
        assert_eq!(record.jid, "1");
        assert_eq!(record.name, "web1");
    }

    #[test]
    fn test_resolve_not_found_names_token() {
        let host = FakeHost::new(LISTING);
        match resolve(&host, "mail1") {
            Err(Error::JailNotFound(token)) => assert_eq!(token, "mail1"),
            other => panic!("expected JailNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_listing_failure_carries_stderr() {
        let host = FakeHost::failing_listing("jls: unknown parameter: bogus");
        match resolve(&host, "web1") {
            Err(Error::Resolution(diag)) => {
                assert!(diag.contains("jls: unknown parameter: bogus"))
            }
            other => panic!("expected Resolution, got {other:?}"),
        }
    }
}
