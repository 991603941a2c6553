use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Parse an address:port string.
///
/// Handles multiple address formats:
/// - IPv4: "127.0.0.1:3000" or "*:8080"
/// - IPv6: "\[::1]:3000", "\[fe80::1%lo0]:8080" or unbracketed ":::22" (netstat)
///
/// Brackets are stripped and "0.0.0.0" is reported as "*".
pub fn parse_address(address: &str) -> Option<(String, u16)> {
    if let Some(rest) = address.strip_prefix('[') {
        // IPv6 format: [::1]:3000
        let bracket_end = rest.find(']')?;
        let port_str = rest[bracket_end + 1..].strip_prefix(':')?;
        let port: u16 = port_str.parse().ok()?;
        return Some((rest[..bracket_end].to_string(), port));
    }

    let last_colon = address.rfind(':')?;
    let addr = &address[..last_colon];
    let port: u16 = address[last_colon + 1..].parse().ok()?;
    let addr = match addr {
        "" | "0.0.0.0" => "*",
        other => other,
    };
    Some((addr.to_string(), port))
}

/// Run a scan command and return its standard output.
///
/// A non-zero exit is a failed scan, never an empty socket table.
pub async fn run_scan_command(program: &str, args: &[&str]) -> Result<String> {
    run_scan_command_accepting(program, args, &[0]).await
}

/// Run a scan command that may exit with one of `accepted` codes.
pub async fn run_scan_command_accepting(
    program: &str,
    args: &[&str],
    accepted: &[i32],
) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::InspectionFailed(format!("failed to run {}: {}", program, e)))?;

    if !output.status.code().is_some_and(|code| accepted.contains(&code)) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::InspectionFailed(format!(
            "{} failed ({}): {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| {
        Error::InspectionFailed(format!("invalid UTF-8 in {} output: {}", program, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_address() {
        assert_eq!(parse_address("127.0.0.1:3000"), Some(("127.0.0.1".to_string(), 3000)));
        assert_eq!(parse_address("*:8080"), Some(("*".to_string(), 8080)));
        assert_eq!(parse_address("0.0.0.0:5555"), Some(("*".to_string(), 5555)));
    }

    #[test]
    fn test_parse_ipv6_address() {
        assert_eq!(parse_address("[::1]:3000"), Some(("::1".to_string(), 3000)));
        assert_eq!(parse_address("[::]:445"), Some(("::".to_string(), 445)));
        assert_eq!(
            parse_address("[::ffff:127.0.0.1]:63342"),
            Some(("::ffff:127.0.0.1".to_string(), 63342))
        );
        assert_eq!(parse_address(":::22"), Some(("::".to_string(), 22)));
    }

    #[test]
    fn test_parse_invalid_address() {
        assert_eq!(parse_address("*:*"), None);
        assert_eq!(parse_address("[::1]"), None);
        assert_eq!(parse_address("no-port"), None);
        assert_eq!(parse_address("127.0.0.1:70000"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_scan_command_exit_status() {
        let out = run_scan_command("sh", &["-c", "echo LISTEN"]).await.unwrap();
        assert_eq!(out, "LISTEN\n");

        let err = run_scan_command("sh", &["-c", "echo 'bad option' >&2; exit 2"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InspectionFailed(_)));
        assert!(err.to_string().contains("bad option"));

        // lsof style: exit 1 with nothing to report
        let out = run_scan_command_accepting("sh", &["-c", "exit 1"], &[0, 1])
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(run_scan_command_accepting("sh", &["-c", "exit 2"], &[0, 1]).await.is_err());
    }

    #[tokio::test]
    async fn test_run_scan_command_missing_program() {
        let err = run_scan_command("portkeeper-missing-scanner", &[]).await.unwrap_err();
        assert!(matches!(err, Error::InspectionFailed(_)));
    }
}
