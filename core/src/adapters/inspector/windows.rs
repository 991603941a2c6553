//! Windows port scanner implementation using netstat.

#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use std::collections::HashSet;

use crate::domain::ListeningSocket;
use crate::error::Result;

use super::utils::{parse_address, run_scan_command};
use super::Scanner;

/// Windows-specific port scanner.
pub struct WindowsScanner;

impl WindowsScanner {
    pub fn new() -> Self {
        Self
    }

    /// Parse the output of `netstat -ano` to extract listening TCP sockets.
    ///
    /// ```text
    /// Active Connections
    ///
    ///   Proto  Local Address          Foreign Address        State           PID
    ///   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1020
    ///   TCP    [::]:445               [::]:0                 LISTENING       4
    ///   TCP    127.0.0.1:5555         0.0.0.0:0              LISTENING       5432
    /// ```
    fn parse_netstat_output(output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<(u16, u32, String)> = HashSet::new();

        for line in output.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();

            // TCP, Local Address, Foreign Address, State, PID
            if parts.len() < 5 || parts[0] != "TCP" || parts[3] != "LISTENING" {
                continue;
            }

            let Some((address, port)) = parse_address(parts[1]) else {
                continue;
            };

            let pid: u32 = match parts[parts.len() - 1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            if seen.insert((port, pid, address.clone())) {
                sockets.push(ListeningSocket::new(port, Some(pid), address));
            }
        }

        sockets.sort_by_key(|s| s.port);
        sockets
    }
}

impl Default for WindowsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for WindowsScanner {
    async fn scan(&self) -> Result<Vec<ListeningSocket>> {
        let stdout = run_scan_command("netstat", &["-ano"]).await?;
        Ok(Self::parse_netstat_output(&stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_netstat_output() {
        let output = r#"
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1020
  TCP    127.0.0.1:5555         0.0.0.0:0              LISTENING       5432
  TCP    127.0.0.1:5555         127.0.0.1:60000        ESTABLISHED     5432
  TCP    [::]:135               [::]:0                 LISTENING       1020
  TCP    [::1]:6379             [::]:0                 LISTENING       8080
  UDP    0.0.0.0:5353           *:*                                    2222
"#;
        let sockets = WindowsScanner::parse_netstat_output(output);

        assert_eq!(sockets.len(), 4);
        assert!(sockets.iter().any(|s| s.port == 135 && s.pid == Some(1020) && s.address == "*"));
        assert!(sockets.iter().any(|s| s.port == 135 && s.address == "::"));
        assert!(sockets.iter().any(|s| s.port == 6379 && s.address == "::1"));

        // Established connections on the same port are not listeners
        let on_5555: Vec<_> = sockets.iter().filter(|s| s.port == 5555).collect();
        assert_eq!(on_5555.len(), 1);
        assert_eq!(on_5555[0].pid, Some(5432));
    }

    #[test]
    fn test_port_prefix_not_matched() {
        let output = "  TCP    0.0.0.0:55551          0.0.0.0:0              LISTENING       99\n";
        let sockets = WindowsScanner::parse_netstat_output(output);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].port, 55551);
    }

    #[test]
    fn test_deduplication() {
        let output = r#"
  TCP    0.0.0.0:3000           0.0.0.0:0              LISTENING       1234
  TCP    0.0.0.0:3000           0.0.0.0:0              LISTENING       1234
"#;
        assert_eq!(WindowsScanner::parse_netstat_output(output).len(), 1);
    }
}
