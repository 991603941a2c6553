//! Linux port scanner implementation using ss, falling back to netstat.

#![cfg_attr(not(target_os = "linux"), allow(dead_code))]

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::domain::ListeningSocket;
use crate::error::Result;

use super::utils::{parse_address, run_scan_command};
use super::Scanner;

/// A scan tool invocation.
#[derive(Debug, Clone, Copy)]
struct ScanCommand {
    program: &'static str,
    args: &'static [&'static str],
}

const SS: ScanCommand = ScanCommand {
    program: "ss",
    args: &["-Htlnp"],
};

const NETSTAT: ScanCommand = ScanCommand {
    program: "netstat",
    args: &["-tlnp"],
};

/// Linux-specific port scanner.
pub struct LinuxScanner {
    ss: ScanCommand,
    netstat: ScanCommand,
}

fn users_regex() -> &'static Regex {
    static USERS: OnceLock<Regex> = OnceLock::new();
    USERS.get_or_init(|| {
        Regex::new(r#"users:\(\("(.+?)",pid=(\d+),fd=(\d+)\)"#).expect("valid users regex")
    })
}

impl LinuxScanner {
    /// Create a new Linux scanner.
    pub fn new() -> Self {
        Self {
            ss: SS,
            netstat: NETSTAT,
        }
    }

    /// Parse `ss -Htlnp` output.
    ///
    /// Expected ss output format (no header):
    /// ```text
    /// LISTEN 0 4096 [::ffff:127.0.0.1]:63342 *:* users:(("rustrover",pid=53561,fd=54))
    /// LISTEN 0 128  0.0.0.0:22             0.0.0.0:*
    /// ```
    ///
    /// The process column is missing for sockets of other users unless ss
    /// runs as root; such rows are kept with an unknown PID.
    fn parse_ss_output(output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<(u16, Option<u32>, String)> = HashSet::new();

        for line in output.lines() {
            // Columns: [State] [Recv-Q] [Send-Q] [Local Address:Port] [Peer Address:Port] [Process]
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 5 || components[0] != "LISTEN" {
                continue;
            }

            let Some((address, port)) = parse_address(components[3]) else {
                continue;
            };

            let process = components[5..].join(" ");
            let owner = users_regex().captures(&process).and_then(|caps| {
                let pid: u32 = caps[2].parse().ok()?;
                Some((pid, caps[1].to_string()))
            });

            let socket = match owner {
                Some((pid, name)) => {
                    ListeningSocket::new(port, Some(pid), address).with_process_name(name)
                }
                None => ListeningSocket::new(port, None, address),
            };

            if seen.insert((socket.port, socket.pid, socket.address.clone())) {
                sockets.push(socket);
            }
        }

        sockets.sort_by_key(|s| s.port);
        sockets
    }

    /// Parse `netstat -tlnp` output.
    ///
    /// ```text
    /// Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
    /// tcp        0      0 0.0.0.0:5555            0.0.0.0:*               LISTEN      1234/q
    /// tcp6       0      0 :::22                   :::*                    LISTEN      -
    /// ```
    fn parse_netstat_output(output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();

        for line in output.lines() {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 6 || !components[0].starts_with("tcp") || components[5] != "LISTEN" {
                continue;
            }

            let Some((address, port)) = parse_address(components[3]) else {
                continue;
            };

            // "1234/q", or "-" when the owner is hidden
            let owner = components
                .get(6)
                .and_then(|c| c.split_once('/'))
                .and_then(|(pid, name)| Some((pid.parse::<u32>().ok()?, name)));

            sockets.push(match owner {
                Some((pid, name)) => {
                    ListeningSocket::new(port, Some(pid), address).with_process_name(name)
                }
                None => ListeningSocket::new(port, None, address),
            });
        }

        sockets.sort_by_key(|s| s.port);
        sockets
    }
}

impl Default for LinuxScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for LinuxScanner {
    /// Scan all listening TCP sockets.
    ///
    /// Executes: `ss -Htlnp`
    ///
    /// Flags explained:
    /// -H, --no-header     Suppress header line
    /// -t, --tcp           display only TCP sockets
    /// -l, --listening     display listening sockets
    /// -n, --numeric       don't resolve service names
    /// -p, --processes     show process using socket
    async fn scan(&self) -> Result<Vec<ListeningSocket>> {
        match run_scan_command(self.ss.program, self.ss.args).await {
            Ok(stdout) => Ok(Self::parse_ss_output(&stdout)),
            Err(e) => {
                debug!(error = %e, "ss failed, falling back to netstat");
                let stdout = run_scan_command(self.netstat.program, self.netstat.args).await?;
                Ok(Self::parse_netstat_output(&stdout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ss_output() {
        let output = r#"LISTEN 0 4096 [::ffff:127.0.0.1]:80 *:* users:(("nginx",pid=55316,fd=6))
LISTEN 0 50 0.0.0.0:5555 0.0.0.0:* users:(("q",pid=53561,fd=3))"#;

        let sockets = LinuxScanner::parse_ss_output(output);
        assert_eq!(sockets.len(), 2);

        // Should be sorted by port
        assert_eq!(sockets[0].port, 80);
        assert_eq!(sockets[0].pid, Some(55316));
        assert_eq!(sockets[0].process_name.as_deref(), Some("nginx"));

        assert_eq!(sockets[1].port, 5555);
        assert_eq!(sockets[1].pid, Some(53561));
        assert_eq!(sockets[1].address, "*");
    }

    #[test]
    fn test_parse_ss_without_process_column() {
        let output = "LISTEN 0 128 0.0.0.0:5555 0.0.0.0:*\n";
        let sockets = LinuxScanner::parse_ss_output(output);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].port, 5555);
        assert_eq!(sockets[0].pid, None);
    }

    #[test]
    fn test_parse_ss_multiple_users() {
        let output = r#"LISTEN 0 4096 *:5555 *:* users:(("q",pid=100,fd=3),("q",pid=101,fd=3))"#;
        let sockets = LinuxScanner::parse_ss_output(output);
        assert_eq!(sockets[0].pid, Some(100));
    }

    #[test]
    fn test_ss_deduplication() {
        // Same address, port and PID should be deduplicated
        let output = r#"LISTEN 0 4096 127.0.0.1:3000 *:* users:(("code",pid=1234,fd=54))
LISTEN 0 4096 127.0.0.1:3000 *:* users:(("code",pid=1234,fd=54))"#;

        let sockets = LinuxScanner::parse_ss_output(output);
        assert_eq!(sockets.len(), 1);
    }

    #[test]
    fn test_parse_netstat_output() {
        let output = r#"Active Internet connections (only servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
tcp        0      0 0.0.0.0:5555            0.0.0.0:*               LISTEN      1234/q
tcp        0      0 127.0.0.1:55551         0.0.0.0:*               LISTEN      77/python3
tcp6       0      0 :::22                   :::*                    LISTEN      -
"#;
        let sockets = LinuxScanner::parse_netstat_output(output);
        assert_eq!(sockets.len(), 3);

        assert_eq!(sockets[0].port, 22);
        assert_eq!(sockets[0].pid, None);
        assert_eq!(sockets[0].address, "::");

        assert_eq!(sockets[1].port, 5555);
        assert_eq!(sockets[1].pid, Some(1234));
        assert_eq!(sockets[1].process_name.as_deref(), Some("q"));

        assert_eq!(sockets[2].port, 55551);
    }

    const FAILING: ScanCommand = ScanCommand {
        program: "false",
        args: &[],
    };

    const NETSTAT_ROW: ScanCommand = ScanCommand {
        program: "sh",
        args: &["-c", "echo 'tcp 0 0 0.0.0.0:5555 0.0.0.0:* LISTEN 1234/q'"],
    };

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_ss_falls_back_to_netstat() {
        let scanner = LinuxScanner {
            ss: FAILING,
            netstat: NETSTAT_ROW,
        };

        let sockets = scanner.scan().await.unwrap();
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].port, 5555);
        assert_eq!(sockets[0].pid, Some(1234));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_fails_when_both_tools_fail() {
        let scanner = LinuxScanner {
            ss: FAILING,
            netstat: FAILING,
        };

        assert!(scanner.scan().await.is_err());
    }
}
