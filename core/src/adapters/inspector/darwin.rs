//! macOS port scanner implementation using lsof.

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use std::collections::HashSet;

use crate::domain::ListeningSocket;
use crate::error::Result;

use super::utils::{parse_address, run_scan_command_accepting};
use super::Scanner;

/// macOS-specific port scanner using lsof.
pub struct DarwinScanner;

impl DarwinScanner {
    /// Create a new macOS scanner.
    pub fn new() -> Self {
        Self
    }

    /// Parse lsof output into listening sockets.
    fn parse_lsof_output(output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<(u16, u32)> = HashSet::new();

        for line in output.lines().skip(1) {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            let process_name = components[0].replace("\\x20", " ").replace("\\x2f", "/");

            let pid: u32 = match components[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            // NAME column, e.g. "*:5555" followed by "(LISTEN)"
            let Some(address_part) = components[8..]
                .iter()
                .rev()
                .find(|c| c.contains(':') && !c.starts_with("0x") && !c.starts_with("0t"))
            else {
                continue;
            };

            let Some((address, port)) = parse_address(address_part) else {
                continue;
            };

            if !seen.insert((port, pid)) {
                continue;
            }

            sockets.push(
                ListeningSocket::new(port, Some(pid), address).with_process_name(process_name),
            );
        }

        sockets.sort_by_key(|s| s.port);
        sockets
    }
}

impl Default for DarwinScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for DarwinScanner {
    async fn scan(&self) -> Result<Vec<ListeningSocket>> {
        // lsof exits 1 when nothing matches; empty output is a valid answer
        let stdout = run_scan_command_accepting(
            "/usr/sbin/lsof",
            &["-iTCP", "-sTCP:LISTEN", "-P", "-n", "+c", "0"],
            &[0, 1],
        )
        .await?;
        Ok(Self::parse_lsof_output(&stdout))
    }
}
