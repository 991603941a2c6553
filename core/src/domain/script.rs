//! Startup script for the managed q (kdb+) server.

/// Marker the managed process prints once it is listening.
pub const STARTUP_CONFIRMATION_MARKER: &str = "[OK]";

/// Script template; `{port}` is substituted on generation.
///
/// `.z.ws` evaluates every inbound message under `@[value; x; handler]`
/// so a failing query yields an `` `error`msg `` dictionary for the client
/// instead of an uncaught signal in the server.
const SCRIPT_TEMPLATE: &str = r#"/ portkeeper startup script
.z.wo:{[h] 0N!"[INFO] connection opened: ",string h}
.z.wc:{[h] 0N!"[INFO] connection closed: ",string h}
.z.ws:{[x]
  0N!"[QUERY] received: ",x;
  r:@[value;x;{[e] 0N!"[ERROR] ",e; `error`msg!(`ExecutionError;e)}];
  neg[.z.w] .j.j r;
 }

\p {port}
0N!"[OK] server listening on port {port}";
"#;

/// A generated startup script and the file name it is written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupScript {
    /// File name inside the script directory (reused between launches).
    pub file_name: String,
    /// Script source.
    pub contents: String,
}

impl StartupScript {
    /// Generate the startup script binding the server to `port`.
    pub fn generate(port: u16, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: SCRIPT_TEMPLATE.replace("{port}", &port.to_string()),
        }
    }
}

/// Whether an output line is the startup confirmation.
pub fn is_startup_confirmation(line: &str) -> bool {
    line.contains(STARTUP_CONFIRMATION_MARKER)
}
