//! Example: Show every listening socket and the binding of one port.
//!
//! Usage:
//!   cargo run --example inspect_port          # Inspect port 5555
//!   cargo run --example inspect_port -- 8080  # Inspect another port

use portkeeper_core::adapters::PortInspector;
use portkeeper_core::ports::PortInspectorPort;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => match arg.parse() {
            Ok(port) => port,
            Err(_) => {
                eprintln!("Invalid port: {}", arg);
                return;
            }
        },
        None => 5555,
    };

    let inspector = PortInspector::new();

    match inspector.scan().await {
        Ok(sockets) => {
            println!("{:<6} {:<8} {:<20} ADDRESS", "PORT", "PID", "PROCESS");
            println!("{}", "-".repeat(60));
            for socket in &sockets {
                println!(
                    "{:<6} {:<8} {:<20} {}",
                    socket.port,
                    socket.pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                    socket.process_name.as_deref().unwrap_or("unknown"),
                    socket.address
                );
            }
            println!("\nTotal: {} listening sockets\n", sockets.len());
        }
        Err(e) => {
            eprintln!("Error scanning ports: {}", e);
            return;
        }
    }

    match inspector.find_owner(port).await {
        Ok(Some(pid)) => println!("Port {} is owned by PID {}", port, pid),
        Ok(None) if inspector.is_listening(port).await => {
            println!("Port {} is listening, owner unknown", port)
        }
        Ok(None) => println!("Port {} is free", port),
        Err(e) => eprintln!("Error inspecting port {}: {}", port, e),
    }
}
