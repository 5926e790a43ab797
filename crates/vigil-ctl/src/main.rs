//! vigil-ctl — command-line interface for the Vigil daemon.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("Usage: vigil-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  rooms                List rooms and keepalive state");
    println!("  peers <room>         List tracked peers with status and RTT");
    println!("  peer <room> <peer>   Show one peer's heartbeat detail");
    println!("  traffic <room>       Show the room's traffic report");
    println!("  shutdown             Ask the daemon to exit");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args.get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["rooms"] | []                 => cmd::rooms::cmd_rooms(port).await,
        ["peers", room]                => cmd::peers::cmd_peers(port, room).await,
        ["peer", room, peer]           => cmd::peers::cmd_peer(port, room, peer).await,
        ["traffic", room]              => cmd::traffic::cmd_traffic(port, room).await,
        ["shutdown"]                   => cmd::rooms::cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            print_usage();
            std::process::exit(1);
        }
    }
}
