//! Room listing and daemon control.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct RoomListResponse {
    rooms: Vec<RoomSummary>,
}

#[derive(Deserialize)]
struct RoomSummary {
    room_id:       String,
    running:       bool,
    tracked_peers: usize,
    ledger_peers:  Option<usize>,
    interval_ms:   u64,
    timeout_ms:    u64,
}

pub async fn cmd_rooms(port: u16) -> Result<()> {
    let resp: RoomListResponse = get_json(&format!("{}/rooms", base_url(port))).await?;

    if resp.rooms.is_empty() {
        println!("No rooms.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Rooms ({})", resp.rooms.len());
    println!("═══════════════════════════════════════");

    for r in &resp.rooms {
        let ledger = match r.ledger_peers {
            Some(n) => n.to_string(),
            None    => "destroyed".to_string(),
        };
        println!("  ┌─ {}", r.room_id);
        println!("  │  keepalive : {}", if r.running { "running" } else { "stopped" });
        println!("  │  interval  : {} ms", r.interval_ms);
        println!("  │  timeout   : {} ms", r.timeout_ms);
        println!("  │  peers     : {}", r.tracked_peers);
        println!("  └─ ledger    : {}", ledger);
    }

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    #[derive(Deserialize)]
    struct ShutdownResponse {
        message: String,
    }

    let resp: ShutdownResponse =
        post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
