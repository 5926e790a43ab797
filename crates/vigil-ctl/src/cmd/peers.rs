//! Peer liveness commands.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, ms_or_dash};

#[derive(Deserialize)]
struct PeerListResponse {
    room_id: String,
    peers:   HashMap<String, PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    peer_id:      String,
    status:       String,
    rtt_ms:       Option<u64>,
    last_seen_ms: Option<u64>,
    missed_pongs: u32,
    total_pings:  u64,
    total_pongs:  u64,
    #[serde(default)]
    tags:         BTreeMap<String, String>,
}

pub async fn cmd_peers(port: u16, room: &str) -> Result<()> {
    let resp: PeerListResponse =
        get_json(&format!("{}/rooms/{}/peers", base_url(port), room)).await?;

    if resp.peers.is_empty() {
        println!("No peers tracked in room {}.", resp.room_id);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Peers in {} ({})", resp.room_id, resp.peers.len());
    println!("═══════════════════════════════════════");

    let mut peers: Vec<&PeerInfo> = resp.peers.values().collect();
    peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
    for p in peers {
        println!(
            "  {:<20} {:<8} rtt {:>8}  missed {}",
            p.peer_id,
            p.status,
            ms_or_dash(p.rtt_ms),
            p.missed_pongs
        );
    }

    Ok(())
}

pub async fn cmd_peer(port: u16, room: &str, peer: &str) -> Result<()> {
    let p: PeerInfo =
        get_json(&format!("{}/rooms/{}/peers/{}", base_url(port), room, peer)).await?;

    println!("═══════════════════════════════════════");
    println!("  Peer Details");
    println!("═══════════════════════════════════════");
    println!("  Peer      : {}", p.peer_id);
    println!("  Room      : {}", room);
    println!("  Status    : {}", p.status);
    println!("  RTT       : {}", ms_or_dash(p.rtt_ms));
    println!("  Last seen : {}", ms_or_dash(p.last_seen_ms));
    println!("  Missed    : {}", p.missed_pongs);
    println!("  Pings     : {}", p.total_pings);
    println!("  Pongs     : {}", p.total_pongs);
    for (k, v) in &p.tags {
        println!("  Tag       : {} = {}", k, v);
    }

    Ok(())
}
