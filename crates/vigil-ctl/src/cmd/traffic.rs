//! Traffic report command.

use std::collections::HashMap;

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct TrafficReport {
    room_id:     String,
    totals:      Totals,
    peers:       HashMap<String, PeerTraffic>,
    peer_count:  usize,
    uptime_secs: f64,
}

#[derive(Deserialize)]
struct Totals {
    bytes_in:        u64,
    bytes_out:       u64,
    packets_lost:    u64,
    bitrate_in_bps:  f64,
    bitrate_out_bps: f64,
    loss_rate:       f64,
}

#[derive(Deserialize)]
struct PeerTraffic {
    bytes_in:       u64,
    bytes_out:      u64,
    bitrate_in_bps: f64,
    bitrate_out_bps: f64,
}

fn kbps(bps: f64) -> String {
    format!("{:.1} kbps", bps / 1000.0)
}

pub async fn cmd_traffic(port: u16, room: &str) -> Result<()> {
    let r: TrafficReport =
        get_json(&format!("{}/rooms/{}/traffic/report", base_url(port), room)).await?;

    println!("═══════════════════════════════════════");
    println!("  Traffic for {}", r.room_id);
    println!("═══════════════════════════════════════");
    println!("  Uptime      : {:.0}s", r.uptime_secs);
    println!("  Bytes in    : {}", r.totals.bytes_in);
    println!("  Bytes out   : {}", r.totals.bytes_out);
    println!("  Bitrate in  : {}", kbps(r.totals.bitrate_in_bps));
    println!("  Bitrate out : {}", kbps(r.totals.bitrate_out_bps));
    println!("  Lost        : {} ({:.2}%)", r.totals.packets_lost, r.totals.loss_rate * 100.0);

    if r.peer_count == 0 {
        println!("\n  No peer traffic recorded.");
        return Ok(());
    }

    println!("\n  Peers ({}):", r.peer_count);
    let mut peers: Vec<_> = r.peers.iter().collect();
    peers.sort_by(|a, b| a.0.cmp(b.0));
    for (id, p) in peers {
        println!("  ┌─ {}", id);
        println!("  │  in  : {} bytes, {}", p.bytes_in, kbps(p.bitrate_in_bps));
        println!("  └─ out : {} bytes, {}", p.bytes_out, kbps(p.bitrate_out_bps));
    }

    Ok(())
}
