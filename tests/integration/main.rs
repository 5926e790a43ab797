//! Vigil integration test harness.
//!
//! Engine tests drive a room directory directly on a paused tokio clock.
//! API tests bind the HTTP router to an ephemeral loopback port and talk
//! to it with reqwest, the same client vigil-ctl uses.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::runtime::Handle;

use vigil_core::config::KeepaliveSettings;
use vigil_services::{EventLog, RoomDirectory};

mod api;
mod directory;
mod keepalive;

// ── Harness ───────────────────────────────────────────────────────────────────

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// A directory whose events land in the returned log.
pub fn directory_with_log() -> (Arc<RoomDirectory>, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let dir = Arc::new(RoomDirectory::new(Handle::current(), log.clone()));
    (dir, log)
}

/// Advance the paused clock in 50ms steps, yielding so timer tasks keep up.
pub async fn advance(total: Duration) {
    let step = ms(50);
    let mut left = total;
    while !left.is_zero() {
        let d = left.min(step);
        tokio::time::advance(d).await;
        tokio::task::yield_now().await;
        left -= d;
    }
}

/// A running API server on an ephemeral port.
pub struct TestApi {
    pub base: String,
    pub directory: Arc<RoomDirectory>,
    pub events: Arc<EventLog>,
    pub shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    client: reqwest::Client,
}

pub async fn spawn_api() -> Result<TestApi> {
    let (directory, events) = directory_with_log();
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let state = vigil_api::ApiState {
        directory: directory.clone(),
        keepalive: KeepaliveSettings::default(),
        shutdown_tx,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        if let Err(e) = vigil_api::serve_on(listener, state).await {
            eprintln!("test API server failed: {e}");
        }
    });

    Ok(TestApi {
        base: format!("http://127.0.0.1:{port}/api"),
        directory,
        events,
        shutdown_rx,
        client: reqwest::Client::new(),
    })
}

impl TestApi {
    pub async fn get(&self, path: &str) -> Result<(u16, Value)> {
        let resp = self.client.get(format!("{}{}", self.base, path)).send().await?;
        decode(resp).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<(u16, Value)> {
        let resp = self.client.post(format!("{}{}", self.base, path)).send().await?;
        decode(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(u16, Value)> {
        let resp = self
            .client
            .delete(format!("{}{}", self.base, path))
            .send()
            .await?;
        decode(resp).await
    }
}

/// Status code plus body; non-JSON bodies (error text, empty) become strings.
async fn decode(resp: reqwest::Response) -> Result<(u16, Value)> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}
