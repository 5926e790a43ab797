//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to vigild at {} (is it running?)", url))?;
    read_json(resp).await
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| format!("failed to connect to vigild at {} (is it running?)", url))?;
    read_json(resp).await
}

/// Decode a success body, or turn the daemon's error text into an error.
async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("vigild returned {}: {}", status, body);
    }
    resp.json::<T>().await.context("failed to parse response")
}

/// Render an optional millisecond value.
pub fn ms_or_dash(v: Option<u64>) -> String {
    v.map(|ms| format!("{} ms", ms))
        .unwrap_or_else(|| "-".to_string())
}
