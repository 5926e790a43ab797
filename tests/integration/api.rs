use crate::*;

use serde_json::json;

#[tokio::test]
async fn test_api_room_lifecycle() -> Result<()> {
    let api = spawn_api().await?;

    let (status, body) = api
        .post("/rooms", json!({ "room_id": "r1", "timeout_ms": 2000 }))
        .await?;
    assert_eq!(status, 201);
    assert_eq!(body["room_id"], "r1");
    assert_eq!(body["interval_ms"], 1000);
    assert_eq!(body["timeout_ms"], 2000);
    assert_eq!(body["running"], false);

    let (status, _) = api.post("/rooms", json!({ "room_id": "r1" })).await?;
    assert_eq!(status, 409);

    let (status, body) = api.post_empty("/rooms/r1/keepalive/start").await?;
    assert_eq!(status, 200);
    assert_eq!(body["running"], true);
    let (status, _) = api.post_empty("/rooms/r1/keepalive/start").await?;
    assert_eq!(status, 409);

    let (status, body) = api.get("/rooms").await?;
    assert_eq!(status, 200);
    assert_eq!(body["rooms"].as_array().map(Vec::len), Some(1));

    let (status, body) = api.post_empty("/rooms/r1/keepalive/stop").await?;
    assert_eq!(status, 200);
    assert_eq!(body["running"], false);
    let (status, _) = api.post_empty("/rooms/r1/keepalive/stop").await?;
    assert_eq!(status, 409);

    let (status, _) = api.delete("/rooms/r1").await?;
    assert_eq!(status, 204);
    let (status, _) = api.delete("/rooms/r1").await?;
    assert_eq!(status, 404);
    assert!(!api.directory.contains("r1"));
    Ok(())
}

#[tokio::test]
async fn test_api_peer_flow() -> Result<()> {
    let api = spawn_api().await?;
    api.post("/rooms", json!({ "room_id": "r1" })).await?;

    let (status, body) = api
        .post(
            "/rooms/r1/peers",
            json!({ "peer_id": "p1", "tags": { "device": "desktop" } }),
        )
        .await?;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "unknown");
    assert_eq!(body["rtt_ms"], serde_json::Value::Null);
    assert_eq!(body["tags"]["device"], "desktop");

    let (status, _) = api.post("/rooms/r1/peers", json!({ "peer_id": "p1" })).await?;
    assert_eq!(status, 409);
    let (status, _) = api.post("/rooms/r1/peers", json!({ "peer_id": "" })).await?;
    assert_eq!(status, 400);

    let (status, body) = api.post_empty("/rooms/r1/peers/p1/ping").await?;
    assert_eq!(status, 200);
    assert_eq!(body["total_pings"], 1);

    let (status, body) = api.post_empty("/rooms/r1/peers/p1/pong").await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "online");
    assert!(body["rtt_ms"].is_u64());
    assert_eq!(body["missed_pongs"], 0);

    let (status, body) = api.get("/rooms/r1/peers").await?;
    assert_eq!(status, 200);
    assert_eq!(body["peers"]["p1"]["status"], "online");

    let (status, _) = api.delete("/rooms/r1/peers/p1").await?;
    assert_eq!(status, 204);
    let (status, _) = api.get("/rooms/r1/peers/p1").await?;
    assert_eq!(status, 404);
    let (status, _) = api.post_empty("/rooms/r1/peers/p1/pong").await?;
    assert_eq!(status, 404);

    let (status, _) = api.get("/rooms/missing/peers").await?;
    assert_eq!(status, 404);

    let kinds: Vec<_> = api.events.drain().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["ping", "peer_online"]);
    Ok(())
}

#[tokio::test]
async fn test_api_traffic() -> Result<()> {
    let api = spawn_api().await?;
    api.post("/rooms", json!({ "room_id": "r1" })).await?;

    let (status, body) = api
        .post("/rooms/r1/traffic", json!({ "peer_id": "p1", "bytes_in": 100 }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["bytes_in"], 100);

    let (status, body) = api
        .post(
            "/rooms/r1/traffic",
            json!({ "peer_id": "p1", "bytes_in": 50, "bytes_out": 7 }),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["bytes_in"], 150);
    assert_eq!(body["bytes_out"], 7);

    // Negative counts are rejected without touching either counter.
    let (status, _) = api
        .post(
            "/rooms/r1/traffic",
            json!({ "peer_id": "p1", "bytes_in": 5, "bytes_out": -1 }),
        )
        .await?;
    assert_eq!(status, 400);
    let (status, _) = api
        .post("/rooms/r1/traffic", json!({ "peer_id": "p1" }))
        .await?;
    assert_eq!(status, 400);

    let (_, body) = api.get("/rooms/r1/traffic").await?;
    assert_eq!(body["peers"]["p1"]["bytes_in"], 150);
    assert_eq!(body["peers"]["p1"]["bytes_out"], 7);

    let (status, body) = api
        .post("/rooms/r1/traffic/lost", json!({ "count": 2 }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["packets_lost"], 2);

    let (status, body) = api.get("/rooms/r1/traffic/report").await?;
    assert_eq!(status, 200);
    assert_eq!(body["room_id"], "r1");
    assert_eq!(body["peer_count"], 1);
    assert_eq!(body["totals"]["bytes_in"], 150);

    let (status, _) = api.delete("/rooms/r1/traffic/p1").await?;
    assert_eq!(status, 204);
    let (status, _) = api.delete("/rooms/r1/traffic/p1").await?;
    assert_eq!(status, 404);

    let (status, _) = api.delete("/rooms/r1/stats").await?;
    assert_eq!(status, 204);
    let (status, _) = api
        .post("/rooms/r1/traffic", json!({ "peer_id": "p1", "bytes_in": 1 }))
        .await?;
    assert_eq!(status, 404);
    let (status, _) = api.post_empty("/rooms/r1/stats").await?;
    assert_eq!(status, 201);
    let (status, _) = api.post_empty("/rooms/r1/stats").await?;
    assert_eq!(status, 409);
    Ok(())
}

#[tokio::test]
async fn test_api_large_loss_count_is_one_increment() -> Result<()> {
    let api = spawn_api().await?;
    api.post("/rooms", json!({ "room_id": "r1" })).await?;

    let (status, body) = api
        .post("/rooms/r1/traffic/lost", json!({ "count": u32::MAX }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["packets_lost"], u32::MAX as u64);

    let (status, body) = api.post("/rooms/r1/traffic/lost", json!({})).await?;
    assert_eq!(status, 200);
    assert_eq!(body["packets_lost"], u32::MAX as u64 + 1);

    let (status, _) = api
        .post("/rooms/missing/traffic/lost", json!({ "count": 3 }))
        .await?;
    assert_eq!(status, 404);
    Ok(())
}

#[tokio::test]
async fn test_api_destroy_running_room() -> Result<()> {
    let api = spawn_api().await?;
    api.post("/rooms", json!({ "room_id": "r1", "ping_interval_ms": 50 }))
        .await?;
    api.post("/rooms/r1/peers", json!({ "peer_id": "p1" })).await?;
    let (status, _) = api.post_empty("/rooms/r1/keepalive/start").await?;
    assert_eq!(status, 200);

    let (status, _) = api.delete("/rooms/r1").await?;
    assert_eq!(status, 204);
    assert!(!api.directory.contains("r1"));

    let (status, _) = api
        .post("/rooms/r1/traffic", json!({ "peer_id": "p1", "bytes_in": 1 }))
        .await?;
    assert_eq!(status, 404);
    Ok(())
}

#[tokio::test]
async fn test_api_shutdown_signals_daemon() -> Result<()> {
    let mut api = spawn_api().await?;
    let (status, body) = api.post_empty("/daemon/shutdown").await?;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Shutdown initiated");
    api.shutdown_rx.recv().await?;
    Ok(())
}
