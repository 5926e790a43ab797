use crate::*;

use vigil_core::{KeepaliveConfig, MonitorError, PeerStatus};

#[tokio::test]
async fn test_create_destroy_leaves_no_trace() {
    let (dir, _log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.add_bytes_in("r1", "p1", 64).unwrap();
    dir.start("r1").unwrap();

    dir.destroy_room("r1").unwrap();

    assert!(dir.list_rooms().is_empty());
    for result in [
        dir.add_peer("r1", "p2"),
        dir.handle_pong("r1", "p1"),
        dir.add_bytes_out("r1", "p1", 1),
        dir.stop("r1"),
    ] {
        assert_eq!(result, Err(MonitorError::RoomNotFound("r1".into())));
    }
}

#[tokio::test]
async fn test_concurrent_create_same_room() {
    let (dir, _log) = directory_with_log();
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let dir = dir.clone();
            tokio::spawn(async move { dir.create_room("race", KeepaliveConfig::default()) })
        })
        .collect();

    let mut created = 0;
    for a in attempts {
        match a.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e, MonitorError::AlreadyExists("race".into())),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_peer_tags_pass_through() {
    let (dir, _log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();

    let tags = [
        ("device".to_string(), "mobile".to_string()),
        ("connection".to_string(), "wifi".to_string()),
    ]
    .into_iter()
    .collect();
    dir.set_peer_tags("r1", "p1", tags).unwrap();

    let info = dir.peer_info("r1", "p1").unwrap();
    assert_eq!(info.tags["device"], "mobile");
    assert_eq!(info.status, PeerStatus::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_every_room() {
    let (dir, log) = directory_with_log();
    for room in ["a", "b", "c"] {
        dir.create_room(room, KeepaliveConfig::default()).unwrap();
        dir.add_peer(room, "p1").unwrap();
        dir.start(room).unwrap();
    }
    advance(ms(1500)).await;

    dir.shutdown();
    log.drain();
    advance(ms(3000)).await;

    assert_eq!(dir.room_count(), 0);
    assert!(log.is_empty());
}
