use crate::*;

use vigil_core::{KeepaliveConfig, MonitorError, MonitorEvent, PeerStatus};

fn status_events(events: &[MonitorEvent]) -> Vec<(&str, &'static str)> {
    events
        .iter()
        .filter(|e| e.kind() != "ping")
        .map(|e| (e.peer_id(), e.kind()))
        .collect()
}

/// Room r1, timeout 3000ms, p1 never answers until 6600ms.
#[tokio::test(start_paused = true)]
async fn test_silent_peer_timeline() {
    let (dir, log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::from_millis(1000, 3000))
        .unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.start("r1").unwrap();

    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Unknown);

    advance(ms(3500)).await;
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Slow);

    advance(ms(3000)).await;
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Offline);

    advance(ms(100)).await;
    dir.handle_pong("r1", "p1").unwrap();
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Online);
    // Last ping went out on the 6000ms tick.
    assert_eq!(dir.rtt_ms("r1", "p1").unwrap(), 600);

    let info = dir.peer_info("r1", "p1").unwrap();
    assert_eq!(info.missed_pongs, 0);
    assert_eq!(info.total_pongs, 1);
    assert_eq!(info.last_seen_ms, Some(0));

    dir.stop("r1").unwrap();

    // Ticks commit slow at 4000ms; the pong lands before the 7000ms tick
    // would have committed offline.
    let events = log.drain();
    assert_eq!(
        status_events(&events),
        vec![("p1", "peer_slow"), ("p1", "peer_online")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_offline_reported_once_while_silent() {
    let (dir, log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.start("r1").unwrap();

    advance(ms(20_000)).await;
    dir.stop("r1").unwrap();

    let events = log.drain();
    assert_eq!(
        status_events(&events),
        vec![("p1", "peer_slow"), ("p1", "peer_offline")]
    );
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Offline);
}

#[tokio::test(start_paused = true)]
async fn test_responsive_peer_stays_online() {
    let (dir, log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.start("r1").unwrap();

    for _ in 0..10 {
        advance(ms(1000)).await;
        dir.handle_pong("r1", "p1").unwrap();
        assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Online);
    }
    dir.stop("r1").unwrap();

    assert_eq!(status_events(&log.drain()), vec![("p1", "peer_online")]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_boundary_is_exclusive() {
    let (dir, _log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.handle_pong("r1", "p1").unwrap();

    tokio::time::advance(ms(3000)).await;
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Online);
    tokio::time::advance(ms(1)).await;
    assert_eq!(dir.status("r1", "p1").unwrap(), PeerStatus::Slow);
}

#[tokio::test(start_paused = true)]
async fn test_remove_peer_while_running() {
    let (dir, log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.add_peer("r1", "p2").unwrap();
    dir.start("r1").unwrap();

    advance(ms(1500)).await;
    dir.remove_peer("r1", "p1").unwrap();
    log.drain();

    advance(ms(5000)).await;
    dir.stop("r1").unwrap();

    assert!(log.drain().iter().all(|e| e.peer_id() == "p2"));
    assert_eq!(
        dir.status("r1", "p1"),
        Err(MonitorError::PeerNotFound("p1".into()))
    );
    assert_eq!(
        dir.handle_pong("r1", "p1"),
        Err(MonitorError::PeerNotFound("p1".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rooms_tick_independently() {
    let (dir, log) = directory_with_log();
    dir.create_room("fast", KeepaliveConfig::from_millis(200, 600))
        .unwrap();
    dir.create_room("slow", KeepaliveConfig::from_millis(1000, 3000))
        .unwrap();
    dir.add_peer("fast", "p1").unwrap();
    dir.add_peer("slow", "p1").unwrap();
    dir.start("fast").unwrap();
    dir.start("slow").unwrap();

    advance(ms(2000)).await;
    dir.stop("fast").unwrap();
    dir.stop("slow").unwrap();

    let events = log.drain();
    let pings = |room: &str| {
        events
            .iter()
            .filter(|e| e.kind() == "ping" && e.room_id() == room)
            .count()
    };
    // Ticks at 0..=2000ms on each room's own interval.
    assert_eq!(pings("fast"), 11);
    assert_eq!(pings("slow"), 3);

    assert_eq!(dir.status("fast", "p1").unwrap(), PeerStatus::Offline);
    assert_eq!(dir.status("slow", "p1").unwrap(), PeerStatus::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_stops_scheduler() {
    let (dir, log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::default()).unwrap();
    dir.add_peer("r1", "p1").unwrap();
    dir.start("r1").unwrap();
    advance(ms(1500)).await;

    dir.destroy_room("r1").unwrap();
    log.drain();

    advance(ms(5000)).await;
    assert!(log.is_empty(), "scheduler kept ticking after destroy");
    assert_eq!(dir.start("r1"), Err(MonitorError::RoomNotFound("r1".into())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pongs_and_membership() {
    let (dir, _log) = directory_with_log();
    dir.create_room("r1", KeepaliveConfig::from_millis(5, 50))
        .unwrap();
    for i in 0..8 {
        dir.add_peer("r1", &format!("p{i}")).unwrap();
    }
    dir.start("r1").unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let dir = dir.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let peer = format!("p{i}");
            for round in 0..200 {
                dir.handle_pong("r1", &peer).unwrap();
                if i % 2 == 0 && round % 50 == 0 {
                    let extra = format!("x{i}-{round}");
                    dir.add_peer("r1", &extra).unwrap();
                    dir.remove_peer("r1", &extra).unwrap();
                }
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let dir_stop = dir.clone();
    tokio::task::spawn_blocking(move || dir_stop.stop("r1"))
        .await
        .unwrap()
        .unwrap();

    let all = dir.all_peer_info("r1").unwrap();
    assert_eq!(all.len(), 8);
    assert!(all.values().all(|p| p.total_pongs == 200));
}
