//! Playback service against an in-process server.

mod common;

use std::time::Duration;

use common::{FakeServer, close};
use pmoremote::protocol::names::{key, request};
use pmoremote::{ConnectionState, PlaybackService, PlaybackSettings, PlaybackState, SocketMessage};
use tokio::time::sleep;
use tokio_test::assert_ok;

#[tokio::test(start_paused = true)]
async fn test_estimate_advances_between_syncs() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    let snapshot = subscription.updates.recv().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.track_id(), Some(7));

    sleep(Duration::from_secs(3)).await;
    let estimate = assert_ok!(handle.current_time().await);
    assert!(close(estimate, 13.0), "estimate was {estimate}");
}

#[tokio::test(start_paused = true)]
async fn test_time_sync_repeats_while_playing() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    subscription.updates.recv().await.unwrap();
    assert_eq!(transport.count_sent(request::GET_CURRENT_TIME), 0);

    sleep(Duration::from_millis(5001)).await;
    assert_eq!(transport.count_sent(request::GET_CURRENT_TIME), 1);

    sleep(Duration::from_millis(5000)).await;
    assert_eq!(transport.count_sent(request::GET_CURRENT_TIME), 2);

    // the server reported 10.0 at the last sync, one millisecond ago
    let estimate = assert_ok!(handle.current_time().await);
    assert!((estimate - 10.001).abs() < 1e-3, "estimate was {estimate}");
}

#[tokio::test(start_paused = true)]
async fn test_time_sync_stops_when_paused() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    subscription.updates.recv().await.unwrap();

    server.update(|state| state.state = "paused");
    transport.push(server.overview_broadcast());
    let snapshot = subscription.updates.recv().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Paused);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.count_sent(request::GET_CURRENT_TIME), 0);
    assert_eq!(assert_ok!(handle.current_time().await), 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_seek_reanchors_estimate() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    subscription.updates.recv().await.unwrap();

    assert_ok!(handle.seek_to(100.0).await);
    assert!(close(assert_ok!(handle.current_time().await), 100.0));

    sleep(Duration::from_secs(2)).await;
    assert!(close(assert_ok!(handle.current_time().await), 102.0));
    assert_eq!(transport.count_sent(request::SEEK_TO), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_requests_fresh_overview() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    subscription.updates.recv().await.unwrap();
    assert_eq!(transport.count_sent(request::GET_PLAYBACK_OVERVIEW), 1);

    transport.set_state(ConnectionState::Disconnected);
    let snapshot = subscription.updates.recv().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Stopped);

    server.update(|state| state.current_time = 55.0);
    transport.set_state(ConnectionState::Connected);
    let snapshot = subscription.updates.recv().await.unwrap();

    assert_eq!(transport.count_sent(request::GET_PLAYBACK_OVERVIEW), 2);
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert!(close(assert_ok!(handle.current_time().await), 55.0));
}

#[tokio::test(start_paused = true)]
async fn test_track_change_zeroes_estimate() {
    let server = FakeServer::new(10);
    let transport = server.connect();
    let (_service, handle) = PlaybackService::spawn(transport.clone(), PlaybackSettings::default());

    let mut subscription = assert_ok!(handle.connect().await);
    subscription.updates.recv().await.unwrap();

    server.update(|state| state.track_id = 8);
    transport.push(server.overview_broadcast());
    let snapshot = subscription.updates.recv().await.unwrap();
    assert_eq!(snapshot.track_id(), Some(8));

    // a late time sync still describing the previous track
    transport.push(
        SocketMessage::request(request::GET_CURRENT_TIME)
            .response_to()
            .with_option(key::PLAYING_CURRENT_TIME, 250.0)
            .with_option(key::ID, 7),
    );
    sleep(Duration::from_millis(1)).await;
    assert_eq!(assert_ok!(handle.current_time().await), 0.0);
}
