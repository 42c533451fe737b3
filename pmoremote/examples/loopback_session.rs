//! Example: drive a remote-control session against an in-process server
//!
//! Run with: cargo run -p pmoremote --example loopback_session
//! Override the log level with RUST_LOG (ex: pmoremote=debug)

use std::sync::Arc;
use std::time::Duration;

use pmoconfig::get_config;
use pmoremote::protocol::names::{key, request};
use pmoremote::{
    AllTracksQuery, AudioOutputCoordinator, ConnectionState, LoopbackTransport, PlaybackService,
    PlaybackSettings, SocketMessage, Track, TrackWindow, VolumeSink, WindowSettings,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const LIBRARY_SIZE: usize = 500;

struct PrintSink;

impl VolumeSink for PrintSink {
    fn apply_volume(&self, volume: f64) {
        println!("  local player volume -> {volume:.2}");
    }
}

fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

fn library_track(id: usize) -> serde_json::Value {
    let artist = if id % 3 == 0 { "Nina Simone" } else { "Bill Evans" };
    json!({
        "id": id,
        "title": format!("Song {id}"),
        "artist": artist,
        "album": format!("Album {}", id / 10),
    })
}

fn serve(message: &SocketMessage) -> Option<SocketMessage> {
    let reply = message.response_to();
    match message.name.as_str() {
        request::GET_PLAYBACK_OVERVIEW => Some(
            reply
                .with_option(key::STATE, "playing")
                .with_option(key::REPEAT_MODE, "list")
                .with_option(key::VOLUME, 0.7)
                .with_option(key::SHUFFLED, false)
                .with_option(key::MUTED, false)
                .with_option(key::PLAY_QUEUE_COUNT, 12)
                .with_option(key::PLAY_QUEUE_POSITION, 3)
                .with_option(key::PLAYING_DURATION, 241.0)
                .with_option(key::PLAYING_CURRENT_TIME, 17.5)
                .with_option(key::PLAYING_TRACK, library_track(42)),
        ),
        request::GET_CURRENT_TIME => Some(
            reply
                .with_option(key::PLAYING_CURRENT_TIME, 23.0)
                .with_option(key::ID, 42),
        ),
        request::QUERY_TRACKS => {
            if message.bool_option(key::COUNT_ONLY) == Some(true) {
                return Some(reply.with_option(key::COUNT, LIBRARY_SIZE));
            }
            let offset = message.usize_option(key::OFFSET)?;
            let limit = message.usize_option(key::LIMIT)?;
            let rows: Vec<_> = (offset..(offset + limit).min(LIBRARY_SIZE))
                .map(library_track)
                .collect();
            Some(reply.with_option(key::DATA, rows))
        }
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = get_config();
    init_tracing(&config.get_log_min_level().to_lowercase());

    let transport = Arc::new(LoopbackTransport::new());
    transport.set_responder(serve);
    transport.set_latency(Duration::from_millis(20));
    transport.set_state(ConnectionState::Connected);

    // Playback
    let (service, playback) =
        PlaybackService::spawn(transport.clone(), PlaybackSettings::from_config(&config));
    let mut subscription = playback.connect().await?;

    if let Some(snapshot) = subscription.updates.recv().await {
        println!("Now playing:");
        println!("  State: {}", snapshot.state);
        println!("  Repeat: {}", snapshot.repeat_mode);
        println!(
            "  Queue: {}/{}",
            snapshot.queue_position + 1,
            snapshot.queue_count
        );
        if let Some(title) = snapshot.track.get_str("title") {
            println!("  Title: {title}");
        }
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("  Estimated position: {:.1}s", playback.current_time().await?);

    playback.seek_to(60.0).await?;
    println!("  After seek: {:.1}s", playback.current_time().await?);

    // Library window
    let mut window: TrackWindow<Track> = TrackWindow::new(
        Arc::new(AllTracksQuery),
        transport.clone(),
        WindowSettings::from_config(&config),
    );
    window.requery();
    while window.count() == 0 {
        window.pump().await;
    }
    println!("\nLibrary: {} tracks", window.count());

    window.get(250);
    while window.in_flight().is_some() {
        window.pump().await;
    }
    for index in 245..255 {
        if let Some(track) = window.get(index) {
            println!("  #{index:<4} {} - {}", track.artist, track.title);
        }
    }

    // Local output
    println!("\nLocal output:");
    let output = AudioOutputCoordinator::from_config(&config);
    output.register(Arc::new(PrintSink));
    output.set_volume(0.8);
    output.duck();
    output.unduck();
    output.shutdown();

    playback.disconnect(subscription.token).await?;
    playback.shutdown().await?;
    service.wait().await;

    Ok(())
}
