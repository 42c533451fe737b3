//! In-process music server used by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pmoremote::protocol::names::{broadcast, key, request};
use pmoremote::{ConnectionState, LoopbackTransport, SocketMessage, Track, TrackWindow};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct ServerState {
    pub state: &'static str,
    pub current_time: f64,
    pub track_id: i64,
    pub library: Vec<Track>,
    pub queue: Vec<Track>,
}

impl ServerState {
    fn overview_options(&self, message: SocketMessage) -> SocketMessage {
        message
            .with_option(key::STATE, self.state)
            .with_option(key::REPEAT_MODE, "none")
            .with_option(key::VOLUME, 0.8)
            .with_option(key::SHUFFLED, false)
            .with_option(key::MUTED, false)
            .with_option(key::PLAY_QUEUE_COUNT, self.queue.len())
            .with_option(key::PLAY_QUEUE_POSITION, 0)
            .with_option(key::PLAYING_DURATION, 300.0)
            .with_option(key::PLAYING_CURRENT_TIME, self.current_time)
            .with_option(key::PLAYING_TRACK, json!({ "id": self.track_id }))
    }
}

/// Plays the server behind a [`LoopbackTransport`].
#[derive(Clone)]
pub struct FakeServer {
    pub state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn new(library_size: usize) -> Self {
        let library = (0..library_size as i64)
            .map(|id| Track {
                id,
                title: format!("Track {id}"),
                artist: if id % 2 == 0 { "Miles Davis" } else { "John Coltrane" }.to_string(),
                ..Track::default()
            })
            .collect::<Vec<_>>();
        let queue = library.iter().take(25).cloned().collect();

        Self {
            state: Arc::new(Mutex::new(ServerState {
                state: "playing",
                current_time: 10.0,
                track_id: 7,
                library,
                queue,
            })),
        }
    }

    /// Returns a connected transport answered by this server.
    pub fn connect(&self) -> Arc<LoopbackTransport> {
        let transport = Arc::new(LoopbackTransport::new());
        let state = Arc::clone(&self.state);
        transport.set_responder(move |message| {
            let state = state.lock().unwrap();
            respond(&state, message)
        });
        transport.set_state(ConnectionState::Connected);
        transport
    }

    pub fn update(&self, change: impl FnOnce(&mut ServerState)) {
        change(&mut self.state.lock().unwrap());
    }

    pub fn overview_broadcast(&self) -> SocketMessage {
        let state = self.state.lock().unwrap();
        state.overview_options(SocketMessage::broadcast(broadcast::PLAYBACK_OVERVIEW_CHANGED))
    }
}

fn rows(tracks: &[Track], message: &SocketMessage) -> SocketMessage {
    let reply = message.response_to();
    if message.bool_option(key::COUNT_ONLY) == Some(true) {
        return reply.with_option(key::COUNT, tracks.len());
    }
    let offset = message.usize_option(key::OFFSET).unwrap_or(0);
    let limit = message.usize_option(key::LIMIT).unwrap_or(tracks.len());
    let data: Vec<Value> = tracks
        .iter()
        .skip(offset)
        .take(limit)
        .map(|track| serde_json::to_value(track).unwrap())
        .collect();
    reply.with_option(key::DATA, data)
}

fn respond(state: &ServerState, message: &SocketMessage) -> Option<SocketMessage> {
    match message.name.as_str() {
        request::GET_PLAYBACK_OVERVIEW => Some(state.overview_options(message.response_to())),
        request::GET_CURRENT_TIME => Some(
            message
                .response_to()
                .with_option(key::PLAYING_CURRENT_TIME, state.current_time)
                .with_option(key::ID, state.track_id),
        ),
        request::QUERY_TRACKS => {
            let filter = message.string_option(key::FILTER).unwrap_or("");
            let matching: Vec<Track> = state
                .library
                .iter()
                .filter(|track| track.matches(filter))
                .cloned()
                .collect();
            Some(rows(&matching, message))
        }
        request::QUERY_PLAY_QUEUE_TRACKS => Some(rows(&state.queue, message)),
        _ => None,
    }
}

/// Drives the window until `done` holds, failing after ten virtual seconds.
pub async fn pump_until<F>(window: &mut TrackWindow<Track>, mut done: F)
where
    F: FnMut(&TrackWindow<Track>) -> bool,
{
    let settled = tokio::time::timeout(Duration::from_secs(10), async {
        while !done(&*window) {
            window.pump().await;
        }
    })
    .await;
    assert!(settled.is_ok(), "track window did not settle: {window:?}");
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
