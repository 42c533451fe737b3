use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::warn;

use crate::errors::{RemoteError, Result};
use crate::protocol::SocketMessage;
use crate::protocol::names::{broadcast, key, request};

/// Server-side transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Buffering,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }
}

impl FromStr for PlaybackState {
    type Err = RemoteError;

    /// Unknown values are rejected rather than mapped to a fallback.
    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "stopped" => Ok(PlaybackState::Stopped),
            "buffering" => Ok(PlaybackState::Buffering),
            "playing" => Ok(PlaybackState::Playing),
            "paused" => Ok(PlaybackState::Paused),
            other => Err(RemoteError::UnknownPlaybackState(other.to_string())),
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    List,
    Track,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::List => "list",
            RepeatMode::Track => "track",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = RemoteError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "none" => Ok(RepeatMode::None),
            "list" => Ok(RepeatMode::List),
            "track" => Ok(RepeatMode::Track),
            other => Err(RemoteError::UnknownRepeatMode(other.to_string())),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque metadata of the playing track, as pushed by the server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackMetadata(pub Map<String, Value>);

impl TrackMetadata {
    pub fn id(&self) -> Option<i64> {
        self.0.get(key::ID).and_then(Value::as_i64)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A row of a remote track list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub album: String,
    pub album_id: i64,
    pub artist: String,
    pub artist_id: i64,
    pub album_artist: String,
    pub album_artist_id: i64,
    pub genre: String,
    pub genre_id: i64,
    pub track_num: u32,
    pub thumbnail_id: i64,
    pub uri: String,
}

impl Track {
    /// Builds a track from a server object. The numeric `id` is mandatory.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| RemoteError::InvalidTrack("not an object".to_string()))?;

        if object.get(key::ID).and_then(Value::as_i64).is_none() {
            return Err(RemoteError::InvalidTrack("missing numeric id".to_string()));
        }

        Track::deserialize(value).map_err(|err| RemoteError::InvalidTrack(err.to_string()))
    }

    /// Case-insensitive match on title, artist and album.
    pub fn matches(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let needle = filter.to_lowercase();
        [&self.title, &self.artist, &self.album]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// The server's authoritative playback state at the last overview.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub repeat_mode: RepeatMode,
    pub shuffled: bool,
    pub muted: bool,
    /// 0.0 – 1.0
    pub volume: f64,
    pub queue_count: usize,
    pub queue_position: usize,
    pub duration_seconds: f64,
    pub track: TrackMetadata,
    /// Position reported by the server with this overview.
    pub raw_current_time: Option<f64>,
    pub synced_at: Instant,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl PlaybackSnapshot {
    /// Zeroed snapshot used before the first overview and after a disconnect.
    pub fn disconnected() -> Self {
        Self {
            state: PlaybackState::Stopped,
            repeat_mode: RepeatMode::None,
            shuffled: false,
            muted: false,
            volume: 0.0,
            queue_count: 0,
            queue_position: 0,
            duration_seconds: 0.0,
            track: TrackMetadata::default(),
            raw_current_time: None,
            synced_at: Instant::now(),
        }
    }

    pub fn is_overview(message: &SocketMessage) -> bool {
        message.is(broadcast::PLAYBACK_OVERVIEW_CHANGED) || message.is(request::GET_PLAYBACK_OVERVIEW)
    }

    /// Parses a full overview. Nothing is returned unless every field is
    /// valid, so a caller never applies a partial update.
    pub fn from_overview(message: &SocketMessage) -> Result<Self> {
        if !Self::is_overview(message) {
            return Err(RemoteError::UnexpectedMessage(message.name.clone()));
        }

        let state: PlaybackState = message
            .string_option(key::STATE)
            .ok_or_else(|| RemoteError::missing_option(key::STATE))?
            .parse()?;

        let repeat_mode: RepeatMode = message
            .string_option(key::REPEAT_MODE)
            .ok_or_else(|| RemoteError::missing_option(key::REPEAT_MODE))?
            .parse()?;

        let queue_count = message.usize_option(key::PLAY_QUEUE_COUNT).unwrap_or(0);
        let mut queue_position = message.usize_option(key::PLAY_QUEUE_POSITION).unwrap_or(0);
        if queue_count > 0 && queue_position >= queue_count {
            warn!(
                queue_position,
                queue_count, "Play queue position out of range; clamping"
            );
            queue_position = queue_count - 1;
        }

        let track = message
            .object_option(key::PLAYING_TRACK)
            .cloned()
            .map(TrackMetadata)
            .unwrap_or_default();

        Ok(Self {
            state,
            repeat_mode,
            shuffled: message.bool_option(key::SHUFFLED).unwrap_or(false),
            muted: message.bool_option(key::MUTED).unwrap_or(false),
            volume: message
                .f64_option(key::VOLUME)
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            queue_count,
            queue_position,
            duration_seconds: message
                .f64_option(key::PLAYING_DURATION)
                .unwrap_or(0.0)
                .max(0.0),
            track,
            raw_current_time: message
                .f64_option(key::PLAYING_CURRENT_TIME)
                .filter(|t| *t >= 0.0),
            synced_at: Instant::now(),
        })
    }

    pub fn track_id(&self) -> Option<i64> {
        self.track.id()
    }

    /// Remote playback buffers whole tracks.
    pub fn buffered_time(&self) -> f64 {
        self.duration_seconds
    }
}
