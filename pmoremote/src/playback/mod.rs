//! Remote playback state.
//!
//! [`PlaybackService`] owns the authoritative [`PlaybackSnapshot`] and the
//! position estimate. It runs as a single background task; callers talk to
//! it through a cloneable [`PlaybackHandle`].
//!
//! [`PlaybackSnapshot`]: crate::model::PlaybackSnapshot

mod handle;
mod service;

use std::time::Duration;

use pmoconfig::Config;

use crate::config_ext::RemoteConfigExt;

pub use handle::{PlaybackHandle, PlaybackSubscription};
pub use service::PlaybackService;

pub const DEFAULT_TIME_SYNC_INTERVAL_MS: u64 = 5000;
pub const SEEK_STEP_SECONDS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// Delay between two `get_current_time` requests while playing.
    pub time_sync_interval: Duration,
    pub command_buffer: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            time_sync_interval: Duration::from_millis(DEFAULT_TIME_SYNC_INTERVAL_MS),
            command_buffer: 32,
        }
    }
}

impl PlaybackSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            time_sync_interval: config
                .get_time_sync_interval_ms()
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.time_sync_interval),
            ..defaults
        }
    }
}
