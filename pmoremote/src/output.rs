//! Process-wide audio output coordination.
//!
//! Player instances register a [`VolumeSink`]; the coordinator owns volume,
//! mute and ducking and pushes the resulting effective volume to every sink
//! after each change. Create one at startup, share it as `Arc`, and call
//! [`AudioOutputCoordinator::shutdown`] when the process stops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pmoconfig::Config;
use tracing::{debug, info};

use crate::config_ext::RemoteConfigExt;

pub const DEFAULT_DUCK_COEFFICIENT: f64 = 0.2;

pub trait VolumeSink: Send + Sync {
    /// `volume` is already scaled by mute and ducking, in 0.0 – 1.0.
    fn apply_volume(&self, volume: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

struct OutputState {
    volume: f64,
    muted: bool,
    ducked: bool,
    sinks: HashMap<SinkId, Arc<dyn VolumeSink>>,
    next_id: u64,
}

impl OutputState {
    fn effective_volume(&self, duck_coefficient: f64) -> f64 {
        if self.muted {
            0.0
        } else if self.ducked {
            self.volume * duck_coefficient
        } else {
            self.volume
        }
    }
}

pub struct AudioOutputCoordinator {
    duck_coefficient: f64,
    state: Mutex<OutputState>,
}

impl std::fmt::Debug for AudioOutputCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("Output mutex poisoned");
        f.debug_struct("AudioOutputCoordinator")
            .field("volume", &state.volume)
            .field("muted", &state.muted)
            .field("ducked", &state.ducked)
            .field("sinks", &state.sinks.len())
            .finish()
    }
}

impl Default for AudioOutputCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DUCK_COEFFICIENT)
    }
}

impl AudioOutputCoordinator {
    pub fn new(duck_coefficient: f64) -> Self {
        Self {
            duck_coefficient: duck_coefficient.clamp(0.0, 1.0),
            state: Mutex::new(OutputState {
                volume: 1.0,
                muted: false,
                ducked: false,
                sinks: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .get_duck_coefficient()
                .unwrap_or(DEFAULT_DUCK_COEFFICIENT),
        )
    }

    pub fn register(&self, sink: Arc<dyn VolumeSink>) -> SinkId {
        let (id, effective) = {
            let mut state = self.state.lock().expect("Output mutex poisoned");
            state.next_id += 1;
            let id = SinkId(state.next_id);
            state.sinks.insert(id, Arc::clone(&sink));
            debug!(sinks = state.sinks.len(), "Volume sink registered");
            (id, state.effective_volume(self.duck_coefficient))
        };
        sink.apply_volume(effective);
        id
    }

    pub fn unregister(&self, id: SinkId) -> bool {
        let mut state = self.state.lock().expect("Output mutex poisoned");
        state.sinks.remove(&id).is_some()
    }

    /// Sets the user volume. While ducked this only moves the value that
    /// `unduck` restores.
    pub fn set_volume(&self, volume: f64) {
        self.update(|state| state.volume = volume.clamp(0.0, 1.0));
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().expect("Output mutex poisoned").volume
    }

    pub fn set_muted(&self, muted: bool) {
        self.update(|state| state.muted = muted);
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().expect("Output mutex poisoned").muted
    }

    /// Returns the new mute state.
    pub fn toggle_mute(&self) -> bool {
        let mut muted = false;
        self.update(|state| {
            state.muted = !state.muted;
            muted = state.muted;
        });
        muted
    }

    pub fn duck(&self) {
        self.update(|state| state.ducked = true);
    }

    pub fn unduck(&self) {
        self.update(|state| state.ducked = false);
    }

    pub fn is_ducked(&self) -> bool {
        self.state.lock().expect("Output mutex poisoned").ducked
    }

    pub fn effective_volume(&self) -> f64 {
        self.state
            .lock()
            .expect("Output mutex poisoned")
            .effective_volume(self.duck_coefficient)
    }

    /// Drops every sink and clears ducking.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("Output mutex poisoned");
        state.sinks.clear();
        state.ducked = false;
        info!("Audio output coordinator shut down");
    }

    /// Sinks are called after the lock is released, so they may read the
    /// coordinator back.
    fn update(&self, change: impl FnOnce(&mut OutputState)) {
        let (sinks, effective) = {
            let mut state = self.state.lock().expect("Output mutex poisoned");
            change(&mut state);
            let effective = state.effective_volume(self.duck_coefficient);
            debug!(
                volume = state.volume,
                muted = state.muted,
                ducked = state.ducked,
                effective,
                "Applying output volume"
            );
            let sinks: Vec<Arc<dyn VolumeSink>> = state.sinks.values().cloned().collect();
            (sinks, effective)
        };
        for sink in sinks {
            sink.apply_volume(effective);
        }
    }
}
