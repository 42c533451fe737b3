//! Paged, randomly indexable views over remote track lists.

mod cache;
mod query;
mod track_window;

use std::time::Duration;

use pmoconfig::Config;

use crate::config_ext::RemoteConfigExt;

pub use cache::{CacheEntry, PageCache};
pub use query::{
    AllTracksQuery, CategoryTracksQuery, OfflineTracksQuery, Page, PlayQueueTracksQuery,
    PlaylistTracksQuery, QuerySource,
};
pub use track_window::{TrackWindow, WindowEvent};

pub const DEFAULT_WINDOW_SIZE: usize = 75;
pub const DEFAULT_LOOKBEHIND: usize = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 150;
pub const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 350;
pub const DEFAULT_ADAPTER_DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    /// Rows requested per page.
    pub window_size: usize,
    /// Rows fetched before the requested index.
    pub lookbehind: usize,
    pub cache_capacity: usize,
    /// Delay coalescing filter edits and connection flips into one requery.
    pub requery_debounce: Duration,
    pub adapter_debounce: Duration,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            lookbehind: DEFAULT_LOOKBEHIND,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            requery_debounce: Duration::from_millis(DEFAULT_FILTER_DEBOUNCE_MS),
            adapter_debounce: Duration::from_millis(DEFAULT_ADAPTER_DEBOUNCE_MS),
        }
    }
}

impl WindowSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            window_size: config
                .get_window_size()
                .unwrap_or(defaults.window_size)
                .max(1),
            lookbehind: config.get_window_lookbehind().unwrap_or(defaults.lookbehind),
            cache_capacity: config
                .get_window_cache_capacity()
                .unwrap_or(defaults.cache_capacity)
                .max(1),
            requery_debounce: config
                .get_filter_debounce_ms()
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.requery_debounce),
            adapter_debounce: config
                .get_adapter_debounce_ms()
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.adapter_debounce),
        }
    }
}
