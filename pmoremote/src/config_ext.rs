//! Extension de pmoconfig pour le client distant
//!
//! Ce module fournit le trait `RemoteConfigExt` qui ajoute à `pmoconfig::Config`
//! les réglages de synchronisation, de fenêtre de pistes et de sortie audio.
//!
//! # Exemple
//!
//! ```rust,ignore
//! use pmoconfig::get_config;
//! use pmoremote::RemoteConfigExt;
//!
//! let config = get_config();
//! let interval = config.get_time_sync_interval_ms()?;
//! let window = config.get_window_size()?;
//! ```

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};

use crate::output::DEFAULT_DUCK_COEFFICIENT;
use crate::playback::DEFAULT_TIME_SYNC_INTERVAL_MS;
use crate::window::{
    DEFAULT_ADAPTER_DEBOUNCE_MS, DEFAULT_CACHE_CAPACITY, DEFAULT_FILTER_DEBOUNCE_MS,
    DEFAULT_LOOKBEHIND, DEFAULT_WINDOW_SIZE,
};

const TIME_SYNC_INTERVAL: &[&str] = &["remote", "playback", "time_sync_interval_ms"];
const WINDOW_SIZE: &[&str] = &["remote", "window", "size"];
const WINDOW_LOOKBEHIND: &[&str] = &["remote", "window", "lookbehind"];
const WINDOW_CACHE_CAPACITY: &[&str] = &["remote", "window", "cache_capacity"];
const FILTER_DEBOUNCE: &[&str] = &["remote", "window", "filter_debounce_ms"];
const ADAPTER_DEBOUNCE: &[&str] = &["remote", "window", "adapter_debounce_ms"];
const DUCK_COEFFICIENT: &[&str] = &["remote", "output", "duck_coefficient"];

/// Trait d'extension pour gérer la configuration du client distant
pub trait RemoteConfigExt {
    /// Intervalle entre deux synchronisations de position en lecture (default: 5000)
    fn get_time_sync_interval_ms(&self) -> Result<usize>;
    fn set_time_sync_interval_ms(&self, interval: usize) -> Result<()>;

    /// Nombre de pistes demandées par page (default: 75)
    fn get_window_size(&self) -> Result<usize>;
    fn set_window_size(&self, size: usize) -> Result<()>;

    /// Pistes chargées avant l'index demandé (default: 10)
    fn get_window_lookbehind(&self) -> Result<usize>;
    fn set_window_lookbehind(&self, lookbehind: usize) -> Result<()>;

    /// Nombre maximal d'entrées en cache (default: 150)
    fn get_window_cache_capacity(&self) -> Result<usize>;
    fn set_window_cache_capacity(&self, capacity: usize) -> Result<()>;

    fn get_filter_debounce_ms(&self) -> Result<usize>;
    fn set_filter_debounce_ms(&self, delay: usize) -> Result<()>;

    fn get_adapter_debounce_ms(&self) -> Result<usize>;
    fn set_adapter_debounce_ms(&self, delay: usize) -> Result<()>;

    /// Coefficient appliqué au volume pendant une atténuation (default: 0.2)
    fn get_duck_coefficient(&self) -> Result<f64>;
    fn set_duck_coefficient(&self, coefficient: f64) -> Result<()>;
}

fn read_usize(config: &Config, path: &[&str], default: usize) -> Result<usize> {
    // Chemin absent ou valeur non numérique : valeur par défaut
    match config.get_value(path) {
        Ok(Value::Number(n)) if n.is_u64() => Ok(n.as_u64().map_or(default, |v| v as usize)),
        _ => Ok(default),
    }
}

fn write_usize(config: &Config, path: &[&str], value: usize) -> Result<()> {
    config.set_value(path, Value::Number(Number::from(value)))
}

impl RemoteConfigExt for Config {
    fn get_time_sync_interval_ms(&self) -> Result<usize> {
        read_usize(self, TIME_SYNC_INTERVAL, DEFAULT_TIME_SYNC_INTERVAL_MS as usize)
    }

    fn set_time_sync_interval_ms(&self, interval: usize) -> Result<()> {
        write_usize(self, TIME_SYNC_INTERVAL, interval)
    }

    fn get_window_size(&self) -> Result<usize> {
        read_usize(self, WINDOW_SIZE, DEFAULT_WINDOW_SIZE)
    }

    fn set_window_size(&self, size: usize) -> Result<()> {
        write_usize(self, WINDOW_SIZE, size)
    }

    fn get_window_lookbehind(&self) -> Result<usize> {
        read_usize(self, WINDOW_LOOKBEHIND, DEFAULT_LOOKBEHIND)
    }

    fn set_window_lookbehind(&self, lookbehind: usize) -> Result<()> {
        write_usize(self, WINDOW_LOOKBEHIND, lookbehind)
    }

    fn get_window_cache_capacity(&self) -> Result<usize> {
        read_usize(self, WINDOW_CACHE_CAPACITY, DEFAULT_CACHE_CAPACITY)
    }

    fn set_window_cache_capacity(&self, capacity: usize) -> Result<()> {
        write_usize(self, WINDOW_CACHE_CAPACITY, capacity)
    }

    fn get_filter_debounce_ms(&self) -> Result<usize> {
        read_usize(self, FILTER_DEBOUNCE, DEFAULT_FILTER_DEBOUNCE_MS as usize)
    }

    fn set_filter_debounce_ms(&self, delay: usize) -> Result<()> {
        write_usize(self, FILTER_DEBOUNCE, delay)
    }

    fn get_adapter_debounce_ms(&self) -> Result<usize> {
        read_usize(self, ADAPTER_DEBOUNCE, DEFAULT_ADAPTER_DEBOUNCE_MS as usize)
    }

    fn set_adapter_debounce_ms(&self, delay: usize) -> Result<()> {
        write_usize(self, ADAPTER_DEBOUNCE, delay)
    }

    fn get_duck_coefficient(&self) -> Result<f64> {
        match self.get_value(DUCK_COEFFICIENT) {
            Ok(Value::Number(n)) => Ok(n.as_f64().unwrap_or(DEFAULT_DUCK_COEFFICIENT)),
            _ => Ok(DEFAULT_DUCK_COEFFICIENT),
        }
    }

    fn set_duck_coefficient(&self, coefficient: f64) -> Result<()> {
        self.set_value(DUCK_COEFFICIENT, Value::Number(Number::from(coefficient)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AudioOutputCoordinator;
    use crate::playback::PlaybackSettings;
    use crate::window::WindowSettings;
    use std::time::Duration;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml_str("").unwrap();

        assert_eq!(config.get_time_sync_interval_ms().unwrap(), 5000);
        assert_eq!(config.get_window_size().unwrap(), 75);
        assert_eq!(config.get_window_lookbehind().unwrap(), 10);
        assert_eq!(config.get_window_cache_capacity().unwrap(), 150);
        assert_eq!(config.get_filter_debounce_ms().unwrap(), 350);
        assert_eq!(config.get_adapter_debounce_ms().unwrap(), 50);
        assert_eq!(config.get_duck_coefficient().unwrap(), 0.2);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_yaml_str(
            "remote:\n  playback:\n    time_sync_interval_ms: 1000\n  window:\n    size: 20\n    lookbehind: 3\n",
        )
        .unwrap();

        let playback = PlaybackSettings::from_config(&config);
        assert_eq!(playback.time_sync_interval, Duration::from_millis(1000));

        let window = WindowSettings::from_config(&config);
        assert_eq!(window.window_size, 20);
        assert_eq!(window.lookbehind, 3);
        assert_eq!(window.cache_capacity, 150);
        assert_eq!(window.requery_debounce, Duration::from_millis(350));
    }

    #[test]
    fn test_setters_round_trip_in_memory() {
        let config = Config::from_yaml_str("").unwrap();
        config.set_window_size(40).unwrap();
        config.set_duck_coefficient(0.5).unwrap();

        assert_eq!(WindowSettings::from_config(&config).window_size, 40);

        let output = AudioOutputCoordinator::from_config(&config);
        output.duck();
        assert_eq!(output.effective_volume(), 0.5);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_yaml_str("remote:\n  window:\n    size: lots\n").unwrap();
        assert_eq!(config.get_window_size().unwrap(), 75);
    }
}
