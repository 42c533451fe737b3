//! # pmoconfig
//!
//! Configuration du client PMORemote.
//!
//! The effective configuration is built from three layers, each one winning
//! over the previous:
//!
//! 1. `pmoremote.yaml`, compiled into the crate;
//! 2. `config.yaml` in the configuration directory;
//! 3. `PMOREMOTE_CONFIG__SECTION__KEY` environment variables.
//!
//! Keys are case-insensitive. Other crates add their own settings through
//! extension traits built on [`Config::get_value`] and [`Config::set_value`].
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! println!("{}:{}", config.get_server_host(), config.get_server_port());
//!
//! config.set_server_port(7906)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod overrides;
mod tree;

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use tracing::{debug, info, warn};

const DEFAULT_CONFIG: &str = include_str!("pmoremote.yaml");
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_DIR_NAME: &str = ".pmoremote";

/// Overrides the configuration directory.
pub const ENV_CONFIG_DIR: &str = "PMOREMOTE_CONFIG";

const SERVER_HOST: &[&str] = &["server", "host"];
const SERVER_PORT: &[&str] = &["server", "port"];
const SERVER_USE_TLS: &[&str] = &["server", "use_tls"];
const LOG_MIN_LEVEL: &[&str] = &["host", "logger", "min_level"];
const LOG_ENABLE_CONSOLE: &[&str] = &["host", "logger", "enable_console"];

const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 7905;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMORemote configuration"));
}

macro_rules! flag_setting {
    ($(#[$doc:meta])* $getter:ident, $setter:ident, $path:expr, $default:expr) => {
        $(#[$doc])*
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(flag)) => flag,
                _ => $default,
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Shared, mutable configuration tree.
///
/// Setters write `config.yaml` back immediately. A configuration built with
/// [`Config::from_yaml_str`] has no file and is only kept in memory.
#[derive(Debug)]
pub struct Config {
    dir: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Config {
    /// Picks the configuration directory, creating it when needed.
    ///
    /// Order: `directory` when not empty, then `$PMOREMOTE_CONFIG`, then an
    /// existing `.pmoremote` in the working directory or in the home
    /// directory, and finally `./.pmoremote`.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir = resolve_dir(directory);
        ensure_writable(&dir)?;
        Ok(dir.to_string_lossy().into_owned())
    }

    /// Loads the layered configuration of `directory` (see [`Config::config_dir`])
    /// and writes the merged result back to its `config.yaml`.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = PathBuf::from(Self::config_dir(directory)?);
        let file = dir.join(CONFIG_FILE);

        let user = match fs::read_to_string(&file) {
            Ok(text) => {
                info!(file = %file.display(), "Reading configuration");
                Some(text)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(file = %file.display(), "No configuration file, using embedded defaults");
                None
            }
            Err(err) => {
                return Err(err).with_context(|| format!("cannot read {}", file.display()));
            }
        };

        let config = Self {
            data: Mutex::new(layered(user.as_deref())?),
            dir: Some(dir),
        };
        config.save()?;
        Ok(config)
    }

    /// In-memory configuration: `yaml` layered over the embedded defaults,
    /// environment overrides included.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Self {
            data: Mutex::new(layered(Some(yaml))?),
            dir: None,
        })
    }

    /// Directory holding `config.yaml`; `None` for in-memory configurations.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let file = dir.join(CONFIG_FILE);
        let text = serde_yaml::to_string(&*self.lock())?;
        fs::write(&file, text).with_context(|| format!("cannot write {}", file.display()))
    }

    /// Value at `path` (e.g. `&["server", "port"]`); an error when absent.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        tree::lookup(&self.lock(), path)
            .cloned()
            .ok_or_else(|| anyhow!("no configuration value at {}", path.join(".")))
    }

    /// Stores `value` at `path`, creating missing sections, then saves.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        tree::insert(&mut self.lock(), path, value)?;
        self.save()
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.data.lock().expect("Config mutex poisoned")
    }

    pub fn get_server_host(&self) -> String {
        match self.get_value(SERVER_HOST) {
            Ok(Value::String(host)) if !host.is_empty() => host,
            _ => {
                warn!("No server host configured, using {DEFAULT_SERVER_HOST}");
                DEFAULT_SERVER_HOST.to_string()
            }
        }
    }

    pub fn set_server_host(&self, host: String) -> Result<()> {
        self.set_value(SERVER_HOST, Value::String(host))
    }

    /// Numbers and numeric strings are accepted; anything else yields 7905.
    pub fn get_server_port(&self) -> u16 {
        let Ok(value) = self.get_value(SERVER_PORT) else {
            return DEFAULT_SERVER_PORT;
        };
        port_from(&value).unwrap_or_else(|| {
            warn!(?value, "Invalid server port, using {DEFAULT_SERVER_PORT}");
            DEFAULT_SERVER_PORT
        })
    }

    pub fn set_server_port(&self, port: u16) -> Result<()> {
        self.set_value(SERVER_PORT, Value::Number(Number::from(port)))
    }

    flag_setting!(
        /// Whether the socket to the server uses TLS.
        get_server_use_tls,
        set_server_use_tls,
        SERVER_USE_TLS,
        false
    );

    flag_setting!(
        get_log_enable_console,
        set_log_enable_console,
        LOG_ENABLE_CONSOLE,
        true
    );

    /// Niveau de log minimum (`TRACE` … `ERROR`)
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(LOG_MIN_LEVEL) {
            Ok(Value::String(level)) => level,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(LOG_MIN_LEVEL, Value::String(level))
    }
}

/// Process-wide configuration, loaded on first use.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn layered(user: Option<&str>) -> Result<Value> {
    let mut merged = tree::lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);

    if let Some(text) = user {
        let layer: Value = serde_yaml::from_str(text).context("invalid configuration document")?;
        // an empty document parses as null
        if !layer.is_null() {
            tree::overlay(&mut merged, tree::lowercase_keys(layer));
        }
    }

    overrides::apply(&mut merged, env::vars());
    Ok(merged)
}

fn resolve_dir(directory: &str) -> PathBuf {
    if !directory.is_empty() {
        return PathBuf::from(directory);
    }

    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        debug!(path = %from_env, "Configuration directory taken from {ENV_CONFIG_DIR}");
        return PathBuf::from(from_env);
    }

    let local = PathBuf::from(DEFAULT_DIR_NAME);
    let in_home = dirs::home_dir().map(|home| home.join(DEFAULT_DIR_NAME));
    [Some(local.clone()), in_home]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_dir())
        .unwrap_or(local)
}

fn ensure_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let marker = dir.join(".write_test");
    fs::write(&marker, b"")
        .and_then(|_| fs::remove_file(&marker))
        .with_context(|| format!("{} is not writable", dir.display()))
}

fn port_from(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
