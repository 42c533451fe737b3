//! Surcharges par variables d'environnement.
//!
//! `PMOREMOTE_CONFIG__SERVER__PORT=7906` sets `server.port`. Values use YAML
//! scalar syntax and fall back to plain strings.

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::tree;

pub(crate) const ENV_PREFIX: &str = "PMOREMOTE_CONFIG__";

pub(crate) fn apply<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, raw) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = rest.split("__").filter(|part| !part.is_empty()).collect();
        if path.is_empty() {
            continue;
        }

        debug!(variable = %name, "Applying configuration override");
        if let Err(err) = tree::insert(config, &path, parse_scalar(&raw)) {
            warn!(variable = %name, "Ignoring configuration override: {err}");
        }
    }
}

fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
