//! Config loader: reads `~/.lectio/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. `Config::default()`
//! 2. JSON file at `~/.lectio/config.json`
//! 3. Environment variables `LECTIO_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

const ENV_PREFIX: &str = "LECTIO_";
const PROVIDER_ENV_PREFIX: &str = "LECTIO_PROVIDERS__";
const CONFIG_FILE: &str = "config.json";

/// `~/.lectio/config.json`.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join(CONFIG_FILE)
}

/// Read the config at `path` (or the default location) and apply env vars.
///
/// A missing or unreadable file is not an error: defaults are used instead,
/// so a fresh install still picks up keys from the environment.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map_or_else(get_config_path, Path::to_path_buf);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    let base = read_config_file(path).unwrap_or_default();
    apply_env_overrides(base, std::env::vars())
}

fn read_config_file(path: &Path) -> Option<Config> {
    if !path.is_file() {
        info!(path = %path.display(), "no config file, using defaults");
        return None;
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "config file unreadable"))
        .ok()?;
    let config = serde_json::from_str(&raw)
        .map_err(|e| warn!(path = %path.display(), error = %e, "config file is not valid JSON"))
        .ok()?;

    debug!(path = %path.display(), "config loaded");
    Some(config)
}

/// Write `config` as pretty camelCase JSON, creating parent directories.
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map_or_else(get_config_path, Path::to_path_buf);
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let body = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(&config_path, body)?;
    debug!(path = %config_path.display(), "config saved");
    Ok(())
}

/// Layer `LECTIO_*` variables over `config`.
///
/// Env var format: `LECTIO_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LECTIO_PROVIDERS__<ID>__API_KEY` → `providers.<id>.api_key`
/// - `LECTIO_PROVIDERS__<ID>__MODEL` → `providers.<id>.model_name`
/// - `LECTIO_PROVIDERS__<ID>__API_BASE` → `providers.<id>.api_base`
/// - `LECTIO_PROVIDERS__<ID>__ENABLED` → `providers.<id>.enabled`
/// - `LECTIO_DEFAULT_TRANSLATION` → `default_translation`
/// - `LECTIO_REQUEST_TIMEOUT_SECS` → `request_timeout_secs`
///
/// Provider ids are lowercased, so `LECTIO_PROVIDERS__OPENAI__API_KEY`
/// configures `openai`.
fn apply_env_overrides(
    mut config: Config,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Config {
    for (key, val) in vars {
        if !key.starts_with(ENV_PREFIX) {
            continue;
        }

        if let Some(rest) = key.strip_prefix(PROVIDER_ENV_PREFIX) {
            let Some((id, field)) = rest.split_once("__") else {
                warn!(var = %key, "ignoring malformed provider env var");
                continue;
            };
            let provider = config.provider_mut(&id.to_lowercase());
            match field {
                "API_KEY" => provider.api_key = val,
                "MODEL" => provider.model_name = val,
                "API_BASE" => provider.api_base = Some(val),
                "ENABLED" => provider.enabled = val == "true" || val == "1",
                "TEMPERATURE" => {
                    if let Ok(t) = val.parse::<f64>() {
                        provider.temperature = t;
                    }
                }
                other => warn!(var = %key, field = other, "unknown provider field"),
            }
            continue;
        }

        match key.as_str() {
            "LECTIO_DEFAULT_TRANSLATION" => config.default_translation = val,
            "LECTIO_REQUEST_TIMEOUT_SECS" => {
                if let Ok(n) = val.parse::<u64>() {
                    config.request_timeout_secs = n;
                }
            }
            _ => {}
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
