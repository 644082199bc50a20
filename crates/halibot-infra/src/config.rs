//! Runtime configuration loader for Halibot.
//!
//! Reads `config.toml` from the data directory (`~/.halibot/` in production)
//! and deserializes it into [`RuntimeConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use halibot_types::config::RuntimeConfig;

/// Load runtime configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RuntimeConfig::default()`] (enforcement off).
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - A relative `auth.perms_file` is resolved against `data_dir`.
pub async fn load_runtime_config(data_dir: &Path) -> RuntimeConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return with_resolved_paths(RuntimeConfig::default(), data_dir);
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return with_resolved_paths(RuntimeConfig::default(), data_dir);
        }
    };

    match toml::from_str::<RuntimeConfig>(&content) {
        Ok(config) => with_resolved_paths(config, data_dir),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            with_resolved_paths(RuntimeConfig::default(), data_dir)
        }
    }
}

fn with_resolved_paths(mut config: RuntimeConfig, data_dir: &Path) -> RuntimeConfig {
    if config.auth.perms_file.is_relative() {
        config.auth.perms_file = data_dir.join(&config.auth.perms_file);
    }
    config
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `HALIBOT_DATA_DIR` environment variable
/// 2. `~/.halibot`
/// 3. `./.halibot`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HALIBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".halibot");
    }

    PathBuf::from(".halibot")
}
