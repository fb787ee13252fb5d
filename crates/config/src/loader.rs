use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::RecordBotConfig};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &[
    "recordbot.toml",
    "recordbot.yaml",
    "recordbot.yml",
    "recordbot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RecordBotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./recordbot.{toml,yaml,yml,json}`
/// 2. `~/.config/recordbot/recordbot.{toml,yaml,yml,json}`
///
/// Falls back to `RecordBotConfig::default()` when nothing is found or the
/// file fails to parse.
pub fn discover_and_load() -> RecordBotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RecordBotConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/recordbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "recordbot").map(|d| d.config_dir().to_path_buf())
}

/// Write `contents` to `path` unless a file already exists there.
pub fn write_new_config(path: &Path, contents: &str) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    debug!(path = %path.display(), "wrote config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RecordBotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
