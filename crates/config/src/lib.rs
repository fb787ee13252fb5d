//! Configuration loading, validation, and env substitution.
//!
//! Config files: `recordbot.toml`, `recordbot.yaml`, or `recordbot.json`,
//! searched in `./` then `~/.config/recordbot/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config, write_new_config},
    schema::{DiscordConfig, RecordBotConfig, RecorderConfig},
    template::DEFAULT_CONFIG_TEMPLATE,
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
