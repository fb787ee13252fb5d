//! Starter config written by `recordbot config init`.

/// Documented default configuration in TOML.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r##"# recordbot configuration
#
# Environment variable substitution is supported: ${ENV_VAR}

[discord]
token = "${DISCORD_TOKEN}"      # Bot token; --token or DISCORD_TOKEN also work
prefix = "!"                    # Commands look like `!record start notes`
name = "Record Bot"
# owner = "your-name"
description = "A Discord bot that records channel messages."
record_bot_messages = true      # Include messages written by bots (and this bot)

[recorder]
records_dir = "records"         # One <name>.txt file per recording
queue_capacity = 256            # Lines buffered per recording
open_timeout_ms = 5000
write_timeout_ms = 5000
shutdown_grace_ms = 3000        # Time to drain pending lines on shutdown
"##;

#[cfg(test)]
mod tests {
    use {super::*, crate::validate::validate_toml_str};

    #[test]
    fn template_matches_schema() {
        let result = validate_toml_str(DEFAULT_CONFIG_TEMPLATE);
        assert!(
            result
                .diagnostics
                .iter()
                .all(|d| d.category != "unknown-field" && d.category != "type-error"),
            "{:?}",
            result.diagnostics
        );
    }
}
