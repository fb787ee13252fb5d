mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    secrecy::Secret,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    config_commands::ConfigAction,
    recordbot_config::{RecordBotConfig, RecorderConfig, validate_config},
    recordbot_discord::DiscordBot,
    recordbot_recorder::{SessionRegistry, SinkOptions},
};

#[derive(Parser)]
#[command(name = "recordbot", about = "Record Bot - records Discord channels to text files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the standard locations.
    #[arg(long, global = true, env = "RECORDBOT_CONFIG")]
    config: Option<PathBuf>,
    /// Directory for record files (overrides config value).
    #[arg(long, global = true)]
    records_dir: Option<PathBuf>,
    /// Discord bot token (overrides config value).
    #[arg(long, global = true, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and record (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file and apply command-line overrides.
fn effective_config(cli: &Cli) -> anyhow::Result<RecordBotConfig> {
    let mut config = match &cli.config {
        Some(path) => recordbot_config::load_config(path)?,
        None => recordbot_config::discover_and_load(),
    };
    if let Some(token) = &cli.token {
        config.discord.token = Secret::new(token.clone());
    }
    if let Some(dir) = &cli.records_dir {
        config.recorder.records_dir = dir.clone();
    }
    Ok(config)
}

fn sink_options(recorder: &RecorderConfig) -> SinkOptions {
    SinkOptions {
        queue_capacity: recorder.queue_capacity,
        open_timeout: recorder.open_timeout(),
        write_timeout: recorder.write_timeout(),
        close_grace: recorder.shutdown_grace(),
    }
}

async fn run(config: RecordBotConfig) -> anyhow::Result<()> {
    let validation = validate_config(&config);
    if validation.has_errors() {
        config_commands::print_diagnostics(&validation, false);
        anyhow::bail!("invalid configuration; see `recordbot config check`");
    }

    let registry = Arc::new(SessionRegistry::new(
        config.recorder.records_dir.clone(),
        sink_options(&config.recorder),
    ));
    info!(records_dir = %registry.records_dir().display(), "recorder ready");

    let bot = DiscordBot::build(&config.discord, Arc::clone(&registry)).await?;

    let shards = bot.shard_manager();
    let on_signal = Arc::clone(&registry);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        on_signal.shutdown_all().await;
        shards.shutdown_all().await;
    });

    let outcome = bot.run().await;
    // The gateway can also stop on its own; records are closed either way.
    registry.shutdown_all().await;
    outcome.map_err(|e| {
        error!(error = %e, "discord client stopped");
        e.into()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "recordbot starting");
            run(effective_config(&cli)?).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref(), || {
                effective_config(&cli)
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::time::Duration};

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordbot.toml");
        std::fs::write(
            &path,
            "[discord]\ntoken = \"from-file\"\n\n[recorder]\nrecords_dir = \"file-records\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "recordbot",
            "--config",
            path.to_str().unwrap(),
            "--token",
            "from-flag",
            "--records-dir",
            "/srv/records",
        ]);
        let config = effective_config(&cli).unwrap();

        assert_eq!(config.discord.token.expose_secret(), "from-flag");
        assert_eq!(config.recorder.records_dir, PathBuf::from("/srv/records"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let cli = Cli::parse_from(["recordbot", "--config", "/nonexistent/recordbot.toml"]);
        assert!(effective_config(&cli).is_err());
    }

    #[test]
    fn recorder_settings_map_to_sink_options() {
        let recorder = RecorderConfig {
            queue_capacity: 8,
            open_timeout_ms: 100,
            write_timeout_ms: 200,
            shutdown_grace_ms: 300,
            ..RecorderConfig::default()
        };
        let options = sink_options(&recorder);
        assert_eq!(options.queue_capacity, 8);
        assert_eq!(options.open_timeout, Duration::from_millis(100));
        assert_eq!(options.write_timeout, Duration::from_millis(200));
        assert_eq!(options.close_grace, Duration::from_millis(300));
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::parse_from(["recordbot", "config", "check", "--verbose"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Check { verbose: true }
            })
        ));
        let cli = Cli::parse_from(["recordbot"]);
        assert!(cli.command.is_none());
    }
}
