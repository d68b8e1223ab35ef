//! CLI subcommand definitions and handlers.
//!
//! - `run` (default) -- read session events from stdin and shout replies on stdout
//! - `config show|get|path` -- inspect the loaded configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ai::Providers;
use crate::autoreply::create_engine;
use crate::channels::presence::{spawn_sampler, DEFAULT_SAMPLE_INTERVAL};
use crate::channels::{PresenceMap, RoomDirectory, SessionIngestor, StdoutDispatcher};
use crate::config::{self, AppConfig};
use crate::logging;

/// Longest wait for in-flight replies after the input stream ends
const DRAIN_TIMEOUT: Duration = Duration::from_secs(90);

/// Room chat auto-responder backed by a hosted language model.
#[derive(Parser, Debug)]
#[command(
    name = "shoutback",
    version = env!("CARGO_PKG_VERSION"),
    about = "Shoutback: answers room chat with LLM replies"
)]
pub struct Cli {
    /// Config file (default: $SHOUTBACK_CONFIG_PATH or ~/.config/shoutback/config.json5)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process session events from stdin (default when no subcommand is given).
    Run {
        /// Start with auto-reply switched off.
        #[arg(long)]
        disabled: bool,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print one configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "prefix", "logging.level").
        key: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

impl Cli {
    /// Config path from the flag, else the default location
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::default_config_path)
    }
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Run the `config show` subcommand.
pub fn handle_config_show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = serde_json::to_value(config::load_config(path)?.redacted())?;
    match get_value_at_path(&cfg, key) {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => {
            eprintln!("Key not found: {}", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(path: &Path) {
    println!("{}", path.display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("shoutback {}", env!("CARGO_PKG_VERSION"));
    println!("  Git commit: {}", env!("SHOUTBACK_GIT_HASH"));
}

/// Run the `run` subcommand until stdin closes or Ctrl-C arrives.
pub async fn handle_run(
    cfg: AppConfig,
    start_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let providers = Providers::http()?;
    let engine = create_engine(
        cfg.reply.clone(),
        providers,
        Arc::new(StdoutDispatcher::new()),
    );
    // Route through set_config so a bad key or unknown model is reported up front
    engine.set_config(cfg.reply);
    engine.set_enabled(start_enabled);

    let directory = Arc::new(RoomDirectory::new());
    let ingestor = SessionIngestor::new(Arc::clone(&engine), Arc::clone(&directory));

    let cancel = CancellationToken::new();
    let presence = Arc::new(PresenceMap::new());
    let sampler = spawn_sampler(
        directory,
        Arc::clone(&presence),
        DEFAULT_SAMPLE_INTERVAL,
        cancel.child_token(),
    );

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            ctrl_c.cancel();
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let applied = ingestor.run(stdin, cancel.clone()).await?;
    info!(applied, "session input finished");

    if !cancel.is_cancelled() {
        tokio::select! {
            _ = cancel.cancelled() => {}
            res = tokio::time::timeout(DRAIN_TIMEOUT, engine.drain()) => {
                if res.is_err() {
                    warn!(in_flight = engine.in_flight(), "gave up waiting for replies");
                }
            }
        }
    }

    cancel.cancel();
    let _ = sampler.await;
    info!(tracked = presence.len(), "stopped");
    Ok(())
}

/// Parse the CLI, load config, set up logging and dispatch.
pub async fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let path = cli.config_path();

    match cli.command {
        Some(Command::Config(ConfigCommand::Show)) => handle_config_show(&path),
        Some(Command::Config(ConfigCommand::Get { ref key })) => handle_config_get(&path, key),
        Some(Command::Config(ConfigCommand::Path)) => {
            handle_config_path(&path);
            Ok(())
        }
        Some(Command::Version) => {
            handle_version();
            Ok(())
        }
        Some(Command::Run { disabled }) => start(&path, !disabled).await,
        None => start(&path, true).await,
    }
}

async fn start(path: &Path, start_enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(path)?;
    logging::init_tracing(&cfg.logging)?;
    info!(path = %path.display(), backend = %cfg.reply.backend(), "starting shoutback");
    handle_run(cfg, start_enabled).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn get_value_at_path(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[test]
    fn test_cli_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["shoutback"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_run_subcommand() {
        let cli = Cli::try_parse_from(["shoutback", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run { disabled: false })));

        let cli = Cli::try_parse_from(["shoutback", "run", "--disabled"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run { disabled: true })));
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["shoutback", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_config_get() {
        let cli = Cli::try_parse_from(["shoutback", "config", "get", "logging.level"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand::Get { ref key })) => {
                assert_eq!(key, "logging.level");
            }
            other => panic!("Expected Config(Get), got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli =
            Cli::try_parse_from(["shoutback", "config", "path", "--config", "/tmp/s.json5"])
                .unwrap();
        assert!(matches!(cli.command, Some(Command::Config(ConfigCommand::Path))));
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/s.json5"));
    }

    #[test]
    fn test_get_value_at_path() {
        let root = json!({"prefix": "+", "logging": {"level": "debug"}});
        assert_eq!(get_value_at_path(&root, "prefix"), Some(json!("+")));
        assert_eq!(
            get_value_at_path(&root, "logging.level"),
            Some(json!("debug"))
        );
        assert_eq!(get_value_at_path(&root, "logging.missing"), None);
    }
}
