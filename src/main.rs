//! turbobot - Main entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use turbobot::{
    backend::HttpBackend,
    bridge,
    channels::{Channel, ReplChannel, WebhookChannel},
    commands::Dispatcher,
    config::Config,
    db::{CredentialStore, LibSqlBackend},
};

const DEFAULT_REPL_USER: &str = "local";

#[derive(Parser, Debug)]
#[command(name = "turbobot")]
#[command(about = "Chat command bridge for the Mai-Turbo backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path (optional, uses env vars and ~/.turbobot/config.toml by default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal session as one chat user (default)
    Repl {
        /// Chat identity the session speaks for
        #[arg(long, default_value = DEFAULT_REPL_USER)]
        user: String,
    },

    /// Serve the webhook ingress for an external chat adapter
    Serve,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("turbobot=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn build_dispatcher(config: Arc<Config>) -> anyhow::Result<Arc<Dispatcher>> {
    let store = LibSqlBackend::new_local(&config.store.database_path).await?;
    store.run_migrations().await?;
    tracing::info!(
        "Credential store ready at {}",
        config.store.database_path.display()
    );

    let backend = HttpBackend::new(&config.backend);
    tracing::info!("Relaying commands to {}", config.backend.api_base_url);

    Ok(Arc::new(Dispatcher::new(
        config,
        Arc::new(store),
        Arc::new(backend),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Arc::new(Config::from_env_with_toml(cli.config.as_deref())?);
    let dispatcher = build_dispatcher(Arc::clone(&config)).await?;

    let command = cli.command.unwrap_or(Command::Repl {
        user: DEFAULT_REPL_USER.to_string(),
    });

    match command {
        Command::Repl { user } => {
            let channel: Arc<dyn Channel> =
                Arc::new(ReplChannel::new(user, config.bot.command_prefix.clone()));
            bridge::run(channel, dispatcher).await?;
        }
        Command::Serve => {
            let channel: Arc<dyn Channel> = Arc::new(WebhookChannel::new(config.webhook.clone()));
            if config.webhook.secret.is_none() {
                tracing::warn!("TURBOBOT_WEBHOOK_SECRET is not set; webhook accepts any caller");
            }

            let bridge_channel = Arc::clone(&channel);
            let mut pump = tokio::spawn(bridge::run(bridge_channel, dispatcher));

            tokio::select! {
                joined = &mut pump => {
                    joined??;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    channel.shutdown().await?;
                    pump.await??;
                }
            }
        }
    }

    Ok(())
}
