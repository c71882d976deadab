// ABOUTME: Main entry point for the chat moderation bot
// ABOUTME: Initializes logging, config, platform client, generators, and the acquisition loop

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatwarden::acquire::{LoopConfig, StreamAcquisitionLoop};
use chatwarden::commands::CommandHandler;
use chatwarden::config::Config;
use chatwarden::gamify::JsonlSink;
use chatwarden::generator::{HttpGenerator, TemplateGenerator};
use chatwarden::platform::HttpPlatformClient;
use chatwarden::processor::MessageProcessor;
use chatwarden::sender::OutboundSender;
use chatwarden::trigger_file::FileTrigger;
use chatwarden::traits::{PlatformClient, ResponseGenerator, TriggerChannel};
use chatwarden::trigger::TriggerFilter;

#[derive(Parser, Debug)]
#[command(name = "chatwarden", about = "Autonomous live-stream chat moderation bot")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "warden.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n╔══════════════════════════════════════════════════════════╗");
        eprintln!("║ PANIC! Bot crashed with the following error:            ║");
        eprintln!("╚══════════════════════════════════════════════════════════╝\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting chatwarden");

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load(&cli.config)?;

    tracing::info!(
        api_base = %config.platform.api_base,
        channel_id = %config.platform.channel_id,
        phrases = config.triggers.phrases.len(),
        keywords = config.triggers.keywords.len(),
        moderators = config.moderation.moderators.len(),
        "Configuration loaded"
    );

    // Platform client
    let api_key = config
        .platform
        .api_key
        .as_deref()
        .context("platform.api_key missing after validation")?;
    let client: Arc<dyn PlatformClient> = Arc::new(HttpPlatformClient::new(
        &config.platform.api_base,
        api_key,
        &config.platform.channel_id,
    )?);

    // Response generators: HTTP primary when configured, canned fallback
    let fallback: Arc<dyn ResponseGenerator> = Arc::new(TemplateGenerator::with_defaults());
    let primary: Arc<dyn ResponseGenerator> = match &config.responses.generator_url {
        Some(url) => Arc::new(HttpGenerator::new(url)?),
        None => {
            tracing::warn!("No generator_url configured; using canned responses only");
            Arc::clone(&fallback)
        }
    };

    // Trigger filter and command handler
    let filter = TriggerFilter::new(
        &config.triggers.phrases,
        &config.triggers.keywords,
        config.user_cooldown(),
    )?;
    let sink = Arc::new(JsonlSink::new(&config.moderation.events_path));
    let commands = CommandHandler::new(sink, config.moderator_set());

    let processor = MessageProcessor::new(
        filter,
        config.bot_channel_id_set(),
        primary,
        fallback,
        commands,
    );
    let sender = OutboundSender::new(Arc::clone(&client));

    let manual_trigger: Arc<dyn TriggerChannel> =
        Arc::new(FileTrigger::new(&config.triggers.flag_file));

    // Cooperative stop on ctrl-c, honored at the loop's suspension points
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested; finishing in-flight work");
            let _ = stop_tx.send(true);
        }
    });

    let loop_cfg = LoopConfig {
        chat_poll_default: config.chat_poll_default(),
        chat_poll_floor: config.chat_poll_floor(),
        viewer_poll: config.viewer_poll(),
        greeting: config.responses.greeting.clone(),
        ..LoopConfig::default()
    };

    StreamAcquisitionLoop::new(
        client,
        Some(manual_trigger),
        processor,
        sender,
        loop_cfg,
        stop_rx,
    )
    .run()
    .await;

    tracing::info!("chatwarden shut down cleanly");
    Ok(())
}
