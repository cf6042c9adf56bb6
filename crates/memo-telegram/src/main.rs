//! memo-relay Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx LLM_API_KEY=xxx MEM_API_KEY=xxx cargo run -p memo-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use memo_core::{RelayConfig, TagMode};
use memo_telegram::MemoBot;
use tracing_subscriber::EnvFilter;

/// memo-relay Telegram bot - save thoughts, voice, photos and PDFs as notes
#[derive(Parser, Debug)]
#[command(name = "memo-telegram")]
#[command(about = "Telegram bot that relays messages into the notes service")]
struct Args {
    /// Tag overlay file (overrides MEMO_TAGS_FILE)
    #[arg(long)]
    tags_file: Option<PathBuf>,

    /// Tagging workflow: inline or pending (overrides MEMO_TAG_MODE)
    #[arg(long)]
    tag_mode: Option<TagMode>,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "memo_telegram=info,memo_core=info,teloxide=warn",
        1 => "memo_telegram=debug,memo_core=debug,teloxide=info",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    if let Some(path) = args.tags_file {
        config.tags_file = path;
    }
    if let Some(mode) = args.tag_mode {
        config.workflow.tag_mode = mode;
    }

    match &config.workflow.allowed_username {
        Some(username) => tracing::info!(username = %username, "Allow-listed user"),
        None => tracing::warn!("MEMO_ALLOWED_USERNAME is not set; every sender will be refused"),
    }

    let bot = MemoBot::new(&config)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[memo] memo-relay Telegram Bot");
            println!("   Bot: @{}", username);
            println!("   Tag mode: {}", config.workflow.tag_mode);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n[phone] Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
