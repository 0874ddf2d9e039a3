use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;

use greetbot_core::{config, config::Config, greeting::GreetingStore};

/// Telegram bot that greets new chat members.
#[derive(Debug, Parser)]
#[command(name = "greetbot", about, version)]
struct Args {
    /// File with the bot token.
    #[arg(long = "telegram-bot-token", default_value = "token.txt")]
    telegram_bot_token: PathBuf,

    /// Directory with greetings (`default.md`, `chat<ID>.md`).
    #[arg(long = "greet-dir")]
    greet_dir: PathBuf,

    /// Minimum delay between the bot's greetings in one chat.
    #[arg(long, default_value = "5m", value_parser = config::parse_duration)]
    delay: Duration,
}

#[tokio::main]
async fn main() -> Result<(), greetbot_core::Error> {
    greetbot_core::logging::init("greetbot")?;

    let args = Args::parse();
    let cfg = Arc::new(Config::load(
        &args.telegram_bot_token,
        &args.greet_dir,
        args.delay,
    )?);
    let store = GreetingStore::load(&cfg.greet_dir)?;

    greetbot_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| greetbot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
