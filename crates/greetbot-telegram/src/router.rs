use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use greetbot_core::{
    config::Config, greeting::GreetingStore, messaging::port::MessagingPort,
    service::GreetingService,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GreetingService>,
    pub chat_locks: Arc<ChatLocks>,
}

/// Per-chat serialization for the state machine's read-modify-write
/// sequences. Events for one chat are handled one at a time; unrelated
/// chats run in parallel on the dispatcher.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, store: GreetingStore) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("greetbot started: @{}", me.username());
    }
    info!("greeting directory: {}", cfg.greet_dir.display());
    info!("minimum delay between greetings: {:?}", cfg.min_delay);

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let service = Arc::new(GreetingService::new(store, messenger, cfg.min_delay));

    let state = Arc::new(AppState {
        service,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
