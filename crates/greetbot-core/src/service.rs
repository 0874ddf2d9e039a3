//! Event handling: decides whether, when and what to greet.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    formatting,
    greeting::GreetingStore,
    messaging::{
        port::MessagingPort,
        types::{Activity, ChatEvent, MemberJoined, SetGreeting, Start},
    },
    state::{ChatStateTable, GreetGate},
    Result,
};

const NOTICE_NO_ADMINS: &str = "Can not get the list of chat admins.";
const NOTICE_NOT_ADMIN: &str = "You are not admin.";
const NOTICE_USAGE: &str =
    "Use this command in reply to the message you want to make the greeting.";
const NOTICE_OK: &str = "OK";

/// Orchestrates the per-chat greeting state machine.
///
/// Owns the state table and the greeting store; the transport is injected so
/// tests can substitute a fake. A failure handling one chat's event never
/// affects another chat's state.
pub struct GreetingService {
    table: ChatStateTable,
    store: GreetingStore,
    transport: Arc<dyn MessagingPort>,
    min_delay: Duration,
}

impl GreetingService {
    pub fn new(store: GreetingStore, transport: Arc<dyn MessagingPort>, min_delay: Duration) -> Self {
        Self {
            table: ChatStateTable::new(),
            store,
            transport,
            min_delay,
        }
    }

    /// Single entry point; the match arms are the whole decision table.
    pub async fn handle(&self, event: ChatEvent) -> Result<()> {
        match event {
            ChatEvent::MemberJoined(ev) => self.on_member_joined(ev).await,
            ChatEvent::Activity(ev) => {
                self.on_activity(ev);
                Ok(())
            }
            ChatEvent::SetGreeting(ev) => self.on_set_greeting(ev).await,
            ChatEvent::Start(ev) => self.on_start(ev).await,
        }
    }

    async fn on_member_joined(&self, ev: MemberJoined) -> Result<()> {
        let chat = ev.chat_id;
        let title = display_title(&ev.chat_title);
        info!("chat {title:?}: user joined");

        let now = Instant::now();
        match self.table.gate(chat, now, self.min_delay) {
            GreetGate::BotMessageLatest => {
                info!("chat {title:?}: not posting, bot's message is already the latest in the chat");
                return Ok(());
            }
            GreetGate::DelayNotElapsed { elapsed } => {
                info!(
                    "chat {title:?}: not posting, only {elapsed:?} passed since bot's latest message, required minimum delay is {:?}",
                    self.min_delay
                );
                return Ok(());
            }
            GreetGate::Ready => {}
        }

        // Replace rather than stack: drop the previous greeting first.
        if let Some(prev) = self.table.last_sent_ref(chat) {
            if let Err(e) = self.transport.delete_message(prev).await {
                warn!("chat {title:?}: failed to delete previous greeting: {e}");
            }
        }

        let text = self.store.get(chat);
        match self.transport.send_markdown(chat, &text).await {
            Ok(sent) => self.table.mark_sent(chat, now, sent),
            // State stays untouched so the next qualifying join retries.
            Err(e) => warn!("chat {title:?}: failed to send greeting: {e}"),
        }
        Ok(())
    }

    fn on_activity(&self, ev: Activity) {
        debug!(
            "chat {:?}: {:?} message, bot's greeting is no longer latest",
            display_title(&ev.chat_title),
            ev.kind
        );
        self.table.mark_activity(ev.chat_id);
    }

    async fn on_set_greeting(&self, ev: SetGreeting) -> Result<()> {
        let title = display_title(&ev.chat_title);

        let admins = match self.transport.chat_admins(ev.chat_id).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!("chat {title:?}: can not get the list of chat admins: {e}");
                return self.transport.reply_text(ev.message, NOTICE_NO_ADMINS).await;
            }
        };
        if !admins.contains(&ev.sender) {
            return self.transport.reply_text(ev.message, NOTICE_NOT_ADMIN).await;
        }
        let Some(target) = ev.target else {
            return self.transport.reply_text(ev.message, NOTICE_USAGE).await;
        };

        let text = formatting::to_markdown_v2(&target.text, &target.spans);
        self.store.set(ev.chat_id, text);
        // A future join must repost with the new text.
        self.table.mark_activity(ev.chat_id);

        self.transport.reply_text(ev.message, NOTICE_OK).await
    }

    async fn on_start(&self, ev: Start) -> Result<()> {
        if !ev.private {
            return Ok(());
        }
        info!("/start");
        if let Err(e) = self
            .transport
            .send_markdown(ev.chat_id, self.store.default_text())
            .await
        {
            warn!("replying to /start failed: {e}");
        }
        Ok(())
    }
}

fn display_title(title: &Option<String>) -> &str {
    title.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicBool, AtomicI32, Ordering},
        Mutex,
    };

    use async_trait::async_trait;

    use crate::{
        domain::{ChatId, MessageId, MessageRef, UserId},
        errors::Error,
        formatting::{EntitySpan, SpanKind},
        messaging::types::{ActivityKind, ReplyTarget},
    };

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<(ChatId, String)>>,
        replies: Mutex<Vec<(MessageRef, String)>>,
        deleted: Mutex<Vec<MessageRef>>,
        admins: Mutex<Vec<UserId>>,
        fail_send: AtomicBool,
        fail_admins: AtomicBool,
        next_id: AtomicI32,
    }

    impl FakeTransport {
        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn replies(&self) -> Vec<String> {
            self.replies.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }

        fn deleted(&self) -> Vec<MessageRef> {
            self.deleted.lock().unwrap().clone()
        }

        fn set_admins(&self, admins: Vec<UserId>) {
            *self.admins.lock().unwrap() = admins;
        }
    }

    #[async_trait]
    impl MessagingPort for FakeTransport {
        async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(Error::Transport("send refused".into()));
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(id),
            })
        }

        async fn reply_text(&self, to: MessageRef, text: &str) -> Result<()> {
            self.replies.lock().unwrap().push((to, text.to_string()));
            Ok(())
        }

        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            self.deleted.lock().unwrap().push(msg);
            Ok(())
        }

        async fn chat_admins(&self, _chat_id: ChatId) -> Result<Vec<UserId>> {
            if self.fail_admins.load(Ordering::SeqCst) {
                return Err(Error::Transport("admins unavailable".into()));
            }
            Ok(self.admins.lock().unwrap().clone())
        }
    }

    const CHAT: ChatId = ChatId(77);

    fn service(
        transport: Arc<FakeTransport>,
        min_delay: Duration,
    ) -> GreetingService {
        GreetingService::new(
            GreetingStore::in_memory("Hello"),
            transport,
            min_delay,
        )
    }

    fn joined() -> ChatEvent {
        ChatEvent::MemberJoined(MemberJoined {
            chat_id: CHAT,
            chat_title: Some("testers".to_string()),
        })
    }

    fn text_activity() -> ChatEvent {
        ChatEvent::Activity(Activity {
            chat_id: CHAT,
            chat_title: Some("testers".to_string()),
            kind: ActivityKind::Text,
        })
    }

    fn use_command(sender: UserId, target: Option<ReplyTarget>) -> ChatEvent {
        ChatEvent::SetGreeting(SetGreeting {
            chat_id: CHAT,
            chat_title: Some("testers".to_string()),
            sender,
            message: MessageRef {
                chat_id: CHAT,
                message_id: MessageId(900),
            },
            target,
        })
    }

    #[tokio::test]
    async fn join_sends_greeting_then_suppresses_while_latest() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::from_secs(300));

        svc.handle(joined()).await.unwrap();
        assert_eq!(transport.sent(), vec![(CHAT, "Hello".to_string())]);

        // Second join right after: the greeting is still the latest message.
        svc.handle(joined()).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
        assert!(transport.deleted().is_empty());
    }

    #[tokio::test]
    async fn activity_reopens_gate_and_previous_greeting_is_deleted() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::ZERO);

        svc.handle(joined()).await.unwrap();
        svc.handle(text_activity()).await.unwrap();
        svc.handle(joined()).await.unwrap();

        assert_eq!(transport.sent().len(), 2);
        // The first greeting was deleted before the replacement went out.
        assert_eq!(
            transport.deleted(),
            vec![MessageRef {
                chat_id: CHAT,
                message_id: MessageId(0),
            }]
        );
    }

    #[tokio::test]
    async fn delay_floor_suppresses_even_after_activity() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::from_secs(300));

        svc.handle(joined()).await.unwrap();
        svc.handle(text_activity()).await.unwrap();
        svc.handle(joined()).await.unwrap();

        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn send_failure_leaves_state_retryable() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::from_secs(300));

        transport.fail_send.store(true, Ordering::SeqCst);
        svc.handle(joined()).await.unwrap();
        assert!(transport.sent().is_empty());

        // The failed attempt did not stamp the throttle window: the next
        // join sends immediately even with a 5 minute minimum delay.
        transport.fail_send.store(false, Ordering::SeqCst);
        svc.handle(joined()).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn non_admin_cannot_set_greeting() {
        let transport = Arc::new(FakeTransport::default());
        transport.set_admins(vec![UserId(1)]);
        let svc = service(transport.clone(), Duration::from_secs(300));

        let target = ReplyTarget {
            text: "Welcome friends!".to_string(),
            spans: vec![EntitySpan {
                offset: 8,
                length: 7,
                kind: SpanKind::Bold,
            }],
        };
        svc.handle(use_command(UserId(2), Some(target))).await.unwrap();
        assert_eq!(transport.replies(), vec!["You are not admin.".to_string()]);

        // Store unchanged: a join still sends the default text.
        svc.handle(joined()).await.unwrap();
        assert_eq!(transport.sent(), vec![(CHAT, "Hello".to_string())]);
    }

    #[tokio::test]
    async fn admin_sets_converted_greeting_and_forces_resend() {
        let transport = Arc::new(FakeTransport::default());
        transport.set_admins(vec![UserId(1)]);
        let svc = service(transport.clone(), Duration::ZERO);

        // Greeting goes out and becomes the latest message.
        svc.handle(joined()).await.unwrap();

        let target = ReplyTarget {
            text: "Welcome friends!".to_string(),
            spans: vec![EntitySpan {
                offset: 8,
                length: 7,
                kind: SpanKind::Bold,
            }],
        };
        svc.handle(use_command(UserId(1), Some(target))).await.unwrap();
        assert_eq!(transport.replies(), vec!["OK".to_string()]);

        // The admin update reset "latest", so the next join reposts with
        // the converted text.
        svc.handle(joined()).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], (CHAT, "Welcome *friends*\\!".to_string()));
    }

    #[tokio::test]
    async fn use_without_reply_target_gets_usage_notice() {
        let transport = Arc::new(FakeTransport::default());
        transport.set_admins(vec![UserId(1)]);
        let svc = service(transport.clone(), Duration::from_secs(300));

        svc.handle(use_command(UserId(1), None)).await.unwrap();
        assert_eq!(
            transport.replies(),
            vec!["Use this command in reply to the message you want to make the greeting.".to_string()]
        );
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn admin_lookup_failure_aborts_without_mutation() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_admins.store(true, Ordering::SeqCst);
        let svc = service(transport.clone(), Duration::from_secs(300));

        let target = ReplyTarget {
            text: "hi".to_string(),
            spans: vec![],
        };
        svc.handle(use_command(UserId(1), Some(target))).await.unwrap();
        assert_eq!(
            transport.replies(),
            vec!["Can not get the list of chat admins.".to_string()]
        );

        svc.handle(joined()).await.unwrap();
        assert_eq!(transport.sent(), vec![(CHAT, "Hello".to_string())]);
    }

    #[tokio::test]
    async fn start_in_private_chat_sends_default_and_skips_the_table() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::from_secs(300));

        let private_chat = ChatId(5);
        svc.handle(ChatEvent::Start(Start {
            chat_id: private_chat,
            private: true,
        }))
        .await
        .unwrap();
        assert_eq!(transport.sent(), vec![(private_chat, "Hello".to_string())]);

        // The table was not touched: a join in that chat still greets.
        svc.handle(ChatEvent::MemberJoined(MemberJoined {
            chat_id: private_chat,
            chat_title: None,
        }))
        .await
        .unwrap();
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn start_in_group_chat_is_ignored() {
        let transport = Arc::new(FakeTransport::default());
        let svc = service(transport.clone(), Duration::from_secs(300));

        svc.handle(ChatEvent::Start(Start {
            chat_id: CHAT,
            private: false,
        }))
        .await
        .unwrap();
        assert!(transport.sent().is_empty());
    }
}
