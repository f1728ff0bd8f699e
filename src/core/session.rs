use super::message::{Message, Role, SessionStatus};
use crate::ai::{KeywordRule, ResponseSelector};
use crate::config::{ConfigError, SessionConfig};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Why `submit` did not accept a message. Nothing in the session changes in either case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,
    #[error("still waiting for the previous response")]
    Busy,
}

/// How often each rule answered in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyStats {
    /// One entry per distinct keyword, in rule-table order.
    pub replies_by_keyword: Vec<(String, usize)>,
    pub fallback_replies: usize,
}

impl ReplyStats {
    fn for_rules(rules: &[KeywordRule]) -> Self {
        let mut replies_by_keyword: Vec<(String, usize)> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !replies_by_keyword.iter().any(|(k, _)| k == rule.keyword()) {
                replies_by_keyword.push((rule.keyword().to_string(), 0));
            }
        }
        Self {
            replies_by_keyword,
            fallback_replies: 0,
        }
    }

    fn record(&mut self, matched_keyword: Option<&str>) {
        let entry = matched_keyword.and_then(|keyword| {
            self.replies_by_keyword
                .iter_mut()
                .find(|(k, _)| k == keyword)
        });
        match entry {
            Some((_, count)) => *count += 1,
            None => self.fallback_replies += 1,
        }
    }

    pub fn count_for(&self, keyword: &str) -> usize {
        let keyword = keyword.to_lowercase();
        self.replies_by_keyword
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn total_replies(&self) -> usize {
        self.replies_by_keyword
            .iter()
            .map(|(_, count)| count)
            .sum::<usize>()
            + self.fallback_replies
    }
}

/// The deferred step for the one message currently waiting for a reply.
#[derive(Debug)]
struct PendingResponse {
    ticket: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct SessionState {
    history: Vec<Message>,
    pending: Option<PendingResponse>,
    next_ticket: u64,
    stats: ReplyStats,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        if self.pending.is_some() {
            SessionStatus::AwaitingResponse
        } else {
            SessionStatus::Idle
        }
    }

    fn push(&mut self, role: Role, content: String) {
        // Wall clock may step back; history timestamps must not.
        let now = Utc::now();
        let created_at = match self.history.last() {
            Some(last) if last.created_at() > now => last.created_at(),
            _ => now,
        };
        self.history.push(Message::new(role, content, created_at));
    }
}

#[derive(Debug)]
struct Shared {
    id: Uuid,
    config: SessionConfig,
    selector: ResponseSelector,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the state lock held so watchers see transitions in order.
    fn publish(&self, state: &SessionState) {
        self.status_tx.send_replace(state.status());
    }

    fn resolve_response(&self, ticket: u64) {
        let mut state = self.lock();

        match &state.pending {
            Some(pending) if pending.ticket == ticket => {}
            _ => {
                log::debug!("Session {}: dropping stale response #{}", self.id, ticket);
                return;
            }
        }
        state.pending = None;

        let question = state
            .history
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content().to_string())
            .unwrap_or_default();

        let selection = self.selector.select_match(&question);
        let reply = selection.reply.to_string();
        state.stats.record(selection.matched.map(KeywordRule::keyword));

        match selection.matched {
            Some(rule) => log::debug!("💬 Session {}: answered by rule {:?}", self.id, rule.keyword()),
            None => log::debug!("💬 Session {}: no rule matched, using fallback", self.id),
        }

        state.push(Role::Assistant, reply);
        self.publish(&state);
    }
}

/// Owned by the reply task. However the task ends (timer fired, runtime shut
/// down, task panicked) the pending reply gets answered exactly once; after a
/// `cancel` the ticket is stale and answering is a no-op.
struct ResponseGuard {
    shared: Arc<Shared>,
    ticket: Option<u64>,
}

impl ResponseGuard {
    fn finish(mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.shared.resolve_response(ticket);
        }
    }
}

impl Drop for ResponseGuard {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            log::debug!("Session {}: reply task ended before its timer", self.shared.id);
            self.shared.resolve_response(ticket);
        }
    }
}

/// Runtime for sessions driven from outside tokio. Built on first use, lives
/// for the rest of the process.
fn background_runtime() -> Option<Handle> {
    static RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

    RUNTIME
        .get_or_init(|| {
            match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("coach-chat-replies")
                .enable_time()
                .build()
            {
                Ok(runtime) => Some(runtime),
                Err(e) => {
                    log::error!("Failed to start reply runtime, replies will be immediate: {}", e);
                    None
                }
            }
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
}

/// One conversation: an append-only transcript plus an idle/awaiting flag.
///
/// `submit` appends the user's message and schedules the reply after the
/// configured delay; while that reply is pending every further `submit` is
/// rejected. Clones share the same session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let selector = ResponseSelector::new(config.rules.clone(), config.fallback_reply.clone());
        let stats = ReplyStats::for_rules(&config.rules);
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        let id = Uuid::new_v4();

        log::info!(
            "📍 Chat session {} started ({} rules, {} ms delay)",
            id,
            config.rules.len(),
            config.response_delay_ms
        );

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                config,
                selector,
                state: Mutex::new(SessionState {
                    history: Vec::new(),
                    pending: None,
                    next_ticket: 0,
                    stats,
                }),
                status_tx,
            }),
        })
    }

    /// Accepts a message unless it is blank or a reply is still pending.
    ///
    /// Returns as soon as the user message is recorded. With a zero delay the
    /// reply is produced before this returns. Otherwise the reply runs on the
    /// caller's tokio runtime, or on a shared background runtime when called
    /// from outside one.
    pub fn submit(&self, text: &str) -> Result<(), SubmitError> {
        let content = text.trim();
        if content.is_empty() {
            log::debug!("Session {}: rejected empty message", self.shared.id);
            return Err(SubmitError::EmptyInput);
        }

        let ticket = {
            let mut state = self.shared.lock();
            if state.pending.is_some() {
                log::debug!("Session {}: rejected message while busy", self.shared.id);
                return Err(SubmitError::Busy);
            }

            state.push(Role::User, content.to_string());
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.pending = Some(PendingResponse { ticket, task: None });
            self.shared.publish(&state);
            ticket
        };

        log::debug!(
            "📝 Session {}: accepted message: {}",
            self.shared.id,
            content.chars().take(50).collect::<String>()
        );

        self.schedule_response(ticket);
        Ok(())
    }

    fn schedule_response(&self, ticket: u64) {
        let delay = self.shared.config.response_delay();
        if delay.is_zero() {
            self.shared.resolve_response(ticket);
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => match background_runtime() {
                Some(handle) => handle,
                None => {
                    self.shared.resolve_response(ticket);
                    return;
                }
            },
        };

        let guard = ResponseGuard {
            shared: Arc::clone(&self.shared),
            ticket: Some(ticket),
        };
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            guard.finish();
        });

        let mut state = self.shared.lock();
        match state.pending.as_mut() {
            Some(pending) if pending.ticket == ticket => pending.task = Some(task),
            _ => {}
        }
    }

    /// Drops the pending reply, if any, and returns to idle without answering.
    pub fn cancel(&self) -> bool {
        let task = {
            let mut state = self.shared.lock();
            let Some(pending) = state.pending.take() else {
                return false;
            };
            self.shared.publish(&state);
            pending.task
        };

        if let Some(task) = task {
            task.abort();
        }

        log::info!("🛑 Session {}: pending response cancelled", self.shared.id);
        true
    }

    pub fn history(&self) -> Vec<Message> {
        self.shared.lock().history.clone()
    }

    pub fn last_message(&self) -> Option<Message> {
        self.shared.lock().history.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status()
    }

    pub fn is_busy(&self) -> bool {
        self.status() == SessionStatus::AwaitingResponse
    }

    pub fn stats(&self) -> ReplyStats {
        self.shared.lock().stats.clone()
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Receives every status transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub async fn wait_until_idle(&self) {
        let mut status_rx = self.subscribe();
        let _ = status_rx
            .wait_for(|status| *status == SessionStatus::Idle)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(delay_ms: u64) -> ChatSession {
        let rules = vec![
            KeywordRule::new("marketing", "Focus on one channel."),
            KeywordRule::new("revenue", "Optimize pricing."),
        ];
        ChatSession::new(SessionConfig::new(rules, "Tell me more.", delay_ms)).unwrap()
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let session = session(0);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.is_empty());
        assert!(session.last_message().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SessionConfig::new(vec![], "", 0);
        assert!(matches!(ChatSession::new(config), Err(ConfigError::EmptyFallback)));
    }

    #[test]
    fn zero_delay_resolves_inline() {
        let session = session(0);
        session.submit("  What's your marketing advice?  ").unwrap();

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].content(), "What's your marketing advice?");
        assert_eq!(history[1].role(), Role::Assistant);
        assert_eq!(history[1].content(), "Focus on one channel.");
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn stats_track_rules_and_fallbacks() {
        let session = session(0);
        session.submit("marketing").unwrap();
        session.submit("more MARKETING").unwrap();
        session.submit("revenue").unwrap();
        session.submit("weather?").unwrap();

        let stats = session.stats();
        assert_eq!(stats.count_for("marketing"), 2);
        assert_eq!(stats.count_for("Revenue"), 1);
        assert_eq!(stats.fallback_replies, 1);
        assert_eq!(stats.total_replies(), 4);
    }

    #[test]
    fn duplicate_keywords_share_one_stats_entry() {
        let rules = vec![KeywordRule::new("a", "first"), KeywordRule::new("A", "second")];
        let stats = ReplyStats::for_rules(&rules);
        assert_eq!(stats.replies_by_keyword, vec![("a".to_string(), 0)]);
    }

    #[test]
    fn timestamps_never_decrease() {
        let session = session(0);
        for text in ["marketing", "revenue", "hello", "again"] {
            session.submit(text).unwrap();
        }
        let history = session.history();
        assert!(history
            .windows(2)
            .all(|pair| pair[0].created_at() <= pair[1].created_at()));
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let session = session(0);
        assert!(!session.cancel());
        assert!(session.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_arrives_after_the_delay() {
        let session = session(1500);
        session.submit("revenue ideas").unwrap();
        assert_eq!(session.status(), SessionStatus::AwaitingResponse);
        assert_eq!(session.len(), 1);

        tokio::time::sleep(Duration::from_millis(1499)).await;
        assert!(session.is_busy());

        session.wait_until_idle().await;
        assert_eq!(session.len(), 2);
        assert_eq!(
            session.last_message().map(|m| m.content().to_string()),
            Some("Optimize pricing.".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reply_is_never_appended() {
        let session = session(1000);
        session.submit("marketing").unwrap();
        assert!(session.cancel());
        assert_eq!(session.status(), SessionStatus::Idle);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(session.len(), 1);
        assert_eq!(session.stats().total_replies(), 0);

        session.submit("revenue").unwrap();
        session.wait_until_idle().await;
        let roles: Vec<Role> = session.history().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_both_transitions() {
        let session = session(200);
        let mut status_rx = session.subscribe();

        session.submit("hello").unwrap();
        status_rx.changed().await.unwrap();
        assert_eq!(*status_rx.borrow_and_update(), SessionStatus::AwaitingResponse);

        status_rx.changed().await.unwrap();
        assert_eq!(*status_rx.borrow_and_update(), SessionStatus::Idle);
    }

    #[test]
    fn delay_without_runtime_uses_background_runtime() {
        let session = session(10);
        session.submit("marketing").unwrap();
        assert!(session.is_busy());

        for _ in 0..200 {
            if !session.is_busy() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn cancel_without_runtime_stops_the_reply() {
        let session = session(10_000);
        session.submit("marketing").unwrap();
        assert!(session.cancel());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.len(), 1);

        session.submit("revenue").unwrap();
        assert!(session.is_busy());
        assert!(session.cancel());
    }

    #[test]
    fn reply_is_delivered_when_runtime_shuts_down_early() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let session = session(10_000);
        {
            let _enter = rt.enter();
            session.submit("marketing").unwrap();
        }
        assert!(session.is_busy());

        drop(rt);

        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.len(), 2);
        assert_eq!(
            session.last_message().map(|m| m.content().to_string()),
            Some("Focus on one channel.".to_string())
        );
        assert_eq!(session.submit("revenue"), Ok(()));
    }

    #[test]
    fn reply_is_delivered_when_runtime_has_no_timers() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let session = session(50);

        rt.block_on(async {
            session.submit("revenue").unwrap();
            session.wait_until_idle().await;
        });

        assert_eq!(session.status(), SessionStatus::Idle);
        let roles: Vec<Role> = session.history().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }
}
