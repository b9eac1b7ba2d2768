//! Conversation session holding the running exchange with the model.

use super::RemoteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// How an exchange with the model ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum TurnOutcome {
    Reply(String),
    Failed(String),
}

/// One prompt and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub prompt: String,

    /// Files that accompanied the prompt, in submission order.
    pub files: Vec<RemoteFile>,

    pub outcome: TurnOutcome,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(prompt: String, files: Vec<RemoteFile>, outcome: TurnOutcome) -> Self {
        Self {
            prompt,
            files,
            outcome,
            timestamp: Utc::now(),
        }
    }

    /// The model's reply, if the exchange succeeded.
    pub fn reply(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Reply(text) => Some(text),
            TurnOutcome::Failed(_) => None,
        }
    }
}

/// Ordered turns of a session. Never pruned.
#[derive(Debug, Default)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns that produced a reply; failed exchanges are not replayed to the model.
    pub fn completed(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.reply().is_some())
    }
}

/// A conversation context shared by every exchange routed through it.
///
/// The history lock is held for a whole exchange, so exchanges on one
/// session are serialized and each sees the turns before it.
#[derive(Debug)]
pub struct ConversationSession {
    session_id: String,
    history: Mutex<History>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            history: Mutex::new(History::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Exclusive access to the history for the duration of an exchange.
    pub async fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().await
    }

    pub async fn len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn snapshot(&self) -> Vec<Turn> {
        self.history.lock().await.turns().to_vec()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Which session a request talks to.
#[derive(Debug, Clone)]
pub enum SessionScope {
    /// One running conversation for every request.
    Shared(Arc<ConversationSession>),
    /// A fresh conversation per request.
    Isolated,
}

impl SessionScope {
    pub fn shared() -> Self {
        SessionScope::Shared(Arc::new(ConversationSession::new()))
    }

    pub fn acquire(&self) -> Arc<ConversationSession> {
        match self {
            SessionScope::Shared(session) => Arc::clone(session),
            SessionScope::Isolated => Arc::new(ConversationSession::new()),
        }
    }

    /// The shared session, if there is one.
    pub fn session(&self) -> Option<&Arc<ConversationSession>> {
        match self {
            SessionScope::Shared(session) => Some(session),
            SessionScope::Isolated => None,
        }
    }
}
