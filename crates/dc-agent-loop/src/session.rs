use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dc_agent_core::{AgentError, Message, Session, TurnEvent};

use crate::runner::{DcAgent, Result};
use crate::types::TurnOutcome;

/// Multi-turn request as sent by a client that tracks its own session id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionTurnRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_first_turn: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionTurnResponse {
    pub session_id: String,
    pub response: String,
    pub trace_id: String,
}

/// Groups turns into sessions with replayed history.
///
/// Each session sits behind its own async mutex, so turns on one session run
/// one at a time while different sessions proceed in parallel.
pub struct SessionManager {
    agent: Arc<DcAgent>,
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    current: RwLock<Option<String>>,
}

impl SessionManager {
    pub fn new(agent: Arc<DcAgent>) -> Self {
        Self {
            agent,
            sessions: DashMap::new(),
            current: RwLock::new(None),
        }
    }

    pub fn agent(&self) -> &Arc<DcAgent> {
        &self.agent
    }

    /// Start (or restart) a session with empty history. A caller-provided id
    /// is kept verbatim; otherwise a fresh UUID is generated.
    pub async fn start_new_session(
        &self,
        session_id: Option<String>,
        user_id: Option<String>,
    ) -> String {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let replaced = self
            .sessions
            .insert(
                session_id.clone(),
                Arc::new(Mutex::new(Session::new(session_id.clone(), user_id))),
            )
            .is_some();

        *self.current.write().await = Some(session_id.clone());

        if replaced {
            log::info!("[{}] Session history reset", session_id);
        } else {
            log::info!("[{}] Session started", session_id);
        }

        session_id
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub async fn history(&self, session_id: &str) -> Option<Vec<Message>> {
        let session = self.session(session_id)?;
        let history = session.lock().await.history.clone();
        Some(history)
    }

    /// Drop a session entirely. Returns whether it existed.
    pub async fn reset_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();

        let mut current = self.current.write().await;
        if current.as_deref() == Some(session_id) {
            *current = None;
        }

        if removed {
            log::info!("[{}] Session removed", session_id);
        }
        removed
    }

    /// Run one turn against a session's history. On success the user message
    /// and the final assistant message are appended; on failure the history
    /// is left untouched.
    pub async fn run_turn(
        &self,
        session_id: &str,
        user_message: &str,
        event_tx: &mpsc::Sender<TurnEvent>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let session = self
            .session(session_id)
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;
        let mut session = session.lock().await;

        log::debug!(
            "[{}] Running turn {} with {} history messages",
            session_id,
            session.turn_count() + 1,
            session.history.len()
        );

        let mut state = self.agent.conversation_for(&session.history, user_message);
        let outcome = self.agent.run_turn(&mut state, event_tx, cancel_token).await?;

        session.add_message(Message::user(user_message));
        session.add_message(Message::assistant(outcome.output.clone(), None));

        Ok(outcome)
    }

    /// Resolve the target session for `request` and run the turn.
    ///
    /// `is_first_turn`, a missing id, or an id this manager has never seen
    /// all start a fresh session.
    pub async fn handle(&self, request: SessionTurnRequest) -> Result<SessionTurnResponse> {
        let session_id = match request.session_id {
            Some(id) if !request.is_first_turn && self.contains(&id) => id,
            other => self.start_new_session(other, request.user_id).await,
        };

        let (event_tx, event_rx) = mpsc::channel(1);
        drop(event_rx);

        let outcome = self
            .run_turn(
                &session_id,
                &request.question,
                &event_tx,
                &CancellationToken::new(),
            )
            .await?;

        Ok(SessionTurnResponse {
            session_id,
            response: outcome.output,
            trace_id: outcome.trace_id,
        })
    }

    fn session(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}
