//! Chat request dispatch: turns one line of user input into one backend
//! request and reconciles the reply into the transcript.
//!
//! Every accepted submission appends exactly one user message immediately and
//! exactly one assistant message once the request resolves, whatever the
//! outcome. Pending is true strictly in between.

use serde::Serialize;

use crate::client::BackendClient;
use crate::error::ApiError;
use crate::payload::ChatReply;
use crate::state::{ConversationStore, Message};
use crate::task::Task;

/// Assistant text appended when the user aborts an in-flight request
pub const CANCELLED: &str = "Request cancelled.";

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Transcript as it was *before* this turn's user message
    pub history: Vec<Message>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub use_hyde: bool,
}

/// Start a turn: append the user message, clear `input`, mark pending.
///
/// Returns `None` without touching anything if the input is blank or a
/// request is already in flight.
pub fn begin_turn(store: &mut ConversationStore, input: &mut String, use_hyde: bool) -> Option<ChatRequest> {
    if store.is_pending() || input.trim().is_empty() {
        return None;
    }

    let message = std::mem::take(input);
    let history = store.messages().to_vec();

    store.append(Message::user(message.clone()));
    store.set_pending(true);

    Some(ChatRequest {
        message,
        history,
        use_hyde,
    })
}

/// Map the outcome of a chat request to the assistant message to append
pub fn resolve(result: Result<ChatReply, ApiError>) -> Message {
    match result {
        Ok(reply) => Message::answer(reply.text, reply.sources),
        Err(err) => {
            if !err.is_rejection() {
                tracing::warn!(error = %err, "chat request failed");
            }
            Message::assistant(err.user_message())
        }
    }
}

pub fn finish_turn(store: &mut ConversationStore, reply: Message) {
    store.append(reply);
    store.set_pending(false);
}

/// Run one full turn in place. Returns false if the input was rejected.
pub async fn submit(
    store: &mut ConversationStore,
    client: &BackendClient,
    input: &mut String,
    use_hyde: bool,
) -> bool {
    let Some(request) = begin_turn(store, input, use_hyde) else {
        return false;
    };
    let reply = resolve(client.chat(&request).await);
    finish_turn(store, reply);
    true
}

/// A conversation whose requests run on background tasks so the UI keeps
/// drawing while the backend thinks.
pub struct ChatSession {
    store: ConversationStore,
    client: BackendClient,
    use_hyde: bool,
    task: Task<ChatReply>,
}

impl ChatSession {
    pub fn new(client: BackendClient, use_hyde: bool) -> Self {
        Self {
            store: ConversationStore::new(),
            client,
            use_hyde,
            task: Task::default(),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_pending(&self) -> bool {
        self.store.is_pending()
    }

    pub fn use_hyde(&self) -> bool {
        self.use_hyde
    }

    /// Spawn the request for `input`. Must be called inside a tokio runtime.
    pub fn submit(&mut self, input: &mut String) -> bool {
        let Some(request) = begin_turn(&mut self.store, input, self.use_hyde) else {
            return false;
        };

        tracing::debug!(history = request.history.len(), "dispatching chat request");
        let client = self.client.clone();
        self.task = Task::spawn(async move { client.chat(&request).await });
        true
    }

    /// Complete the turn if its request has finished. Returns true if the
    /// transcript changed.
    pub async fn poll(&mut self) -> bool {
        match self.task.poll().await {
            Some(result) => {
                finish_turn(&mut self.store, resolve(result));
                true
            }
            None => false,
        }
    }

    /// Wait for the in-flight request, if any, and complete its turn
    pub async fn wait(&mut self) {
        if let Some(result) = self.task.wait().await {
            finish_turn(&mut self.store, resolve(result));
        }
    }

    /// Abort the in-flight request. The turn is closed with a cancellation
    /// notice so it still gets its one assistant message.
    pub fn cancel(&mut self) -> bool {
        if !self.task.abort() {
            return false;
        }
        tracing::info!("chat request cancelled");
        finish_turn(&mut self.store, Message::assistant(CANCELLED));
        true
    }
}
