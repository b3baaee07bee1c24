pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod remote;
pub mod state;
pub mod task;

// Re-export main types for convenience
pub use chat::{ChatRequest, ChatSession};
pub use client::{BackendClient, DEFAULT_BACKEND_URL};
pub use config::Config;
pub use error::{ApiError, TRANSPORT_FAILURE};
pub use payload::{BackendStatus, ChatReply, Cluster, IngestReport, PipelineConfig, Sentiment, TimePoint};
pub use remote::{ActionOutcome, Fetch, Remote};
pub use state::{ChatRole, Citation, ConversationStore, Message};
pub use task::Task;
