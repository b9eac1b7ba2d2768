//! Domain models for the wellness service.

pub mod attachment;
pub mod session;

pub use attachment::{Attachment, PromptRequest, RemoteFile};
pub use session::{ConversationSession, History, SessionScope, Turn, TurnOutcome};
