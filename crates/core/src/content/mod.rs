//! The content-generation workflow: request/response shapes of the
//! `/api/content-agent` endpoint, the server-side chain of model calls, and
//! the chat transcript the dashboard renders.

pub mod agent;
pub mod conversation;
pub mod prompts;
pub mod types;

pub use agent::{AgentError, ContentAgent, LanguageModel, ModelError};
pub use conversation::{ChatMessage, Conversation, Intent, Role};
pub use prompts::Prompt;
pub use types::{
    AgentResponse, CompetitorAnalysis, ContentIdea, ContentRequest, Outline, OutlineSection,
    PageMetadata, Stage,
};
