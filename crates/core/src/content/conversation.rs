use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{AgentResponse, ContentIdea};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    /// Raw structured result of the step this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<AgentResponse>,
    #[serde(default)]
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, text: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text,
            payload: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }
}

/// What a free-text chat message was understood to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Pick an idea (1-based) from the latest ideas message.
    ChooseIdea { number: usize, idea: String },
    /// Generate metadata for the latest generated article.
    GenerateMetadata { content: String },
}

static IDEA_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:idea|option|number)\s*#?\s*|#)(\d+)").expect("idea pattern is valid")
});
static IDEA_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(first|second|third)\b").expect("ordinal pattern is valid"));
static METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmeta\s*-?\s*data\b").expect("metadata pattern is valid"));

/// Append-only transcript of a content-generation session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(Role::User, text.into()))
    }

    /// Record a step result as one assistant message carrying the payload.
    pub fn push_response(&mut self, response: AgentResponse) -> &ChatMessage {
        let mut message = ChatMessage::new(Role::Assistant, describe(&response));
        message.payload = Some(response);
        self.push(message)
    }

    /// Plain assistant text with no step payload, such as a usage hint.
    pub fn push_assistant(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(Role::Assistant, text.into()))
    }

    pub fn push_error(&mut self, error: impl std::fmt::Display) -> &ChatMessage {
        let mut message = ChatMessage::new(Role::Assistant, format!("Sorry, something went wrong: {error}"));
        message.is_error = true;
        self.push(message)
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Ideas from the most recent ideas message.
    pub fn latest_ideas(&self) -> Option<&[ContentIdea]> {
        self.messages.iter().rev().find_map(|m| match &m.payload {
            Some(AgentResponse::IdeasGenerated { ideas }) => Some(ideas.as_slice()),
            _ => None,
        })
    }

    /// Markdown of the most recent generated article.
    pub fn latest_markdown(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match &m.payload {
            Some(AgentResponse::CompleteWorkflow {
                markdown_content, ..
            }) => Some(markdown_content.as_str()),
            _ => None,
        })
    }

    /// Best-effort reading of a typed message against the transcript.
    ///
    /// `idea #2`, `option 2`, `number 2`, `#2` and `second` select an idea;
    /// anything mentioning metadata asks for metadata of the last article.
    /// Returns `None` when nothing matches or the referenced history is
    /// missing.
    pub fn interpret(&self, text: &str) -> Option<Intent> {
        if METADATA.is_match(text) {
            if let Some(content) = self.latest_markdown() {
                return Some(Intent::GenerateMetadata {
                    content: content.to_string(),
                });
            }
        }

        let ideas = self.latest_ideas()?;
        let number = IDEA_NUMBER
            .captures(text)
            .and_then(|c| c[1].parse::<usize>().ok())
            .or_else(|| {
                IDEA_ORDINAL.captures(text).map(|c| match c[1].to_lowercase().as_str() {
                    "first" => 1,
                    "second" => 2,
                    _ => 3,
                })
            })?;
        let idea = ideas.get(number.checked_sub(1)?)?;
        Some(Intent::ChooseIdea {
            number,
            idea: idea.idea.clone(),
        })
    }
}

fn describe(response: &AgentResponse) -> String {
    match response {
        AgentResponse::IdeasGenerated { ideas } => {
            let mut text = String::from("Here are some content ideas:\n");
            for (i, idea) in ideas.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, idea.idea));
            }
            text.push_str("Pick one to generate the full article.");
            text
        }
        AgentResponse::CompleteWorkflow {
            outline,
            competitor_analysis,
            ..
        } => {
            let mut text = format!("Your article \"{}\" is ready.", outline.title);
            if competitor_analysis.is_some() {
                text.push_str(" I also compared it against your competitors.");
            }
            text
        }
        AgentResponse::MetadataGenerated { metadata } => {
            format!("Generated SEO metadata: \"{}\".", metadata.title)
        }
    }
}
