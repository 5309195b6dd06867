use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::prompts::{self, Prompt};
use super::types::{
    AgentResponse, CompetitorAnalysis, ContentIdea, ContentRequest, Outline, PageMetadata, Stage,
};

/// Number of ideas offered to the user.
pub const IDEA_COUNT: usize = 3;

/// Failures of the language model provider.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid or expired API key (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Provider quota exceeded (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected the request (HTTP 400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Provider-side failure (HTTP 5xx).
    #[error("service error: {0}")]
    Service(String),

    /// Connection or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered but not with a JSON document.
    #[error("malformed completion: {0}")]
    Malformed(String),
}

impl ModelError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ModelError::Unauthorized(body),
            429 => ModelError::RateLimited(body),
            400..=499 => ModelError::BadRequest(body),
            _ => ModelError::Service(format!("HTTP {status}: {body}")),
        }
    }
}

/// A provider able to answer a prompt with JSON conforming to its schema.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete_json(&self, prompt: &Prompt) -> Result<Value, ModelError>;
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provide city, industry and keyword, a chosen idea, or content")]
    MissingInput,

    #[error("model call failed during {step}: {source}")]
    Model {
        step: &'static str,
        #[source]
        source: ModelError,
    },

    #[error("unexpected model output during {step}: {reason}")]
    InvalidOutput { step: &'static str, reason: String },
}

impl AgentError {
    fn invalid(step: &'static str, reason: impl Into<String>) -> Self {
        AgentError::InvalidOutput {
            step,
            reason: reason.into(),
        }
    }
}

#[derive(Deserialize)]
struct IdeasOutput {
    ideas: Vec<ContentIdea>,
}

#[derive(Deserialize)]
struct ArticleOutput {
    markdown: String,
}

/// Server side of the content workflow: chains the model calls a request's
/// stage requires and packs the result into one [`AgentResponse`].
///
/// Calls are strictly sequential and never retried.
#[derive(Clone)]
pub struct ContentAgent {
    model: Arc<dyn LanguageModel>,
}

impl ContentAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn run(&self, request: &ContentRequest) -> Result<AgentResponse, AgentError> {
        match request.stage().ok_or(AgentError::MissingInput)? {
            Stage::Ideas => self.generate_ideas(request).await,
            Stage::CompleteWorkflow => self.complete_workflow(request).await,
            Stage::Metadata => {
                let content = request.content.as_deref().unwrap_or_default();
                let metadata = self.generate_metadata(content).await?;
                Ok(AgentResponse::MetadataGenerated { metadata })
            }
        }
    }

    async fn generate_ideas(&self, request: &ContentRequest) -> Result<AgentResponse, AgentError> {
        let out: IdeasOutput = self.ask("ideas", &prompts::ideas(request)).await?;
        let mut ideas: Vec<ContentIdea> = out
            .ideas
            .into_iter()
            .filter(|i| !i.idea.trim().is_empty())
            .collect();
        if ideas.len() < IDEA_COUNT {
            return Err(AgentError::invalid(
                "ideas",
                format!("expected {IDEA_COUNT} ideas, got {}", ideas.len()),
            ));
        }
        ideas.truncate(IDEA_COUNT);
        Ok(AgentResponse::IdeasGenerated { ideas })
    }

    async fn complete_workflow(
        &self,
        request: &ContentRequest,
    ) -> Result<AgentResponse, AgentError> {
        let idea = request.user_chosen_idea.as_deref().unwrap_or_default().trim();

        let outline: Outline = self.ask("outline", &prompts::outline(request, idea)).await?;
        if outline.sections.is_empty() {
            return Err(AgentError::invalid("outline", "outline has no sections"));
        }

        let article: ArticleOutput = self
            .ask("content", &prompts::article(request, &outline))
            .await?;
        let markdown_content = article.markdown.trim().to_string();
        if markdown_content.is_empty() {
            return Err(AgentError::invalid("content", "article is empty"));
        }

        let competitors = request.competitor_urls();
        let competitor_analysis = if competitors.is_empty() {
            None
        } else {
            let mut analysis: CompetitorAnalysis = self
                .ask(
                    "competitor_analysis",
                    &prompts::competitor_gaps(request, &markdown_content, &competitors),
                )
                .await?;
            analysis.competitor_urls = competitors.iter().map(|s| s.to_string()).collect();
            Some(analysis)
        };

        let metadata = self.generate_metadata(&markdown_content).await?;

        Ok(AgentResponse::CompleteWorkflow {
            outline,
            content: strip_markdown(&markdown_content),
            markdown_content,
            competitor_analysis,
            metadata,
        })
    }

    async fn generate_metadata(&self, content: &str) -> Result<PageMetadata, AgentError> {
        let mut metadata: PageMetadata = self.ask("metadata", &prompts::metadata(content)).await?;
        metadata.keywords.retain(|k| !k.trim().is_empty());
        if metadata.keywords.is_empty() {
            return Err(AgentError::invalid("metadata", "no keywords returned"));
        }
        Ok(metadata)
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        step: &'static str,
        prompt: &Prompt,
    ) -> Result<T, AgentError> {
        tracing::debug!(step, schema = prompt.schema_name, "calling language model");
        let value = self
            .model
            .complete_json(prompt)
            .await
            .map_err(|source| AgentError::Model { step, source })?;
        serde_json::from_value(value).map_err(|e| AgentError::invalid(step, e.to_string()))
    }
}

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("link pattern is valid"));
static LINE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]{0,3}(?:#{1,6}[ \t]+|>[ \t]?|[-*+][ \t]+)").expect("line pattern is valid")
});
/// Paired emphasis and code spans; a lone `*` or an intraword `_` is text.
static EMPHASIS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\*\*([^*\n]+)\*\*",
        r"\b__([^_\n]+)__\b",
        r"\*([^*\s](?:[^*\n]*[^*\s])?)\*",
        r"\b_([^_\n]+)_\b",
        r"`([^`\n]+)`",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("emphasis pattern is valid"))
    .collect()
});

/// Plain-text rendering of Markdown: headings, list bullets, quotes, emphasis
/// and link targets removed.
pub fn strip_markdown(markdown: &str) -> String {
    let text = LINK.replace_all(markdown, "$1");
    let text = LINE_MARKUP.replace_all(&text, "");
    let text = EMPHASIS
        .iter()
        .fold(text.into_owned(), |text, re| re.replace_all(&text, "$1").into_owned());
    text.trim().to_string()
}
