use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bizsite_core::content::{AgentResponse, ChatMessage, ContentRequest, Conversation, Intent};
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::http::FetchClient;
use crate::routing::HttpMethod;

const HINT: &str = "I can pick an idea (\"idea #2\") or generate metadata for the latest \
article. Use the form to start with a city, industry and keyword.";

/// The content-generation endpoint.
#[async_trait]
pub trait ContentEndpoint: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<AgentResponse, ClientError>;
}

/// `POST`s requests to the content agent over the shared fetch client.
#[derive(Clone)]
pub struct ContentAgentClient {
    fetch: FetchClient,
    url: String,
}

impl ContentAgentClient {
    pub fn new(fetch: FetchClient, url: impl Into<String>) -> Self {
        Self {
            fetch,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ContentEndpoint for ContentAgentClient {
    async fn generate(&self, request: &ContentRequest) -> Result<AgentResponse, ClientError> {
        let payload =
            serde_json::to_value(request).map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let body = self
            .fetch
            .request(&self.url, HttpMethod::Post, Some(&payload), &[])
            .await?
            .ok_or_else(|| ClientError::UnexpectedResponse("content agent returned no body".into()))?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a content-generation chat: one request at a time, each call
/// appending the user's message and then exactly one assistant message.
pub struct Sequencer {
    endpoint: Arc<dyn ContentEndpoint>,
    in_flight: AtomicBool,
    conversation: Mutex<Conversation>,
    /// Inputs of the last ideas request, reused when an idea is chosen.
    base: Mutex<ContentRequest>,
}

impl Sequencer {
    pub fn new(endpoint: Arc<dyn ContentEndpoint>) -> Self {
        Self {
            endpoint,
            in_flight: AtomicBool::new(false),
            conversation: Mutex::new(Conversation::new()),
            base: Mutex::new(ContentRequest::default()),
        }
    }

    /// Whether a request is outstanding. New submissions are refused until
    /// it completes.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn request_ideas(&self, params: ContentRequest) -> Result<AgentResponse, ClientError> {
        let params = ContentRequest {
            user_chosen_idea: None,
            content: None,
            ..params
        };
        let text = format!(
            "Give me content ideas for \"{}\" ({}) in {}.",
            params.keyword(),
            params.industry(),
            params.city()
        );
        let guard = self.claim()?;
        *self.base.lock().await = params.clone();
        self.run(guard, text, params).await
    }

    /// Generate the full article for `idea` with the inputs of the last
    /// ideas request.
    pub async fn choose_idea(&self, idea: &str) -> Result<AgentResponse, ClientError> {
        self.run_choice(format!("Let's go with: {idea}"), idea).await
    }

    pub async fn generate_metadata(&self, content: &str) -> Result<AgentResponse, ClientError> {
        let guard = self.claim()?;
        self.run(
            guard,
            "Generate SEO metadata for this content.".to_string(),
            ContentRequest::for_metadata(content),
        )
        .await
    }

    /// Free-text input. Recognised intents are sent with the typed text as
    /// the user message; anything else gets a hint and no request, returning
    /// `Ok(None)`.
    pub async fn send_text(&self, text: &str) -> Result<Option<AgentResponse>, ClientError> {
        let intent = self.conversation.lock().await.interpret(text);
        match intent {
            Some(Intent::ChooseIdea { number, idea }) => {
                tracing::debug!(number, "chat text chose an idea");
                self.run_choice(text.to_string(), &idea).await.map(Some)
            }
            Some(Intent::GenerateMetadata { content }) => {
                let guard = self.claim()?;
                self.run(guard, text.to_string(), ContentRequest::for_metadata(content))
                    .await
                    .map(Some)
            }
            None => {
                if self.is_busy() {
                    return Err(ClientError::Busy);
                }
                let mut conversation = self.conversation.lock().await;
                conversation.push_user(text);
                conversation.push_assistant(HINT);
                Ok(None)
            }
        }
    }

    async fn run_choice(&self, text: String, idea: &str) -> Result<AgentResponse, ClientError> {
        let guard = self.claim()?;
        let request = ContentRequest {
            user_chosen_idea: Some(idea.to_string()),
            ..self.base.lock().await.clone()
        };
        self.run(guard, text, request).await
    }

    /// Marks a request as outstanding. Must succeed before any state is touched.
    fn claim(&self) -> Result<InFlight<'_>, ClientError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    async fn run(
        &self,
        _guard: InFlight<'_>,
        text: String,
        request: ContentRequest,
    ) -> Result<AgentResponse, ClientError> {
        self.conversation.lock().await.push_user(text);
        let result = self.endpoint.generate(&request).await;

        let mut conversation = self.conversation.lock().await;
        match &result {
            Ok(response) => {
                tracing::info!(step = response.step(), "content agent step completed");
                conversation.push_response(response.clone());
            }
            Err(e) => {
                tracing::warn!("content agent request failed: {e}");
                conversation.push_error(e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use bizsite_core::content::{ContentIdea, Outline, PageMetadata, Role};
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct ScriptedEndpoint {
        replies: std::sync::Mutex<VecDeque<Result<AgentResponse, ClientError>>>,
        seen: std::sync::Mutex<Vec<ContentRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedEndpoint {
        fn new(replies: Vec<Result<AgentResponse, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: std::sync::Mutex::new(replies.into()),
                ..Self::default()
            })
        }

        fn seen(&self) -> Vec<ContentRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentEndpoint for ScriptedEndpoint {
        async fn generate(&self, request: &ContentRequest) -> Result<AgentResponse, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Err(ClientError::Network("no scripted reply".into())))
        }
    }

    fn metadata() -> PageMetadata {
        PageMetadata {
            title: "Pipe Repair in Los Angeles".into(),
            description: "Fast pipe repair.".into(),
            keywords: vec!["pipe repair".into(), "plumber".into(), "los angeles".into()],
        }
    }

    fn ideas() -> AgentResponse {
        AgentResponse::IdeasGenerated {
            ideas: ["Burst pipes", "Slab leaks", "Repiping costs"]
                .into_iter()
                .map(|idea| ContentIdea {
                    idea: idea.into(),
                    keyword_targets: vec!["pipe repair".into()],
                })
                .collect(),
        }
    }

    fn article() -> AgentResponse {
        AgentResponse::CompleteWorkflow {
            outline: Outline {
                title: "Slab leaks".into(),
                sections: vec![],
            },
            content: "Slab leaks".into(),
            markdown_content: "# Slab leaks".into(),
            competitor_analysis: None,
            metadata: metadata(),
        }
    }

    fn la_plumbing() -> ContentRequest {
        ContentRequest::for_ideas("Los Angeles", "plumbing", "pipe repair")
    }

    #[tokio::test]
    async fn ideas_then_chosen_idea_then_metadata() {
        let endpoint = ScriptedEndpoint::new(vec![
            Ok(ideas()),
            Ok(article()),
            Ok(AgentResponse::MetadataGenerated {
                metadata: metadata(),
            }),
        ]);
        let seq = Sequencer::new(endpoint.clone());

        let first = assert_ok!(seq.request_ideas(la_plumbing()).await);
        assert_eq!(first.step(), "ideas_generated");

        let second = seq.send_text("let's do idea #2").await.unwrap().unwrap();
        assert_eq!(second.step(), "complete_workflow");

        let third = seq.send_text("now generate metadata").await.unwrap().unwrap();
        assert_eq!(third.step(), "metadata_generated");

        let seen = endpoint.seen();
        assert_eq!(seen[0].stage(), Some(bizsite_core::content::Stage::Ideas));
        assert_eq!(seen[1].user_chosen_idea.as_deref(), Some("Slab leaks"));
        assert_eq!(seen[1].city.as_deref(), Some("Los Angeles"));
        assert_eq!(seen[1].keyword.as_deref(), Some("pipe repair"));
        assert_eq!(seen[2], ContentRequest::for_metadata("# Slab leaks"));

        let messages = seq.messages().await;
        assert_eq!(messages.len(), 6);
        for (i, m) in messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(m.role, expected);
        }
        assert_eq!(messages[1].payload, Some(ideas()));
        assert_eq!(messages[2].text, "let's do idea #2");
    }

    #[tokio::test]
    async fn failure_appends_error_message() {
        let endpoint = ScriptedEndpoint::new(vec![Err(ClientError::Network("offline".into()))]);
        let seq = Sequencer::new(endpoint);

        let err = assert_err!(seq.request_ideas(la_plumbing()).await);
        assert_eq!(err, ClientError::Network("offline".into()));

        let messages = seq.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(!seq.is_busy());
    }

    #[tokio::test]
    async fn unrecognised_text_gets_a_hint() {
        let endpoint = ScriptedEndpoint::new(vec![]);
        let seq = Sequencer::new(endpoint.clone());

        assert_eq!(seq.send_text("hello there").await, Ok(None));

        let messages = seq.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, HINT);
        assert!(endpoint.seen().is_empty());
    }

    #[tokio::test]
    async fn second_submission_while_busy_is_refused() {
        let gate = Arc::new(Notify::new());
        let endpoint = Arc::new(ScriptedEndpoint {
            replies: std::sync::Mutex::new(vec![Ok(ideas())].into()),
            gate: Some(gate.clone()),
            ..ScriptedEndpoint::default()
        });
        let seq = Arc::new(Sequencer::new(endpoint));

        let first = tokio::spawn({
            let seq = seq.clone();
            async move { seq.request_ideas(la_plumbing()).await }
        });
        while !seq.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(seq.request_ideas(la_plumbing()).await, Err(ClientError::Busy));
        gate.notify_one();
        assert!(first.await.unwrap().is_ok());

        assert!(!seq.is_busy());
        assert_eq!(seq.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn refused_ideas_request_keeps_the_earlier_inputs() {
        let gate = Arc::new(Notify::new());
        let endpoint = Arc::new(ScriptedEndpoint {
            replies: std::sync::Mutex::new(vec![Ok(ideas()), Ok(article())].into()),
            gate: Some(gate.clone()),
            ..ScriptedEndpoint::default()
        });
        let seq = Arc::new(Sequencer::new(endpoint.clone()));

        let first = tokio::spawn({
            let seq = seq.clone();
            async move { seq.request_ideas(la_plumbing()).await }
        });
        while !seq.is_busy() {
            tokio::task::yield_now().await;
        }

        let austin = ContentRequest::for_ideas("Austin", "roofing", "roof repair");
        assert_eq!(seq.request_ideas(austin).await, Err(ClientError::Busy));
        gate.notify_one();
        assert_ok!(first.await.unwrap());

        let choice = tokio::spawn({
            let seq = seq.clone();
            async move { seq.choose_idea("Slab leaks").await }
        });
        while !seq.is_busy() {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        assert_ok!(choice.await.unwrap());

        let seen = endpoint.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].city.as_deref(), Some("Los Angeles"));
        assert_eq!(seen[1].industry.as_deref(), Some("plumbing"));
        assert_eq!(seen[1].keyword.as_deref(), Some("pipe repair"));
        assert_eq!(seen[1].user_chosen_idea.as_deref(), Some("Slab leaks"));
    }

    #[tokio::test]
    async fn http_client_posts_camel_case_body() {
        let transport = MockTransport::new();
        transport.reply_json(
            200,
            json!({"step": "metadata_generated", "metadata": {
                "title": "t", "description": "d", "keywords": ["a", "b", "c"]
            }}),
        );
        let client = ContentAgentClient::new(
            FetchClient::new(transport.clone()),
            "http://agent.local/api/content-agent",
        );

        let request = ContentRequest {
            user_chosen_idea: Some("Slab leaks".into()),
            ..la_plumbing()
        };
        let response = client.generate(&request).await.unwrap();
        assert_eq!(response.step(), "metadata_generated");

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "http://agent.local/api/content-agent");
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body["userChosenIdea"], json!("Slab leaks"));
        assert_eq!(body["city"], json!("Los Angeles"));
        assert!(body.get("content").is_none());
    }
}
