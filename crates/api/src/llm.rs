//! OpenAI-compatible chat completions as a [`LanguageModel`].

use async_trait::async_trait;
use bizsite_core::content::{LanguageModel, ModelError, Prompt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::OpenAiConfig;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

pub struct OpenAiModel {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiModel {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": prompt.schema_name,
                    "strict": true,
                    "schema": prompt.schema,
                },
            }),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete_json(&self, prompt: &Prompt) -> Result<Value, ModelError> {
        tracing::debug!(schema = prompt.schema_name, model = %self.config.model, "chat completion");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status.as_u16(), body));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        parse_completion(completion)
    }
}

fn parse_completion(completion: ChatResponse) -> Result<Value, ModelError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Malformed("no choices returned".into()))?
        .message;
    if let Some(refusal) = message.refusal {
        return Err(ModelError::BadRequest(format!("model refused: {refusal}")));
    }
    let content = message
        .content
        .ok_or_else(|| ModelError::Malformed("empty message".into()))?;
    serde_json::from_str(&content).map_err(|e| ModelError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiModel {
        OpenAiModel::new(OpenAiConfig {
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1/".into(),
        })
    }

    #[test]
    fn body_requests_schema_constrained_json() {
        let prompt = Prompt {
            system: "sys".into(),
            user: "usr".into(),
            schema_name: "page_metadata",
            schema: json!({"type": "object"}),
        };
        let m = model();
        let body = serde_json::to_value(m.request_body(&prompt)).unwrap();

        assert_eq!(m.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "page_metadata");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["response_format"]["json_schema"]["schema"], json!({"type": "object"}));
    }

    #[test]
    fn completion_content_is_parsed_as_json() {
        let completion: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"title\":\"t\"}"}}]
        }))
        .unwrap();
        assert_eq!(parse_completion(completion).unwrap(), json!({"title": "t"}));
    }

    #[test]
    fn refusal_and_prose_are_errors() {
        let refused: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null, "refusal": "no"}}]
        }))
        .unwrap();
        assert!(matches!(parse_completion(refused), Err(ModelError::BadRequest(_))));

        let prose: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Sure! Here you go"}}]
        }))
        .unwrap();
        assert!(matches!(parse_completion(prose), Err(ModelError::Malformed(_))));
    }
}
