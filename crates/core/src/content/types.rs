use serde::{Deserialize, Serialize};

/// Body of `POST /api/content-agent`. Which fields are present selects the
/// step; see [`ContentRequest::stage`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub our_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor1_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor2_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_chosen_idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Which step of the workflow a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ideas,
    CompleteWorkflow,
    Metadata,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ContentRequest {
    pub fn for_ideas(
        city: impl Into<String>,
        industry: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            city: Some(city.into()),
            industry: Some(industry.into()),
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub fn for_metadata(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A chosen idea wins over supplied content; content alone asks for
    /// metadata; otherwise city, industry and keyword are all needed.
    pub fn stage(&self) -> Option<Stage> {
        if present(&self.user_chosen_idea).is_some() {
            Some(Stage::CompleteWorkflow)
        } else if present(&self.content).is_some() {
            Some(Stage::Metadata)
        } else if present(&self.city).is_some()
            && present(&self.industry).is_some()
            && present(&self.keyword).is_some()
        {
            Some(Stage::Ideas)
        } else {
            None
        }
    }

    pub fn competitor_urls(&self) -> Vec<&str> {
        [&self.competitor1_url, &self.competitor2_url]
            .into_iter()
            .filter_map(present)
            .collect()
    }

    pub fn city(&self) -> &str {
        present(&self.city).unwrap_or_default()
    }

    pub fn industry(&self) -> &str {
        present(&self.industry).unwrap_or_default()
    }

    pub fn keyword(&self) -> &str {
        present(&self.keyword).unwrap_or_default()
    }
}

/// One proposed article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIdea {
    pub idea: String,
    #[serde(default)]
    pub keyword_targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    #[serde(default)]
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    #[serde(default)]
    pub competitor_urls: Vec<String>,
    #[serde(default)]
    pub content_gaps: Vec<String>,
    #[serde(default)]
    pub keyword_opportunities: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

impl PageMetadata {
    /// Keywords in the comma-separated form stored on SEO rows.
    pub fn keyword_list(&self) -> String {
        self.keywords.join(", ")
    }
}

/// Response of the content agent, discriminated by `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AgentResponse {
    IdeasGenerated {
        ideas: Vec<ContentIdea>,
    },
    #[serde(rename_all = "camelCase")]
    CompleteWorkflow {
        outline: Outline,
        /// Article body as plain text.
        content: String,
        markdown_content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        competitor_analysis: Option<CompetitorAnalysis>,
        metadata: PageMetadata,
    },
    MetadataGenerated {
        metadata: PageMetadata,
    },
}

impl AgentResponse {
    pub fn step(&self) -> &'static str {
        match self {
            AgentResponse::IdeasGenerated { .. } => "ideas_generated",
            AgentResponse::CompleteWorkflow { .. } => "complete_workflow",
            AgentResponse::MetadataGenerated { .. } => "metadata_generated",
        }
    }

    pub fn metadata(&self) -> Option<&PageMetadata> {
        match self {
            AgentResponse::CompleteWorkflow { metadata, .. }
            | AgentResponse::MetadataGenerated { metadata } => Some(metadata),
            AgentResponse::IdeasGenerated { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_selection() {
        assert_eq!(
            ContentRequest::for_ideas("LA", "plumbing", "pipe repair").stage(),
            Some(Stage::Ideas)
        );
        assert_eq!(ContentRequest::for_metadata("# Body").stage(), Some(Stage::Metadata));

        let chosen = ContentRequest {
            user_chosen_idea: Some("X".into()),
            content: Some("ignored".into()),
            ..ContentRequest::for_ideas("LA", "plumbing", "pipe repair")
        };
        assert_eq!(chosen.stage(), Some(Stage::CompleteWorkflow));

        let partial = ContentRequest {
            city: Some("LA".into()),
            keyword: Some("  ".into()),
            ..ContentRequest::default()
        };
        assert_eq!(partial.stage(), None);
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let req: ContentRequest = serde_json::from_value(json!({
            "city": "LA",
            "competitor1Url": "https://a.example",
            "competitor2Url": "",
            "userChosenIdea": "X"
        }))
        .unwrap();
        assert_eq!(req.competitor_urls(), vec!["https://a.example"]);
        assert_eq!(req.user_chosen_idea.as_deref(), Some("X"));
    }

    #[test]
    fn response_is_tagged_by_step() {
        let resp: AgentResponse = serde_json::from_value(json!({
            "step": "metadata_generated",
            "metadata": {"title": "T", "description": "D", "keywords": ["a", "b"]}
        }))
        .unwrap();
        assert_eq!(resp.step(), "metadata_generated");
        assert_eq!(resp.metadata().unwrap().keyword_list(), "a, b");

        let ideas = AgentResponse::IdeasGenerated {
            ideas: vec![ContentIdea {
                idea: "Winter pipe care".into(),
                keyword_targets: vec!["frozen pipes".into()],
            }],
        };
        let v = serde_json::to_value(&ideas).unwrap();
        assert_eq!(v["step"], "ideas_generated");
        assert_eq!(v["ideas"][0]["keywordTargets"][0], "frozen pipes");
    }
}
