use serde_json::{json, Value};

use super::types::{ContentRequest, Outline};

const SYSTEM: &str = "You are an SEO content strategist writing for local service \
businesses. Answer only with JSON matching the provided schema.";

/// A single schema-constrained model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Name the schema is registered under with the provider.
    pub schema_name: &'static str,
    pub schema: Value,
}

impl Prompt {
    fn new(schema_name: &'static str, user: String, schema: Value) -> Self {
        Self {
            system: SYSTEM.to_string(),
            user,
            schema_name,
            schema,
        }
    }
}

fn string_array() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn business_line(req: &ContentRequest) -> String {
    let mut line = format!(
        "Business: {} in {}. Primary keyword: \"{}\".",
        req.industry(),
        req.city(),
        req.keyword()
    );
    if let Some(service) = req.service.as_deref().filter(|s| !s.trim().is_empty()) {
        line.push_str(&format!(" Featured service: {service}."));
    }
    if let Some(url) = req.our_url.as_deref().filter(|s| !s.trim().is_empty()) {
        line.push_str(&format!(" Website: {url}."));
    }
    line
}

pub fn ideas(req: &ContentRequest) -> Prompt {
    let user = format!(
        "{}\nPropose exactly 3 distinct blog or landing page ideas that would rank for local \
searches. For each give the idea as a one-line working title and 3-5 keyword targets.",
        business_line(req)
    );
    let idea = object(
        json!({"idea": {"type": "string"}, "keywordTargets": string_array()}),
        &["idea", "keywordTargets"],
    );
    let schema = object(
        json!({"ideas": {"type": "array", "items": idea}}),
        &["ideas"],
    );
    Prompt::new("content_ideas", user, schema)
}

pub fn outline(req: &ContentRequest, idea: &str) -> Prompt {
    let user = format!(
        "{}\nChosen idea: \"{idea}\".\nWrite an article outline: a title and 4-7 sections, each \
with a heading and 2-4 key points.",
        business_line(req)
    );
    let section = object(
        json!({"heading": {"type": "string"}, "points": string_array()}),
        &["heading", "points"],
    );
    let schema = object(
        json!({
            "title": {"type": "string"},
            "sections": {"type": "array", "items": section},
        }),
        &["title", "sections"],
    );
    Prompt::new("content_outline", user, schema)
}

pub fn article(req: &ContentRequest, outline: &Outline) -> Prompt {
    let mut sections = String::new();
    for section in &outline.sections {
        sections.push_str(&format!("## {}\n", section.heading));
        for point in &section.points {
            sections.push_str(&format!("- {point}\n"));
        }
    }
    let user = format!(
        "{}\nWrite the full article in Markdown following this outline. Use the title as an H1, \
keep the section headings, and work the keyword in naturally.\n\n# {}\n{sections}",
        business_line(req),
        outline.title
    );
    let schema = object(json!({"markdown": {"type": "string"}}), &["markdown"]);
    Prompt::new("content_article", user, schema)
}

pub fn competitor_gaps(req: &ContentRequest, markdown: &str, competitors: &[&str]) -> Prompt {
    let user = format!(
        "{}\nCompare our article with the pages at these competitor URLs: {}.\nList content gaps \
our article should cover, keyword opportunities, and concrete recommendations.\n\nOur article:\n{markdown}",
        business_line(req),
        competitors.join(", ")
    );
    let schema = object(
        json!({
            "contentGaps": string_array(),
            "keywordOpportunities": string_array(),
            "recommendations": string_array(),
        }),
        &["contentGaps", "keywordOpportunities", "recommendations"],
    );
    Prompt::new("competitor_analysis", user, schema)
}

pub fn metadata(content: &str) -> Prompt {
    let user = format!(
        "Write SEO metadata for the page below: a title of 10-60 characters, a meta description \
of 110-160 characters, and 3-8 keywords.\n\n{content}"
    );
    let schema = object(
        json!({
            "title": {"type": "string"},
            "description": {"type": "string"},
            "keywords": string_array(),
        }),
        &["title", "description", "keywords"],
    );
    Prompt::new("page_metadata", user, schema)
}
