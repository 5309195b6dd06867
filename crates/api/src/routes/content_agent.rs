use axum::{extract::State, routing::post, Json, Router};
use bizsite_core::content::{AgentResponse, ContentRequest};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/content-agent", post(content_agent))
}

/// Runs the workflow step selected by the fields present in the body.
async fn content_agent(
    State(state): State<AppState>,
    Json(request): Json<ContentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let stage = request.stage();
    tracing::info!(?stage, "content agent request");
    let response = state.agent().run(&request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::build_router;
    use crate::routes::test_support::{json_body, state_with, CannedModel};

    fn post(body: Value) -> Request<Body> {
        Request::post("/api/content-agent")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn metadata() -> Value {
        json!({
            "title": "Pipe Repair in Los Angeles",
            "description": "Same-day pipe repair from licensed LA plumbers.",
            "keywords": ["pipe repair", "los angeles plumber", "leak repair"]
        })
    }

    #[tokio::test]
    async fn generates_three_ideas() {
        let model = CannedModel::with([(
            "content_ideas",
            json!({"ideas": [
                {"idea": "Burst pipes", "keywordTargets": ["burst pipe repair"]},
                {"idea": "Slab leaks", "keywordTargets": ["slab leak"]},
                {"idea": "Repiping costs", "keywordTargets": ["repipe cost"]},
                {"idea": "Extra", "keywordTargets": []}
            ]}),
        )]);
        let app = build_router(state_with(model));

        let response = app
            .oneshot(post(json!({
                "city": "Los Angeles", "industry": "plumbing", "keyword": "pipe repair"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["step"], "ideas_generated");
        assert_eq!(body["ideas"].as_array().unwrap().len(), 3);
        assert_eq!(body["ideas"][1]["keywordTargets"][0], "slab leak");
    }

    #[tokio::test]
    async fn chosen_idea_runs_full_workflow_without_competitors() {
        let model = CannedModel::with([
            (
                "content_outline",
                json!({"title": "Slab Leaks", "sections": [{"heading": "Signs", "points": ["warm floors"]}]}),
            ),
            ("content_article", json!({"markdown": "# Slab Leaks\n\n**Warm** floors."})),
            ("page_metadata", metadata()),
        ]);
        let app = build_router(state_with(model.clone()));

        let response = app
            .oneshot(post(json!({
                "city": "Los Angeles", "industry": "plumbing", "keyword": "pipe repair",
                "userChosenIdea": "Slab leaks"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["step"], "complete_workflow");
        assert_eq!(body["markdownContent"], "# Slab Leaks\n\n**Warm** floors.");
        assert!(body.get("competitorAnalysis").is_none());
        assert_eq!(body["metadata"]["keywords"].as_array().unwrap().len(), 3);
        assert_eq!(
            *model.asked.lock().unwrap(),
            vec!["content_outline", "content_article", "page_metadata"]
        );
    }

    #[tokio::test]
    async fn content_alone_generates_metadata() {
        let model = CannedModel::with([("page_metadata", metadata())]);
        let app = build_router(state_with(model));

        let response = app
            .oneshot(post(json!({"content": "We fix pipes."})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["step"], "metadata_generated");
        assert_eq!(body["metadata"]["title"], "Pipe Repair in Los Angeles");
    }

    #[tokio::test]
    async fn missing_inputs_are_rejected() {
        let app = build_router(state_with(CannedModel::unscripted()));

        let response = app
            .oneshot(post(json!({"city": "Los Angeles"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "badRequest");
        assert_eq!(body["error"]["statusCode"], 400);
    }

    #[tokio::test]
    async fn model_failure_is_bad_gateway() {
        let app = build_router(state_with(CannedModel::unscripted()));

        let response = app
            .oneshot(post(json!({"content": "We fix pipes."})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["type"], "upstreamError");
    }
}
