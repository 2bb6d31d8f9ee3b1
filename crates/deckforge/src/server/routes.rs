//! Request routing, independent of the HTTP transport.

use super::state::AppState;
use deckforge_core::GenerateRequest;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Template used when a request does not name one.
const DEFAULT_TEMPLATE: u32 = 1;

/// Response payload before it is put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    /// A presentation file sent as an attachment
    File { path: PathBuf, filename: String },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: Body::Json(value),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    fn file(path: PathBuf, filename: String) -> Self {
        Self {
            status: 200,
            body: Body::File { path, filename },
        }
    }
}

/// Dispatch one request.
///
/// `target` may carry a query string; it is ignored.
pub async fn route(state: &AppState, method: &str, target: &str, body: &[u8]) -> ApiResponse {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    if method == "OPTIONS" && path.starts_with("/api/") {
        return ApiResponse {
            status: 204,
            body: Body::Empty,
        };
    }

    match (method, path) {
        ("GET", "/api/health") => ApiResponse::json(200, json!({ "status": "API is running!" })),
        ("GET", "/api/templates") => templates(state),
        ("GET", "/api/result") => result(state).await,
        ("GET", "/api/download") => download_latest(state).await,
        ("POST", "/api/generate") => generate(state, body).await,
        ("GET", p) if p.starts_with("/api/download/") => {
            download_by_id(state, &p["/api/download/".len()..])
        }
        (_, "/api/health" | "/api/templates" | "/api/result" | "/api/download" | "/api/generate") => {
            ApiResponse::error(405, "Method not allowed")
        }
        (_, p) if p.starts_with("/api/download/") => ApiResponse::error(405, "Method not allowed"),
        _ => ApiResponse::error(404, "Not found"),
    }
}

fn templates(state: &AppState) -> ApiResponse {
    let entries: Vec<Value> = state
        .generator
        .config()
        .templates
        .entries
        .iter()
        .map(|entry| json!({ "id": entry.id, "name": entry.display_name() }))
        .collect();
    ApiResponse::json(200, Value::Array(entries))
}

async fn result(state: &AppState) -> ApiResponse {
    match state.last_artifact().await {
        Some(artifact) => ApiResponse::json(
            200,
            json!({ "presentation_id": artifact.id, "filename": artifact.filename }),
        ),
        None => ApiResponse::error(404, "No presentation has been generated yet"),
    }
}

async fn download_latest(state: &AppState) -> ApiResponse {
    match state.last_artifact().await {
        Some(artifact) if artifact.path.is_file() => {
            ApiResponse::file(artifact.path, artifact.filename)
        }
        _ => ApiResponse::error(404, "Presentation file not found"),
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn download_by_id(state: &AppState, id: &str) -> ApiResponse {
    if !is_valid_id(id) {
        return ApiResponse::error(404, "Presentation not found");
    }
    let filename = format!("{id}.pptx");
    let path = state.generator.config().output_dir().join(&filename);
    if path.is_file() {
        ApiResponse::file(path, filename)
    } else {
        ApiResponse::error(404, "Presentation not found")
    }
}

/// Reasons a generate body is rejected with 400.
#[derive(Debug, PartialEq, Eq)]
enum BadRequest {
    Topic,
    Template,
}

impl BadRequest {
    fn response(&self) -> ApiResponse {
        match self {
            Self::Topic => ApiResponse::error(400, "Topic is required"),
            Self::Template => ApiResponse::error(400, "Invalid template"),
        }
    }
}

fn parse_template(value: Option<&Value>) -> Result<u32, BadRequest> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_TEMPLATE),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(BadRequest::Template),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| BadRequest::Template),
        Some(_) => Err(BadRequest::Template),
    }
}

fn parse_generate(body: &[u8]) -> Result<GenerateRequest, BadRequest> {
    let value: Value = serde_json::from_slice(body).map_err(|_| BadRequest::Topic)?;
    let topic = value
        .get("topic")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(BadRequest::Topic)?;
    let template = parse_template(value.get("template"))?;
    let include_code = value
        .get("includeCode")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(GenerateRequest {
        topic: topic.to_string(),
        template: Some(template),
        include_code,
    })
}

async fn generate(state: &AppState, body: &[u8]) -> ApiResponse {
    let request = match parse_generate(body) {
        Ok(request) => request,
        Err(reason) => return reason.response(),
    };

    match state.generator.generate(&request).await {
        Ok(outcome) => {
            let artifact = outcome.artifact;
            let response = json!({
                "message": "Presentation created successfully!",
                "presentation_id": artifact.id,
                "filename": artifact.filename,
                "download_url": format!("/api/download/{}", artifact.id),
            });
            state.set_last_artifact(artifact).await;
            ApiResponse::json(200, response)
        }
        Err(e) => {
            tracing::error!("Error generating presentation for '{}': {e}", request.topic);
            ApiResponse::json(
                500,
                json!({ "error": "Failed to generate presentation", "details": e.to_string() }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deckforge_core::error::PipelineResult;
    use deckforge_core::{
        Config, DeckGenerator, LlmProvider, LlmRequest, LlmResponse, PhotoCandidate, PhotoSource,
        PipelineError,
    };
    use std::path::Path;
    use std::time::Duration;

    struct ScriptedLlm;

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
            let text = if request.prompt.starts_with("Write detailed") {
                "<<<TOPIC>>>Volcanoes<<<TOPIC>>><<<SUMMARY_START>>>\n\
                 [Summary Sentence 1: Magma rises.]\n<<<SUMMARY_END>>>"
            } else {
                "Title: Volcanoes\n---\nSlide 1: Magma\n- It rises\nImage Suggestion: lava\n---\n"
            };
            Ok(LlmResponse {
                text: text.to_string(),
                model: "scripted".to_string(),
                tokens_used: None,
                latency_ms: 0,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    struct NoPhotos;

    #[async_trait]
    impl PhotoSource for NoPhotos {
        fn name(&self) -> &str {
            "none"
        }

        fn is_available(&self) -> bool {
            false
        }

        async fn search(&self, _query: &str, _per_page: usize) -> PipelineResult<Vec<PhotoCandidate>> {
            Ok(Vec::new())
        }

        async fn download(&self, url: &str, _dest: &Path) -> PipelineResult<()> {
            Err(PipelineError::Download {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn state(root: &Path) -> AppState {
        let mut config = Config::default();
        config.general.output_dir = root.join("presentations");
        config.general.image_dir = root.join("images");
        config.templates.dir = root.join("template");
        AppState::new(DeckGenerator::with_components(
            config,
            Box::new(ScriptedLlm),
            Box::new(NoPhotos),
        ))
    }

    fn json_body(response: &ApiResponse) -> &Value {
        match &response.body {
            Body::Json(value) => value,
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = route(&state(dir.path()), "GET", "/api/health", b"").await;
        assert_eq!(response.status, 200);
        assert_eq!(json_body(&response)["status"], "API is running!");
    }

    #[tokio::test]
    async fn test_templates_listing() {
        let dir = tempfile::tempdir().unwrap();
        let response = route(&state(dir.path()), "GET", "/api/templates", b"").await;
        let list = json_body(&response).as_array().unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0]["id"], 1);
        assert_eq!(list[0]["name"], "Minimalistic");
    }

    #[tokio::test]
    async fn test_generate_then_result_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let before = route(&state, "GET", "/api/result", b"").await;
        assert_eq!(before.status, 404);
        assert_eq!(json_body(&before)["error"], "No presentation has been generated yet");

        let response = route(
            &state,
            "POST",
            "/api/generate",
            br#"{"topic": "Volcanoes", "template": "2", "includeCode": false}"#,
        )
        .await;
        assert_eq!(response.status, 200);
        let body = json_body(&response).clone();
        assert_eq!(body["message"], "Presentation created successfully!");
        let id = body["presentation_id"].as_str().unwrap().to_string();
        assert_eq!(body["filename"], format!("{id}.pptx"));
        assert_eq!(body["download_url"], format!("/api/download/{id}"));

        let result = route(&state, "GET", "/api/result", b"").await;
        assert_eq!(json_body(&result)["presentation_id"], id.as_str());

        let latest = route(&state, "GET", "/api/download", b"").await;
        match latest.body {
            Body::File { path, filename } => {
                assert!(path.is_file());
                assert_eq!(filename, format!("{id}.pptx"));
            }
            other => panic!("expected file, got {other:?}"),
        }

        let by_id = route(&state, "GET", &format!("/api/download/{id}?x=1"), b"").await;
        assert!(matches!(by_id.body, Body::File { .. }));
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let bodies: [&[u8]; 4] = [
            b"not json",
            br#"{}"#,
            br#"{"topic": "   "}"#,
            br#"{"topic": 3}"#,
        ];
        for body in bodies {
            let response = route(&state, "POST", "/api/generate", body).await;
            assert_eq!(response.status, 400);
            assert_eq!(json_body(&response)["error"], "Topic is required");
        }

        let response = route(
            &state,
            "POST",
            "/api/generate",
            br#"{"topic": "x", "template": "fancy"}"#,
        )
        .await;
        assert_eq!(response.status, 400);
        assert_eq!(json_body(&response)["error"], "Invalid template");
    }

    #[test]
    fn test_parse_template() {
        assert_eq!(parse_template(None), Ok(DEFAULT_TEMPLATE));
        assert_eq!(parse_template(Some(&json!(3))), Ok(3));
        assert_eq!(parse_template(Some(&json!(" 4 "))), Ok(4));
        assert_eq!(parse_template(Some(&json!(-1))), Err(BadRequest::Template));
        assert_eq!(parse_template(Some(&json!(1.5))), Err(BadRequest::Template));
        assert_eq!(parse_template(Some(&json!([1]))), Err(BadRequest::Template));
    }

    #[tokio::test]
    async fn test_download_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let latest = route(&state, "GET", "/api/download", b"").await;
        assert_eq!(latest.status, 404);
        assert_eq!(json_body(&latest)["error"], "Presentation file not found");

        for target in ["/api/download/presentation_0000", "/api/download/..%2Fsecret", "/api/download/a.b"] {
            let response = route(&state, "GET", target, b"").await;
            assert_eq!(response.status, 404);
            assert_eq!(json_body(&response)["error"], "Presentation not found");
        }
    }

    #[tokio::test]
    async fn test_preflight_method_and_unknown_path() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let preflight = route(&state, "OPTIONS", "/api/generate", b"").await;
        assert_eq!(preflight.status, 204);
        assert_eq!(preflight.body, Body::Empty);

        assert_eq!(route(&state, "GET", "/api/generate", b"").await.status, 405);
        assert_eq!(route(&state, "DELETE", "/api/health", b"").await.status, 405);
        assert_eq!(route(&state, "GET", "/nowhere", b"").await.status, 404);
    }
}
