use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::models::{
    AnalyzeResponse, ChatHistoryResponse, ChatRequest, ChatResponse, FoodLogResponse,
};
use crate::parser::ResponseParser;
use crate::services::{FoodLogService, GenerativeModel};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ANALYSIS_PROMPT: &str = "\
You are an expert nutritionist. Analyze the food items in the uploaded image and provide:\n\
1. A list of identified food items with their estimated calories and macronutrients (carbs, proteins, fats) in the format:\n\
   - Item: [Name] - Calories: [X kcal], Carbs: [X g], Proteins: [X g], Fats: [X g]\n\
2. Total calories and macronutrient breakdown for the meal.\n\
3. A brief assessment of the meal's healthiness and suggestions for improvement.";

pub struct AppState {
    pub model: Arc<dyn GenerativeModel>,
    pub log: Arc<FoodLogService>,
    pub parser: ResponseParser,
}

/// Error shape at the HTTP edge: status code plus a JSON `detail` body.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(origins)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true);

    Router::new()
        .route("/analyze-food", post(analyze_food))
        .route("/chat", post(chat))
        .route("/food-log", get(get_food_log))
        .route("/chat-history", get(get_chat_history))
        .route("/health", get(health_check))
        // Multipart uploads carry up to 5 MB of image plus encoding overhead
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

async fn analyze_food(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_string).unwrap_or_default();
            let filename = field.file_name().map(str::to_string).unwrap_or_default();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
            upload = Some((content_type, filename, data));
            break;
        }
    }

    let (content_type, filename, data) =
        upload.ok_or_else(|| ApiError::bad_request("Missing 'file' field in upload"))?;

    if !content_type.starts_with("image/") {
        log::warn!("⚠️ Invalid file type: {}", content_type);
        return Err(ApiError::bad_request(
            "Invalid file type. Please upload an image (jpg, jpeg, png).",
        ));
    }

    if data.len() > MAX_IMAGE_BYTES {
        log::warn!("⚠️ File too large: {} bytes", data.len());
        return Err(ApiError::bad_request("Image size exceeds 5MB limit."));
    }

    log::info!("📸 Processing image: {} ({} bytes)", filename, data.len());

    let analysis = state
        .model
        .analyze_image(&content_type, &data, ANALYSIS_PROMPT)
        .await
        .map_err(|e| {
            log::error!("❌ Error in analyze-food: {}", e);
            ApiError::internal(format!("Error processing image: {}", e))
        })?;

    let food_items = state.parser.parse(&analysis);
    log::info!("✅ Food analysis successful: {} item(s)", food_items.len());

    let summary = state.log.append_and_summarize(food_items.clone());
    let (food_log, _) = state.log.get_log();

    Ok(Json(AnalyzeResponse {
        analysis,
        food_items,
        food_log,
        summary,
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        log::warn!("⚠️ Empty chat message received");
        return Err(ApiError::bad_request("Message cannot be empty"));
    }

    let (food_log, _) = state.log.get_log();
    let log_context = food_log
        .iter()
        .map(|item| {
            format!(
                "{{name: {}, timestamp: {}, calories: {}, carbs: {}, proteins: {}, fats: {}}}",
                item.name,
                item.timestamp.format("%Y-%m-%d %H:%M:%S"),
                item.calories.unwrap_or(0.0),
                item.carbs.unwrap_or(0.0),
                item.proteins.unwrap_or(0.0),
                item.fats.unwrap_or(0.0),
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "You are an expert nutritionist. Provide accurate and helpful nutritional advice \
         based on the following user input: {}. If relevant, refer to the user's food log: [{}]",
        request.message, log_context
    );
    log::info!(
        "💬 Sending chat prompt to model: {}...",
        &prompt[..prompt.len().min(100)]
    );

    let reply = state.model.generate_text(&prompt).await.map_err(|e| {
        log::error!("❌ Error in chat endpoint: {}", e);
        ApiError::internal(format!("Error in chat response: {}", e))
    })?;

    state.log.record_chat(&request.message, &reply);
    log::info!("✅ Chat response successful");

    Ok(Json(ChatResponse { response: reply }))
}

async fn get_food_log(State(state): State<Arc<AppState>>) -> Json<FoodLogResponse> {
    let (food_log, summary) = state.log.get_log();
    log::info!("📋 Food log retrieved: {} item(s)", food_log.len());
    Json(FoodLogResponse { food_log, summary })
}

async fn get_chat_history(State(state): State<Arc<AppState>>) -> Json<ChatHistoryResponse> {
    let chat_history = state.log.get_chat_history();
    log::info!("📋 Chat history retrieved: {} turn(s)", chat_history.len());
    Json(ChatHistoryResponse { chat_history })
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct StubModel {
        reply: &'static str,
    }

    #[async_trait::async_trait]
    impl GenerativeModel for StubModel {
        async fn analyze_image(&self, _: &str, _: &[u8], _: &str) -> Result<String> {
            Ok(self.reply.to_string())
        }

        async fn generate_text(&self, _: &str) -> Result<String> {
            Ok(self.reply.to_string())
        }
    }

    fn test_app(reply: &'static str) -> Router {
        let state = Arc::new(AppState {
            model: Arc::new(StubModel { reply }),
            log: Arc::new(FoodLogService::new()),
            parser: ResponseParser::new(),
        });
        create_router(state, &["http://localhost:5173".to_string()])
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_image_request(content_type: &str) -> Request<Body> {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"meal.jpg\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             fake image bytes\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/analyze-food")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app("unused");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_food_parses_and_accumulates() {
        let app = test_app(
            "- Item: Apple - Calories: 95 kcal, Carbs: 25 g, Proteins: 0.5 g, Fats: 0.3 g\n\
             - Item: Banana - Calories: 105 kcal, Carbs: 27 g, Proteins: 1.3 g, Fats: 0.4 g",
        );

        let response = app
            .clone()
            .oneshot(multipart_image_request("image/jpeg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["food_items"].as_array().unwrap().len(), 2);
        assert_eq!(json["food_items"][0]["name"], "Apple");
        assert_eq!(json["food_items"][1]["name"], "Banana");
        assert_eq!(json["summary"]["total_calories"], 200.0);
        assert_eq!(json["summary"]["total_carbs"], 52.0);

        // The log endpoint reflects the same state
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/food-log")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["food_log"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_food_rejects_non_image() {
        let app = test_app("unused");

        let response = app
            .oneshot(multipart_image_request("application/pdf"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("Invalid file type"));
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let app = test_app("unused");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "Message cannot be empty");
    }

    #[tokio::test]
    async fn test_chat_records_history() {
        let app = test_app("Eat more vegetables.");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message": "How is my diet?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "Eat more vegetables.");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chat-history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let history = json["chat_history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["user"], "How is my diet?");
        assert_eq!(history[0]["bot"], "Eat more vegetables.");
    }

    #[tokio::test]
    async fn test_food_log_starts_empty() {
        let app = test_app("unused");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/food-log")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["food_log"].as_array().unwrap().len(), 0);
        assert_eq!(json["summary"]["total_calories"], 0.0);
        assert_eq!(json["summary"]["total_fats"], 0.0);
    }
}
