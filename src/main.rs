mod handlers;
mod models;
mod parser;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;

use handlers::{create_router, AppState};
use parser::ResponseParser;
use services::{FoodLogService, GeminiClient, GenerativeModel};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting NutriVision backend...");

    // Load configuration
    let api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set in .env file");

    let model_name =
        env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
    let fallback_model =
        env::var("GEMINI_FALLBACK_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    // Comma-separated list of frontend origins allowed by CORS
    let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    let gemini = Arc::new(GeminiClient::new(
        api_key,
        model_name.clone(),
        fallback_model.clone(),
    ));
    log::info!(
        "✅ Gemini client initialized with model: {} (fallback: {})",
        model_name,
        fallback_model
    );

    let food_log = Arc::new(FoodLogService::new());
    log::info!("✅ In-memory food log initialized");

    let state = Arc::new(AppState {
        model: gemini as Arc<dyn GenerativeModel>,
        log: food_log,
        parser: ResponseParser::new(),
    });

    let app = create_router(state, &allowed_origins);

    log::info!("🌐 Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
