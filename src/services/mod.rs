pub mod food_log;
pub mod gemini; // Google Gemini generative API client

pub use food_log::FoodLogService;
pub use gemini::{GeminiClient, GenerativeModel};
