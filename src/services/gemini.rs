use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Trait for generative model backends (Gemini today), so handlers can be
/// exercised against a stub in tests.
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn analyze_image(&self, mime_type: &str, image: &[u8], prompt: &str) -> Result<String>;
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    fallback_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, fallback_model: String) -> Self {
        Self {
            api_key,
            model,
            fallback_model,
            client: reqwest::Client::new(),
        }
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );

        log::info!("🤖 Sending request to Gemini with model: {}", model);
        log::debug!(
            "📤 Request payload size: {} bytes",
            serde_json::to_string(request)?.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Gemini API error response: {}", error_text);
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let generate_response: GenerateResponse = response.json().await?;

        let text = generate_response
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!("Empty response from Gemini API");
        }

        log::debug!("✅ Gemini reply size: {} chars", text.len());
        Ok(text)
    }

    /// Tries the primary model once, then the configured fallback model.
    async fn generate_with_fallback(&self, request: &GenerateRequest) -> Result<String> {
        match self.generate(&self.model, request).await {
            Ok(text) => Ok(text),
            Err(e) => {
                log::warn!(
                    "⚠️ Primary model {} failed: {}. Falling back to {}",
                    self.model,
                    e,
                    self.fallback_model
                );
                self.generate(&self.fallback_model, request).await
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerativeModel for GeminiClient {
    async fn analyze_image(&self, mime_type: &str, image: &[u8], prompt: &str) -> Result<String> {
        log::debug!("📸 Encoding {} byte image ({})", image.len(), mime_type);
        let base64_image = general_purpose::STANDARD.encode(image);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64_image,
                        },
                    },
                ],
            }],
        };

        self.generate_with_fallback(&request).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
        };

        self.generate_with_fallback(&request).await
    }
}
