use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;

/// One image as sent to the classification service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// Everything a single classification call carries
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub instruction: String,
    /// Images in submission order; folder indices refer to positions here
    pub images: Vec<EncodedImage>,
    /// JSON schema the structured response must follow
    pub response_schema: Value,
}

/// Error type for classification calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("The model returned no content")]
    EmptyResponse,
}

/// A service that groups images according to an instruction and a schema.
///
/// Returns the structured payload as text; decoding and validation happen
/// in the organizer so they can be tested without a live call.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String, ServiceError>;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = super::http_client::client_with_timeout(config.timeout)
            .map_err(|e| ServiceError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ClassificationService for GeminiClient {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String, ServiceError> {
        let body = GenerateContentRequest::from_request(request);

        tracing::debug!(
            model = %self.model,
            images = request.images.len(),
            "Sending classification request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        api_response.into_text().ok_or(ServiceError::EmptyResponse)
    }
}

/// Pull the message out of a Gemini error envelope, falling back to the raw body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body.trim().to_string(),
    }
}

// API request/response types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a ClassificationRequest) -> Self {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(Part::Text {
            text: &request.instruction,
        });
        parts.extend(request.images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        }));

        Self {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn sample_request() -> ClassificationRequest {
        ClassificationRequest {
            instruction: "group these".to_string(),
            images: vec![
                EncodedImage {
                    mime_type: "image/jpeg".to_string(),
                    data: "AAAA".to_string(),
                },
                EncodedImage {
                    mime_type: "image/png".to_string(),
                    data: "BBBB".to_string(),
                },
            ],
            response_schema: json!({ "type": "ARRAY" }),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = sample_request();
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "group these" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
                    ]
                }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": { "type": "ARRAY" }
                }
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[{\"folderName\":" }, { "text": "\"A\"}]" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();

        assert_eq!(response.into_text().unwrap(), r#"[{"folderName":"A"}]"#);
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert!(response.into_text().is_none());

        let blank: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        }))
        .unwrap();
        assert!(blank.into_text().is_none());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid");
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_endpoint_uses_model_and_base_url() {
        let config = AppConfig {
            api_key: "real-key-123".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            timeout: Duration::from_secs(5),
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
