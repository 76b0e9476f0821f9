// HTTP client for a Gemini-style `generateContent` image endpoint.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{AssembledRequest, EncodedImage, GenerationBackend, GenerationError, Part};
use crate::config::GenerationConfig;

pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// `None` when the configured credential variable is unset or empty.
    pub fn from_config(config: &GenerationConfig) -> Option<Self> {
        let api_key = config.api_key()?;
        Some(Self::new(config.endpoint.clone(), config.model.clone(), api_key))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl GenerationBackend for GeminiBackend {
    async fn generate(&self, request: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingCredential);
        }
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|err| GenerationError::Backend(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::Backend(err.to_string()))?;
        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| status.to_string());
            return Err(GenerationError::Backend(message));
        }
        extract_image(&body)
    }
}

/// Wire body; parts keep the assembled order.
pub fn request_body(request: &AssembledRequest) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::Image(image) => json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() }
            }),
        })
        .collect();

    let mut image_config = serde_json::Map::new();
    if let Some(ratio) = request.aspect_ratio {
        image_config.insert("aspectRatio".into(), Value::from(ratio.as_str()));
    }
    if let Some(size) = &request.image_size {
        image_config.insert("imageSize".into(), Value::from(size.as_str()));
    }

    let mut generation_config = json!({ "responseModalities": ["IMAGE"] });
    if !image_config.is_empty() {
        generation_config["imageConfig"] = Value::Object(image_config);
    }

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": generation_config,
    })
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

/// First inline image with a non-empty payload in any candidate part.
pub fn extract_image(body: &str) -> Result<EncodedImage, GenerationError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|err| GenerationError::Backend(err.to_string()))?;
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)?;

    let mut image = EncodedImage::from_data_url(&inline.data)?;
    if let Some(mime_type) = inline.mime_type {
        image.mime_type = mime_type;
    }
    Ok(image)
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
