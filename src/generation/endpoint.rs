// Transport framing for serving generation over HTTP.
//
// Only the method check, credential check and JSON translation live here;
// the HTTP server itself is whatever the host provides.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{EncodedImage, GenerationBackend, GenerationError, GenerationRequest};

pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const SERVER_CONFIGURATION_ERROR: &str = "Server configuration error";

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: Value,
}

impl EndpointResponse {
    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    prompt: String,
    image: String,
    site_image: Option<String>,
    #[serde(default)]
    reference_images: Vec<String>,
    material_image1: Option<String>,
    material_image2: Option<String>,
    #[serde(default)]
    additional_base_images: Vec<String>,
    aspect_ratio: Option<String>,
    image_size: Option<String>,
}

impl GenerateBody {
    fn into_request(self) -> Result<GenerationRequest, GenerationError> {
        let decode_all = |values: Vec<String>| -> Result<Vec<EncodedImage>, GenerationError> {
            values.iter().map(|v| EncodedImage::from_data_url(v)).collect()
        };
        let decode_one = |value: Option<String>| -> Result<Option<EncodedImage>, GenerationError> {
            value.as_deref().map(EncodedImage::from_data_url).transpose()
        };

        let mut request = GenerationRequest::new(self.prompt, EncodedImage::from_data_url(&self.image)?)
            .with_aspect_ratio_token(self.aspect_ratio.as_deref())
            .with_image_size(self.image_size);
        request.additional_bases = decode_all(self.additional_base_images)?;
        request.site_context = decode_one(self.site_image)?;
        request.references = decode_all(self.reference_images)?;
        request.material_primary = decode_one(self.material_image1)?;
        request.material_secondary = decode_one(self.material_image2)?;
        Ok(request)
    }
}

/// `backend` is `None` when the server has no credential configured.
pub struct GenerateEndpoint<B> {
    backend: Option<B>,
}

impl<B: GenerationBackend> GenerateEndpoint<B> {
    pub fn new(backend: Option<B>) -> Self {
        Self { backend }
    }

    pub async fn handle(&self, method: &str, body: &[u8]) -> EndpointResponse {
        if !method.eq_ignore_ascii_case("POST") {
            return EndpointResponse::error(405, METHOD_NOT_ALLOWED);
        }
        let Some(backend) = &self.backend else {
            log::error!("Generation requested but no backend credential is configured");
            return EndpointResponse::error(500, SERVER_CONFIGURATION_ERROR);
        };

        let request = match serde_json::from_slice::<GenerateBody>(body)
            .map_err(|err| GenerationError::InvalidRequest(err.to_string()))
            .and_then(GenerateBody::into_request)
        {
            Ok(request) => request,
            Err(err) => {
                log::warn!("Rejected generation request: {}", err);
                return EndpointResponse::error(400, err.to_string());
            }
        };

        match backend.generate(&request.assemble()).await {
            Ok(image) => EndpointResponse {
                status: 200,
                body: json!({ "image": image.to_data_url() }),
            },
            Err(GenerationError::MissingCredential) => {
                EndpointResponse::error(500, SERVER_CONFIGURATION_ERROR)
            }
            Err(err) => {
                log::error!("Generation failed: {}", err);
                EndpointResponse::error(500, err.user_message())
            }
        }
    }
}
