// Generation request assembly.
//
// A captured snapshot plus optional auxiliary images become one ordered
// list of `Part`s for the image backend. Part order conditions the
// backend's prompt and must not change:
// instruction, snapshot, additional bases, site context, references,
// material 1, material 2.

use std::future::Future;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub mod endpoint;
pub mod gemini;

pub const GENERIC_FAILURE: &str = "Failed to generate image";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("backend credential is not configured")]
    MissingCredential,

    #[error("backend call failed: {0}")]
    Backend(String),

    #[error("backend response contained no image data")]
    EmptyResponse,

    #[error("invalid image payload: {0}")]
    InvalidImage(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Single user-facing message: the backend's own text when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Backend(message) if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Supported aspect-ratio tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Portrait2x3,
    Landscape3x2,
    Portrait3x4,
    Landscape4x3,
    Portrait4x5,
    Landscape5x4,
    Portrait9x16,
    Landscape16x9,
    Ultrawide21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Ultrawide21x9,
    ];

    /// Parses a token such as `"16:9"`. Anything else is `None`, never an error.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|ratio| ratio.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Ultrawide21x9 => "21:9",
        }
    }
}

/// An encoded raster image with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Accepts either a `data:<mime>;base64,<payload>` URL or bare base64
    /// (treated as PNG).
    pub fn from_data_url(value: &str) -> Result<Self, GenerationError> {
        let (mime_type, payload) = match value.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| GenerationError::InvalidImage("missing data URL payload".into()))?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    GenerationError::InvalidImage("data URL is not base64 encoded".into())
                })?;
                (mime.to_string(), payload)
            }
            None => ("image/png".to_string(), value),
        };
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|err| GenerationError::InvalidImage(err.to_string()))?;
        Ok(Self { mime_type, data })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Everything the backend may be given for one rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub instruction: String,
    pub snapshot: EncodedImage,
    pub additional_bases: Vec<EncodedImage>,
    pub site_context: Option<EncodedImage>,
    pub references: Vec<EncodedImage>,
    pub material_primary: Option<EncodedImage>,
    pub material_secondary: Option<EncodedImage>,
    pub aspect_ratio: Option<AspectRatio>,
    pub image_size: Option<String>,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, snapshot: EncodedImage) -> Self {
        Self {
            instruction: instruction.into(),
            snapshot,
            additional_bases: Vec::new(),
            site_context: None,
            references: Vec::new(),
            material_primary: None,
            material_secondary: None,
            aspect_ratio: None,
            image_size: None,
        }
    }

    /// Sets the aspect ratio from a token; unknown tokens leave it unspecified.
    pub fn with_aspect_ratio_token(mut self, token: Option<&str>) -> Self {
        self.aspect_ratio = token.and_then(|token| {
            let parsed = AspectRatio::parse(token);
            if parsed.is_none() {
                log::debug!("Unrecognised aspect ratio {:?}, leaving it unspecified", token);
            }
            parsed
        });
        self
    }

    pub fn with_image_size(mut self, size: Option<String>) -> Self {
        self.image_size = size;
        self
    }

    pub fn assemble(self) -> AssembledRequest {
        let mut parts = Vec::with_capacity(4 + self.additional_bases.len() + self.references.len());
        parts.push(Part::Text(self.instruction));
        parts.push(Part::Image(self.snapshot));
        parts.extend(self.additional_bases.into_iter().map(Part::Image));
        parts.extend(self.site_context.map(Part::Image));
        parts.extend(self.references.into_iter().map(Part::Image));
        parts.extend(self.material_primary.map(Part::Image));
        parts.extend(self.material_secondary.map(Part::Image));
        AssembledRequest {
            parts,
            aspect_ratio: self.aspect_ratio,
            image_size: self.image_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(EncodedImage),
}

/// The ordered backend payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRequest {
    pub parts: Vec<Part>,
    pub aspect_ratio: Option<AspectRatio>,
    pub image_size: Option<String>,
}

/// The external image generation service.
pub trait GenerationBackend {
    /// One call, one image. Retrying is left to the caller.
    fn generate(
        &self,
        request: &AssembledRequest,
    ) -> impl Future<Output = Result<EncodedImage, GenerationError>> + Send;
}
