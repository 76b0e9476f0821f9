// Studio configuration, loaded from TOML with every field defaulted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "massing-studio.toml";
pub const CONFIG_ENV: &str = "MASSING_STUDIO_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub window: WindowConfig,
    pub capture: CaptureConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Massing Studio".to_string(),
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Whether an empty scene may be captured and sent to the backend.
    pub allow_empty_scene: bool,
    pub output_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            allow_empty_scene: false,
            output_dir: PathBuf::from("renders"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable that holds the backend credential.
    pub api_key_env: String,
    pub instruction: String,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    pub site_image: Option<PathBuf>,
    pub reference_images: Vec<PathBuf>,
    pub material_images: Vec<PathBuf>,
    pub additional_base_images: Vec<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            instruction: "Render this massing study as a photorealistic architectural image."
                .to_string(),
            aspect_ratio: None,
            image_size: None,
            site_image: None,
            reference_images: Vec::new(),
            material_images: Vec::new(),
            additional_base_images: Vec::new(),
        }
    }
}

impl GenerationConfig {
    /// Credential from the environment; unset and empty are both `None`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl StudioConfig {
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source, path)
    }

    /// Explicit path, then `MASSING_STUDIO_CONFIG`, then `massing-studio.toml`
    /// in the working directory, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Self::from_file(fallback);
        }
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }
}
