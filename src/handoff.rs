// Hands captured snapshots to the generation backend.
//
// The editor thread only builds a `GenerationRequest` and sends it over a
// channel; the network round trip runs on a tokio task.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::capture::Snapshot;
use crate::config::GenerationConfig;
use crate::generation::{EncodedImage, GenerationBackend, GenerationRequest};

/// Everything besides the snapshot that goes into a backend request.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub instruction: String,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    pub site_context: Option<EncodedImage>,
    pub references: Vec<EncodedImage>,
    pub materials: Vec<EncodedImage>,
    pub additional_bases: Vec<EncodedImage>,
}

impl GenerationContext {
    /// Loads the configured auxiliary images. Unreadable files are skipped
    /// with a warning.
    pub fn from_config(config: &GenerationConfig) -> Self {
        if config.material_images.len() > 2 {
            log::warn!(
                "{} material images configured, only the first two are used",
                config.material_images.len()
            );
        }
        Self {
            instruction: config.instruction.clone(),
            aspect_ratio: config.aspect_ratio.clone(),
            image_size: config.image_size.clone(),
            site_context: config.site_image.as_deref().and_then(load_image),
            references: config.reference_images.iter().filter_map(|p| load_image(p)).collect(),
            materials: config
                .material_images
                .iter()
                .take(2)
                .filter_map(|p| load_image(p))
                .collect(),
            additional_bases: config
                .additional_base_images
                .iter()
                .filter_map(|p| load_image(p))
                .collect(),
        }
    }

    /// The snapshot becomes the primary input.
    pub fn request_for(&self, snapshot: Snapshot) -> GenerationRequest {
        let mut materials = self.materials.iter().cloned();
        let mut request = GenerationRequest::new(self.instruction.clone(), EncodedImage::png(snapshot.png))
            .with_aspect_ratio_token(self.aspect_ratio.as_deref())
            .with_image_size(self.image_size.clone());
        request.additional_bases = self.additional_bases.clone();
        request.site_context = self.site_context.clone();
        request.references = self.references.clone();
        request.material_primary = materials.next();
        request.material_secondary = materials.next();
        request
    }
}

fn load_image(path: &Path) -> Option<EncodedImage> {
    match EncodedImage::from_path(path) {
        Ok(image) => Some(image),
        Err(err) => {
            log::warn!("Skipping auxiliary image {}: {}", path.display(), err);
            None
        }
    }
}

/// Spawns the task that sends each request to `backend` once and writes
/// successful results to `output_dir`.
pub fn spawn_worker<B>(
    backend: B,
    output_dir: PathBuf,
) -> (mpsc::UnboundedSender<GenerationRequest>, JoinHandle<()>)
where
    B: GenerationBackend + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<GenerationRequest>();
    let handle = tokio::spawn(async move {
        let mut rendered = 0u64;
        while let Some(request) = rx.recv().await {
            log::info!("Sending snapshot to generation backend");
            match backend.generate(&request.assemble()).await {
                Ok(image) => {
                    let path = unused_path(&output_dir, "render", rendered + 1, extension(&image));
                    rendered += 1;
                    match write_output(&path, &image.data).await {
                        Ok(()) => log::info!("Rendering saved to {}", path.display()),
                        Err(err) => log::error!("Failed to save {}: {}", path.display(), err),
                    }
                }
                Err(err) => log::error!("Generation failed: {}", err.user_message()),
            }
        }
    });
    (tx, handle)
}

/// Writes a raw snapshot as `snapshot-<request>.png` into `output_dir`,
/// moving to the next free number if that file exists.
pub fn save_snapshot(output_dir: &Path, snapshot: &Snapshot) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = unused_path(output_dir, "snapshot", snapshot.request, "png");
    std::fs::write(&path, &snapshot.png)?;
    Ok(path)
}

/// `<dir>/<stem>-<n>.<ext>` for the first `n >= start` not already on disk.
/// Counters restart each session; files from earlier sessions are kept.
fn unused_path(dir: &Path, stem: &str, start: u64, ext: &str) -> PathBuf {
    (start.max(1)..)
        .map(|n| dir.join(format!("{stem}-{n}.{ext}")))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(format!("{stem}.{ext}")))
}

fn extension(image: &EncodedImage) -> &'static str {
    match image.mime_type.as_str() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

async fn write_output(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{AspectRatio, Part};

    #[test]
    fn snapshot_is_primary_and_materials_split() {
        let context = GenerationContext {
            instruction: "timber".into(),
            aspect_ratio: Some("4:3".into()),
            materials: vec![EncodedImage::png(vec![1]), EncodedImage::png(vec![2])],
            ..GenerationContext::default()
        };
        let snapshot = Snapshot {
            request: 1,
            width: 1,
            height: 1,
            png: vec![9],
        };
        let request = context.request_for(snapshot);
        assert_eq!(request.snapshot.data, vec![9]);
        assert_eq!(request.material_primary.as_ref().unwrap().data, vec![1]);
        assert_eq!(request.material_secondary.as_ref().unwrap().data, vec![2]);
        assert_eq!(request.aspect_ratio, Some(AspectRatio::Landscape4x3));

        let parts = request.assemble().parts;
        assert_eq!(parts[0], Part::Text("timber".into()));
        assert_eq!(parts[1], Part::Image(EncodedImage::png(vec![9])));
    }

    #[test]
    fn snapshot_is_saved_under_its_request_number() {
        let dir = std::env::temp_dir().join(format!("massing-studio-{}", std::process::id()));
        let snapshot = Snapshot {
            request: 7,
            width: 1,
            height: 1,
            png: vec![1, 2, 3],
        };
        let path = save_snapshot(&dir, &snapshot).unwrap();
        assert!(path.ends_with("snapshot-7.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn existing_outputs_are_not_overwritten() {
        let dir = std::env::temp_dir().join(format!("massing-studio-keep-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("snapshot-1.png"), b"earlier").unwrap();
        std::fs::write(dir.join("snapshot-2.png"), b"earlier").unwrap();
        let snapshot = Snapshot {
            request: 1,
            width: 1,
            height: 1,
            png: vec![4],
        };

        let path = save_snapshot(&dir, &snapshot).unwrap();
        assert!(path.ends_with("snapshot-3.png"));
        assert_eq!(std::fs::read(dir.join("snapshot-1.png")).unwrap(), b"earlier");
        assert_eq!(unused_path(&dir, "render", 1, "jpg"), dir.join("render-1.jpg"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_auxiliary_files_are_skipped() {
        let config = GenerationConfig {
            reference_images: vec![PathBuf::from("/nonexistent/massing-ref.png")],
            ..GenerationConfig::default()
        };
        assert!(GenerationContext::from_config(&config).references.is_empty());
    }
}
