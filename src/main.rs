// Massing Studio: interactive massing viewport with generative rendering

use std::path::PathBuf;

use anyhow::Context;
use winit::event_loop::EventLoop;

use massing_studio::generation::gemini::GeminiBackend;
use massing_studio::handoff::{self, GenerationContext};
use massing_studio::renderer::Renderer;
use massing_studio::viewport::Viewport;
use massing_studio::{EmptyScenePolicy, SceneEditor, StudioConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = StudioConfig::load(config_path.as_deref()).context("loading configuration")?;

    let event_loop = EventLoop::new().context("creating event loop")?;
    let renderer = Renderer::new(&event_loop, &config.window)
        .await
        .context("initialising renderer")?;

    let mut editor = SceneEditor::new(EmptyScenePolicy::from_allow(config.capture.allow_empty_scene));
    let output_dir = config.capture.output_dir.clone();
    match GeminiBackend::from_config(&config.generation) {
        Some(backend) => {
            let context = GenerationContext::from_config(&config.generation);
            let (requests, _worker) = handoff::spawn_worker(backend, output_dir);
            editor.on_snapshot(move |snapshot| {
                if requests.send(context.request_for(snapshot)).is_err() {
                    log::error!("Generation worker has stopped; snapshot discarded");
                }
            });
        }
        None => {
            log::warn!(
                "{} is not set; captures are saved but not sent for generation",
                config.generation.api_key_env
            );
            editor.on_snapshot(move |snapshot| {
                log::error!("Failed to generate image: backend credential is not configured");
                match handoff::save_snapshot(&output_dir, &snapshot) {
                    Ok(path) => log::info!("Snapshot saved to {}", path.display()),
                    Err(err) => log::error!("Failed to save snapshot: {}", err),
                }
            });
        }
    }

    Viewport::new(renderer, editor, config.window.title.clone())
        .run(event_loop)
        .context("running event loop")?;
    Ok(())
}
