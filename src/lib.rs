// Massing Studio: compose a rough 3D massing study from primitive volumes,
// capture it, and hand the snapshot to an image generation backend.

pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod editor;
pub mod frame;
pub mod generation;
pub mod handoff;
pub mod math;
pub mod mesh;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod viewport;

pub use capture::{CaptureCoordinator, CaptureOutcome, CaptureRequest, RenderSurface, Snapshot};
pub use config::StudioConfig;
pub use controller::{Gesture, SelectionController, TransformMode};
pub use editor::{CaptureRefused, EmptyScenePolicy, SceneEditor, ToolbarState};
pub use math::Transform;
pub use raster::SoftwareSurface;
pub use scene::{Color, ObjectId, ObjectPatch, PrimitiveKind, Role, Scene, SceneObject};
