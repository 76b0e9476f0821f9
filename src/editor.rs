// Scene editor shell.
//
// Owns the scene for one editing session and routes every user action
// through the controller and capture coordinator. All methods run to
// completion inside a single event; nothing here blocks or awaits.

use glam::Vec3;

use crate::camera::Ray;
use crate::capture::{CaptureCoordinator, CaptureOutcome, CaptureRequest, RenderSurface, Snapshot};
use crate::controller::{SelectionController, TransformMode};
use crate::frame::{self, DrawItem};
use crate::math::Transform;
use crate::scene::{ObjectId, ObjectPatch, PrimitiveKind, Role, Scene, SceneObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptureRefused {
    #[error("the scene is empty; add an object before capturing")]
    EmptyScene,
}

/// Whether an empty scene may be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyScenePolicy {
    #[default]
    Reject,
    Allow,
}

impl EmptyScenePolicy {
    pub fn from_allow(allow: bool) -> Self {
        if allow {
            EmptyScenePolicy::Allow
        } else {
            EmptyScenePolicy::Reject
        }
    }
}

/// Snapshot of what the toolbar needs to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarState {
    pub mode: TransformMode,
    pub selected: Option<ObjectId>,
    pub object_count: usize,
    pub can_capture: bool,
    pub dragging: bool,
}

pub struct SceneEditor {
    scene: Scene,
    controller: SelectionController,
    capture_request: CaptureRequest,
    coordinator: CaptureCoordinator,
    policy: EmptyScenePolicy,
}

impl SceneEditor {
    pub fn new(policy: EmptyScenePolicy) -> Self {
        Self {
            scene: Scene::new(),
            controller: SelectionController::new(),
            capture_request: CaptureRequest::new(),
            coordinator: CaptureCoordinator::new(),
            policy,
        }
    }

    /// Registers where captured snapshots go.
    pub fn on_snapshot(&mut self, consumer: impl FnMut(Snapshot) + 'static) {
        self.coordinator.set_consumer(consumer);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn capture_request(&self) -> CaptureRequest {
        self.capture_request
    }

    pub fn add(&mut self, kind: PrimitiveKind) -> ObjectId {
        self.controller.cancel_gesture();
        self.scene.add(kind).id()
    }

    /// Direct programmatic update, bypassing gestures.
    pub fn update(&mut self, id: ObjectId, patch: &ObjectPatch) -> bool {
        self.scene.update(id, patch)
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        self.controller.remove(&mut self.scene, id)
    }

    pub fn delete_selected(&mut self) -> Option<ObjectId> {
        let id = self.scene.selected()?;
        self.remove(id).then_some(id)
    }

    pub fn clear(&mut self) {
        self.controller.clear(&mut self.scene);
        log::info!("Scene cleared");
    }

    pub fn select(&mut self, id: ObjectId) -> bool {
        self.controller.select(&mut self.scene, id)
    }

    pub fn select_none(&mut self) {
        self.controller.select_none(&mut self.scene);
    }

    pub fn cycle_selection(&mut self) -> Option<ObjectId> {
        let next = self.scene.next_after_selection()?;
        self.select(next).then_some(next)
    }

    pub fn pick(&mut self, ray: &Ray) -> Option<ObjectId> {
        self.controller.pick(&mut self.scene, ray)
    }

    pub fn set_mode(&mut self, mode: TransformMode) {
        self.controller.set_mode(mode);
    }

    /// Flips the selected object between additive and subtractive.
    pub fn toggle_role(&mut self) -> Option<Role> {
        let object = self.scene.selected_object()?;
        let role = match object.role {
            Role::Additive => Role::Subtractive,
            Role::Subtractive => Role::Additive,
        };
        let id = object.id();
        self.scene.update(
            id,
            &ObjectPatch {
                role: Some(role),
                ..ObjectPatch::default()
            },
        );
        Some(role)
    }

    pub fn begin_gesture(&mut self) -> bool {
        self.controller.begin_gesture(&self.scene)
    }

    pub fn drag_by(&mut self, delta: Vec3) {
        self.controller.drag_by(delta);
    }

    pub fn drag_to(&mut self, transform: Transform) {
        self.controller.drag_to(transform);
    }

    pub fn commit_gesture(&mut self) -> bool {
        self.controller.commit_gesture(&mut self.scene)
    }

    pub fn cancel_gesture(&mut self) {
        self.controller.cancel_gesture();
    }

    pub fn selected_object(&self) -> Option<&SceneObject> {
        self.scene.selected_object()
    }

    fn capture_allowed(&self) -> bool {
        !self.scene.is_empty() || self.policy == EmptyScenePolicy::Allow
    }

    /// Bumps the capture counter. The snapshot is taken on the next
    /// [`pump_capture`](Self::pump_capture).
    pub fn request_capture(&mut self) -> Result<u64, CaptureRefused> {
        if !self.capture_allowed() {
            log::warn!("Capture refused: scene is empty");
            return Err(CaptureRefused::EmptyScene);
        }
        Ok(self.capture_request.bump())
    }

    /// Lets the coordinator act on the current counter value.
    pub fn pump_capture(&mut self, surface: &mut dyn RenderSurface) -> CaptureOutcome {
        let outcome = self
            .coordinator
            .observe(self.capture_request, &self.scene, surface);
        match outcome {
            CaptureOutcome::NoImage { request } => {
                log::warn!("Capture {} produced no image; nothing to hand off", request)
            }
            CaptureOutcome::Unclaimed { request } => {
                log::warn!("Capture {} has no consumer; snapshot dropped", request)
            }
            CaptureOutcome::Idle | CaptureOutcome::Delivered { .. } => {}
        }
        outcome
    }

    /// Draw list for the interactive viewport.
    pub fn viewport_items(&self) -> Vec<DrawItem> {
        frame::viewport_items(&self.scene, &self.controller)
    }

    pub fn toolbar(&self) -> ToolbarState {
        ToolbarState {
            mode: self.controller.mode(),
            selected: self.scene.selected(),
            object_count: self.scene.len(),
            can_capture: self.capture_allowed(),
            dragging: self.controller.is_dragging(),
        }
    }
}

impl Default for SceneEditor {
    fn default() -> Self {
        Self::new(EmptyScenePolicy::default())
    }
}
