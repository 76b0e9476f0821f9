// Selection & transform controller.
//
// Holds the session-wide transform mode and the gesture state machine.
// Intermediate drag values live only in `Gesture::Dragging`; the scene is
// written exactly once, on commit.

use glam::Vec3;

use crate::camera::Ray;
use crate::math::Transform;
use crate::scene::{ObjectId, ObjectPatch, Scene};

/// Smallest scale a scale gesture can shrink an axis to.
pub const MIN_SCALE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        id: ObjectId,
        mode: TransformMode,
        /// Committed transform when the gesture began.
        origin: Transform,
        /// Visual-only transform shown while dragging.
        live: Transform,
    },
}

#[derive(Debug, Default)]
pub struct SelectionController {
    mode: TransformMode,
    gesture: Gesture,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    /// Id and live transform of the object under manipulation.
    pub fn live_transform(&self) -> Option<(ObjectId, Transform)> {
        match self.gesture {
            Gesture::Dragging { id, live, .. } => Some((id, live)),
            Gesture::Idle => None,
        }
    }

    /// Changes the mode. Legal without a selection; an open gesture is
    /// cancelled since its deltas were interpreted under the old mode.
    pub fn set_mode(&mut self, mode: TransformMode) {
        if self.mode != mode {
            self.cancel_gesture();
            log::debug!("Transform mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn select(&mut self, scene: &mut Scene, id: ObjectId) -> bool {
        if !scene.select(id) {
            return false;
        }
        if self.live_transform().is_some_and(|(dragged, _)| dragged != id) {
            self.cancel_gesture();
        }
        true
    }

    pub fn select_none(&mut self, scene: &mut Scene) {
        self.cancel_gesture();
        scene.select_none();
    }

    /// Selects what the ray hits, or clears the selection on a miss.
    pub fn pick(&mut self, scene: &mut Scene, ray: &Ray) -> Option<ObjectId> {
        match scene.pick(ray) {
            Some(id) => {
                self.select(scene, id);
                Some(id)
            }
            None => {
                self.select_none(scene);
                None
            }
        }
    }

    /// Removes an object, cancelling a gesture on it.
    pub fn remove(&mut self, scene: &mut Scene, id: ObjectId) -> bool {
        if self.live_transform().is_some_and(|(dragged, _)| dragged == id) {
            self.cancel_gesture();
        }
        scene.remove(id).is_some()
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        self.cancel_gesture();
        scene.clear();
    }

    /// Starts manipulating the selected object from its committed transform.
    pub fn begin_gesture(&mut self, scene: &Scene) -> bool {
        let Some(object) = scene.selected_object() else {
            return false;
        };
        self.gesture = Gesture::Dragging {
            id: object.id(),
            mode: self.mode,
            origin: object.transform,
            live: object.transform,
        };
        log::debug!("Gesture {:?} started on {}", self.mode, object.id());
        true
    }

    /// Accumulates a delta, interpreted by the gesture's mode.
    pub fn drag_by(&mut self, delta: Vec3) {
        if let Gesture::Dragging { mode, live, .. } = &mut self.gesture {
            match mode {
                TransformMode::Translate => live.position += delta,
                TransformMode::Rotate => live.rotation += delta,
                TransformMode::Scale => live.scale = (live.scale + delta).max(Vec3::splat(MIN_SCALE)),
            }
        }
    }

    /// Replaces the live transform with one reported by the render engine.
    pub fn drag_to(&mut self, transform: Transform) {
        if let Gesture::Dragging { live, .. } = &mut self.gesture {
            *live = transform;
        }
    }

    /// Writes the live transform back into the scene and returns to idle.
    /// Returns `false` if there was no gesture or its object is gone.
    pub fn commit_gesture(&mut self, scene: &mut Scene) -> bool {
        let Gesture::Dragging { id, live, .. } = std::mem::take(&mut self.gesture) else {
            return false;
        };
        let written = scene.update(id, &ObjectPatch::transform(live));
        if written {
            log::debug!("Committed transform of {}", id);
        }
        written
    }

    /// Drops the gesture; the scene keeps its last committed state.
    pub fn cancel_gesture(&mut self) {
        if let Gesture::Dragging { id, origin, .. } = std::mem::take(&mut self.gesture) {
            log::debug!(
                "Gesture on {} cancelled, restoring position ({:.2}, {:.2}, {:.2})",
                id,
                origin.position.x,
                origin.position.y,
                origin.position.z
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PrimitiveKind;
    use approx::assert_relative_eq;

    fn scene_with_box() -> (Scene, ObjectId) {
        let mut scene = Scene::new();
        let id = scene.add(PrimitiveKind::Box).id();
        (scene, id)
    }

    #[test]
    fn drag_is_invisible_to_scene_until_commit() {
        let (mut scene, id) = scene_with_box();
        let start = scene.get(id).unwrap().transform;
        let mut controller = SelectionController::new();

        assert!(controller.begin_gesture(&scene));
        controller.drag_by(Vec3::new(1.0, 0.0, 0.0));
        controller.drag_by(Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(scene.get(id).unwrap().transform, start);

        assert!(controller.commit_gesture(&mut scene));
        assert_relative_eq!(
            scene.get(id).unwrap().transform.position.x,
            start.position.x + 1.5,
            epsilon = 1e-5
        );
        assert!(!controller.is_dragging());
    }

    #[test]
    fn cancel_leaves_last_commit() {
        let (mut scene, id) = scene_with_box();
        let start = scene.get(id).unwrap().transform;
        let mut controller = SelectionController::new();

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::splat(3.0));
        controller.cancel_gesture();

        assert!(!controller.commit_gesture(&mut scene));
        assert_eq!(scene.get(id).unwrap().transform, start);
    }

    #[test]
    fn rotate_and_scale_modes_interpret_delta() {
        let (mut scene, id) = scene_with_box();
        let mut controller = SelectionController::new();

        controller.set_mode(TransformMode::Rotate);
        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::new(0.0, 0.25, 0.0));
        controller.commit_gesture(&mut scene);
        assert_relative_eq!(scene.get(id).unwrap().transform.rotation.y, 0.25);

        controller.set_mode(TransformMode::Scale);
        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::new(-5.0, 1.0, 0.0));
        controller.commit_gesture(&mut scene);
        let scale = scene.get(id).unwrap().transform.scale;
        assert_relative_eq!(scale.x, MIN_SCALE);
        assert_relative_eq!(scale.y, 2.0);
    }

    #[test]
    fn mode_switch_without_selection_is_harmless() {
        let mut scene = Scene::new();
        let mut controller = SelectionController::new();
        controller.set_mode(TransformMode::Scale);
        assert_eq!(controller.mode(), TransformMode::Scale);
        assert!(!controller.begin_gesture(&scene));
        controller.select_none(&mut scene);
        assert!(scene.is_empty());
    }

    #[test]
    fn mode_switch_mid_drag_cancels() {
        let (mut scene, id) = scene_with_box();
        let start = scene.get(id).unwrap().transform;
        let mut controller = SelectionController::new();

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        controller.set_mode(TransformMode::Rotate);
        assert!(!controller.is_dragging());
        assert!(!controller.commit_gesture(&mut scene));
        assert_eq!(scene.get(id).unwrap().transform, start);
    }

    #[test]
    fn removing_dragged_object_cancels_gesture() {
        let (mut scene, id) = scene_with_box();
        let mut controller = SelectionController::new();

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        assert!(controller.remove(&mut scene, id));
        assert!(!controller.is_dragging());
        assert_eq!(scene.selected(), None);
    }

    #[test]
    fn commit_after_object_vanished_is_noop() {
        let (mut scene, id) = scene_with_box();
        let other = scene.add(PrimitiveKind::Sphere).id();
        let other_before = scene.get(other).unwrap().clone();
        scene.select(id);

        let mut controller = SelectionController::new();
        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        // Removed behind the controller's back.
        scene.remove(id);

        assert!(!controller.commit_gesture(&mut scene));
        assert_eq!(scene.get(other).unwrap(), &other_before);
    }

    #[test]
    fn selecting_another_object_mid_drag_cancels() {
        let (mut scene, id) = scene_with_box();
        let other = scene.add(PrimitiveKind::Sphere).id();
        let start = scene.get(id).unwrap().transform;
        let mut controller = SelectionController::new();
        controller.select(&mut scene, id);

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        assert!(controller.select(&mut scene, other));
        assert!(!controller.is_dragging());
        assert!(!controller.commit_gesture(&mut scene));
        assert_eq!(scene.get(id).unwrap().transform, start);
        assert_eq!(scene.selected(), Some(other));
    }

    #[test]
    fn reselecting_dragged_object_keeps_gesture() {
        let (mut scene, id) = scene_with_box();
        let mut controller = SelectionController::new();

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        assert!(controller.select(&mut scene, id));
        assert!(controller.is_dragging());

        let start = scene.get(id).unwrap().transform;
        assert!(controller.commit_gesture(&mut scene));
        assert_relative_eq!(
            scene.get(id).unwrap().transform.position.x,
            start.position.x + 1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn pick_miss_clears_selection_and_cancels() {
        let (mut scene, id) = scene_with_box();
        scene.update(id, &ObjectPatch::position(Vec3::new(0.0, 0.5, 0.0)));
        let mut controller = SelectionController::new();

        controller.begin_gesture(&scene);
        controller.drag_by(Vec3::X);
        let miss = Ray {
            origin: Vec3::new(50.0, 0.5, 0.0),
            direction: Vec3::Z,
        };
        assert_eq!(controller.pick(&mut scene, &miss), None);
        assert_eq!(scene.selected(), None);
        assert!(!controller.is_dragging());
        assert_eq!(scene.get(id).unwrap().transform.position, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn drag_to_uses_engine_transform() {
        let (mut scene, id) = scene_with_box();
        let mut controller = SelectionController::new();
        let target = Transform::at(Vec3::new(1.0, 0.5, -1.0));

        controller.begin_gesture(&scene);
        controller.drag_to(target);
        assert_eq!(controller.live_transform(), Some((id, target)));
        controller.commit_gesture(&mut scene);
        assert_eq!(scene.get(id).unwrap().transform, target);
    }
}
