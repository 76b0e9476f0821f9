// Draw lists shared by the GPU renderer and the software surface.

use glam::Mat4;

use crate::controller::SelectionController;
use crate::scene::{PrimitiveKind, Role, Scene, SceneObject};

/// Opacity of subtractive objects.
pub const SUBTRACTIVE_ALPHA: f32 = 0.35;
/// Color boost applied to the selected object in the viewport.
pub const SELECTION_TINT: f32 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub kind: PrimitiveKind,
    pub model: Mat4,
    /// Linear RGBA.
    pub color: [f32; 4],
}

impl DrawItem {
    fn from_object(object: &SceneObject, model: Mat4, tint: f32) -> Self {
        let alpha = match object.role {
            Role::Additive => 1.0,
            Role::Subtractive => SUBTRACTIVE_ALPHA,
        };
        let c = object.appearance;
        Self {
            kind: object.kind(),
            model,
            color: [
                (c.r * tint).min(1.0),
                (c.g * tint).min(1.0),
                (c.b * tint).min(1.0),
                alpha,
            ],
        }
    }

    pub fn is_translucent(&self) -> bool {
        self.color[3] < 1.0
    }
}

/// Committed scene state only, without editor decorations.
pub fn capture_items(scene: &Scene) -> Vec<DrawItem> {
    order_for_blending(
        scene
            .objects()
            .iter()
            .map(|obj| DrawItem::from_object(obj, obj.transform.matrix(), 1.0))
            .collect(),
    )
}

/// What the viewport shows: the live gesture transform replaces the
/// committed one and the selection is highlighted.
pub fn viewport_items(scene: &Scene, controller: &SelectionController) -> Vec<DrawItem> {
    let live = controller.live_transform();
    let selected = scene.selected();
    order_for_blending(
        scene
            .objects()
            .iter()
            .map(|obj| {
                let transform = match live {
                    Some((id, transform)) if id == obj.id() => transform,
                    _ => obj.transform,
                };
                let tint = if selected == Some(obj.id()) { SELECTION_TINT } else { 1.0 };
                DrawItem::from_object(obj, transform.matrix(), tint)
            })
            .collect(),
    )
}

/// Stable partition: opaque items keep insertion order, translucent ones follow.
fn order_for_blending(items: Vec<DrawItem>) -> Vec<DrawItem> {
    let (mut opaque, translucent): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|item| !item.is_translucent());
    opaque.extend(translucent);
    opaque
}
