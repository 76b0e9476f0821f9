// Scene object model for the massing study

use std::fmt;

use glam::Vec3;
use uuid::Uuid;

use crate::camera::Ray;
use crate::math::Transform;

/// Half-extent of the square region new objects are scattered over.
pub const SPAWN_HALF_EXTENT: f32 = 2.0;
/// Vertical offset of new objects so unit primitives rest on the ground.
pub const SPAWN_HEIGHT: f32 = 0.5;

/// Opaque object identity, fixed for the object's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Two values in `[0, 1]` drawn from the random bytes of the id.
    fn scatter(&self) -> (f32, f32) {
        let bytes = self.0.as_bytes();
        let x = u16::from_le_bytes([bytes[0], bytes[1]]) as f32 / u16::MAX as f32;
        let z = u16::from_le_bytes([bytes[2], bytes[3]]) as f32 / u16::MAX as f32;
        (x, z)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Box,
    Sphere,
    Cylinder,
    Cone,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Box,
        PrimitiveKind::Sphere,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Cone,
    ];

    /// Radius of a sphere enclosing the unit-sized primitive.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            PrimitiveKind::Box => 0.866,
            PrimitiveKind::Sphere => 0.5,
            PrimitiveKind::Cylinder | PrimitiveKind::Cone => 0.708,
        }
    }
}

/// Boolean composition role. Only affects the rendering hint; no solid
/// geometry is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Additive,
    Subtractive,
}

/// Linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Default massing material: a light warm gray.
    pub const DEFAULT: Color = Color::new(0.72, 0.70, 0.66);
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Represents one placed primitive within the study.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: ObjectId,
    kind: PrimitiveKind,
    pub transform: Transform,
    pub appearance: Color,
    pub role: Role,
}

impl SceneObject {
    /// Creates an object with a fresh id, scattered over the spawn region.
    pub fn new(kind: PrimitiveKind) -> Self {
        let id = ObjectId::new();
        let (u, v) = id.scatter();
        let position = Vec3::new(
            (u * 2.0 - 1.0) * SPAWN_HALF_EXTENT,
            SPAWN_HEIGHT,
            (v * 2.0 - 1.0) * SPAWN_HALF_EXTENT,
        );
        Self {
            id,
            kind,
            transform: Transform::at(position),
            appearance: Color::DEFAULT,
            role: Role::Additive,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn bounding_radius(&self) -> f32 {
        self.kind.bounding_radius() * self.transform.max_scale()
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectPatch {
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub appearance: Option<Color>,
    pub role: Option<Role>,
}

impl ObjectPatch {
    /// Full transform write, as performed by a gesture commit.
    pub fn transform(transform: Transform) -> Self {
        Self {
            position: Some(transform.position),
            rotation: Some(transform.rotation),
            scale: Some(transform.scale),
            ..Self::default()
        }
    }

    pub fn position(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    fn apply(&self, object: &mut SceneObject) {
        if let Some(position) = self.position {
            object.transform.position = position;
        }
        if let Some(rotation) = self.rotation {
            object.transform.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            object.transform.scale = scale;
        }
        if let Some(appearance) = self.appearance {
            object.appearance = appearance;
        }
        if let Some(role) = self.role {
            object.role = role;
        }
    }
}

/// The ordered sequence of objects plus the single selection slot.
///
/// Selection lives next to the objects so that every removal clears a
/// matching selection inside the same call.
#[derive(Debug, Default, Clone)]
pub struct Scene {
    objects: Vec<SceneObject>,
    selected: Option<ObjectId>,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            selected: None,
        }
    }

    /// Appends a new primitive of `kind` and selects it.
    pub fn add(&mut self, kind: PrimitiveKind) -> &SceneObject {
        let object = SceneObject::new(kind);
        let id = object.id();
        log::info!(
            "Added {:?} {} at ({:.2}, {:.2}, {:.2})",
            kind,
            id,
            object.transform.position.x,
            object.transform.position.y,
            object.transform.position.z
        );
        self.objects.push(object);
        self.selected = Some(id);
        &self.objects[self.objects.len() - 1]
    }

    /// Applies `patch` to the object with `id`. Returns `false` when the id
    /// is absent; nothing else is touched in that case.
    pub fn update(&mut self, id: ObjectId, patch: &ObjectPatch) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                patch.apply(object);
                true
            }
            None => {
                log::debug!("Ignoring update for unknown object {}", id);
                false
            }
        }
    }

    /// Removes the object with `id`, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|obj| obj.id() == id)?;
        let removed = self.objects.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        log::info!("Removed {:?} {}", removed.kind(), id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.selected = None;
    }

    /// Selects `id` if present. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: ObjectId) -> bool {
        if self.contains(id) {
            self.selected = Some(id);
            true
        } else {
            log::debug!("Ignoring selection of unknown object {}", id);
            false
        }
    }

    pub fn select_none(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&SceneObject> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.iter().any(|obj| obj.id() == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.id() == id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.id() == id)
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Id of the object after the current selection, wrapping around.
    pub fn next_after_selection(&self) -> Option<ObjectId> {
        if self.objects.is_empty() {
            return None;
        }
        let next = match self.selected.and_then(|id| self.objects.iter().position(|o| o.id() == id)) {
            Some(index) => (index + 1) % self.objects.len(),
            None => 0,
        };
        Some(self.objects[next].id())
    }

    /// Nearest object whose bounding sphere the ray crosses.
    pub fn pick(&self, ray: &Ray) -> Option<ObjectId> {
        self.objects
            .iter()
            .filter_map(|obj| {
                ray.hit_sphere(obj.transform.position, obj.bounding_radius())
                    .map(|t| (t, obj.id()))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}
