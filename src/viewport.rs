// Interactive window: maps pointer and keyboard events onto the editor.

use glam::{Vec2, Vec3};
use winit::{
    error::EventLoopError,
    event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::camera::Ray;
use crate::controller::TransformMode;
use crate::editor::SceneEditor;
use crate::renderer::Renderer;
use crate::scene::PrimitiveKind;

/// Radians of rotation per pixel of horizontal drag.
const ROTATE_PER_PIXEL: f32 = 0.01;
/// Scale change per pixel of vertical drag.
const SCALE_PER_PIXEL: f32 = 0.01;

pub struct Viewport {
    renderer: Renderer,
    editor: SceneEditor,
    base_title: String,
    cursor: Vec2,
    shift: bool,
}

impl Viewport {
    pub fn new(renderer: Renderer, editor: SceneEditor, base_title: impl Into<String>) -> Self {
        Self {
            renderer,
            editor,
            base_title: base_title.into(),
            cursor: Vec2::ZERO,
            shift: false,
        }
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<(), EventLoopError> {
        self.refresh_title();
        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Wait);

            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != self.renderer.window().id() {
                return;
            }

            let changes_state = changes_editor_state(&event);
            match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(physical_size) => self.renderer.resize(physical_size),
                WindowEvent::RedrawRequested => self.redraw(),
                WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event),
                WindowEvent::ModifiersChanged(modifiers) => self.shift = modifiers.state().shift_key(),
                WindowEvent::CursorMoved { position, .. } => {
                    let cursor = Vec2::new(position.x as f32, position.y as f32);
                    self.handle_pointer_move(cursor);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => self.handle_primary_button(state),
                WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                    // Interrupted drags fall back to the last commit.
                    self.editor.cancel_gesture();
                }
                _ => {}
            }
            if changes_state {
                self.refresh_title();
                self.renderer.window().request_redraw();
            }
        })
    }

    fn redraw(&mut self) {
        // Captures see committed state only, so they run before the live frame.
        self.editor.pump_capture(&mut self.renderer);
        let items = self.editor.viewport_items();
        self.renderer.draw(&items);
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return;
        };
        match keycode {
            KeyCode::Digit1 => {
                self.editor.add(PrimitiveKind::Box);
            }
            KeyCode::Digit2 => {
                self.editor.add(PrimitiveKind::Sphere);
            }
            KeyCode::Digit3 => {
                self.editor.add(PrimitiveKind::Cylinder);
            }
            KeyCode::Digit4 => {
                self.editor.add(PrimitiveKind::Cone);
            }
            KeyCode::KeyG => self.editor.set_mode(TransformMode::Translate),
            KeyCode::KeyR => self.editor.set_mode(TransformMode::Rotate),
            KeyCode::KeyS => self.editor.set_mode(TransformMode::Scale),
            KeyCode::KeyT => {
                if let Some(role) = self.editor.toggle_role() {
                    log::info!("Selection is now {:?}", role);
                }
            }
            KeyCode::Tab => {
                self.editor.cycle_selection();
            }
            KeyCode::Escape => {
                if self.editor.controller().is_dragging() {
                    self.editor.cancel_gesture();
                } else {
                    self.editor.select_none();
                }
            }
            KeyCode::Delete | KeyCode::Backspace => {
                if self.shift {
                    self.editor.clear();
                } else {
                    self.editor.delete_selected();
                }
            }
            KeyCode::Enter | KeyCode::NumpadEnter => {
                if let Err(refused) = self.editor.request_capture() {
                    log::warn!("{}", refused);
                }
            }
            _ => {}
        }
    }

    fn pointer_ray(&self, pixel: Vec2) -> Option<Ray> {
        let size = self.renderer.size();
        self.renderer.camera().ray(pixel, size.width, size.height)
    }

    fn handle_primary_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let Some(ray) = self.pointer_ray(self.cursor) else {
                    return;
                };
                if self.editor.pick(&ray).is_some() {
                    self.editor.begin_gesture();
                }
            }
            ElementState::Released => {
                self.editor.commit_gesture();
            }
        }
    }

    fn handle_pointer_move(&mut self, cursor: Vec2) {
        let previous = std::mem::replace(&mut self.cursor, cursor);
        let Some((_, live)) = self.editor.controller().live_transform() else {
            return;
        };
        let pixel_delta = cursor - previous;

        let delta = match self.editor.controller().mode() {
            TransformMode::Translate => {
                let height = live.position.y;
                let hit = |pixel: Vec2| {
                    let ray = self.pointer_ray(pixel)?;
                    ray.hit_horizontal_plane(height).map(|t| ray.at(t))
                };
                match (hit(previous), hit(cursor)) {
                    (Some(from), Some(to)) => to - from,
                    _ => return,
                }
            }
            TransformMode::Rotate => Vec3::new(0.0, pixel_delta.x * ROTATE_PER_PIXEL, 0.0),
            TransformMode::Scale => Vec3::splat(-pixel_delta.y * SCALE_PER_PIXEL),
        };
        self.editor.drag_by(delta);
    }

    /// The window title doubles as the toolbar readout.
    fn refresh_title(&mut self) {
        let toolbar = self.editor.toolbar();
        let selection = match toolbar.selected.and_then(|id| self.editor.scene().get(id)) {
            Some(object) => format!("{:?} {:?}", object.kind(), object.role),
            None => "nothing selected".to_string(),
        };
        let title = format!(
            "{} | {:?}{} | {} objects | {}{}",
            self.base_title,
            toolbar.mode,
            if toolbar.dragging { " (dragging)" } else { "" },
            toolbar.object_count,
            selection,
            if toolbar.can_capture { " | Enter: render" } else { "" },
        );
        self.renderer.window().set_title(&title);
    }
}

/// Events after which the title readout and the frame must be refreshed.
/// A redraw itself never schedules another one, so `ControlFlow::Wait` idles.
fn changes_editor_state(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::Resized(_)
            | WindowEvent::KeyboardInput { .. }
            | WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput {
                button: MouseButton::Left,
                ..
            }
            | WindowEvent::CursorLeft { .. }
            | WindowEvent::Focused(false)
    )
}
