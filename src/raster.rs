// CPU rasterizer implementing `RenderSurface`.
//
// Mirrors the GPU pipeline closely enough for headless captures: same
// camera, same meshes, depth-tested triangles, flat Lambert shading and
// alpha blending for translucent items. Output is sRGB encoded.

use std::collections::HashMap;

use glam::{Vec3, Vec4, Vec4Swizzles};
use image::{Rgba, RgbaImage};

use crate::camera::Camera;
use crate::capture::RenderSurface;
use crate::frame::DrawItem;
use crate::mesh::Mesh;
use crate::scene::PrimitiveKind;

/// Linear clear color, shared with the GPU renderer.
pub const BACKGROUND: [f32; 3] = [0.1, 0.2, 0.3];
/// Direction towards the key light.
pub const LIGHT_DIRECTION: Vec3 = Vec3::new(0.4, 0.8, 0.45);
pub const AMBIENT: f32 = 0.3;

pub struct SoftwareSurface {
    width: u32,
    height: u32,
    camera: Camera,
    meshes: HashMap<PrimitiveKind, Mesh>,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_camera(width, height, Camera::default())
    }

    pub fn with_camera(width: u32, height: u32, camera: Camera) -> Self {
        let meshes = PrimitiveKind::ALL
            .into_iter()
            .map(|kind| (kind, Mesh::primitive(kind)))
            .collect();
        Self {
            width,
            height,
            camera,
            meshes,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// sRGB bytes of the clear color.
    pub fn background_pixel() -> Rgba<u8> {
        Rgba([
            linear_to_srgb(BACKGROUND[0]),
            linear_to_srgb(BACKGROUND[1]),
            linear_to_srgb(BACKGROUND[2]),
            255,
        ])
    }
}

impl RenderSurface for SoftwareSurface {
    fn render_frame(&mut self, items: &[DrawItem]) -> Option<RgbaImage> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let mut target = Target::new(self.width, self.height);
        let view_proj = self.camera.view_proj(self.width as f32 / self.height as f32);

        for item in items {
            let Some(mesh) = self.meshes.get(&item.kind) else {
                continue;
            };
            let mvp = view_proj * item.model;
            let color = Vec4::from_array(item.color);

            for triangle in mesh.indices.chunks_exact(3) {
                let vertices = [
                    mesh.vertices[triangle[0] as usize],
                    mesh.vertices[triangle[1] as usize],
                    mesh.vertices[triangle[2] as usize],
                ];
                let normal = vertices
                    .iter()
                    .fold(Vec3::ZERO, |acc, v| {
                        acc + item.model.transform_vector3(Vec3::from(v.normal))
                    })
                    .normalize_or_zero();
                let shaded = shade(color, normal);

                let clip = vertices.map(|v| mvp * Vec3::from(v.position).extend(1.0));
                if clip.iter().any(|c| c.w <= 1e-5) {
                    continue;
                }
                let screen = clip.map(|c| target.to_screen(c));
                target.fill_triangle(screen, shaded);
            }
        }

        Some(target.into_image())
    }
}

fn shade(color: Vec4, normal: Vec3) -> Vec4 {
    let diffuse = normal.dot(LIGHT_DIRECTION.normalize()).max(0.0);
    let factor = AMBIENT + (1.0 - AMBIENT) * diffuse;
    (color.xyz() * factor).extend(color.w)
}

fn linear_to_srgb(value: f32) -> u8 {
    let v = value.clamp(0.0, 1.0);
    let encoded = if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

struct Target {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    depth: Vec<f32>,
}

impl Target {
    fn new(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            color: vec![Vec3::from_array(BACKGROUND); len],
            depth: vec![f32::INFINITY; len],
        }
    }

    /// Clip space to pixel coordinates, keeping NDC depth in z.
    fn to_screen(&self, clip: Vec4) -> Vec3 {
        let ndc = clip.xyz() / clip.w;
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * self.width as f32,
            (0.5 - ndc.y * 0.5) * self.height as f32,
            ndc.z,
        )
    }

    fn fill_triangle(&mut self, [p0, p1, p2]: [Vec3; 3], color: Vec4) {
        let area = edge(p0, p1, p2);
        if area.abs() < 1e-8 {
            return;
        }
        let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.0) as u32;
        let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.0) as u32;
        let max_x = p0.x.max(p1.x).max(p2.x).ceil().min(self.width as f32 - 1.0);
        let max_y = p0.y.max(p1.y).max(p2.y).ceil().min(self.height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        for y in min_y..=max_y as u32 {
            for x in min_x..=max_x as u32 {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(p1, p2, p) / area;
                let w1 = edge(p2, p0, p) / area;
                let w2 = edge(p0, p1, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * p0.z + w1 * p1.z + w2 * p2.z;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let index = (y * self.width + x) as usize;
                if z >= self.depth[index] {
                    continue;
                }
                self.depth[index] = z;
                let dst = self.color[index];
                self.color[index] = color.xyz() * color.w + dst * (1.0 - color.w);
            }
        }
    }

    fn into_image(self) -> RgbaImage {
        let Target {
            width,
            height,
            color,
            ..
        } = self;
        RgbaImage::from_fn(width, height, |x, y| {
            let c = color[(y * width + x) as usize];
            Rgba([linear_to_srgb(c.x), linear_to_srgb(c.y), linear_to_srgb(c.z), 255])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::capture_items;
    use crate::scene::{ObjectPatch, Scene};

    #[test]
    fn zero_sized_surface_yields_nothing() {
        let mut surface = SoftwareSurface::new(0, 64);
        assert!(surface.render_frame(&[]).is_none());
    }

    #[test]
    fn empty_scene_is_background_only() {
        let mut surface = SoftwareSurface::new(32, 24);
        let image = surface.render_frame(&[]).unwrap();
        let background = SoftwareSurface::background_pixel();
        assert!(image.pixels().all(|p| *p == background));
    }

    #[test]
    fn object_covers_its_projected_center() {
        let mut scene = Scene::new();
        let id = scene.add(PrimitiveKind::Box).id();
        let center = Vec3::new(0.0, 0.5, 0.0);
        scene.update(id, &ObjectPatch::position(center));

        let mut surface = SoftwareSurface::new(160, 120);
        let image = surface.render_frame(&capture_items(&scene)).unwrap();
        let pixel = surface.camera().project(center, 160, 120).unwrap();
        assert_ne!(
            *image.get_pixel(pixel.x as u32, pixel.y as u32),
            SoftwareSurface::background_pixel()
        );
        assert_eq!(*image.get_pixel(0, 0), SoftwareSurface::background_pixel());
    }

    #[test]
    fn srgb_encoding_endpoints() {
        assert_eq!(linear_to_srgb(0.0), 0);
        assert_eq!(linear_to_srgb(1.0), 255);
        assert_eq!(linear_to_srgb(2.0), 255);
    }
}
