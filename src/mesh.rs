// Triangle meshes for the primitive set. Every primitive is unit sized and
// centred on the origin: the box spans 1x1x1, the sphere has radius 0.5,
// cylinder and cone have radius 0.5 and height 1.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::scene::PrimitiveKind;

const RADIAL_SEGMENTS: u16 = 24;
const SPHERE_RINGS: u16 = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Box => Self::unit_box(),
            PrimitiveKind::Sphere => Self::sphere(),
            PrimitiveKind::Cylinder => Self::cylinder(),
            PrimitiveKind::Cone => Self::cone(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push(&mut self, position: Vec3, normal: Vec3) -> u16 {
        self.vertices.push(Vertex::new(position, normal));
        (self.vertices.len() - 1) as u16
    }

    fn unit_box() -> Self {
        let faces: [(Vec3, [[f32; 3]; 4]); 6] = [
            // Front
            (Vec3::Z, [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
            // Back
            (Vec3::NEG_Z, [[-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5], [0.5, -0.5, -0.5]]),
            // Top
            (Vec3::Y, [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]]),
            // Bottom
            (Vec3::NEG_Y, [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]]),
            // Right
            (Vec3::X, [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]]),
            // Left
            (Vec3::NEG_X, [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]]),
        ];

        let mut mesh = Mesh::default();
        for (normal, corners) in faces {
            let base = mesh.vertices.len() as u16;
            for corner in corners {
                mesh.push(Vec3::from(corner), normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }

    fn sphere() -> Self {
        let mut mesh = Mesh::default();
        for ring in 0..=SPHERE_RINGS {
            let phi = ring as f32 / SPHERE_RINGS as f32 * std::f32::consts::PI;
            for segment in 0..=RADIAL_SEGMENTS {
                let theta = segment as f32 / RADIAL_SEGMENTS as f32 * TAU;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.push(normal * 0.5, normal);
            }
        }
        let stride = RADIAL_SEGMENTS + 1;
        for ring in 0..SPHERE_RINGS {
            for segment in 0..RADIAL_SEGMENTS {
                let a = ring * stride + segment;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }

    fn cylinder() -> Self {
        let mut mesh = Mesh::default();
        mesh.side_wall(0.5, 0.5);
        mesh.cap(0.5, 0.5, Vec3::Y);
        mesh.cap(-0.5, 0.5, Vec3::NEG_Y);
        mesh
    }

    fn cone() -> Self {
        let mut mesh = Mesh::default();
        mesh.side_wall(0.5, 0.0);
        mesh.cap(-0.5, 0.5, Vec3::NEG_Y);
        mesh
    }

    /// Lateral surface from a bottom ring at y = -0.5 to a top ring at y = 0.5.
    fn side_wall(&mut self, bottom_radius: f32, top_radius: f32) {
        // Height is 1, so the radius difference is the normal's y slope.
        let slope = bottom_radius - top_radius;
        let first = self.vertices.len() as u16;
        for segment in 0..=RADIAL_SEGMENTS {
            let theta = segment as f32 / RADIAL_SEGMENTS as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            let normal = Vec3::new(cos, slope, sin).normalize();
            self.push(Vec3::new(cos * bottom_radius, -0.5, sin * bottom_radius), normal);
            self.push(Vec3::new(cos * top_radius, 0.5, sin * top_radius), normal);
        }
        for segment in 0..RADIAL_SEGMENTS {
            let a = first + segment * 2;
            self.indices
                .extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
        }
    }

    fn cap(&mut self, y: f32, radius: f32, normal: Vec3) {
        let center = self.push(Vec3::new(0.0, y, 0.0), normal);
        for segment in 0..=RADIAL_SEGMENTS {
            let theta = segment as f32 / RADIAL_SEGMENTS as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            self.push(Vec3::new(cos * radius, y, sin * radius), normal);
        }
        for segment in 0..RADIAL_SEGMENTS {
            let rim = center + 1 + segment;
            self.indices.extend_from_slice(&[center, rim, rim + 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_fits_its_bounding_radius() {
        for kind in PrimitiveKind::ALL {
            let mesh = Mesh::primitive(kind);
            assert!(mesh.triangle_count() > 0, "{kind:?} has no triangles");
            for vertex in &mesh.vertices {
                let distance = Vec3::from(vertex.position).length();
                assert!(distance <= kind.bounding_radius() + 1e-3, "{kind:?} exceeds bounds");
            }
        }
    }

    #[test]
    fn indices_stay_in_range() {
        for kind in PrimitiveKind::ALL {
            let mesh = Mesh::primitive(kind);
            let count = mesh.vertices.len() as u16;
            assert!(mesh.indices.iter().all(|&i| i < count));
        }
    }

    #[test]
    fn box_has_twelve_triangles() {
        assert_eq!(Mesh::primitive(PrimitiveKind::Box).triangle_count(), 12);
    }
}
