// Fixed viewing camera shared by the window renderer, the software surface
// and pointer picking.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the horizontal plane `y = height`.
    pub fn hit_horizontal_plane(&self, height: f32) -> Option<f32> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then_some(t)
    }

    /// Nearest non-negative distance to a sphere, if hit.
    pub fn hit_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = -b - sqrt_d;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + sqrt_d;
        (far >= 0.0).then_some(far)
    }
}

/// Camera/orbit navigation is fixed environment; the camera never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(5.0, 4.5, 7.0),
            target: Vec3::new(0.0, 0.5, 0.0),
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    /// Projection with a `0..1` depth range, as expected by wgpu.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// Projects a world point onto pixel coordinates of a `width` x `height`
    /// target. Points behind the camera yield `None`.
    pub fn project(&self, world: Vec3, width: u32, height: u32) -> Option<Vec2> {
        if width == 0 || height == 0 {
            return None;
        }
        let clip = self.view_proj(width as f32 / height as f32) * world.extend(1.0);
        if clip.w <= 1e-5 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
        ))
    }

    /// World-space ray through a pixel position.
    pub fn ray(&self, pixel: Vec2, width: u32, height: u32) -> Option<Ray> {
        if width == 0 || height == 0 {
            return None;
        }
        let ndc_x = pixel.x / width as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - pixel.y / height as f32 * 2.0;
        let inverse = self.view_proj(width as f32 / height as f32).inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - near).try_normalize()?;
        Some(Ray {
            origin: near,
            direction,
        })
    }
}
