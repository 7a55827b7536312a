/// View, projection and viewport matrices for one render pass
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use crate::camera::{Camera, Light};
use crate::config::RenderConfig;

/// Depth range of screen space, shared by every pass so depths compare
pub const DEPTH: f32 = 255.0;

/// Right-handed look-at basis centered on `target`.
///
/// `eye == target` or `up` parallel to the view direction yield NaNs; callers
/// must avoid them.
pub fn look_at(eye: &Vector3<f32>, target: &Vector3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
    let z = (eye - target).normalize();
    let x = up.cross(&z).normalize();
    let y = z.cross(&x).normalize();

    let mut basis = Matrix4::identity();
    for i in 0..3 {
        basis[(0, i)] = x[i];
        basis[(1, i)] = y[i];
        basis[(2, i)] = z[i];
    }
    basis * Matrix4::new_translation(&-target)
}

/// Identity with `coefficient` in the w row; zero gives a parallel projection
pub fn projection(coefficient: f32) -> Matrix4<f32> {
    let mut m = Matrix4::identity();
    m[(3, 2)] = coefficient;
    m
}

/// Map the `[-1, 1]` cube onto a pixel rectangle.
///
/// Rows grow downwards, so +y lands at the top of the image. Depth maps to
/// `[0, DEPTH]` with the side facing the viewer (+z) at 0: smaller is closer.
pub fn viewport(x: f32, y: f32, width: f32, height: f32) -> Matrix4<f32> {
    let mut m = Matrix4::identity();
    m[(0, 3)] = x + width / 2.0;
    m[(1, 3)] = y + height / 2.0;
    m[(2, 3)] = DEPTH / 2.0;
    m[(0, 0)] = width / 2.0;
    m[(1, 1)] = -height / 2.0;
    m[(2, 2)] = -DEPTH / 2.0;
    m
}

/// Pipeline state for one pass, rebuilt before any draw call of that pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContext {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub viewport: Matrix4<f32>,
}

impl PassContext {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, viewport: Matrix4<f32>) -> Self {
        Self {
            view,
            projection,
            viewport,
        }
    }

    fn config_viewport(config: &RenderConfig) -> Matrix4<f32> {
        let (x, y, w, h) = config.viewport_rect();
        viewport(x, y, w, h)
    }

    pub fn for_camera(camera: &Camera, config: &RenderConfig) -> Self {
        Self::new(
            look_at(&camera.position, &camera.target, &camera.up),
            projection(camera.projection_coefficient()),
            Self::config_viewport(config),
        )
    }

    /// Orthographic pass looking from the light direction at the origin
    pub fn for_light(light: &Light, up: &Vector3<f32>, config: &RenderConfig) -> Self {
        let direction = light.direction();
        // Swap in another up axis when the light sits on the camera's up axis
        let up = if direction.cross(up).norm() < 1e-3 {
            if direction.z.abs() < 0.9 {
                Vector3::z()
            } else {
                Vector3::x()
            }
        } else {
            *up
        };
        Self::new(
            look_at(&direction, &Vector3::zeros(), &up),
            projection(0.0),
            Self::config_viewport(config),
        )
    }

    /// `viewport * projection * view`
    pub fn transform(&self) -> Matrix4<f32> {
        self.viewport * self.projection * self.view
    }

    /// Object space to screen space (before the perspective divide)
    pub fn model_transform(&self, world: &Matrix4<f32>) -> Matrix4<f32> {
        self.transform() * world
    }

    pub fn model_view(&self, world: &Matrix4<f32>) -> Matrix4<f32> {
        self.view * world
    }
}

/// Transposed cofactor matrix
pub fn adjugate(m: &Matrix4<f32>) -> Matrix4<f32> {
    let mut adj = Matrix4::zeros();
    for row in 0..4 {
        for col in 0..4 {
            let minor: Matrix3<f32> = m.remove_row(row).remove_column(col);
            let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
            adj[(col, row)] = sign * minor.determinant();
        }
    }
    adj
}

/// `adjugate(m) / det(m)`; a singular matrix yields infinities or NaNs
pub fn inverse_by_adjugate(m: &Matrix4<f32>) -> Matrix4<f32> {
    adjugate(m) / m.determinant()
}

/// Map camera-pass screen coordinates of an object to its light-pass screen coordinates.
///
/// `light_model` and `camera_model` are the full object-to-screen transforms
/// of the two passes for the same node.
pub fn shadow_transform(light_model: &Matrix4<f32>, camera_model: &Matrix4<f32>) -> Matrix4<f32> {
    let det = camera_model.determinant();
    if det.abs() < 1e-6 {
        tracing::debug!("near-singular camera transform (det = {det})");
    }
    light_model * (adjugate(camera_model) / det)
}

/// Apply a transform and divide by w
pub fn project_point(m: &Matrix4<f32>, point: &Vector3<f32>) -> Vector3<f32> {
    let clip = m * Vector4::new(point.x, point.y, point.z, 1.0);
    clip.xyz() / clip.w
}
