/// Position/rotation/scale transforms and their homogeneous matrices
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Scale below which a decomposed axis is treated as collapsed
const SCALE_EPSILON: f32 = 1e-4;

/// Smallest scale reachable through [`Transform::scale_by`]
pub const MIN_SCALE: f32 = 0.1;

/// Local or world placement of a scene node.
///
/// Rotation holds Euler angles in radians. The matrix is always composed as
/// `translation * Rz * Ry * Rx * scale`; decomposition assumes that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn new(position: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.rotation += Vector3::new(dx, dy, dz);
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    /// Add `delta` to every scale axis, never going below `MIN_SCALE`
    pub fn scale_by(&mut self, delta: Vector3<f32>) {
        self.scale = (self.scale + delta).map(|s| s.max(MIN_SCALE));
    }

    /// Create the rotation part, applied in order X, then Y, then Z
    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(self.rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, self.rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, self.rotation.z));

        rz * ry * rx
    }

    /// Compose the homogeneous matrix for this transform
    pub fn matrix(&self) -> Matrix4<f32> {
        let translation = Matrix4::new_translation(&self.position);
        let scaling = Matrix4::new_nonuniform_scaling(&self.scale);

        translation * self.rotation_matrix() * scaling
    }

    /// Linear interpolation of every component towards `other`
    pub fn interpolate(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            position: self.position.lerp(&other.position, t),
            rotation: self.rotation.lerp(&other.rotation, t),
            scale: self.scale.lerp(&other.scale, t),
        }
    }

    /// Refresh position, scale and rotation from an affine matrix.
    ///
    /// Best-effort inverse of [`Transform::matrix`]: shear is ignored, and
    /// when any scale axis collapses below `SCALE_EPSILON` the rotation is
    /// left untouched.
    pub fn update_from_matrix(&mut self, m: &Matrix4<f32>) {
        self.position = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);

        let basis: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
        self.scale = Vector3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );

        if self.scale.iter().any(|&s| s <= SCALE_EPSILON) {
            return;
        }

        let mut r = basis;
        for (i, mut column) in r.column_iter_mut().enumerate() {
            column /= self.scale[i];
        }

        let ry = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
        let (rx, rz) = if ry.cos() > SCALE_EPSILON {
            (r[(2, 1)].atan2(r[(2, 2)]), r[(1, 0)].atan2(r[(0, 0)]))
        } else {
            // Gimbal lock: X and Z rotate about the same axis
            ((-r[(1, 2)]).atan2(r[(1, 1)]), 0.0)
        };
        self.rotation = Vector3::new(rx, ry, rz);
    }

    /// Decompose a matrix into a fresh transform
    pub fn from_matrix(m: &Matrix4<f32>) -> Self {
        let mut transform = Self::identity();
        transform.update_from_matrix(m);
        transform
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_vec_close(a: &Vector3<f32>, b: &Vector3<f32>, eps: f32) {
        assert!((a - b).norm() < eps, "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity_matrix() {
        let transform = Transform::identity();
        assert!((transform.matrix() - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_rotate_accumulates() {
        let mut transform = Transform::identity();
        transform.rotate(0.1, 0.2, 0.3);
        assert_vec_close(&transform.rotation, &Vector3::new(0.1, 0.2, 0.3), 1e-6);
    }

    #[test]
    fn test_scale_by_stops_at_minimum() {
        let mut transform = Transform::identity().with_scale(2.0, 0.5, 0.15);
        transform.scale_by(Vector3::repeat(-0.45));
        assert_vec_close(&transform.scale, &Vector3::new(1.55, MIN_SCALE, MIN_SCALE), 1e-6);

        transform.scale_by(Vector3::new(-10.0, 0.2, 0.0));
        assert_vec_close(&transform.scale, &Vector3::new(MIN_SCALE, 0.3, MIN_SCALE), 1e-6);

        transform.translate(Vector3::new(1.0, -2.0, 0.5));
        transform.translate(Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(transform.position, Vector3::new(2.0, -2.0, 0.5));
    }

    #[test]
    fn test_composition_order() {
        let transform = Transform::from_position(1.0, 2.0, 3.0)
            .with_rotation(0.0, 0.0, FRAC_PI_2)
            .with_scale(2.0, 1.0, 1.0);
        // Scale first: x axis doubled, then rotated onto +y, then translated
        let p = transform.matrix() * nalgebra::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_vec_close(&p.xyz(), &Vector3::new(1.0, 4.0, 3.0), 1e-5);
    }

    #[test]
    fn test_decompose_round_trip() {
        let cases = [
            Transform::from_position(1.5, -2.0, 0.25)
                .with_rotation(0.3, -0.7, 1.2)
                .with_scale(1.0, 2.0, 0.5),
            Transform::from_position(0.0, 0.0, -4.0)
                .with_rotation(-1.1, 0.4, -2.5)
                .with_scale(3.0, 3.0, 3.0),
        ];

        for original in cases {
            let decomposed = Transform::from_matrix(&original.matrix());
            assert_eq!(decomposed.position, original.position);
            assert_vec_close(&decomposed.rotation, &original.rotation, 1e-4);
            assert_vec_close(&decomposed.scale, &original.scale, 1e-4);
        }
    }

    #[test]
    fn test_gimbal_lock_reproduces_matrix() {
        let original = Transform::identity().with_rotation(0.4, FRAC_PI_2, 0.0);
        let decomposed = Transform::from_matrix(&original.matrix());
        assert!((decomposed.matrix() - original.matrix()).norm() < 1e-3);
    }

    #[test]
    fn test_collapsed_scale_keeps_stale_rotation() {
        let mut stale = Transform::identity().with_rotation(0.5, 0.5, 0.5);
        let flat = Transform::identity()
            .with_rotation(1.0, 0.0, 0.0)
            .with_scale(1.0, 0.0, 1.0);
        stale.update_from_matrix(&flat.matrix());
        assert_vec_close(&stale.rotation, &Vector3::new(0.5, 0.5, 0.5), 1e-6);
        assert!(stale.scale.y < 1e-6);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = Transform::identity();
        let b = Transform::from_position(2.0, 0.0, 0.0)
            .with_rotation(0.0, 1.0, 0.0)
            .with_scale(3.0, 1.0, 1.0);
        let mid = a.interpolate(&b, 0.5);
        assert_vec_close(&mid.position, &Vector3::new(1.0, 0.0, 0.0), 1e-6);
        assert_vec_close(&mid.rotation, &Vector3::new(0.0, 0.5, 0.0), 1e-6);
        assert_vec_close(&mid.scale, &Vector3::new(2.0, 1.0, 1.0), 1e-6);
    }
}
