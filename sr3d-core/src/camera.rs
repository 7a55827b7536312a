/// Camera, directional light and an orbit controller for the camera
use nalgebra::Vector3;

/// Viewer placement.
///
/// `fov <= 0` selects an orthographic projection; a positive value selects a
/// perspective whose strength is `fov / |position - target|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
}

impl Camera {
    pub fn new(position: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Self {
        Self {
            position,
            target,
            up,
            fov: 1.0,
        }
    }

    pub fn is_orthographic(&self) -> bool {
        self.fov <= 0.0
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Coefficient for [`projection`](crate::pipeline::projection); zero means orthographic
    pub fn projection_coefficient(&self) -> f32 {
        if self.is_orthographic() {
            return 0.0;
        }
        let distance = self.distance();
        if distance <= f32::EPSILON {
            return 0.0;
        }
        -self.fov / distance
    }

    /// Flip between perspective and orthographic, keeping the magnitude
    pub fn toggle_projection(&mut self) {
        self.fov = if self.fov == 0.0 { -1.0 } else { -self.fov };
    }

    pub fn look_at(&mut self, eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) {
        self.position = eye;
        self.target = target;
        self.up = up;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 3.0), Vector3::zeros(), Vector3::y())
    }
}

/// The single directional light of a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    pub fn new(direction: Vector3<f32>) -> Self {
        Self {
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y),
            color: Vector3::repeat(1.0),
            intensity: 1.0,
        }
    }

    /// Unit vector pointing from the origin towards the light
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        if let Some(d) = direction.try_normalize(f32::EPSILON) {
            self.direction = d;
        }
    }

    /// Shift the direction in the XZ plane and renormalize
    pub fn nudge(&mut self, dx: f32, dz: f32) {
        self.set_direction(self.direction + Vector3::new(dx, 0.0, dz));
    }

    /// Per-channel multiplier applied to the lit terms
    pub fn radiance(&self) -> Vector3<f32> {
        self.color * self.intensity
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vector3::new(1.0, 1.0, 1.0))
    }
}

const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 50.0;
const MAX_PITCH: f32 = 1.5;

/// Spherical camera controller orbiting a target point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitRig {
    pub target: Vector3<f32>,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitRig {
    pub fn new(target: Vector3<f32>, distance: f32) -> Self {
        Self {
            target,
            distance: distance.clamp(MIN_DISTANCE, MAX_DISTANCE),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Recover orbit parameters from an existing camera
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.norm().max(MIN_DISTANCE);
        Self {
            target: camera.target,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
        }
    }

    /// Pitch is clamped short of the poles to keep the up vector usable
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance + amount).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Move the target in the camera's screen plane
    pub fn pan(&mut self, camera: &Camera, dx: f32, dy: f32) {
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(&camera.up).normalize();
        let up = right.cross(&forward).normalize();
        self.target += right * dx + up * dy;
    }

    pub fn eye(&self) -> Vector3<f32> {
        let (sin_p, cos_p) = self.pitch.sin_cos();
        let (sin_y, cos_y) = self.yaw.sin_cos();
        self.target + Vector3::new(cos_p * sin_y, sin_p, cos_p * cos_y) * self.distance
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.eye();
        camera.target = self.target;
    }
}

impl Default for OrbitRig {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::default();
        assert!(!camera.is_orthographic());
        assert!((camera.projection_coefficient() + 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_fov_sentinel() {
        let mut camera = Camera::default();
        camera.fov = 0.0;
        assert_eq!(camera.projection_coefficient(), 0.0);
        camera.fov = -0.8;
        assert!(camera.is_orthographic());
        assert_eq!(camera.projection_coefficient(), 0.0);
        camera.toggle_projection();
        assert!(!camera.is_orthographic());
        assert!((camera.fov - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_light_stays_normalized() {
        let mut light = Light::new(Vector3::new(3.0, 0.0, 4.0));
        assert!((light.direction() - Vector3::new(0.6, 0.0, 0.8)).norm() < 1e-6);
        light.nudge(1.0, -0.5);
        assert!((light.direction().norm() - 1.0).abs() < 1e-6);
        light.set_direction(Vector3::zeros());
        assert!((light.direction().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orbit_round_trip() {
        let mut rig = OrbitRig::new(Vector3::new(1.0, 0.0, 0.0), 4.0);
        rig.orbit(0.7, 0.3);
        let mut camera = Camera::default();
        rig.apply(&mut camera);
        assert!((camera.distance() - 4.0).abs() < 1e-5);

        let recovered = OrbitRig::from_camera(&camera);
        assert!((recovered.yaw - 0.7).abs() < 1e-5);
        assert!((recovered.pitch - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_orbit_clamps() {
        let mut rig = OrbitRig::default();
        rig.orbit(0.0, 10.0);
        assert_eq!(rig.pitch, MAX_PITCH);
        rig.zoom(-100.0);
        assert_eq!(rig.distance, MIN_DISTANCE);
    }
}
