/// Barycentric triangle rasterization with a depth test
use nalgebra::{Vector2, Vector3, Vector4};

use crate::buffer::{DepthBuffer, FrameBuffer};
use crate::shader::Shader;

/// Barycentric weights of `p` in the triangle `v0 v1 v2`; `None` when degenerate
pub fn barycentric(v0: Vector2<f32>, v1: Vector2<f32>, v2: Vector2<f32>, p: Vector2<f32>) -> Option<Vector3<f32>> {
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some(Vector3::new(w0, w1, w2))
}

/// Rasterize one clip-space triangle into `color` and `depth`.
///
/// Pixels are sampled at their centers. A pixel is written only when it lies
/// inside the triangle, its interpolated depth is strictly less than the stored
/// one and the shader does not discard it. Triangles with a vanishing `w` or
/// non-finite coordinates are skipped. Returns the number of pixels written.
pub fn rasterize<S: Shader + ?Sized>(
    clip: &[Vector4<f32>; 3],
    shader: &mut S,
    color: &mut FrameBuffer,
    depth: &mut DepthBuffer,
) -> usize {
    if clip.iter().any(|v| v.w.abs() < f32::EPSILON) {
        return 0;
    }
    let screen = clip.map(|v| v.xyz() / v.w);
    if screen.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
        return 0;
    }
    if depth.width() == 0 || depth.height() == 0 {
        return 0;
    }

    let (v0, v1, v2) = (screen[0], screen[1], screen[2]);

    // Bounding box, clipped to the buffer
    let min_x = (v0.x.min(v1.x).min(v2.x).floor() as i64).max(0);
    let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(depth.width() as i64 - 1);
    let min_y = (v0.y.min(v1.y).min(v2.y).floor() as i64).max(0);
    let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(depth.height() as i64 - 1);

    let mut written = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(bar) = barycentric(v0.xy(), v1.xy(), v2.xy(), p) else {
                continue;
            };
            if bar.x < 0.0 || bar.y < 0.0 || bar.z < 0.0 {
                continue;
            }

            let (x, y) = (x as usize, y as usize);
            let z = bar.x * v0.z + bar.y * v1.z + bar.z * v2.z;
            match depth.get(x, y) {
                Some(stored) if z < stored => {}
                _ => continue,
            }

            if let Some(fragment) = shader.fragment(bar) {
                color.set(x, y, fragment);
                depth.set(x, y, z);
                written += 1;
            }
        }
    }
    written
}

/// Run `shader` over every face of a mesh with `face_count` faces.
///
/// Corners are fed to [`Shader::vertex`] in slot order before each triangle is
/// rasterized. Returns the number of pixels written.
pub fn draw_faces<S: Shader + ?Sized>(
    face_count: usize,
    shader: &mut S,
    color: &mut FrameBuffer,
    depth: &mut DepthBuffer,
) -> usize {
    let mut written = 0;
    for face in 0..face_count {
        let clip = [shader.vertex(face, 0), shader.vertex(face, 1), shader.vertex(face, 2)];
        written += rasterize(&clip, shader, color, depth);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    /// Emits fixed clip-space triangles in a flat color
    struct FlatShader {
        triangles: Vec<[Vector4<f32>; 3]>,
        color: Color,
        discard: bool,
        invocations: usize,
    }

    impl FlatShader {
        fn new(triangles: Vec<[Vector4<f32>; 3]>, color: Color) -> Self {
            Self {
                triangles,
                color,
                discard: false,
                invocations: 0,
            }
        }
    }

    impl Shader for FlatShader {
        fn vertex(&mut self, face: usize, slot: usize) -> Vector4<f32> {
            self.triangles[face][slot]
        }

        fn fragment(&mut self, _bar: Vector3<f32>) -> Option<Color> {
            self.invocations += 1;
            (!self.discard).then_some(self.color)
        }
    }

    fn tri(points: [(f32, f32, f32); 3]) -> [Vector4<f32>; 3] {
        points.map(|(x, y, z)| Vector4::new(x, y, z, 1.0))
    }

    #[test]
    fn test_barycentric_weights() {
        let bar = barycentric(
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
            Vector2::new(0.0, 4.0),
            Vector2::new(1.0, 1.0),
        )
        .unwrap();
        assert!((bar - Vector3::new(0.5, 0.25, 0.25)).norm() < 1e-6);
        assert!(barycentric(
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(1.0, 0.0)
        )
        .is_none());
    }

    #[test]
    fn test_fills_half_square() {
        let mut color = FrameBuffer::new(4, 4);
        let mut depth = DepthBuffer::new(4, 4);
        let mut shader = FlatShader::new(vec![tri([(0.0, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)])], Color::WHITE);

        let written = draw_faces(1, &mut shader, &mut color, &mut depth);
        // Pixel centers strictly below the diagonal, plus those on it
        assert_eq!(written, 10);
        assert_eq!(color.get(0, 0), Some(Color::WHITE));
        assert_eq!(color.get(3, 3), Some(Color::BLACK));
        assert_eq!(depth.covered(), 10);
    }

    #[test]
    fn test_closer_triangle_wins_regardless_of_order() {
        let near = tri([(0.0, 0.0, 10.0), (8.0, 0.0, 10.0), (0.0, 8.0, 10.0)]);
        let far = tri([(0.0, 0.0, 50.0), (8.0, 0.0, 50.0), (0.0, 8.0, 50.0)]);

        for order in [vec![near, far], vec![far, near]] {
            let mut color = FrameBuffer::new(8, 8);
            let mut depth = DepthBuffer::new(8, 8);
            let mut first = FlatShader::new(vec![order[0]], Color::new(1, 0, 0));
            let mut second = FlatShader::new(vec![order[1]], Color::new(0, 1, 0));
            draw_faces(1, &mut first, &mut color, &mut depth);
            draw_faces(1, &mut second, &mut color, &mut depth);

            assert_eq!(depth.get(1, 1), Some(10.0));
            let expected = if order[0] == near { Color::new(1, 0, 0) } else { Color::new(0, 1, 0) };
            assert_eq!(color.get(1, 1), Some(expected));
        }
    }

    #[test]
    fn test_equal_depth_keeps_first() {
        let t = tri([(0.0, 0.0, 5.0), (8.0, 0.0, 5.0), (0.0, 8.0, 5.0)]);
        let mut color = FrameBuffer::new(8, 8);
        let mut depth = DepthBuffer::new(8, 8);
        draw_faces(1, &mut FlatShader::new(vec![t], Color::new(1, 0, 0)), &mut color, &mut depth);
        let written = draw_faces(1, &mut FlatShader::new(vec![t], Color::new(0, 1, 0)), &mut color, &mut depth);
        assert_eq!(written, 0);
        assert_eq!(color.get(0, 0), Some(Color::new(1, 0, 0)));
    }

    #[test]
    fn test_depth_never_increases() {
        let triangles = vec![
            tri([(0.0, 0.0, 30.0), (16.0, 0.0, 80.0), (0.0, 16.0, 10.0)]),
            tri([(2.0, 1.0, 60.0), (15.0, 3.0, 5.0), (4.0, 14.0, 40.0)]),
            tri([(16.0, 16.0, 20.0), (0.0, 10.0, 20.0), (10.0, 0.0, 90.0)]),
        ];
        let mut color = FrameBuffer::new(16, 16);
        let mut depth = DepthBuffer::new(16, 16);
        let mut shader = FlatShader::new(triangles, Color::WHITE);

        for face in 0..3 {
            let before = depth.values().to_vec();
            let clip = [shader.vertex(face, 0), shader.vertex(face, 1), shader.vertex(face, 2)];
            rasterize(&clip, &mut shader, &mut color, &mut depth);
            assert!(depth.values().iter().zip(&before).all(|(after, before)| after <= before));
        }
    }

    #[test]
    fn test_discard_leaves_buffers_untouched() {
        let mut color = FrameBuffer::new(4, 4);
        let mut depth = DepthBuffer::new(4, 4);
        let mut shader = FlatShader::new(vec![tri([(0.0, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)])], Color::WHITE);
        shader.discard = true;

        assert_eq!(draw_faces(1, &mut shader, &mut color, &mut depth), 0);
        assert!(shader.invocations > 0);
        assert_eq!(depth.covered(), 0);
        assert!(color.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_offscreen_and_degenerate_triangles() {
        let mut color = FrameBuffer::new(4, 4);
        let mut depth = DepthBuffer::new(4, 4);

        let huge = tri([(-100.0, -100.0, 1.0), (100.0, -100.0, 1.0), (-100.0, 100.0, 1.0)]);
        let mut shader = FlatShader::new(vec![huge], Color::WHITE);
        assert_eq!(draw_faces(1, &mut shader, &mut color, &mut depth), 16);

        let mut depth = DepthBuffer::new(4, 4);
        let behind = [
            Vector4::new(0.0, 0.0, 1.0, 0.0),
            Vector4::new(4.0, 0.0, 1.0, 1.0),
            Vector4::new(0.0, 4.0, 1.0, 1.0),
        ];
        let nan = tri([(f32::NAN, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)]);
        let line = tri([(0.0, 0.0, 1.0), (2.0, 2.0, 1.0), (4.0, 4.0, 1.0)]);
        for t in [behind, nan, line] {
            let mut shader = FlatShader::new(vec![t], Color::WHITE);
            assert_eq!(draw_faces(1, &mut shader, &mut color, &mut depth), 0);
            assert_eq!(shader.invocations, 0);
        }
    }
}
