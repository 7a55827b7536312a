/// Mesh resources shared between scene nodes
use nalgebra::{Point2, Point3, Vector3};

use crate::color::Color;
use crate::texture::Texture;

/// Diffuse color used when a mesh has no diffuse map
pub const DEFAULT_DIFFUSE: Color = Color::new(200, 200, 200);

/// Indices of one face corner into the mesh attribute arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize, uv: Option<usize>, normal: Option<usize>) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// Triangle mesh with optional texture maps.
///
/// Faces are always triangles; loaders fan-triangulate polygons.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    positions: Vec<Point3<f32>>,
    uvs: Vec<Point2<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<[FaceVertex; 3]>,
    pub diffuse_map: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub specular_map: Option<Texture>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(positions: usize, faces: usize) -> Self {
        Self {
            positions: Vec::with_capacity(positions),
            faces: Vec::with_capacity(faces),
            ..Self::default()
        }
    }

    pub fn push_position(&mut self, position: Point3<f32>) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    pub fn push_uv(&mut self, uv: Point2<f32>) -> usize {
        self.uvs.push(uv);
        self.uvs.len() - 1
    }

    pub fn push_normal(&mut self, normal: Vector3<f32>) -> usize {
        self.normals.push(normal);
        self.normals.len() - 1
    }

    pub fn push_face(&mut self, face: [FaceVertex; 3]) {
        self.faces.push(face);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn faces(&self) -> &[[FaceVertex; 3]] {
        &self.faces
    }

    /// Position of corner `slot` (0..3) of face `face`
    pub fn vertex(&self, face: usize, slot: usize) -> Point3<f32> {
        self.positions[self.faces[face][slot].position]
    }

    /// Texture coordinate of a face corner; faces without UVs map to the origin
    pub fn uv(&self, face: usize, slot: usize) -> Point2<f32> {
        self.faces[face][slot]
            .uv
            .and_then(|i| self.uvs.get(i).copied())
            .unwrap_or_else(Point2::origin)
    }

    /// Normal of a face corner, falling back to the flat face normal
    pub fn normal(&self, face: usize, slot: usize) -> Vector3<f32> {
        self.faces[face][slot]
            .normal
            .and_then(|i| self.normals.get(i))
            .map(|n| n.normalize())
            .unwrap_or_else(|| self.face_normal(face))
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn face_normal(&self, face: usize) -> Vector3<f32> {
        let v0 = self.vertex(face, 0);
        let v1 = self.vertex(face, 1);
        let v2 = self.vertex(face, 2);

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z)
    }

    pub fn diffuse(&self, uv: Point2<f32>) -> Color {
        self.diffuse_map
            .as_ref()
            .map_or(DEFAULT_DIFFUSE, |map| map.sample(uv))
    }

    /// Object-space normal decoded from the normal map, if present
    pub fn normal_at(&self, uv: Point2<f32>) -> Option<Vector3<f32>> {
        self.normal_map.as_ref().map(|map| {
            let c = map.sample(uv);
            Vector3::new(c.r as f32, c.g as f32, c.b as f32) / 255.0 * 2.0 - Vector3::repeat(1.0)
        })
    }

    /// Specular exponent from the specular map's first channel
    pub fn specular(&self, uv: Point2<f32>) -> Option<f32> {
        self.specular_map.as_ref().map(|map| map.sample(uv).r as f32)
    }

    /// Axis-aligned bounds of all positions
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    /// Append a quad as two triangles sharing one normal and unit UVs
    fn push_quad(&mut self, corners: [Point3<f32>; 4], normal: Vector3<f32>) {
        let n = self.push_normal(normal);
        let base_uv = self.uvs.len();
        for uv in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            self.push_uv(Point2::new(uv.0, uv.1));
        }
        let base = self.positions.len();
        for corner in corners {
            self.push_position(corner);
        }
        let corner = |i: usize| FaceVertex::new(base + i, Some(base_uv + i), Some(n));
        self.push_face([corner(0), corner(1), corner(2)]);
        self.push_face([corner(0), corner(2), corner(3)]);
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let p = Point3::new;
        let mut mesh = Self::with_capacity(24, 12);

        // Front face
        mesh.push_quad([p(-h, -h, h), p(h, -h, h), p(h, h, h), p(-h, h, h)], Vector3::z());
        // Back face
        mesh.push_quad([p(h, -h, -h), p(-h, -h, -h), p(-h, h, -h), p(h, h, -h)], -Vector3::z());
        // Top face
        mesh.push_quad([p(-h, h, h), p(h, h, h), p(h, h, -h), p(-h, h, -h)], Vector3::y());
        // Bottom face
        mesh.push_quad([p(-h, -h, -h), p(h, -h, -h), p(h, -h, h), p(-h, -h, h)], -Vector3::y());
        // Right face
        mesh.push_quad([p(h, -h, h), p(h, -h, -h), p(h, h, -h), p(h, h, h)], Vector3::x());
        // Left face
        mesh.push_quad([p(-h, -h, -h), p(-h, -h, h), p(-h, h, h), p(-h, h, -h)], -Vector3::x());

        mesh
    }

    /// Horizontal square in the XZ plane facing +Y
    pub fn plane(size: f32) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(4, 2);
        mesh.push_quad(
            [
                Point3::new(-h, 0.0, h),
                Point3::new(h, 0.0, h),
                Point3::new(h, 0.0, -h),
                Point3::new(-h, 0.0, -h),
            ],
            Vector3::y(),
        );
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.face_count(), 12);
        assert_eq!(cube.vertex_count(), 24);
    }

    #[test]
    fn test_cube_normals_point_outward() {
        let cube = Mesh::cube(2.0);
        for face in 0..cube.face_count() {
            let centroid = (0..3)
                .map(|slot| cube.vertex(face, slot).coords)
                .sum::<Vector3<f32>>()
                / 3.0;
            assert!(cube.face_normal(face).dot(&centroid) > 0.0);
            assert!((cube.normal(face, 0) - cube.face_normal(face)).norm() < 1e-5);
        }
    }

    #[test]
    fn test_missing_attributes_fall_back() {
        let mut mesh = Mesh::new();
        let a = mesh.push_position(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.push_position(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.push_position(Point3::new(0.0, 1.0, 0.0));
        mesh.push_face([
            FaceVertex::new(a, None, None),
            FaceVertex::new(b, None, None),
            FaceVertex::new(c, None, None),
        ]);

        assert_eq!(mesh.uv(0, 1), Point2::origin());
        assert!((mesh.normal(0, 2) - Vector3::z()).norm() < 1e-6);
        assert_eq!(mesh.diffuse(Point2::new(0.5, 0.5)), DEFAULT_DIFFUSE);
        assert!(mesh.normal_at(Point2::new(0.5, 0.5)).is_none());
        assert!(mesh.specular(Point2::new(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_normal_map_decoding() {
        let mut mesh = Mesh::plane(1.0);
        mesh.normal_map = Some(Texture::solid(Color::new(128, 255, 128)));
        let n = mesh.normal_at(Point2::new(0.3, 0.3)).unwrap();
        assert!((n - Vector3::new(0.0, 1.0, 0.0)).norm() < 0.01);
    }

    #[test]
    fn test_bounds() {
        let (lo, hi) = Mesh::cube(2.0).bounds().unwrap();
        assert_eq!(lo, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(hi, Point3::new(1.0, 1.0, 1.0));
        assert!(Mesh::new().bounds().is_none());
    }
}
