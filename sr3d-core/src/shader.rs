/// Per-draw shading strategies
///
/// A [`Shader`] is driven by the rasterizer: `vertex` runs once per corner of
/// a triangle (slots 0, 1, 2, in order) and caches whatever the fragment stage
/// needs; `fragment` then runs for each covered pixel with that pixel's
/// barycentric weights and interpolates the cached varyings itself.
use nalgebra::{Matrix2x3, Matrix3, Matrix4, Point2, Vector3, Vector4};

use crate::buffer::DepthBuffer;
use crate::camera::Light;
use crate::color::Color;
use crate::config::ShadingConfig;
use crate::mesh::Mesh;
use crate::pipeline::PassContext;

pub trait Shader {
    /// Clip-space position of corner `slot` of face `face`
    fn vertex(&mut self, face: usize, slot: usize) -> Vector4<f32>;

    /// Color for the pixel at `bar`, or `None` to discard it
    fn fragment(&mut self, bar: Vector3<f32>) -> Option<Color>;
}

/// Light-pass shader: records the closest depth per pixel into the shadow buffer
pub struct DepthShader<'a> {
    mesh: &'a Mesh,
    transform: Matrix4<f32>,
    shadow: &'a mut DepthBuffer,
    varying_tri: Matrix3<f32>,
}

impl<'a> DepthShader<'a> {
    /// `transform` is the light pass's object-to-screen matrix for the mesh's node
    pub fn new(mesh: &'a Mesh, transform: Matrix4<f32>, shadow: &'a mut DepthBuffer) -> Self {
        Self {
            mesh,
            transform,
            shadow,
            varying_tri: Matrix3::zeros(),
        }
    }
}

impl Shader for DepthShader<'_> {
    fn vertex(&mut self, face: usize, slot: usize) -> Vector4<f32> {
        let clip = self.transform * self.mesh.vertex(face, slot).to_homogeneous();
        self.varying_tri.set_column(slot, &(clip.xyz() / clip.w));
        clip
    }

    fn fragment(&mut self, bar: Vector3<f32>) -> Option<Color> {
        let p = self.varying_tri * bar;
        if p.x >= 0.0 && p.y >= 0.0 {
            self.shadow.store_min(p.x as usize, p.y as usize, p.z);
        }
        Some(Color::gray(p.z))
    }
}

/// Camera-pass uniforms for [`PhongShadowShader`]
#[derive(Debug, Clone, Copy)]
pub struct PhongUniforms {
    pub model_view: Matrix4<f32>,
    /// Inverse-transpose of `model_view`, for normals
    pub model_view_it: Matrix4<f32>,
    /// Camera-pass screen space to light-pass screen space
    pub shadow_transform: Matrix4<f32>,
    /// Eye-space unit vector towards the light
    pub light: Vector3<f32>,
    pub radiance: Vector3<f32>,
}

impl PhongUniforms {
    pub fn new(pass: &PassContext, world: &Matrix4<f32>, shadow_transform: Matrix4<f32>, light: &Light) -> Self {
        let model_view = pass.model_view(world);
        let model_view_it = model_view
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or_else(|| {
                tracing::debug!("singular model-view, normals left untransformed");
                Matrix4::identity()
            });
        let light_eye = (pass.view * light.direction().to_homogeneous()).xyz();

        Self {
            model_view,
            model_view_it,
            shadow_transform,
            light: light_eye.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z),
            radiance: light.radiance(),
        }
    }
}

/// Camera-pass shader: shadow-map test plus Phong reflection
pub struct PhongShadowShader<'a> {
    mesh: &'a Mesh,
    transform: Matrix4<f32>,
    uniforms: PhongUniforms,
    shading: &'a ShadingConfig,
    /// `None` disables the shadow test
    shadow: Option<&'a DepthBuffer>,
    varying_uv: Matrix2x3<f32>,
    varying_normal: Matrix3<f32>,
    varying_tri: Matrix3<f32>,
}

impl<'a> PhongShadowShader<'a> {
    pub fn new(
        mesh: &'a Mesh,
        transform: Matrix4<f32>,
        uniforms: PhongUniforms,
        shading: &'a ShadingConfig,
        shadow: Option<&'a DepthBuffer>,
    ) -> Self {
        Self {
            mesh,
            transform,
            uniforms,
            shading,
            shadow,
            varying_uv: Matrix2x3::zeros(),
            varying_normal: Matrix3::zeros(),
            varying_tri: Matrix3::zeros(),
        }
    }

    /// 1.0 when lit, `shadowed_factor` when the light pass saw something closer
    fn shadow_factor(&self, screen: &Vector3<f32>) -> f32 {
        let Some(buffer) = self.shadow else {
            return 1.0;
        };
        let sb = self.uniforms.shadow_transform * screen.push(1.0);
        let sb = sb.xyz() / sb.w;

        match buffer.sample(sb.x, sb.y) {
            Some(closest) if sb.z > closest + self.shading.shadow_bias => self.shading.shadowed_factor,
            _ => 1.0,
        }
    }
}

impl Shader for PhongShadowShader<'_> {
    fn vertex(&mut self, face: usize, slot: usize) -> Vector4<f32> {
        let uv = self.mesh.uv(face, slot);
        self.varying_uv.set_column(slot, &uv.coords);
        self.varying_normal.set_column(slot, &self.mesh.normal(face, slot));

        let clip = self.transform * self.mesh.vertex(face, slot).to_homogeneous();
        self.varying_tri.set_column(slot, &(clip.xyz() / clip.w));
        clip
    }

    fn fragment(&mut self, bar: Vector3<f32>) -> Option<Color> {
        let shadow = self.shadow_factor(&(self.varying_tri * bar));

        let uv = Point2::from(self.varying_uv * bar);
        let object_normal = self
            .mesh
            .normal_at(uv)
            .unwrap_or_else(|| self.varying_normal * bar);
        let n = (self.uniforms.model_view_it * object_normal.to_homogeneous())
            .xyz()
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);
        let l = self.uniforms.light;
        let r = (n * (n.dot(&l) * 2.0) - l)
            .try_normalize(f32::EPSILON)
            .unwrap_or(n);

        let exponent = self
            .mesh
            .specular(uv)
            .unwrap_or(self.shading.default_specular_exponent);
        let spec = r.z.max(0.0).powf(exponent);
        let diff = n.dot(&l).max(0.0);
        let lit = self.shading.diffuse * diff + self.shading.specular * spec;

        let base = self.mesh.diffuse(uv).to_array();
        let radiance = self.uniforms.radiance;
        let channel = |i: usize| {
            (self.shading.ambient + base[i] as f32 * shadow * radiance[i] * lit).clamp(0.0, 255.0) as u8
        };
        Some(Color::new(channel(0), channel(1), channel(2)))
    }
}
