/// Two-pass shadow-mapped frame rendering
///
/// A frame is drawn in two passes over the visible mesh nodes of a scene:
///
/// 1. the light pass renders depth from the light's point of view into the
///    shadow buffer,
/// 2. the camera pass shades every pixel with [`PhongShadowShader`], testing
///    it against the shadow buffer through the per-node shadow transform.
///
/// World matrices are read as stored on the nodes; call
/// [`Scene::update_world_transforms`] before rendering after any edit.
use nalgebra::Matrix4;

use crate::buffer::{DepthBuffer, FrameBuffer};
use crate::color::Color;
use crate::config::RenderConfig;
use crate::pipeline::{self, PassContext};
use crate::raster;
use crate::scene::Scene;
use crate::shader::{DepthShader, PhongShadowShader, PhongUniforms};

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Visible mesh nodes drawn
    pub nodes: usize,
    /// Triangles submitted to the camera pass
    pub triangles: usize,
    /// Pixels written by the camera pass
    pub fragments: usize,
    /// Pixels written by the light pass
    pub shadow_fragments: usize,
}

/// Result of a finished light pass, consumed by [`Renderer::camera_pass`]
#[derive(Debug)]
pub struct LightPass {
    pass: PassContext,
    fragments: usize,
}

impl LightPass {
    /// `viewport * projection * view` of the light
    pub fn transform(&self) -> Matrix4<f32> {
        self.pass.transform()
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }
}

pub struct Renderer {
    config: RenderConfig,
    frame: FrameBuffer,
    depth: DepthBuffer,
    shadow: DepthBuffer,
    scratch: FrameBuffer,
    scratch_depth: DepthBuffer,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let (w, h) = (config.width, config.height);
        Self {
            config,
            frame: FrameBuffer::new(w, h),
            depth: DepthBuffer::new(w, h),
            shadow: DepthBuffer::new(w, h),
            scratch: FrameBuffer::new(w, h),
            scratch_depth: DepthBuffer::new(w, h),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the configuration, reallocating buffers if the size changed
    pub fn set_config(&mut self, config: RenderConfig) {
        let resized = config.width != self.config.width || config.height != self.config.height;
        self.config = config;
        if resized {
            self.allocate();
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.config.width && height == self.config.height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.allocate();
        tracing::debug!("render buffers resized to {width}x{height}");
    }

    fn allocate(&mut self) {
        let (w, h) = (self.config.width, self.config.height);
        self.frame = FrameBuffer::new(w, h);
        self.depth = DepthBuffer::new(w, h);
        self.shadow = DepthBuffer::new(w, h);
        self.scratch = FrameBuffer::new(w, h);
        self.scratch_depth = DepthBuffer::new(w, h);
    }

    /// The last rendered image
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn shadow_buffer(&self) -> &DepthBuffer {
        &self.shadow
    }

    /// Render a complete frame
    pub fn render(&mut self, scene: &Scene) -> FrameStats {
        self.begin_frame(scene);
        let light = self.config.shadows.then(|| self.light_pass(scene));
        let stats = self.camera_pass(scene, light);
        tracing::trace!(
            "frame: {} nodes, {} triangles, {} fragments, {} shadow fragments",
            stats.nodes,
            stats.triangles,
            stats.fragments,
            stats.shadow_fragments
        );
        stats
    }

    /// Composite the background and reset the shadow buffer
    pub fn begin_frame(&mut self, scene: &Scene) {
        match scene.background() {
            Some(image) if !image.is_empty() => self.frame.blit(image),
            _ => self.frame.clear(Color::from_array(self.config.background)),
        }
        self.shadow.clear();
    }

    /// Fill the shadow buffer with the closest depths seen from the light
    pub fn light_pass(&mut self, scene: &Scene) -> LightPass {
        self.scratch.clear(Color::BLACK);
        self.scratch_depth.clear();
        let pass = PassContext::for_light(&scene.light, &scene.camera.up, &self.config);

        let mut fragments = 0;
        for id in scene.visible_mesh_nodes() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let mut shader = DepthShader::new(mesh, pass.model_transform(node.world_matrix()), &mut self.shadow);
            fragments += raster::draw_faces(
                mesh.face_count(),
                &mut shader,
                &mut self.scratch,
                &mut self.scratch_depth,
            );
        }
        LightPass { pass, fragments }
    }

    /// Shade the visible mesh nodes into the frame.
    ///
    /// Without a [`LightPass`] every fragment is treated as lit.
    pub fn camera_pass(&mut self, scene: &Scene, light: Option<LightPass>) -> FrameStats {
        self.depth.clear();
        let pass = PassContext::for_camera(&scene.camera, &self.config);
        let shadow = light.as_ref().map(|_| &self.shadow);

        let mut stats = FrameStats {
            shadow_fragments: light.as_ref().map_or(0, LightPass::fragments),
            ..FrameStats::default()
        };
        for id in scene.visible_mesh_nodes() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let world = node.world_matrix();
            let camera_model = pass.model_transform(world);
            let shadow_transform = match &light {
                Some(light) => pipeline::shadow_transform(&light.pass.model_transform(world), &camera_model),
                None => Matrix4::identity(),
            };
            let uniforms = PhongUniforms::new(&pass, world, shadow_transform, &scene.light);

            let mut shader = PhongShadowShader::new(mesh, camera_model, uniforms, &self.config.shading, shadow);
            stats.fragments += raster::draw_faces(mesh.face_count(), &mut shader, &mut self.frame, &mut self.depth);
            stats.triangles += mesh.face_count();
            stats.nodes += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, Light};
    use crate::source::AssetLoader;
    use crate::texture::Texture;
    use nalgebra::Vector3;

    /// Plane on the ground, a cube floating above it, camera looking straight
    /// down (orthographic) and the light coming in from +x at 45 degrees.
    ///
    /// With a 64x64 frame, world `(x, 0, z)` lands on pixel `(32 + 24x, 32 + 24z)`.
    fn shadow_scene() -> Scene {
        let loader = AssetLoader::new();
        let mut scene = Scene::new();
        scene.create_mesh_node(&loader, "builtin:plane", None).unwrap();
        let cube = scene.create_mesh_node(&loader, "builtin:cube", None).unwrap();
        scene.node_mut(cube).unwrap().set_position(Vector3::new(0.0, 1.0, 0.0));
        scene.update_world_transforms();

        scene.camera = Camera::new(Vector3::new(0.0, 5.0, 0.0), Vector3::zeros(), -Vector3::z());
        scene.camera.fov = 0.0;
        scene.light = Light::new(Vector3::new(1.0, 1.0, 0.0));
        scene
    }

    fn config() -> RenderConfig {
        RenderConfig::default().with_size(64, 64)
    }

    #[test]
    fn test_empty_scene_is_background() {
        let mut renderer = Renderer::new(config());
        let stats = renderer.render(&Scene::new());

        assert_eq!(stats, FrameStats::default());
        let bg = Color::from_array(renderer.config().background);
        assert_eq!(renderer.frame().get(0, 0), Some(bg));
        assert_eq!(renderer.frame().get(63, 63), Some(bg));
        assert_eq!(renderer.depth().covered(), 0);
    }

    #[test]
    fn test_background_image_is_blitted() {
        let mut scene = Scene::new();
        scene.set_background(Texture::solid(Color::new(10, 200, 30)));
        let mut renderer = Renderer::new(config());
        renderer.render(&scene);
        assert_eq!(renderer.frame().get(17, 40), Some(Color::new(10, 200, 30)));

        scene.clear_background();
        renderer.render(&scene);
        assert_eq!(
            renderer.frame().get(17, 40),
            Some(Color::from_array(renderer.config().background))
        );
    }

    #[test]
    fn test_cube_casts_shadow_on_plane() {
        let scene = shadow_scene();
        let mut renderer = Renderer::new(config());
        let stats = renderer.render(&scene);

        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.triangles, 14);
        assert!(stats.shadow_fragments > 0);

        // x = -1.2 is in the cube's shadow, x = +1.2 is not
        let shadowed = renderer.frame().get(3, 32).unwrap();
        let lit = renderer.frame().get(60, 32).unwrap();
        assert!(lit.r > shadowed.r + 40, "lit {lit:?} vs shadowed {shadowed:?}");
        assert!(shadowed.r >= renderer.config().shading.ambient as u8);
    }

    #[test]
    fn test_perspective_camera_keeps_shadow() {
        let mut scene = shadow_scene();
        scene.camera.fov = 1.0;
        assert!(!scene.camera.is_orthographic());
        let mut renderer = Renderer::new(config());
        renderer.render(&scene);

        // The ground sits on the target plane, so it projects as before
        let shadowed = renderer.frame().get(3, 32).unwrap();
        let lit = renderer.frame().get(60, 32).unwrap();
        assert!(lit.r > shadowed.r + 40, "lit {lit:?} vs shadowed {shadowed:?}");
        assert!(shadowed.r >= renderer.config().shading.ambient as u8);
    }

    #[test]
    fn test_empty_background_falls_back_to_color() {
        let mut scene = Scene::new();
        scene.set_background(Texture::from_texels(0, 0, vec![]));
        let mut renderer = Renderer::new(RenderConfig::default().with_size(4, 4));
        renderer.render(&scene);
        assert_eq!(
            renderer.frame().get(2, 1),
            Some(Color::from_array(renderer.config().background))
        );
    }

    #[test]
    fn test_disabled_shadows_light_everything() {
        let scene = shadow_scene();
        let mut config = config();
        config.shadows = false;
        let mut renderer = Renderer::new(config);
        let stats = renderer.render(&scene);

        assert_eq!(stats.shadow_fragments, 0);
        assert_eq!(renderer.shadow_buffer().covered(), 0);
        assert_eq!(renderer.frame().get(3, 32), renderer.frame().get(60, 32));
    }

    #[test]
    fn test_hidden_node_casts_no_shadow() {
        let mut scene = shadow_scene();
        let cube = scene.find_node("cube").unwrap();
        scene.node_mut(cube).unwrap().visible = false;

        let mut renderer = Renderer::new(config());
        let stats = renderer.render(&scene);
        assert_eq!(stats.nodes, 1);
        assert_eq!(renderer.frame().get(3, 32), renderer.frame().get(60, 32));
    }

    #[test]
    fn test_frames_are_repeatable() {
        let scene = shadow_scene();
        let mut renderer = Renderer::new(config());
        renderer.render(&scene);
        let first = renderer.frame().as_bytes().to_vec();
        let first_shadow = renderer.shadow_buffer().values().to_vec();
        renderer.render(&scene);
        assert_eq!(renderer.frame().as_bytes(), &first[..]);
        assert_eq!(renderer.shadow_buffer().values(), &first_shadow[..]);
    }

    #[test]
    fn test_shadow_buffer_only_written_by_light_pass() {
        let scene = shadow_scene();
        let mut renderer = Renderer::new(config());
        renderer.begin_frame(&scene);
        let light = renderer.light_pass(&scene);
        let after_light = renderer.shadow_buffer().values().to_vec();
        assert!(light.fragments() > 0);

        renderer.camera_pass(&scene, Some(light));
        assert_eq!(renderer.shadow_buffer().values(), &after_light[..]);
    }

    #[test]
    fn test_resize_reallocates() {
        let mut renderer = Renderer::new(config());
        renderer.resize(32, 16);
        assert_eq!(renderer.frame().width(), 32);
        assert_eq!(renderer.frame().height(), 16);
        assert_eq!(renderer.shadow_buffer().width(), 32);

        renderer.set_config(RenderConfig::default().with_size(8, 8));
        assert_eq!(renderer.depth().height(), 8);
        let stats = renderer.render(&shadow_scene());
        assert!(stats.fragments > 0);
    }
}
