/// SR3D Core Library - Scene graph and shadow-mapped software rasterizer
///
/// This library turns a hierarchy of transformable, optionally mesh-bearing
/// scene nodes into a shaded, shadowed RGB image on the CPU: transform
/// propagation, a two-pass shadow-mapping pipeline, pluggable shaders and a
/// barycentric rasterizer, plus OBJ/STL mesh loading.

pub mod buffer;
pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod mesh;
pub mod node;
pub mod obj;
pub mod pipeline;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod source;
pub mod stl;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use buffer::{DepthBuffer, FrameBuffer};
pub use camera::{Camera, Light, OrbitRig};
pub use color::Color;
pub use config::{RenderConfig, ShadingConfig};
pub use error::{ConfigError, MeshError, SceneError};
pub use mesh::{FaceVertex, Mesh};
pub use node::{NodeId, NodeKind, SceneNode};
pub use pipeline::PassContext;
pub use renderer::{FrameStats, LightPass, Renderer};
pub use scene::Scene;
pub use shader::{DepthShader, PhongShadowShader, PhongUniforms, Shader};
pub use source::{AssetLoader, MeshSource};
pub use texture::Texture;
pub use transform::Transform;
