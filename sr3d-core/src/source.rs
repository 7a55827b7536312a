/// Mesh suppliers: the boundary between the scene and asset storage
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MeshError;
use crate::mesh::Mesh;
use crate::texture::Texture;
use crate::{obj, stl};

/// Identifier prefix for meshes generated in code
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Produces meshes from a source identifier (usually a file path)
pub trait MeshSource {
    fn load(&self, path: &str) -> Result<Mesh, MeshError>;
}

/// Loads meshes from disk, plus the procedural `builtin:` meshes.
///
/// OBJ files pick up texture maps stored next to them as
/// `<stem>_diffuse`, `<stem>_nm` and `<stem>_spec` with a `.tga` or `.png`
/// extension. Missing maps are not an error.
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    root: Option<PathBuf>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) if Path::new(path).is_relative() => root.join(path),
            _ => PathBuf::from(path),
        }
    }

    fn builtin(name: &str) -> Result<Mesh, MeshError> {
        match name {
            "cube" => Ok(Mesh::cube(1.0)),
            "plane" => Ok(Mesh::plane(4.0)),
            other => Err(MeshError::UnsupportedFormat(format!("{BUILTIN_PREFIX}{other}"))),
        }
    }

    fn load_obj(path: &Path) -> Result<Mesh, MeshError> {
        let text = fs::read_to_string(path).map_err(|source| MeshError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut mesh = obj::parse_obj(&text)?;
        mesh.diffuse_map = sibling_texture(path, "_diffuse");
        mesh.normal_map = sibling_texture(path, "_nm");
        mesh.specular_map = sibling_texture(path, "_spec");
        Ok(mesh)
    }

    fn load_stl(path: &Path) -> Result<Mesh, MeshError> {
        let data = fs::read(path).map_err(|source| MeshError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        stl::parse_stl(&data)
    }
}

impl MeshSource for AssetLoader {
    fn load(&self, path: &str) -> Result<Mesh, MeshError> {
        if let Some(name) = path.strip_prefix(BUILTIN_PREFIX) {
            return Self::builtin(name);
        }

        let resolved = self.resolve(path);
        let extension = resolved
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mesh = match extension.as_deref() {
            Some("obj") => Self::load_obj(&resolved)?,
            Some("stl") => Self::load_stl(&resolved)?,
            _ => return Err(MeshError::UnsupportedFormat(path.to_string())),
        };

        tracing::info!(
            "loaded {}: {} vertices, {} faces",
            resolved.display(),
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(mesh)
    }
}

/// In-memory meshes keyed by identifier, handy for procedural content
impl MeshSource for HashMap<String, Mesh> {
    fn load(&self, path: &str) -> Result<Mesh, MeshError> {
        self.get(path)
            .cloned()
            .ok_or_else(|| MeshError::UnsupportedFormat(path.to_string()))
    }
}

fn sibling_texture(mesh_path: &Path, suffix: &str) -> Option<Texture> {
    let stem = mesh_path.file_stem()?.to_string_lossy();
    let candidates = ["tga", "png"].map(|ext| mesh_path.with_file_name(format!("{stem}{suffix}.{ext}")));

    let Some(found) = candidates.iter().find(|p| p.exists()) else {
        tracing::warn!("no {suffix} texture next to {}", mesh_path.display());
        return None;
    };

    match Texture::load(found) {
        Ok(texture) => {
            tracing::debug!("texture {} loaded ({}x{})", found.display(), texture.width(), texture.height());
            Some(texture)
        }
        Err(e) => {
            tracing::warn!("texture {} failed: {e}", found.display());
            None
        }
    }
}
