/// Scene nodes and the handles that address them inside a scene arena
use std::fmt;
use std::rc::Rc;

use nalgebra::{Matrix4, Vector3};

use crate::mesh::Mesh;
use crate::transform::Transform;

/// Generational handle to a node stored in a [`Scene`](crate::Scene).
///
/// A handle to a deleted node never resolves again, even after its slot is
/// reused by a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// What a node carries. Only `Empty` and `Mesh` take part in rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Mesh,
    Light,
    Camera,
}

/// A named element of the scene tree
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent
    pub local: Transform,
    pub visible: bool,
    pub(crate) selected: bool,
    pub(crate) kind: NodeKind,
    pub(crate) mesh: Option<Rc<Mesh>>,
    pub(crate) world: Transform,
    pub(crate) world_matrix: Matrix4<f32>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            local: Transform::identity(),
            visible: true,
            selected: false,
            kind,
            mesh: None,
            world: Transform::identity(),
            world_matrix: Matrix4::identity(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn mesh(&self) -> Option<&Rc<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn attach_mesh(&mut self, mesh: Rc<Mesh>) {
        self.mesh = Some(mesh);
        self.kind = NodeKind::Mesh;
    }

    /// Local matrix, composed from the local transform on every call
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.local.matrix()
    }

    /// World matrix cached by the last propagation.
    ///
    /// Stale after an edit to this node or any ancestor until
    /// [`Scene::update_world_transforms`](crate::Scene::update_world_transforms) runs.
    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world_matrix
    }

    /// Decomposed world placement. Lossy; render with [`Self::world_matrix`].
    pub fn world_transform(&self) -> &Transform {
        &self.world
    }

    pub fn world_position(&self) -> Vector3<f32> {
        self.world.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.local.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.local.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.local.scale = scale;
    }

    /// Store a freshly propagated world matrix and its decomposition
    pub(crate) fn apply_world(&mut self, world: Matrix4<f32>) {
        self.world_matrix = world;
        self.world.update_from_matrix(&world);
    }
}
