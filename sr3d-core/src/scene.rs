/// Scene graph: node arena, shared mesh registry, camera, light and selection
///
/// Nodes live in a slot arena and are addressed by generational [`NodeId`]s.
/// The root node always exists and cannot be deleted. Meshes are loaded once
/// per source identifier and shared between every node that uses them.
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;
use std::rc::Rc;

use nalgebra::Matrix4;

use crate::camera::{Camera, Light};
use crate::error::{MeshError, SceneError};
use crate::mesh::Mesh;
use crate::node::{NodeId, NodeKind, SceneNode};
use crate::source::{MeshSource, BUILTIN_PREFIX};
use crate::texture::Texture;

const ROOT_NAME: &str = "Root";

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    meshes: HashMap<String, Rc<Mesh>>,
    selected: Option<NodeId>,
    background: Option<Texture>,
    pub camera: Camera,
    pub light: Light,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            meshes: HashMap::new(),
            selected: None,
            background: None,
            camera: Camera::default(),
            light: Light::default(),
        };
        scene.root = scene.insert(SceneNode::new(ROOT_NAME, NodeKind::Empty));
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Live nodes, including the root
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Distinct meshes held by the registry
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Registry entry for a source identifier
    pub fn mesh(&self, path: &str) -> Option<&Rc<Mesh>> {
        self.meshes.get(path)
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(SceneNode::parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.slots
            .iter()
            .filter_map(|slot| slot.node.as_ref())
            .any(|node| node.name == name)
    }

    /// `base`, or `base_1`, `base_2`, ... for the first name not in use
    fn unique_name(&self, base: &str) -> String {
        if !self.name_taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.name_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Load (or reuse) the mesh at `path` and add a node for it under the root.
    ///
    /// Without an explicit `name` the node is named after the file stem. On
    /// failure nothing is inserted.
    pub fn create_mesh_node(
        &mut self,
        source: &dyn MeshSource,
        path: &str,
        name: Option<&str>,
    ) -> Result<NodeId, SceneError> {
        let mesh = match self.meshes.get(path) {
            Some(mesh) => Rc::clone(mesh),
            None => {
                let mesh = source.load(path).inspect_err(|e| {
                    tracing::warn!("failed to load mesh {path}: {e}");
                })?;
                if mesh.vertex_count() == 0 {
                    tracing::warn!("mesh {path} has no vertices, node not created");
                    return Err(MeshError::Empty(path.to_string()).into());
                }
                let mesh = Rc::new(mesh);
                self.meshes.insert(path.to_string(), Rc::clone(&mesh));
                mesh
            }
        };

        let base = name.map(str::to_string).unwrap_or_else(|| default_node_name(path));
        let mut node = SceneNode::new(self.unique_name(&base), NodeKind::Mesh);
        node.attach_mesh(mesh);
        tracing::info!("created mesh node '{}' from {path}", node.name);

        let id = self.insert(node);
        self.attach(self.root, id);
        Ok(id)
    }

    /// Add a mesh-less node under the root, named `Empty` unless told otherwise
    pub fn create_empty_node(&mut self, name: Option<&str>) -> NodeId {
        let node = SceneNode::new(self.unique_name(name.unwrap_or("Empty")), NodeKind::Empty);
        tracing::info!("created empty node '{}'", node.name);
        let id = self.insert(node);
        self.attach(self.root, id);
        id
    }

    /// Delete a node and its whole subtree
    pub fn delete_node(&mut self, name: &str) -> Result<(), SceneError> {
        if self.node(self.root).is_some_and(|root| root.name == name) {
            return Err(SceneError::RootNotDeletable);
        }
        let id = self
            .find_node(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;

        let subtree = self.subtree(id);
        if self.selected.is_some_and(|s| subtree.contains(&s)) {
            self.selected = None;
        }
        self.detach(id);
        for node in subtree {
            self.release(node);
        }
        tracing::info!("deleted node '{name}'");
        Ok(())
    }

    /// Move `child` (with its subtree) below `parent`
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootNotDeletable);
        }
        let child_name = self.name_of(child)?;
        let parent_name = self.name_of(parent)?;
        if self.subtree(child).contains(&parent) {
            return Err(SceneError::WouldCycle {
                child: child_name,
                parent: parent_name,
            });
        }

        self.detach(child);
        self.attach(parent, child);
        tracing::info!("moved '{child_name}' under '{parent_name}'");
        Ok(())
    }

    /// Copy a node next to the original: same mesh, local transform and visibility.
    ///
    /// Children are not copied.
    pub fn duplicate_node(&mut self, name: &str) -> Result<NodeId, SceneError> {
        let id = self
            .find_node(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;
        let Some(original) = self.node(id) else {
            return Err(SceneError::NodeNotFound(name.to_string()));
        };

        let mut copy = SceneNode::new(self.unique_name(&original.name), original.kind);
        copy.local = original.local;
        copy.visible = original.visible;
        copy.mesh = original.mesh.clone();
        let parent = original.parent.unwrap_or(self.root);
        tracing::info!("duplicated '{name}' as '{}'", copy.name);

        let copy_id = self.insert(copy);
        self.attach(parent, copy_id);
        Ok(copy_id)
    }

    fn name_of(&self, id: NodeId) -> Result<String, SceneError> {
        self.node(id)
            .map(|node| node.name.clone())
            .ok_or_else(|| SceneError::NodeNotFound(id.to_string()))
    }

    /// `id` followed by all of its descendants
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                out.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Node named `name`, the root included
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        if self.node(self.root).is_some_and(|root| root.name == name) {
            return Some(self.root);
        }
        self.find_descendant(self.root, name)
    }

    /// Search below `start`: direct children are checked before descending
    pub fn find_descendant(&self, start: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(start)?;
        if let Some(&hit) = node
            .children
            .iter()
            .find(|&&c| self.node(c).is_some_and(|n| n.name == name))
        {
            return Some(hit);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_descendant(child, name))
    }

    /// Move the selection flag to `id`; `None` clears it
    pub fn select(&mut self, id: Option<NodeId>) {
        if let Some(previous) = self.selected.take() {
            if let Some(node) = self.node_mut(previous) {
                node.selected = false;
            }
        }
        if let Some(node) = id.and_then(|id| self.node_mut(id)) {
            node.selected = true;
            self.selected = id;
        }
    }

    pub fn select_by_name(&mut self, name: &str) -> Result<NodeId, SceneError> {
        let id = self
            .find_node(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;
        self.select(Some(id));
        Ok(id)
    }

    pub fn clear_selection(&mut self) {
        self.select(None);
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_node_mut(&mut self) -> Option<&mut SceneNode> {
        let id = self.selected?;
        self.node_mut(id)
    }

    /// Select the mesh node after the current one, wrapping around
    pub fn select_next(&mut self) -> Option<NodeId> {
        self.cycle_selection(1)
    }

    /// Select the mesh node before the current one, wrapping around
    pub fn select_previous(&mut self) -> Option<NodeId> {
        self.cycle_selection(-1)
    }

    fn cycle_selection(&mut self, step: isize) -> Option<NodeId> {
        let nodes = self.mesh_nodes();
        if nodes.is_empty() {
            self.select(None);
            return None;
        }
        let len = nodes.len() as isize;
        let next = match self.selected.and_then(|s| nodes.iter().position(|&n| n == s)) {
            Some(current) => (current as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        let id = nodes[next as usize];
        self.select(Some(id));
        Some(id)
    }

    /// Recompute every world matrix top-down from the root
    pub fn update_world_transforms(&mut self) {
        let mut stack = vec![(self.root, Matrix4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            let world = parent_world * node.local_matrix();
            node.apply_world(world);
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
    }

    /// Every node carrying a mesh, depth-first
    pub fn mesh_nodes(&self) -> Vec<NodeId> {
        self.collect_mesh_nodes(false)
    }

    /// Mesh nodes that are visible along with all of their ancestors
    pub fn visible_mesh_nodes(&self) -> Vec<NodeId> {
        self.collect_mesh_nodes(true)
    }

    fn collect_mesh_nodes(&self, visible_only: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if visible_only && !node.visible {
                continue;
            }
            if node.has_mesh() {
                out.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Remove every node but the root, plus the mesh registry and selection
    pub fn clear(&mut self) {
        let children = self
            .node(self.root)
            .map(|root| root.children.clone())
            .unwrap_or_default();
        self.selected = None;
        for child in children {
            self.detach(child);
            for id in self.subtree(child) {
                self.release(id);
            }
        }
        self.meshes.clear();
        tracing::info!("scene cleared");
    }

    pub fn set_background(&mut self, image: Texture) {
        self.background = Some(image);
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    pub fn background(&self) -> Option<&Texture> {
        self.background.as_ref()
    }

    /// Indented tree dump, one node per line
    pub fn hierarchy(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let _ = write!(out, "{}{}", "  ".repeat(depth), node.name);
            if node.has_mesh() {
                out.push_str(" [MESH]");
            }
            if !node.visible {
                out.push_str(" [HIDDEN]");
            }
            if node.selected {
                out.push_str(" [SELECTED]");
            }
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

fn default_node_name(path: &str) -> String {
    let path = path.strip_prefix(BUILTIN_PREFIX).unwrap_or(path);
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "Mesh".to_string())
}
