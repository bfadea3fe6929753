//! Scene-graph binding and an in-memory implementation.

use glam::{DQuat, DVec3};
use rustc_hash::FxHashMap;

/// Opaque reference to a node in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Minimal scene-graph surface the tile controllers and animators need.
///
/// Operations on handles that were destroyed are ignored; getters return the
/// identity transform for them.
pub trait SceneGraph {
    fn create_node(&mut self, parent: Option<NodeHandle>, name: &str) -> NodeHandle;

    fn set_parent(&mut self, node: NodeHandle, parent: Option<NodeHandle>);

    fn set_active(&mut self, node: NodeHandle, active: bool);

    /// Destroy `node` and all of its descendants.
    fn destroy(&mut self, node: NodeHandle);

    fn local_position(&self, node: NodeHandle) -> DVec3;

    fn set_local_position(&mut self, node: NodeHandle, position: DVec3);

    fn local_rotation(&self, node: NodeHandle) -> DQuat;

    fn set_local_rotation(&mut self, node: NodeHandle, rotation: DQuat);

    fn translate(&mut self, node: NodeHandle, offset: DVec3) {
        let position = self.local_position(node);
        self.set_local_position(node, position + offset);
    }
}

#[derive(Debug)]
struct SceneNode {
    name: String,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    active: bool,
    position: DVec3,
    rotation: DQuat,
}

/// Headless [`SceneGraph`] backed by a hash map.
#[derive(Debug, Default)]
pub struct SceneArena {
    nodes: FxHashMap<NodeHandle, SceneNode>,
    next_id: u64,
    mutations: u64,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn name(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeHandle) -> &[NodeHandle] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_active(&self, node: NodeHandle) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.active)
    }

    /// Total count of calls that changed the scene.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Position of `node` after applying all ancestor transforms.
    pub fn world_position(&self, node: NodeHandle) -> DVec3 {
        let mut position = DVec3::ZERO;
        let mut current = Some(node);
        while let Some(handle) = current {
            let Some(n) = self.nodes.get(&handle) else {
                break;
            };
            position = n.rotation * position + n.position;
            current = n.parent;
        }
        position
    }

    fn detach(&mut self, node: NodeHandle) {
        let parent = self.nodes.get(&node).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != node);
        }
    }
}

impl SceneGraph for SceneArena {
    fn create_node(&mut self, parent: Option<NodeHandle>, name: &str) -> NodeHandle {
        let handle = NodeHandle(self.next_id);
        self.next_id += 1;
        self.mutations += 1;

        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(handle);
        }
        self.nodes.insert(
            handle,
            SceneNode {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                active: true,
                position: DVec3::ZERO,
                rotation: DQuat::IDENTITY,
            },
        );
        handle
    }

    fn set_parent(&mut self, node: NodeHandle, parent: Option<NodeHandle>) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.mutations += 1;
        self.detach(node);
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = parent;
        }
    }

    fn set_active(&mut self, node: NodeHandle, active: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.active = active;
            self.mutations += 1;
        }
    }

    fn destroy(&mut self, node: NodeHandle) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.mutations += 1;
        self.detach(node);

        let mut stack = vec![node];
        while let Some(handle) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&handle) {
                stack.extend(removed.children);
            }
        }
    }

    fn local_position(&self, node: NodeHandle) -> DVec3 {
        self.nodes.get(&node).map_or(DVec3::ZERO, |n| n.position)
    }

    fn set_local_position(&mut self, node: NodeHandle, position: DVec3) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.position = position;
            self.mutations += 1;
        }
    }

    fn local_rotation(&self, node: NodeHandle) -> DQuat {
        self.nodes.get(&node).map_or(DQuat::IDENTITY, |n| n.rotation)
    }

    fn set_local_rotation(&mut self, node: NodeHandle, rotation: DQuat) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.rotation = rotation;
            self.mutations += 1;
        }
    }
}
