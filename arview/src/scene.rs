//! SceneGraph - The tree the AR view renders
//!
//! One root node owns everything. Loaded assets, the light and the camera
//! are attached as root children. Attached trees are never removed, so
//! every successful load adds one more root child.
//!
//! Animations are bound to an attached node and carry a playing flag.
//! Evaluating them is the renderer's job.

use std::collections::HashMap;

use arview_protocol::{
    AnimationClip, AnimationId, CameraData, LightData, MeshInfo, NodeId, SceneNode, Transform,
};
use glam::{Mat4, Quat, Vec3};

use crate::{Error, Result};

/// Index of a node in the graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub source_index: Option<u32>,
    pub transform: Transform,
    pub mesh: Option<MeshInfo>,
    pub light: Option<LightData>,
    pub camera: Option<CameraData>,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl Node {
    fn empty(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            source_index: None,
            transform: Transform::default(),
            mesh: None,
            light: None,
            camera: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

/// An animation clip bound to an attached node.
#[derive(Debug, Clone)]
pub struct BoundAnimation {
    pub id: AnimationId,
    pub node: NodeHandle,
    pub clip: AnimationClip,
    pub playing: bool,
}

#[derive(Debug)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    ids: HashMap<NodeId, NodeHandle>,
    animations: Vec<BoundAnimation>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::empty("root")],
            ids: HashMap::new(),
            animations: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.0)
    }

    /// Look up an attached tree by the id it was attached with.
    pub fn find(&self, node_id: &str) -> Option<NodeHandle> {
        self.ids.get(node_id).copied()
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root is always present
        false
    }

    pub fn child_count(&self, handle: NodeHandle) -> usize {
        self.node(handle).map(|n| n.children.len()).unwrap_or(0)
    }

    pub fn root_child_count(&self) -> usize {
        self.child_count(self.root())
    }

    /// Attach a node tree under the root.
    pub fn attach(&mut self, node_id: NodeId, tree: SceneNode) -> Result<NodeHandle> {
        if self.ids.contains_key(&node_id) {
            return Err(Error::DuplicateId(node_id));
        }
        let handle = self.insert(self.root(), tree);
        self.ids.insert(node_id, handle);
        Ok(handle)
    }

    /// Insert `tree` under `parent` in preorder, returning the tree's handle.
    fn insert(&mut self, parent: NodeHandle, tree: SceneNode) -> NodeHandle {
        let top = NodeHandle(self.nodes.len());
        let mut stack = vec![(parent, tree)];

        while let Some((parent, tree)) = stack.pop() {
            let handle = NodeHandle(self.nodes.len());
            let SceneNode {
                name,
                source_index,
                transform,
                mesh,
                light,
                camera,
                children,
            } = tree;

            self.nodes.push(Node {
                name,
                source_index,
                transform,
                mesh,
                light,
                camera,
                parent: Some(parent),
                children: Vec::new(),
            });
            self.nodes[parent.0].children.push(handle);

            stack.extend(children.into_iter().rev().map(|child| (handle, child)));
        }
        top
    }

    /// Find the node that came from `source_index` within the tree at `under`.
    pub fn find_source_node(&self, under: NodeHandle, source_index: u32) -> Option<NodeHandle> {
        let mut stack = vec![under];
        while let Some(handle) = stack.pop() {
            let node = self.node(handle)?;
            if node.source_index == Some(source_index) {
                return Some(handle);
            }
            stack.extend(node.children.iter().copied());
        }
        None
    }

    /// Compose local transforms from the root down to `handle`.
    pub fn world_transform(&self, handle: NodeHandle) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.node(h) else {
                break;
            };
            matrix = local_matrix(&node.transform) * matrix;
            current = node.parent;
        }
        matrix
    }

    /// All nodes in the graph carrying a light.
    pub fn lights(&self) -> impl Iterator<Item = (NodeHandle, &LightData)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.light.as_ref().map(|l| (NodeHandle(i), l)))
    }

    /// Register an animation clip against an attached tree.
    pub fn bind_animation(
        &mut self,
        animation_id: AnimationId,
        node_id: &str,
        clip: AnimationClip,
    ) -> Result<()> {
        let node = self
            .find(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;
        if self.animation(&animation_id).is_some() {
            return Err(Error::DuplicateId(animation_id));
        }

        for channel in &clip.channels {
            if self.find_source_node(node, channel.target_node).is_none() {
                log::debug!(
                    "Animation {} targets source node {} which is not under {}",
                    animation_id,
                    channel.target_node,
                    node_id
                );
            }
        }

        self.animations.push(BoundAnimation {
            id: animation_id,
            node,
            clip,
            playing: false,
        });
        Ok(())
    }

    pub fn play(&mut self, animation_id: &str) -> Result<()> {
        let animation = self
            .animations
            .iter_mut()
            .find(|a| a.id == animation_id)
            .ok_or_else(|| Error::AnimationNotFound(animation_id.to_string()))?;
        animation.playing = true;
        Ok(())
    }

    pub fn animation(&self, animation_id: &str) -> Option<&BoundAnimation> {
        self.animations.iter().find(|a| a.id == animation_id)
    }

    pub fn animations(&self) -> &[BoundAnimation] {
        &self.animations
    }

    pub fn playing(&self) -> impl Iterator<Item = &BoundAnimation> {
        self.animations.iter().filter(|a| a.playing)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn local_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::from(transform.scale),
        Quat::from_array(transform.rotation),
        Vec3::from(transform.position),
    )
}
