//! Asset parser for GLB/glTF files
//!
//! Uses the gltf crate to read the persisted model and turn its default
//! scene and animations into protocol types.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use arview_protocol::{
    AnimatedProperty, AnimationChannel, AnimationClip, CameraData, LoadedAsset, MeshInfo,
    RepeatCount, SceneNode, Transform,
};
use gltf::animation::Property;
use gltf::camera::Projection;

use crate::{Error, Result};

/// Loader options handed to the parser on every load.
///
/// The viewer passes none; the map exists so callers can tune a parser
/// without changing the trait.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    entries: BTreeMap<String, String>,
}

impl ParseOptions {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses a local model file into a [`LoadedAsset`].
///
/// Called from a blocking worker thread, never from the async runtime.
pub trait AssetParser: Send + Sync + 'static {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<LoadedAsset>;
}

/// [`AssetParser`] backed by the gltf crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfParser;

impl AssetParser for GltfParser {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<LoadedAsset> {
        log::info!("Parsing {:?} ({} options)", path, options.len());

        let (document, buffers, _images) = gltf::import(path)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(Error::NoScene)?;

        let root = convert_scene(&scene)?;

        let animations: Vec<AnimationClip> = document
            .animations()
            .map(|animation| convert_animation(&animation, &buffers))
            .collect();

        log::info!(
            "Parsed scene {:?}: {} nodes, {} animations",
            root.name,
            root.node_count() - 1,
            animations.len()
        );

        Ok(LoadedAsset {
            path: path.display().to_string(),
            scene: root,
            animations,
        })
    }
}

/// Build the scene's node tree without recursing.
///
/// Nodes are visited in preorder. A node reached twice means the document's
/// hierarchy is not a forest, which is rejected.
fn convert_scene(scene: &gltf::Scene<'_>) -> Result<SceneNode> {
    let mut visited = HashSet::new();
    // Converted nodes in preorder, each with the slot of its parent
    let mut flat: Vec<(Option<usize>, SceneNode)> = Vec::new();

    let roots: Vec<_> = scene.nodes().collect();
    let mut stack: Vec<(Option<usize>, gltf::Node<'_>)> =
        roots.into_iter().rev().map(|node| (None, node)).collect();

    while let Some((parent, node)) = stack.pop() {
        if !visited.insert(node.index()) {
            log::error!("Node {} is reachable more than once", node.index());
            return Err(Error::InvalidHierarchy(node.index()));
        }
        let slot = flat.len();
        flat.push((parent, convert_node(&node)));

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (Some(slot), child)));
    }

    let mut root = SceneNode {
        name: scene.name().map(str::to_string),
        ..SceneNode::default()
    };

    // Children always come after their parent, so popping from the back
    // finishes every subtree before its parent is moved
    while let Some((parent, mut node)) = flat.pop() {
        node.children.reverse();
        match parent {
            Some(slot) => flat[slot].1.children.push(node),
            None => root.children.push(node),
        }
    }
    root.children.reverse();

    Ok(root)
}

/// Convert one node, leaving its children empty.
fn convert_node(node: &gltf::Node<'_>) -> SceneNode {
    let (position, rotation, scale) = node.transform().decomposed();

    SceneNode {
        name: node.name().map(str::to_string),
        source_index: Some(node.index() as u32),
        transform: Transform {
            position,
            rotation,
            scale,
        },
        mesh: node.mesh().map(|mesh| convert_mesh(&mesh)),
        light: None,
        camera: node.camera().and_then(|camera| convert_camera(&camera)),
        children: Vec::new(),
    }
}

fn convert_mesh(mesh: &gltf::Mesh<'_>) -> MeshInfo {
    let mut primitive_count = 0;
    let mut vertex_count = 0;
    for primitive in mesh.primitives() {
        primitive_count += 1;
        vertex_count += primitive
            .get(&gltf::Semantic::Positions)
            .map(|accessor| accessor.count() as u32)
            .unwrap_or(0);
    }

    MeshInfo {
        index: mesh.index() as u32,
        name: mesh.name().map(str::to_string),
        primitive_count,
        vertex_count,
    }
}

fn convert_camera(camera: &gltf::Camera<'_>) -> Option<CameraData> {
    match camera.projection() {
        Projection::Perspective(p) => Some(CameraData {
            fov_degrees: p.yfov().to_degrees(),
            near: p.znear(),
            far: p.zfar().unwrap_or(CameraData::default().far),
        }),
        // Only perspective cameras are carried over
        Projection::Orthographic(_) => None,
    }
}

fn convert_animation(
    animation: &gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
) -> AnimationClip {
    let channels: Vec<AnimationChannel> = animation
        .channels()
        .map(|channel| {
            let reader =
                channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let duration_secs = reader
                .read_inputs()
                .map(|times| times.fold(0.0f32, f32::max))
                .unwrap_or(0.0);

            let target = channel.target();
            AnimationChannel {
                target_node: target.node().index() as u32,
                property: match target.property() {
                    Property::Translation => AnimatedProperty::Translation,
                    Property::Rotation => AnimatedProperty::Rotation,
                    Property::Scale => AnimatedProperty::Scale,
                    Property::MorphTargetWeights => AnimatedProperty::MorphWeights,
                },
                keyframe_count: channel.sampler().input().count() as u32,
                duration_secs,
                repeat: RepeatCount::default(),
            }
        })
        .collect();

    let duration_secs = channels
        .iter()
        .map(|c| c.duration_secs)
        .fold(0.0f32, f32::max);

    AnimationClip {
        name: animation.name().map(str::to_string),
        duration_secs,
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{animated_glb, cyclic_glb, glb, sceneless_glb, temp_dir};

    fn write_fixture(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = temp_dir(name).join("model.glb");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_scene_tree() {
        let path = write_fixture("parse-tree", &animated_glb());
        let asset = GltfParser.parse(&path, &ParseOptions::default()).unwrap();

        assert_eq!(asset.scene.name.as_deref(), Some("Scene"));
        assert_eq!(asset.scene.source_index, None);
        assert_eq!(asset.scene.children.len(), 1);

        let root = &asset.scene.children[0];
        assert_eq!(root.name.as_deref(), Some("Root"));
        assert_eq!(root.source_index, Some(0));
        assert_eq!(root.children.len(), 1);

        let cube = &root.children[0];
        assert_eq!(cube.name.as_deref(), Some("Cube"));
        assert_eq!(cube.transform.position, [0.0, 0.5, 0.0]);

        let mesh = cube.mesh.as_ref().unwrap();
        assert_eq!(mesh.primitive_count, 1);
        assert_eq!(mesh.vertex_count, 2);
    }

    #[test]
    fn test_parse_animations() {
        let path = write_fixture("parse-anim", &animated_glb());
        let asset = GltfParser.parse(&path, &ParseOptions::default()).unwrap();

        let names: Vec<_> = asset
            .animations
            .iter()
            .map(|a| a.name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["Bounce", "Idle"]);

        let bounce = &asset.animations[0];
        assert_eq!(bounce.duration_secs, 1.0);
        assert_eq!(bounce.channels.len(), 2);
        assert_eq!(bounce.channels[0].target_node, 1);
        assert_eq!(bounce.channels[0].property, AnimatedProperty::Translation);
        assert_eq!(bounce.channels[1].property, AnimatedProperty::Scale);
        assert_eq!(bounce.channels[0].keyframe_count, 2);
        // Parser output plays once; the viewer decides about looping
        assert_eq!(bounce.channels[0].repeat, RepeatCount::Finite(1));

        assert_eq!(asset.animations[1].channels[0].target_node, 0);
    }

    #[test]
    fn test_no_scene() {
        let path = write_fixture("parse-noscene", &sceneless_glb());
        let err = GltfParser.parse(&path, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoScene));
    }

    #[test]
    fn test_cyclic_hierarchy_is_rejected() {
        let path = write_fixture("parse-cycle", &cyclic_glb());
        let err = GltfParser.parse(&path, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidHierarchy(_)));
        assert_eq!(err.kind(), arview_protocol::LoadErrorKind::Parse);
    }

    #[test]
    fn test_shared_child_is_rejected() {
        // Node 2 has two parents
        let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0,1]}],
            "nodes":[{"children":[2]},{"children":[2]},{"name":"Shared"}]}"#;
        let path = write_fixture("parse-shared", &glb(json, None));
        let err = GltfParser.parse(&path, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidHierarchy(2)));
    }

    #[test]
    fn test_sibling_order_is_kept() {
        let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0,3]}],
            "nodes":[{"name":"A","children":[1,2]},{"name":"A1"},{"name":"A2"},{"name":"B"}]}"#;
        let path = write_fixture("parse-order", &glb(json, None));
        let asset = GltfParser.parse(&path, &ParseOptions::default()).unwrap();

        let names = |nodes: &[SceneNode]| -> Vec<String> {
            nodes.iter().map(|n| n.name.clone().unwrap_or_default()).collect()
        };
        assert_eq!(names(&asset.scene.children), vec!["A", "B"]);
        assert_eq!(names(&asset.scene.children[0].children), vec!["A1", "A2"]);
        assert_eq!(asset.scene.node_count(), 5);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let path = write_fixture("parse-garbage", b"<html>404 Not Found</html>");
        let err = GltfParser.parse(&path, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Gltf(_)));
        assert_eq!(err.kind(), arview_protocol::LoadErrorKind::Parse);
    }

    #[test]
    fn test_parse_options() {
        let mut options = ParseOptions::default();
        assert!(options.is_empty());
        options.insert("units", "meters");
        assert_eq!(options.get("units"), Some("meters"));
        assert_eq!(options.get("missing"), None);
    }
}
