//! Shell-Core Protocol
//!
//! The viewer uses a shell-core architecture:
//! - **Shell**: Owns everything with side effects
//!   - The AR session and the scene graph it renders
//!   - The URL text field and keyboard
//!   - Network fetches, file writes and glTF parsing (on worker tasks)
//!
//! - **Core**: Platform-agnostic viewer logic
//!   - Receives Events from shell
//!   - Tracks load status and the animations of the latest asset
//!   - Emits Commands for shell to execute
//!   - No threads, purely event-driven
//!
//! ## Architecture
//!
//! Events and Commands use an enum-of-enums pattern:
//! - Handlers can subscribe to specific event categories
//! - Background work never touches the scene: it produces a
//!   [`LoadEvent`] that the shell hands to the core on its own turn

use serde::{Deserialize, Serialize};

// ============================================================================
// IDs - All IDs are opaque strings
// ============================================================================

/// Unique identifier for one fetch -> persist -> parse run
pub type LoadId = String;

/// Unique identifier for nodes attached under the scene root
pub type NodeId = String;

/// Unique identifier for animations bound to attached nodes
pub type AnimationId = String;

// ============================================================================
// EVENTS (Shell -> Core)
// ============================================================================

/// Top-level events sent from Shell to Core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", content = "event")]
pub enum Event {
    /// View lifecycle events
    Lifecycle(LifecycleEvent),
    /// URL field and keyboard events
    Input(InputEvent),
    /// Results of background model loads
    Load(LoadEvent),
    /// AR session callbacks
    Session(SessionEvent),
}

// ----------------------------------------------------------------------------
// Lifecycle Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// View hierarchy loaded (sent once)
    Init,
    /// View is about to become visible
    Appear,
    /// View is about to be hidden
    Disappear,
    /// Application shutting down
    Shutdown,
}

// ----------------------------------------------------------------------------
// Input Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum InputEvent {
    /// The text in the URL field changed
    UrlChanged { text: String },
    /// The keyboard "Done" button was pressed
    DonePressed,
}

// ----------------------------------------------------------------------------
// Load Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoadEvent {
    Finished(LoadFinishedData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFinishedData {
    pub load_id: LoadId,
    pub url: String,
    pub outcome: LoadOutcome,
}

/// Single-shot result of a model load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "data")]
pub enum LoadOutcome {
    /// Parsed successfully
    Complete(LoadedAsset),
    /// Fetch, write or parse failed
    Failed(LoadFailure),
    /// The load task was dropped before it finished
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadErrorKind {
    InvalidUrl,
    Transport,
    HttpStatus,
    Write,
    Parse,
    NoScene,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub kind: LoadErrorKind,
    pub message: String,
    /// Set for [`LoadErrorKind::HttpStatus`]
    #[serde(default)]
    pub status_code: Option<u16>,
}

impl LoadFailure {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

// ----------------------------------------------------------------------------
// Session Events
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    Failed { error: String },
    Interrupted,
    InterruptionEnded,
}

// ============================================================================
// ASSET DATA
// ============================================================================

/// Snapshot of a parsed glTF asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedAsset {
    /// Local file the asset was parsed from
    pub path: String,
    /// Root node of the default scene; its children are the scene's top-level nodes
    pub scene: SceneNode,
    pub animations: Vec<AnimationClip>,
}

/// A node tree ready to be attached to the scene graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: Option<String>,
    /// Index of the node in the source document, used by animation targets
    #[serde(default)]
    pub source_index: Option<u32>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub mesh: Option<MeshInfo>,
    #[serde(default)]
    pub light: Option<LightData>,
    #[serde(default)]
    pub camera: Option<CameraData>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Create an empty node with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Total number of nodes in this tree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub index: u32,
    pub name: Option<String>,
    pub primitive_count: u32,
    pub vertex_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: Option<String>,
    pub duration_secs: f32,
    pub channels: Vec<AnimationChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationChannel {
    /// Source index of the animated node
    pub target_node: u32,
    pub property: AnimatedProperty,
    pub keyframe_count: u32,
    pub duration_secs: f32,
    pub repeat: RepeatCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimatedProperty {
    Translation,
    Rotation,
    Scale,
    MorphWeights,
}

/// How many times a channel plays before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatCount {
    Finite(u32),
    Infinite,
}

impl RepeatCount {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, RepeatCount::Infinite)
    }
}

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount::Finite(1)
    }
}

// ============================================================================
// ENVIRONMENT DATA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Omni,
    Ambient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    pub casts_shadow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraData {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 1.0,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentTexturing {
    None,
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneDetection {
    Horizontal,
    Vertical,
}

/// World-tracking session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub environment_texturing: EnvironmentTexturing,
    pub wants_hdr_environment_textures: bool,
    pub plane_detection: Vec<PlaneDetection>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            environment_texturing: EnvironmentTexturing::Automatic,
            wants_hdr_environment_textures: true,
            plane_detection: vec![PlaneDetection::Horizontal, PlaneDetection::Vertical],
        }
    }
}

// ============================================================================
// COMMANDS (Core -> Shell)
// ============================================================================

/// Top-level commands sent from Core to Shell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", content = "command")]
pub enum Command {
    /// Scene graph commands
    Scene(SceneCommand),
    /// Animation commands
    Animation(AnimationCommand),
    /// View environment commands
    Environment(EnvironmentCommand),
    /// AR session commands
    Session(SessionCommand),
    /// URL field and keyboard commands
    Ui(UiCommand),
    /// Background load commands
    Load(LoadCommand),
    /// Debug/logging commands
    Debug(DebugCommand),
}

// ----------------------------------------------------------------------------
// Scene Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SceneCommand {
    /// Insert a node tree under the scene root
    Attach(AttachNodeData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachNodeData {
    pub node_id: NodeId,
    pub node: SceneNode,
}

// ----------------------------------------------------------------------------
// Animation Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum AnimationCommand {
    /// Register a clip against an attached node
    Bind(BindAnimationData),
    Play { animation_id: AnimationId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindAnimationData {
    pub animation_id: AnimationId,
    pub node_id: NodeId,
    pub clip: AnimationClip,
}

// ----------------------------------------------------------------------------
// Environment Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum EnvironmentCommand {
    SetStatisticsVisible { visible: bool },
}

// ----------------------------------------------------------------------------
// Session Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SessionCommand {
    Run(SessionConfig),
    Pause,
}

// ----------------------------------------------------------------------------
// UI Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum UiCommand {
    /// Add the toolbar with the "Done" button above the keyboard
    InstallDoneAccessory,
    DismissKeyboard,
    SetUrlFieldHidden { hidden: bool },
}

// ----------------------------------------------------------------------------
// Load Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum LoadCommand {
    /// Fetch, persist and parse the model at `url`
    Start { load_id: LoadId, url: String },
}

// ----------------------------------------------------------------------------
// Debug Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum DebugCommand {
    Log { level: LogLevel, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ============================================================================
// CORE TRAIT
// ============================================================================

/// Trait that the viewer logic implements
pub trait Core {
    /// Handle an event from the shell
    /// Returns commands for the shell to execute
    fn handle(&mut self, event: Event) -> Vec<Command>;
}

// ============================================================================
// HELPER TRAITS FOR MODULAR HANDLERS
// ============================================================================

/// Handler for lifecycle events
pub trait LifecycleHandler {
    fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Vec<Command>;
}

/// Handler for input events
pub trait InputHandler {
    fn handle_input(&mut self, event: InputEvent) -> Vec<Command>;
}

/// Handler for load events
pub trait LoadHandler {
    fn handle_load(&mut self, event: LoadEvent) -> Vec<Command>;
}

/// Handler for AR session events
pub trait SessionHandler {
    fn handle_session(&mut self, event: SessionEvent) -> Vec<Command>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failed_json() {
        let json = r#"{"category":"Load","event":{"type":"Finished","load_id":"load-1","url":"http://localhost/model.glb","outcome":{"status":"Failed","data":{"kind":"HttpStatus","message":"HTTP status 404","status_code":404}}}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        match event {
            Event::Load(LoadEvent::Finished(data)) => {
                assert_eq!(data.load_id, "load-1");
                match data.outcome {
                    LoadOutcome::Failed(failure) => {
                        assert_eq!(failure.kind, LoadErrorKind::HttpStatus);
                        assert_eq!(failure.status_code, Some(404));
                    }
                    other => panic!("Expected Failed outcome, got {:?}", other),
                }
            }
            _ => panic!("Expected Load::Finished event"),
        }
    }

    #[test]
    fn test_load_complete_json() {
        let json = r#"{"category":"Load","event":{"type":"Finished","load_id":"load-2","url":"u","outcome":{"status":"Complete","data":{"path":"/tmp/model.glb","scene":{"name":"Scene","children":[{"name":"Cube"}]},"animations":[{"name":"Spin","duration_secs":1.0,"channels":[{"target_node":0,"property":"Rotation","keyframe_count":2,"duration_secs":1.0,"repeat":{"Finite":1}}]}]}}}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        let Event::Load(LoadEvent::Finished(data)) = event else {
            panic!("Expected Load::Finished event");
        };
        let LoadOutcome::Complete(asset) = data.outcome else {
            panic!("Expected Complete outcome");
        };
        assert_eq!(asset.scene.node_count(), 2);
        assert_eq!(asset.scene.children[0].transform, Transform::default());
        assert_eq!(asset.animations[0].channels[0].repeat, RepeatCount::Finite(1));
    }

    #[test]
    fn test_cancelled_outcome_json() {
        let json = serde_json::to_string(&LoadOutcome::Cancelled).unwrap();
        assert_eq!(json, r#"{"status":"Cancelled"}"#);
    }

    #[test]
    fn test_input_and_lifecycle_json() {
        let event: Event =
            serde_json::from_str(r#"{"category":"Input","event":{"action":"DonePressed"}}"#).unwrap();
        assert!(matches!(event, Event::Input(InputEvent::DonePressed)));

        let event: Event =
            serde_json::from_str(r#"{"category":"Lifecycle","event":{"type":"Appear"}}"#).unwrap();
        assert!(matches!(event, Event::Lifecycle(LifecycleEvent::Appear)));
    }

    #[test]
    fn test_default_session_config() {
        let config = SessionConfig::default();
        assert_eq!(config.environment_texturing, EnvironmentTexturing::Automatic);
        assert!(config.wants_hdr_environment_textures);
        assert_eq!(
            config.plane_detection,
            vec![PlaneDetection::Horizontal, PlaneDetection::Vertical]
        );
    }
}
