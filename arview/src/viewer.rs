//! ViewerCore - The model viewer's state machine
//!
//! Reacts to view lifecycle, URL submission and finished loads. Every
//! reaction is a list of commands; the core itself never touches the
//! scene, the network or the disk.
//!
//! Load status moves `Idle -> Loading -> Complete | Failed | Cancelled`.
//! A new submit moves any status back to `Loading`. In-flight loads are
//! never cancelled, so two submits produce two independent loads.

use std::f32::consts::PI;

use arview_protocol::*;
use glam::{EulerRot, Quat};

/// Fixed scene setup for the viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub show_statistics: bool,
    pub session: SessionConfig,
    pub light: LightData,
    /// Euler angles (radians, XYZ) of the light node
    pub light_euler: [f32; 3],
    pub camera: CameraData,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            show_statistics: true,
            session: SessionConfig::default(),
            light: LightData {
                kind: LightKind::Directional,
                color: [1.0, 1.0, 1.0],
                intensity: 0.1,
                casts_shadow: true,
            },
            light_euler: [PI, 0.0, 0.0],
            camera: CameraData::default(),
        }
    }
}

/// Status of the most recent load to change state.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading { load_id: LoadId, url: String },
    Complete { load_id: LoadId },
    Failed { load_id: LoadId, failure: LoadFailure },
    Cancelled { load_id: LoadId },
}

/// The viewer's state machine.
///
/// Scene setup happens once per core: the camera on the first `Init`, the
/// light on the first `Appear`. Later appearances only rerun the session, so
/// the scene never holds more than one light however often the view
/// reappears.
pub struct ViewerCore {
    config: ViewerConfig,
    status: LoadStatus,
    /// Current text of the URL field
    url_text: String,
    camera_attached: bool,
    light_added: bool,
    /// Animations of the latest completed load, repeat forced to infinite
    animations: Vec<AnimationClip>,
    /// Ids the latest animations were bound under, same order
    animation_ids: Vec<AnimationId>,
    attached_models: u32,
    /// Counter for generating unique IDs
    next_id: u64,
}

impl ViewerCore {
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        Self {
            config,
            status: LoadStatus::Idle,
            url_text: String::new(),
            camera_attached: false,
            light_added: false,
            animations: Vec::new(),
            animation_ids: Vec::new(),
            attached_models: 0,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn url_text(&self) -> &str {
        &self.url_text
    }

    pub fn animations(&self) -> &[AnimationClip] {
        &self.animations
    }

    pub fn animation_ids(&self) -> &[AnimationId] {
        &self.animation_ids
    }

    /// Number of completed loads whose scene was attached.
    pub fn attached_models(&self) -> u32 {
        self.attached_models
    }

    fn alloc_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) -> Command {
        Command::Debug(DebugCommand::Log {
            level,
            message: message.into(),
        })
    }

    fn light_node(&self) -> SceneNode {
        let [x, y, z] = self.config.light_euler;
        let mut node = SceneNode::named("light");
        node.transform.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z).to_array();
        node.light = Some(self.config.light.clone());
        node
    }

    fn camera_node(&self) -> SceneNode {
        let mut node = SceneNode::named("camera");
        node.camera = Some(self.config.camera.clone());
        node
    }

    fn attach_asset(&mut self, load_id: LoadId, asset: LoadedAsset) -> Vec<Command> {
        let mut commands = Vec::new();

        let node_count = asset.scene.node_count();
        let node_id = self.alloc_id("node");
        commands.push(Command::Scene(SceneCommand::Attach(AttachNodeData {
            node_id: node_id.clone(),
            node: asset.scene,
        })));

        let mut animations = asset.animations;
        for animation in &mut animations {
            for channel in &mut animation.channels {
                channel.repeat = RepeatCount::Infinite;
            }
        }

        // The previous asset's animations are dropped, its nodes stay attached
        self.animation_ids.clear();
        for clip in &animations {
            let animation_id = self.alloc_id("anim");
            commands.push(Command::Animation(AnimationCommand::Bind(BindAnimationData {
                animation_id: animation_id.clone(),
                node_id: node_id.clone(),
                clip: clip.clone(),
            })));
            self.animation_ids.push(animation_id);
        }

        // Only the first animation is started
        if let Some(first) = self.animation_ids.first() {
            commands.push(Command::Animation(AnimationCommand::Play {
                animation_id: first.clone(),
            }));
        }

        commands.push(self.log(
            LogLevel::Info,
            format!(
                "Model {} attached as {}: {} nodes, {} animations",
                load_id,
                node_id,
                node_count,
                animations.len()
            ),
        ));

        self.animations = animations;
        self.attached_models += 1;
        commands.push(Command::Ui(UiCommand::SetUrlFieldHidden { hidden: true }));
        self.status = LoadStatus::Complete { load_id };

        commands
    }
}

impl Core for ViewerCore {
    fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Lifecycle(e) => self.handle_lifecycle(e),
            Event::Input(e) => self.handle_input(e),
            Event::Load(e) => self.handle_load(e),
            Event::Session(e) => self.handle_session(e),
        }
    }
}

impl LifecycleHandler for ViewerCore {
    fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Vec<Command> {
        let mut commands = Vec::new();

        match event {
            LifecycleEvent::Init => {
                commands.push(Command::Environment(EnvironmentCommand::SetStatisticsVisible {
                    visible: self.config.show_statistics,
                }));
                commands.push(Command::Ui(UiCommand::InstallDoneAccessory));

                if !self.camera_attached {
                    let node_id = self.alloc_id("node");
                    commands.push(Command::Scene(SceneCommand::Attach(AttachNodeData {
                        node_id,
                        node: self.camera_node(),
                    })));
                    self.camera_attached = true;
                }

                commands.push(self.log(LogLevel::Info, "Viewer initialized"));
            }

            LifecycleEvent::Appear => {
                if !self.light_added {
                    let node_id = self.alloc_id("node");
                    commands.push(Command::Scene(SceneCommand::Attach(AttachNodeData {
                        node_id,
                        node: self.light_node(),
                    })));
                    self.light_added = true;
                }

                commands.push(Command::Session(SessionCommand::Run(self.config.session.clone())));
            }

            LifecycleEvent::Disappear => {
                commands.push(Command::Session(SessionCommand::Pause));
            }

            LifecycleEvent::Shutdown => {
                commands.push(self.log(
                    LogLevel::Info,
                    format!("Viewer shutting down with {} models attached", self.attached_models),
                ));
            }
        }

        commands
    }
}

impl InputHandler for ViewerCore {
    fn handle_input(&mut self, event: InputEvent) -> Vec<Command> {
        let mut commands = Vec::new();

        match event {
            InputEvent::UrlChanged { text } => {
                self.url_text = text;
            }

            InputEvent::DonePressed => {
                commands.push(Command::Ui(UiCommand::DismissKeyboard));

                let load_id = self.alloc_id("load");
                let url = self.url_text.clone();
                commands.push(self.log(LogLevel::Info, format!("Loading {} from {:?}", load_id, url)));
                commands.push(Command::Load(LoadCommand::Start {
                    load_id: load_id.clone(),
                    url: url.clone(),
                }));
                self.status = LoadStatus::Loading { load_id, url };
            }
        }

        commands
    }
}

impl LoadHandler for ViewerCore {
    fn handle_load(&mut self, event: LoadEvent) -> Vec<Command> {
        match event {
            LoadEvent::Finished(LoadFinishedData { load_id, url, outcome }) => match outcome {
                LoadOutcome::Complete(asset) => self.attach_asset(load_id, asset),

                LoadOutcome::Failed(failure) => {
                    let command = self.log(
                        LogLevel::Error,
                        format!("Failed to load glTF asset {} from {}: {}", load_id, url, failure),
                    );
                    self.status = LoadStatus::Failed { load_id, failure };
                    vec![command]
                }

                LoadOutcome::Cancelled => {
                    let command =
                        self.log(LogLevel::Warn, format!("Load {} from {} was cancelled", load_id, url));
                    self.status = LoadStatus::Cancelled { load_id };
                    vec![command]
                }
            },
        }
    }
}

impl SessionHandler for ViewerCore {
    fn handle_session(&mut self, event: SessionEvent) -> Vec<Command> {
        let command = match event {
            SessionEvent::Failed { error } => self.log(LogLevel::Error, format!("Session failed: {}", error)),
            SessionEvent::Interrupted => self.log(LogLevel::Warn, "Session interrupted"),
            SessionEvent::InterruptionEnded => self.log(LogLevel::Info, "Session interruption ended"),
        };
        vec![command]
    }
}

impl Default for ViewerCore {
    fn default() -> Self {
        Self::new()
    }
}
