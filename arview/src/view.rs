//! ArView - The rendering owner
//!
//! Holds the scene graph, the AR session and the URL field, and applies
//! commands coming out of the core. Only this type mutates the scene, and
//! it only does so on the thread that owns it.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut view = ArView::new(HeadlessSession::new());
//! for command in core.handle(event) {
//!     if let Some(load) = view.apply(command) {
//!         // spawn the load on a worker
//!     }
//! }
//! ```

use arview_protocol::{
    AnimationCommand, Command, DebugCommand, EnvironmentCommand, LoadCommand, LogLevel,
    SceneCommand, SessionCommand, UiCommand,
};

use crate::scene::SceneGraph;
use crate::session::ArSession;

/// The URL text input and its keyboard.
#[derive(Debug, Clone)]
pub struct UrlField {
    text: String,
    visible: bool,
    keyboard_shown: bool,
    done_accessory: bool,
}

impl UrlField {
    fn new() -> Self {
        Self {
            text: String::new(),
            visible: true,
            keyboard_shown: false,
            done_accessory: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text, as if the user typed it. Shows the keyboard.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.keyboard_shown = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_keyboard_shown(&self) -> bool {
        self.keyboard_shown
    }

    pub fn has_done_accessory(&self) -> bool {
        self.done_accessory
    }
}

pub struct ArView<S: ArSession> {
    scene: SceneGraph,
    session: S,
    url_field: UrlField,
    shows_statistics: bool,
}

impl<S: ArSession> ArView<S> {
    pub fn new(session: S) -> Self {
        Self {
            scene: SceneGraph::new(),
            session,
            url_field: UrlField::new(),
            shows_statistics: false,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn url_field(&self) -> &UrlField {
        &self.url_field
    }

    pub fn url_field_mut(&mut self) -> &mut UrlField {
        &mut self.url_field
    }

    pub fn shows_statistics(&self) -> bool {
        self.shows_statistics
    }

    /// Execute one command from the core.
    ///
    /// Load commands need a worker, which the view does not own, so they
    /// are handed back to the caller.
    pub fn apply(&mut self, command: Command) -> Option<LoadCommand> {
        log::debug!("Applying {} command", command_name(&command));

        match command {
            Command::Scene(SceneCommand::Attach(data)) => {
                match self.scene.attach(data.node_id, data.node) {
                    Ok(_) => {
                        log::info!("Scene root has {} children", self.scene.root_child_count());
                    }
                    Err(e) => log::error!("Attach failed: {}", e),
                }
            }

            Command::Animation(AnimationCommand::Bind(data)) => {
                if let Err(e) = self.scene.bind_animation(data.animation_id, &data.node_id, data.clip) {
                    log::error!("Animation bind failed: {}", e);
                }
            }

            Command::Animation(AnimationCommand::Play { animation_id }) => {
                if let Err(e) = self.scene.play(&animation_id) {
                    log::error!("Animation play failed: {}", e);
                }
            }

            Command::Environment(EnvironmentCommand::SetStatisticsVisible { visible }) => {
                self.shows_statistics = visible;
            }

            Command::Session(SessionCommand::Run(config)) => self.session.run(&config),
            Command::Session(SessionCommand::Pause) => self.session.pause(),

            Command::Ui(UiCommand::InstallDoneAccessory) => self.url_field.done_accessory = true,
            Command::Ui(UiCommand::DismissKeyboard) => self.url_field.keyboard_shown = false,
            Command::Ui(UiCommand::SetUrlFieldHidden { hidden }) => {
                self.url_field.visible = !hidden;
            }

            Command::Debug(DebugCommand::Log { level, message }) => {
                log::log!(target: "arview::core", to_log_level(level), "{}", message);
            }

            Command::Load(load) => return Some(load),
        }

        None
    }
}

fn to_log_level(level: LogLevel) -> log::Level {
    match level {
        LogLevel::Debug => log::Level::Debug,
        LogLevel::Info => log::Level::Info,
        LogLevel::Warn => log::Level::Warn,
        LogLevel::Error => log::Level::Error,
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Scene(_) => "Scene",
        Command::Animation(_) => "Animation",
        Command::Environment(_) => "Environment",
        Command::Session(_) => "Session",
        Command::Ui(_) => "Ui",
        Command::Load(_) => "Load",
        Command::Debug(_) => "Debug",
    }
}
