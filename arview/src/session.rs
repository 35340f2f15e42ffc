//! ArSession - The world-tracking boundary
//!
//! Tracking, plane detection and environment texturing belong to the
//! platform. The view only needs to run the session with a configuration
//! when it appears and pause it when it disappears.

use arview_protocol::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Never run
    Idle,
    Running(SessionConfig),
    Paused,
}

/// A world-tracking session driven by the view.
pub trait ArSession {
    /// Start (or restart) tracking with `config`.
    fn run(&mut self, config: &SessionConfig);

    fn pause(&mut self);

    fn state(&self) -> &SessionState;
}

/// Session without camera or sensors. Records state transitions.
#[derive(Debug)]
pub struct HeadlessSession {
    state: SessionState,
    runs: u32,
}

impl HeadlessSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            runs: 0,
        }
    }

    /// How many times `run` was called.
    pub fn run_count(&self) -> u32 {
        self.runs
    }
}

impl Default for HeadlessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ArSession for HeadlessSession {
    fn run(&mut self, config: &SessionConfig) {
        log::info!(
            "Session running: texturing {:?}, HDR {}, planes {:?}",
            config.environment_texturing,
            config.wants_hdr_environment_textures,
            config.plane_detection
        );
        self.runs += 1;
        self.state = SessionState::Running(config.clone());
    }

    fn pause(&mut self) {
        log::info!("Session paused");
        self.state = SessionState::Paused;
    }

    fn state(&self) -> &SessionState {
        &self.state
    }
}
