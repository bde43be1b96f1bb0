use std::fmt;

use tilevox_pattern::PatternStore;
use tilevox_segment::Frame;

/// Per-frame hook run after segmentation, before instances are published. Scripts may edit
/// pattern transforms and tags through the store.
pub trait FrameScript: Send {
    fn name(&self) -> &str;

    fn on_frame(&mut self, frame: &Frame, store: &mut PatternStore) -> Result<(), ScriptError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A tag or transform value the script could not interpret.
    Malformed(String),
    Failed(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Malformed(what) => write!(f, "malformed script input: {what}"),
            ScriptError::Failed(why) => write!(f, "script failed: {why}"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// A registered script and whether it still runs.
pub(crate) struct ScriptSlot {
    pub script: Box<dyn FrameScript>,
    pub enabled: bool,
}

/// Runs every enabled script once; a script that fails is disabled for good.
pub(crate) fn run_scripts(scripts: &mut [ScriptSlot], frame: &Frame, store: &mut PatternStore) {
    for slot in scripts.iter_mut().filter(|s| s.enabled) {
        if let Err(err) = slot.script.on_frame(frame, store) {
            log::warn!(
                target: "frames",
                "script '{}' disabled after frame {}: {err}",
                slot.script.name(),
                frame.frame_counter()
            );
            slot.enabled = false;
        }
    }
}
