//! Frame pipeline: double-buffered frames, per-frame orchestration and the main-thread hand-off.
#![forbid(unsafe_code)]

mod error;
mod frames;
mod layering;
mod pipeline;
mod queue;
mod script;

pub use error::EngineError;
pub use frames::{FrameManager, OfflineFrame, OnlineFrame};
pub use layering::auto_layer;
pub use pipeline::{FramePipeline, PipelineSettings, PipelineStats};
pub use queue::{UploadDrain, UploadQueue, main_thread_queue};
pub use script::{FrameScript, ScriptError};
