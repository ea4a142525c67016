//! Vidframe Export Engine
//!
//! Turns the current source and styling into a delivered file:
//!
//! 1. Stop the preview and resolve export geometry
//! 2. Record one playback through the capture engine
//! 3. Transcode when the captured container differs from the target
//!    (falling back to the captured file on failure)
//! 4. Save through a [`FileSink`]

pub mod export;
pub mod gate;
pub mod sink;
pub mod transcode;

pub use export::{
    ExportOrchestrator, ExportOutcome, ExportReport, ExportRequest, ExportStage, ExportStatus,
    StatusCallback,
};
pub use gate::{ExportGate, ExportGuard};
pub use sink::{export_file_name, DirectorySink, FileSink};
pub use transcode::{
    FfmpegTranscoder, FfmpegTranscoderLoader, TranscodeRequest, Transcoder, TranscoderHandle,
    TranscoderLoader,
};
pub use vidframe_capture_engine::CancelFlag;
