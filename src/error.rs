//! Typed error surface for the detection/tracking library.
//!
//! The binary's orchestration layer (CLI wiring, config glue) uses
//! `anyhow::Result` and only needs to propagate and log; library code that
//! callers might want to match on returns `PipelineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("emission sink failed: {0}")]
    Emission(#[from] std::io::Error),

    #[error("opencv operation failed: {0}")]
    OpenCv(#[from] opencv::Error),
}
