// ============================================================================
// PIXEL OPERATIONS — comparison engines and the AI collaborator
// ============================================================================

pub mod ai;
pub mod compose;
pub mod diff;
pub mod ela;

/// Errors that can occur while producing a comparison raster.
#[derive(Debug, Clone)]
pub enum ProcessError {
    /// A source image could not be decoded into an RGBA raster.
    Decode(String),
    /// The engine itself failed (re-encode error, degenerate input, ...).
    Processing(String),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Decode(e) => write!(f, "Image decode failed: {}", e),
            ProcessError::Processing(e) => write!(f, "Processing failed: {}", e),
        }
    }
}
