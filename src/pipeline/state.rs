//! Pipeline state machine.
//!
//! [`PipelineState`] tracks one [`FilterPipeline::convert`] run so another
//! thread (or a log line) can tell whether the pipeline is busy.
//!
//! [`FilterPipeline::convert`]: super::FilterPipeline::convert

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the filter pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──convert()──▶ Filtering ──last filter returned──▶ Finished
///                     Filtering ──stop()──────────────────▶ Idle
/// Finished ──convert()──▶ Filtering
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    /// No conversion has run yet, or the last one was stopped.
    #[default]
    Idle,

    /// A conversion is running through the filters.
    Filtering,

    /// Every filter has returned; the output was handed back to the caller.
    Finished,
}

impl PipelineState {
    /// Returns `true` while a conversion is in progress.
    ///
    /// ```
    /// use speech_filters::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_busy());
    /// assert!(PipelineState::Filtering.is_busy());
    /// assert!(!PipelineState::Finished.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineState::Filtering)
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Filtering => "Filtering",
            PipelineState::Finished => "Finished",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
