//! Filter pipeline — runs every configured filter in order.
//!
//! # Architecture
//!
//! ```text
//! (text, talker, app_id)
//!        │
//!        ▼
//! FilterPipeline::convert()          Idle ─▶ Filtering
//!        │
//!        ├─ filter 0  sync:  convert()
//!        ├─ filter 1  async: async_convert() → wait_for_finished() → output() → ack_finished()
//!        ├─ …         (SBD filters skipped while skip_sbd is set)
//!        └─ filter n
//!        │
//!        ▼
//! output of filter n                 Filtering ─▶ Finished
//! ```
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use speech_filters::pipeline::FilterPipeline;
//! use speech_filters::replacer::{ReplacementRule, StringReplacerFilter};
//! use speech_filters::sbd::{SbdSettings, SentenceBoundaryFilter};
//! use speech_filters::{FilterConfig, TalkerDescriptor, TextFilter};
//!
//! let replacer = StringReplacerFilter::new(
//!     "abbreviations",
//!     FilterConfig::default(),
//!     &[ReplacementRule::word("Dr.", "Doctor")],
//! );
//! let sbd = SentenceBoundaryFilter::new("sbd", FilterConfig::default(), &SbdSettings::default())?;
//!
//! let filters: Vec<Arc<dyn TextFilter>> = vec![Arc::new(replacer), Arc::new(sbd)];
//! let pipeline = FilterPipeline::new(filters);
//!
//! let out = pipeline.convert("Dr. Who is here. Run!", &TalkerDescriptor::new("en"), "");
//! assert_eq!(out, "Doctor Who is here.\tRun!");
//! # Ok::<(), speech_filters::FilterError>(())
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::FilterPipeline;
pub use state::PipelineState;
