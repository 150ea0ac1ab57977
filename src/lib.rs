//! Text filters that turn raw application text into speakable utterances.
//!
//! # Pipeline
//!
//! ```text
//! (text, talker, app_id)
//!        │
//!        ▼
//! FilterPipeline::convert()
//!        ├─ StringReplacerFilter   word-list substitutions
//!        ├─ XmlTransformFilter     external XSLT processor (subprocess)
//!        └─ SentenceBoundaryFilter prose / code / SSML → "s1\ts2\t…"
//! ```
//!
//! Every filter is gated by language codes and application ids; a filter
//! whose gate does not match returns its input untouched.

pub mod config;
pub mod filter;
pub mod pipeline;
pub mod replacer;
pub mod sbd;
pub mod talker;
pub mod xml;
pub mod xml_transform;

pub use filter::{FilterConfig, FilterError, FilterEvent, FilterState, TextFilter};
pub use pipeline::{FilterPipeline, PipelineState};
pub use replacer::StringReplacerFilter;
pub use sbd::SentenceBoundaryFilter;
pub use talker::TalkerDescriptor;
pub use xml_transform::XmlTransformFilter;
