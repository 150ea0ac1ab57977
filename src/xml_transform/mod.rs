//! XML-transform filter — hands matching documents to an XSLT processor.
//!
//! ```text
//! convert(text)
//!   ├─ gate / not configured / root+doctype mismatch ──▶ text unchanged
//!   └─ match ──▶ worker thread: run_transform(xsltproc, stylesheet, text)
//!                  ├─ Ok(out)        ──▶ Finished(out, modified)
//!                  ├─ Err(Cancelled) ──▶ Stopped
//!                  └─ Err(_)         ──▶ Finished(text, unmodified)
//! ```
//!
//! A typical use is turning XHTML into SSML ahead of the sentence-boundary
//! detector.

pub mod process;

pub use process::{run_transform, TransformError};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::filter::{
    convert_blocking, AsyncWorker, FilterConfig, FilterEvent, FilterState, JobOutcome, TextFilter,
};
use crate::talker::TalkerDescriptor;
use crate::xml;

/// Processor looked up on `PATH` when none is configured.
pub const DEFAULT_PROCESSOR: &str = "xsltproc";

// ---------------------------------------------------------------------------
// XmlTransformSettings
// ---------------------------------------------------------------------------

/// Configuration of an [`XmlTransformFilter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlTransformSettings {
    /// The XSLT stylesheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xslt_file: Option<PathBuf>,
    /// Processor executable; a bare name is resolved on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xsltproc: Option<PathBuf>,
    /// Root element names that trigger the transform.
    #[serde(default)]
    pub root_elements: Vec<String>,
    /// DOCTYPE names that trigger the transform.
    #[serde(default)]
    pub doctypes: Vec<String>,
}

/// Resolve the processor executable.  Bare names are looked up on `PATH`;
/// paths are used as-is when they exist.
fn resolve_processor(configured: Option<&Path>) -> Option<PathBuf> {
    let candidate = configured.unwrap_or_else(|| Path::new(DEFAULT_PROCESSOR));
    if candidate.as_os_str().is_empty() {
        return None;
    }
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.exists().then(|| candidate.to_path_buf());
    }
    which::which(candidate).ok()
}

// ---------------------------------------------------------------------------
// XmlTransformFilter
// ---------------------------------------------------------------------------

pub struct XmlTransformFilter {
    name: String,
    gate: FilterConfig,
    stylesheet: Option<PathBuf>,
    processor: Option<PathBuf>,
    root_elements: Vec<String>,
    doctypes: Vec<String>,
    worker: AsyncWorker,
}

impl XmlTransformFilter {
    /// Build the filter.  A missing stylesheet or processor is logged; the
    /// filter then passes every text through unchanged.
    pub fn new(name: impl Into<String>, gate: FilterConfig, settings: XmlTransformSettings) -> Self {
        let name = name.into();
        let processor = resolve_processor(settings.xsltproc.as_deref());
        let stylesheet = settings.xslt_file.filter(|p| !p.as_os_str().is_empty());

        if processor.is_none() {
            log::warn!("{name}: XSLT processor not found; filter will pass text through");
        }
        if stylesheet.as_deref().map_or(true, |p| !p.exists()) {
            log::warn!("{name}: stylesheet missing; filter will pass text through");
        }

        Self {
            worker: AsyncWorker::new(&name),
            name,
            gate,
            stylesheet,
            processor,
            root_elements: settings.root_elements,
            doctypes: settings.doctypes,
        }
    }

    /// Both a stylesheet and a processor are available.
    pub fn is_configured(&self) -> bool {
        self.processor.is_some() && self.stylesheet.as_deref().is_some_and(Path::exists)
    }

    /// Does `text` have a configured root element or DOCTYPE?
    ///
    /// With no matchers configured every text matches.
    pub fn matches_document(&self, text: &str) -> bool {
        if self.root_elements.is_empty() && self.doctypes.is_empty() {
            return true;
        }
        self.root_elements
            .iter()
            .any(|root| xml::has_root_element(text, root))
            || self.doctypes.iter().any(|d| xml::has_doctype(text, d))
    }
}

impl TextFilter for XmlTransformFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> String {
        convert_blocking(self, text, talker, app_id)
    }

    fn was_modified(&self) -> bool {
        self.worker.was_modified()
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn is_sbd(&self) -> bool {
        self.gate.is_sbd
    }

    fn async_convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> bool {
        if !self.gate.matches(talker, app_id) || !self.is_configured() || !self.matches_document(text) {
            self.worker.clear_modified();
            return false;
        }
        let (Some(processor), Some(stylesheet)) = (self.processor.clone(), self.stylesheet.clone())
        else {
            return false;
        };

        let name = self.name.clone();
        let input = text.to_string();
        self.worker.start(move |cancel| {
            match run_transform(&processor, &stylesheet, &input, cancel) {
                Ok(output) => {
                    log::debug!("{name}: transformed {} → {} bytes", input.len(), output.len());
                    Some(JobOutcome {
                        output,
                        modified: true,
                    })
                }
                Err(TransformError::Cancelled) => None,
                Err(e) => {
                    log::warn!("{name}: {e}; passing text through");
                    Some(JobOutcome {
                        output: input,
                        modified: false,
                    })
                }
            }
        });
        true
    }

    fn state(&self) -> FilterState {
        self.worker.state()
    }

    fn wait_for_finished(&self) {
        self.worker.wait();
    }

    fn output(&self) -> String {
        self.worker.output()
    }

    fn ack_finished(&self) {
        self.worker.ack();
    }

    fn stop_filtering(&self) {
        self.worker.stop();
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<FilterEvent>> {
        Some(self.worker.subscribe())
    }
}
