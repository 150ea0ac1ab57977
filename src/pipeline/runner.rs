//! Pipeline runner — drives a text through every filter in order.
//!
//! [`FilterPipeline`] owns an ordered list of `Arc<dyn TextFilter>` and is
//! built once, either directly or from a [`PipelineConfig`].
//!
//! # Pipeline flow
//!
//! ```text
//! convert(text)
//!   └─▶ for each filter (insertion order):
//!         ├─ is_sbd && skip_sbd      → skipped
//!         ├─ supports_async()        → async_convert() + wait  [filter's worker thread]
//!         └─ otherwise               → convert()               [caller's thread]
//!         └─ was_modified()          → OR-ed into the pipeline flag
//! ```
//!
//! `convert` blocks until the last filter has returned.  [`stop`](FilterPipeline::stop)
//! may be called from another thread; it cancels the filter currently
//! running and skips the rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::PipelineConfig;
use crate::filter::{collect_output, TextFilter};
use crate::talker::TalkerDescriptor;

use super::state::PipelineState;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Progress {
    state: PipelineState,
    /// Index of the filter currently converting.
    current: Option<usize>,
    modified: bool,
    stopped: bool,
}

// ---------------------------------------------------------------------------
// FilterPipeline
// ---------------------------------------------------------------------------

/// Runs an ordered list of filters over a text.
///
/// An empty pipeline is the identity transform.
pub struct FilterPipeline {
    filters: Vec<Arc<dyn TextFilter>>,
    skip_sbd: AtomicBool,
    progress: Mutex<Progress>,
}

impl FilterPipeline {
    /// Create a pipeline; `filters` run in the given order.
    pub fn new(filters: Vec<Arc<dyn TextFilter>>) -> Self {
        Self {
            filters,
            skip_sbd: AtomicBool::new(false),
            progress: Mutex::new(Progress::default()),
        }
    }

    /// Build the pipeline described by `config`.
    ///
    /// Filters that are disabled, missing from the `filters` table, or fail
    /// to build are logged and left out; this never fails.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut filters: Vec<Arc<dyn TextFilter>> = Vec::with_capacity(config.filter_ids.len());

        for id in &config.filter_ids {
            let Some(entry) = config.filters.get(id) else {
                log::warn!("pipeline: filter `{id}` is listed but not configured; skipping");
                continue;
            };
            if !entry.common.enabled {
                log::debug!("pipeline: filter `{id}` is disabled");
                continue;
            }
            match entry.build(id) {
                Ok(filter) => filters.push(filter),
                Err(e) => log::warn!("pipeline: filter `{id}` excluded: {e}"),
            }
        }

        log::info!(
            "pipeline: {} filter(s) active [{}]",
            filters.len(),
            filters.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
        );
        Self::new(filters)
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Run `text` through every filter in order and return the result.
    pub fn convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> String {
        {
            let mut progress = lock(&self.progress);
            progress.state = PipelineState::Filtering;
            progress.current = None;
            progress.modified = false;
            progress.stopped = false;
        }

        let skip_sbd = self.skip_sbd.load(Ordering::Relaxed);
        let mut text = text.to_string();

        for (index, filter) in self.filters.iter().enumerate() {
            if skip_sbd && filter.is_sbd() {
                log::debug!("pipeline: skipping SBD filter `{}`", filter.name());
                continue;
            }
            {
                let mut progress = lock(&self.progress);
                if progress.stopped {
                    break;
                }
                progress.current = Some(index);
            }

            text = if filter.supports_async() {
                self.run_async(filter.as_ref(), &text, talker, app_id)
            } else {
                filter.convert(&text, talker, app_id)
            };

            if filter.was_modified() {
                log::debug!("pipeline: `{}` modified the text", filter.name());
                lock(&self.progress).modified = true;
            }
        }

        let mut progress = lock(&self.progress);
        progress.current = None;
        progress.state = if progress.stopped {
            PipelineState::Idle
        } else {
            PipelineState::Finished
        };
        text
    }

    fn run_async(
        &self,
        filter: &dyn TextFilter,
        text: &str,
        talker: &TalkerDescriptor,
        app_id: &str,
    ) -> String {
        if !filter.async_convert(text, talker, app_id) {
            return text.to_string();
        }
        // A stop between `current` being set and the launch found the
        // filter idle; the new job has to be cancelled here.
        if lock(&self.progress).stopped {
            filter.stop_filtering();
        }
        collect_output(filter, text)
    }

    /// Cancel the running conversion.  Returns immediately; `convert`
    /// hands back whatever text it had when the current filter unwound.
    pub fn stop(&self) {
        let current = {
            let mut progress = lock(&self.progress);
            if !progress.state.is_busy() {
                return;
            }
            progress.stopped = true;
            progress.current
        };
        if let Some(filter) = current.and_then(|i| self.filters.get(i)) {
            log::debug!("pipeline: stopping `{}`", filter.name());
            filter.stop_filtering();
        }
    }

    // -----------------------------------------------------------------------
    // Settings and inspection
    // -----------------------------------------------------------------------

    /// Leave SBD filters out of subsequent conversions.
    pub fn set_skip_sbd(&self, skip: bool) {
        self.skip_sbd.store(skip, Ordering::Relaxed);
    }

    /// One-shot boundary regex for the next conversion of every SBD filter.
    pub fn set_sb_regexp(&self, re: &str) {
        for filter in self.filters.iter().filter(|f| f.is_sbd()) {
            filter.set_sb_regexp(re);
        }
    }

    pub fn state(&self) -> PipelineState {
        lock(&self.progress).state
    }

    /// Did any filter change the text during the last conversion?
    pub fn was_modified(&self) -> bool {
        lock(&self.progress).modified
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;

    use crate::config::{FilterEntry, FilterKind, ReplacerSettings};
    use crate::filter::{convert_blocking, AsyncWorker, FilterConfig, FilterState, JobOutcome};
    use crate::replacer::{ReplacementRule, StringReplacerFilter};
    use crate::sbd::{SbdSettings, SentenceBoundaryFilter};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Appends its tag to the text.
    struct Append {
        tag: &'static str,
        calls: AtomicUsize,
    }

    impl Append {
        fn new(tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                tag,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl TextFilter for Append {
        fn name(&self) -> &str {
            self.tag
        }

        fn convert(&self, text: &str, _: &TalkerDescriptor, _: &str) -> String {
            self.calls.fetch_add(1, Ordering::Relaxed);
            format!("{text}{}", self.tag)
        }

        fn was_modified(&self) -> bool {
            true
        }
    }

    /// Async filter that never finishes until stopped.
    struct Hang {
        worker: AsyncWorker,
        /// When set, `async_convert` meets the test here twice before it
        /// launches the job.
        launch: Option<Arc<Barrier>>,
    }

    impl Hang {
        fn new(launch: Option<Arc<Barrier>>) -> Arc<Self> {
            Arc::new(Self {
                worker: AsyncWorker::new("hang"),
                launch,
            })
        }
    }

    impl TextFilter for Hang {
        fn name(&self) -> &str {
            "hang"
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

        fn async_convert(&self, _: &str, _: &TalkerDescriptor, _: &str) -> bool {
            if let Some(launch) = &self.launch {
                launch.wait();
                launch.wait();
            }
            self.worker.start(|cancel| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                None::<JobOutcome>
            });
            true
        }

        fn state(&self) -> FilterState {
            self.worker.state()
        }

        fn wait_for_finished(&self) {
            self.worker.wait();
        }

        fn stop_filtering(&self) {
            self.worker.stop();
        }
    }

    fn en() -> TalkerDescriptor {
        TalkerDescriptor::new("en")
    }

    fn sbd() -> Arc<SentenceBoundaryFilter> {
        Arc::new(SentenceBoundaryFilter::new("sbd", FilterConfig::default(), &SbdSettings::default()).unwrap())
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = FilterPipeline::new(Vec::new());
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.convert("Hello. World.", &en(), ""), "Hello. World.");
        assert!(!pipeline.was_modified());
        assert_eq!(pipeline.state(), PipelineState::Finished);
    }

    #[test]
    fn filters_run_in_insertion_order() {
        let filters: Vec<Arc<dyn TextFilter>> = vec![Append::new("A"), Append::new("B"), Append::new("C")];
        let pipeline = FilterPipeline::new(filters);
        assert_eq!(pipeline.convert("x", &en(), ""), "xABC");
        assert!(pipeline.was_modified());
        assert_eq!(pipeline.filter_names(), ["A", "B", "C"]);
    }

    #[test]
    fn replacer_output_feeds_sbd() {
        let replacer = StringReplacerFilter::new(
            "r",
            FilterConfig::default(),
            &[ReplacementRule::regex(";", ".")],
        );
        let filters: Vec<Arc<dyn TextFilter>> = vec![Arc::new(replacer), sbd()];
        let pipeline = FilterPipeline::new(filters);
        assert_eq!(pipeline.convert("One, two; three", &en(), ""), "One, two.\tthree");
    }

    #[test]
    fn unmatched_filters_leave_text_and_flag_alone() {
        let gate = FilterConfig::default().with_languages(["de"]);
        let replacer = StringReplacerFilter::new("r", gate, &[ReplacementRule::word("a", "b")]);
        let filters: Vec<Arc<dyn TextFilter>> = vec![Arc::new(replacer)];
        let pipeline = FilterPipeline::new(filters);

        assert_eq!(pipeline.convert("a", &en(), ""), "a");
        assert!(!pipeline.was_modified());
    }

    #[test]
    fn skip_sbd_leaves_text_unsplit() {
        let append = Append::new("!");
        let filters: Vec<Arc<dyn TextFilter>> = vec![append.clone(), sbd()];
        let pipeline = FilterPipeline::new(filters);
        pipeline.set_skip_sbd(true);

        assert_eq!(pipeline.convert("A. B", &en(), ""), "A. B!");
        assert_eq!(append.calls.load(Ordering::Relaxed), 1);

        pipeline.set_skip_sbd(false);
        assert_eq!(pipeline.convert("A. B", &en(), ""), "A.\tB!");
    }

    #[test]
    fn sb_regexp_is_forwarded_to_sbd_filters() {
        let filters: Vec<Arc<dyn TextFilter>> = vec![sbd()];
        let pipeline = FilterPipeline::new(filters);
        pipeline.set_sb_regexp(r"(,)(\s)");
        assert_eq!(pipeline.convert("a, b", &en(), ""), "a,\tb");
        assert_eq!(pipeline.convert("a, b", &en(), ""), "a, b");
    }

    #[test]
    fn stop_from_another_thread_skips_remaining_filters() {
        let append = Append::new("tail");
        let hang = Hang::new(None);
        let filters: Vec<Arc<dyn TextFilter>> = vec![hang.clone(), append.clone()];
        let pipeline = Arc::new(FilterPipeline::new(filters));

        let runner = {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.convert("text", &TalkerDescriptor::new("en"), ""))
        };

        while hang.state() != FilterState::Filtering {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(pipeline.state().is_busy());
        pipeline.stop();

        assert_eq!(runner.join().unwrap(), "text");
        assert_eq!(append.calls.load(Ordering::Relaxed), 0);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn stop_before_the_async_job_launches_still_cancels_it() {
        let launch = Arc::new(Barrier::new(2));
        let append = Append::new("tail");
        let hang = Hang::new(Some(Arc::clone(&launch)));
        let filters: Vec<Arc<dyn TextFilter>> = vec![hang.clone(), append.clone()];
        let pipeline = Arc::new(FilterPipeline::new(filters));

        let runner = {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.convert("text", &TalkerDescriptor::new("en"), ""))
        };

        // The runner has picked the filter but not started its job yet.
        launch.wait();
        assert_eq!(hang.state(), FilterState::Idle);
        pipeline.stop();
        launch.wait();

        assert_eq!(runner.join().unwrap(), "text");
        assert_eq!(append.calls.load(Ordering::Relaxed), 0);
        assert_eq!(hang.state(), FilterState::Idle);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn from_config_skips_missing_disabled_and_broken_filters() {
        let mut config = PipelineConfig {
            filter_ids: vec!["typos".into(), "ghost".into(), "off".into(), "broken".into(), "sbd".into()],
            ..PipelineConfig::default()
        };
        config.filters.insert(
            "typos".into(),
            FilterEntry {
                common: FilterConfig::default(),
                kind: FilterKind::StringReplacer(ReplacerSettings {
                    word_list: None,
                    rules: vec![ReplacementRule::word("teh", "the")],
                }),
            },
        );
        config.filters.insert(
            "off".into(),
            FilterEntry {
                common: FilterConfig {
                    enabled: false,
                    ..FilterConfig::default()
                },
                kind: FilterKind::Sbd(SbdSettings::default()),
            },
        );
        config.filters.insert(
            "broken".into(),
            FilterEntry {
                common: FilterConfig::default(),
                kind: FilterKind::Sbd(SbdSettings {
                    sentence_delimiter_regexp: "([".into(),
                    ..SbdSettings::default()
                }),
            },
        );

        let pipeline = FilterPipeline::from_config(&config);
        assert_eq!(pipeline.filter_names(), ["typos", "sbd"]);
        assert_eq!(pipeline.convert("teh end. ok", &en(), ""), "the end.\tok");
    }
}
