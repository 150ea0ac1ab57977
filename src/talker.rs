//! Talker descriptor — the voice/language a downstream synthesizer will use.
//!
//! Filters only ever read a [`TalkerDescriptor`]; it is built once per
//! request and never mutated while a pipeline run is in progress.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TalkerDescriptor
// ---------------------------------------------------------------------------

/// Describes the voice that will ultimately speak the filtered text.
///
/// `voice_name`, `gender`, `volume` and `rate` are descriptive tags only;
/// the filter core never interprets them numerically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkerDescriptor {
    /// ISO-639 language code, e.g. `"en"`.
    pub language_code: String,
    /// Optional country code, e.g. `Some("US")`.
    pub country_code: Option<String>,
    /// Synthesizer voice name.
    #[serde(default)]
    pub voice_name: String,
    /// `"male"`, `"female"`, `"neutral"` or empty.
    #[serde(default)]
    pub gender: String,
    /// Descriptive volume tag (`"medium"`, `"loud"`, …).
    #[serde(default)]
    pub volume: String,
    /// Descriptive rate tag (`"medium"`, `"fast"`, …).
    #[serde(default)]
    pub rate: String,
}

impl TalkerDescriptor {
    /// Build a descriptor from a full language code such as `"en_US"`,
    /// `"en-GB"` or plain `"de"`.
    ///
    /// ```
    /// use speech_filters::TalkerDescriptor;
    ///
    /// let talker = TalkerDescriptor::new("en_US");
    /// assert_eq!(talker.language_code, "en");
    /// assert_eq!(talker.country_code.as_deref(), Some("US"));
    /// ```
    pub fn new(full_language_code: &str) -> Self {
        let (language_code, country_code) = split_language_code(full_language_code);
        Self {
            language_code,
            country_code,
            ..Self::default()
        }
    }

    /// Set the voice name.
    pub fn with_voice(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = voice_name.into();
        self
    }

    /// Set the gender tag.
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = gender.into();
        self
    }

    /// `"en_US"` when a country is present, otherwise just `"en"`.
    pub fn full_language_code(&self) -> String {
        match self.country_code.as_deref() {
            Some(country) if !country.is_empty() => {
                format!("{}_{}", self.language_code, country)
            }
            _ => self.language_code.clone(),
        }
    }
}

/// Compact talker code used in log lines.
impl fmt::Display for TalkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<voice lang=\"{}\"", self.full_language_code())?;
        if !self.voice_name.is_empty() {
            write!(f, " name=\"{}\"", self.voice_name)?;
        }
        if !self.gender.is_empty() {
            write!(f, " gender=\"{}\"", self.gender)?;
        }
        write!(f, "/>")?;
        if !self.volume.is_empty() || !self.rate.is_empty() {
            write!(f, "<prosody")?;
            if !self.volume.is_empty() {
                write!(f, " volume=\"{}\"", self.volume)?;
            }
            if !self.rate.is_empty() {
                write!(f, " rate=\"{}\"", self.rate)?;
            }
            write!(f, "/>")?;
        }
        Ok(())
    }
}

/// Split `"en_US"` / `"en-US"` into `("en", Some("US"))`.
///
/// Anything after a `.` or `@` (POSIX locale charset/modifier) is dropped.
pub fn split_language_code(full: &str) -> (String, Option<String>) {
    let base = full.split(['.', '@']).next().unwrap_or_default().trim();
    match base.split_once(['_', '-']) {
        Some((lang, country)) if !country.is_empty() => {
            (lang.to_lowercase(), Some(country.to_uppercase()))
        }
        Some((lang, _)) => (lang.to_lowercase(), None),
        None => (base.to_lowercase(), None),
    }
}
