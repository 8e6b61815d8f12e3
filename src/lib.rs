//! # narration-rs
//!
//! An accessibility narration engine for interactive front ends: persisted
//! accessibility preferences, element-to-speech text resolution, debounced
//! hover/focus narration and application-wide keyboard shortcuts.
//!
//! ## Features
//!
//! - **Settings Store**: language, font scale, color-vision filter, dark mode
//!   and the narration master switch, persisted under namespaced keys
//! - **Text Resolver**: priority-ordered choice of what to read for an element
//! - **Narrator**: cancel-then-claim speech with voice selection and a
//!   voices-ready fallback
//! - **Interaction Listener**: debounced hover, immediate keyboard focus and
//!   recency suppression of repeats
//! - **Shortcuts**: `Alt+Shift+<letter>` combinations with spoken confirmation
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Instant;
//! use narration_rs::backends::memory::RecordingSynth;
//! use narration_rs::listener::{InteractionListener, ListenerParams, ScriptedEvents};
//! use narration_rs::narration::{Narrator, NarratorParams};
//! use narration_rs::service::AccessibilityService;
//! use narration_rs::settings::{storage::MemoryStorage, NoEffects, SettingsStore};
//!
//! let store = SettingsStore::load(MemoryStorage::default(), Box::new(NoEffects));
//! let narrator = Narrator::new(RecordingSynth::new(), NarratorParams::default());
//! let listener = InteractionListener::new(ScriptedEvents::default(), ListenerParams::default());
//! let mut service = AccessibilityService::new(store, narrator, listener);
//!
//! let now = Instant::now();
//! service.toggle_narration(now);
//! service.speak("Bienvenido", now);
//! service.pump(now);
//! assert!(service.is_speaking());
//! ```

pub mod backends;
pub mod listener;
pub mod narration;
pub mod resolver;
pub mod service;
pub mod settings;
pub mod shortcuts;

use std::fmt;

/// A voice offered by a speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Backend-specific voice name, passed back verbatim when selected.
    pub name: String,
    /// BCP 47 language tag (e.g. `"es-ES"`, `"en-US"`).
    pub lang: String,
    /// Whether the backend marks this voice as its default.
    pub default: bool,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            default: false,
        }
    }
}

/// Identifier assigned to every utterance handed to a backend.
///
/// Callbacks carry it back so stale events from a canceled utterance can
/// never be mistaken for events of the one that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One discrete unit of synthesized speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    /// Sanitized text, never empty.
    pub text: String,
    /// Language tag requested for the utterance.
    pub lang: String,
    /// Selected voice name. `None` leaves the choice to the backend default.
    pub voice: Option<String>,
    /// Speech rate multiplier. 1.0 is the backend's normal rate.
    pub rate: f32,
    /// Pitch multiplier. 1.0 is the voice's normal pitch.
    pub pitch: f32,
    /// Volume in the range 0.0–1.0.
    pub volume: f32,
}

/// Why an utterance stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechFailure {
    /// The utterance was canceled before or during playback.
    Canceled,
    /// A newer utterance interrupted this one.
    Interrupted,
    /// Any other playback failure reported by the backend.
    Other(String),
}

impl SpeechFailure {
    /// Cancellation and interruption happen every time a new narration
    /// replaces an old one; they are not faults.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Canceled | Self::Interrupted)
    }
}

impl fmt::Display for SpeechFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => f.write_str("canceled"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Asynchronous callbacks reported by a speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The voice list became available or changed.
    VoicesChanged,
    /// Playback of the utterance started.
    Started(UtteranceId),
    /// Playback of the utterance finished normally.
    Ended(UtteranceId),
    /// Playback of the utterance stopped with an error.
    Failed {
        id: UtteranceId,
        failure: SpeechFailure,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error("Speech synthesis is not available on this platform")]
    Unavailable,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Speech backend '{0}' not found")]
    BackendNotFound(String),
    #[error("Speech backend rejected the utterance: {0}")]
    Rejected(String),
}

/// Common interface for platform speech-synthesis capabilities.
///
/// Backends are driven cooperatively: `speak` and `cancel` return
/// immediately, and the lifecycle of each utterance is reported later
/// through [`SpeechSynthesis::poll_events`].
pub trait SpeechSynthesis {
    /// Feature check. When this returns false every narration is a no-op.
    fn is_available(&self) -> bool;

    /// Voices known to the backend. May be empty until the backend reports
    /// [`SpeechEvent::VoicesChanged`].
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance for playback.
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Cancel the playing utterance and anything pending. Safe when idle.
    fn cancel(&mut self);

    /// Drain callbacks accumulated since the last call.
    fn poll_events(&mut self) -> Vec<SpeechEvent>;
}

impl<T: SpeechSynthesis + ?Sized> SpeechSynthesis for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        (**self).speak(utterance)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        (**self).poll_events()
    }
}
