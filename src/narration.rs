//! Speech output with deterministic cancellation.
//!
//! [`Narrator`] wraps a [`SpeechSynthesis`] backend. Every [`Narrator::speak`]
//! cancels whatever is playing or pending before claiming the channel, so at
//! most one utterance is ever active. Backend callbacks are matched against
//! the active [`UtteranceId`]; callbacks for replaced utterances are ignored.
//!
//! When the backend has not published its voices yet, the request is parked
//! until either [`SpeechEvent::VoicesChanged`] arrives or
//! [`NarratorParams::voices_timeout`] elapses, whichever happens first.

use std::time::{Duration, Instant};

use derive_builder::Builder;

use crate::settings::Language;
use crate::{SpeechEvent, SpeechSynthesis, Utterance, UtteranceId, Voice};

/// Parameters for configuring a [`Narrator`].
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct NarratorParams {
    /// How long to wait for the voice list before speaking with the
    /// backend's default voice.
    pub voices_timeout: Duration,
    /// Speech rate multiplier. Range: 0.1–10.0, default 1.0.
    pub rate: f32,
    /// Pitch multiplier. Range: 0.0–2.0, default 1.0.
    pub pitch: f32,
    /// Volume. Range: 0.0–1.0, default 1.0.
    pub volume: f32,
}

impl Default for NarratorParams {
    fn default() -> Self {
        Self {
            voices_timeout: Duration::from_millis(1000),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug)]
struct AwaitingVoices {
    text: String,
    deadline: Instant,
}

pub struct Narrator<S: SpeechSynthesis> {
    backend: S,
    params: NarratorParams,
    enabled: bool,
    language: Language,
    next_id: u64,
    active: Option<UtteranceId>,
    speaking: bool,
    awaiting_voices: Option<AwaitingVoices>,
}

impl<S: SpeechSynthesis> Narrator<S> {
    /// Create a disabled narrator. Enable it with [`Narrator::set_enabled`].
    pub fn new(backend: S, params: NarratorParams) -> Self {
        Self {
            backend,
            params,
            enabled: false,
            language: Language::default(),
            next_id: 0,
            active: None,
            speaking: false,
            awaiting_voices: None,
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn params(&self) -> &NarratorParams {
        &self.params
    }

    /// True strictly between the active utterance starting playback and
    /// its end, error or cancellation.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Master switch. Disabling cancels anything active or pending.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    /// Language used for voice selection on the next utterance.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Speak `text`, replacing any current narration.
    ///
    /// Returns whether the request was handed to the backend or parked until
    /// voices load. Narration disabled, an unavailable or refusing backend
    /// and text that sanitizes to nothing all return `false` silently.
    pub fn speak(&mut self, text: &str, now: Instant) -> bool {
        if !self.enabled {
            log::debug!("Narration disabled, dropping {text:?}");
            return false;
        }
        if !self.backend.is_available() {
            log::warn!("Speech synthesis unavailable, dropping narration");
            return false;
        }

        let text = sanitize(text);
        if text.is_empty() {
            return false;
        }

        self.cancel_current();

        if self.backend.voices().is_empty() {
            log::debug!(
                "Voices not loaded yet, waiting up to {:?}",
                self.params.voices_timeout
            );
            self.awaiting_voices = Some(AwaitingVoices {
                text,
                deadline: now + self.params.voices_timeout,
            });
            return true;
        }

        self.start(text)
    }

    /// Cancel the active and any pending utterance. Safe when idle.
    pub fn stop(&mut self) {
        self.cancel_current();
    }

    /// Feed one backend callback.
    pub fn handle_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::VoicesChanged => {
                if let Some(waiting) = self.awaiting_voices.take() {
                    log::debug!("Voices ready, starting parked narration");
                    self.start(waiting.text);
                }
            }
            SpeechEvent::Started(id) => {
                if self.active == Some(id) {
                    self.speaking = true;
                }
            }
            SpeechEvent::Ended(id) => {
                if self.active == Some(id) {
                    self.active = None;
                    self.speaking = false;
                }
            }
            SpeechEvent::Failed { id, failure } => {
                if failure.is_expected() {
                    log::debug!("Utterance {id} {failure}");
                } else {
                    log::warn!("Utterance {id} failed: {failure}");
                }
                if self.active == Some(id) {
                    self.active = None;
                    self.speaking = false;
                }
            }
        }
    }

    /// Drain backend callbacks and fire the voices-ready fallback when due.
    pub fn pump(&mut self, now: Instant) {
        for event in self.backend.poll_events() {
            self.handle_event(event);
        }

        let due = self
            .awaiting_voices
            .as_ref()
            .is_some_and(|waiting| now >= waiting.deadline);
        if due {
            if let Some(waiting) = self.awaiting_voices.take() {
                log::debug!("Voices still unavailable, using backend default voice");
                self.start(waiting.text);
            }
        }
    }

    fn cancel_current(&mut self) {
        self.backend.cancel();
        self.awaiting_voices = None;
        self.active = None;
        self.speaking = false;
    }

    fn start(&mut self, text: String) -> bool {
        let voices = self.backend.voices();
        let voice = select_voice(&voices, self.language.locale()).map(|v| v.name.clone());

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let utterance = Utterance {
            id,
            text,
            lang: self.language.locale().to_string(),
            voice,
            rate: self.params.rate,
            pitch: self.params.pitch,
            volume: self.params.volume,
        };

        match self.backend.speak(utterance) {
            Ok(()) => {
                self.active = Some(id);
                true
            }
            Err(e) => {
                log::warn!("Speech backend refused utterance {id}: {e}");
                self.active = None;
                self.speaking = false;
                false
            }
        }
    }
}

/// Pick the voice for `locale`: exact tag first, then same primary
/// language, preferring the backend default within each tier.
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    let wanted = normalize_tag(locale);
    let primary = wanted.split('-').next().unwrap_or_default().to_string();

    let exact: Vec<&Voice> = voices
        .iter()
        .filter(|v| normalize_tag(&v.lang) == wanted)
        .collect();
    if let Some(voice) = prefer_default(&exact) {
        return Some(voice);
    }

    let same_language: Vec<&Voice> = voices
        .iter()
        .filter(|v| normalize_tag(&v.lang).split('-').next() == Some(primary.as_str()))
        .collect();
    prefer_default(&same_language)
}

fn prefer_default<'a>(candidates: &[&'a Voice]) -> Option<&'a Voice> {
    candidates
        .iter()
        .find(|v| v.default)
        .or_else(|| candidates.first())
        .copied()
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Collapse whitespace, drop invisible characters and emoji, trim.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if is_invisible(ch) || is_emoji(ch) {
            continue;
        }
        if ch.is_whitespace() || ch.is_control() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            continue;
        }
        out.push(ch);
    }
    out.trim_end().to_string()
}

fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{E0000}'..='\u{E007F}'
    )
}

fn is_emoji(ch: char) -> bool {
    matches!(
        ch,
        '\u{1F000}'..='\u{1FAFF}' | '\u{2600}'..='\u{27BF}' | '\u{2B00}'..='\u{2BFF}' | '\u{20E3}'
    )
}
