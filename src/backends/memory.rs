use std::collections::VecDeque;

use crate::{SpeechError, SpeechEvent, SpeechFailure, SpeechSynthesis, Utterance, Voice};

/// Scripted in-process backend.
///
/// Records every utterance and cancel, and reports callbacks the way a
/// browser speech engine does: `Started` right after `speak`, and an
/// `Interrupted` failure for the playing utterance when it is canceled.
/// Completion and errors are triggered explicitly with
/// [`RecordingSynth::finish_current`] and [`RecordingSynth::fail_current`].
#[derive(Debug)]
pub struct RecordingSynth {
    available: bool,
    voices: Vec<Voice>,
    spoken: Vec<Utterance>,
    current: Option<usize>,
    cancels: usize,
    events: VecDeque<SpeechEvent>,
    reject_with: Option<String>,
}

impl Default for RecordingSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSynth {
    /// Available backend with a Spanish and an English voice.
    pub fn new() -> Self {
        let mut spanish = Voice::new("Español (España)", "es-ES");
        spanish.default = true;
        Self::with_voices(vec![spanish, Voice::new("English (US)", "en-US")])
    }

    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            available: true,
            voices,
            spoken: Vec::new(),
            current: None,
            cancels: 0,
            events: VecDeque::new(),
            reject_with: None,
        }
    }

    /// Available backend whose voice list has not loaded yet.
    pub fn without_voices() -> Self {
        Self::with_voices(Vec::new())
    }

    /// A platform without speech support.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::without_voices()
        }
    }

    /// Every utterance handed to the backend, in order.
    pub fn spoken(&self) -> &[Utterance] {
        &self.spoken
    }

    /// Texts of every utterance handed to the backend, in order.
    pub fn spoken_texts(&self) -> Vec<&str> {
        self.spoken.iter().map(|u| u.text.as_str()).collect()
    }

    /// The utterance currently playing, if any.
    pub fn active(&self) -> Option<&Utterance> {
        self.current.and_then(|i| self.spoken.get(i))
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels
    }

    /// Publish a voice list and report `VoicesChanged`.
    pub fn publish_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
        self.events.push_back(SpeechEvent::VoicesChanged);
    }

    /// Complete the playing utterance normally.
    pub fn finish_current(&mut self) {
        if let Some(utterance) = self.current.take().and_then(|i| self.spoken.get(i)) {
            self.events.push_back(SpeechEvent::Ended(utterance.id));
        }
    }

    /// Fail the playing utterance with a platform error.
    pub fn fail_current(&mut self, reason: &str) {
        if let Some(utterance) = self.current.take().and_then(|i| self.spoken.get(i)) {
            self.events.push_back(SpeechEvent::Failed {
                id: utterance.id,
                failure: SpeechFailure::Other(reason.to_string()),
            });
        }
    }

    /// Make the next `speak` call fail synchronously.
    pub fn reject_next(&mut self, reason: &str) {
        self.reject_with = Some(reason.to_string());
    }
}

impl SpeechSynthesis for RecordingSynth {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unavailable);
        }
        if let Some(reason) = self.reject_with.take() {
            return Err(SpeechError::Rejected(reason));
        }

        self.events.push_back(SpeechEvent::Started(utterance.id));
        self.spoken.push(utterance);
        self.current = Some(self.spoken.len() - 1);
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancels += 1;
        if let Some(utterance) = self.current.take().and_then(|i| self.spoken.get(i)) {
            self.events.push_back(SpeechEvent::Failed {
                id: utterance.id,
                failure: SpeechFailure::Interrupted,
            });
        }
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        self.events.drain(..).collect()
    }
}
