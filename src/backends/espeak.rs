//! Speech through the `espeak-ng` command-line synthesizer.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! Each utterance is played by one `espeak-ng` child process reading the text
//! from stdin. Cancelling kills the child. Completion is detected when
//! [`SpeechSynthesis::poll_events`] finds the child has exited.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::{
    SpeechError, SpeechEvent, SpeechFailure, SpeechSynthesis, Utterance, UtteranceId, Voice,
};

/// Words per minute at rate 1.0.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Location of the espeak-ng binary and its data directory.
///
/// Either path can be `None` to fall back to the system default.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let bin = self
            .bin_path
            .as_deref()
            .unwrap_or_else(|| Path::new("espeak-ng"));
        let mut command = Command::new(bin);
        if let Some(data) = &self.data_path {
            command.env("ESPEAK_DATA_PATH", data);
        }
        command
    }
}

/// [`SpeechSynthesis`] backend that plays through `espeak-ng`.
pub struct EspeakSynth {
    config: EspeakConfig,
    voices: Vec<Voice>,
    playing: Option<(UtteranceId, Child)>,
    events: VecDeque<SpeechEvent>,
}

impl EspeakSynth {
    /// Create a backend that uses `espeak-ng` from PATH.
    pub fn new() -> Result<Self, SpeechError> {
        Self::with_config(EspeakConfig::default())
    }

    /// Create a backend with explicit espeak-ng binary and data paths.
    ///
    /// Fails with [`SpeechError::BackendNotFound`] when the binary cannot be
    /// started, so callers can fall back to running without speech.
    pub fn with_config(config: EspeakConfig) -> Result<Self, SpeechError> {
        let output = config
            .command()
            .arg("--voices")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SpeechError::BackendNotFound("espeak-ng".to_string())
                } else {
                    SpeechError::Io(e)
                }
            })?;

        let voices = parse_voices(&String::from_utf8_lossy(&output.stdout));
        log::info!("espeak-ng reported {} voices", voices.len());

        let mut events = VecDeque::new();
        events.push_back(SpeechEvent::VoicesChanged);

        Ok(Self {
            config,
            voices,
            playing: None,
            events,
        })
    }

    fn kill_playing(&mut self) {
        if let Some((id, mut child)) = self.playing.take() {
            if let Err(e) = child.kill() {
                log::debug!("espeak-ng for utterance {id} already gone: {e}");
            }
            let _ = child.wait();
            self.events.push_back(SpeechEvent::Failed {
                id,
                failure: SpeechFailure::Canceled,
            });
        }
    }
}

impl Drop for EspeakSynth {
    fn drop(&mut self) {
        self.kill_playing();
    }
}

impl SpeechSynthesis for EspeakSynth {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        self.kill_playing();

        let voice = utterance
            .voice
            .clone()
            .unwrap_or_else(|| utterance.lang.to_ascii_lowercase());
        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(80.0);
        let amplitude = (utterance.volume.clamp(0.0, 1.0) * 100.0).round();
        let pitch = (utterance.pitch.clamp(0.0, 2.0) * 50.0).round().min(99.0);

        let mut child = self
            .config
            .command()
            .args(["--stdin", "-v", voice.as_str()])
            .arg("-s")
            .arg(format!("{words_per_minute}"))
            .arg("-a")
            .arg(format!("{amplitude}"))
            .arg("-p")
            .arg(format!("{pitch}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SpeechError::BackendNotFound("espeak-ng".to_string())
                } else {
                    SpeechError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = canonicalize_stdin_payload(&utterance.text);
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SpeechError::Io(e));
            }
        }

        self.events.push_back(SpeechEvent::Started(utterance.id));
        self.playing = Some((utterance.id, child));
        Ok(())
    }

    fn cancel(&mut self) {
        self.kill_playing();
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        let finished = match self.playing.as_mut() {
            Some((id, child)) => match child.try_wait() {
                Ok(Some(status)) if status.success() => Some(SpeechEvent::Ended(*id)),
                Ok(Some(status)) => Some(SpeechEvent::Failed {
                    id: *id,
                    failure: SpeechFailure::Other(format!(
                        "espeak-ng exited with code {:?}",
                        status.code()
                    )),
                }),
                Ok(None) => None,
                Err(e) => Some(SpeechEvent::Failed {
                    id: *id,
                    failure: SpeechFailure::Other(e.to_string()),
                }),
            },
            None => None,
        };

        if let Some(event) = finished {
            self.playing = None;
            self.events.push_back(event);
        }

        self.events.drain(..).collect()
    }
}

/// espeak-ng reads stdin line by line; an unterminated last line can be
/// dropped, so the payload always ends with a newline.
fn canonicalize_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
///  5  es              --/M      Spanish_(Spain)    roa/es
/// ```
///
/// The `File` column is used as the voice name since `-v` accepts it.
fn parse_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let lang = columns.get(1)?;
            let file = columns.get(4)?;
            Some(Voice::new(*file, *lang))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::process::Command;
    use std::time::{Duration, Instant};

    use super::{canonicalize_stdin_payload, parse_voices, EspeakSynth};
    use crate::narration::{Narrator, NarratorParams};

    #[test]
    fn parses_voice_table() {
        let output = "Pty Language Age/Gender VoiceName File Other Languages\n \
                      5  en-us  --/M  English_(America)  gmw/en-US  (en 10)\n \
                      5  es     --/M  Spanish_(Spain)    roa/es\n";
        let voices = parse_voices(output);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "gmw/en-US");
        assert_eq!(voices[0].lang, "en-us");
        assert_eq!(voices[1].lang, "es");
    }

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(canonicalize_stdin_payload("Hola"), "Hola\n");
        assert_eq!(canonicalize_stdin_payload("Hola\n"), "Hola\n");
    }

    #[test]
    fn cancel_reports_canceled_and_clears_speaking() {
        // Skip when espeak-ng is unavailable in the execution environment.
        if Command::new("espeak-ng").arg("--version").output().is_err() {
            return;
        }

        let synth = EspeakSynth::new().expect("espeak-ng should start");
        let mut narrator = Narrator::new(synth, NarratorParams::default());
        narrator.set_enabled(true);

        let now = Instant::now();
        narrator.pump(now);
        narrator.speak("Una frase bastante larga para poder cancelarla a tiempo", now);
        narrator.pump(now);

        narrator.stop();
        narrator.pump(now + Duration::from_millis(10));
        assert!(!narrator.is_speaking());
    }
}
