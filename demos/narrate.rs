use std::thread;
use std::time::{Duration, Instant};

use env_logger::Env;
use narration_rs::listener::{
    FocusOrigin, InteractionEvent, InteractionListener, ListenerParams, ScriptedEvents,
};
use narration_rs::narration::{Narrator, NarratorParams};
use narration_rs::resolver::{Element, LabelIndex};
use narration_rs::service::AccessibilityService;
use narration_rs::settings::storage::JsonFileStorage;
use narration_rs::settings::{NoEffects, SettingsStore};
use narration_rs::shortcuts::{help_lines, KeyEvent};
use narration_rs::SpeechSynthesis;

#[cfg(feature = "espeak")]
fn backend() -> Box<dyn SpeechSynthesis> {
    use narration_rs::backends::espeak::EspeakSynth;
    match EspeakSynth::new() {
        Ok(synth) => Box::new(synth),
        Err(e) => {
            log::warn!("{e}; falling back to the recording backend");
            Box::new(narration_rs::backends::memory::RecordingSynth::new())
        }
    }
}

#[cfg(not(feature = "espeak"))]
fn backend() -> Box<dyn SpeechSynthesis> {
    Box::new(narration_rs::backends::memory::RecordingSynth::new())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings_path = std::env::temp_dir().join("narration-rs-demo").join("settings.json");
    let storage = JsonFileStorage::open(&settings_path)?;
    println!("Settings file: {}", storage.path().display());

    let mut labels = LabelIndex::default();
    labels.insert("visitor-email", "Correo del visitante");

    let store = SettingsStore::load(storage, Box::new(NoEffects));
    let narrator = Narrator::new(backend(), NarratorParams::default());
    let listener = InteractionListener::new(
        ScriptedEvents::with_labels(labels),
        ListenerParams::default(),
    );
    let mut service = AccessibilityService::new(store, narrator, listener);

    for line in help_lines(service.settings().language) {
        println!("  {line}");
    }

    let start = Instant::now();
    if !service.settings().narration_enabled {
        service.handle_key(&KeyEvent::alt_shift('s'), start);
    }

    let script = [
        (0, InteractionEvent::PointerEnter(Element::new(1, "h1").text("Comunidades turísticas"))),
        (100, InteractionEvent::PointerLeave(narration_rs::resolver::ElementKey(1))),
        (
            200,
            InteractionEvent::PointerEnter(
                Element::new(2, "a").attr("aria-label", "Ver guías locales"),
            ),
        ),
        (
            1500,
            InteractionEvent::Focus {
                element: Element::new(3, "input").attr("type", "email").attr("id", "visitor-email"),
                origin: FocusOrigin::Keyboard,
            },
        ),
    ];

    for (offset_ms, event) in script {
        let at = start + Duration::from_millis(offset_ms);
        while Instant::now() < at {
            service.pump(Instant::now());
            thread::sleep(Duration::from_millis(20));
        }
        service.listener_mut().source_mut().push(event);
        service.pump(Instant::now());
    }

    let outcome = service.handle_key(&KeyEvent::alt_shift('i'), Instant::now());
    println!("Shortcut outcome: {outcome:?}");

    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline && service.is_speaking() {
        service.pump(Instant::now());
        thread::sleep(Duration::from_millis(20));
    }

    println!("Final status: {}", serde_json::to_string_pretty(&service.status())?);
    Ok(())
}
