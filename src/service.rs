//! The engine as seen by the settings panel and status indicators.
//!
//! [`AccessibilityService`] owns the settings store, the narrator and the
//! interaction listener and keeps them consistent: the narrator's enabled
//! flag and language always mirror the stored settings, and the listener is
//! attached exactly while narration is enabled.

use std::time::Instant;

use serde::Serialize;

use crate::listener::{EventSource, InteractionListener};
use crate::narration::Narrator;
use crate::settings::storage::KeyValueStore;
use crate::settings::{ColorVisionFilter, FontScale, Language, Settings, SettingsStore};
use crate::shortcuts::{self, KeyEvent, ShortcutAction};
use crate::SpeechSynthesis;

/// Snapshot for status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub settings: Settings,
    pub is_speaking: bool,
    pub panel_open: bool,
}

/// Result of offering a key event to the shortcut dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    pub action: Option<ShortcutAction>,
    /// The host must call `preventDefault` on the event.
    pub prevent_default: bool,
}

pub struct AccessibilityService<S, K, E>
where
    S: SpeechSynthesis,
    K: KeyValueStore,
    E: EventSource,
{
    store: SettingsStore<K>,
    narrator: Narrator<S>,
    listener: InteractionListener<E>,
    panel_open: bool,
}

impl<S, K, E> AccessibilityService<S, K, E>
where
    S: SpeechSynthesis,
    K: KeyValueStore,
    E: EventSource,
{
    /// Wire the components together and bring the narrator and listener in
    /// line with the loaded settings.
    pub fn new(
        store: SettingsStore<K>,
        narrator: Narrator<S>,
        listener: InteractionListener<E>,
    ) -> Self {
        let mut service = Self {
            store,
            narrator,
            listener,
            panel_open: false,
        };
        service.sync_narration();
        service
    }

    pub fn settings(&self) -> Settings {
        self.store.get()
    }

    pub fn status(&self) -> Status {
        Status {
            settings: self.store.get(),
            is_speaking: self.narrator.is_speaking(),
            panel_open: self.panel_open,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.narrator.is_speaking()
    }

    pub fn store(&self) -> &SettingsStore<K> {
        &self.store
    }

    pub fn narrator(&self) -> &Narrator<S> {
        &self.narrator
    }

    pub fn narrator_mut(&mut self) -> &mut Narrator<S> {
        &mut self.narrator
    }

    pub fn listener(&self) -> &InteractionListener<E> {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut InteractionListener<E> {
        &mut self.listener
    }

    /// Take the components apart, e.g. to reload the store.
    pub fn into_parts(self) -> (SettingsStore<K>, Narrator<S>, InteractionListener<E>) {
        (self.store, self.narrator, self.listener)
    }

    pub fn speak(&mut self, text: &str, now: Instant) {
        self.narrator.speak(text, now);
    }

    pub fn stop(&mut self) {
        self.narrator.stop();
    }

    pub fn set_language(&mut self, language: Language) {
        self.store.set_language(language);
        self.narrator.set_language(language);
    }

    pub fn toggle_language(&mut self) -> Language {
        let language = self.store.toggle_language();
        self.narrator.set_language(language);
        language
    }

    pub fn set_font_scale(&mut self, scale: FontScale) -> bool {
        self.store.set_font_scale(scale)
    }

    pub fn increase_font_scale(&mut self) -> bool {
        self.store.increase_font_scale()
    }

    pub fn decrease_font_scale(&mut self) -> bool {
        self.store.decrease_font_scale()
    }

    pub fn set_color_vision_filter(&mut self, filter: ColorVisionFilter) -> bool {
        self.store.set_color_vision_filter(filter)
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> bool {
        self.store.set_dark_mode(enabled)
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.store.toggle_dark_mode()
    }

    pub fn set_narration_enabled(&mut self, enabled: bool) {
        self.store.set_narration_enabled(enabled);
        self.sync_narration();
    }

    /// Flip narration. Turning it on announces the change; turning it off
    /// silences everything immediately.
    pub fn toggle_narration(&mut self, now: Instant) -> bool {
        let enabled = self.store.toggle_narration();
        self.sync_narration();
        if enabled {
            self.confirm(ShortcutAction::ToggleNarration, now);
        }
        enabled
    }

    /// Restore all defaults and cancel any narration.
    pub fn reset_all(&mut self) {
        self.narrator.stop();
        self.store.reset_all();
        self.sync_narration();
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn open_panel(&mut self) {
        self.panel_open = true;
    }

    pub fn close_panel(&mut self) {
        self.panel_open = false;
    }

    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    /// Offer a key event to the shortcut dispatcher.
    ///
    /// Escape is only consumed while the panel is open, so it keeps working
    /// for the rest of the interface otherwise.
    pub fn handle_key(&mut self, event: &KeyEvent, now: Instant) -> KeyOutcome {
        let Some(action) = shortcuts::dispatch(event) else {
            return KeyOutcome::default();
        };

        match action {
            ShortcutAction::TogglePanel => {
                self.toggle_panel();
            }
            ShortcutAction::ClosePanel => {
                if !self.panel_open {
                    return KeyOutcome::default();
                }
                self.close_panel();
            }
            ShortcutAction::ToggleLanguage => {
                self.toggle_language();
            }
            ShortcutAction::IncreaseFontScale => {
                self.increase_font_scale();
            }
            ShortcutAction::DecreaseFontScale => {
                self.decrease_font_scale();
            }
            ShortcutAction::ToggleDarkMode => {
                self.toggle_dark_mode();
            }
            ShortcutAction::ToggleNarration => {
                self.store.toggle_narration();
                self.sync_narration();
            }
            ShortcutAction::ResetAll => self.reset_all(),
        }

        log::debug!("Shortcut {} -> {action:?}", action.combo());
        self.confirm(action, now);
        KeyOutcome {
            action: Some(action),
            prevent_default: true,
        }
    }

    /// Drive timers and callbacks. Call from the host event loop.
    pub fn pump(&mut self, now: Instant) {
        self.listener.pump(now, &mut self.narrator);
        self.narrator.pump(now);
    }

    fn confirm(&mut self, action: ShortcutAction, now: Instant) {
        if let Some(phrase) = shortcuts::confirmation(action, &self.store.get(), self.panel_open)
        {
            self.narrator.speak(&phrase, now);
        }
    }

    fn sync_narration(&mut self) {
        let settings = self.store.get();
        self.narrator.set_language(settings.language);
        self.narrator.set_enabled(settings.narration_enabled);
        if settings.narration_enabled {
            self.listener.start();
        } else {
            self.listener.stop(&mut self.narrator);
        }
    }
}
