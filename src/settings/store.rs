use serde::de::DeserializeOwned;
use serde::Serialize;

use super::storage::KeyValueStore;
use super::{ColorVisionFilter, FontScale, Language, Settings, SettingsEffects};

pub const KEY_LANGUAGE: &str = "accessibility.language";
pub const KEY_FONT_SCALE: &str = "accessibility.fontScale";
pub const KEY_COLOR_VISION_FILTER: &str = "accessibility.colorVisionFilter";
pub const KEY_DARK_MODE: &str = "accessibility.darkMode";
pub const KEY_NARRATION_ENABLED: &str = "accessibility.narrationEnabled";

/// Single owner of the accessibility [`Settings`].
///
/// Every setter applies the host effect and persists the field when the
/// value changes, and returns whether it did. Persistence failures are
/// logged and never roll back the in-memory value.
pub struct SettingsStore<K: KeyValueStore> {
    settings: Settings,
    storage: K,
    effects: Box<dyn SettingsEffects>,
}

impl<K: KeyValueStore> SettingsStore<K> {
    /// Read every field from `storage`, defaulting the ones that are absent
    /// or unreadable, then sync the host through `effects`.
    pub fn load(storage: K, effects: Box<dyn SettingsEffects>) -> Self {
        let settings = Settings {
            language: read_field(&storage, KEY_LANGUAGE),
            font_scale: read_field(&storage, KEY_FONT_SCALE),
            color_vision_filter: read_field(&storage, KEY_COLOR_VISION_FILTER),
            dark_mode: read_field(&storage, KEY_DARK_MODE),
            narration_enabled: read_field(&storage, KEY_NARRATION_ENABLED),
        };
        log::info!("Loaded accessibility settings: {settings:?}");

        let mut store = Self {
            settings,
            storage,
            effects,
        };
        store.apply_all();
        store
    }

    pub fn get(&self) -> Settings {
        self.settings
    }

    pub fn storage(&self) -> &K {
        &self.storage
    }

    /// Give the storage back, e.g. to simulate a reload.
    pub fn into_storage(self) -> K {
        self.storage
    }

    pub fn set_language(&mut self, language: Language) -> bool {
        if self.settings.language == language {
            return false;
        }
        self.settings.language = language;
        self.effects.apply_language(language.locale());
        self.persist(KEY_LANGUAGE, &language);
        true
    }

    /// Switch to the other language and return it.
    pub fn toggle_language(&mut self) -> Language {
        let next = self.settings.language.toggled();
        self.set_language(next);
        next
    }

    pub fn set_font_scale(&mut self, scale: FontScale) -> bool {
        if self.settings.font_scale == scale {
            return false;
        }
        self.settings.font_scale = scale;
        self.effects.apply_font_scale(scale.percent());
        self.persist(KEY_FONT_SCALE, &scale);
        true
    }

    /// One step larger. No-op at [`FontScale::ExtraLarge`].
    pub fn increase_font_scale(&mut self) -> bool {
        match self.settings.font_scale.larger() {
            Some(next) => self.set_font_scale(next),
            None => {
                log::debug!("Font scale already at maximum");
                false
            }
        }
    }

    /// One step smaller. No-op at [`FontScale::Small`].
    pub fn decrease_font_scale(&mut self) -> bool {
        match self.settings.font_scale.smaller() {
            Some(next) => self.set_font_scale(next),
            None => {
                log::debug!("Font scale already at minimum");
                false
            }
        }
    }

    pub fn set_color_vision_filter(&mut self, filter: ColorVisionFilter) -> bool {
        if self.settings.color_vision_filter == filter {
            return false;
        }
        self.settings.color_vision_filter = filter;
        self.effects.apply_color_filter(filter.css_class());
        self.persist(KEY_COLOR_VISION_FILTER, &filter);
        true
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> bool {
        if self.settings.dark_mode == enabled {
            return false;
        }
        self.settings.dark_mode = enabled;
        self.effects.apply_dark_mode(enabled);
        self.persist(KEY_DARK_MODE, &enabled);
        true
    }

    /// Flip dark mode and return the new value.
    pub fn toggle_dark_mode(&mut self) -> bool {
        let next = !self.settings.dark_mode;
        self.set_dark_mode(next);
        next
    }

    pub fn set_narration_enabled(&mut self, enabled: bool) -> bool {
        if self.settings.narration_enabled == enabled {
            return false;
        }
        self.settings.narration_enabled = enabled;
        self.persist(KEY_NARRATION_ENABLED, &enabled);
        true
    }

    /// Flip the narration master switch and return the new value.
    pub fn toggle_narration(&mut self) -> bool {
        let next = !self.settings.narration_enabled;
        self.set_narration_enabled(next);
        next
    }

    /// Restore every field to its default. Every key is rewritten, effects
    /// fire only for fields that changed. Returns the settings before reset.
    pub fn reset_all(&mut self) -> Settings {
        let previous = self.settings;
        let defaults = Settings::default();

        self.set_language(defaults.language);
        self.set_font_scale(defaults.font_scale);
        self.set_color_vision_filter(defaults.color_vision_filter);
        self.set_dark_mode(defaults.dark_mode);
        self.set_narration_enabled(defaults.narration_enabled);

        self.persist(KEY_LANGUAGE, &defaults.language);
        self.persist(KEY_FONT_SCALE, &defaults.font_scale);
        self.persist(KEY_COLOR_VISION_FILTER, &defaults.color_vision_filter);
        self.persist(KEY_DARK_MODE, &defaults.dark_mode);
        self.persist(KEY_NARRATION_ENABLED, &defaults.narration_enabled);

        previous
    }

    fn apply_all(&mut self) {
        let settings = self.settings;
        self.effects.apply_language(settings.language.locale());
        self.effects.apply_font_scale(settings.font_scale.percent());
        self.effects
            .apply_color_filter(settings.color_vision_filter.css_class());
        self.effects.apply_dark_mode(settings.dark_mode);
    }

    fn persist<T: Serialize>(&mut self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Failed to encode setting {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(key, &encoded) {
            log::warn!("Failed to persist setting {key}: {e}");
        }
    }
}

fn read_field<T, K>(storage: &K, key: &str) -> T
where
    T: DeserializeOwned + Default,
    K: KeyValueStore,
{
    match storage.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable setting {key}={raw:?}: {e}");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Failed to read setting {key}: {e}");
            T::default()
        }
    }
}
