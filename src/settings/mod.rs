//! Accessibility preferences.
//!
//! A single [`Settings`] record is owned by the [`SettingsStore`], loaded
//! once from a [`storage::KeyValueStore`] and written back field by field on
//! every change. Each change is also applied to the host interface through
//! [`SettingsEffects`].
//!
//! # Defaults
//!
//! | Field | Default |
//! |---|---|
//! | `language` | Spanish (`es-ES`) |
//! | `font_scale` | normal (100%) |
//! | `color_vision_filter` | none |
//! | `dark_mode` | off |
//! | `narration_enabled` | off |

pub mod storage;
pub mod store;

pub use store::SettingsStore;

use serde::{Deserialize, Serialize};

/// Interface language. Drives both UI copy and the speech voice locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    /// Primary language.
    #[default]
    #[serde(rename = "es")]
    Spanish,
    /// Secondary language.
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// BCP 47 tag used for voice selection and the translation table.
    pub fn locale(self) -> &'static str {
        match self {
            Self::Spanish => "es-ES",
            Self::English => "en-US",
        }
    }

    /// The other language.
    pub fn toggled(self) -> Self {
        match self {
            Self::Spanish => Self::English,
            Self::English => Self::Spanish,
        }
    }

    /// The language's own name, as spoken in confirmations.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::Spanish => "Español",
            Self::English => "English",
        }
    }
}

/// Root font scale, ordered from smallest to largest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum FontScale {
    Small,
    #[default]
    Normal,
    Large,
    ExtraLarge,
}

impl FontScale {
    /// All scales in ascending order.
    pub const ALL: [FontScale; 4] = [
        FontScale::Small,
        FontScale::Normal,
        FontScale::Large,
        FontScale::ExtraLarge,
    ];

    /// Root font size as a percentage of the browser default.
    pub fn percent(self) -> u32 {
        match self {
            Self::Small => 90,
            Self::Normal => 100,
            Self::Large => 115,
            Self::ExtraLarge => 130,
        }
    }

    /// Next larger scale, or `None` at the top.
    pub fn larger(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Next smaller scale, or `None` at the bottom.
    pub fn smaller(self) -> Option<Self> {
        self.ordinal().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn label(self, language: Language) -> &'static str {
        match (language, self) {
            (Language::Spanish, Self::Small) => "pequeño",
            (Language::Spanish, Self::Normal) => "normal",
            (Language::Spanish, Self::Large) => "grande",
            (Language::Spanish, Self::ExtraLarge) => "muy grande",
            (Language::English, Self::Small) => "small",
            (Language::English, Self::Normal) => "normal",
            (Language::English, Self::Large) => "large",
            (Language::English, Self::ExtraLarge) => "extra large",
        }
    }
}

/// Color-vision simulation filter. At most one is applied at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorVisionFilter {
    #[default]
    None,
    Protan,
    Deutan,
    Tritan,
}

impl ColorVisionFilter {
    /// Class applied to the document root. Empty for [`ColorVisionFilter::None`].
    pub fn css_class(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Protan => "filter-protanopia",
            Self::Deutan => "filter-deuteranopia",
            Self::Tritan => "filter-tritanopia",
        }
    }
}

/// The user's accessibility preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    pub language: Language,
    pub font_scale: FontScale,
    pub color_vision_filter: ColorVisionFilter,
    pub dark_mode: bool,
    /// Master switch: while false nothing is ever spoken.
    pub narration_enabled: bool,
}

/// Host-side application of settings (root font size, theme classes,
/// translation locale).
///
/// Called once per field when the store loads, then only when a value
/// actually changes.
pub trait SettingsEffects {
    fn apply_language(&mut self, locale: &str);
    fn apply_font_scale(&mut self, percent: u32);
    fn apply_color_filter(&mut self, css_class: &str);
    fn apply_dark_mode(&mut self, enabled: bool);
}

/// Effects sink for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

impl SettingsEffects for NoEffects {
    fn apply_language(&mut self, _locale: &str) {}
    fn apply_font_scale(&mut self, _percent: u32) {}
    fn apply_color_filter(&mut self, _css_class: &str) {}
    fn apply_dark_mode(&mut self, _enabled: bool) {}
}

#[cfg(test)]
mod tests {
    use super::{ColorVisionFilter, FontScale, Language, Settings};

    #[test]
    fn font_scale_steps_clamp_at_both_ends() {
        assert_eq!(FontScale::ExtraLarge.larger(), None);
        assert_eq!(FontScale::Small.smaller(), None);
        assert_eq!(FontScale::Small.larger(), Some(FontScale::Normal));
        assert_eq!(FontScale::ExtraLarge.smaller(), Some(FontScale::Large));
    }

    #[test]
    fn font_scale_percentages_increase_with_ordinal() {
        let percents: Vec<u32> = FontScale::ALL.iter().map(|s| s.percent()).collect();
        assert_eq!(percents, vec![90, 100, 115, 130]);
    }

    #[test]
    fn serializes_enums_as_lowercase_scalars() {
        assert_eq!(
            serde_json::to_string(&FontScale::ExtraLarge).expect("serialize"),
            "\"extra-large\""
        );
        assert_eq!(
            serde_json::to_string(&ColorVisionFilter::Deutan).expect("serialize"),
            "\"deutan\""
        );
        assert_eq!(
            serde_json::to_string(&Language::English).expect("serialize"),
            "\"en\""
        );
    }

    #[test]
    fn defaults_match_documented_table() {
        let settings = Settings::default();
        assert_eq!(settings.language, Language::Spanish);
        assert_eq!(settings.font_scale, FontScale::Normal);
        assert_eq!(settings.color_vision_filter, ColorVisionFilter::None);
        assert!(!settings.dark_mode);
        assert!(!settings.narration_enabled);
    }
}
