//! Application-wide keyboard shortcuts.
//!
//! The bindings are public contract: the on-screen help is generated from
//! [`help_lines`], so changing a combination here changes the help too.
//!
//! | Combination | Action |
//! |---|---|
//! | `Alt+Shift+A` | toggle accessibility panel |
//! | `Alt+Shift+L` | toggle language |
//! | `Alt+Shift+I` | increase font size |
//! | `Alt+Shift+D` | decrease font size |
//! | `Alt+Shift+N` | toggle dark mode |
//! | `Alt+Shift+S` | toggle narration |
//! | `Alt+Shift+R` | reset all settings |
//! | `Escape` | close panel |

use std::fmt;
use std::str::FromStr;

use crate::settings::{FontScale, Language, Settings};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("Empty shortcut")]
    Empty,
    #[error("Unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("Unsupported key '{0}'")]
    UnsupportedKey(String),
}

/// Modifier state of a key event or binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        shift: false,
        meta: false,
    };

    pub const ALT_SHIFT: Modifiers = Modifiers {
        alt: true,
        ctrl: false,
        shift: true,
        meta: false,
    };
}

/// Normalized key of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Lower-case ASCII letter.
    Letter(char),
    Escape,
}

/// A modifier + key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Shortcut {
    const fn alt_shift(letter: char) -> Self {
        Self {
            modifiers: Modifiers::ALT_SHIFT,
            key: Key::Letter(letter),
        }
    }

    /// Parse a combination such as `"Alt+Shift+L"` or `"Escape"`.
    pub fn parse(combo: &str) -> Result<Self, ShortcutParseError> {
        let parts: Vec<&str> = combo
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (key, modifier_names) = parts.split_last().ok_or(ShortcutParseError::Empty)?;

        let mut modifiers = Modifiers::NONE;
        for name in modifier_names {
            match name.to_ascii_lowercase().as_str() {
                "alt" | "option" => modifiers.alt = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                _ => return Err(ShortcutParseError::UnknownModifier(name.to_string())),
            }
        }

        let key = normalize_key(key)
            .ok_or_else(|| ShortcutParseError::UnsupportedKey(key.to_string()))?;
        Ok(Self { modifiers, key })
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (on, name) in [
            (m.ctrl, "Ctrl"),
            (m.alt, "Alt"),
            (m.shift, "Shift"),
            (m.meta, "Meta"),
        ] {
            if on {
                write!(f, "{name}+")?;
            }
        }
        match self.key {
            Key::Letter(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Escape => f.write_str("Escape"),
        }
    }
}

/// Actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    TogglePanel,
    ToggleLanguage,
    IncreaseFontScale,
    DecreaseFontScale,
    ToggleDarkMode,
    ToggleNarration,
    ResetAll,
    ClosePanel,
}

impl ShortcutAction {
    pub const ALL: [ShortcutAction; 8] = [
        ShortcutAction::TogglePanel,
        ShortcutAction::ToggleLanguage,
        ShortcutAction::IncreaseFontScale,
        ShortcutAction::DecreaseFontScale,
        ShortcutAction::ToggleDarkMode,
        ShortcutAction::ToggleNarration,
        ShortcutAction::ResetAll,
        ShortcutAction::ClosePanel,
    ];

    pub const fn shortcut(self) -> Shortcut {
        match self {
            Self::TogglePanel => Shortcut::alt_shift('a'),
            Self::ToggleLanguage => Shortcut::alt_shift('l'),
            Self::IncreaseFontScale => Shortcut::alt_shift('i'),
            Self::DecreaseFontScale => Shortcut::alt_shift('d'),
            Self::ToggleDarkMode => Shortcut::alt_shift('n'),
            Self::ToggleNarration => Shortcut::alt_shift('s'),
            Self::ResetAll => Shortcut::alt_shift('r'),
            Self::ClosePanel => Shortcut {
                modifiers: Modifiers::NONE,
                key: Key::Escape,
            },
        }
    }

    /// User-facing combination string, e.g. `"Alt+Shift+L"`.
    pub fn combo(self) -> String {
        self.shortcut().to_string()
    }

    pub fn description(self, language: Language) -> &'static str {
        match (language, self) {
            (Language::Spanish, Self::TogglePanel) => "Abrir o cerrar el panel de accesibilidad",
            (Language::Spanish, Self::ToggleLanguage) => "Cambiar idioma",
            (Language::Spanish, Self::IncreaseFontScale) => "Aumentar tamaño de letra",
            (Language::Spanish, Self::DecreaseFontScale) => "Reducir tamaño de letra",
            (Language::Spanish, Self::ToggleDarkMode) => "Activar o desactivar modo oscuro",
            (Language::Spanish, Self::ToggleNarration) => "Activar o desactivar narración",
            (Language::Spanish, Self::ResetAll) => "Restablecer configuración",
            (Language::Spanish, Self::ClosePanel) => "Cerrar el panel",
            (Language::English, Self::TogglePanel) => "Open or close the accessibility panel",
            (Language::English, Self::ToggleLanguage) => "Switch language",
            (Language::English, Self::IncreaseFontScale) => "Increase font size",
            (Language::English, Self::DecreaseFontScale) => "Decrease font size",
            (Language::English, Self::ToggleDarkMode) => "Toggle dark mode",
            (Language::English, Self::ToggleNarration) => "Toggle narration",
            (Language::English, Self::ResetAll) => "Reset all settings",
            (Language::English, Self::ClosePanel) => "Close the panel",
        }
    }
}

/// A key event as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// Produced character or named key (`"l"`, `"L"`, `"Escape"`).
    pub key: String,
    /// Physical key code (`"KeyL"`), empty when unknown.
    pub code: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: &str, code: &str, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            modifiers,
        }
    }

    /// `Alt+Shift+<letter>` as a browser reports it.
    pub fn alt_shift(letter: char) -> Self {
        let upper = letter.to_ascii_uppercase();
        Self::new(&upper.to_string(), &format!("Key{upper}"), Modifiers::ALT_SHIFT)
    }

    pub fn escape() -> Self {
        Self::new("Escape", "Escape", Modifiers::NONE)
    }

    /// Normalized binding for this event. The physical code wins over the
    /// produced character, since Alt changes the character on some layouts.
    pub fn shortcut(&self) -> Option<Shortcut> {
        let key = self
            .code
            .strip_prefix("Key")
            .and_then(normalize_key)
            .or_else(|| normalize_key(&self.key))?;
        Some(Shortcut {
            modifiers: self.modifiers,
            key,
        })
    }
}

/// Flat lookup of the action bound to `event`, if any.
pub fn dispatch(event: &KeyEvent) -> Option<ShortcutAction> {
    let shortcut = event.shortcut()?;
    ShortcutAction::ALL
        .into_iter()
        .find(|action| action.shortcut() == shortcut)
}

/// One help line per binding, e.g. `"Alt+Shift+L: Switch language"`.
pub fn help_lines(language: Language) -> Vec<String> {
    ShortcutAction::ALL
        .iter()
        .map(|action| format!("{}: {}", action.combo(), action.description(language)))
        .collect()
}

/// Spoken confirmation after `action` was applied, describing the result.
///
/// Returns `None` when the action leaves narration switched off. A reset
/// always does, since narration is off by default.
pub fn confirmation(
    action: ShortcutAction,
    settings: &Settings,
    panel_open: bool,
) -> Option<String> {
    let lang = settings.language;
    let on_off = |on: bool| match (lang, on) {
        (Language::Spanish, true) => "activado",
        (Language::Spanish, false) => "desactivado",
        (Language::English, true) => "on",
        (Language::English, false) => "off",
    };

    let phrase = match (lang, action) {
        (_, ShortcutAction::ResetAll) => return None,
        (_, ShortcutAction::ToggleNarration) if !settings.narration_enabled => return None,
        (_, ShortcutAction::TogglePanel) | (_, ShortcutAction::ClosePanel) => {
            match (lang, panel_open) {
                (Language::Spanish, true) => "Panel de accesibilidad abierto".to_string(),
                (Language::Spanish, false) => "Panel de accesibilidad cerrado".to_string(),
                (Language::English, true) => "Accessibility panel opened".to_string(),
                (Language::English, false) => "Accessibility panel closed".to_string(),
            }
        }
        (Language::Spanish, ShortcutAction::ToggleLanguage) => {
            format!("Idioma: {}", lang.native_name())
        }
        (Language::English, ShortcutAction::ToggleLanguage) => {
            format!("Language: {}", lang.native_name())
        }
        (_, ShortcutAction::IncreaseFontScale) | (_, ShortcutAction::DecreaseFontScale) => {
            font_phrase(lang, settings.font_scale)
        }
        (Language::Spanish, ShortcutAction::ToggleDarkMode) => {
            format!("Modo oscuro {}", on_off(settings.dark_mode))
        }
        (Language::English, ShortcutAction::ToggleDarkMode) => {
            format!("Dark mode {}", on_off(settings.dark_mode))
        }
        (Language::Spanish, ShortcutAction::ToggleNarration) => "Narración activada".to_string(),
        (Language::English, ShortcutAction::ToggleNarration) => "Narration on".to_string(),
    };
    Some(phrase)
}

fn font_phrase(language: Language, scale: FontScale) -> String {
    match language {
        Language::Spanish => format!("Tamaño de letra: {}", scale.label(language)),
        Language::English => format!("Font size: {}", scale.label(language)),
    }
}

fn normalize_key(raw: &str) -> Option<Key> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("escape") || raw.eq_ignore_ascii_case("esc") {
        return Some(Key::Escape);
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(Key::Letter(c.to_ascii_lowercase())),
        _ => None,
    }
}
