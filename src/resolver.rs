//! Decide what to say for an element.
//!
//! [`resolve`] walks a fixed priority chain and returns the first non-empty
//! candidate:
//!
//! 1. `data-narration` override
//! 2. `aria-label`
//! 3. `aria-description`
//! 4. `title`
//! 5. `alt`
//! 6. `placeholder`
//! 7. own visible text, for content tags (or the `speak-on-hover` class),
//!    when it is at most [`MAX_TEXT_CHARS`] characters
//! 8. form inputs: associated `<label for>`, else a generic phrase
//! 9. `select` / `textarea`: associated label, else a generic phrase
//!
//! Hidden, fully transparent, `aria-hidden` and `sr-only` elements never
//! resolve, whatever attributes they carry.

use std::collections::{BTreeMap, HashMap};

use crate::settings::Language;

pub const ATTR_OVERRIDE: &str = "data-narration";
pub const ATTR_LABEL: &str = "aria-label";
pub const ATTR_DESCRIPTION: &str = "aria-description";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_ALT: &str = "alt";
pub const ATTR_PLACEHOLDER: &str = "placeholder";
pub const ATTR_HIDDEN: &str = "aria-hidden";

pub const CLASS_SCREEN_READER_ONLY: &str = "sr-only";
pub const CLASS_SPEAK_ON_HOVER: &str = "speak-on-hover";

/// Longest own-text block that is still read aloud.
pub const MAX_TEXT_CHARS: usize = 200;

const TEXT_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "button", "a", "label", "li", "span",
];

/// Attribute chain for steps 1–6, highest priority first.
const ATTRIBUTE_CHAIN: &[&str] = &[
    ATTR_OVERRIDE,
    ATTR_LABEL,
    ATTR_DESCRIPTION,
    ATTR_TITLE,
    ATTR_ALT,
    ATTR_PLACEHOLDER,
];

/// Stable identity of an element across events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ElementKey(pub u64);

/// Computed visibility of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedStyle {
    /// `display: none`
    pub display_none: bool,
    /// `visibility: hidden`
    pub visibility_hidden: bool,
    pub opacity: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: false,
            opacity: 1.0,
        }
    }
}

/// Read-only snapshot of a DOM element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub key: ElementKey,
    /// Lower-case tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
    /// Visible text content, unnormalized.
    pub text: String,
    pub style: ComputedStyle,
}

impl Element {
    pub fn new(key: u64, tag: &str) -> Self {
        Self {
            key: ElementKey(key),
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn class(mut self, name: &str) -> Self {
        self.classes.push(name.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }
}

/// Label-to-control association by identifier (`<label for="id">`).
pub trait LabelLookup {
    fn label_for(&self, control_id: &str) -> Option<String>;
}

/// A document with no labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLabels;

impl LabelLookup for NoLabels {
    fn label_for(&self, _control_id: &str) -> Option<String> {
        None
    }
}

/// Labels indexed by the id of the control they describe.
#[derive(Debug, Default, Clone)]
pub struct LabelIndex {
    labels: HashMap<String, String>,
}

impl LabelIndex {
    pub fn insert(&mut self, control_id: &str, label_text: &str) {
        self.labels
            .insert(control_id.to_string(), label_text.to_string());
    }
}

impl LabelLookup for LabelIndex {
    fn label_for(&self, control_id: &str) -> Option<String> {
        self.labels.get(control_id).cloned()
    }
}

/// Whether an element may be narrated at all.
pub fn is_narratable(element: &Element) -> bool {
    let style = element.style;
    if style.display_none || style.visibility_hidden || style.opacity <= 0.0 {
        return false;
    }
    if element
        .get_attr(ATTR_HIDDEN)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return false;
    }
    !element.has_class(CLASS_SCREEN_READER_ONLY)
}

/// Text to narrate for `element`, or `None` if there is nothing to say.
pub fn resolve(element: &Element, labels: &dyn LabelLookup, language: Language) -> Option<String> {
    if !is_narratable(element) {
        return None;
    }

    for name in ATTRIBUTE_CHAIN {
        if let Some(value) = element.get_attr(name).and_then(non_empty) {
            return Some(value);
        }
    }

    if TEXT_TAGS.contains(&element.tag.as_str()) || element.has_class(CLASS_SPEAK_ON_HOVER) {
        if let Some(text) = own_text(&element.text) {
            return Some(text);
        }
    }

    match element.tag.as_str() {
        "input" => {
            let kind = element
                .get_attr("type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "text".to_string());
            if matches!(kind.as_str(), "submit" | "button" | "reset") {
                if let Some(value) = element.get_attr("value").and_then(non_empty) {
                    return Some(value);
                }
            }
            associated_label(element, labels)
                .or_else(|| Some(input_phrase(&kind, language).to_string()))
        }
        "select" | "textarea" => associated_label(element, labels)
            .or_else(|| Some(control_phrase(&element.tag, language).to_string())),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let collapsed = collapse_whitespace(value);
    (!collapsed.is_empty()).then_some(collapsed)
}

fn own_text(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
        return None;
    }
    Some(text)
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn associated_label(element: &Element, labels: &dyn LabelLookup) -> Option<String> {
    let id = element.get_attr("id").and_then(non_empty)?;
    labels.label_for(&id).and_then(|label| non_empty(&label))
}

fn input_phrase(kind: &str, language: Language) -> &'static str {
    match language {
        Language::Spanish => match kind {
            "password" => "campo de contraseña",
            "email" => "campo de correo electrónico",
            "number" => "campo numérico",
            "tel" => "campo de teléfono",
            "search" => "campo de búsqueda",
            "date" => "campo de fecha",
            "checkbox" => "casilla de verificación",
            "radio" => "botón de opción",
            "submit" | "button" | "reset" => "botón",
            "file" => "selector de archivo",
            _ => "campo de texto",
        },
        Language::English => match kind {
            "password" => "password field",
            "email" => "email field",
            "number" => "number field",
            "tel" => "phone field",
            "search" => "search field",
            "date" => "date field",
            "checkbox" => "checkbox",
            "radio" => "radio button",
            "submit" | "button" | "reset" => "button",
            "file" => "file picker",
            _ => "text field",
        },
    }
}

fn control_phrase(tag: &str, language: Language) -> &'static str {
    match (language, tag) {
        (Language::Spanish, "select") => "lista de selección",
        (Language::Spanish, _) => "área de texto",
        (Language::English, "select") => "selection list",
        (Language::English, _) => "text area",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        resolve, ComputedStyle, Element, LabelIndex, NoLabels, ATTRIBUTE_CHAIN, MAX_TEXT_CHARS,
    };
    use crate::settings::Language;

    fn say(element: &Element) -> Option<String> {
        resolve(element, &NoLabels, Language::English)
    }

    #[test]
    fn each_attribute_outranks_the_next_one() {
        for pair in ATTRIBUTE_CHAIN.windows(2) {
            let element = Element::new(1, "button")
                .attr(pair[0], "higher")
                .attr(pair[1], "lower")
                .text("visible");
            assert_eq!(
                say(&element).as_deref(),
                Some("higher"),
                "{} should win over {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn placeholder_outranks_own_text() {
        let element = Element::new(1, "span")
            .attr("placeholder", "Search")
            .text("Buscar");
        assert_eq!(say(&element).as_deref(), Some("Search"));
    }

    #[test]
    fn own_text_outranks_associated_label() {
        let mut labels = LabelIndex::default();
        labels.insert("send", "Send form");
        let element = Element::new(1, "button").attr("id", "send").text("Send");
        assert_eq!(
            resolve(&element, &labels, Language::English).as_deref(),
            Some("Send")
        );
    }

    #[test]
    fn blank_attributes_fall_through() {
        let element = Element::new(1, "a")
            .attr("data-narration", "   ")
            .attr("title", "Home page");
        assert_eq!(say(&element).as_deref(), Some("Home page"));
    }

    #[test]
    fn aria_hidden_silences_everything() {
        let element = Element::new(1, "button")
            .attr("aria-hidden", "true")
            .attr("data-narration", "override")
            .attr("aria-label", "label")
            .text("text");
        assert_eq!(say(&element), None);
    }

    #[test]
    fn invisible_and_screen_reader_only_elements_do_not_resolve() {
        let hidden = Element::new(1, "p").text("x").style(ComputedStyle {
            display_none: true,
            ..Default::default()
        });
        let transparent = Element::new(2, "p").text("x").style(ComputedStyle {
            opacity: 0.0,
            ..Default::default()
        });
        let sr_only = Element::new(3, "p").text("x").class("sr-only");
        assert_eq!(say(&hidden), None);
        assert_eq!(say(&transparent), None);
        assert_eq!(say(&sr_only), None);
    }

    #[test]
    fn own_text_is_collapsed_and_capped() {
        let element = Element::new(1, "h2").text("  Tours \n  in\tthe   valley ");
        assert_eq!(say(&element).as_deref(), Some("Tours in the valley"));

        let long = Element::new(2, "p").text(&"a".repeat(MAX_TEXT_CHARS + 1));
        assert_eq!(say(&long), None);

        let exact = Element::new(3, "p").text(&"a".repeat(MAX_TEXT_CHARS));
        assert!(say(&exact).is_some());
    }

    #[test]
    fn div_text_needs_the_hover_marker() {
        let plain = Element::new(1, "div").text("Guides");
        assert_eq!(say(&plain), None);
        let marked = Element::new(2, "div").class("speak-on-hover").text("Guides");
        assert_eq!(say(&marked).as_deref(), Some("Guides"));
    }

    #[test]
    fn inputs_use_associated_label_then_generic_phrase() {
        let mut labels = LabelIndex::default();
        labels.insert("email", "Correo");
        let labelled = Element::new(1, "input").attr("type", "email").attr("id", "email");
        assert_eq!(
            resolve(&labelled, &labels, Language::Spanish).as_deref(),
            Some("Correo")
        );

        let password = Element::new(2, "input").attr("type", "password");
        assert_eq!(say(&password).as_deref(), Some("password field"));
        let untyped = Element::new(3, "input");
        assert_eq!(say(&untyped).as_deref(), Some("text field"));
        let checkbox = Element::new(4, "input").attr("type", "checkbox");
        assert_eq!(
            resolve(&checkbox, &NoLabels, Language::Spanish).as_deref(),
            Some("casilla de verificación")
        );
    }

    #[test]
    fn submit_inputs_read_their_value() {
        let element = Element::new(1, "input")
            .attr("type", "submit")
            .attr("value", "Reservar");
        assert_eq!(say(&element).as_deref(), Some("Reservar"));
    }

    #[test]
    fn select_and_textarea_fall_back_like_inputs() {
        let mut labels = LabelIndex::default();
        labels.insert("locality", "Locality");
        let select = Element::new(1, "select").attr("id", "locality");
        assert_eq!(
            resolve(&select, &labels, Language::English).as_deref(),
            Some("Locality")
        );
        let textarea = Element::new(2, "textarea");
        assert_eq!(say(&textarea).as_deref(), Some("text area"));
    }
}
