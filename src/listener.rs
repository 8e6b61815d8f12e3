//! Document-wide hover and focus narration.
//!
//! Each hovered element moves through a small state machine:
//!
//! ```text
//! Idle --pointer enter--> Pending --delay elapsed--> Spoken --window elapsed--> Idle
//!                            |
//!                            +--pointer leave / newer hover--> Idle
//! ```
//!
//! Keyboard focus skips the debounce and narrates immediately. Both paths
//! suppress text that was narrated within their recency window.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use derive_builder::Builder;

use crate::narration::Narrator;
use crate::resolver::{self, Element, ElementKey, LabelIndex, LabelLookup};
use crate::SpeechSynthesis;

/// Parameters for configuring an [`InteractionListener`].
///
/// The defaults are tuned for feel, not correctness.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(default)]
pub struct ListenerParams {
    /// How long the pointer must rest on an element before it is read.
    pub hover_delay: Duration,
    /// Identical hover text is not repeated within this window.
    pub hover_window: Duration,
    /// Identical focus text is not repeated within this window.
    pub focus_window: Duration,
}

impl Default for ListenerParams {
    fn default() -> Self {
        Self {
            hover_delay: Duration::from_millis(300),
            hover_window: Duration::from_millis(2000),
            focus_window: Duration::from_millis(1000),
        }
    }
}

/// How an element received focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOrigin {
    Keyboard,
    Pointer,
}

/// Capture-phase events delivered by an [`EventSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    PointerEnter(Element),
    PointerLeave(ElementKey),
    Focus {
        element: Element,
        origin: FocusOrigin,
    },
}

/// The document the listener attaches to.
///
/// `start`/`stop` install and remove the document-level listeners; while
/// attached, events are pulled with `poll_event`. The source also answers
/// label-by-reference lookups for the resolver.
pub trait EventSource: LabelLookup {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_attached(&self) -> bool;
    fn poll_event(&mut self) -> Option<InteractionEvent>;
}

/// In-memory event source fed by the host or a test.
///
/// Events pushed while detached are dropped, like events on a document with
/// no listeners installed.
#[derive(Debug, Default, Clone)]
pub struct ScriptedEvents {
    queue: VecDeque<InteractionEvent>,
    labels: LabelIndex,
    attached: bool,
}

impl ScriptedEvents {
    pub fn with_labels(labels: LabelIndex) -> Self {
        Self {
            labels,
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: InteractionEvent) {
        if self.attached {
            self.queue.push_back(event);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl LabelLookup for ScriptedEvents {
    fn label_for(&self, control_id: &str) -> Option<String> {
        self.labels.label_for(control_id)
    }
}

impl EventSource for ScriptedEvents {
    fn start(&mut self) {
        self.attached = true;
    }

    fn stop(&mut self) {
        self.attached = false;
        self.queue.clear();
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn poll_event(&mut self) -> Option<InteractionEvent> {
        if !self.attached {
            return None;
        }
        self.queue.pop_front()
    }
}

/// Observable phase of a hover target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    Pending,
    Spoken,
}

#[derive(Debug)]
enum Target {
    Pending { element: Element, deadline: Instant },
    Spoken { at: Instant },
}

pub struct InteractionListener<E: EventSource> {
    source: E,
    params: ListenerParams,
    active: bool,
    targets: HashMap<ElementKey, Target>,
    recent: HashMap<String, Instant>,
}

impl<E: EventSource> InteractionListener<E> {
    pub fn new(source: E, params: ListenerParams) -> Self {
        Self {
            source,
            params,
            active: false,
            targets: HashMap::new(),
            recent: HashMap::new(),
        }
    }

    pub fn source(&self) -> &E {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut E {
        &mut self.source
    }

    pub fn params(&self) -> &ListenerParams {
        &self.params
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self, key: ElementKey) -> HoverPhase {
        match self.targets.get(&key) {
            None => HoverPhase::Idle,
            Some(Target::Pending { .. }) => HoverPhase::Pending,
            Some(Target::Spoken { .. }) => HoverPhase::Spoken,
        }
    }

    /// Attach to the document. Idempotent.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.source.start();
        self.active = true;
        log::info!("Interaction listener attached");
    }

    /// Detach from the document: drop pending timers and recency memory and
    /// silence any narration in progress. Idempotent.
    pub fn stop<S: SpeechSynthesis>(&mut self, narrator: &mut Narrator<S>) {
        self.targets.clear();
        self.recent.clear();
        narrator.stop();
        if self.active {
            self.source.stop();
            self.active = false;
            log::info!("Interaction listener detached");
        }
    }

    /// Handle one event at time `now`.
    pub fn handle<S: SpeechSynthesis>(
        &mut self,
        event: InteractionEvent,
        now: Instant,
        narrator: &mut Narrator<S>,
    ) {
        if !self.active || !narrator.is_enabled() {
            return;
        }

        match event {
            InteractionEvent::PointerEnter(element) => {
                if !resolver::is_narratable(&element) {
                    return;
                }
                // Only the latest hover may fire.
                self.targets
                    .retain(|_, target| !matches!(target, Target::Pending { .. }));
                let deadline = now + self.params.hover_delay;
                self.targets
                    .insert(element.key, Target::Pending { element, deadline });
            }
            InteractionEvent::PointerLeave(key) => {
                if matches!(self.targets.get(&key), Some(Target::Pending { .. })) {
                    self.targets.remove(&key);
                }
            }
            InteractionEvent::Focus {
                element,
                origin: FocusOrigin::Keyboard,
            } => {
                let Some(text) = resolver::resolve(&element, &self.source, narrator.language())
                else {
                    return;
                };
                if self.recently_spoken(&text, now, self.params.focus_window) {
                    log::debug!("Suppressing repeated focus narration {text:?}");
                    return;
                }
                if narrator.speak(&text, now) {
                    self.recent.insert(text, now);
                }
            }
            InteractionEvent::Focus {
                origin: FocusOrigin::Pointer,
                ..
            } => {}
        }
    }

    /// Fire due hover timers and expire old state.
    pub fn tick<S: SpeechSynthesis>(&mut self, now: Instant, narrator: &mut Narrator<S>) {
        if !self.active {
            return;
        }

        let due: Vec<ElementKey> = self
            .targets
            .iter()
            .filter_map(|(key, target)| match target {
                Target::Pending { deadline, .. } if *deadline <= now => Some(*key),
                _ => None,
            })
            .collect();

        for key in due {
            let Some(Target::Pending { element, .. }) = self.targets.remove(&key) else {
                continue;
            };
            if !narrator.is_enabled() {
                continue;
            }
            let Some(text) = resolver::resolve(&element, &self.source, narrator.language()) else {
                continue;
            };
            if self.recently_spoken(&text, now, self.params.hover_window) {
                log::debug!("Suppressing repeated hover narration {text:?}");
                continue;
            }
            if narrator.speak(&text, now) {
                self.recent.insert(text, now);
                self.targets.insert(key, Target::Spoken { at: now });
            }
        }

        let hover_window = self.params.hover_window;
        self.targets.retain(|_, target| match target {
            Target::Spoken { at } => now.duration_since(*at) < hover_window,
            Target::Pending { .. } => true,
        });
        let memory = hover_window.max(self.params.focus_window);
        self.recent
            .retain(|_, at| now.duration_since(*at) < memory);
    }

    /// Drain the event source, then fire due timers.
    pub fn pump<S: SpeechSynthesis>(&mut self, now: Instant, narrator: &mut Narrator<S>) {
        while let Some(event) = self.source.poll_event() {
            self.handle(event, now, narrator);
        }
        self.tick(now, narrator);
    }

    fn recently_spoken(&self, text: &str, now: Instant, window: Duration) -> bool {
        self.recent
            .get(text)
            .is_some_and(|at| now.duration_since(*at) < window)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{
        EventSource, FocusOrigin, HoverPhase, InteractionEvent, InteractionListener,
        ListenerParams, ListenerParamsBuilder, ScriptedEvents,
    };
    use crate::backends::memory::RecordingSynth;
    use crate::narration::{Narrator, NarratorParams};
    use crate::resolver::{Element, ElementKey, LabelIndex};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (InteractionListener<ScriptedEvents>, Narrator<RecordingSynth>) {
        let mut narrator = Narrator::new(RecordingSynth::new(), NarratorParams::default());
        narrator.set_enabled(true);
        let mut listener =
            InteractionListener::new(ScriptedEvents::default(), ListenerParams::default());
        listener.start();
        (listener, narrator)
    }

    fn button(key: u64, text: &str) -> Element {
        Element::new(key, "button").text(text)
    }

    fn hover(element: Element) -> InteractionEvent {
        InteractionEvent::PointerEnter(element)
    }

    fn keyboard_focus(element: Element) -> InteractionEvent {
        InteractionEvent::Focus {
            element,
            origin: FocusOrigin::Keyboard,
        }
    }

    #[test]
    fn hover_speaks_after_the_delay() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Reservar")), t0, &mut narrator);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Pending);

        listener.tick(t0 + ms(299), &mut narrator);
        assert!(narrator.backend().spoken().is_empty());

        listener.tick(t0 + ms(300), &mut narrator);
        assert_eq!(narrator.backend().spoken_texts(), vec!["Reservar"]);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Spoken);
    }

    #[test]
    fn leaving_before_the_delay_speaks_nothing() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Reservar")), t0, &mut narrator);
        let leave = InteractionEvent::PointerLeave(ElementKey(1));
        listener.handle(leave, t0 + ms(100), &mut narrator);
        listener.tick(t0 + ms(1000), &mut narrator);

        assert!(narrator.backend().spoken().is_empty());
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Idle);
    }

    #[test]
    fn leaving_after_speech_started_does_not_stop_it() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Reservar")), t0, &mut narrator);
        listener.tick(t0 + ms(300), &mut narrator);
        narrator.pump(t0 + ms(300));
        let leave = InteractionEvent::PointerLeave(ElementKey(1));
        listener.handle(leave, t0 + ms(400), &mut narrator);

        assert!(narrator.is_speaking());
        assert_eq!(narrator.backend().cancel_count(), 1);
    }

    #[test]
    fn refused_hover_can_be_retried_inside_the_window() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        narrator.backend_mut().reject_next("busy");

        listener.handle(hover(button(1, "Guías")), t0, &mut narrator);
        listener.tick(t0 + ms(300), &mut narrator);
        assert!(narrator.backend().spoken().is_empty());
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Idle);

        listener.handle(hover(button(1, "Guías")), t0 + ms(500), &mut narrator);
        listener.tick(t0 + ms(800), &mut narrator);
        assert_eq!(narrator.backend().spoken_texts(), vec!["Guías"]);
    }

    #[test]
    fn refused_focus_can_be_retried_inside_the_window() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        narrator.backend_mut().reject_next("busy");

        listener.handle(keyboard_focus(button(1, "Enviar")), t0, &mut narrator);
        assert!(narrator.backend().spoken().is_empty());
        listener.handle(keyboard_focus(button(1, "Enviar")), t0 + ms(100), &mut narrator);
        assert_eq!(narrator.backend().spoken_texts(), vec!["Enviar"]);
    }

    #[test]
    fn repeat_hover_is_suppressed_inside_the_window_only() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();

        listener.handle(hover(button(1, "Guías")), t0, &mut narrator);
        listener.tick(t0 + ms(300), &mut narrator);
        listener.handle(hover(button(2, "Guías")), t0 + ms(500), &mut narrator);
        listener.tick(t0 + ms(800), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 1);

        listener.handle(hover(button(1, "Guías")), t0 + ms(2400), &mut narrator);
        listener.tick(t0 + ms(2700), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 2);
    }

    #[test]
    fn newer_hover_replaces_pending_one() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Localidades")), t0, &mut narrator);
        listener.handle(hover(button(2, "Visitantes")), t0 + ms(100), &mut narrator);
        listener.tick(t0 + ms(1000), &mut narrator);

        assert_eq!(narrator.backend().spoken_texts(), vec!["Visitantes"]);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Idle);
    }

    #[test]
    fn spoken_target_returns_to_idle_after_the_window() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Inicio")), t0, &mut narrator);
        listener.tick(t0 + ms(300), &mut narrator);
        listener.tick(t0 + ms(2300), &mut narrator);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Idle);
    }

    #[test]
    fn keyboard_focus_speaks_immediately() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Inicio")), t0, &mut narrator);
        listener.handle(keyboard_focus(button(2, "Contacto")), t0 + ms(10), &mut narrator);

        assert_eq!(narrator.backend().spoken_texts(), vec!["Contacto"]);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Pending);
    }

    #[test]
    fn focus_repeats_use_the_shorter_window() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(keyboard_focus(button(1, "Contacto")), t0, &mut narrator);
        listener.handle(keyboard_focus(button(1, "Contacto")), t0 + ms(500), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 1);

        listener.handle(keyboard_focus(button(1, "Contacto")), t0 + ms(1100), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 2);
    }

    #[test]
    fn pointer_focus_is_left_to_hover() {
        let (mut listener, mut narrator) = setup();
        listener.handle(
            InteractionEvent::Focus {
                element: button(1, "Contacto"),
                origin: FocusOrigin::Pointer,
            },
            Instant::now(),
            &mut narrator,
        );
        assert!(narrator.backend().spoken().is_empty());
    }

    #[test]
    fn hidden_elements_never_arm_a_timer() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        let hidden = button(1, "Oculto").attr("aria-hidden", "true");
        listener.handle(hover(hidden), t0, &mut narrator);
        assert_eq!(listener.phase(ElementKey(1)), HoverPhase::Idle);
    }

    #[test]
    fn focus_uses_labels_from_the_document() {
        let mut labels = LabelIndex::default();
        labels.insert("visitor-name", "Nombre del visitante");
        let mut narrator = Narrator::new(RecordingSynth::new(), NarratorParams::default());
        narrator.set_enabled(true);
        let source = ScriptedEvents::with_labels(labels);
        let mut listener = InteractionListener::new(source, ListenerParams::default());
        listener.start();

        let input = Element::new(7, "input").attr("id", "visitor-name");
        listener.handle(keyboard_focus(input), Instant::now(), &mut narrator);
        assert_eq!(narrator.backend().spoken_texts(), vec!["Nombre del visitante"]);
    }

    #[test]
    fn pump_drains_the_source() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.source_mut().push(hover(button(1, "Tours")));
        listener.pump(t0, &mut narrator);
        assert_eq!(listener.source().pending(), 0);
        listener.pump(t0 + ms(300), &mut narrator);
        assert_eq!(narrator.backend().spoken_texts(), vec!["Tours"]);
    }

    #[test]
    fn stop_tears_everything_down() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(keyboard_focus(button(1, "Contacto")), t0, &mut narrator);
        narrator.pump(t0);
        listener.handle(hover(button(2, "Tours")), t0, &mut narrator);
        assert!(narrator.is_speaking());

        listener.stop(&mut narrator);
        assert!(!narrator.is_speaking());
        assert!(!listener.is_active());
        assert!(!listener.source().is_attached());
        assert_eq!(listener.phase(ElementKey(2)), HoverPhase::Idle);

        listener.tick(t0 + ms(500), &mut narrator);
        listener.source_mut().push(hover(button(3, "Guías")));
        listener.pump(t0 + ms(900), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 1);

        listener.stop(&mut narrator);
    }

    #[test]
    fn restart_forgets_recency() {
        let (mut listener, mut narrator) = setup();
        let t0 = Instant::now();
        listener.handle(keyboard_focus(button(1, "Contacto")), t0, &mut narrator);
        listener.stop(&mut narrator);
        listener.start();
        listener.handle(keyboard_focus(button(1, "Contacto")), t0 + ms(10), &mut narrator);
        assert_eq!(narrator.backend().spoken().len(), 2);
    }

    #[test]
    fn disabled_narrator_ignores_events() {
        let (mut listener, mut narrator) = setup();
        narrator.set_enabled(false);
        let t0 = Instant::now();
        listener.handle(hover(button(1, "Tours")), t0, &mut narrator);
        listener.tick(t0 + ms(300), &mut narrator);
        assert!(narrator.backend().spoken().is_empty());
    }

    #[test]
    fn params_builder_keeps_unset_defaults() {
        let params = ListenerParamsBuilder::default()
            .hover_delay(ms(500))
            .build()
            .expect("all fields have defaults");
        assert_eq!(params.hover_delay, ms(500));
        assert_eq!(params.focus_window, ms(1000));
    }
}
