use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use tracing::debug;

use crate::events::{InputEvent, ScrollDirection};
use crate::surfaces::{
    Action, BaseView, ConfirmAction, ConfirmDialog, Effect, EventListOverlay, Modal, ModalSlot,
    PaneContent, Surface, is_termination_key,
};

/// Receivers of input, highest priority first. Every key, click and wheel event walks
/// this list and stops at the first layer that claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Dialog,
    GlobalHotkeys,
    Chord,
    Modal,
    EventList,
    BaseView,
}

pub const ROUTE_ORDER: [Layer; 6] = [
    Layer::Dialog,
    Layer::GlobalHotkeys,
    Layer::Chord,
    Layer::Modal,
    Layer::EventList,
    Layer::BaseView,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordState {
    #[default]
    Idle,
    AwaitingSecondKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordCommand {
    TogglePause,
    OpenComposer,
    ToggleEventList,
    Help,
    QuitDialog,
}

impl ChordCommand {
    fn effect(self) -> Effect {
        match self {
            Self::TogglePause => Effect::Emit(Action::TogglePause),
            Self::OpenComposer => Effect::OpenModal(Modal::composer()),
            Self::ToggleEventList => Effect::ToggleEventList,
            Self::Help => Effect::OpenModal(Modal::help()),
            Self::QuitDialog => Effect::OpenDialog(ConfirmAction::Quit),
        }
    }
}

pub const CHORD_INITIATOR_LABEL: &str = "Ctrl+X";

/// Second keys after the initiator. Consulted only when leaving chord mode.
pub const CHORD_BINDINGS: [(char, ChordCommand, &str); 6] = [
    ('p', ChordCommand::TogglePause, "pause / resume the loop"),
    ('e', ChordCommand::OpenComposer, "write a message to the loop"),
    ('l', ChordCommand::ToggleEventList, "toggle the event history"),
    ('h', ChordCommand::Help, "show help"),
    ('?', ChordCommand::Help, "show help"),
    ('q', ChordCommand::QuitDialog, "quit"),
];

fn chord_command(key: &KeyEvent) -> Option<ChordCommand> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    let KeyCode::Char(c) = key.code else {
        return None;
    };
    CHORD_BINDINGS
        .iter()
        .find(|(binding, _, _)| *binding == c)
        .map(|(_, command, _)| *command)
}

fn is_chord_initiator(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('x')
}

/// Result of routing one input event: who consumed it, and what the controller must do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    pub consumer: Option<Layer>,
    pub action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRouter {
    screen: Rect,
    chord: ChordState,
    dialog: ConfirmDialog,
    modal: ModalSlot,
    event_list: EventListOverlay,
    base: BaseView,
    content: PaneContent,
}

impl InputRouter {
    pub fn new(screen: Rect) -> Self {
        let mut router = Self {
            screen,
            chord: ChordState::Idle,
            dialog: ConfirmDialog::default(),
            modal: ModalSlot::default(),
            event_list: EventListOverlay::default(),
            base: BaseView::default(),
            content: PaneContent::default(),
        };
        router.resync();
        router
    }

    pub fn chord_state(&self) -> ChordState {
        self.chord
    }

    pub fn dialog(&self) -> &ConfirmDialog {
        &self.dialog
    }

    pub fn modal(&self) -> &ModalSlot {
        &self.modal
    }

    pub fn event_list(&self) -> &EventListOverlay {
        &self.event_list
    }

    pub fn base(&self) -> &BaseView {
        &self.base
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn sync_content(&mut self, content: PaneContent) {
        self.content = content;
        self.resync();
    }

    pub fn route(&mut self, input: InputEvent) -> Routed {
        match input {
            InputEvent::Key(key) => self.route_key(key),
            InputEvent::Click { column, row } => self.route_click(column, row),
            InputEvent::Wheel {
                column,
                row,
                direction,
            } => self.route_wheel(column, row, direction),
            InputEvent::Resize { width, height } => {
                self.screen = Rect::new(0, 0, width, height);
                self.resync();
                Routed::default()
            }
        }
    }

    fn route_key(&mut self, key: KeyEvent) -> Routed {
        for layer in ROUTE_ORDER {
            let claimed = match layer {
                Layer::GlobalHotkeys => self.global_hotkey(&key),
                Layer::Chord => self.chord_key(&key),
                _ => self.surface_mut(layer).and_then(|surface| {
                    if !surface.visible() {
                        return None;
                    }
                    let outcome = surface.handle_key(key);
                    outcome.consumed.then_some(outcome.effect)
                }),
            };
            if let Some(effect) = claimed {
                return self.finish(layer, effect);
            }
        }
        Routed::default()
    }

    fn route_click(&mut self, column: u16, row: u16) -> Routed {
        let screen = self.screen;
        for layer in ROUTE_ORDER {
            let claimed = self.surface_mut(layer).and_then(|surface| {
                if !surface.visible() {
                    return None;
                }
                surface.handle_click(screen, column, row)
            });
            if let Some(effect) = claimed {
                return self.finish(layer, effect);
            }
        }
        Routed::default()
    }

    fn route_wheel(&mut self, column: u16, row: u16, direction: ScrollDirection) -> Routed {
        let screen = self.screen;
        for layer in ROUTE_ORDER {
            let claimed = self.surface_mut(layer).is_some_and(|surface| {
                surface.visible() && surface.handle_wheel(screen, column, row, direction)
            });
            if claimed {
                return Routed {
                    consumer: Some(layer),
                    action: None,
                };
            }
        }
        Routed::default()
    }

    fn surface_mut(&mut self, layer: Layer) -> Option<&mut dyn Surface> {
        match layer {
            Layer::Dialog => Some(&mut self.dialog),
            Layer::Modal => Some(&mut self.modal),
            Layer::EventList => Some(&mut self.event_list),
            Layer::BaseView => Some(&mut self.base),
            Layer::GlobalHotkeys | Layer::Chord => None,
        }
    }

    fn global_hotkey(&mut self, key: &KeyEvent) -> Option<Effect> {
        if self.chord == ChordState::AwaitingSecondKey {
            return None;
        }
        if is_termination_key(key) {
            return Some(Effect::Emit(Action::Quit));
        }
        if is_chord_initiator(key) {
            self.chord = ChordState::AwaitingSecondKey;
            return Some(Effect::None);
        }
        None
    }

    fn chord_key(&mut self, key: &KeyEvent) -> Option<Effect> {
        if self.chord != ChordState::AwaitingSecondKey {
            return None;
        }
        self.chord = ChordState::Idle;
        if key.code == KeyCode::Esc || is_termination_key(key) {
            return Some(Effect::None);
        }
        let command = chord_command(key);
        debug!(?command, "chord completed");
        Some(command.map_or(Effect::None, ChordCommand::effect))
    }

    fn finish(&mut self, layer: Layer, effect: Effect) -> Routed {
        let action = match effect {
            Effect::None => None,
            Effect::OpenModal(modal) => {
                self.modal.open(modal);
                None
            }
            Effect::OpenDialog(action) => {
                self.dialog.open(action);
                None
            }
            Effect::ToggleEventList => {
                self.event_list.toggle();
                None
            }
            Effect::Confirmed(ConfirmAction::Quit) => Some(Action::Quit),
            Effect::Emit(action) => Some(action),
        };
        Routed {
            consumer: Some(layer),
            action,
        }
    }

    fn resync(&mut self) {
        self.event_list.sync(self.content.event_count, self.screen);
        self.base.sync(self.content.clone(), self.screen);
    }
}

#[cfg(test)]
#[path = "../tests/unit/router_tests.rs"]
mod tests;
