use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;

use crate::events::ScrollDirection;
use crate::ui::{
    BaseLayout, base_layout, dialog_buttons, event_list_rect, list_visible_rows, modal_rect,
    point_in_rect, row_index,
};

const WHEEL_STEP: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePause,
    SendMessage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Quit,
}

impl ConfirmAction {
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Quit => "Quit loopdeck? The iteration loop keeps running.",
        }
    }
}

/// What a surface asks the router to do after it handled an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    OpenModal(Modal),
    OpenDialog(ConfirmAction),
    ToggleEventList,
    Confirmed(ConfirmAction),
    Emit(Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub consumed: bool,
    pub effect: Effect,
}

impl KeyOutcome {
    fn consumed(effect: Effect) -> Self {
        Self {
            consumed: true,
            effect,
        }
    }

    fn swallowed() -> Self {
        Self::consumed(Effect::None)
    }

    fn passed() -> Self {
        Self {
            consumed: false,
            effect: Effect::None,
        }
    }
}

/// An input-capturing participant in the router's priority order.
///
/// `handle_click` and `handle_wheel` return `None` / `false` when the surface does not
/// claim the pointer event, letting it fall through to the next surface.
pub trait Surface {
    fn visible(&self) -> bool;
    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome;
    fn handle_click(&mut self, screen: Rect, column: u16, row: u16) -> Option<Effect>;
    fn handle_wheel(
        &mut self,
        screen: Rect,
        column: u16,
        row: u16,
        direction: ScrollDirection,
    ) -> bool;
}

pub fn is_termination_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Selection plus first visible row of a scrollable list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCursor {
    pub selected: usize,
    pub offset: usize,
}

impl ListCursor {
    pub fn move_up(&mut self, len: usize, visible: usize) {
        self.select(self.selected.saturating_sub(1), len, visible);
    }

    pub fn move_down(&mut self, len: usize, visible: usize) {
        self.select(self.selected.saturating_add(1), len, visible);
    }

    pub fn select(&mut self, index: usize, len: usize, visible: usize) {
        self.selected = index.min(len.saturating_sub(1));
        let visible = visible.max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + visible {
            self.offset = self.selected + 1 - visible;
        }
    }

    /// Moves the viewport only; the selection may end up off screen.
    pub fn scroll(&mut self, direction: ScrollDirection, len: usize, visible: usize) {
        let max_offset = len.saturating_sub(visible.max(1));
        self.offset = match direction {
            ScrollDirection::Up => self.offset.saturating_sub(WHEEL_STEP),
            ScrollDirection::Down => self.offset.saturating_add(WHEEL_STEP).min(max_offset),
        };
    }

    pub fn clamp(&mut self, len: usize, visible: usize) {
        let max_offset = len.saturating_sub(visible.max(1));
        self.offset = self.offset.min(max_offset);
        self.select(self.selected, len, visible);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmDialog {
    pending: Option<ConfirmAction>,
}

impl ConfirmDialog {
    pub fn open(&mut self, action: ConfirmAction) {
        self.pending = Some(action);
    }

    pub fn pending(&self) -> Option<ConfirmAction> {
        self.pending
    }

    fn answer(&mut self, confirmed: bool) -> Effect {
        match self.pending.take() {
            Some(action) if confirmed => Effect::Confirmed(action),
            _ => Effect::None,
        }
    }
}

impl Surface for ConfirmDialog {
    fn visible(&self) -> bool {
        self.pending.is_some()
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if is_termination_key(&key) {
            return KeyOutcome::passed();
        }
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                KeyOutcome::consumed(self.answer(true))
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                KeyOutcome::consumed(self.answer(false))
            }
            _ => KeyOutcome::swallowed(),
        }
    }

    fn handle_click(&mut self, screen: Rect, column: u16, row: u16) -> Option<Effect> {
        let (yes, no) = dialog_buttons(screen);
        if point_in_rect(yes, column, row) {
            return Some(self.answer(true));
        }
        if point_in_rect(no, column, row) {
            return Some(self.answer(false));
        }
        Some(Effect::None)
    }

    fn handle_wheel(&mut self, _: Rect, _: u16, _: u16, _: ScrollDirection) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Composer { draft: String },
    EventDetail { index: usize, scroll: u16 },
    TaskDetail { task_id: String, scroll: u16 },
    Help { scroll: u16 },
}

impl Modal {
    pub fn composer() -> Self {
        Self::Composer {
            draft: String::new(),
        }
    }

    pub fn event_detail(index: usize) -> Self {
        Self::EventDetail { index, scroll: 0 }
    }

    pub fn task_detail(task_id: impl Into<String>) -> Self {
        Self::TaskDetail {
            task_id: task_id.into(),
            scroll: 0,
        }
    }

    pub fn help() -> Self {
        Self::Help { scroll: 0 }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Composer { .. } => "Message to loop",
            Self::EventDetail { .. } => "Event",
            Self::TaskDetail { .. } => "Task",
            Self::Help { .. } => "Help",
        }
    }

    pub fn scroll(&self) -> u16 {
        match self {
            Self::Composer { .. } => 0,
            Self::EventDetail { scroll, .. }
            | Self::TaskDetail { scroll, .. }
            | Self::Help { scroll } => *scroll,
        }
    }

    fn scroll_by(&mut self, direction: ScrollDirection) {
        let (Self::EventDetail { scroll, .. }
        | Self::TaskDetail { scroll, .. }
        | Self::Help { scroll }) = self
        else {
            return;
        };
        *scroll = match direction {
            ScrollDirection::Up => scroll.saturating_sub(1),
            ScrollDirection::Down => scroll.saturating_add(1),
        };
    }
}

/// Holds the single open non-dialog modal. Opening another one replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalSlot {
    open: Option<Modal>,
}

impl ModalSlot {
    pub fn open(&mut self, modal: Modal) {
        self.open = Some(modal);
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn current(&self) -> Option<&Modal> {
        self.open.as_ref()
    }
}

impl Surface for ModalSlot {
    fn visible(&self) -> bool {
        self.open.is_some()
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let Some(modal) = self.open.as_mut() else {
            return KeyOutcome::passed();
        };
        if key.code == KeyCode::Esc {
            self.open = None;
            return KeyOutcome::swallowed();
        }
        if let Modal::Composer { draft } = modal {
            match key.code {
                KeyCode::Enter => {
                    let text = draft.trim().to_string();
                    if text.is_empty() {
                        return KeyOutcome::swallowed();
                    }
                    self.open = None;
                    return KeyOutcome::consumed(Effect::Emit(Action::SendMessage(text)));
                }
                KeyCode::Backspace => {
                    draft.pop();
                }
                KeyCode::Char(c)
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                {
                    draft.push(c);
                }
                _ => {}
            }
            return KeyOutcome::swallowed();
        }
        match key.code {
            KeyCode::Up => modal.scroll_by(ScrollDirection::Up),
            KeyCode::Down => modal.scroll_by(ScrollDirection::Down),
            _ => {}
        }
        KeyOutcome::swallowed()
    }

    fn handle_click(&mut self, screen: Rect, column: u16, row: u16) -> Option<Effect> {
        if !point_in_rect(modal_rect(screen), column, row) {
            self.open = None;
        }
        Some(Effect::None)
    }

    fn handle_wheel(&mut self, _: Rect, _: u16, _: u16, direction: ScrollDirection) -> bool {
        if let Some(modal) = self.open.as_mut() {
            modal.scroll_by(direction);
        }
        true
    }
}

/// Full-screen list of the session's event history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListOverlay {
    open: bool,
    cursor: ListCursor,
    len: usize,
    visible_rows: usize,
}

impl EventListOverlay {
    pub fn toggle(&mut self) {
        self.open = !self.open;
        if self.open {
            self.cursor.select(self.len.saturating_sub(1), self.len, self.visible_rows);
        }
    }

    pub fn cursor(&self) -> ListCursor {
        self.cursor
    }

    pub fn sync(&mut self, len: usize, screen: Rect) {
        self.len = len;
        self.visible_rows = list_visible_rows(event_list_rect(screen));
        self.cursor.clamp(len, self.visible_rows);
    }

    fn selected_event(&self) -> Option<usize> {
        (self.cursor.selected < self.len).then_some(self.cursor.selected)
    }
}

impl Surface for EventListOverlay {
    fn visible(&self) -> bool {
        self.open
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Esc => self.open = false,
            KeyCode::Up => self.cursor.move_up(self.len, self.visible_rows),
            KeyCode::Down => self.cursor.move_down(self.len, self.visible_rows),
            KeyCode::Home => self.cursor.select(0, self.len, self.visible_rows),
            KeyCode::End => {
                self.cursor
                    .select(self.len.saturating_sub(1), self.len, self.visible_rows)
            }
            KeyCode::Enter => {
                if let Some(index) = self.selected_event() {
                    return KeyOutcome::consumed(Effect::OpenModal(Modal::event_detail(index)));
                }
            }
            _ => {}
        }
        KeyOutcome::swallowed()
    }

    fn handle_click(&mut self, screen: Rect, column: u16, row: u16) -> Option<Effect> {
        let area = event_list_rect(screen);
        if !point_in_rect(area, column, row) {
            return Some(Effect::None);
        }
        match row_index(area, row, self.cursor.offset).filter(|index| *index < self.len) {
            Some(index) => {
                self.cursor.select(index, self.len, self.visible_rows);
                Some(Effect::OpenModal(Modal::event_detail(index)))
            }
            None => Some(Effect::None),
        }
    }

    fn handle_wheel(&mut self, _: Rect, _: u16, _: u16, direction: ScrollDirection) -> bool {
        self.cursor.scroll(direction, self.len, self.visible_rows);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Tasks,
    Events,
    Notes,
}

impl Pane {
    pub const ALL: [Pane; 3] = [Pane::Tasks, Pane::Events, Pane::Notes];

    pub fn title(self) -> &'static str {
        match self {
            Self::Tasks => "Tasks",
            Self::Events => "Events",
            Self::Notes => "Notes",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Tasks => Self::Events,
            Self::Events => Self::Notes,
            Self::Notes => Self::Tasks,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Tasks => Self::Notes,
            Self::Events => Self::Tasks,
            Self::Notes => Self::Events,
        }
    }
}

/// What the base panes currently list, refreshed by the controller after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneContent {
    pub task_ids: Vec<String>,
    pub event_count: usize,
    pub note_count: usize,
}

/// The three always-present panes. The only focus-sensitive surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseView {
    focus: Pane,
    tasks: ListCursor,
    events: ListCursor,
    notes: ListCursor,
    content: PaneContent,
    layout: BaseLayout,
}

impl Default for BaseView {
    fn default() -> Self {
        Self {
            focus: Pane::Tasks,
            tasks: ListCursor::default(),
            events: ListCursor::default(),
            notes: ListCursor::default(),
            content: PaneContent::default(),
            layout: base_layout(Rect::default()),
        }
    }
}

impl BaseView {
    pub fn focus(&self) -> Pane {
        self.focus
    }

    pub fn cursor(&self, pane: Pane) -> ListCursor {
        match pane {
            Pane::Tasks => self.tasks,
            Pane::Events => self.events,
            Pane::Notes => self.notes,
        }
    }

    pub fn sync(&mut self, content: PaneContent, screen: Rect) {
        let events_grew = content.event_count > self.content.event_count;
        let follow_events = self.events.selected + 1 >= self.content.event_count;
        self.content = content;
        self.layout = base_layout(screen);
        for pane in Pane::ALL {
            let (len, visible) = (self.len(pane), self.visible_rows(pane));
            self.cursor_mut(pane).clamp(len, visible);
        }
        if events_grew && follow_events {
            let (len, visible) = (self.len(Pane::Events), self.visible_rows(Pane::Events));
            self.events.select(len.saturating_sub(1), len, visible);
        }
    }

    fn len(&self, pane: Pane) -> usize {
        match pane {
            Pane::Tasks => self.content.task_ids.len(),
            Pane::Events => self.content.event_count,
            Pane::Notes => self.content.note_count,
        }
    }

    fn visible_rows(&self, pane: Pane) -> usize {
        list_visible_rows(self.layout.pane(pane))
    }

    fn cursor_mut(&mut self, pane: Pane) -> &mut ListCursor {
        match pane {
            Pane::Tasks => &mut self.tasks,
            Pane::Events => &mut self.events,
            Pane::Notes => &mut self.notes,
        }
    }

    fn primary_action(&self, pane: Pane, index: usize) -> Effect {
        match pane {
            Pane::Tasks => self
                .content
                .task_ids
                .get(index)
                .map(|id| Effect::OpenModal(Modal::task_detail(id.clone())))
                .unwrap_or(Effect::None),
            Pane::Events if index < self.content.event_count => {
                Effect::OpenModal(Modal::event_detail(index))
            }
            Pane::Events | Pane::Notes => Effect::None,
        }
    }
}

impl Surface for BaseView {
    fn visible(&self) -> bool {
        true
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let focus = self.focus;
        let (len, visible) = (self.len(focus), self.visible_rows(focus));
        match key.code {
            KeyCode::Tab => self.focus = focus.next(),
            KeyCode::BackTab => self.focus = focus.prev(),
            KeyCode::Up => self.cursor_mut(focus).move_up(len, visible),
            KeyCode::Down => self.cursor_mut(focus).move_down(len, visible),
            KeyCode::Enter => {
                let selected = self.cursor(focus).selected;
                return KeyOutcome::consumed(self.primary_action(focus, selected));
            }
            KeyCode::Char('q') if key.modifiers.is_empty() => {
                return KeyOutcome::consumed(Effect::OpenDialog(ConfirmAction::Quit));
            }
            _ => return KeyOutcome::passed(),
        }
        KeyOutcome::swallowed()
    }

    fn handle_click(&mut self, _screen: Rect, column: u16, row: u16) -> Option<Effect> {
        let pane = self.layout.hit_test(column, row)?;
        self.focus = pane;
        let offset = self.cursor(pane).offset;
        let (len, visible) = (self.len(pane), self.visible_rows(pane));
        let Some(index) = row_index(self.layout.pane(pane), row, offset).filter(|i| *i < len)
        else {
            return Some(Effect::None);
        };
        self.cursor_mut(pane).select(index, len, visible);
        Some(self.primary_action(pane, index))
    }

    fn handle_wheel(
        &mut self,
        _screen: Rect,
        column: u16,
        row: u16,
        direction: ScrollDirection,
    ) -> bool {
        let Some(pane) = self.layout.hit_test(column, row) else {
            return false;
        };
        let (len, visible) = (self.len(pane), self.visible_rows(pane));
        self.cursor_mut(pane).scroll(direction, len, visible);
        true
    }
}
