use ratatui::prelude::*;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Clear, Padding, Paragraph, Wrap};

use crate::app::App;
use crate::pause::PauseState;
use crate::router::{CHORD_BINDINGS, CHORD_INITIATOR_LABEL, ChordState};
use crate::surfaces::{ListCursor, Modal, Pane, Surface};
use crate::theme::Theme;

const TEXT_PADDING: u16 = 1;
const STATUS_HEIGHT: u16 = 3;
const TITLE_BAR_HEIGHT: u16 = 1;
const ACTIVE_TITLE_FG: Color = Color::Black;
const DIALOG_WIDTH: u16 = 56;
const DIALOG_HEIGHT: u16 = 7;
const YES_LABEL: &str = "[ Yes ]";
const NO_LABEL: &str = "[ No ]";
const BASE_HELP: [(&str, &str); 6] = [
    ("Tab / Shift+Tab", "move focus between panes"),
    ("Up / Down", "select in the focused pane"),
    ("Enter", "open the selected task or event"),
    ("Esc", "close the top-most overlay"),
    ("q", "quit (asks first)"),
    ("Ctrl+C", "quit immediately"),
];

/// Screen regions of the base view. Shared by rendering and input hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseLayout {
    pub tasks: Rect,
    pub events: Rect,
    pub notes: Rect,
    pub status: Rect,
}

impl BaseLayout {
    pub fn pane(&self, pane: Pane) -> Rect {
        match pane {
            Pane::Tasks => self.tasks,
            Pane::Events => self.events,
            Pane::Notes => self.notes,
        }
    }

    pub fn hit_test(&self, x: u16, y: u16) -> Option<Pane> {
        Pane::ALL
            .into_iter()
            .find(|pane| point_in_rect(self.pane(*pane), x, y))
    }
}

pub fn base_layout(screen: Rect) -> BaseLayout {
    let [body, status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(screen);
    let [left, events] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    let [tasks, notes] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(left);
    BaseLayout {
        tasks,
        events,
        notes,
        status,
    }
}

/// The event history overlay covers everything but the status bar.
pub fn event_list_rect(screen: Rect) -> Rect {
    let [body, _status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(screen);
    body
}

pub fn modal_rect(screen: Rect) -> Rect {
    centered_rect(
        screen,
        (screen.width.saturating_mul(3) / 5).max(20),
        (screen.height.saturating_mul(3) / 5).max(6),
    )
}

pub fn dialog_rect(screen: Rect) -> Rect {
    centered_rect(screen, DIALOG_WIDTH, DIALOG_HEIGHT)
}

/// Yes/No button regions on the dialog's second-to-last row.
pub fn dialog_buttons(screen: Rect) -> (Rect, Rect) {
    let dialog = dialog_rect(screen);
    let row = dialog.y + dialog.height.saturating_sub(2);
    let yes_width = YES_LABEL.len() as u16;
    let no_width = NO_LABEL.len() as u16;
    let yes = Rect::new(dialog.x + 2, row, yes_width, 1).intersection(dialog);
    let no = Rect::new(
        (dialog.x + dialog.width).saturating_sub(2 + no_width),
        row,
        no_width,
        1,
    )
    .intersection(dialog);
    (yes, no)
}

pub fn list_visible_rows(area: Rect) -> usize {
    area.height.saturating_sub(TITLE_BAR_HEIGHT) as usize
}

/// Maps a screen row inside a titled list area to an item index.
pub fn row_index(area: Rect, row: u16, offset: usize) -> Option<usize> {
    let first = area.y + TITLE_BAR_HEIGHT;
    if row < first || row >= area.y.saturating_add(area.height) {
        return None;
    }
    Some(offset + (row - first) as usize)
}

pub fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn centered_rect(screen: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(screen.width);
    let height = height.min(screen.height);
    Rect::new(
        screen.x + (screen.width - width) / 2,
        screen.y + (screen.height - height) / 2,
        width,
        height,
    )
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let screen = frame.area();
    let layout = base_layout(screen);
    let router = app.router();
    let base = router.base();

    for pane in Pane::ALL {
        let lines = pane_lines(app, pane);
        render_list(
            frame,
            layout.pane(pane),
            pane.title(),
            &lines,
            base.cursor(pane),
            base.focus() == pane,
            theme,
        );
    }
    render_status(frame, layout.status, app, theme);

    if router.event_list().visible() {
        let area = event_list_rect(screen);
        frame.render_widget(Clear, area);
        let lines = pane_lines(app, Pane::Events);
        let title = format!("Event history ({})", lines.len());
        render_list(
            frame,
            area,
            &title,
            &lines,
            router.event_list().cursor(),
            true,
            theme,
        );
    }
    if let Some(modal) = router.modal().current() {
        render_modal(frame, modal_rect(screen), modal, app, theme);
    }
    if let Some(action) = router.dialog().pending() {
        render_dialog(frame, screen, action.prompt(), theme);
    }
}

fn pane_lines(app: &App, pane: Pane) -> Vec<String> {
    match pane {
        Pane::Tasks => app
            .state()
            .tasks
            .iter()
            .map(|task| format!("{} {}", task.status.marker(), task.title))
            .collect(),
        Pane::Events => app
            .history()
            .iter()
            .map(|event| {
                if event.timestamp.is_empty() {
                    event.summary()
                } else {
                    format!("{} {}", event.timestamp, event.summary())
                }
            })
            .collect(),
        Pane::Notes => app
            .state()
            .notes
            .iter()
            .map(|note| note.text.clone())
            .collect(),
    }
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    lines: &[String],
    cursor: ListCursor,
    active: bool,
    theme: &Theme,
) {
    let [title_bar, content] =
        Layout::vertical([Constraint::Length(TITLE_BAR_HEIGHT), Constraint::Min(0)]).areas(area);
    let title_style = if active {
        Style::default().bg(theme.accent_fg).fg(ACTIVE_TITLE_FG)
    } else {
        Style::default().bg(theme.status_bg).fg(theme.text_fg)
    };
    frame.render_widget(
        Paragraph::new(format!(" {title}")).style(title_style),
        title_bar,
    );

    let visible = content.height as usize;
    let rows = lines
        .iter()
        .enumerate()
        .skip(cursor.offset)
        .take(visible)
        .map(|(index, line)| {
            let style = if index == cursor.selected && active {
                Style::default().fg(theme.accent_fg).add_modifier(Modifier::BOLD)
            } else if index == cursor.selected {
                Style::default().fg(theme.text_fg)
            } else {
                Style::default().fg(theme.muted_fg)
            };
            Line::from(Span::styled(format!(" {line}"), style))
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(Text::from(rows)).style(Style::default().bg(theme.pane_bg)),
        content,
    );
}

fn status_line_text(app: &App) -> String {
    let pause = if app.can_pause() {
        app.pause_display().label()
    } else {
        "read-only"
    };
    let mut parts = vec![app.session().to_string(), pause.to_string()];
    if let Some(iteration) = app.state().last_iteration.as_ref() {
        let secs = app.iteration_elapsed().as_secs();
        if app.worker_busy() {
            parts.push(format!(
                "iteration {} {:02}:{:02}",
                iteration.number,
                secs / 60,
                secs % 60
            ));
        } else {
            parts.push(format!("iteration {} idle", iteration.number));
        }
    }
    parts.push(format!(
        "outbound {}/{}",
        app.outbound_depth(),
        app.outbound_capacity()
    ));
    if !app.healthy() {
        parts.push("log missing".to_string());
    }
    if let Some(err) = app.store_error() {
        parts.push(format!("state stale: {err}"));
    }
    if app.router().chord_state() == ChordState::AwaitingSecondKey {
        parts.push(format!("{CHORD_INITIATOR_LABEL} ..."));
    } else if let Some(status) = app.status_line() {
        parts.push(status.to_string());
    }
    parts.join(" | ")
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let fg = match app.pause_display() {
        PauseState::Running => theme.muted_fg,
        PauseState::PauseRequested | PauseState::Paused => theme.paused_fg,
    };
    let status = Paragraph::new(status_line_text(app))
        .style(Style::default().bg(theme.status_bg).fg(fg))
        .block(
            Block::default()
                .style(Style::default().bg(theme.status_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(status, area);
}

fn modal_lines(modal: &Modal, app: &App) -> Vec<String> {
    match modal {
        Modal::Composer { draft } => vec![
            format!("> {draft}_"),
            String::new(),
            "Enter sends, Esc closes".to_string(),
        ],
        Modal::EventDetail { index, .. } => match app.history().get(*index) {
            Some(event) => serde_json::to_string_pretty(event)
                .map(|json| json.lines().map(str::to_string).collect())
                .unwrap_or_else(|err| vec![format!("unprintable event: {err}")]),
            None => vec!["Event no longer available.".to_string()],
        },
        Modal::TaskDetail { task_id, .. } => {
            let mut lines = match app.state().task(task_id) {
                Some(task) => vec![
                    format!("id: {}", task.id),
                    format!("title: {}", task.title),
                    format!("status: {}", task.status.label()),
                ],
                None => vec![format!("Task {task_id} no longer exists.")],
            };
            lines.push(String::new());
            lines.extend(
                app.history()
                    .iter()
                    .filter(|event| event.data_str("id") == Some(task_id.as_str()))
                    .map(|event| event.summary()),
            );
            lines
        }
        Modal::Help { .. } => {
            let mut lines = BASE_HELP
                .iter()
                .map(|(keys, description)| format!("{keys:<16} {description}"))
                .collect::<Vec<_>>();
            lines.push(String::new());
            lines.extend(CHORD_BINDINGS.iter().map(|(key, _, description)| {
                format!("{:<16} {description}", format!("{CHORD_INITIATOR_LABEL} {key}"))
            }));
            lines
        }
    }
}

fn render_modal(frame: &mut Frame, area: Rect, modal: &Modal, app: &App, theme: &Theme) {
    frame.render_widget(Clear, area);
    let text = Text::from(
        modal_lines(modal, app)
            .into_iter()
            .map(Line::from)
            .collect::<Vec<_>>(),
    );
    let body = Paragraph::new(text)
        .style(Style::default().bg(theme.modal_bg).fg(theme.text_fg))
        .wrap(Wrap { trim: false })
        .scroll((modal.scroll(), 0))
        .block(
            Block::default()
                .title(format!(" {} ", modal.title()))
                .style(Style::default().bg(theme.modal_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(body, area);
}

fn render_dialog(frame: &mut Frame, screen: Rect, prompt: &str, theme: &Theme) {
    let area = dialog_rect(screen);
    frame.render_widget(Clear, area);
    let body = Paragraph::new(prompt)
        .style(Style::default().bg(theme.dialog_bg).fg(theme.text_fg))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Confirm ")
                .style(Style::default().bg(theme.dialog_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(body, area);
    let (yes, no) = dialog_buttons(screen);
    let button = Style::default().bg(theme.dialog_bg).fg(theme.accent_fg);
    frame.render_widget(Paragraph::new(YES_LABEL).style(button), yes);
    frame.render_widget(Paragraph::new(NO_LABEL).style(button), no);
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
