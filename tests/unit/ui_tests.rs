use super::*;
use crate::app::test_support::harness;
use crate::events::{AppMessage, InputEvent};
use crate::session_event::SessionEvent;
use crate::store::{AggregateState, NoteView, TaskStatus, TaskView};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;

fn render_text(app: &App, width: u16, height: u16) -> String {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).expect("test terminal should initialize");
    let theme = Theme::default();
    terminal
        .draw(|frame| render(frame, app, &theme))
        .expect("render should succeed");
    buffer_to_string(terminal.backend().buffer())
}

fn buffer_to_string(buffer: &Buffer) -> String {
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    app.handle_message(AppMessage::Input(InputEvent::Key(KeyEvent::new(
        code, modifiers,
    ))));
}

fn chord(app: &mut App, second: char) {
    press(app, KeyCode::Char('x'), KeyModifiers::CONTROL);
    press(app, KeyCode::Char(second), KeyModifiers::NONE);
}

fn seeded_app() -> App {
    let mut app = harness().app;
    app.handle_message(AppMessage::StateReloaded(Ok(AggregateState {
        tasks: vec![TaskView {
            id: "t1".to_string(),
            title: "Write docs".to_string(),
            status: TaskStatus::Done,
        }],
        notes: vec![NoteView {
            id: "n1".to_string(),
            text: "remember the milk".to_string(),
        }],
        ..AggregateState::default()
    })));
    let event = SessionEvent::parse(
        br#"{"id":"e1","timestamp":"12:00:01","session":"s1","type":"task","action":"created","data":{"id":"t1","title":"Write docs"}}"#,
    )
    .expect("event should parse");
    app.handle_message(AppMessage::SessionEvent(event));
    app
}

#[test]
fn render_shows_three_panes_and_status() {
    let text = render_text(&seeded_app(), 100, 30);
    assert!(text.contains("Tasks"));
    assert!(text.contains("Events"));
    assert!(text.contains("Notes"));
    assert!(text.contains("[x] Write docs"));
    assert!(text.contains("12:00:01 task created: Write docs"));
    assert!(text.contains("remember the milk"));
    assert!(text.contains("s1 | running"));
    assert!(text.contains("outbound 0/4"));
}

#[test]
fn status_shows_pausing_and_chord_hint() {
    let mut app = seeded_app();
    chord(&mut app, 'p');
    press(&mut app, KeyCode::Char('x'), KeyModifiers::CONTROL);
    let text = render_text(&app, 100, 30);
    assert!(text.contains("pausing"));
    assert!(text.contains("Ctrl+X ..."));
}

#[test]
fn status_shows_degraded_store() {
    let mut app = seeded_app();
    app.handle_message(AppMessage::StateReloaded(Err("bad read".to_string())));
    let text = render_text(&app, 120, 30);
    assert!(text.contains("state stale: bad read"));
    assert!(text.contains("[x] Write docs"), "keeps last good state");
}

#[test]
fn help_modal_lists_chord_bindings() {
    let mut app = seeded_app();
    chord(&mut app, 'h');
    let text = render_text(&app, 100, 30);
    assert!(text.contains("Help"));
    assert!(text.contains("Ctrl+X p"));
    assert!(text.contains("pause / resume the loop"));
}

#[test]
fn dialog_renders_prompt_and_buttons_over_modal() {
    let mut app = seeded_app();
    chord(&mut app, 'h');
    chord(&mut app, 'q');
    let text = render_text(&app, 100, 30);
    assert!(text.contains("Confirm"));
    assert!(text.contains("[ Yes ]"));
    assert!(text.contains("[ No ]"));
}

#[test]
fn event_detail_shows_raw_event() {
    let mut app = seeded_app();
    chord(&mut app, 'l');
    press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
    let text = render_text(&app, 100, 30);
    assert!(text.contains("Event history (1)"));
    assert!(text.contains("\"action\": \"created\""));
}

#[test]
fn task_detail_shows_status_and_related_events() {
    let mut app = seeded_app();
    press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
    let text = render_text(&app, 100, 30);
    assert!(text.contains("status: done"));
    assert!(text.contains("task created: Write docs"));
}

#[test]
fn composer_shows_draft() {
    let mut app = seeded_app();
    chord(&mut app, 'e');
    press(&mut app, KeyCode::Char('h'), KeyModifiers::NONE);
    press(&mut app, KeyCode::Char('i'), KeyModifiers::NONE);
    let text = render_text(&app, 100, 30);
    assert!(text.contains("> hi_"));
}

#[test]
fn base_layout_hit_test_identifies_each_pane() {
    let screen = Rect::new(0, 0, 120, 30);
    let layout = base_layout(screen);
    for pane in Pane::ALL {
        let area = layout.pane(pane);
        assert_eq!(layout.hit_test(area.x + 1, area.y + 1), Some(pane));
    }
    assert_eq!(layout.hit_test(layout.status.x, layout.status.y), None);
}

#[test]
fn row_index_skips_title_bar_and_applies_offset() {
    let area = Rect::new(0, 5, 20, 10);
    assert_eq!(row_index(area, 5, 0), None);
    assert_eq!(row_index(area, 6, 0), Some(0));
    assert_eq!(row_index(area, 8, 4), Some(6));
    assert_eq!(row_index(area, 15, 0), None);
    assert_eq!(list_visible_rows(area), 9);
}

#[test]
fn dialog_buttons_sit_inside_dialog() {
    let screen = Rect::new(0, 0, 100, 30);
    let dialog = dialog_rect(screen);
    let (yes, no) = dialog_buttons(screen);
    assert!(point_in_rect(dialog, yes.x, yes.y));
    assert!(point_in_rect(dialog, no.x + no.width - 1, no.y));
    assert!(yes.x + yes.width <= no.x);
}

#[test]
fn overlays_fit_tiny_screens() {
    let screen = Rect::new(0, 0, 10, 4);
    let modal = modal_rect(screen);
    assert!(modal.width <= screen.width && modal.height <= screen.height);
    let dialog = dialog_rect(screen);
    assert!(dialog.width <= screen.width && dialog.height <= screen.height);
    let _ = render_text(&harness().app, 10, 4);
}

#[test]
fn status_marks_sessions_without_a_worker() {
    let pause = crate::pause::PauseHandshake::new(None);
    let calls = std::rc::Rc::new(crate::pause::test_support::WorkerCalls::default());
    let app = crate::app::test_support::harness_with(pause, calls, 4).app;
    let text = render_text(&app, 100, 30);
    assert!(text.contains("s1 | read-only"));
}
