use super::test_support::{harness, harness_with};
use super::*;
use crate::pause::PauseHandshake;
use crate::pause::test_support::WorkerCalls;
use crate::router::Layer;
use crate::store::{IterationView, TaskStatus, TaskView};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::rc::Rc;

fn key(code: KeyCode) -> AppMessage {
    AppMessage::Input(InputEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
}

fn ctrl(c: char) -> AppMessage {
    AppMessage::Input(InputEvent::Key(KeyEvent::new(
        KeyCode::Char(c),
        KeyModifiers::CONTROL,
    )))
}

fn chord(app: &mut App, second: char) {
    app.handle_message(ctrl('x'));
    app.handle_message(key(KeyCode::Char(second)));
}

fn event(id: u32, kind: &str, action: &str, data: &str) -> AppMessage {
    event_from("s1", id, kind, action, data)
}

fn event_from(session: &str, id: u32, kind: &str, action: &str, data: &str) -> AppMessage {
    let payload = format!(
        r#"{{"id":{id},"session":"{session}","type":"{kind}","action":"{action}","data":{data}}}"#
    );
    let parsed = SessionEvent::parse(payload.as_bytes()).expect("test event should parse");
    AppMessage::SessionEvent(parsed)
}

#[test]
fn chord_pause_requests_pause_once() {
    let mut h = harness();
    assert_eq!(h.app.pause_state(), PauseState::Running);

    chord(&mut h.app, 'p');

    assert_eq!(h.calls.request_pause.get(), 1);
    assert_eq!(h.calls.cancel_pause.get(), 0);
    assert_eq!(h.calls.resume.get(), 0);
    assert_eq!(h.app.last_pause_change(), Some(PausedChanged(true)));
    assert_eq!(h.app.pause_state(), PauseState::PauseRequested);
    assert_eq!(h.app.status_line(), Some("Pause requested"));
}

#[test]
fn second_toggle_cancels_while_iteration_runs() {
    let mut h = harness();
    h.app.handle_message(event(1, "iteration", "started", r#"{"number":1}"#));
    assert!(h.app.worker_busy());

    chord(&mut h.app, 'p');
    chord(&mut h.app, 'p');

    assert_eq!(h.calls.cancel_pause.get(), 1);
    assert_eq!(h.calls.resume.get(), 0);
    assert_eq!(h.app.last_pause_change(), Some(PausedChanged(false)));
    assert_eq!(h.app.status_line(), Some("Pause cancelled"));
}

#[test]
fn second_toggle_resumes_once_worker_confirms_pause() {
    let mut h = harness();
    h.app.handle_message(event(1, "iteration", "started", r#"{"number":1}"#));
    chord(&mut h.app, 'p');
    h.calls.paused.set(true);
    assert_eq!(h.app.pause_display(), PauseState::Paused);

    chord(&mut h.app, 'p');

    assert_eq!(h.calls.resume.get(), 1);
    assert_eq!(h.calls.cancel_pause.get(), 0);
    assert_eq!(h.app.pause_state(), PauseState::Running);
}

#[test]
fn second_toggle_resumes_after_iteration_completes() {
    let mut h = harness();
    h.app.handle_message(event(1, "iteration", "started", r#"{"number":1}"#));
    chord(&mut h.app, 'p');
    h.app.handle_message(event(2, "iteration", "completed", r#"{"number":1}"#));
    assert!(!h.app.worker_busy());

    chord(&mut h.app, 'p');

    assert_eq!(h.calls.resume.get(), 1);
    assert_eq!(h.app.status_line(), Some("Resumed"));
}

#[test]
fn toggle_without_worker_changes_nothing() {
    let mut h = harness_with(PauseHandshake::new(None), Rc::new(WorkerCalls::default()), 4);
    chord(&mut h.app, 'p');
    assert_eq!(h.app.pause_state(), PauseState::Running);
    assert_eq!(h.app.last_pause_change(), None);
    assert_eq!(h.app.status_line(), Some("No worker attached"));
}

#[test]
fn failed_worker_call_is_reported_not_fatal() {
    let mut h = harness();
    h.calls.fail.set(true);
    chord(&mut h.app, 'p');
    assert!(h.app.running);
    assert_eq!(h.app.pause_state(), PauseState::Running);
    assert!(
        h.app
            .status_line()
            .is_some_and(|line| line.starts_with("Pause toggle failed"))
    );
}

#[test]
fn session_events_append_history_and_request_reload() {
    let mut h = harness();
    h.app.handle_message(event(1, "task", "created", r#"{"id":"t1","title":"Write docs"}"#));
    h.app.handle_message(event(2, "note", "added", r#"{"text":"remember"}"#));
    h.app.handle_message(event(3, "task", "completed", r#"{"id":"t1"}"#));

    let ids = h
        .app
        .history()
        .iter()
        .map(|event| event.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(h.reload_rx.try_recv().as_deref(), Ok("s1"));
    assert!(
        h.reload_rx.try_recv().is_err(),
        "bursts coalesce into one pending reload"
    );
}

#[test]
fn reloaded_state_feeds_panes_and_clears_degraded_flag() {
    let mut h = harness();
    h.app
        .handle_message(AppMessage::StateReloaded(Err("disk on fire".to_string())));
    assert_eq!(h.app.store_error(), Some("disk on fire"));

    let state = AggregateState {
        tasks: vec![TaskView {
            id: "t1".to_string(),
            title: "Write docs".to_string(),
            status: TaskStatus::InProgress,
        }],
        iterations: 2,
        last_iteration: Some(IterationView {
            number: 2,
            finished: false,
            outcome: None,
        }),
        event_count: 4,
        ..AggregateState::default()
    };
    h.app.handle_message(AppMessage::StateReloaded(Ok(state.clone())));

    assert_eq!(h.app.store_error(), None);
    assert_eq!(h.app.state(), &state);
    assert!(h.app.worker_busy());
    h.app.handle_message(key(KeyCode::Enter));
    assert_eq!(
        h.app.router().modal().current(),
        Some(&crate::surfaces::Modal::task_detail("t1"))
    );
}

#[test]
fn failed_reload_keeps_previous_state() {
    let mut h = harness();
    let state = AggregateState {
        event_count: 7,
        ..AggregateState::default()
    };
    h.app.handle_message(AppMessage::StateReloaded(Ok(state.clone())));
    h.app
        .handle_message(AppMessage::StateReloaded(Err("gone".to_string())));
    assert_eq!(h.app.state(), &state);
    assert_eq!(h.app.store_error(), Some("gone"));
}

#[test]
fn composed_message_reaches_outbound_queue() {
    let mut h = harness();
    chord(&mut h.app, 'e');
    for c in "ship it".chars() {
        h.app.handle_message(key(KeyCode::Char(c)));
    }
    h.app.handle_message(key(KeyCode::Enter));

    assert_eq!(h.outbound_rx.try_recv().as_deref(), Ok("ship it"));
    assert_eq!(h.app.outbound_depth(), 1);
    let refresh = h.refresh_rx.try_recv().expect("depth refresh");
    assert_eq!(refresh, AppMessage::OutboundDepth(1));

    h.app.handle_message(refresh);
    assert_eq!(h.app.status_line(), Some("Message queued (1 pending)"));

    h.app
        .handle_message(event(9, "control", "message_processing", "{}"));
    assert_eq!(h.app.outbound_depth(), 0);
}

#[test]
fn full_outbound_queue_drops_without_status() {
    let (pause, calls) = crate::pause::test_support::recording_handshake();
    let mut h = harness_with(pause, calls, 1);
    for text in ["one", "two"] {
        chord(&mut h.app, 'e');
        h.app.handle_message(key(KeyCode::Char(text.chars().next().unwrap_or('x'))));
        h.app.handle_message(key(KeyCode::Enter));
    }
    assert_eq!(h.app.outbound_depth(), 1);
    assert_eq!(h.outbound_rx.try_recv().as_deref(), Ok("o"));
    assert!(h.outbound_rx.try_recv().is_err());
    assert_eq!(h.app.status_line(), None);
}

#[test]
fn termination_hotkey_stops_the_loop_even_with_dialog_open() {
    let mut h = harness();
    chord(&mut h.app, 'q');
    assert!(h.app.running);
    h.app.handle_message(ctrl('c'));
    assert!(!h.app.running);
}

#[test]
fn quit_dialog_cancel_keeps_running() {
    let mut h = harness();
    h.app.handle_message(key(KeyCode::Char('q')));
    h.app.handle_message(key(KeyCode::Char('n')));
    assert!(h.app.running);
    h.app.handle_message(key(KeyCode::Char('q')));
    h.app.handle_message(key(KeyCode::Char('y')));
    assert!(!h.app.running);
}

#[test]
fn handle_input_reports_consumer() {
    let mut h = harness();
    let routed = h.app.handle_input(InputEvent::Key(KeyEvent::new(
        KeyCode::Tab,
        KeyModifiers::NONE,
    )));
    assert_eq!(routed.consumer, Some(Layer::BaseView));
}

#[test]
fn subscription_failure_is_shown_once() {
    let mut h = harness();
    h.app
        .handle_message(AppMessage::SubscriptionFailed("no such dir".to_string()));
    assert!(h.app.running);
    assert_eq!(h.app.subscription_error(), Some("no such dir"));
    assert_eq!(
        h.app.status_line(),
        Some("Event source unavailable: no such dir")
    );
}

#[test]
fn duration_ticks_only_count_while_busy() {
    let mut h = harness();
    h.app.handle_message(AppMessage::DurationTick);
    assert_eq!(h.app.iteration_elapsed(), Duration::ZERO);

    h.app.handle_message(event(1, "iteration", "started", r#"{"number":1}"#));
    h.app.handle_message(AppMessage::DurationTick);
    h.app.handle_message(AppMessage::DurationTick);
    assert_eq!(h.app.iteration_elapsed(), Duration::from_secs(2));

    h.app.handle_message(event(2, "iteration", "started", r#"{"number":2}"#));
    assert_eq!(h.app.iteration_elapsed(), Duration::ZERO);
}

#[test]
fn health_probe_updates_indicator() {
    let mut h = harness();
    assert!(h.app.healthy());
    h.app.handle_message(AppMessage::HealthChecked(false));
    assert!(!h.app.healthy());
    h.app.handle_message(AppMessage::HealthChecked(true));
    assert!(h.app.healthy());
}

#[test]
fn other_sessions_do_not_drive_busy_or_pause() {
    let mut h = harness();
    h.app
        .handle_message(event_from("s2", 1, "iteration", "started", r#"{"number":1}"#));
    assert!(!h.app.worker_busy());
    assert_eq!(h.app.history().len(), 1, "listed in history");
    assert!(h.reload_rx.try_recv().is_err(), "store only reads s1");

    chord(&mut h.app, 'p');
    chord(&mut h.app, 'p');
    assert_eq!(h.calls.cancel_pause.get(), 0);
    assert_eq!(h.calls.resume.get(), 1);
}

#[test]
fn other_sessions_do_not_drain_outbound_depth() {
    let mut h = harness();
    chord(&mut h.app, 'e');
    h.app.handle_message(key(KeyCode::Char('x')));
    h.app.handle_message(key(KeyCode::Enter));
    assert_eq!(h.app.outbound_depth(), 1);

    h.app
        .handle_message(event_from("s2", 1, "control", "message_processing", "{}"));
    assert_eq!(h.app.outbound_depth(), 1);
    h.app
        .handle_message(event_from("s2", 2, "control", "paused", "{}"));
    assert_eq!(h.app.status_line(), None);
}

#[test]
fn stale_reload_does_not_clear_live_busy_flag() {
    let mut h = harness();
    chord(&mut h.app, 'p');
    h.app.handle_message(event(1, "iteration", "started", r#"{"number":2}"#));
    assert!(h.app.worker_busy());

    let stale = AggregateState {
        iterations: 1,
        last_iteration: Some(IterationView {
            number: 1,
            finished: true,
            outcome: None,
        }),
        ..AggregateState::default()
    };
    h.app.handle_message(AppMessage::StateReloaded(Ok(stale)));
    assert!(h.app.worker_busy());

    chord(&mut h.app, 'p');
    assert_eq!(h.calls.cancel_pause.get(), 1);
    assert_eq!(h.calls.resume.get(), 0);
}

#[test]
fn pause_acknowledgement_event_enters_paused() {
    let mut h = harness();
    h.app.handle_message(event(1, "iteration", "started", r#"{"number":1}"#));
    chord(&mut h.app, 'p');
    h.calls.paused.set(true);
    h.app.handle_message(event(2, "control", "paused", "{}"));
    assert_eq!(h.app.pause_state(), PauseState::Paused);
    assert_eq!(h.app.status_line(), Some("Loop acknowledged pause"));

    chord(&mut h.app, 'p');
    assert_eq!(h.calls.resume.get(), 1);
    assert_eq!(h.app.pause_state(), PauseState::Running);
}
