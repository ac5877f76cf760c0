use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseButton, MouseEventKind};

use crate::session_event::SessionEvent;
use crate::shutdown::Shutdown;
use crate::store::AggregateState;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Click { column: u16, row: u16 },
    Wheel {
        column: u16,
        row: u16,
        direction: ScrollDirection,
    },
    Resize { width: u16, height: u16 },
}

/// Everything the controller loop reacts to. Produced by the input reader, the event
/// consumer, the reloader and the timers.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMessage {
    Input(InputEvent),
    SessionEvent(SessionEvent),
    StateReloaded(Result<AggregateState, String>),
    SubscriptionFailed(String),
    OutboundDepth(usize),
    HealthChecked(bool),
    DurationTick,
}

pub fn map_terminal_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
            Some(InputEvent::Key(key_event))
        }
        Event::Mouse(mouse_event) => {
            let (column, row) = (mouse_event.column, mouse_event.row);
            match mouse_event.kind {
                MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::Click { column, row }),
                MouseEventKind::ScrollUp => Some(InputEvent::Wheel {
                    column,
                    row,
                    direction: ScrollDirection::Up,
                }),
                MouseEventKind::ScrollDown => Some(InputEvent::Wheel {
                    column,
                    row,
                    direction: ScrollDirection::Down,
                }),
                _ => None,
            }
        }
        Event::Resize(width, height) => Some(InputEvent::Resize { width, height }),
        _ => None,
    }
}

pub fn spawn_input_reader(
    messages: Sender<AppMessage>,
    shutdown: Shutdown,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || {
            while !shutdown.is_triggered() {
                match event::poll(INPUT_POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "terminal input poll failed");
                        break;
                    }
                }
                let input = match event::read() {
                    Ok(raw) => map_terminal_event(raw),
                    Err(err) => {
                        tracing::warn!(error = %err, "terminal input read failed");
                        break;
                    }
                };
                let Some(input) = input else {
                    continue;
                };
                if messages.send(AppMessage::Input(input)).is_err() {
                    break;
                }
            }
        })
}
