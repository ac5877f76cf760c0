use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::AppMessage;
use crate::shutdown::Shutdown;

/// Sends `make_message()` every `interval` until shutdown or until the loop stops
/// listening.
pub fn spawn_periodic<F>(
    name: &str,
    interval: Duration,
    shutdown: Shutdown,
    messages: Sender<AppMessage>,
    mut make_message: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut() -> AppMessage + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                if shutdown.is_triggered() {
                    break;
                }
                if messages.send(make_message()).is_err() {
                    break;
                }
            }
        })
}
