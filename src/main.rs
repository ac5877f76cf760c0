use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod bridge;
mod config;
mod consumer;
mod error;
mod event_queue;
mod event_source;
mod events;
mod outbound;
mod pause;
mod reload;
mod router;
mod session_event;
mod shutdown;
mod store;
mod surfaces;
mod theme;
mod ticker;
mod ui;
mod worker;

use app::{App, AppParts};
use bridge::EventBridge;
use config::Config;
use event_source::{INBOX_LOG_SUFFIX, JsonlLogSource};
use events::AppMessage;
use pause::PauseHandshake;
use reload::Reloader;
use shutdown::Shutdown;
use store::{JsonlStore, StateStore, session_log_path};
use theme::Theme;
use worker::{ControlDirWorker, WorkerControl};

const MAX_MESSAGES_PER_LOOP: usize = 128;

#[derive(Debug, Parser)]
#[command(name = "loopdeck")]
#[command(about = "Terminal dashboard for supervising an iteration loop session")]
struct Args {
    /// Directory holding the session logs and control files
    #[arg(long, default_value = ".loopdeck")]
    dir: PathBuf,

    /// Session to supervise
    #[arg(long)]
    session: String,

    /// Log file pattern to follow (`*` wildcard); defaults to the session id
    #[arg(long)]
    pattern: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "loopdeck.toml")]
    config: PathBuf,

    /// Diagnostics log; defaults to <dir>/loopdeck.log
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Observe only; never write pause or resume markers
    #[arg(long)]
    read_only: bool,
}

impl Args {
    fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(&self.session)
    }

    fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.dir.join("loopdeck.log"))
    }

    fn inbox_file(&self) -> PathBuf {
        self.dir.join(format!("{}{INBOX_LOG_SUFFIX}", self.session))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fs::create_dir_all(&args.dir)
        .with_context(|| format!("creating {}", args.dir.display()))?;
    init_logging(&args.log_file())?;
    let config = Config::load_or_default(&args.config);
    let theme = Theme::from_overrides(&config.colors);
    info!(session = %args.session, dir = %args.dir.display(), "starting loopdeck");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let result = run_app(&mut terminal, &args, &config, &theme);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("loopdeck=info".parse()?))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    args: &Args,
    config: &Config,
    theme: &Theme,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    let shutdown = Shutdown::new();

    let (queue_tx, queue_rx) = event_queue::bounded(config.queues.event_capacity);
    let source = JsonlLogSource::new(&args.dir, config.source.poll_interval());
    EventBridge::start(&source, args.pattern(), queue_tx, &tx).stop_on(&shutdown);
    consumer::spawn_event_consumer(queue_rx, tx.clone())?;

    let store: Arc<dyn StateStore> = Arc::new(JsonlStore::new(&args.dir));
    let (reloader, reload_rx) = Reloader::channel();
    reload::spawn_reload_worker(reload_rx, store, tx.clone())?;

    let (outbound, outbound_rx) = outbound::channel(config.queues.outbound_capacity, tx.clone());
    let inbox_writer = outbound::spawn_inbox_writer(outbound_rx, args.inbox_file())?;

    let worker: Option<Box<dyn WorkerControl>> = if args.read_only {
        None
    } else {
        Some(Box::new(ControlDirWorker::for_session(
            &args.dir,
            &args.session,
        )))
    };

    events::spawn_input_reader(tx.clone(), shutdown.clone())?;
    let log_path = session_log_path(&args.dir, &args.session);
    ticker::spawn_periodic(
        "health-probe",
        config.timers.health_interval(),
        shutdown.clone(),
        tx.clone(),
        move || AppMessage::HealthChecked(log_path.exists()),
    )?;
    ticker::spawn_periodic(
        "duration-tick",
        config.timers.duration_tick(),
        shutdown.clone(),
        tx,
        || AppMessage::DurationTick,
    )?;

    let size = terminal.size()?;
    let mut app = App::new(AppParts {
        session: args.session.clone(),
        screen: Rect::new(0, 0, size.width, size.height),
        pause: PauseHandshake::new(worker),
        outbound,
        reloader,
        tick_interval: config.timers.duration_tick(),
    });
    app.request_reload();

    let result = drive(terminal, &mut app, &rx, theme);

    shutdown.trigger();
    drop(app);
    if inbox_writer.join().is_err() {
        warn!("inbox writer panicked");
    }
    info!(session = %args.session, "loopdeck stopped");
    result
}

fn drive(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    messages: &Receiver<AppMessage>,
    theme: &Theme,
) -> anyhow::Result<()> {
    while app.running {
        terminal.draw(|frame| ui::render(frame, app, theme))?;
        let Ok(message) = messages.recv() else {
            break;
        };
        app.handle_message(message);
        for message in messages.try_iter().take(MAX_MESSAGES_PER_LOOP) {
            if !app.running {
                break;
            }
            app.handle_message(message);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/main_launch_tests.rs"]
mod tests;
