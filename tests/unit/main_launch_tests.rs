use super::*;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("loopdeck-{prefix}-{nanos}-{counter}"));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn append_line(path: &Path, line: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open session log");
    writeln!(file, "{line}").expect("append session log");
}

#[test]
fn args_default_paths_follow_the_session() {
    let args = Args::try_parse_from(["loopdeck", "--session", "s1"]).expect("parse args");
    assert_eq!(args.dir, PathBuf::from(".loopdeck"));
    assert_eq!(args.pattern(), "s1");
    assert_eq!(args.config, PathBuf::from("loopdeck.toml"));
    assert_eq!(args.log_file(), PathBuf::from(".loopdeck/loopdeck.log"));
    assert_eq!(args.inbox_file(), PathBuf::from(".loopdeck/s1.inbox.jsonl"));
    assert!(!args.read_only);
}

#[test]
fn args_accept_overrides() {
    let args = Args::try_parse_from([
        "loopdeck",
        "--session",
        "s1",
        "--dir",
        "/tmp/runs",
        "--pattern",
        "s*",
        "--log-file",
        "/tmp/ld.log",
        "--read-only",
    ])
    .expect("parse args");
    assert_eq!(args.pattern(), "s*");
    assert_eq!(args.log_file(), PathBuf::from("/tmp/ld.log"));
    assert!(args.read_only);
}

#[test]
fn args_require_a_session() {
    assert!(Args::try_parse_from(["loopdeck"]).is_err());
}

#[test]
fn appended_log_lines_flow_through_bridge_consumer_and_reload() {
    let root = TempDirGuard::new("pipeline");
    let log = root.path().join("s1.jsonl");
    append_line(
        &log,
        r#"{"id":1,"session":"s1","type":"task","action":"created","data":{"id":"t1","title":"Old task"}}"#,
    );

    let (tx, rx) = mpsc::channel();
    let (queue_tx, queue_rx) = event_queue::bounded(16);
    let source = JsonlLogSource::new(root.path(), Duration::from_millis(10));
    let mut bridge = EventBridge::start(&source, "s1", queue_tx, &tx);
    assert!(bridge.is_subscribed());
    let consumer = consumer::spawn_event_consumer(queue_rx, tx.clone()).expect("spawn consumer");

    let store: Arc<dyn StateStore> = Arc::new(JsonlStore::new(root.path()));
    let (reloader, reload_rx) = Reloader::channel();
    reload::spawn_reload_worker(reload_rx, store, tx.clone()).expect("spawn reload worker");
    let (outbound, _outbound_rx) = outbound::channel(4, tx.clone());
    let mut app = App::new(AppParts {
        session: "s1".to_string(),
        screen: Rect::new(0, 0, 100, 30),
        pause: PauseHandshake::new(None),
        outbound,
        reloader,
        tick_interval: Duration::from_secs(1),
    });
    app.request_reload();

    std::thread::sleep(Duration::from_millis(50));
    append_line(&log, "not json");
    append_line(
        &log,
        r#"{"id":2,"session":"s1","type":"task","action":"created","data":{"id":"t2","title":"New task"}}"#,
    );
    append_line(
        &log,
        r#"{"id":3,"session":"s1","type":"note","action":"added","data":{"text":"hello"}}"#,
    );

    let deadline = Instant::now() + Duration::from_secs(10);
    while !(app.history().len() == 2 && app.state().tasks.len() == 2 && app.state().notes.len() == 1)
    {
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(!remaining.is_zero(), "pipeline did not settle");
        if let Ok(message) = rx.recv_timeout(remaining.min(Duration::from_millis(200))) {
            app.handle_message(message);
        }
    }

    let ids = app
        .history()
        .iter()
        .map(|event| event.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["2", "3"]);
    assert_eq!(app.state().tasks[0].title, "Old task");

    bridge.stop();
    assert!(!bridge.is_subscribed());
    assert_eq!(consumer.join().expect("consumer should exit"), 2);
}
