use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use lazyjson::app::App;
use lazyjson::config::{self, ByteSize};
use lazyjson::event::AppEvent;
use lazyjson::handlers;
use lazyjson::renderer::EntryParser;
use lazyjson::source::LogSource;
use lazyjson::streamer::{StreamUpdate, Streamer};
use lazyjson::table::LogTable;
use lazyjson::{logging, signal, ui};
use log::{error, info, warn, LevelFilter};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const INPUT_POLL_DURATION_MS: u64 = 50;

#[derive(Parser, Debug)]
#[command(name = "lazyjson", version)]
#[command(about = "A terminal viewer for line-delimited JSON logs", long_about = None)]
struct Args {
    /// Log file to view (omit or use - for stdin)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Config file (default: nearest lazyjson.yaml, then the user config)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Start with follow mode off
    #[arg(long = "no-follow")]
    no_follow: bool,

    /// Show the oldest entry on top
    #[arg(long = "no-reverse")]
    no_reverse: bool,

    /// Stop reading after this many bytes (e.g. 512m, 2g)
    #[arg(long, value_name = "SIZE")]
    max_file_size: Option<ByteSize>,

    /// How often the file is checked for new lines
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Minimum level written to --log-file
    #[arg(long, value_name = "LEVEL", default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("unknown level '{}' (off, error, warn, info, debug, trace)", s))
}

impl Args {
    /// Path to read, `None` for stdin
    fn input_path(&self) -> Option<&PathBuf> {
        self.file.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

/// The running streamer and the channel its updates arrive on
struct Session {
    path: Option<PathBuf>,
    max_bytes: u64,
    poll: Duration,
    streamer: Option<Streamer>,
    tx: Sender<StreamUpdate>,
    rx: Receiver<StreamUpdate>,
}

impl Session {
    fn new(path: Option<PathBuf>, max_bytes: u64, poll: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            path,
            max_bytes,
            poll,
            streamer: None,
            tx,
            rx,
        }
    }

    fn start(&mut self, source: LogSource) {
        let tx = self.tx.clone();
        self.streamer = Some(Streamer::start(source, self.poll, move |update| {
            // The receiver only goes away on exit
            let _ = tx.send(update);
        }));
    }

    /// Stop the workers and discard updates they already queued
    fn stop(&mut self) -> Result<()> {
        let result = match self.streamer.take() {
            Some(streamer) => streamer.stop().context("Failed to close the log source"),
            None => Ok(()),
        };
        while self.rx.try_recv().is_ok() {}
        result
    }

    fn reload(&mut self, app: &mut App) {
        let Some(path) = self.path.clone() else {
            return;
        };

        if let Err(e) = self.stop() {
            warn!("{:#}", e);
        }
        app.begin_reload();

        match LogSource::open(&path, self.max_bytes) {
            Ok(source) => self.start(source),
            Err(e) => {
                error!("Reload failed: {}", e);
                app.apply_event(AppEvent::SourceFailed {
                    message: e.to_string(),
                    truncated: false,
                });
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.input_path().is_none() && io::stdin().is_terminal() {
        eprintln!("Usage: lazyjson <FILE>");
        eprintln!("       command | lazyjson");
        std::process::exit(1);
    }

    if let Some(path) = &args.log_file {
        logging::init_file_logger(path, args.log_level)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
    }

    let discovery = config::discover();
    let (mut cfg, cfg_path) = match config::load(args.config.as_deref(), &discovery) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprint!("{}", e.format_cargo_style());
            std::process::exit(1);
        }
    };
    match &cfg_path {
        Some(path) => info!("Using config {}", path.display()),
        None => info!("Using built-in config"),
    }

    if let Some(size) = args.max_file_size {
        if size.bytes() == 0 {
            bail!("--max-file-size must be at least one byte");
        }
        cfg.max_file_size = size;
    }
    if let Some(ms) = args.poll_interval_ms {
        if ms == 0 {
            bail!("--poll-interval-ms must be at least 1");
        }
        cfg.poll_interval = Duration::from_millis(ms);
    }

    let shutdown =
        signal::setup_shutdown_handlers().context("Failed to install signal handlers")?;

    // Open the source before touching the terminal
    let max_bytes = cfg.max_file_size.bytes();
    let source = match args.input_path() {
        Some(path) => LogSource::open(path, max_bytes)
            .with_context(|| format!("Failed to open {}", path.display()))?,
        None => LogSource::from_reader(io::stdin(), max_bytes)
            .context("Failed to read from stdin")?,
    };

    let parser = Arc::new(EntryParser::new(&cfg));
    let table = LogTable::new(parser, !args.no_follow, !args.no_reverse);
    let mut app = App::new(source.name(), table, source.path().is_some());

    let mut session = Session::new(
        source.path().map(|p| p.to_path_buf()),
        max_bytes,
        cfg.poll_interval,
    );
    session.start(source);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app, &mut session, &shutdown);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let closed = session.stop();
    res?;
    closed
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    session: &mut Session,
    shutdown: &AtomicBool,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Termination signal received");
            break;
        }

        terminal.draw(|f| ui::render(f, app))?;

        // Background events first, so keys see the state they are drawn against
        let mut events = Vec::new();
        while let Ok(update) = session.rx.try_recv() {
            events.extend(handlers::stream::handle_stream_update(update));
        }
        events.extend(app.poll_filter());
        for event in events {
            app.apply_event(event);
        }

        if crossterm_event::poll(Duration::from_millis(INPUT_POLL_DURATION_MS))? {
            if let Event::Key(key) = crossterm_event::read()? {
                if key.kind == KeyEventKind::Press {
                    for event in handlers::input::handle_input_event(key, app) {
                        app.apply_event(event);
                    }
                }
            }
        }

        if app.reload_requested {
            session.reload(app);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
