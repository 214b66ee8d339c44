pub mod adaptive;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod stimulus;
pub mod ui;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigStore, FileConfigStore};
use crate::results::{ResultsDb, SessionResult};
use crate::runtime::{CrosstermEventSource, FixedTicker, FokusEvent, FokusEventSource, Runner, Ticker};
use crate::session::{Phase, Session};
use crate::stimulus::PlayArea;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use time_humanize::HumanTime;
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 100;

/// sustained-attention tap assessment with adaptive pacing
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A sustained-attention assessment TUI: tap the targets, ignore the distractors. \
                  Pacing adapts to your performance and every finished run can be kept in a local \
                  results history."
)]
pub struct Cli {
    /// assessment length in seconds (capped at 300)
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// seed the stimulus stream for a reproducible run
    #[clap(long)]
    seed: Option<u64>,

    /// append the result record automatically when a run finishes
    #[clap(long)]
    auto_save: bool,

    /// print past results and exit
    #[clap(long)]
    history: bool,

    /// export past results as csv to the given path and exit
    #[clap(long)]
    export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Game,
    Results,
    History,
}

#[derive(Debug)]
pub struct App {
    pub cli: Option<Cli>,
    pub config: Config,
    pub session: Session,
    pub screen: Screen,
    pub last_result: Option<SessionResult>,
    pub history: Vec<SessionResult>,
    pub status: Option<String>,
}

impl App {
    pub fn new(cli: Cli, config: Config) -> Self {
        let session = build_session(&cli);
        Self {
            cli: Some(cli),
            config,
            session,
            screen: Screen::Game,
            last_result: None,
            history: Vec::new(),
            status: None,
        }
    }

    /// Fresh session, same settings. Nothing carries over but the history.
    pub fn reset(&mut self) {
        let cli = self.cli.clone().unwrap_or_else(|| Cli::parse_from(["fokus"]));
        self.session = build_session(&cli);
        self.screen = Screen::Game;
        self.last_result = None;
        self.status = None;
    }

    fn session_cap(&self) -> Duration {
        Duration::from_secs(self.config.session_secs.min(300))
    }
}

fn build_session(cli: &Cli) -> Session {
    match cli.seed {
        Some(seed) => Session::with_seed(PlayArea::default(), seed),
        None => Session::new(PlayArea::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.history {
        return print_history();
    }
    if let Some(path) = cli.export.clone() {
        let db = ResultsDb::new()?;
        db.export_csv(&path)?;
        println!("exported results to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    if let Some(secs) = cli.secs {
        config.session_secs = secs.min(300);
    }
    if cli.auto_save {
        config.auto_save_results = true;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli, config);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen,
    )?;
    terminal.show_cursor()?;

    result
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let db = ResultsDb::new()?;
    let history = db.history()?;
    if history.is_empty() {
        println!("no past results");
        return Ok(());
    }
    for r in &history {
        println!(
            "{:<20} score {:>6}  accuracy {:>3.0}%  {} / {}",
            HumanTime::from(std::time::SystemTime::from(r.timestamp)).to_string(),
            r.score,
            r.accuracy,
            r.attention_level,
            r.risk_level,
        );
    }
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let clock = SystemClock;
    run_event_loop(terminal, app, &runner, &clock)
}

fn run_event_loop<B: Backend, E: FokusEventSource, T: Ticker, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    clock: &C,
) -> Result<(), Box<dyn Error>> {
    loop {
        let now = clock.now();
        terminal.draw(|f| draw(app, f, now))?;

        match runner.step() {
            FokusEvent::Tick => {
                let now = clock.now();
                app.session.on_tick(now);
                if app.session.is_running() && app.session.elapsed(now) >= app.session_cap() {
                    app.session.stop(now);
                }
                finalize_if_finished(app, now);
            }
            FokusEvent::Tap(column, row) => {
                let now = clock.now();
                handle_tap(app, terminal.size()?, column, row, now);
            }
            FokusEvent::Resize => {}
            FokusEvent::Key(key) => {
                if handle_key(app, key, clock.now()) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn draw(app: &mut App, f: &mut Frame, now: Instant) {
    match app.screen {
        Screen::Game => {
            let elapsed = app.session.elapsed(now).as_secs();
            ui::render_game(app, f, elapsed);
        }
        Screen::Results => ui::render_results(app, f),
        Screen::History => ui::render_history(f, &app.history, app.status.as_deref()),
    }
}

fn handle_tap(app: &mut App, size: ratatui::layout::Size, column: u16, row: u16, now: Instant) {
    if app.screen != Screen::Game {
        return;
    }
    match app.session.phase {
        Phase::NotStarted => app.session.start(now),
        Phase::Running => {
            let frame = Rect::new(0, 0, size.width, size.height);
            let inner = ui::play_area_rect(frame);
            if let Some(pos) = ui::cell_to_logical(inner, app.session.play_area(), column, row) {
                app.session.tap_at(pos, now);
            }
        }
        _ => {}
    }
}

/// Returns true when the app should exit.
fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> bool {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        return true;
    }

    match app.screen {
        Screen::Game => match key.code {
            KeyCode::Char(' ') => match app.session.phase {
                Phase::NotStarted => app.session.start(now),
                Phase::Running => app.session.pause(now),
                Phase::Paused => app.session.resume(now),
                Phase::Finished => {}
            },
            KeyCode::Char('q') => {
                app.session.stop(now);
                finalize_if_finished(app, now);
            }
            _ => {}
        },
        Screen::Results => match key.code {
            KeyCode::Char('r') => app.reset(),
            KeyCode::Char('s') => save_result(app),
            KeyCode::Char('t') => {
                if let Some(result) = &app.last_result {
                    if Browser::is_available() {
                        let text = result.summary_text().replace(' ', "%20");
                        webbrowser::open(&format!(
                            "https://twitter.com/intent/tweet?text={}",
                            text
                        ))
                        .unwrap_or_default();
                    }
                }
            }
            KeyCode::Char('h') => {
                app.history = ResultsDb::new()
                    .and_then(|db| db.history())
                    .unwrap_or_default();
                app.screen = Screen::History;
            }
            _ => {}
        },
        Screen::History => match key.code {
            KeyCode::Char('b') | KeyCode::Backspace => {
                app.screen = if app.last_result.is_some() {
                    Screen::Results
                } else {
                    Screen::Game
                };
            }
            _ => {}
        },
    }
    false
}

fn finalize_if_finished(app: &mut App, now: Instant) {
    if app.session.phase != Phase::Finished || app.screen != Screen::Game {
        return;
    }
    let result = SessionResult::from_session(&app.session, app.session.elapsed(now));
    app.last_result = Some(result);
    app.screen = Screen::Results;
    if app.config.auto_save_results {
        save_result(app);
    }
}

/// Persistence failure is recoverable: the session and its metrics stay
/// intact, the user just sees the error in the status line.
fn save_result(app: &mut App) {
    let Some(result) = &app.last_result else {
        return;
    };
    app.status = Some(match ResultsDb::new().and_then(|db| db.append(result)) {
        Ok(()) => "result saved".to_string(),
        Err(e) => format!("save failed: {}", e),
    });
}
