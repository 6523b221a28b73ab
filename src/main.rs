/// Entry point and frame loop.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mnemocodex::config::GameConfig;
use mnemocodex::domain::anomaly::AnomalyEffects;
use mnemocodex::domain::clock::SystemClock;
use mnemocodex::sim::event::GameEvent;
use mnemocodex::sim::session::Session;
use mnemocodex::ui::input::{Command, InputState};
use mnemocodex::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(10);
/// The terminal is owned by the renderer, so logs go to this file in the temp dir.
const LOG_FILE: &str = "mnemocodex.log";
/// How often the noise distraction is re-rolled.
const EFFECT_REFRESH: Duration = Duration::from_millis(500);

fn main() {
    let appender = tracing_appender::rolling::never(std::env::temp_dir(), LOG_FILE);
    let (log_writer, _log_guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(log_writer)
        .with_ansi(false)
        .init();

    let config = GameConfig::load();
    let mut session = Session::new(&config, Rc::new(SystemClock::new()));

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut session, &mut renderer);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    let stats = session.puzzles().stats();
    println!();
    println!("Thanks for playing Mnemonic Codex!");
    println!(
        "Reached level {}, solved {} puzzles, score {}",
        session.level(),
        stats.puzzles_completed,
        stats.total_score
    );
}

fn game_loop(session: &mut Session, renderer: &mut Renderer) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut last_frame = Instant::now();
    let mut effects = AnomalyEffects::default();
    let mut last_effects: Option<Instant> = None;

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }

        let kind = session.current_puzzle().map(|p| p.kind());
        for command in kb.commands(session.phase(), kind) {
            if command == Command::Quit {
                return Ok(());
            }
            apply(session, command);
        }

        let now = Instant::now();
        session.update(now.duration_since(last_frame).as_secs_f64());
        last_frame = now;

        log_events(&session.take_events());

        if last_effects.map_or(true, |t| t.elapsed() >= EFFECT_REFRESH) {
            effects = session.anomaly_effects();
            last_effects = Some(Instant::now());
        }

        renderer.render(session, &effects)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn apply(session: &mut Session, command: Command) {
    match command {
        Command::SelectNext => {
            session.select_next();
        }
        Command::SelectPrevious => {
            session.select_previous();
        }
        Command::Start => {
            if let Err(e) = session.start_selected() {
                warn!(error = %e, "could not start node");
            }
        }
        Command::TogglePause => session.toggle_pause(),
        Command::Hint => {
            session.request_hint();
        }
        Command::Ability(kind) => {
            session.use_ability(kind);
        }
        Command::Puzzle(input) => {
            if let Err(e) = session.input(input) {
                warn!(error = %e, "puzzle input rejected");
            }
        }
        Command::DismissStory => session.dismiss_story(),
        Command::NextLevel => {
            session.advance_level();
        }
        Command::Quit => {}
    }
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::MapCompleted { level } => info!(level, "map restored"),
            GameEvent::PuzzleFailed { kind } => info!(%kind, "puzzle timed out"),
            other => debug!(?other, "event"),
        }
    }
}
