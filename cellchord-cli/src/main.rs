mod config;
mod view;

use std::fs::File;
use std::io::{self, Write};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

use cellchord_audio::dsp::{AudioOutput, DspGraph, WavRenderer};
use cellchord_audio::{AudioGraph, Conductor, NullGraph};
use cellchord_types::{
    Action, Dimension, EnginePhase, GridAction, PlaybackAction, SessionState, TransportAction,
};

use config::Config;

fn init_logging(verbose: bool) {
    use simplelog::{Config as LogConfig, LevelFilter, WriteLogger};

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("cellchord")
        .join("cellchord.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path)
        .unwrap_or_else(|_| File::create("/tmp/cellchord.log").expect("Cannot create log file"));

    WriteLogger::init(log_level, LogConfig::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("cellchord starting (log level: {:?})", log_level);
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = Config::load();
    let seed = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1)
        });
    let session = config.session(seed);
    let generations: u64 = arg_value(&args, "--generations")
        .and_then(|s| s.parse().ok())
        .unwrap_or(32);

    if let Some(path) = arg_value(&args, "--wav") {
        return render_wav(&path, session, generations, config.wav_sample_rate())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    }
    if args.iter().any(|a| a == "--headless") {
        return run_headless(session, generations).map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    }
    run_interactive(session)
}

/// Render `generations` generations straight to a WAV file, with the
/// sample counter as the only clock.
fn render_wav(
    path: &str,
    session: SessionState,
    generations: u64,
    sample_rate: u32,
) -> Result<(), cellchord_audio::GraphError> {
    let graph = DspGraph::new(sample_rate as f64);
    let mut renderer = WavRenderer::create(path, graph.clone())?;
    let mut conductor = Conductor::new(session);

    conductor.apply(&graph, &Action::Transport(TransportAction::Start))?;
    while conductor.session().generation < generations {
        let now = graph.now();
        let due = conductor.next_due().unwrap_or(now + 0.05);
        if due > now {
            renderer.advance(due - now)?;
        }
        conductor.tick(&graph)?;
    }
    conductor.apply(&graph, &Action::Transport(TransportAction::Stop))?;

    // Let fades and deferred teardowns play out before closing the file.
    let tail_end = graph.now() + 0.5;
    while graph.now() < tail_end {
        renderer.advance(0.1)?;
        conductor.tick(&graph)?;
    }
    renderer.finalize()?;
    log::info!("rendered {} generations to {}", generations, path);
    Ok(())
}

/// Tick the automaton against the wall clock with no audio output.
fn run_headless(
    session: SessionState,
    generations: u64,
) -> Result<(), cellchord_audio::GraphError> {
    let graph = NullGraph::new();
    let mut conductor = Conductor::new(session);
    conductor.apply(&graph, &Action::Transport(TransportAction::Start))?;

    while conductor.session().generation < generations {
        let now = graph.now();
        match conductor.next_due() {
            Some(due) if due > now => {
                std::thread::sleep(Duration::from_secs_f64((due - now).min(0.1)))
            }
            Some(_) => {}
            None => std::thread::sleep(Duration::from_millis(50)),
        }
        conductor.tick(&graph)?;
    }
    println!(
        "ran {} generations, {} cells live",
        conductor.session().generation,
        conductor.session().grid.alive_count()
    );
    Ok(())
}

fn key_to_action(key: KeyEvent, session: &SessionState) -> Option<Action> {
    match key.code {
        KeyCode::Char(' ') => Some(if session.phase == EnginePhase::Running {
            Action::Transport(TransportAction::Stop)
        } else {
            Action::Transport(TransportAction::Start)
        }),
        KeyCode::Char('s') => Some(Action::Transport(TransportAction::Step)),
        KeyCode::Char('r') => Some(Action::Transport(TransportAction::Reset)),
        KeyCode::Char('a') => Some(Action::Playback(PlaybackAction::CycleArpMode)),
        KeyCode::Char(c @ '1'..='4') => {
            let dimension = Dimension::from_axis_count(c as usize - '0' as usize)?;
            Some(Action::Grid(GridAction::SetDimension(dimension)))
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            Some(Action::Grid(GridAction::SetSize(session.grid_size() + 1)))
        }
        KeyCode::Char('-') => Some(Action::Grid(GridAction::SetSize(
            session.grid_size().saturating_sub(1),
        ))),
        KeyCode::Char('[') => Some(Action::Playback(PlaybackAction::SetGenerationMs(
            session.generation_ms.saturating_sub(100),
        ))),
        KeyCode::Char(']') => Some(Action::Playback(PlaybackAction::SetGenerationMs(
            session.generation_ms + 100,
        ))),
        _ => None,
    }
}

/// Read terminal events on a dedicated thread and hand them to the UI loop
/// over a channel, so the loop can sleep on its audio deadlines instead.
fn spawn_input_thread() -> Receiver<Event> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::error!("input read: {}", e);
                return;
            }
        }
    });
    rx
}

fn run_interactive(session: SessionState) -> io::Result<()> {
    // Prefer the real device; fall back to a silent graph so the automaton
    // still runs on machines with no audio output.
    let (_output, graph): (Option<AudioOutput>, Box<dyn AudioGraph>) = match AudioOutput::start() {
        Ok((output, graph)) => (Some(output), Box::new(graph)),
        Err(e) => {
            log::warn!("audio output unavailable ({}); running silent", e);
            (None, Box::new(NullGraph::new()))
        }
    };
    let mut conductor = Conductor::new(session);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    let events = spawn_input_thread();
    let result = ui_loop(&mut stdout, &mut conductor, graph.as_ref(), &events);
    execute!(stdout, LeaveAlternateScreen, Show)?;
    disable_raw_mode()?;
    result
}

fn ui_loop(
    stdout: &mut impl Write,
    conductor: &mut Conductor,
    graph: &dyn AudioGraph,
    events: &Receiver<Event>,
) -> io::Result<()> {
    let mut dirty = true;
    let mut last_generation = conductor.session().generation;
    let mut last_phase = conductor.session().phase;

    loop {
        if dirty {
            view::draw(stdout, conductor.session())?;
            dirty = false;
        }

        let timeout = conductor
            .next_due()
            .map(|due| (due - graph.now()).max(0.0))
            .unwrap_or(0.05)
            .min(0.05);
        match events.recv_timeout(Duration::from_secs_f64(timeout)) {
            Ok(Event::Key(key)) => {
                let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL));
                if quit {
                    let _ = conductor.apply(graph, &Action::Transport(TransportAction::Stop));
                    return Ok(());
                }
                if let Some(action) = key_to_action(key, conductor.session()) {
                    match conductor.apply(graph, &action) {
                        Ok(changed) => dirty = dirty || changed,
                        Err(e) => log::error!("apply {:?}: {}", action, e),
                    }
                }
            }
            Ok(Event::Resize(..)) => dirty = true,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                let _ = conductor.apply(graph, &Action::Transport(TransportAction::Stop));
                return Ok(());
            }
        }

        if let Err(e) = conductor.tick(graph) {
            log::error!("tick: {}", e);
        }
        let session = conductor.session();
        if session.generation != last_generation || session.phase != last_phase {
            last_generation = session.generation;
            last_phase = session.phase;
            dirty = true;
        }
    }
}
