//! NBACKTRIS - headless line driver
//!
//! Reads one command per line from stdin and prints the resulting board.
//! The engine keeps ticking in the background between commands.

use nbacktris::{
    Cell, GameSession, GameState, RotationDirection, SessionHandle, SessionSnapshot, Settings,
};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  start | pause | resume | reset | quit
  a / left      d / right      s / down     space / drop
  w / cw        q / ccw
  m / match     n / nomatch
  level+ | level- | time+ | time-   (before a game)
  show | state | help";

/// A parsed line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Start,
    Pause,
    Resume,
    Reset,
    Quit,
    Left,
    Right,
    Down,
    Drop,
    Rotate(RotationDirection),
    Match,
    NoMatch,
    LevelUp,
    LevelDown,
    TimeUp,
    TimeDown,
    Show,
    State,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim().to_lowercase().as_str() {
        "start" => Input::Start,
        "pause" | "p" => Input::Pause,
        "resume" => Input::Resume,
        "reset" => Input::Reset,
        "quit" | "exit" => Input::Quit,
        "a" | "left" => Input::Left,
        "d" | "right" => Input::Right,
        "s" | "down" => Input::Down,
        "space" | "drop" => Input::Drop,
        "w" | "cw" => Input::Rotate(RotationDirection::Clockwise),
        "q" | "ccw" => Input::Rotate(RotationDirection::CounterClockwise),
        "m" | "match" => Input::Match,
        "n" | "nomatch" => Input::NoMatch,
        "level+" => Input::LevelUp,
        "level-" => Input::LevelDown,
        "time+" => Input::TimeUp,
        "time-" => Input::TimeDown,
        "" | "show" => Input::Show,
        "state" => Input::State,
        "help" | "?" => Input::Help,
        _ => return None,
    };
    Some(input)
}

/// Board plus a status block, one character per cell.
/// Empty cells under the landing spot show as `:`.
fn render(snapshot: &SessionSnapshot) -> String {
    let mut grid: Vec<Vec<char>> = snapshot
        .board
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    Cell::Filled(kind) => char::from(b'0' + kind.id()),
                })
                .collect()
        })
        .collect();

    if let (Some(active), Some(landing)) = (snapshot.current, snapshot.landing) {
        for (dr, dc) in active.tetromino.occupied() {
            let (Ok(row), Ok(col)) = (
                usize::try_from(landing.row + dr),
                usize::try_from(landing.col + dc),
            ) else {
                continue;
            };
            if let Some(slot) = grid.get_mut(row).and_then(|cells| cells.get_mut(col)) {
                if *slot == '.' {
                    *slot = ':';
                }
            }
        }
    }

    let mut out = String::new();
    for row in grid {
        out.push('|');
        out.extend(row);
        out.push_str("|\n");
    }

    let next = snapshot
        .next
        .map(|piece| format!("{:?}", piece.kind()))
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!(
        "{:?} | score {} | {}-back streak {} ({}) | time {}{} | next {}\n",
        snapshot.state,
        snapshot.score,
        snapshot.n_back_level,
        snapshot.streak,
        snapshot.multiplier_text,
        snapshot.time_remaining_text,
        if snapshot.time_running_low { "!" } else { "" },
        next,
    ));
    if let Some(judgment) = snapshot.last_judgment {
        out.push_str(&format!(
            "last call: {:?} was {}\n",
            judgment.declaration,
            if judgment.correct { "right" } else { "wrong" }
        ));
    }
    out
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    // Log to a file so stdout stays clean for the driver
    let log_dir = std::env::temp_dir().join("nbacktris");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = format!("{:08x}.log", session_id);

    // Read the file now for the log filter; report problems once logging is up
    let loaded = Settings::load();
    let filter = match &loaded {
        Ok(settings) => settings.logging.filter.clone(),
        Err(_) => Settings::default().logging.filter,
    };

    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nbacktris=debug")),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        "NBACKTRIS starting up, session={:08x}, log={}",
        session_id,
        log_dir.join(&log_file).display()
    );

    let mut settings = loaded.unwrap_or_else(|e| {
        tracing::warn!("{}; using defaults", e);
        Settings::default()
    });

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create async runtime");
    let last = runtime.block_on(run(&settings))?;

    // Keep the difficulty the player settled on
    settings.remember(last.n_back_level, Duration::from_secs(last.game_duration_secs));
    if let Err(e) = settings.save() {
        eprintln!("Warning: Could not save settings: {}", e);
    }

    println!("Final score: {} | lines: {} | best streak: {}", last.score, last.lines, last.best_streak);
    Ok(())
}

/// Drive a session from stdin until `quit` or end of input
async fn run(settings: &Settings) -> io::Result<SessionSnapshot> {
    let session = GameSession::new(settings.session_config());
    let (handle, task) = SessionHandle::spawn(session);
    let closed = |_| io::Error::new(io::ErrorKind::BrokenPipe, "game session stopped");

    // Announce game over even if it happens between commands
    let mut updates = handle.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last_state = updates.borrow().state;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.state == GameState::GameOver && last_state != GameState::GameOver {
                println!("\nGAME OVER\n{}", render(&snapshot));
            }
            last_state = snapshot.state;
        }
    });

    println!("{}", HELP);
    println!("{}", render(&handle.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_input(&line) else {
            println!("unknown command {:?}, try `help`", line.trim());
            continue;
        };

        match input {
            Input::Start => handle.start().map_err(closed)?,
            Input::Pause => handle.pause().map_err(closed)?,
            Input::Resume => handle.resume().map_err(closed)?,
            Input::Reset => handle.reset().map_err(closed)?,
            Input::Quit => break,
            Input::Left => handle.move_left().map_err(closed)?,
            Input::Right => handle.move_right().map_err(closed)?,
            Input::Down => {
                handle.soft_drop().await.map_err(closed)?;
            }
            Input::Drop => handle.hard_drop().map_err(closed)?,
            Input::Rotate(direction) => handle.rotate(direction).map_err(closed)?,
            Input::Match => {
                handle.declare_match().await.map_err(closed)?;
            }
            Input::NoMatch => {
                handle.declare_no_match().await.map_err(closed)?;
            }
            Input::LevelUp => handle.increase_n_back_level().map_err(closed)?,
            Input::LevelDown => handle.decrease_n_back_level().map_err(closed)?,
            Input::TimeUp => handle.increase_game_duration().map_err(closed)?,
            Input::TimeDown => handle.decrease_game_duration().map_err(closed)?,
            Input::Show => {}
            Input::State => {
                let json = serde_json::to_string_pretty(&handle.snapshot())
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                println!("{}", json);
                continue;
            }
            Input::Help => {
                println!("{}", HELP);
                continue;
            }
        }

        handle.flush().await.map_err(closed)?;
        println!("{}", render(&handle.snapshot()));
    }

    let last = handle.snapshot();
    let _ = handle.shutdown();
    let _ = task.await;
    watcher.abort();
    Ok(last)
}
