//! Single-player demo (default binary).
//!
//! Runs one session against an in-process game service populated with a few
//! wandering NPCs. Logs go to a file so they never land on the alternate
//! screen.

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::terminal;
use tokio::sync::{mpsc, watch};

use termworld::adapter::{GameStateHandle, LocalGameService};
use termworld::core::SimpleRng;
use termworld::engine::{run_session, Session, SessionConfig};
use termworld::types::{Direction, PlayerVisualState};

const NPC_NAMES: [&str; 4] = ["Ada", "Bram", "Cleo", "Dov"];
const NPC_STEP: Duration = Duration::from_millis(400);
const INPUT_QUEUE: usize = 64;

fn init_logging() -> Result<()> {
    let path = std::env::var("TERMWORLD_LOG_PATH").unwrap_or_else(|_| "termworld.log".to_string());
    let file = File::create(&path).with_context(|| format!("creating log file {path}"))?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("termworld=info,termworld_engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = SessionConfig::from_env();
    let seed = config.seed;
    let timeout = config.query_timeout;
    let mut session = Session::new(config)?;
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    session.set_screen(cols, rows);

    let me = session.local_player();
    let mut service = LocalGameService::new();
    for (i, name) in NPC_NAMES.iter().enumerate() {
        let offset = i as i32 + 2;
        service = service.with_player(PlayerVisualState::new(
            name.to_lowercase(),
            *name,
            me.x + if i % 2 == 0 { offset } else { -offset },
            me.y + if i < 2 { 1 } else { -1 },
        ));
    }
    let events = service.subscribe();
    let (handle, service_task) = service.spawn(timeout);
    let npc_task = tokio::spawn(wander(handle.clone(), seed));

    let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
    std::thread::spawn(move || read_terminal_events(input_tx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    terminal::enable_raw_mode()?;
    let result = run_session(session, handle, input_rx, events, shutdown_rx, io::stdout()).await;
    // Always try to restore terminal state.
    let _ = terminal::disable_raw_mode();

    npc_task.abort();
    service_task.abort();
    let summary = result?;
    tracing::info!(?summary, "bye");
    Ok(())
}

/// Blocking crossterm reader feeding the session's input queue.
fn read_terminal_events(tx: mpsc::Sender<Event>) {
    loop {
        match event::read() {
            Ok(ev @ (Event::Key(_) | Event::Resize(_, _))) => {
                if tx.blocking_send(ev).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "terminal input closed");
                return;
            }
        }
    }
}

async fn wander(handle: GameStateHandle, seed: u64) {
    let mut rng = SimpleRng::from_world_seed(seed);
    let mut ticker = tokio::time::interval(NPC_STEP);
    loop {
        ticker.tick().await;
        for name in NPC_NAMES {
            let direction = Direction::ALL[rng.next_range(Direction::ALL.len() as u32) as usize];
            if handle.submit_move(&name.to_lowercase(), direction).is_err() && handle.is_closed() {
                return;
            }
        }
    }
}
