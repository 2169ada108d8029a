//! Async driver for one [`Session`].
//!
//! Input, world notices, shutdown and the render interval are multiplexed on
//! one task, so the session itself never needs a lock.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::Event;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::adapter::{GameStateHandle, VisiblePlayers, WorldEvent};
use crate::predict::PredictionStats;
use crate::session::{ActionOutcome, Session};
use crate::term::{RenderMode, TerminalRenderer};
use crate::types::{PlayerId, DEFAULT_TILE_PX};

/// Render interval for the current zoom and mode.
///
/// Work per frame grows with the pixels each cell has to summarize, so large
/// tiles in dense modes tick slower, up to four times the base interval.
pub fn adaptive_interval(base: Duration, tile_px: u16, mode: RenderMode) -> Duration {
    let (cw, ch) = mode.cell_pixels();
    let cells_per_tile = (tile_px as f64 * tile_px as f64) / (cw as f64 * ch as f64);
    let reference = (DEFAULT_TILE_PX as f64 * DEFAULT_TILE_PX as f64) / 2.0;
    let factor = (cells_per_tile / reference).clamp(1.0, 4.0);
    Duration::from_nanos((base.as_nanos() as f64 * factor).round() as u64)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSummary {
    pub frames: u64,
    pub bytes: u64,
    pub full_redraws: u64,
    pub predictions: PredictionStats,
}

/// Drive `session` until quit, input EOF or `shutdown` flips to `true`.
pub async fn run_session<W: Write>(
    mut session: Session,
    handle: GameStateHandle,
    mut input: mpsc::Receiver<Event>,
    mut events: broadcast::Receiver<WorldEvent>,
    mut shutdown: watch::Receiver<bool>,
    out: W,
) -> Result<SessionSummary> {
    let mut term = TerminalRenderer::new(out);
    term.enter()?;

    let me = session.local_player();
    if let Err(err) = handle.join(me.clone()) {
        tracing::warn!(%err, "join failed");
    }
    if let Some(sprite) = session.default_sprite() {
        if let Err(err) = handle.upload_sprite(&me.id, sprite) {
            tracing::warn!(%err, "sprite upload failed");
        }
    }

    let mut period = adaptive_interval(session.config().tick, session.tile_px(), session.encoder().mode());
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut visible = VisiblePlayers::new();
    let mut summary = SessionSummary::default();
    let mut buf = Vec::with_capacity(64 * 1024);
    let mut events_open = true;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            event = input.recv() => {
                let Some(event) = event else { break };
                match event {
                    Event::Key(key) => match session.handle_key(key) {
                        ActionOutcome::Quit => break,
                        ActionOutcome::Moved(state) => {
                            if let Err(err) = handle.submit_move(&state.id, state.direction) {
                                tracing::warn!(%err, "move not delivered");
                            }
                        }
                        ActionOutcome::Continue => {}
                    },
                    Event::Resize(cols, rows) => session.set_screen(cols, rows),
                    _ => {}
                }
                let next = adaptive_interval(session.config().tick, session.tile_px(), session.encoder().mode());
                if next != period {
                    period = next;
                    ticker = time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    tracing::debug!(?period, "render interval");
                }
            }

            event = events.recv(), if events_open => match event {
                Ok(event) => {
                    if let Some(id) = session.handle_world_event(event, Instant::now().into_std()) {
                        fetch_sprite(&mut session, &handle, id).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "world events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => events_open = false,
            },

            _ = ticker.tick() => {
                let me = session.local_player();
                let radius = session.visible_radius();
                let players = visible.refresh(&handle, (me.x, me.y), radius).await.to_vec();
                for id in session.sync_players(&players) {
                    fetch_sprite(&mut session, &handle, id).await;
                }

                buf.clear();
                let report = session.render_tick(Instant::now().into_std(), &mut buf)?;
                if *shutdown.borrow() {
                    break;
                }
                if !buf.is_empty() {
                    term.write_bytes(&buf)?;
                }
                summary.bytes += report.bytes as u64;
            }
        }
    }

    if let Err(err) = handle.leave(&session.config().player_id) {
        tracing::debug!(%err, "leave not delivered");
    }
    term.exit()?;

    summary.frames = session.frames();
    summary.full_redraws = session.encoder().full_redraws();
    summary.predictions = session.predictions().stats();
    tracing::info!(
        frames = summary.frames,
        bytes = summary.bytes,
        hits = summary.predictions.hits,
        misses = summary.predictions.misses,
        hit_rate = summary.predictions.hit_rate(),
        "session finished"
    );
    Ok(summary)
}

async fn fetch_sprite(session: &mut Session, handle: &GameStateHandle, id: PlayerId) {
    match handle.sprite(&id).await {
        Ok(Some(sprite)) => session.set_player_sprite(id, sprite),
        Ok(None) => {
            if let Some(sprite) = session.default_sprite() {
                session.set_player_sprite(id, sprite);
            }
        }
        Err(err) => tracing::warn!(%err, player = %id, "sprite fetch failed"),
    }
}
