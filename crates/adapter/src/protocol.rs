//! Messages exchanged with the authoritative game-state service.
//!
//! Requests carry their own `oneshot` reply channel; world-wide
//! notifications fan out over a `broadcast` channel.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::types::{Direction, PlayerId, PlayerVisualState, Sprite};

#[derive(Debug)]
pub enum GameRequest {
    /// Players within `radius` tiles (Chebyshev distance) of `center`.
    VisiblePlayers {
        center: (i32, i32),
        radius: i32,
        reply: oneshot::Sender<Vec<PlayerVisualState>>,
    },
    Move {
        player_id: PlayerId,
        direction: Direction,
    },
    Sprite {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<Arc<Sprite>>>,
    },
    Join {
        state: PlayerVisualState,
    },
    Leave {
        player_id: PlayerId,
    },
    UploadSprite {
        player_id: PlayerId,
        sprite: Arc<Sprite>,
    },
}

impl GameRequest {
    pub fn name(&self) -> &'static str {
        match self {
            GameRequest::VisiblePlayers { .. } => "visible_players",
            GameRequest::Move { .. } => "move",
            GameRequest::Sprite { .. } => "sprite",
            GameRequest::Join { .. } => "join",
            GameRequest::Leave { .. } => "leave",
            GameRequest::UploadSprite { .. } => "upload_sprite",
        }
    }
}

/// Notifications every session receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    ReloadStarted,
    ReloadFinished,
    SpriteUpdated { player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
}

/// Outcome of a move under the face-then-step rule: a move along the current
/// facing steps forward (when `walkable` allows), any other direction only
/// turns in place.
pub fn apply_move(state: &mut PlayerVisualState, direction: Direction, walkable: impl FnOnce(i32, i32) -> bool) {
    if state.direction != direction {
        state.direction = direction;
        state.moving = false;
        return;
    }
    let (nx, ny) = state.ahead();
    if walkable(nx, ny) {
        state.x = nx;
        state.y = ny;
        state.frame = state.frame.wrapping_add(1);
        state.moving = true;
    } else {
        state.moving = false;
    }
}
