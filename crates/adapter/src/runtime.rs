//! Session-side handle to the game-state service.
//!
//! Every call is bounded by the handle's timeout so a slow service can never
//! stall a render tick.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::GameRequest;
use crate::types::{Direction, PlayerVisualState, Sprite};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("game service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("game service is gone")]
    Disconnected,
    #[error("game service is busy")]
    Busy,
}

#[derive(Debug, Clone)]
pub struct GameStateHandle {
    tx: mpsc::Sender<GameRequest>,
    timeout: Duration,
}

impl GameStateHandle {
    pub fn new(tx: mpsc::Sender<GameRequest>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> GameRequest) -> Result<T, AdapterError> {
        let (reply, rx) = oneshot::channel();
        let req = make(reply);
        let call = async {
            self.tx.send(req).await.map_err(|_| AdapterError::Disconnected)?;
            rx.await.map_err(|_| AdapterError::Disconnected)
        };
        match tokio::time::timeout(self.timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(AdapterError::Timeout(self.timeout)),
        }
    }

    pub async fn visible_players(&self, center: (i32, i32), radius: i32) -> Result<Vec<PlayerVisualState>, AdapterError> {
        self.request(|reply| GameRequest::VisiblePlayers { center, radius, reply }).await
    }

    pub async fn sprite(&self, player_id: &str) -> Result<Option<Arc<Sprite>>, AdapterError> {
        let player_id = player_id.to_string();
        self.request(|reply| GameRequest::Sprite { player_id, reply }).await
    }

    /// Fire-and-forget; never waits on a full queue.
    pub fn submit_move(&self, player_id: &str, direction: Direction) -> Result<(), AdapterError> {
        self.try_send(GameRequest::Move {
            player_id: player_id.to_string(),
            direction,
        })
    }

    pub fn join(&self, state: PlayerVisualState) -> Result<(), AdapterError> {
        self.try_send(GameRequest::Join { state })
    }

    pub fn leave(&self, player_id: &str) -> Result<(), AdapterError> {
        self.try_send(GameRequest::Leave {
            player_id: player_id.to_string(),
        })
    }

    pub fn upload_sprite(&self, player_id: &str, sprite: Arc<Sprite>) -> Result<(), AdapterError> {
        self.try_send(GameRequest::UploadSprite {
            player_id: player_id.to_string(),
            sprite,
        })
    }

    fn try_send(&self, req: GameRequest) -> Result<(), AdapterError> {
        self.tx.try_send(req).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AdapterError::Busy,
            mpsc::error::TrySendError::Closed(_) => AdapterError::Disconnected,
        })
    }
}

/// Last successful visible-players answer, served when a query fails.
#[derive(Debug, Default, Clone)]
pub struct VisiblePlayers {
    last: Vec<PlayerVisualState>,
    failures: u64,
}

impl VisiblePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> &[PlayerVisualState] {
        &self.last
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Take a fresh answer, or fall back to the last known one on error.
    pub fn resolve(&mut self, result: Result<Vec<PlayerVisualState>, AdapterError>) -> &[PlayerVisualState] {
        match result {
            Ok(players) => self.last = players,
            Err(err) => {
                self.failures += 1;
                tracing::warn!(%err, kept = self.last.len(), "visible players query failed, using last known");
            }
        }
        &self.last
    }

    pub async fn refresh(&mut self, handle: &GameStateHandle, center: (i32, i32), radius: i32) -> &[PlayerVisualState] {
        let result = handle.visible_players(center, radius).await;
        self.resolve(result)
    }
}
