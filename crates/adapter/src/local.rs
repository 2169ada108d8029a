//! In-process game-state service.
//!
//! Stands in for the authoritative server in the demo binary and in tests.
//! It applies moves without any game rules beyond the face-then-step rule.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::protocol::{apply_move, GameRequest, WorldEvent};
use crate::runtime::GameStateHandle;
use crate::types::{PlayerId, PlayerVisualState, Sprite};

const REQUEST_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 64;

#[derive(Debug)]
pub struct LocalGameService {
    players: BTreeMap<PlayerId, PlayerVisualState>,
    sprites: HashMap<PlayerId, Arc<Sprite>>,
    events: broadcast::Sender<WorldEvent>,
}

impl Default for LocalGameService {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGameService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_QUEUE);
        Self {
            players: BTreeMap::new(),
            sprites: HashMap::new(),
            events,
        }
    }

    pub fn with_player(mut self, state: PlayerVisualState) -> Self {
        self.players.insert(state.id.clone(), state);
        self
    }

    pub fn player(&self, id: &str) -> Option<&PlayerVisualState> {
        self.players.get(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.events.subscribe()
    }

    /// Sender for pushing events (e.g. reload notices) from outside.
    pub fn events(&self) -> broadcast::Sender<WorldEvent> {
        self.events.clone()
    }

    pub fn handle(&mut self, req: GameRequest) {
        tracing::trace!(request = req.name(), "game request");
        match req {
            GameRequest::VisiblePlayers { center, radius, reply } => {
                let visible = self
                    .players
                    .values()
                    .filter(|p| (p.x - center.0).abs().max((p.y - center.1).abs()) <= radius)
                    .cloned()
                    .collect();
                let _ = reply.send(visible);
            }
            GameRequest::Move { player_id, direction } => {
                if let Some(p) = self.players.get_mut(&player_id) {
                    apply_move(p, direction, |_, _| true);
                }
            }
            GameRequest::Sprite { player_id, reply } => {
                let _ = reply.send(self.sprites.get(&player_id).cloned());
            }
            GameRequest::Join { state } => {
                self.players.insert(state.id.clone(), state);
            }
            GameRequest::Leave { player_id } => {
                if self.players.remove(&player_id).is_some() {
                    self.sprites.remove(&player_id);
                    let _ = self.events.send(WorldEvent::PlayerLeft { player_id });
                }
            }
            GameRequest::UploadSprite { player_id, sprite } => {
                self.sprites.insert(player_id.clone(), sprite);
                let _ = self.events.send(WorldEvent::SpriteUpdated { player_id });
            }
        }
    }

    /// Run the service on the current tokio runtime. It stops once every
    /// handle has been dropped.
    pub fn spawn(mut self, timeout: Duration) -> (GameStateHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(REQUEST_QUEUE);
        let task = tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                self.handle(req);
            }
            tracing::debug!("game service stopped");
        });
        (GameStateHandle::new(tx, timeout), task)
    }
}
