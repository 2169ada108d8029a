//! One player's rendering session.
//!
//! A [`Session`] owns everything its pipeline touches: the world, the
//! compositor with its caches, the encoder baseline, the prediction cache and
//! the overlay stack. Sessions share nothing, so none of this is locked.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{KeyEvent, KeyEventKind};

use crate::adapter::{apply_move, WorldEvent};
use crate::config::SessionConfig;
use crate::core::{builtin_content, ContentPack, Fnv1aHasher, World, WorldConfig, WorldData, DEFAULT_SPRITE_ID};
use crate::input::{handle_key_event, should_quit};
use crate::predict::PredictionCache;
use crate::term::{
    quantize, Camera, ComponentKind, FrameEncoder, HelpModal, OverlayKind,
    OverlayStack, PlayerList, RenderThrottle, ViewportCompositor, ViewportSize,
};
use crate::types::{
    InputAction, PlayerId, PlayerVisualState, Sprite, ANIMATION_TICKS_PER_FRAME, BRIGHTNESS_LEVELS,
    MAX_TILE_PX, MAX_VIEW_TILES, MIN_TILE_PX,
};

const ZOOM_STEP: u16 = 2;
const SPAWN_SEARCH_RADIUS: i32 = 64;
const BANNER_TTL: Duration = Duration::from_secs(2);

/// What the caller should do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Continue,
    /// The local player moved or turned; forward to the game service.
    Moved(PlayerVisualState),
    Quit,
}

/// What one render tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub bytes: usize,
    pub composed: bool,
    pub full: bool,
    pub predicted: bool,
    pub overlays: bool,
}

pub struct Session {
    config: SessionConfig,
    world: World,
    compositor: ViewportCompositor,
    encoder: FrameEncoder,
    predictions: PredictionCache,
    overlays: OverlayStack,
    throttle: RenderThrottle,
    default_sprite: Option<Arc<Sprite>>,
    tile_px: u16,
    screen: Option<(u16, u16)>,
    tick: u64,
    frames: u64,
    moved: bool,
    /// The last composed picture contained animated tiles.
    animated: bool,
    started: Instant,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let mut pack = builtin_content(&config.resolutions);
        if let Some(path) = &config.content_path {
            let extra = ContentPack::from_path(path)
                .with_context(|| format!("loading content pack {}", path.display()))?;
            pack.merge(extra);
        }
        Ok(Self::with_content(config, &pack))
    }

    pub fn with_content(mut config: SessionConfig, pack: &ContentPack) -> Self {
        config.view_tiles_w = config.view_tiles_w.clamp(1, MAX_VIEW_TILES);
        config.view_tiles_h = config.view_tiles_h.clamp(1, MAX_VIEW_TILES);
        let mut world = World::new(
            WorldConfig {
                chunk_capacity: config.chunk_capacity,
                ..WorldConfig::with_seed(config.seed)
            },
            config.player_id.clone(),
        );
        world.install(pack);

        let (x, y) = spawn_point(&mut world);
        world.update_player(PlayerVisualState::new(
            config.player_id.clone(),
            config.player_name.clone(),
            x,
            y,
        ));
        let default_sprite = pack.sprites.get(DEFAULT_SPRITE_ID).cloned().map(Arc::new);
        if let Some(sprite) = &default_sprite {
            world.set_player_sprite(config.player_id.clone(), Arc::clone(sprite));
        }

        let mut compositor = ViewportCompositor::new(
            config.resolutions.clone(),
            config.scale_capacity,
            config.brightness_capacity,
        );
        compositor.set_brightness(config.brightness);

        let tile_px = config.tile_px.clamp(MIN_TILE_PX, MAX_TILE_PX);
        let (cols, rows) = config
            .render_mode
            .frame_size(
                config.view_tiles_w.saturating_mul(tile_px),
                config.view_tiles_h.saturating_mul(tile_px),
            );
        tracing::info!(seed = config.seed, player = %config.player_id, x, y, "session started");

        Self {
            encoder: FrameEncoder::new(config.render_mode, config.background),
            predictions: PredictionCache::new(config.prediction),
            overlays: OverlayStack::new(cols, rows),
            throttle: RenderThrottle::new(config.static_refresh.as_millis() as u64),
            tile_px,
            compositor,
            world,
            default_sprite,
            screen: None,
            tick: 0,
            frames: 0,
            moved: false,
            animated: true,
            started: Instant::now(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    pub fn predictions(&self) -> &PredictionCache {
        &self.predictions
    }

    pub fn overlays(&self) -> &OverlayStack {
        &self.overlays
    }

    pub fn compositor(&self) -> &ViewportCompositor {
        &self.compositor
    }

    pub fn tile_px(&self) -> u16 {
        self.tile_px
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn local_player(&self) -> PlayerVisualState {
        self.world
            .local_player()
            .cloned()
            .unwrap_or_else(|| PlayerVisualState::new(self.config.player_id.clone(), self.config.player_name.clone(), 0, 0))
    }

    /// Visible area in tiles, fitted to the terminal when its size is known.
    pub fn viewport(&self) -> ViewportSize {
        let (mut w, mut h) = (self.config.view_tiles_w, self.config.view_tiles_h);
        if let Some((cols, rows)) = self.screen {
            let (pw, ph) = self.encoder.mode().pixel_size(cols, rows);
            w = w.min(pw / self.tile_px).max(1);
            h = h.min(ph / self.tile_px).max(1);
        }
        ViewportSize::new(w, h, self.tile_px)
    }

    /// Radius, in tiles, of the area worth asking the game service about.
    pub fn visible_radius(&self) -> i32 {
        let v = self.viewport();
        (v.tiles_w.max(v.tiles_h) / 2) as i32 + 1
    }

    /// Terminal size changed; the next frame is a full redraw.
    pub fn set_screen(&mut self, cols: u16, rows: u16) {
        self.screen = Some((cols, rows));
        self.overlays.set_screen(cols, rows);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.screen.is_none() {
            let v = self.viewport();
            let (cols, rows) = self.encoder.mode().frame_size(v.pixel_width(), v.pixel_height());
            self.overlays.set_screen(cols, rows);
        }
        self.encoder.invalidate();
        self.predictions.clear();
        self.throttle.reset();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ActionOutcome {
        if key.kind == KeyEventKind::Release {
            return ActionOutcome::Continue;
        }
        if should_quit(key) {
            return ActionOutcome::Quit;
        }
        if self.overlays.handle_key(key.code) {
            return ActionOutcome::Continue;
        }
        match handle_key_event(key) {
            Some(action) => self.apply_action(action),
            None => ActionOutcome::Continue,
        }
    }

    pub fn apply_action(&mut self, action: InputAction) -> ActionOutcome {
        match action {
            InputAction::Move(direction) => {
                let mut next = self.local_player();
                let world = &mut self.world;
                apply_move(&mut next, direction, |x, y| world.is_walkable(x, y));
                self.world.update_player(next.clone());
                self.predictions.record(&next);
                self.moved = true;
                return ActionOutcome::Moved(next);
            }
            InputAction::ZoomIn => self.zoom((self.tile_px + ZOOM_STEP).min(MAX_TILE_PX)),
            InputAction::ZoomOut => self.zoom(self.tile_px.saturating_sub(ZOOM_STEP).max(MIN_TILE_PX)),
            InputAction::CycleRenderMode => {
                let mode = self.encoder.mode().cycle();
                self.encoder.set_mode(mode);
                self.invalidate();
                tracing::debug!(mode = mode.name(), "render mode");
            }
            InputAction::Brighter => self.step_brightness(1),
            InputAction::Dimmer => self.step_brightness(-1),
            InputAction::ToggleHelp => {
                self.overlays.toggle(OverlayKind::Help, || ComponentKind::Help(HelpModal::default()));
            }
            InputAction::TogglePlayerList => {
                let names = self.remote_names();
                self.overlays.toggle(OverlayKind::PlayerList, || {
                    ComponentKind::PlayerList(PlayerList { names, scroll: 0 })
                });
            }
            InputAction::TogglePrediction => {
                let enabled = !self.predictions.is_enabled();
                self.predictions.set_enabled(enabled);
                tracing::debug!(enabled, "prediction");
            }
            InputAction::Quit => return ActionOutcome::Quit,
        }
        ActionOutcome::Continue
    }

    fn zoom(&mut self, tile_px: u16) {
        if tile_px != self.tile_px {
            self.tile_px = tile_px;
            self.invalidate();
            tracing::debug!(tile_px, "zoom");
        }
    }

    fn step_brightness(&mut self, step: i32) {
        let level = quantize(self.compositor.brightness()) as i32 + step;
        let level = level.clamp(0, BRIGHTNESS_LEVELS.len() as i32 - 1) as usize;
        let brightness = BRIGHTNESS_LEVELS[level];
        if brightness != self.compositor.brightness() {
            self.compositor.set_brightness(brightness);
            self.predictions.clear();
            self.throttle.reset();
        }
    }

    fn remote_names(&self) -> Vec<String> {
        let local = self.config.player_id.as_str();
        self.world
            .players()
            .into_iter()
            .filter(|p| p.id != local)
            .map(|p| p.name)
            .collect()
    }

    /// Replace every remote player with `players`. Returns ids seen for the
    /// first time, whose sprites the caller should fetch.
    pub fn sync_players(&mut self, players: &[PlayerVisualState]) -> Vec<PlayerId> {
        let local = self.config.player_id.clone();
        let mut fresh = Vec::new();
        self.world
            .retain_players(|p| players.iter().any(|q| q.id == p.id));
        for p in players.iter().filter(|p| p.id != local) {
            if self.world.player(&p.id).is_none() {
                fresh.push(p.id.clone());
            }
            self.world.update_player(p.clone());
        }
        let names = self.remote_names();
        self.overlays.set_players(names);
        fresh
    }

    pub fn set_player_sprite(&mut self, id: impl Into<PlayerId>, sprite: Arc<Sprite>) {
        self.world.set_player_sprite(id, sprite);
        self.throttle.reset();
    }

    /// Sprite every player without custom art falls back to.
    pub fn default_sprite(&self) -> Option<Arc<Sprite>> {
        self.default_sprite.clone()
    }

    /// React to a world-wide notice. Returns a player whose sprite should be
    /// re-fetched.
    pub fn handle_world_event(&mut self, event: WorldEvent, now: Instant) -> Option<PlayerId> {
        match event {
            WorldEvent::ReloadStarted => {
                self.overlays.show_banner("reloading world...", None, now);
                None
            }
            WorldEvent::ReloadFinished => {
                self.overlays.show_banner("reload complete", Some(BANNER_TTL), now);
                self.compositor.clear_caches();
                self.invalidate();
                None
            }
            WorldEvent::SpriteUpdated { player_id } => Some(player_id),
            WorldEvent::PlayerLeft { player_id } => {
                if player_id != self.config.player_id {
                    self.world.remove_player(&player_id);
                    let names = self.remote_names();
                    self.overlays.set_players(names);
                }
                None
            }
        }
    }

    fn scene_fingerprint(&self, viewport: ViewportSize) -> u64 {
        let mut h = Fnv1aHasher::new();
        (viewport.tiles_w, viewport.tiles_h, viewport.tile_px).hash(&mut h);
        self.encoder.mode().hash(&mut h);
        self.compositor.brightness().to_bits().hash(&mut h);
        for p in self.world.players() {
            (&p.id, &p.name, p.x, p.y, p.direction, p.frame).hash(&mut h);
        }
        h.finish()
    }

    /// Run one render tick, appending terminal output to `out`.
    ///
    /// A fresh prediction for the local player's current state is served as
    /// is; otherwise the scene is composed and diffed when it changed. Overlays
    /// are painted after the game frame, then predictions are rebuilt.
    pub fn render_tick(&mut self, now: Instant, out: &mut Vec<u8>) -> Result<FrameReport> {
        let start = out.len();
        let mut report = FrameReport::default();

        self.overlays.tick(now);
        if self.overlays.take_repair() {
            self.invalidate();
        }

        let moved = std::mem::take(&mut self.moved);
        if !moved {
            self.settle_local();
        }

        let generation = self.encoder.generation();
        let local = self.local_player();
        let viewport = self.viewport();

        if moved {
            if let Some(hit) =
                self.predictions
                    .lookup(local.x, local.y, local.direction, now, self.encoder.generation())
            {
                out.extend_from_slice(&hit.output);
                if let Some(frame) = hit.frame {
                    self.encoder.adopt(frame);
                }
                // Anything else that changed meanwhile gets picked up next tick.
                self.throttle.reset();
                report.predicted = true;
            }
        }

        if !report.predicted {
            let scene = self.scene_fingerprint(viewport);
            let anim = self.animated.then_some(self.tick / ANIMATION_TICKS_PER_FRAME);
            let now_ms = now.saturating_duration_since(self.started).as_millis() as u64;
            if let Some(cause) = self.throttle.redraw_cause(now_ms, scene, anim) {
                let comp = self
                    .compositor
                    .compose(&mut self.world, Camera::on(&local), viewport, self.tick);
                self.animated = comp.animated;
                report.full = self.encoder.encode(&comp, out)?;
                report.composed = true;
                tracing::trace!(?cause, tick = self.tick, "recomposed");
            }
        }

        let changed = self.encoder.generation() != generation;
        report.overlays = self.overlays.render_into(out, changed)?;

        if self.predictions.is_enabled() {
            self.rebuild_predictions(&local, viewport, now);
        }

        self.tick += 1;
        self.frames += 1;
        report.bytes = out.len() - start;
        Ok(report)
    }

    /// A tick without input ends any step in progress.
    fn settle_local(&mut self) {
        if let Some(p) = self.world.local_player().filter(|p| p.moving) {
            let mut p = p.clone();
            p.moving = false;
            self.world.update_player(p);
        }
    }

    fn rebuild_predictions(&mut self, local: &PlayerVisualState, viewport: ViewportSize, now: Instant) {
        let baseline = self.encoder.generation();
        let next_tick = self.tick + 1;
        let world = &mut self.world;
        let compositor = &mut self.compositor;
        let encoder = &self.encoder;
        self.predictions.predict(local, now, baseline, |hyp| {
            world.update_player(hyp.clone());
            let comp = compositor.compose(&mut *world, Camera::on(hyp), viewport, next_tick);
            encoder.encode_speculative(&comp).ok().flatten()
        });
        self.world.update_player(local.clone());
    }
}

/// First walkable tile found spiralling out from the origin.
fn spawn_point(world: &mut World) -> (i32, i32) {
    for r in 0..=SPAWN_SEARCH_RADIUS {
        for y in -r..=r {
            for x in -r..=r {
                if (x.abs() == r || y.abs() == r) && world.is_walkable(x, y) {
                    return (x, y);
                }
            }
        }
    }
    (0, 0)
}
