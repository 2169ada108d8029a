//! Viewport compositor: world tiles + player sprites → one pixel grid.
//!
//! The compositor owns the scale and brightness caches, so repeated frames at
//! the same zoom reuse resampled art instead of recomputing it.

use std::sync::Arc;

use crate::brightness::BrightnessCache;
use crate::core::{stable_hash, WorldData};
use crate::scale::{select_resolution, ScaleCache};
use crate::types::{
    Canvas, PixelGrid, PlayerVisualState, Rgb, Sprite, Tile, ANIMATION_TICKS_PER_FRAME,
    DEFAULT_BRIGHTNESS_CAPACITY, DEFAULT_RESOLUTIONS, DEFAULT_SCALE_CAPACITY,
};

const NAME_TAG_FG: Rgb = Rgb::new(255, 255, 255);

/// Camera anchor in tile coordinates. The anchor tile sits at the center of
/// the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
}

impl Camera {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn on(player: &PlayerVisualState) -> Self {
        Self::new(player.x, player.y)
    }
}

/// Visible rectangle: tile counts plus the on-screen edge length of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub tiles_w: u16,
    pub tiles_h: u16,
    pub tile_px: u16,
}

impl ViewportSize {
    pub fn new(tiles_w: u16, tiles_h: u16, tile_px: u16) -> Self {
        Self {
            tiles_w,
            tiles_h,
            tile_px: tile_px.max(1),
        }
    }

    pub fn pixel_width(&self) -> u16 {
        self.tiles_w.saturating_mul(self.tile_px)
    }

    pub fn pixel_height(&self) -> u16 {
        self.tiles_h.saturating_mul(self.tile_px)
    }

    /// World tile drawn at the top-left corner.
    pub fn origin(&self, camera: Camera) -> (i32, i32) {
        (
            camera.x - (self.tiles_w / 2) as i32,
            camera.y - (self.tiles_h / 2) as i32,
        )
    }
}

/// Text drawn over the pixel layer, positioned in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOverlay {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub fg: Rgb,
    /// `None` keeps whatever color is already underneath.
    pub bg: Option<Rgb>,
    /// Center the text on `x` instead of starting there.
    pub centered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub pixels: PixelGrid,
    pub overlays: Vec<TextOverlay>,
    /// Some visible tile cycles through animation frames.
    pub animated: bool,
}

/// Animation frame for `tick` among `frame_count` frames.
pub fn animation_frame(tick: u64, frame_count: usize) -> usize {
    if frame_count == 0 {
        return 0;
    }
    ((tick / ANIMATION_TICKS_PER_FRAME) % frame_count as u64) as usize
}

/// Deterministic placeholder color for a player with no sprite.
pub fn placeholder_color(id: &str) -> Rgb {
    let h = stable_hash(id);
    // Keep every channel in the upper half so the marker never reads as black.
    Rgb::new(
        128 | (h & 0x7f) as u8,
        128 | ((h >> 8) & 0x7f) as u8,
        128 | ((h >> 16) & 0x7f) as u8,
    )
}

#[derive(Debug)]
pub struct ViewportCompositor {
    resolutions: Vec<u16>,
    scale: ScaleCache,
    brightness: BrightnessCache,
    level: f32,
}

impl Default for ViewportCompositor {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESOLUTIONS.to_vec(),
            DEFAULT_SCALE_CAPACITY,
            DEFAULT_BRIGHTNESS_CAPACITY,
        )
    }
}

impl ViewportCompositor {
    /// An empty `resolutions` list falls back to the default set.
    pub fn new(mut resolutions: Vec<u16>, scale_capacity: usize, brightness_capacity: usize) -> Self {
        if resolutions.is_empty() {
            tracing::warn!("empty resolution list, using defaults");
            resolutions = DEFAULT_RESOLUTIONS.to_vec();
        }
        resolutions.sort_unstable();
        resolutions.dedup();
        Self {
            resolutions,
            scale: ScaleCache::new(scale_capacity),
            brightness: BrightnessCache::new(brightness_capacity),
            level: 1.0,
        }
    }

    pub fn resolutions(&self) -> &[u16] {
        &self.resolutions
    }

    pub fn brightness(&self) -> f32 {
        self.level
    }

    pub fn set_brightness(&mut self, level: f32) {
        self.level = level;
    }

    pub fn scale_cache(&self) -> &ScaleCache {
        &self.scale
    }

    pub fn brightness_cache(&self) -> &BrightnessCache {
        &self.brightness
    }

    /// Drop every memoized variant.
    pub fn clear_caches(&mut self) {
        self.scale.clear();
        self.brightness.clear();
    }

    pub fn compose<W: WorldData + ?Sized>(
        &mut self,
        world: &mut W,
        camera: Camera,
        size: ViewportSize,
        tick: u64,
    ) -> Composition {
        let tile_px = size.tile_px;
        let px = tile_px as i32;
        let (ox, oy) = size.origin(camera);
        let mut canvas = Canvas::new(size.pixel_width(), size.pixel_height(), None);
        let mut animated = false;

        // Tiles past the (saturated) canvas edge would be clipped anyway.
        let cols = size.tiles_w.min(canvas.width().div_ceil(tile_px));
        let rows = size.tiles_h.min(canvas.height().div_ceil(tile_px));
        for ty in 0..rows {
            for tx in 0..cols {
                let Some(tile) = world.tile(ox + tx as i32, oy + ty as i32) else {
                    continue;
                };
                animated |= tile.is_animated();
                let art = self.tile_art(&tile, tile_px, tick);
                let art = self.finish(&art, tile_px, tile_px);
                canvas.blit(&art, tx as i32 * px, ty as i32 * px);
            }
        }

        let mut players = world.players();
        players.sort_by(|a, b| a.y.cmp(&b.y).then_with(|| a.id.cmp(&b.id)));
        let local = world.local_player_id().to_string();
        let mut overlays = Vec::new();

        for player in &players {
            let (sx, sy) = (player.x - ox, player.y - oy);
            // One tile of slack keeps tall sprites and name tags at the edge.
            if sx < -1 || sy < -1 || sx > size.tiles_w as i32 || sy > size.tiles_h as i32 + 1 {
                continue;
            }
            let (left, tile_top) = (sx * px, sy * px);

            let top = match world.player_sprite(&player.id).and_then(|s| self.sprite_art(&s, player, tile_px)) {
                Some(art) => {
                    let top = tile_top + px - art.height() as i32;
                    canvas.blit(&art, left, top);
                    top
                }
                None => {
                    let side = (tile_px / 2).max(1);
                    let inset = ((tile_px - side) / 2) as i32;
                    canvas.fill_rect(left + inset, tile_top + inset, side, side, placeholder_color(&player.id));
                    tile_top + inset
                }
            };

            if player.id != local {
                overlays.push(TextOverlay {
                    text: player.name.clone(),
                    x: left + px / 2,
                    y: top - 1,
                    fg: NAME_TAG_FG,
                    bg: None,
                    centered: true,
                });
            }
        }

        Composition {
            pixels: canvas.into_grid(),
            overlays,
            animated,
        }
    }

    fn tile_art(&self, tile: &Tile, tile_px: u16, tick: u64) -> Arc<PixelGrid> {
        if let Some(anim) = tile.animation.as_ref().filter(|a| !a.frames.is_empty()) {
            let base = anim.frames[0].width();
            let sizes = self
                .resolutions
                .iter()
                .copied()
                .filter(|s| anim.resolution_frames.get(s).is_some_and(|f| !f.is_empty()));
            let key = select_resolution(sizes.chain(std::iter::once(base)), tile_px).unwrap_or(base);
            let frames = anim
                .resolution_frames
                .get(&key)
                .filter(|f| !f.is_empty())
                .unwrap_or(&anim.frames);
            return Arc::clone(&frames[animation_frame(tick, frames.len())]);
        }

        let base = tile.pixels.width();
        let sizes = self
            .resolutions
            .iter()
            .copied()
            .filter(|s| tile.resolutions.contains_key(s));
        let key = select_resolution(sizes.chain(std::iter::once(base)), tile_px).unwrap_or(base);
        tile.resolutions
            .get(&key)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::clone(&tile.pixels))
    }

    fn sprite_art(&mut self, sprite: &Sprite, player: &PlayerVisualState, tile_px: u16) -> Option<Arc<PixelGrid>> {
        let sizes = self
            .resolutions
            .iter()
            .copied()
            .filter(|s| sprite.resolutions.contains_key(s));
        let key = select_resolution(sizes.chain(std::iter::once(sprite.width)), tile_px)?;
        let frames = sprite.resolutions.get(&key).unwrap_or(&sprite.frames);
        let frame = frames
            .frame(player.direction, player.frame)
            .or_else(|| sprite.frames.frame(player.direction, player.frame))?;
        let w = tile_px;
        let h = ((tile_px as u32 * frame.height() as u32) / frame.width().max(1) as u32).max(1) as u16;
        let frame = Arc::clone(frame);
        Some(self.finish(&frame, w, h))
    }

    fn finish(&mut self, art: &Arc<PixelGrid>, w: u16, h: u16) -> Arc<PixelGrid> {
        let scaled = self.scale.scale(art, w, h);
        self.brightness.variant(&scaled, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::types::{DirectionalFrames, TileAnimation};

    const GREEN: Rgb = Rgb::new(0, 200, 0);

    struct FlatWorld {
        tile: Option<Arc<Tile>>,
        players: Vec<PlayerVisualState>,
        sprites: HashMap<String, Arc<Sprite>>,
        local: String,
    }

    impl FlatWorld {
        fn new(tile: Option<Tile>) -> Self {
            Self {
                tile: tile.map(Arc::new),
                players: Vec::new(),
                sprites: HashMap::new(),
                local: "me".into(),
            }
        }
    }

    impl WorldData for FlatWorld {
        fn tile(&mut self, _x: i32, _y: i32) -> Option<Arc<Tile>> {
            self.tile.clone()
        }
        fn players(&self) -> Vec<PlayerVisualState> {
            self.players.clone()
        }
        fn player_sprite(&self, id: &str) -> Option<Arc<Sprite>> {
            self.sprites.get(id).cloned()
        }
        fn local_player_id(&self) -> &str {
            &self.local
        }
    }

    fn grass() -> Tile {
        Tile::new("grass", "Grass", true, PixelGrid::filled(16, 16, Some(GREEN)))
    }

    fn solid_sprite(c: Rgb) -> Arc<Sprite> {
        let f = vec![Arc::new(PixelGrid::filled(16, 16, Some(c)))];
        Arc::new(Sprite::new(
            16,
            16,
            DirectionalFrames {
                up: f.clone(),
                down: f.clone(),
                left: f.clone(),
                right: f,
            },
        ))
    }

    #[test]
    fn output_size_follows_viewport() {
        let mut world = FlatWorld::new(Some(grass()));
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::new(0, 0), ViewportSize::new(5, 3, 8), 0);
        assert_eq!((out.pixels.width(), out.pixels.height()), (40, 24));
        assert!(out.pixels.pixels().iter().all(|p| *p == Some(GREEN)));
        assert!(!out.animated);
    }

    #[test]
    fn oversized_viewport_saturates_instead_of_overflowing() {
        let mut world = FlatWorld::new(Some(grass()));
        let mut comp = ViewportCompositor::default();
        let size = ViewportSize::new(3000, 1, 32);
        let out = comp.compose(&mut world, Camera::default(), size, 0);
        assert_eq!((out.pixels.width(), out.pixels.height()), (u16::MAX, 32));
        assert_eq!(out.pixels.get(u16::MAX - 1, 31), Some(Some(GREEN)));
    }

    #[test]
    fn missing_tiles_stay_transparent() {
        let mut world = FlatWorld::new(None);
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::default(), ViewportSize::new(2, 2, 4), 0);
        assert!(out.pixels.pixels().iter().all(|p| p.is_none()));
    }

    #[test]
    fn resolution_prefers_smallest_at_least_tile_size() {
        let tile = grass()
            .with_resolution(32, PixelGrid::filled(32, 32, Some(Rgb::new(1, 1, 1))))
            .with_resolution(64, PixelGrid::filled(64, 64, Some(Rgb::new(2, 2, 2))));
        let comp = ViewportCompositor::new(vec![32, 64], 16, 16);
        assert_eq!(comp.tile_art(&tile, 20, 0).width(), 32);
        assert_eq!(comp.tile_art(&tile, 12, 0).width(), 16);
        assert_eq!(comp.tile_art(&tile, 100, 0).width(), 64);
    }

    #[test]
    fn animated_tiles_advance_every_fifteen_ticks() {
        let frames = vec![
            Arc::new(PixelGrid::filled(16, 16, Some(Rgb::new(0, 0, 100)))),
            Arc::new(PixelGrid::filled(16, 16, Some(Rgb::new(0, 0, 200)))),
        ];
        let tile = Tile::new("water", "Water", false, PixelGrid::filled(16, 16, None)).with_animation(TileAnimation {
            frames,
            resolution_frames: Default::default(),
        });
        let comp = ViewportCompositor::default();
        let blue = |tick| comp.tile_art(&tile, 16, tick).get(0, 0).flatten().map(|c| c.b);
        assert_eq!(blue(0), Some(100));
        assert_eq!(blue(14), Some(100));
        assert_eq!(blue(15), Some(200));
        assert_eq!(blue(30), Some(100));
        assert_eq!(animation_frame(45, 2), 1);
        assert_eq!(animation_frame(7, 0), 0);

        let mut world = FlatWorld::new(Some(tile));
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::default(), ViewportSize::new(2, 2, 16), 0);
        assert!(out.animated);
    }

    #[test]
    fn players_draw_in_y_order() {
        let mut world = FlatWorld::new(Some(grass()));
        world.players.push(PlayerVisualState::new("front", "Front", 0, 1));
        world.players.push(PlayerVisualState::new("back", "Back", 0, 0));
        world.sprites.insert("back".into(), solid_sprite(Rgb::new(0, 0, 255)));
        // Twice as tall as a tile, so it reaches up over the tile behind it.
        let tall = vec![Arc::new(PixelGrid::filled(16, 32, Some(Rgb::new(255, 0, 0))))];
        world.sprites.insert(
            "front".into(),
            Arc::new(Sprite::new(
                16,
                32,
                DirectionalFrames {
                    up: tall.clone(),
                    down: tall.clone(),
                    left: tall.clone(),
                    right: tall,
                },
            )),
        );

        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::new(0, 1), ViewportSize::new(1, 3, 8), 0);
        // "back" fills row 0, "front" covers rows 0..2 and is drawn last.
        assert_eq!(out.pixels.get(4, 4).flatten(), Some(Rgb::new(255, 0, 0)));
        assert_eq!(out.pixels.get(4, 12).flatten(), Some(Rgb::new(255, 0, 0)));
        assert_eq!(out.pixels.get(4, 20).flatten(), Some(GREEN));
    }

    #[test]
    fn missing_sprite_gets_stable_placeholder() {
        let mut world = FlatWorld::new(Some(grass()));
        world.players.push(PlayerVisualState::new("ghost", "Ghost", 0, 0));
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::new(0, 0), ViewportSize::new(1, 1, 8), 0);
        let color = placeholder_color("ghost");
        assert_eq!(out.pixels.get(4, 4).flatten(), Some(color));
        assert_eq!(out.pixels.get(0, 0).flatten(), Some(GREEN));
        assert_eq!(placeholder_color("ghost"), color);
    }

    #[test]
    fn only_remote_players_get_name_tags() {
        let mut world = FlatWorld::new(Some(grass()));
        world.players.push(PlayerVisualState::new("me", "Me", 0, 0));
        world.players.push(PlayerVisualState::new("you", "You", 1, 0));
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::new(0, 0), ViewportSize::new(4, 4, 8), 0);
        assert_eq!(out.overlays.len(), 1);
        assert_eq!(out.overlays[0].text, "You");
        assert!(out.overlays[0].centered);
    }

    #[test]
    fn sprites_at_the_edge_are_clipped() {
        let mut world = FlatWorld::new(None);
        world.players.push(PlayerVisualState::new("edge", "Edge", -1, 0));
        world.sprites.insert("edge".into(), solid_sprite(Rgb::new(9, 9, 9)));
        let mut comp = ViewportCompositor::default();
        let out = comp.compose(&mut world, Camera::new(0, 0), ViewportSize::new(1, 1, 8), 0);
        assert!(out.pixels.pixels().iter().all(|p| p.is_none()));
    }

    #[test]
    fn brightness_routes_through_variant_cache() {
        let mut world = FlatWorld::new(Some(grass()));
        let mut comp = ViewportCompositor::default();
        comp.set_brightness(0.7);
        let out = comp.compose(&mut world, Camera::default(), ViewportSize::new(2, 2, 16), 0);
        assert_eq!(out.pixels.get(0, 0).flatten(), Some(Rgb::new(0, 140, 0)));
        assert_eq!(comp.brightness_cache().len(), 1);
        assert!(comp.brightness_cache().stats().hits >= 3);
    }

    #[test]
    fn empty_resolution_list_uses_defaults() {
        let comp = ViewportCompositor::new(Vec::new(), 4, 4);
        assert_eq!(comp.resolutions(), &DEFAULT_RESOLUTIONS);
    }
}
