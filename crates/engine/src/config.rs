//! Per-session configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::term::RenderMode;
use crate::types::{
    Rgb, DEFAULT_BRIGHTNESS_CAPACITY, DEFAULT_CHUNK_CAPACITY, DEFAULT_QUERY_TIMEOUT_MS,
    DEFAULT_RESOLUTIONS, DEFAULT_SCALE_CAPACITY, DEFAULT_TICK_MS, DEFAULT_TILE_PX, MAX_TILE_PX,
    MAX_VIEW_TILES, MIN_TILE_PX,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub seed: u64,
    pub player_id: String,
    pub player_name: String,
    pub tile_px: u16,
    pub view_tiles_w: u16,
    pub view_tiles_h: u16,
    pub render_mode: RenderMode,
    pub prediction: bool,
    pub chunk_capacity: usize,
    pub brightness: f32,
    pub brightness_capacity: usize,
    pub scale_capacity: usize,
    pub query_timeout: Duration,
    pub tick: Duration,
    pub resolutions: Vec<u16>,
    pub content_path: Option<PathBuf>,
    pub background: Rgb,
    /// Still scenes are recomposed at least this often.
    pub static_refresh: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            player_id: "local".to_string(),
            player_name: "you".to_string(),
            tile_px: DEFAULT_TILE_PX,
            view_tiles_w: 15,
            view_tiles_h: 9,
            render_mode: RenderMode::HalfBlock,
            prediction: true,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            brightness: 1.0,
            brightness_capacity: DEFAULT_BRIGHTNESS_CAPACITY,
            scale_capacity: DEFAULT_SCALE_CAPACITY,
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            resolutions: DEFAULT_RESOLUTIONS.to_vec(),
            content_path: None,
            background: Rgb::new(0, 0, 0),
            static_refresh: Duration::from_millis(1000),
        }
    }
}

/// Reads one setting by key; `from_env` backs it with the process environment.
trait Lookup {
    fn raw(&self, key: &str) -> Option<String>;

    fn text(&self, key: &str) -> Option<String> {
        self.raw(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.text(key).and_then(|s| s.parse().ok())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.text(key).map(|v| {
            let v = v.to_ascii_lowercase();
            !(v == "0" || v == "false" || v == "off" || v == "no")
        })
    }
}

impl<F: Fn(&str) -> Option<String>> Lookup for F {
    fn raw(&self, key: &str) -> Option<String> {
        (self)(key)
    }
}

/// Comma-separated sizes; anything unparsable is skipped. `None` when nothing
/// usable remains, since the set may never be empty.
pub fn parse_resolutions(s: &str) -> Option<Vec<u16>> {
    let mut sizes: Vec<u16> = s
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .filter(|&n: &u16| n > 0)
        .collect();
    sizes.sort_unstable();
    sizes.dedup();
    (!sizes.is_empty()).then_some(sizes)
}

impl SessionConfig {
    /// Defaults overridden by `TERMWORLD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key: &str| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `TERMWORLD_*` key. Out-of-range values are clamped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();

        let player_name = lookup.text("TERMWORLD_PLAYER_NAME").unwrap_or(d.player_name);
        let content_path = lookup.text("TERMWORLD_CONTENT_PATH").map(PathBuf::from);
        let render_mode = lookup
            .text("TERMWORLD_RENDER_MODE")
            .and_then(|s| RenderMode::from_str(&s))
            .unwrap_or(d.render_mode);
        let resolutions = lookup
            .text("TERMWORLD_RESOLUTIONS")
            .and_then(|s| parse_resolutions(&s))
            .unwrap_or(d.resolutions);

        Self {
            seed: lookup.parsed("TERMWORLD_SEED").unwrap_or(d.seed),
            player_id: player_name.to_ascii_lowercase(),
            player_name,
            tile_px: lookup
                .parsed::<u16>("TERMWORLD_TILE_PX")
                .unwrap_or(d.tile_px)
                .clamp(MIN_TILE_PX, MAX_TILE_PX),
            view_tiles_w: lookup
                .parsed::<u16>("TERMWORLD_VIEW_TILES_W")
                .unwrap_or(d.view_tiles_w)
                .clamp(1, MAX_VIEW_TILES),
            view_tiles_h: lookup
                .parsed::<u16>("TERMWORLD_VIEW_TILES_H")
                .unwrap_or(d.view_tiles_h)
                .clamp(1, MAX_VIEW_TILES),
            render_mode,
            prediction: lookup.flag("TERMWORLD_PREDICTION").unwrap_or(d.prediction),
            chunk_capacity: lookup
                .parsed::<usize>("TERMWORLD_CHUNK_CAPACITY")
                .unwrap_or(d.chunk_capacity)
                .max(1),
            brightness: lookup.parsed("TERMWORLD_BRIGHTNESS").unwrap_or(d.brightness),
            brightness_capacity: lookup
                .parsed::<usize>("TERMWORLD_BRIGHTNESS_CAPACITY")
                .unwrap_or(d.brightness_capacity)
                .max(1),
            scale_capacity: d.scale_capacity,
            query_timeout: lookup
                .parsed("TERMWORLD_QUERY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.query_timeout),
            tick: lookup
                .parsed::<u64>("TERMWORLD_TICK_MS")
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or(d.tick),
            resolutions,
            content_path,
            background: d.background,
            static_refresh: d.static_refresh,
        }
    }
}
