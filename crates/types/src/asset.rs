//! Tiles and sprites produced by content generation.
//!
//! Both are read-only after creation and shared behind `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pixel::PixelGrid;
use crate::player::Direction;

/// Looping tile animation.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAnimation {
    /// Base-resolution frames, in playback order.
    pub frames: Vec<Arc<PixelGrid>>,
    /// Precomputed frames keyed by resolution.
    pub resolution_frames: BTreeMap<u16, Vec<Arc<PixelGrid>>>,
}

/// A square of terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: String,
    pub name: String,
    pub walkable: bool,
    /// Base-resolution image.
    pub pixels: Arc<PixelGrid>,
    /// Precomputed images keyed by resolution.
    pub resolutions: BTreeMap<u16, Arc<PixelGrid>>,
    pub animation: Option<TileAnimation>,
}

impl Tile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, walkable: bool, pixels: PixelGrid) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            walkable,
            pixels: Arc::new(pixels),
            resolutions: BTreeMap::new(),
            animation: None,
        }
    }

    pub fn with_resolution(mut self, size: u16, pixels: PixelGrid) -> Self {
        self.resolutions.insert(size, Arc::new(pixels));
        self
    }

    pub fn with_animation(mut self, animation: TileAnimation) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn is_animated(&self) -> bool {
        self.animation.as_ref().is_some_and(|a| !a.frames.is_empty())
    }

    /// Every resolution this tile has art for, including its base size.
    pub fn available_sizes(&self) -> impl Iterator<Item = u16> + '_ {
        std::iter::once(self.pixels.width()).chain(self.resolutions.keys().copied())
    }
}

/// One frame list per cardinal direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalFrames {
    pub up: Vec<Arc<PixelGrid>>,
    pub down: Vec<Arc<PixelGrid>>,
    pub left: Vec<Arc<PixelGrid>>,
    pub right: Vec<Arc<PixelGrid>>,
}

impl DirectionalFrames {
    pub fn get(&self, direction: Direction) -> &[Arc<PixelGrid>] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    /// The frame at `index`, wrapping around the direction's frame count.
    pub fn frame(&self, direction: Direction, index: usize) -> Option<&Arc<PixelGrid>> {
        let frames = self.get(direction);
        if frames.is_empty() {
            return None;
        }
        frames.get(index % frames.len())
    }
}

/// A character's four-directional, frame-animated image set.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub width: u16,
    pub height: u16,
    pub frames: DirectionalFrames,
    /// Precomputed frame sets keyed by resolution.
    pub resolutions: BTreeMap<u16, DirectionalFrames>,
}

impl Sprite {
    pub fn new(width: u16, height: u16, frames: DirectionalFrames) -> Self {
        Self {
            width,
            height,
            frames,
            resolutions: BTreeMap::new(),
        }
    }
}
