//! Terminal rendering pipeline.
//!
//! World data goes in, escape sequences come out:
//!
//! - [`compositor`]: tiles and sprites → one [`types::PixelGrid`] plus text overlays
//! - [`encoder`]: pixel grid → character cells for a [`RenderMode`]
//! - [`renderer`]: cells → minimal escape-sequence diff against the last frame
//! - [`overlay`]: modal/focus-stack UI painted over the viewport
//!
//! Everything here is per-session state. Nothing is shared or locked.

pub mod brightness;
pub mod cache;
pub mod compositor;
pub mod encoder;
pub mod fb;
pub mod overlay;
pub mod render_throttle;
pub mod renderer;
pub mod scale;

pub use termworld_core as core;
pub use termworld_types as types;

pub use brightness::{quantize, quantized_level, BrightnessCache};
pub use cache::{CacheStats, LruCache};
pub use compositor::{
    animation_frame, placeholder_color, Camera, Composition, TextOverlay, ViewportCompositor,
    ViewportSize,
};
pub use encoder::{encode_pixels, rgb_to_ansi256, RenderMode};
pub use fb::{Cell, CellColor, CellStyle, FrameBuffer, Rgb};
pub use overlay::{
    Banner, Component, ComponentId, ComponentKind, HelpModal, KeyOutcome, Lifecycle,
    OverlayKind, OverlayStack, PlayerList,
};
pub use render_throttle::{RedrawCause, RenderThrottle};
pub use renderer::{
    changed_cells, encode_diff_into, encode_full_into, encode_region_into, FrameEncoder,
    TerminalRenderer,
};
pub use scale::{scale_nearest, select_resolution, ScaleCache};
