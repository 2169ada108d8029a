//! Decides which session ticks have to recompose the viewport.
//!
//! Everything that shapes the picture apart from tile animation (camera,
//! zoom, render mode, lighting, players) is hashed by the session into one
//! scene fingerprint. Animation is tracked separately as the frame index, and
//! only when the last composed picture actually contained animated tiles, so
//! a dry-land view stays idle between scene changes.

/// Why a tick recomposes the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawCause {
    /// Nothing drawn yet, or the last picture was discarded.
    Initial,
    /// Camera, zoom, mode, lighting or a player changed.
    Scene,
    /// Visible animated tiles reached their next frame.
    Animation,
    /// Periodic repaint of an otherwise idle viewport.
    Refresh,
}

#[derive(Debug, Clone, Copy)]
struct Drawn {
    scene: u64,
    anim_frame: Option<u64>,
    at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RenderThrottle {
    refresh_ms: u64,
    drawn: Option<Drawn>,
}

impl RenderThrottle {
    /// An idle viewport is still repainted every `refresh_ms`.
    pub fn new(refresh_ms: u64) -> Self {
        Self {
            refresh_ms,
            drawn: None,
        }
    }

    /// Returns why the viewport must be recomposed at `now_ms`, or `None` when
    /// the last picture is still current. `anim_frame` is `None` when nothing
    /// animated is on screen.
    pub fn redraw_cause(&mut self, now_ms: u64, scene: u64, anim_frame: Option<u64>) -> Option<RedrawCause> {
        let cause = match self.drawn {
            None => RedrawCause::Initial,
            Some(d) if d.scene != scene => RedrawCause::Scene,
            Some(d) if anim_frame.is_some() && d.anim_frame != anim_frame => RedrawCause::Animation,
            Some(d) if now_ms.saturating_sub(d.at_ms) >= self.refresh_ms => RedrawCause::Refresh,
            Some(_) => return None,
        };
        self.drawn = Some(Drawn {
            scene,
            anim_frame,
            at_ms: now_ms,
        });
        Some(cause)
    }

    /// Forget the last picture; the next check always redraws.
    pub fn reset(&mut self) {
        self.drawn = None;
    }

    /// When the viewport was last recomposed.
    pub fn last_drawn_ms(&self) -> Option<u64> {
        self.drawn.map(|d| d.at_ms)
    }
}
