//! Overlay components drawn over the game viewport.
//!
//! A component owns a character buffer and a screen origin. The stack decides
//! who gets keys and what is painted: a modal component on top consumes all
//! input and hides everything beneath it. Overlays are not diffed; they are
//! repainted whole when dirty or when the caller forces it.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::KeyCode;

use crate::fb::{CellStyle, FrameBuffer};
use crate::renderer::encode_region_into;
use crate::types::Rgb;

pub type ComponentId = u32;

const PANEL_FG: Rgb = Rgb::new(230, 230, 230);
const PANEL_BG: Rgb = Rgb::new(20, 24, 36);
const BANNER_BG: Rgb = Rgb::new(120, 70, 10);
const MAX_LIST_ROWS: usize = 10;

fn panel_style() -> CellStyle {
    CellStyle::colors(PANEL_FG, PANEL_BG)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted,
    Focused,
    Destroyed,
}

/// What a component did with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Consumed,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Help,
    PlayerList,
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpModal {
    pub lines: Vec<String>,
}

impl Default for HelpModal {
    fn default() -> Self {
        let lines = [
            "arrows / wasd  move",
            "+ / -          zoom",
            "m              render mode",
            "[ / ]          dimmer / brighter",
            "p              player list",
            "t              prediction on/off",
            "? / h          this help",
            "q              quit",
        ];
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerList {
    pub names: Vec<String>,
    pub scroll: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub expires_at: Option<Instant>,
}

/// Closed set of overlay kinds sharing one render/input contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Help(HelpModal),
    PlayerList(PlayerList),
    Banner(Banner),
}

impl ComponentKind {
    pub fn kind(&self) -> OverlayKind {
        match self {
            ComponentKind::Help(_) => OverlayKind::Help,
            ComponentKind::PlayerList(_) => OverlayKind::PlayerList,
            ComponentKind::Banner(_) => OverlayKind::Banner,
        }
    }

    pub fn is_modal(&self) -> bool {
        matches!(self, ComponentKind::Help(_))
    }

    /// Draw into `buf`, resizing it to the component's natural size.
    pub fn render(&self, buf: &mut FrameBuffer) {
        match self {
            ComponentKind::Help(help) => {
                boxed(buf, "Help", &help.lines);
            }
            ComponentKind::PlayerList(list) => {
                let title = format!("Players ({})", list.names.len());
                let rows: Vec<String> = if list.names.is_empty() {
                    vec!["nobody nearby".to_string()]
                } else {
                    list.names.iter().skip(list.scroll).take(MAX_LIST_ROWS).cloned().collect()
                };
                boxed(buf, &title, &rows);
            }
            ComponentKind::Banner(banner) => {
                let text = format!(" {} ", banner.text);
                let style = CellStyle {
                    bold: true,
                    ..CellStyle::colors(PANEL_FG, BANNER_BG)
                };
                buf.resize(text.chars().count() as u16, 1);
                buf.put_str(0, 0, &text, style);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> KeyOutcome {
        match self {
            ComponentKind::Help(_) => match key {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter => KeyOutcome::Close,
                // Modal: everything else is swallowed.
                _ => KeyOutcome::Consumed,
            },
            ComponentKind::PlayerList(list) => match key {
                KeyCode::Esc => KeyOutcome::Close,
                KeyCode::PageDown => {
                    if list.scroll + MAX_LIST_ROWS < list.names.len() {
                        list.scroll += 1;
                    }
                    KeyOutcome::Consumed
                }
                KeyCode::PageUp => {
                    list.scroll = list.scroll.saturating_sub(1);
                    KeyOutcome::Consumed
                }
                _ => KeyOutcome::Ignored,
            },
            ComponentKind::Banner(_) => KeyOutcome::Ignored,
        }
    }
}

fn boxed(buf: &mut FrameBuffer, title: &str, lines: &[String]) {
    let inner = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count() + 2))
        .max()
        .unwrap_or(0) as u16;
    let (w, h) = (inner + 4, lines.len() as u16 + 2);
    buf.resize(w, h);
    let style = panel_style();
    buf.clear(style.into_cell(' '));
    buf.draw_border(0, 0, w, h, style);
    buf.put_str(2, 0, &format!(" {title} "), CellStyle { bold: true, ..style });
    for (i, line) in lines.iter().enumerate() {
        buf.put_str(2, i as u16 + 1, line, style);
    }
}

#[derive(Debug)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub buffer: FrameBuffer,
    pub origin: (u16, u16),
    pub visible: bool,
    pub modal: bool,
    pub lifecycle: Lifecycle,
    pub dirty: bool,
}

impl Component {
    fn new(id: ComponentId, kind: ComponentKind) -> Self {
        let modal = kind.is_modal();
        let mut c = Self {
            id,
            kind,
            buffer: FrameBuffer::new(0, 0),
            origin: (0, 0),
            visible: true,
            modal,
            lifecycle: Lifecycle::Mounted,
            dirty: true,
        };
        c.kind.render(&mut c.buffer);
        c
    }

    fn rerender(&mut self) {
        self.kind.render(&mut self.buffer);
        self.dirty = true;
    }

    fn layout(&mut self, cols: u16, rows: u16) {
        let (w, h) = (self.buffer.width(), self.buffer.height());
        self.origin = match self.kind.kind() {
            OverlayKind::Help => (cols.saturating_sub(w) / 2, rows.saturating_sub(h) / 2),
            OverlayKind::PlayerList => (cols.saturating_sub(w), 0),
            OverlayKind::Banner => (cols.saturating_sub(w) / 2, rows.saturating_sub(1)),
        };
    }
}

/// Focus stack of mounted overlays; the last element has focus.
#[derive(Debug)]
pub struct OverlayStack {
    components: Vec<Component>,
    next_id: ComponentId,
    cols: u16,
    rows: u16,
    repair: bool,
}

impl OverlayStack {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            components: Vec::new(),
            next_id: 1,
            cols,
            rows,
            repair: false,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn top(&self) -> Option<&Component> {
        self.components.last()
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn find(&self, kind: OverlayKind) -> Option<ComponentId> {
        self.components.iter().rev().find(|c| c.kind.kind() == kind).map(|c| c.id)
    }

    /// Screen size in cells; re-lays out every component.
    pub fn set_screen(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        for c in &mut self.components {
            c.layout(cols, rows);
            c.dirty = true;
        }
    }

    pub fn mount(&mut self, kind: ComponentKind) -> ComponentId {
        let id = self.next_id;
        self.next_id += 1;
        let mut c = Component::new(id, kind);
        c.layout(self.cols, self.rows);
        if let Some(prev) = self.components.last_mut() {
            prev.lifecycle = Lifecycle::Mounted;
        }
        c.lifecycle = Lifecycle::Focused;
        tracing::debug!(id, kind = ?c.kind.kind(), "overlay mounted");
        self.components.push(c);
        id
    }

    /// Destroy a component. The area it covered must be repainted by the
    /// caller; see [`OverlayStack::take_repair`].
    pub fn close(&mut self, id: ComponentId) -> bool {
        let Some(pos) = self.components.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut c = self.components.remove(pos);
        c.lifecycle = Lifecycle::Destroyed;
        tracing::debug!(id, kind = ?c.kind.kind(), "overlay closed");
        if let Some(top) = self.components.last_mut() {
            top.lifecycle = Lifecycle::Focused;
        }
        for rest in &mut self.components {
            rest.dirty = true;
        }
        self.repair = true;
        true
    }

    /// Close the component of `kind` if mounted, otherwise mount `make()`.
    pub fn toggle(&mut self, kind: OverlayKind, make: impl FnOnce() -> ComponentKind) -> bool {
        match self.find(kind) {
            Some(id) => {
                self.close(id);
                false
            }
            None => {
                self.mount(make());
                true
            }
        }
    }

    /// Whether a close happened since the last call.
    pub fn take_repair(&mut self) -> bool {
        std::mem::take(&mut self.repair)
    }

    /// Route a key top-down. Returns `true` when some component consumed it.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        for i in (0..self.components.len()).rev() {
            let c = &mut self.components[i];
            if !c.visible && !c.modal {
                continue;
            }
            let outcome = c.kind.handle_key(key);
            let (id, modal) = (c.id, c.modal);
            match outcome {
                KeyOutcome::Close => {
                    self.close(id);
                    return true;
                }
                KeyOutcome::Consumed => {
                    self.components[i].rerender();
                    return true;
                }
                KeyOutcome::Ignored if modal => return true,
                KeyOutcome::Ignored => {}
            }
        }
        false
    }

    /// Close banners whose deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        let expired: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|c| match &c.kind {
                ComponentKind::Banner(b) => b.expires_at.is_some_and(|t| t <= now),
                _ => false,
            })
            .map(|c| c.id)
            .collect();
        for id in expired {
            self.close(id);
        }
    }

    /// Show `text` in the banner, replacing any current banner text.
    pub fn show_banner(&mut self, text: impl Into<String>, ttl: Option<Duration>, now: Instant) -> ComponentId {
        let banner = Banner {
            text: text.into(),
            expires_at: ttl.map(|d| now + d),
        };
        if let Some(id) = self.find(OverlayKind::Banner) {
            if let Some(c) = self.components.iter_mut().find(|c| c.id == id) {
                if c.kind != ComponentKind::Banner(banner.clone()) {
                    // A shorter banner leaves old text behind.
                    if c.buffer.width() as usize > banner.text.chars().count() + 2 {
                        self.repair = true;
                    }
                    c.kind = ComponentKind::Banner(banner);
                    c.rerender();
                    c.layout(self.cols, self.rows);
                }
                return id;
            }
        }
        self.mount(ComponentKind::Banner(banner))
    }

    /// Refresh every player list with the names currently in view.
    pub fn set_players(&mut self, mut names: Vec<String>) {
        names.sort();
        let mut shrunk = false;
        for c in &mut self.components {
            if let ComponentKind::PlayerList(list) = &mut c.kind {
                if list.names == names {
                    continue;
                }
                list.names = names.clone();
                list.scroll = list.scroll.min(names.len().saturating_sub(MAX_LIST_ROWS));
                let before = (c.buffer.width(), c.buffer.height());
                c.rerender();
                c.layout(self.cols, self.rows);
                shrunk |= c.buffer.width() < before.0 || c.buffer.height() < before.1;
            }
        }
        self.repair |= shrunk;
    }

    pub fn is_dirty(&self) -> bool {
        self.components.iter().any(|c| c.dirty && c.visible)
    }

    /// Paint the visible stack. Nothing beneath the top-most modal is drawn.
    /// Emits only when something is dirty or `force` is set; returns whether
    /// anything was written.
    pub fn render_into(&mut self, out: &mut Vec<u8>, force: bool) -> Result<bool> {
        let start = self.components.iter().rposition(|c| c.modal && c.visible).unwrap_or(0);
        let visible = &self.components[start..];
        if visible.iter().all(|c| !c.visible) || !(force || visible.iter().any(|c| c.dirty && c.visible)) {
            return Ok(false);
        }
        for c in &mut self.components[start..] {
            if c.visible {
                encode_region_into(&c.buffer, c.origin.0, c.origin.1, out)?;
            }
            c.dirty = false;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Instant {
        Instant::now()
    }

    #[test]
    fn mount_focuses_the_new_top() {
        let mut stack = OverlayStack::new(80, 24);
        let a = stack.mount(ComponentKind::PlayerList(PlayerList::default()));
        let b = stack.mount(ComponentKind::Help(HelpModal::default()));
        assert_eq!(stack.top().unwrap().id, b);
        assert_eq!(stack.get(a).unwrap().lifecycle, Lifecycle::Mounted);
        assert_eq!(stack.get(b).unwrap().lifecycle, Lifecycle::Focused);

        assert!(stack.close(b));
        assert_eq!(stack.get(a).unwrap().lifecycle, Lifecycle::Focused);
        assert!(stack.take_repair());
        assert!(!stack.take_repair());
        assert!(!stack.close(b));
    }

    #[test]
    fn modal_consumes_everything() {
        let mut stack = OverlayStack::new(80, 24);
        let list = stack.mount(ComponentKind::PlayerList(PlayerList {
            names: (0..20).map(|i| format!("p{i:02}")).collect(),
            scroll: 0,
        }));
        stack.mount(ComponentKind::Help(HelpModal::default()));

        // PageDown would scroll the list, but the modal swallows it.
        assert!(stack.handle_key(KeyCode::PageDown));
        match &stack.get(list).unwrap().kind {
            ComponentKind::PlayerList(l) => assert_eq!(l.scroll, 0),
            other => panic!("unexpected {other:?}"),
        }
        assert!(stack.handle_key(KeyCode::Left));

        // Esc closes the modal; now the list sees keys.
        assert!(stack.handle_key(KeyCode::Esc));
        assert_eq!(stack.len(), 1);
        assert!(stack.handle_key(KeyCode::PageDown));
        assert!(!stack.handle_key(KeyCode::Left));
    }

    #[test]
    fn render_skips_components_beneath_modal() {
        let mut stack = OverlayStack::new(80, 24);
        stack.mount(ComponentKind::PlayerList(PlayerList {
            names: vec!["zed".into()],
            scroll: 0,
        }));
        stack.mount(ComponentKind::Help(HelpModal::default()));
        let mut out = Vec::new();
        assert!(stack.render_into(&mut out, false).unwrap());
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("Help"));
        assert!(!s.contains("zed"));
    }

    #[test]
    fn clean_stack_renders_only_when_forced() {
        let mut stack = OverlayStack::new(80, 24);
        stack.mount(ComponentKind::Help(HelpModal::default()));
        let mut out = Vec::new();
        assert!(stack.render_into(&mut out, false).unwrap());
        out.clear();
        assert!(!stack.render_into(&mut out, false).unwrap());
        assert!(out.is_empty());
        assert!(stack.render_into(&mut out, true).unwrap());
        assert!(!out.is_empty());
    }

    #[test]
    fn empty_stack_never_renders() {
        let mut stack = OverlayStack::new(10, 10);
        let mut out = Vec::new();
        assert!(!stack.render_into(&mut out, true).unwrap());
    }

    #[test]
    fn banners_expire() {
        let mut stack = OverlayStack::new(40, 10);
        let t0 = now();
        let id = stack.show_banner("reloading", Some(Duration::from_millis(100)), t0);
        assert_eq!(stack.show_banner("reloading", Some(Duration::from_millis(100)), t0), id);
        assert_eq!(stack.get(id).unwrap().origin.1, 9);

        stack.tick(t0 + Duration::from_millis(50));
        assert_eq!(stack.len(), 1);
        stack.tick(t0 + Duration::from_millis(100));
        assert!(stack.is_empty());
        assert!(stack.take_repair());
    }

    #[test]
    fn player_list_refresh_marks_dirty() {
        let mut stack = OverlayStack::new(80, 24);
        stack.mount(ComponentKind::PlayerList(PlayerList::default()));
        stack.render_into(&mut Vec::new(), false).unwrap();
        assert!(!stack.is_dirty());

        stack.set_players(vec!["bob".into(), "amy".into()]);
        assert!(stack.is_dirty());
        let mut out = Vec::new();
        stack.render_into(&mut out, false).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("Players (2)"));
        assert!(s.find("amy").unwrap() < s.find("bob").unwrap());

        stack.set_players(vec!["amy".into(), "bob".into()]);
        assert!(!stack.is_dirty());
    }

    #[test]
    fn toggle_mounts_then_closes() {
        let mut stack = OverlayStack::new(80, 24);
        assert!(stack.toggle(OverlayKind::Help, || ComponentKind::Help(HelpModal::default())));
        assert!(stack.top().unwrap().modal);
        assert!(!stack.toggle(OverlayKind::Help, || ComponentKind::Help(HelpModal::default())));
        assert!(stack.is_empty());
    }

    #[test]
    fn help_is_centered() {
        let mut stack = OverlayStack::new(80, 24);
        let id = stack.mount(ComponentKind::Help(HelpModal::default()));
        let c = stack.get(id).unwrap();
        assert_eq!(c.origin.0, (80 - c.buffer.width()) / 2);
        assert_eq!(c.origin.1, (24 - c.buffer.height()) / 2);
    }
}
