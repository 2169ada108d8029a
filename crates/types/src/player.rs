//! Player visual state.

/// Stable player identifier assigned by the session layer.
pub type PlayerId = String;

/// Cardinal facing direction. `Down` is +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit step in world tiles.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Counter-clockwise quarter turn.
    pub fn turn_left(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Clockwise quarter turn.
    pub fn turn_right(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "north" => Some(Direction::Up),
            "down" | "south" => Some(Direction::Down),
            "left" | "west" => Some(Direction::Left),
            "right" | "east" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// What a session needs to draw one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerVisualState {
    pub id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    /// Index into the current direction's frame list.
    pub frame: usize,
    pub moving: bool,
}

impl PlayerVisualState {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x,
            y,
            direction: Direction::Down,
            frame: 0,
            moving: false,
        }
    }

    /// The tile one step ahead in the facing direction.
    pub fn ahead(&self) -> (i32, i32) {
        let (dx, dy) = self.direction.delta();
        (self.x + dx, self.y + dy)
    }
}
