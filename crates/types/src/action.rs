use crate::player::Direction;

/// Everything a session can be asked to do by its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Move(Direction),
    ZoomIn,
    ZoomOut,
    CycleRenderMode,
    Brighter,
    Dimmer,
    ToggleHelp,
    TogglePlayerList,
    TogglePrediction,
    Quit,
}
