#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Navigate(Direction),
    Kill(u32),
    ForceKill(u32),
    EnterFilterMode,
    ExitFilterMode,
    ClearFilter,
    UpdateFilter(String),
    ClearSelection,
    ToggleHelp,
    CycleSort,
    ReverseSort,
    AdjustThreshold(f32),
    Refresh,
    SelectRow(u16),
    None,
}
