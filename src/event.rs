use crate::index::EntryIndex;

/// Events that can occur in the application
/// Handlers return these events instead of mutating app state directly
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // Source events
    EntriesUpdated(EntryIndex),
    SourceFailed {
        message: String,
        truncated: bool,
    },
    Reload,

    // Navigation events
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    JumpToStart,
    JumpToEnd,

    // Mode toggles
    ToggleFollowMode,
    ToggleReverse,

    // Filter events
    StartFilterInput,
    FilterInputChar(char),
    FilterInputBackspace,
    FilterInputSubmit,
    FilterInputCancel,
    ToggleFilterMode, // Tab in filter input - switch Plain/Regex
    ClearFilter,
    FilterComplete {
        matches: EntryIndex,
        start: usize,
        scanned: usize,
    },
    FilterError(String),

    // Row inspector
    OpenRow,
    CloseRow,
    InspectorDown,
    InspectorUp,

    // Help mode
    ShowHelp,
    HideHelp,

    // Error view
    Acknowledge,

    // System events
    Quit,
}
