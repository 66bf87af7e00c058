use crate::app::{App, InputMode};
use crate::event::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle keyboard input and return corresponding events
/// Does not mutate app state directly - returns events to be processed
pub fn handle_input_event(key: KeyEvent, app: &App) -> Vec<AppEvent> {
    if is_ctrl_c(&key) {
        return vec![AppEvent::Quit];
    }

    // An error must be acknowledged before anything else
    if app.is_error() {
        return vec![AppEvent::Acknowledge];
    }

    if app.show_help {
        return handle_help_mode(key);
    }

    if app.is_viewing_row() {
        return handle_inspector_mode(key);
    }

    match app.input_mode {
        InputMode::EnteringFilter => handle_filter_input_mode(key),
        InputMode::Normal => handle_normal_mode(key),
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Handle keyboard input when help overlay is showing
fn handle_help_mode(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Char('q') => vec![AppEvent::Quit],
        // Any other key hides help
        _ => vec![AppEvent::HideHelp],
    }
}

/// Handle keyboard input while the row inspector is open
fn handle_inspector_mode(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => vec![AppEvent::CloseRow],
        KeyCode::Down | KeyCode::Char('j') => vec![AppEvent::InspectorDown],
        KeyCode::Up | KeyCode::Char('k') => vec![AppEvent::InspectorUp],
        _ => vec![],
    }
}

/// Handle keyboard input in filter input mode
fn handle_filter_input_mode(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Char(c) => vec![AppEvent::FilterInputChar(c)],
        KeyCode::Backspace => vec![AppEvent::FilterInputBackspace],
        KeyCode::Enter => vec![AppEvent::FilterInputSubmit],
        KeyCode::Esc => vec![AppEvent::FilterInputCancel],
        KeyCode::Tab => vec![AppEvent::ToggleFilterMode],
        _ => vec![],
    }
}

/// Handle keyboard input in normal navigation mode
fn handle_normal_mode(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Char('q') => vec![AppEvent::Quit],
        KeyCode::Down | KeyCode::Char('j') => vec![AppEvent::ScrollDown],
        KeyCode::Up | KeyCode::Char('k') => vec![AppEvent::ScrollUp],
        KeyCode::PageDown => vec![AppEvent::PageDown],
        KeyCode::PageUp => vec![AppEvent::PageUp],
        KeyCode::Home | KeyCode::Char('g') => vec![AppEvent::JumpToStart],
        KeyCode::End | KeyCode::Char('G') => vec![AppEvent::JumpToEnd],
        KeyCode::Char('f') => vec![AppEvent::ToggleFollowMode],
        KeyCode::Char('r') => vec![AppEvent::ToggleReverse],
        KeyCode::Char('R') => vec![AppEvent::Reload],
        KeyCode::Char('/') => vec![AppEvent::StartFilterInput],
        KeyCode::Enter => vec![AppEvent::OpenRow],
        KeyCode::Char('?') => vec![AppEvent::ShowHelp],
        KeyCode::Esc => vec![AppEvent::ClearFilter],
        _ => vec![],
    }
}
