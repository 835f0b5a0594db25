//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! drawing into the frame.

mod chat;
mod input;
mod panel;
mod sidebar;
mod status;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};
use studyroom_app::App;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    input::render(frame, app.input(), *input_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (sidebar + chat + preview panel).
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    const SIDEBAR_WIDTH: u16 = 28;
    const CHAT_AREA_MIN_WIDTH: u16 = 20;
    const PANEL_WIDTH_PERCENT: u16 = 35;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Min(CHAT_AREA_MIN_WIDTH),
            Constraint::Percentage(PANEL_WIDTH_PERCENT),
        ])
        .split(area);

    let [sidebar_area, chat_area, panel_area] = chunks.as_ref() else {
        return;
    };

    sidebar::render(frame, app.room(), *sidebar_area);
    chat::render(frame, app.room(), *chat_area);
    panel::render(frame, app, *panel_area);
}
