//! Status bar
//!
//! Displays connection state, the room and the latest toast.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use studyroom_app::{App, ConnectionState, ToastLevel};

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let connection_status = match app.connection_state() {
        ConnectionState::Disconnected => {
            Span::styled("Disconnected", Style::default().fg(Color::Red))
        },
        ConnectionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionState::Connected { .. } => Span::styled(
            "Connected",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Failed { .. } => Span::styled(
            "Failed",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let room = app.room();
    let role = if room.is_host { "host" } else { "guest" };
    let resource_count = room.state.resources().len();
    let room_info = format!(" | Room: {} ({role}) | Resources: {resource_count} ", room.room_id);

    let mut spans =
        vec![Span::raw(" "), connection_status, Span::styled(room_info, Style::default())];

    if let Some(toast) = app.latest_toast() {
        let color = match toast.level {
            ToastLevel::Info => Color::Cyan,
            ToastLevel::Error => Color::LightRed,
        };
        spans.push(Span::raw("| "));
        spans.push(Span::styled(toast.to_string(), Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
