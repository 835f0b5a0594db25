//! Preview and assistant panel
//!
//! Shows the selected resource, the local study topic and the assistant
//! transcript, newest exchange last.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use studyroom_app::{App, AssistantEntry};
use studyroom_proto::http::ServiceKind;

const PREVIEW_HEIGHT: u16 = 6;
const BORDER_SIZE: u16 = 2;

/// Render the panel.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(PREVIEW_HEIGHT), Constraint::Min(0)])
        .split(area);

    let [preview_area, assistant_area] = chunks.as_ref() else {
        return;
    };

    render_preview(frame, app, *preview_area);
    render_assistant(frame, app.transcript(), *assistant_area);
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines = match app.room().state.selected_resource() {
        Some(resource) => vec![
            Line::from(Span::styled(
                resource.name.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(format!("{} {}", resource.kind, resource.url), dim)),
        ],
        None => vec![Line::from(Span::styled("Nothing selected (/select <n>)", dim))],
    };

    if let Some(topic) = app.topic() {
        lines.push(Line::from(vec![Span::styled("Topic: ", dim), Span::raw(topic)]));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Preview "));
    frame.render_widget(paragraph, area);
}

fn entry_lines(entry: &AssistantEntry) -> Vec<Line<'_>> {
    let heading = match (entry.kind, &entry.prompt) {
        (ServiceKind::Chat, Some(prompt)) => format!("? {prompt}"),
        (kind, _) => format!("[{}]", kind.label()),
    };

    let mut lines = vec![Line::from(Span::styled(
        heading,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))];
    lines.extend(entry.reply.lines().map(Line::from));
    lines.push(Line::default());
    lines
}

fn render_assistant(frame: &mut Frame, transcript: &[AssistantEntry], area: Rect) {
    let lines: Vec<Line> = if transcript.is_empty() {
        vec![Line::from(Span::styled(
            "/ask, /summary, /questions or /audio",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        transcript.iter().flat_map(entry_lines).collect()
    };

    // Scroll by unwrapped lines; long replies may still push the tail off screen
    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let scroll = lines.len().saturating_sub(visible_height) as u16;

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Assistant "));
    frame.render_widget(paragraph, area);
}
