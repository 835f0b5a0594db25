//! Sidebar
//!
//! Numbered participants and resources. The numbers are the indices that
//! `/mute`, `/select` and `/remove` take.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use studyroom_app::RoomView;
use studyroom_proto::ResourceKind;

const SELECTED_PREFIX: &str = ">";
const UNSELECTED_PREFIX: &str = " ";
const MUTED_MARKER: &str = " [muted]";
const SELF_MARKER: &str = " (you)";

/// Render the sidebar.
pub fn render(frame: &mut Frame, room: &RoomView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let [people_area, resources_area] = chunks.as_ref() else {
        return;
    };

    render_participants(frame, room, *people_area);
    render_resources(frame, room, *resources_area);
}

fn render_participants(frame: &mut Frame, room: &RoomView, area: Rect) {
    let items: Vec<ListItem> = room
        .participants
        .iter()
        .enumerate()
        .map(|(i, participant)| {
            let name_style = if room.is_me(participant) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut spans = vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(participant.name.as_str(), name_style),
            ];
            if room.is_me(participant) {
                spans.push(Span::styled(SELF_MARKER, Style::default().fg(Color::DarkGray)));
            }
            if participant.is_muted {
                spans.push(Span::styled(MUTED_MARKER, Style::default().fg(Color::Red)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" People ({}) ", room.participants.len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn render_resources(frame: &mut Frame, room: &RoomView, area: Rect) {
    let selected = room.state.selected_resource();

    let items: Vec<ListItem> = room
        .state
        .resources()
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let (prefix, style) = if selected == Some(resource) {
                (SELECTED_PREFIX, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                (UNSELECTED_PREFIX, Style::default())
            };
            let tag = match resource.kind {
                ResourceKind::Pdf => Span::styled("pdf ", Style::default().fg(Color::Magenta)),
                ResourceKind::Youtube => Span::styled("yt  ", Style::default().fg(Color::Red)),
            };

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                tag,
                Span::styled(resource.name.as_str(), style),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Resources "));
    frame.render_widget(list, area);
}
