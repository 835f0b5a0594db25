//! Chat area
//!
//! Displays the room's messages, newest at the bottom.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use studyroom_app::RoomView;

const BORDER_SIZE: u16 = 2;

/// Render the chat area.
pub fn render(frame: &mut Frame, room: &RoomView, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(" #{} ", room.room_id));

    let messages = room.state.messages();
    let items: Vec<ListItem> = if messages.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No messages yet. Type to chat, /help for commands",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        messages
            .iter()
            .map(|msg| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("<{}>", msg.sender),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::raw(msg.content.as_str()),
                ]))
            })
            .collect()
    };

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
