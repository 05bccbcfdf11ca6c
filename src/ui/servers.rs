use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{ListItem, ListState, Paragraph},
};

use yokai::models::StreamSource;

use super::widgets::{selectable_list, titled_block};

pub fn render_servers_view(
    frame: &mut Frame,
    area: Rect,
    heading: &str,
    servers: &[StreamSource],
    list_state: &mut ListState,
    accent: Color,
) {
    if servers.is_empty() {
        let empty = Paragraph::new("No playable servers.")
            .block(titled_block(heading, accent))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = servers
        .iter()
        .enumerate()
        .map(|(i, server)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("Server {:>2}", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(" │ "),
                Span::styled(server.host_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]))
        })
        .collect();

    frame.render_stateful_widget(selectable_list(items, heading, accent), area, list_state);
}
