use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListItem, ListState, Paragraph},
};

use yokai::models::{AnimeDetail, CatalogEntry};

use super::widgets::{selectable_list, titled_block, truncate};

pub const MENU_ITEMS: [(&str, &str); 3] = [
    ("Recent updates", "Episodes aired in the last few days"),
    ("Search", "Find an anime by name"),
    ("Quit", "Leave yokai"),
];

pub fn render_menu_view(frame: &mut Frame, area: Rect, list_state: &mut ListState, accent: Color) {
    let items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .map(|(title, description)| {
            ListItem::new(vec![
                Line::from(Span::styled(*title, Style::default().add_modifier(Modifier::BOLD))),
                Line::from(Span::styled(
                    format!("  {}", description),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    frame.render_stateful_widget(selectable_list(items, "yokai", accent), area, list_state);
}

pub fn render_latest_view(
    frame: &mut Frame,
    area: Rect,
    entries: &[CatalogEntry],
    list_state: &mut ListState,
    accent: Color,
) {
    let title_width = area.width.saturating_sub(20) as usize;

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let episode = if entry.episode_label.is_empty() {
                Span::styled("   --", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(
                    format!("{:>5}", entry.episode_label),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )
            };

            ListItem::new(Line::from(vec![
                episode,
                Span::raw(" │ "),
                Span::raw(truncate(&entry.title, title_width)),
            ]))
        })
        .collect();

    frame.render_stateful_widget(
        selectable_list(items, "Recent updates", accent),
        area,
        list_state,
    );
}

pub struct SearchViewState<'a> {
    pub query: &'a str,
    pub page: u32,
    pub editing: bool,
    pub loading: bool,
}

pub fn render_search_view(
    frame: &mut Frame,
    area: Rect,
    search: SearchViewState,
    results: &[AnimeDetail],
    list_state: &mut ListState,
    accent: Color,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let title = if search.loading {
        " Search (loading...) "
    } else {
        " Search "
    };

    let input = Paragraph::new(search.query)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent))
                .title(title)
                .title_style(Style::default().fg(accent).add_modifier(Modifier::BOLD)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(input, chunks[0]);

    if search.editing {
        let cursor = search.query.chars().count() as u16;
        frame.set_cursor_position((chunks[0].x + cursor + 1, chunks[0].y + 1));
    }

    if results.is_empty() {
        let empty = Paragraph::new("No results. Type a name and press Enter.")
            .block(titled_block("Results", accent))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let title_width = chunks[1].width.saturating_sub(34) as usize;

    let items: Vec<ListItem> = results
        .iter()
        .map(|anime| {
            let kind = anime
                .attributes
                .get("type")
                .map(|a| a.joined(", "))
                .unwrap_or_default();
            let status = anime
                .attributes
                .get("status")
                .map(|a| a.joined(", "))
                .unwrap_or_default();

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<8}", truncate(&kind, 8)), Style::default().fg(Color::Cyan)),
                Span::raw(" │ "),
                Span::styled(
                    format!("{:<12}", truncate(&status, 12)),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(" │ "),
                Span::raw(truncate(&anime.title, title_width)),
            ]))
        })
        .collect();

    let title = format!("Results - page {}", search.page.max(1));
    frame.render_stateful_widget(selectable_list(items, &title, accent), chunks[1], list_state);
}
