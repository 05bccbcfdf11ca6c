use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{ListItem, ListState, Paragraph, Wrap},
};

use yokai::models::{AnimeDetail, EpisodePage};

use super::widgets::{selectable_list, titled_block, truncate};

/// Attribute keys shown in the header, in display order.
const HEADER_KEYS: &[&str] = &["tipo", "type", "estado", "status", "genero", "género", "estudios", "emitido"];

fn detail_header(detail: &AnimeDetail, accent: Color) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        detail.title.clone(),
        Style::default().fg(accent).add_modifier(Modifier::BOLD),
    ))];

    let facts: Vec<Span> = HEADER_KEYS
        .iter()
        .filter_map(|key| detail.attributes.get(*key).map(|a| (*key, a.joined(", "))))
        .flat_map(|(key, value)| {
            vec![
                Span::styled(format!("{}: ", key), Style::default().fg(Color::DarkGray)),
                Span::raw(value),
                Span::raw("  "),
            ]
        })
        .collect();
    if !facts.is_empty() {
        lines.push(Line::from(facts));
    }

    if !detail.synopsis.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(detail.synopsis.clone()));
    }
    lines
}

pub fn render_episodes_view(
    frame: &mut Frame,
    area: Rect,
    detail: Option<&AnimeDetail>,
    page: Option<&EpisodePage>,
    list_state: &mut ListState,
    accent: Color,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(3)])
        .split(area);

    let header = match detail {
        Some(detail) => Paragraph::new(detail_header(detail, accent)),
        None => Paragraph::new("Loading anime...").style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(
        header
            .block(titled_block("Anime", accent))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    let Some(page) = page else {
        let empty = Paragraph::new("Loading episodes...")
            .block(titled_block("Episodes", accent))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[1]);
        return;
    };

    let title_width = chunks[1].width.saturating_sub(14) as usize;

    let items: Vec<ListItem> = page
        .episodes
        .iter()
        .map(|ep| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>4}", ep.episode_label),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" - "),
                Span::raw(truncate(&ep.title, title_width)),
            ]))
        })
        .collect();

    let title = format!(
        "Episodes - page {}/{} ({} total, last {})",
        page.page,
        page.total_pages.max(1),
        page.total_episodes,
        page.last_episode
    );
    frame.render_stateful_widget(selectable_list(items, &title, accent), chunks[1], list_state);
}
