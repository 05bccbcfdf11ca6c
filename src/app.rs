use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, ListState, Row, Table},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use yokai::Scraper;
use yokai::config::Config;
use yokai::error::Result;
use yokai::models::{AnimeDetail, CatalogEntry, EpisodePage, StreamSource};

use crate::player::ExternalPlayer;
use crate::ui::catalog::{MENU_ITEMS, SearchViewState};
use crate::ui::{
    render_episodes_view, render_latest_view, render_menu_view, render_search_view,
    render_servers_view, widgets,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Menu,
    Latest,
    Search,
    Episodes,
    Servers,
    Help,
}

/// The episode a server list belongs to.
#[derive(Debug, Clone)]
pub struct EpisodeRef {
    pub slug: String,
    pub title: String,
    pub episode: String,
}

/// Replies from engine tasks. Each carries the request it answers so that
/// a reply for a view the user has already left can be dropped.
pub enum AppMessage {
    Latest(Vec<CatalogEntry>),
    SearchResults {
        query: String,
        page: u32,
        results: Vec<AnimeDetail>,
    },
    Detail {
        slug: String,
        detail: AnimeDetail,
    },
    Episodes {
        slug: String,
        page: EpisodePage,
    },
    Servers {
        slug: String,
        episode: String,
        servers: Vec<StreamSource>,
    },
    StreamResolved(String),
    Failed(String),
}

pub struct App {
    pub running: bool,
    pub view: View,
    pub previous_view: View,
    pub accent: Color,

    pub menu_state: ListState,

    pub latest: Vec<CatalogEntry>,
    pub latest_state: ListState,

    pub search_query: String,
    pub search_page: u32,
    pub search_editing: bool,
    pub search_results: Vec<AnimeDetail>,
    pub search_state: ListState,
    pub search_request: Option<(String, u32)>,

    pub anime_slug: String,
    pub anime_return: View,
    pub anime: Option<AnimeDetail>,
    pub episodes: Option<EpisodePage>,
    pub episodes_requested: u32,
    pub episodes_state: ListState,

    pub servers_for: Option<EpisodeRef>,
    pub servers_return: View,
    pub servers: Vec<StreamSource>,
    pub servers_state: ListState,

    pub loading: Option<&'static str>,
    pub pending: usize,
    pub error: Option<String>,

    pub msg_tx: mpsc::UnboundedSender<AppMessage>,
    pub msg_rx: mpsc::UnboundedReceiver<AppMessage>,

    pub scraper: Arc<Scraper>,
    pub player: ExternalPlayer,
}

impl App {
    pub fn new(config: &Config, scraper: Scraper) -> Self {
        let accent = widgets::parse_accent_color(&config.ui.accent_color);
        let player = ExternalPlayer::new(
            config.general.player.clone(),
            config.general.player_args.clone(),
        );

        let mut menu_state = ListState::default();
        menu_state.select(Some(0));

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        Self {
            running: true,
            view: View::Menu,
            previous_view: View::Menu,
            accent,

            menu_state,

            latest: Vec::new(),
            latest_state: ListState::default(),

            search_query: String::new(),
            search_page: 1,
            search_editing: true,
            search_results: Vec::new(),
            search_state: ListState::default(),
            search_request: None,

            anime_slug: String::new(),
            anime_return: View::Menu,
            anime: None,
            episodes: None,
            episodes_requested: 1,
            episodes_state: ListState::default(),

            servers_for: None,
            servers_return: View::Latest,
            servers: Vec::new(),
            servers_state: ListState::default(),

            loading: None,
            pending: 0,
            error: None,

            msg_tx,
            msg_rx,

            scraper: Arc::new(scraper),
            player,
        }
    }

    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        while self.running {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
            self.process_messages();
        }
        Ok(())
    }

    fn process_messages(&mut self) {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            if self.pending == 0 {
                self.loading = None;
            }
            match msg {
                AppMessage::Latest(entries) => {
                    info!(count = entries.len(), "Loaded recent updates");
                    self.latest = entries;
                    select_first(&mut self.latest_state, self.latest.len());
                }
                AppMessage::SearchResults { query, page, results } => {
                    if self.search_request.as_ref() != Some(&(query, page)) {
                        debug!("Dropping stale search results");
                        continue;
                    }
                    self.search_results = results;
                    select_first(&mut self.search_state, self.search_results.len());
                }
                AppMessage::Detail { slug, detail } => {
                    if slug != self.anime_slug {
                        debug!(slug = %slug, "Dropping stale anime detail");
                        continue;
                    }
                    self.anime = Some(detail);
                }
                AppMessage::Episodes { slug, page } => {
                    if slug != self.anime_slug || page.page != self.episodes_requested {
                        debug!(slug = %slug, page = page.page, "Dropping stale episode page");
                        continue;
                    }
                    select_first(&mut self.episodes_state, page.episodes.len());
                    self.episodes = Some(page);
                }
                AppMessage::Servers { slug, episode, servers } => {
                    let current = self
                        .servers_for
                        .as_ref()
                        .is_some_and(|ep| ep.slug == slug && ep.episode == episode);
                    if !current {
                        debug!(slug = %slug, episode = %episode, "Dropping stale server list");
                        continue;
                    }
                    self.servers = servers;
                    select_first(&mut self.servers_state, self.servers.len());
                }
                AppMessage::StreamResolved(url) => {
                    if let Err(e) = self.player.play(&url) {
                        error!("Failed to start player: {}", e);
                        self.error = Some(e.to_string());
                    }
                }
                AppMessage::Failed(err) => {
                    self.error = Some(err);
                }
            }
        }
    }

    /// Run an engine call off the UI thread and post its result back.
    fn spawn_task<T, Fut>(
        &mut self,
        what: &'static str,
        task: impl FnOnce(Arc<Scraper>) -> Fut,
        wrap: impl FnOnce(T) -> AppMessage + Send + 'static,
    ) where
        T: Send + 'static,
        Fut: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        self.loading = Some(what);
        self.pending += 1;
        self.error = None;

        let fut = task(self.scraper.clone());
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = match fut.await {
                Ok(value) => wrap(value),
                Err(e) => {
                    error!("{} failed: {}", what, e);
                    AppMessage::Failed(e.to_string())
                }
            };
            let _ = tx.send(msg);
        });
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let main_area = chunks[0];
        let status_area = chunks[1];
        let help_area = chunks[2];

        let current = if self.view == View::Help {
            self.previous_view
        } else {
            self.view
        };
        self.render_view(frame, main_area, current);

        if self.view == View::Help {
            self.render_help(frame);
        }

        frame.render_widget(
            widgets::status_line(self.loading, self.error.as_deref()),
            status_area,
        );

        let hints: &[(&str, &str)] = match self.view {
            View::Menu => &[("Enter", "select"), ("?", "help"), ("q", "quit")],
            View::Search if self.search_editing => &[("Enter", "search"), ("Esc", "back")],
            View::Search => &[
                ("Enter", "episodes"),
                ("/", "edit"),
                ("←/→", "page"),
                ("Esc", "back"),
            ],
            View::Episodes => &[
                ("Enter", "servers"),
                ("←/→", "page"),
                ("?", "help"),
                ("Esc", "back"),
            ],
            View::Latest => &[
                ("Enter", "servers"),
                ("e", "episodes"),
                ("r", "refresh"),
                ("Esc", "back"),
            ],
            View::Servers => &[("Enter", "play"), ("?", "help"), ("Esc", "back")],
            View::Help => &[("Esc", "close")],
        };
        frame.render_widget(widgets::help_bar(hints), help_area);
    }

    fn render_view(&mut self, frame: &mut Frame, area: Rect, view: View) {
        match view {
            View::Menu | View::Help => {
                render_menu_view(frame, area, &mut self.menu_state, self.accent);
            }
            View::Latest => {
                render_latest_view(frame, area, &self.latest, &mut self.latest_state, self.accent);
            }
            View::Search => {
                let search = SearchViewState {
                    query: &self.search_query,
                    page: self.search_page,
                    editing: self.search_editing,
                    loading: self.loading.is_some(),
                };
                render_search_view(
                    frame,
                    area,
                    search,
                    &self.search_results,
                    &mut self.search_state,
                    self.accent,
                );
            }
            View::Episodes => {
                render_episodes_view(
                    frame,
                    area,
                    self.anime.as_ref(),
                    self.episodes.as_ref(),
                    &mut self.episodes_state,
                    self.accent,
                );
            }
            View::Servers => {
                let heading = match &self.servers_for {
                    Some(ep) => format!("{} - Episode {}", ep.title, ep.episode),
                    None => "Servers".to_string(),
                };
                render_servers_view(
                    frame,
                    area,
                    &heading,
                    &self.servers,
                    &mut self.servers_state,
                    self.accent,
                );
            }
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    self.running = false;
                    return Ok(());
                }

                match self.view {
                    View::Menu => self.handle_menu_input(key.code),
                    View::Latest => self.handle_latest_input(key.code),
                    View::Search => self.handle_search_input(key),
                    View::Episodes => self.handle_episodes_input(key.code),
                    View::Servers => self.handle_servers_input(key.code),
                    View::Help => self.handle_help_input(key.code),
                }
            }
        }
        Ok(())
    }

    fn handle_menu_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('j') | KeyCode::Down => move_down(&mut self.menu_state, MENU_ITEMS.len()),
            KeyCode::Char('k') | KeyCode::Up => move_up(&mut self.menu_state, MENU_ITEMS.len()),
            KeyCode::Char('/') => self.open_search(),
            KeyCode::Char('?') => self.toggle_help(),
            KeyCode::Enter => match self.menu_state.selected() {
                Some(0) => self.open_latest(),
                Some(1) => self.open_search(),
                Some(2) => self.running = false,
                _ => {}
            },
            _ => {}
        }
    }

    fn handle_latest_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Esc => self.view = View::Menu,
            KeyCode::Char('j') | KeyCode::Down => move_down(&mut self.latest_state, self.latest.len()),
            KeyCode::Char('k') | KeyCode::Up => move_up(&mut self.latest_state, self.latest.len()),
            KeyCode::Char('r') => self.open_latest(),
            KeyCode::Char('/') => self.open_search(),
            KeyCode::Char('?') => self.toggle_help(),
            KeyCode::Enter => {
                if let Some(entry) = self.latest_state.selected().and_then(|i| self.latest.get(i)) {
                    let episode = EpisodeRef {
                        slug: entry.slug.clone(),
                        title: entry.title.clone(),
                        episode: entry.episode_label.clone(),
                    };
                    self.open_servers(episode, View::Latest);
                }
            }
            KeyCode::Char('e') => {
                if let Some(entry) = self.latest_state.selected().and_then(|i| self.latest.get(i)) {
                    let slug = entry.slug.clone();
                    self.open_anime(slug, View::Latest);
                }
            }
            _ => {}
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        if self.search_editing {
            match key.code {
                KeyCode::Esc => {
                    if self.search_results.is_empty() {
                        self.view = View::Menu;
                    } else {
                        self.search_editing = false;
                    }
                }
                KeyCode::Enter => {
                    self.search_page = 1;
                    self.perform_search();
                }
                KeyCode::Backspace => {
                    self.search_query.pop();
                }
                KeyCode::Char(c) => self.search_query.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Esc => self.view = View::Menu,
            KeyCode::Char('/') => self.search_editing = true,
            KeyCode::Char('?') => self.toggle_help(),
            KeyCode::Char('j') | KeyCode::Down => {
                move_down(&mut self.search_state, self.search_results.len())
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_up(&mut self.search_state, self.search_results.len())
            }
            KeyCode::Right | KeyCode::Char('l') if !self.search_results.is_empty() => {
                self.search_page += 1;
                self.perform_search();
            }
            KeyCode::Left | KeyCode::Char('h') if self.search_page > 1 => {
                self.search_page -= 1;
                self.perform_search();
            }
            KeyCode::Enter => {
                if let Some(anime) = self
                    .search_state
                    .selected()
                    .and_then(|i| self.search_results.get(i))
                {
                    let slug = anime.slug.clone();
                    self.open_anime(slug, View::Search);
                }
            }
            _ => {}
        }
    }

    fn handle_episodes_input(&mut self, key: KeyCode) {
        let len = self.episodes.as_ref().map(|p| p.episodes.len()).unwrap_or(0);
        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Esc => self.view = self.anime_return,
            KeyCode::Char('j') | KeyCode::Down => move_down(&mut self.episodes_state, len),
            KeyCode::Char('k') | KeyCode::Up => move_up(&mut self.episodes_state, len),
            KeyCode::Char('?') => self.toggle_help(),
            KeyCode::Right | KeyCode::Char('l') => {
                let total = self.episodes.as_ref().map(|p| p.total_pages).unwrap_or(0);
                if self.episodes_requested < total {
                    self.load_episode_page(self.episodes_requested + 1);
                }
            }
            KeyCode::Left | KeyCode::Char('h') if self.episodes_requested > 1 => {
                self.load_episode_page(self.episodes_requested - 1);
            }
            KeyCode::Enter => {
                let selected = self
                    .episodes
                    .as_ref()
                    .zip(self.episodes_state.selected())
                    .and_then(|(page, i)| page.episodes.get(i));
                if let Some(ep) = selected {
                    let title = self
                        .anime
                        .as_ref()
                        .map(|a| a.title.clone())
                        .unwrap_or_else(|| ep.title.clone());
                    let episode = EpisodeRef {
                        slug: self.anime_slug.clone(),
                        title,
                        episode: ep.episode_label.clone(),
                    };
                    self.open_servers(episode, View::Episodes);
                }
            }
            _ => {}
        }
    }

    fn handle_servers_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Esc => self.view = self.servers_return,
            KeyCode::Char('j') | KeyCode::Down => move_down(&mut self.servers_state, self.servers.len()),
            KeyCode::Char('k') | KeyCode::Up => move_up(&mut self.servers_state, self.servers.len()),
            KeyCode::Char('?') => self.toggle_help(),
            KeyCode::Enter => {
                if let Some(server) = self.servers_state.selected().and_then(|i| self.servers.get(i)) {
                    let host = server.host_name.clone();
                    let token = server.token.clone();
                    info!(host = %host, player = %self.player.command(), "Resolving stream");
                    self.spawn_task(
                        "Resolving stream",
                        move |scraper| async move {
                            let url = scraper.resolve_stream(&host, &token).await?;
                            Ok(url.to_string())
                        },
                        AppMessage::StreamResolved,
                    );
                }
            }
            _ => {}
        }
    }

    fn handle_help_input(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            self.toggle_help();
        }
    }

    fn open_latest(&mut self) {
        self.view = View::Latest;
        self.spawn_task(
            "Loading recent updates",
            |scraper| async move { scraper.list_latest().await },
            AppMessage::Latest,
        );
    }

    fn open_search(&mut self) {
        self.view = View::Search;
        self.search_editing = true;
    }

    fn perform_search(&mut self) {
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.search_editing = false;
        self.search_results.clear();
        self.search_state.select(None);

        let page = self.search_page;
        self.search_request = Some((query.clone(), page));
        let key = query.clone();
        self.spawn_task(
            "Searching",
            move |scraper| async move { scraper.search(&query, page).await },
            move |results| AppMessage::SearchResults {
                query: key,
                page,
                results,
            },
        );
    }

    fn open_anime(&mut self, slug: String, from: View) {
        self.view = View::Episodes;
        self.anime_return = from;
        self.anime_slug = slug.clone();
        self.anime = None;
        self.episodes = None;
        self.episodes_state.select(None);

        let key = slug.clone();
        self.spawn_task(
            "Loading anime",
            move |scraper| async move { scraper.get_detail(&slug).await },
            move |detail| AppMessage::Detail { slug: key, detail },
        );
        self.load_episode_page(1);
    }

    fn load_episode_page(&mut self, page: u32) {
        let slug = self.anime_slug.clone();
        let key = slug.clone();
        self.episodes_requested = page.max(1);
        self.spawn_task(
            "Loading episodes",
            move |scraper| async move { scraper.get_episode_page(&slug, page).await },
            move |page| AppMessage::Episodes { slug: key, page },
        );
    }

    fn open_servers(&mut self, episode: EpisodeRef, from: View) {
        self.view = View::Servers;
        self.servers_return = from;
        self.servers.clear();
        self.servers_state.select(None);

        let slug = episode.slug.clone();
        let number = episode.episode.clone();
        let (key_slug, key_episode) = (slug.clone(), number.clone());
        self.servers_for = Some(episode);
        self.spawn_task(
            "Loading servers",
            move |scraper| async move { scraper.get_servers(&slug, &number).await },
            move |servers| AppMessage::Servers {
                slug: key_slug,
                episode: key_episode,
                servers,
            },
        );
    }

    fn toggle_help(&mut self) {
        if self.view == View::Help {
            self.view = self.previous_view;
        } else {
            self.previous_view = self.view;
            self.view = View::Help;
        }
    }

    fn render_help(&self, frame: &mut Frame) {
        let area = frame.area();
        let dialog_area = Rect {
            x: area.width.saturating_sub(60) / 2,
            y: area.height.saturating_sub(18) / 2,
            width: area.width.min(60),
            height: area.height.min(18),
        };

        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.accent));

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let rows = vec![
            Row::new(vec!["Global", "?", "Toggle Help"]),
            Row::new(vec!["", "q", "Quit"]),
            Row::new(vec!["", "j/k", "Navigate"]),
            Row::new(vec!["", "Esc", "Back"]),
            Row::new(vec!["Menu", "Enter", "Open"]),
            Row::new(vec!["", "/", "Search"]),
            Row::new(vec!["Recent", "Enter", "Servers"]),
            Row::new(vec!["", "e", "Anime Episodes"]),
            Row::new(vec!["", "r", "Refresh"]),
            Row::new(vec!["Search", "Enter", "Anime Episodes"]),
            Row::new(vec!["", "←/→", "Result Page"]),
            Row::new(vec!["Episodes", "Enter", "Servers"]),
            Row::new(vec!["", "←/→", "Episode Page"]),
            Row::new(vec!["Servers", "Enter", "Play"]),
        ];

        let table = Table::new(
            rows,
            &[
                Constraint::Percentage(25),
                Constraint::Percentage(20),
                Constraint::Percentage(55),
            ],
        )
        .header(
            Row::new(vec!["Context", "Key", "Action"]).style(
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(self.accent),
            ),
        )
        .block(Block::default().borders(Borders::NONE));

        frame.render_widget(table, inner);
    }
}

fn select_first(state: &mut ListState, len: usize) {
    state.select(if len == 0 { None } else { Some(0) });
}

fn move_down(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let next = match state.selected() {
        Some(i) => (i + 1).min(len - 1),
        None => 0,
    };
    state.select(Some(next));
}

fn move_up(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let prev = match state.selected() {
        Some(i) => i.saturating_sub(1).min(len - 1),
        None => 0,
    };
    state.select(Some(prev));
}

pub fn init_terminal() -> io::Result<DefaultTerminal> {
    Ok(ratatui::init())
}

pub fn restore_terminal() -> io::Result<()> {
    ratatui::restore();
    Ok(())
}
