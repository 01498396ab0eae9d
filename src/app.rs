use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use finhot::{
    Bookmarks, ClientConfig, CriteriaPatch, DraftWorkflow, Event, FeedController, FeedPhase,
    GenerateOutcome, HealthMonitor, OpenOutcome, RefreshOutcome, SourceType,
};

use crate::commands::{build_client, load_bookmarks};
use crate::events::AppEvent;
use crate::ui::{popup_area, render_detail, render_export, EventsView};

const HOTNESS_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

pub struct App {
    api_url: String,
    feed: FeedController,
    drafts: DraftWorkflow,
    health: HealthMonitor,
    bookmarks: Bookmarks,
    events_view: EventsView,
    refresh_interval: Duration,
    health_interval: Duration,
    auto_refresh: bool,
    input_mode: InputMode,
    search_input: String,
    notice: Option<String>,
    export_preview: Option<String>,
    show_help: bool,
    help_scroll: u16,
    should_quit: bool,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        let api = build_client(config)?;
        let feed = FeedController::new(Arc::clone(&api));
        let drafts = DraftWorkflow::new(Arc::clone(&api), feed.clone());
        let health = HealthMonitor::new(api);
        let bookmarks = load_bookmarks(config).await;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Self {
            api_url: config.api_url.clone(),
            feed,
            drafts,
            health,
            bookmarks,
            events_view: EventsView::new(),
            refresh_interval: config.refresh_interval,
            health_interval: config.health_interval,
            auto_refresh: config.auto_refresh,
            input_mode: InputMode::Normal,
            search_input: String::new(),
            notice: None,
            export_preview: None,
            show_help: false,
            help_scroll: 0,
            should_quit: false,
            event_tx,
            event_rx,
        })
    }

    pub async fn run(&mut self, terminal: &mut ratatui::Terminal<impl ratatui::backend::Backend>) -> Result<()> {
        self.spawn_refresh();
        let health = self.health.clone();
        tokio::spawn(async move {
            health.poll_once().await;
        });

        self.health.start(self.health_interval);
        if self.auto_refresh {
            self.feed.start_auto_refresh(self.refresh_interval);
        }
        tracing::info!(api_url = %self.api_url, auto_refresh = self.auto_refresh, "dashboard started");

        let result = self.event_loop(terminal).await;

        self.feed.shutdown();
        self.health.stop();
        tracing::info!("dashboard stopped");

        result
    }

    async fn event_loop(&mut self, terminal: &mut ratatui::Terminal<impl ratatui::backend::Backend>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;

            // Settle background requests (non-blocking)
            while let Ok(event) = self.event_rx.try_recv() {
                self.handle_app_event(event);
            }

            if event::poll(Duration::from_millis(50))? {
                if let TermEvent::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code).await;
                    }
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    fn spawn_refresh(&self) {
        let request = self.feed.refresh();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tx.send(AppEvent::Refreshed(request.await)).ok();
        });
    }

    fn spawn_open(&self, id: String) {
        let request = self.drafts.open(&id);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = request.await;
            tx.send(AppEvent::Opened { id, outcome }).ok();
        });
    }

    fn spawn_generate(&mut self) {
        match self.drafts.generate() {
            Ok(request) => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tx.send(AppEvent::Generated(request.await)).ok();
                });
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Refreshed(RefreshOutcome::Loaded { count }) => {
                self.notice = None;
                tracing::debug!(count, "dashboard list updated");
            }
            AppEvent::Refreshed(RefreshOutcome::Failed(_)) | AppEvent::Refreshed(RefreshOutcome::Stale) => {
                // Feed status carries the error banner
            }
            AppEvent::Opened { id, outcome } => match outcome {
                OpenOutcome::Opened(_) | OpenOutcome::Failed(_) => {}
                OpenOutcome::Stale => tracing::debug!(%id, "ignored superseded detail response"),
            },
            AppEvent::Generated(GenerateOutcome::Generated(event)) => {
                self.notice = Some(format!("Draft ready: {}", event.headline));
            }
            AppEvent::Generated(_) => {}
        }
    }

    fn visible_events(&self) -> Vec<Event> {
        self.feed.visible_events(&self.bookmarks)
    }

    /// Id the star key applies to: the open event, else the highlighted row.
    fn star_target(&self) -> Option<String> {
        if let Some(id) = self.drafts.selected_id() {
            return Some(id);
        }
        let events = self.visible_events();
        self.events_view.highlighted(&events).map(|event| event.id.clone())
    }

    async fn handle_key(&mut self, key: KeyCode) {
        if self.input_mode == InputMode::Search {
            self.handle_search_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('h') | KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                self.help_scroll = 0;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                    self.help_scroll = 0;
                } else if self.export_preview.is_some() {
                    self.export_preview = None;
                } else if !self.drafts.selection().is_closed() {
                    self.drafts.close();
                } else {
                    self.notice = None;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.show_help {
                    self.help_scroll = self.help_scroll.saturating_sub(1);
                } else if self.drafts.selection().is_closed() {
                    let len = self.visible_events().len();
                    self.events_view.previous(len);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.show_help {
                    self.help_scroll = self.help_scroll.saturating_add(1);
                } else if self.drafts.selection().is_closed() {
                    let len = self.visible_events().len();
                    self.events_view.next(len);
                }
            }
            KeyCode::Enter => {
                let events = self.visible_events();
                if let Some(event) = self.events_view.highlighted(&events) {
                    self.export_preview = None;
                    self.spawn_open(event.id.clone());
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.spawn_refresh();
            }
            KeyCode::Char('a') => {
                if self.feed.status().auto_refresh {
                    self.feed.stop_auto_refresh();
                    self.notice = Some("Auto-refresh off".to_string());
                } else {
                    self.feed.start_auto_refresh(self.refresh_interval);
                    self.notice = Some(format!("Auto-refresh every {}s", self.refresh_interval.as_secs()));
                }
            }
            KeyCode::Char('s') => {
                let Some(id) = self.star_target() else {
                    return;
                };
                match self.bookmarks.toggle(&id).await {
                    Ok(true) => self.notice = Some(format!("Starred {}", id)),
                    Ok(false) => self.notice = Some(format!("Unstarred {}", id)),
                    Err(err) => {
                        tracing::warn!(%id, error = %err, "failed to save bookmarks");
                        self.notice = Some(format!("Failed to save bookmarks: {}", err));
                    }
                }
            }
            KeyCode::Char('S') => {
                let starred_only = !self.feed.criteria().starred_only;
                self.feed.set_criteria(CriteriaPatch {
                    starred_only: Some(starred_only),
                    ..Default::default()
                });
            }
            KeyCode::Char('/') => {
                self.search_input = self.feed.criteria().query;
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_hotness(HOTNESS_STEP),
            KeyCode::Char('-') => self.nudge_hotness(-HOTNESS_STEP),
            KeyCode::Char('c') => {
                let confirmation = self.feed.criteria().confirmation.cycle();
                self.feed.set_criteria(CriteriaPatch {
                    confirmation: Some(confirmation),
                    ..Default::default()
                });
            }
            KeyCode::Char(digit @ '1'..='5') => {
                let index = digit as usize - '1' as usize;
                let mut criteria = self.feed.criteria();
                criteria.toggle_type(SourceType::ALL[index]);
                self.feed.set_criteria(CriteriaPatch {
                    types: Some(criteria.types),
                    ..Default::default()
                });
            }
            KeyCode::Char('g') => self.spawn_generate(),
            KeyCode::Char('e') => match self.drafts.export_draft_as_text() {
                Ok(text) => self.export_preview = Some(text),
                Err(err) => self.notice = Some(err.to_string()),
            },
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.feed.set_criteria(CriteriaPatch {
                    query: Some(std::mem::take(&mut self.search_input)),
                    ..Default::default()
                });
                self.spawn_refresh();
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.search_input.clear();
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => self.search_input.push(c),
            _ => {}
        }
    }

    fn nudge_hotness(&mut self, delta: f64) {
        let current = self.feed.criteria().min_hotness;
        // Two decimals so repeated nudges don't drift
        let next = ((current + delta) * 100.0).round() / 100.0;
        self.feed.set_criteria(CriteriaPatch {
            min_hotness: Some(next),
            ..Default::default()
        });
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Length(3), // Filters
                Constraint::Min(0),    // Events
                Constraint::Length(3), // Footer
            ])
            .split(frame.size());

        self.render_status_bar(frame, chunks[0]);
        self.render_filter_bar(frame, chunks[1]);

        let events = self.visible_events();
        self.events_view.clamp(events.len());
        let starred_only = self.feed.criteria().starred_only;
        self.events_view
            .render(frame, chunks[2], &events, &self.bookmarks, starred_only);

        self.render_footer(frame, chunks[3]);

        let selection = self.drafts.selection();
        if !selection.is_closed() {
            let starred = selection.id().map_or(false, |id| self.bookmarks.contains(id));
            render_detail(frame, &selection, starred);
        }
        if let Some(text) = &self.export_preview {
            render_export(frame, text);
        }
        if self.show_help {
            self.render_help(frame);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let status = self.feed.status();

        let feed_indicator = match (status.phase, &status.error) {
            (FeedPhase::Loading, _) => Span::styled("● Loading...", Style::default().fg(Color::Yellow)),
            (FeedPhase::Idle, Some(_)) => Span::styled("● Offline", Style::default().fg(Color::Red)),
            (FeedPhase::Idle, None) => Span::styled("● Live", Style::default().fg(Color::Green)),
        };

        let auto_refresh = if status.auto_refresh {
            format!("Auto: {}s", self.refresh_interval.as_secs())
        } else {
            "Auto: off".to_string()
        };

        let update_time = match status.loaded_at {
            Some(at) => format!("Updated: {}", at.with_timezone(&Local).format("%H:%M:%S")),
            None => "Updated: --".to_string(),
        };

        let line = Line::from(vec![
            feed_indicator,
            Span::raw("  │  "),
            Span::raw(auto_refresh),
            Span::raw("  │  "),
            Span::raw(update_time),
        ]);

        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title(" FINHOT "));
        frame.render_widget(paragraph, chunks[0]);

        let health_line = match self.health.snapshot() {
            Some(health) => Line::from(vec![
                if health.ok {
                    Span::styled("API ok", Style::default().fg(Color::Green))
                } else {
                    Span::styled("API degraded", Style::default().fg(Color::Red))
                },
                Span::raw("  │  "),
                Span::raw(format!("events {}", health.events)),
                Span::raw("  │  "),
                Span::raw(format!("sources {}", health.sources)),
                Span::raw("  │  "),
                Span::raw(format!("last {}", health.last_source_display())),
                Span::styled(
                    self.health
                        .checked_at()
                        .map(|at| format!("  (checked {})", at.with_timezone(&Local).format("%H:%M:%S")))
                        .unwrap_or_default(),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            None => Line::from(Span::styled("health unavailable", Style::default().fg(Color::DarkGray))),
        };

        let paragraph = Paragraph::new(health_line)
            .block(Block::default().borders(Borders::ALL).title(" SERVICE "));
        frame.render_widget(paragraph, chunks[1]);
    }

    fn render_filter_bar(&self, frame: &mut Frame, area: Rect) {
        let criteria = self.feed.criteria();
        let status = self.feed.status();

        let search = if self.input_mode == InputMode::Search {
            Span::styled(
                format!("/{}_", self.search_input),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else if criteria.query.is_empty() {
            Span::styled("/ search", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(format!("\"{}\"", criteria.query), Style::default().fg(Color::Cyan))
        };

        let mut spans = vec![
            search,
            Span::raw("  │  "),
            Span::raw(format!("Hot ≥ {:.2}", criteria.min_hotness)),
            Span::raw("  │  "),
            Span::raw(format!("Conf: {}", criteria.confirmation.label())),
            Span::raw("  │  "),
        ];

        for (i, kind) in SourceType::ALL.iter().enumerate() {
            let style = if criteria.types.contains(kind) {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(format!("{}:{} ", i + 1, kind), style));
        }

        if criteria.starred_only {
            spans.push(Span::raw(" │  "));
            spans.push(Span::styled("★ only", Style::default().fg(Color::Yellow)));
        }
        if status.criteria_pending {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "press r to apply",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title(" FILTERS "));
        frame.render_widget(paragraph, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let status = self.feed.status();

        let footer_text = if let Some(error) = &status.error {
            Line::from(vec![
                Span::styled("ERROR: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled(error.to_string(), Style::default().fg(Color::Red)),
                Span::styled(" (showing last loaded data)", Style::default().fg(Color::DarkGray)),
            ])
        } else if let Some(notice) = &self.notice {
            Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Cyan)))
        } else {
            Line::from(vec![
                Span::styled("[r] ", Style::default().fg(Color::Yellow)),
                Span::raw("Refresh  "),
                Span::styled("[Enter] ", Style::default().fg(Color::Yellow)),
                Span::raw("Open  "),
                Span::styled("[s] ", Style::default().fg(Color::Yellow)),
                Span::raw("Star  "),
                Span::styled("[/] ", Style::default().fg(Color::Yellow)),
                Span::raw("Search  "),
                Span::styled("[h/?] ", Style::default().fg(Color::Yellow)),
                Span::raw("Help  "),
                Span::styled("[q] ", Style::default().fg(Color::Yellow)),
                Span::raw("Quit"),
            ])
        };

        let paragraph = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame) {
        let area = popup_area(frame.size(), 70, 80);
        frame.render_widget(Clear, area);

        let rule = "─".repeat(area.width.saturating_sub(4) as usize);
        let key = |keys: &'static str, text: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {:<8}", keys), Style::default().fg(Color::Cyan)),
                Span::raw(text),
            ])
        };
        let heading = |text: &'static str| {
            Line::from(Span::styled(
                text,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
        };

        let help_text = vec![
            heading("FEED"),
            Line::from(""),
            key("[r]", "Refresh with the current filters"),
            key("[a]", "Toggle auto-refresh"),
            key("[↑↓/jk]", "Move through the list"),
            key("[Enter]", "Open the highlighted event"),
            key("[s]", "Star or unstar the event"),
            key("[S]", "Show starred events only"),
            Line::from(""),
            Line::from(Span::styled(rule.clone(), Style::default().fg(Color::DarkGray))),
            heading("FILTERS"),
            Line::from(""),
            key("[/]", "Search headlines (Enter applies, Esc cancels)"),
            key("[+/-]", "Raise or lower the hotness threshold"),
            key("[c]", "Cycle confirmation: all, confirmed, pending"),
            key("[1-5]", "Toggle regulator, ir, news, exchange, aggregator"),
            Line::from("  Filter changes apply on the next refresh."),
            Line::from(""),
            Line::from(Span::styled(rule.clone(), Style::default().fg(Color::DarkGray))),
            heading("DRAFTS"),
            Line::from(""),
            key("[g]", "Generate a draft for the open event"),
            key("[e]", "Preview the draft as text"),
            key("[Esc]", "Close the popup"),
            Line::from(""),
            Line::from(Span::styled(rule, Style::default().fg(Color::DarkGray))),
            Line::from(""),
            Line::from(Span::styled("Press [Esc] or [h] to close", Style::default().fg(Color::DarkGray))),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(" HELP (Use ↑↓ to scroll) ")
                    .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: false })
            .scroll((self.help_scroll, 0));

        frame.render_widget(paragraph, area);
    }
}
