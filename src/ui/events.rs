use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use finhot::{Bookmarks, Event};

use crate::commands::truncate;

pub struct EventsView {
    pub table_state: TableState,
}

impl EventsView {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(_) => len - 1,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let previous = match self.table_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(previous));
    }

    /// Keep the highlight inside the list after it was replaced.
    pub fn clamp(&mut self, len: usize) {
        match (self.table_state.selected(), len) {
            (_, 0) => self.table_state.select(None),
            (Some(i), len) if i >= len => self.table_state.select(Some(len - 1)),
            (None, _) => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    pub fn highlighted<'a>(&self, events: &'a [Event]) -> Option<&'a Event> {
        self.table_state.selected().and_then(|i| events.get(i))
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, events: &[Event], bookmarks: &Bookmarks, starred_only: bool) {
        let title = if starred_only {
            format!(" ★ STARRED EVENTS ({}) ", events.len())
        } else {
            format!(" HOT EVENTS ({}) ", events.len())
        };

        if events.is_empty() {
            let paragraph = Paragraph::new("No events match the current filters.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(["★", "Hot", "Conf", "Headline", "Sources", "Draft"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .bottom_margin(1);

        let headline_width = area.width.saturating_sub(2 + 2 + 6 + 6 + 30 + 6 + 8) as usize;

        let rows: Vec<Row> = events
            .iter()
            .map(|event| {
                let star = if bookmarks.contains(&event.id) {
                    Span::styled("★", Style::default().fg(Color::Yellow))
                } else {
                    Span::raw(" ")
                };
                let confirmed = if event.confirmed {
                    Span::styled("yes", Style::default().fg(Color::Green))
                } else {
                    Span::styled("no", Style::default().fg(Color::DarkGray))
                };
                let draft = if event.has_draft() {
                    Span::styled("ready", Style::default().fg(Color::Cyan))
                } else {
                    Span::raw("-")
                };

                Row::new(vec![
                    Cell::from(star),
                    Cell::from(Span::styled(
                        event.hotness_display(),
                        Style::default().fg(hotness_color(event.hotness)),
                    )),
                    Cell::from(confirmed),
                    Cell::from(truncate(&event.headline, headline_width.max(10))),
                    Cell::from(truncate(&event.source_hosts(3).join(", "), 30)),
                    Cell::from(draft),
                ])
                .height(1)
            })
            .collect();

        let widths = [
            Constraint::Length(2),  // Star
            Constraint::Length(6),  // Hotness
            Constraint::Length(5),  // Confirmed
            Constraint::Min(10),    // Headline
            Constraint::Length(30), // Sources
            Constraint::Length(6),  // Draft
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(table, area, &mut self.table_state);
    }
}

pub fn hotness_color(hotness: f64) -> Color {
    if hotness >= 0.8 {
        Color::LightRed
    } else if hotness >= 0.6 {
        Color::Red
    } else if hotness >= 0.4 {
        Color::Yellow
    } else {
        Color::Gray
    }
}
