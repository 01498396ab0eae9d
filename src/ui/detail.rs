use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use finhot::draft::OpenEvent;
use finhot::Selection;

use super::events::hotness_color;

/// Centered popup covering the given percentage of the screen.
pub fn popup_area(area: Rect, width_pct: u16, height_pct: u16) -> Rect {
    let width = (area.width * width_pct) / 100;
    let height = (area.height * height_pct) / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn render_detail(frame: &mut Frame, selection: &Selection, starred: bool) {
    let area = popup_area(frame.size(), 80, 85);
    frame.render_widget(Clear, area);

    let (title, lines) = match selection {
        Selection::Closed => return,
        Selection::Opening { id } => (
            " EVENT ".to_string(),
            vec![Line::from(Span::styled(
                format!("Loading {}…", id),
                Style::default().fg(Color::Yellow),
            ))],
        ),
        Selection::OpenFailed { id, error } => (
            " EVENT ".to_string(),
            vec![
                Line::from(Span::styled(
                    format!("Failed to load {}: {}", id, error),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled("[Esc] Close", Style::default().fg(Color::Yellow))),
            ],
        ),
        Selection::Open(open) => (
            if starred { " ★ EVENT " } else { " EVENT " }.to_string(),
            open_event_lines(open),
        ),
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn open_event_lines(open: &OpenEvent) -> Vec<Line<'static>> {
    let event = &open.event;
    let mut lines = vec![
        Line::from(Span::styled(
            event.headline.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("Hotness: "),
            Span::styled(event.hotness_display(), Style::default().fg(hotness_color(event.hotness))),
            Span::raw("  │  "),
            if event.confirmed {
                Span::styled("confirmed", Style::default().fg(Color::Green))
            } else {
                Span::styled("pending confirmation", Style::default().fg(Color::DarkGray))
            },
        ]),
    ];

    let mut facts: Vec<Span<'static>> = Vec::new();
    if let Some(kind) = &event.event_type {
        facts.push(Span::raw(format!("Type: {}  ", kind)));
    }
    if let Some(side) = &event.impact_side {
        facts.push(Span::raw(format!("Impact: {}  ", side)));
    }
    if let Some(score) = event.materiality_display() {
        facts.push(Span::styled(
            format!("Materiality: {}", score),
            Style::default().fg(Color::Magenta),
        ));
    }
    if !facts.is_empty() {
        lines.push(Line::from(facts));
    }

    let entities = event.entity_labels();
    if !entities.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Entities: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(entities.join(", ")),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(event.why_now_display().to_string()));
    lines.push(Line::from(""));

    if !event.timeline.is_empty() {
        lines.push(Line::from(Span::styled("Timeline:", Style::default().add_modifier(Modifier::BOLD))));
        for item in &event.timeline {
            lines.push(Line::from(format!("  {}", item)));
        }
        lines.push(Line::from(""));
    }

    match &event.draft {
        Some(draft) => {
            lines.push(Line::from(Span::styled(
                draft.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(draft.lede.clone()));
            for bullet in &draft.bullets {
                lines.push(Line::from(format!("  • {}", bullet)));
            }
            if !draft.quote.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  │ {}", draft.quote),
                    Style::default().add_modifier(Modifier::ITALIC),
                )));
            }
            if !draft.attribution.is_empty() {
                lines.push(Line::from(Span::styled(
                    draft.attribution.join(" • "),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "No draft yet.",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    if open.generating {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Generating draft…",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(error) = &open.generate_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Draft generation failed: {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Sources:", Style::default().add_modifier(Modifier::BOLD))));
    for source in &event.sources {
        lines.push(Line::from(format!("  [{}] {}", source.kind, source.host())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[g] ", Style::default().fg(Color::Yellow)),
        Span::raw("Generate  "),
        Span::styled("[e] ", Style::default().fg(Color::Yellow)),
        Span::raw("Export  "),
        Span::styled("[s] ", Style::default().fg(Color::Yellow)),
        Span::raw("Star  "),
        Span::styled("[Esc] ", Style::default().fg(Color::Yellow)),
        Span::raw("Close"),
    ]));

    lines
}

pub fn render_export(frame: &mut Frame, text: &str) {
    let area = popup_area(frame.size(), 70, 70);
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = text.lines().map(|line| Line::from(line.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Esc] Close",
        Style::default().fg(Color::Yellow),
    )));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" DRAFT EXPORT "))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}
