use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{App, Focus, StatusKind};
use crate::widget::view;

const LABEL_WIDTH: u16 = 14;

/// Render the whole screen.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.bg())),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Min(8),    // Form
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_title(frame, app, chunks[0]);
    let anchor = render_form(frame, app, chunks[1]);
    render_statusbar(frame, app, chunks[2]);

    // Drawn last so the dropdown covers the fields below the address.
    if app.focus == Focus::Address {
        view::render_suggestions(frame, &app.address.view(), anchor, chunks[1], &app.theme);
    }
}

fn render_title(frame: &mut Frame, app: &App, area: Rect) {
    let content = Line::from(vec![
        Span::styled(
            " ruian ",
            Style::default()
                .fg(app.theme.frost_ice())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" › ", Style::default().fg(app.theme.muted())),
        Span::styled("partner address", Style::default().fg(app.theme.fg())),
    ]);
    frame.render_widget(
        Paragraph::new(content).style(Style::default().bg(app.theme.bg_secondary())),
        area,
    );
}

/// Draw the form and return the address input's row, where the dropdown hangs.
fn render_form(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let block = Block::default()
        .title(" Partner ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let field_view = app.address.view();
    let mut lines = Vec::new();
    let mut address_row = 0;

    for (row, focus) in Focus::ORDER.into_iter().enumerate() {
        let is_active = app.focus == focus;
        let label_style = if is_active {
            Style::default()
                .fg(app.theme.active_field())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.inactive_field())
        };
        let indicator = if is_active { "▶ " } else { "  " };

        let mut spans = vec![
            Span::styled(indicator, Style::default().fg(app.theme.frost_ice())),
            Span::styled(
                format!("{:<width$}", focus.label(), width = LABEL_WIDTH as usize - 2),
                label_style,
            ),
        ];

        match focus {
            Focus::Address => {
                address_row = row as u16;
                spans.extend(view::input_spans(&field_view, is_active, app.tick, &app.theme));
            }
            Focus::Name => spans.extend(value_spans(app, &app.name, is_active)),
            Focus::Field(field) => {
                spans.extend(value_spans(app, app.form.values().get(field), is_active));
                if app.form.is_field_dirty(field) {
                    spans.push(Span::styled(" [+]", Style::default().fg(app.theme.warning())));
                }
                if let Some(error) = app.form.error(field) {
                    spans.push(Span::styled(
                        format!("  {error}"),
                        Style::default().fg(app.theme.danger()),
                    ));
                }
            }
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);

    Rect {
        x: inner.x + LABEL_WIDTH,
        y: inner.y + address_row,
        width: inner.width.saturating_sub(LABEL_WIDTH),
        height: 1,
    }
}

fn value_spans<'a>(app: &App, value: &'a str, is_active: bool) -> Vec<Span<'a>> {
    if is_active {
        vec![
            Span::styled(value, Style::default().fg(app.theme.fg())),
            Span::styled("█", Style::default().fg(app.theme.frost_ice())),
        ]
    } else if value.is_empty() {
        vec![Span::styled("─", Style::default().fg(app.theme.muted()))]
    } else {
        vec![Span::styled(value, Style::default().fg(app.theme.fg()))]
    }
}

fn render_statusbar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(8), // Mode
            Constraint::Min(10),   // Message
            Constraint::Length(8), // Dirty flag
        ])
        .split(area);

    let (label, bg) = if app.saved {
        (" SAVED ", app.theme.success())
    } else {
        (" FORM ", app.theme.frost_dark())
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            label,
            Style::default()
                .bg(bg)
                .fg(app.theme.fg_bright())
                .add_modifier(Modifier::BOLD),
        )),
        chunks[0],
    );

    let (kind, text) = app.status_line();
    let color = match kind {
        StatusKind::Info => app.theme.muted(),
        StatusKind::Warning => app.theme.warning(),
        StatusKind::Error => app.theme.danger(),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {text}"), Style::default().fg(color)))
            .style(Style::default().bg(app.theme.bg_secondary())),
        chunks[1],
    );

    let dirty = if app.form.is_dirty() { "[+]" } else { "" };
    frame.render_widget(
        Paragraph::new(Span::styled(dirty, Style::default().fg(app.theme.warning())))
            .style(Style::default().bg(app.theme.bg_secondary()))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSource;
    use crate::widget::{FetchOutcome, FieldMessage};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ruian_core::Suggestion;
    use ruian_core::config::AutocompleteConfig;
    use std::sync::Arc;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_renders_all_fields() {
        let app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        let text = screen(&app);
        for label in ["Name", "Address", "Street", "City", "ZIP", "RUIAN code", "FORM"] {
            assert!(text.contains(label), "missing {label}");
        }
    }

    #[test]
    fn test_renders_open_suggestion_list() {
        let mut app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        app.focus = Focus::Address;
        app.address.handle_message(FieldMessage::FetchCompleted(FetchOutcome {
            seq: app.address.latest_seq(),
            result: Ok(vec![
                Suggestion::street(7, "Main St"),
                Suggestion::street(8, "Maine Road"),
            ]),
        }));

        let text = screen(&app);
        assert!(text.contains("Main St"));
        assert!(text.contains("Maine Road"));
    }

    #[test]
    fn test_status_shows_validation_error() {
        let mut app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        app.focus = Focus::Field(ruian_core::AddressField::Zip);
        app.insert_char('1');
        let text = screen(&app);
        assert!(text.contains("ZIP must have 5 digits"));
        assert!(text.contains("[+]"));
    }
}
