use crate::app::{App, AppState};
use crate::config::FieldKind;
use crate::renderer::level::LEVEL_NONE;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

// Popup dimensions (as percentage of screen)
const ROW_POPUP_PERCENT: u16 = 80;
const HELP_POPUP_WIDTH: u16 = 56;
const HELP_POPUP_HEIGHT: u16 = 20;

/// Borders plus the header row
const TABLE_CHROME_HEIGHT: u16 = 3;

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Table
            Constraint::Length(1), // Status bar
            Constraint::Length(if app.is_entering_filter() { 3 } else { 0 }), // Filter prompt
        ])
        .split(f.area());

    let error = match &app.state {
        AppState::Error(message) => Some(message.clone()),
        _ => None,
    };
    match error {
        Some(message) => render_error(f, chunks[0], &message),
        None => render_table(f, chunks[0], app),
    }
    render_status_bar(f, chunks[1], app);

    if app.is_entering_filter() {
        render_filter_prompt(f, chunks[2], app);
    }

    if let AppState::ViewRow { text, scroll } = &app.state {
        render_row_popup(f, f.area(), text, *scroll);
    }

    if app.show_help {
        render_help_overlay(f, f.area());
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    app.table
        .set_height(area.height.saturating_sub(TABLE_CHROME_HEIGHT) as usize);

    let specs: Vec<(String, FieldKind, u16)> = app
        .table
        .parser()
        .specs()
        .map(|spec| (spec.title.clone(), spec.kind, spec.width))
        .collect();

    let widths: Vec<Constraint> = specs
        .iter()
        .map(|(_, _, width)| match width {
            0 => Constraint::Fill(1),
            w => Constraint::Length(*w),
        })
        .collect();

    let header = Row::new(specs.iter().map(|(title, _, _)| Cell::from(title.clone())))
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .table
        .rows()
        .iter()
        .map(|row| {
            let cells = row.entry.fields.iter().zip(&specs).map(|(text, (_, kind, _))| {
                let style = match kind {
                    FieldKind::Level => level_style(text),
                    _ => Style::default(),
                };
                Cell::from(text.clone()).style(style)
            });
            let style = if row.entry.is_error() {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Row::new(cells).style(style)
        })
        .collect();

    let title = if app.state == AppState::Loading {
        format!(" {} (loading) ", app.source_name())
    } else {
        format!(" {} ", app.source_name())
    };

    let selected = (!rows.is_empty()).then(|| app.table.viewport().cursor());
    let mut state = TableState::default().with_selected(selected);

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    f.render_stateful_widget(table, area, &mut state);
}

fn level_style(level: &str) -> Style {
    match level {
        "trace" | "debug" => Style::default().fg(Color::DarkGray),
        "info" => Style::default().fg(Color::Green),
        "warn" => Style::default().fg(Color::Yellow),
        "error" | "fatal" | "panic" => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
        LEVEL_NONE => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    }
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let text = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Error "));
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let viewport = app.table.viewport();
    let mut spans = vec![Span::raw(format!(
        " {}/{}",
        viewport.selected_index().map_or(0, |i| i + 1),
        app.table.len()
    ))];

    if let Some(active) = app.active_filter() {
        spans.push(Span::styled(
            format!(
                " | {} '{}' of {}",
                active.mode.label(),
                active.pattern,
                app.total_lines()
            ),
            Style::default().fg(Color::Cyan),
        ));
    }
    if app.is_filtering() {
        spans.push(Span::styled(
            " | Filtering...",
            Style::default().fg(Color::Yellow),
        ));
    }
    if viewport.is_following() {
        spans.push(Span::styled(" | FOLLOW", Style::default().fg(Color::Green)));
    }
    if viewport.is_reversed() {
        spans.push(Span::raw(" | NEWEST FIRST"));
    }
    if !app.tailing {
        spans.push(Span::styled(" | STOPPED", Style::default().fg(Color::Red)));
    }

    match &app.status {
        Some(message) => spans.push(Span::styled(
            format!(" | {}", message),
            Style::default().fg(Color::Yellow),
        )),
        None => spans.push(Span::styled(
            " | ? - Help",
            Style::default().fg(Color::DarkGray),
        )),
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_filter_prompt(f: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " Filter ({}) - Tab: mode, Enter: apply, Esc: cancel ",
        app.filter_mode.label()
    );
    let prompt = Paragraph::new(app.input_buffer.as_str())
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(prompt, area);

    let cursor_x = area.x + 1 + app.input_buffer.width() as u16;
    f.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

fn render_row_popup(f: &mut Frame, area: Rect, text: &str, scroll: u16) {
    let popup_area = centered_rect(
        percent_of(area.width, ROW_POPUP_PERCENT),
        percent_of(area.height, ROW_POPUP_PERCENT),
        area,
    );

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Entry - j/k: scroll, Esc: close "),
        );

    f.render_widget(Clear, popup_area);
    f.render_widget(paragraph, popup_area);
}

fn render_help_overlay(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(HELP_POPUP_WIDTH, HELP_POPUP_HEIGHT, area);
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let help_lines = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from("  j/k, Up/Down    Move selection"),
        Line::from("  PageUp/Down     Scroll by page"),
        Line::from("  g, Home         Oldest entry"),
        Line::from("  G, End          Newest entry, follow"),
        Line::from(""),
        Line::from(Span::styled("View", heading)),
        Line::from("  f               Toggle follow mode"),
        Line::from("  r               Toggle newest first"),
        Line::from("  Enter           Inspect entry"),
        Line::from("  R               Reload file"),
        Line::from(""),
        Line::from(Span::styled("Filtering", heading)),
        Line::from("  /               Start filter"),
        Line::from("  Tab             Switch Plain/Regex"),
        Line::from("  Esc             Clear filter"),
        Line::from(""),
        Line::from("  q, Ctrl+C       Quit"),
    ];

    let help = Paragraph::new(help_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help - any key to close "),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn percent_of(value: u16, percent: u16) -> u16 {
    (u32::from(value) * u32::from(percent) / 100) as u16
}

/// Rectangle of at most `width` x `height` centered in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
