use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, Paragraph, Row, Sparkline, Table,
        Wrap,
    },
};
use ragdash_core::remote::{LOADING, NO_CLUSTERS};
use ragdash_core::{ActionOutcome, BackendStatus, Remote, Sentiment, TimePoint};

use crate::app::{
    AnalyticsView, App, ChatView, DashboardView, DocumentsView, InputMode, Screen, SettingsField,
    SettingsView, View,
};
use crate::transcript::{transcript_lines, wrapped_height};

const LABEL_WIDTH: u16 = 18;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let input_mode = app.input_mode;
    let animation_frame = app.animation_frame;
    let use_hyde = app.use_hyde;
    match &mut app.view {
        View::Dashboard(view) => render_dashboard(view, frame, body_area),
        View::Chat(view) => render_chat(view, input_mode, animation_frame, frame, body_area),
        View::Analytics(view) => render_analytics(view, frame, body_area),
        View::Documents(view) => render_documents(view, frame, body_area),
        View::Settings(view) => {
            render_settings(view, input_mode, animation_frame, use_hyde, app.client.base_url(), frame, body_area)
        }
    }

    render_footer(app, frame, footer_area);

    if let Some(notice) = &app.notice {
        render_notice(notice, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let active = app.screen();

    let mut spans = vec![Span::styled(" ragdash ", Style::default().fg(Color::Cyan).bold())];
    for (i, screen) in Screen::ALL.iter().enumerate() {
        let style = if *screen == active {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, screen.title()), style));
    }

    if app.is_busy() {
        let dots = ".".repeat((app.animation_frame as usize % 3) + 1);
        spans.push(Span::styled(format!(" working{:<3}", dots), Style::default().fg(Color::Yellow)));
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)));
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    let screen_hints: Vec<(&'static str, &'static str)> = match (app.screen(), app.input_mode) {
        (Screen::Chat, InputMode::Editing) => vec![("Enter", "send"), ("Esc", "stop editing")],
        (Screen::Settings, InputMode::Editing) => vec![("Enter", "confirm"), ("Esc", "stop editing")],
        (_, InputMode::Editing) => vec![("Esc", "back")],
        (Screen::Dashboard, InputMode::Normal) => vec![("r", "reload")],
        (Screen::Chat, InputMode::Normal) => {
            let pending = matches!(&app.view, View::Chat(chat) if chat.session.is_pending());
            if pending {
                vec![("Esc", "cancel"), ("j/k", "scroll"), ("G", "follow")]
            } else {
                vec![("i", "ask"), ("j/k", "scroll"), ("G", "follow")]
            }
        }
        (Screen::Analytics, InputMode::Normal) => vec![("j/k", "cluster"), ("r", "reload")],
        (Screen::Documents, InputMode::Normal) => vec![("j/k", "scroll"), ("r", "reload")],
        (Screen::Settings, InputMode::Normal) => vec![
            ("j/k", "field"),
            ("Enter", "edit"),
            ("s", "apply"),
            ("g", "ingest"),
            ("h", "HyDE"),
        ],
    };
    for (key, label) in screen_hints {
        spans.extend(hint(key, label));
    }

    if app.input_mode == InputMode::Normal {
        spans.extend(hint("Tab", "screen"));
        spans.extend(hint("q", "quit"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Text shown in place of a resource that is still loading or failed
fn placeholder<T>(state: &Remote<T>) -> Option<Text<'static>> {
    match state {
        Remote::Loading => Some(Text::from(Span::styled(LOADING, Style::default().fg(Color::DarkGray)))),
        Remote::Failed(message) => Some(Text::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))),
        Remote::Ready(_) => None,
    }
}

fn titled_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", title))
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<width$}", label, width = LABEL_WIDTH as usize),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(value),
    ])
}

fn pipeline_lines(status: &BackendStatus) -> Vec<Line<'static>> {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    vec![
        field_line("Embedding model", or_dash(&status.config.embedding_model)),
        field_line("Vector DB", or_dash(&status.config.vector_db)),
        field_line("LLM model", or_dash(&status.config.llm_model)),
    ]
}

fn render_dashboard(view: &DashboardView, frame: &mut Frame, area: Rect) {
    let [top, bottom] = Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [status_area, library_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);
    let [sentiment_area, timeseries_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(bottom);

    // Backend health and pipeline
    let status_text = placeholder(view.status.state()).unwrap_or_else(|| {
        let mut lines = vec![
            Line::from(Span::styled("Backend online", Style::default().fg(Color::Green).bold())),
            Line::default(),
        ];
        if let Some(status) = view.status.ready() {
            lines.extend(pipeline_lines(status));
        }
        Text::from(lines)
    });
    frame.render_widget(
        Paragraph::new(status_text).block(titled_block("Backend")).wrap(Wrap { trim: true }),
        status_area,
    );

    let library_text = placeholder(view.status.state()).unwrap_or_else(|| {
        Text::from(library_lines(view.status.ready()))
    });
    frame.render_widget(
        Paragraph::new(library_text).block(titled_block("Library")).wrap(Wrap { trim: true }),
        library_area,
    );

    render_sentiment_gauges(view.sentiment.state(), frame, sentiment_area);
    render_timeseries(view.timeseries.state(), frame, timeseries_area);
}

fn library_lines(status: Option<&BackendStatus>) -> Vec<Line<'static>> {
    let rows = status.map(BackendStatus::library_rows).unwrap_or_default();
    if rows.is_empty() {
        return vec![Line::from(Span::styled(
            "No library information reported.",
            Style::default().fg(Color::DarkGray),
        ))];
    }
    rows.into_iter().map(|(key, value)| field_line(&key, value)).collect()
}

fn render_sentiment_gauges(state: &Remote<Sentiment>, frame: &mut Frame, area: Rect) {
    let block = titled_block("Sentiment");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(text) = placeholder(state) {
        frame.render_widget(Paragraph::new(text), inner);
        return;
    }
    let Some(sentiment) = state.ready() else {
        return;
    };

    let rows = Layout::vertical([Constraint::Length(1); 3]).spacing(1).split(inner);
    let parts = [
        ("Positive", sentiment.positive, Color::Green),
        ("Neutral", sentiment.neutral, Color::Gray),
        ("Negative", sentiment.negative, Color::Red),
    ];
    for ((label, value, color), row) in parts.into_iter().zip(rows.iter()) {
        let percent = sentiment.percent(value);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(format!("{} {:.0}%", label, percent));
        frame.render_widget(gauge, *row);
    }
}

fn render_timeseries(state: &Remote<Vec<TimePoint>>, frame: &mut Frame, area: Rect) {
    let block = titled_block("Documents over time");

    if let Some(text) = placeholder(state) {
        frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
        return;
    }
    let points = state.ready().map(Vec::as_slice).unwrap_or_default();
    if points.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("No dated documents.", Style::default().fg(Color::DarkGray)))
                .block(block),
            area,
        );
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [summary_area, chart_area] =
        Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(inner);

    let total: u64 = points.iter().map(|p| p.count).sum();
    let first = points.first().map(|p| p.date.as_str()).unwrap_or_default();
    let last = points.last().map(|p| p.date.as_str()).unwrap_or_default();
    let summary = vec![
        field_line("Total", total.to_string()),
        field_line("Range", format!("{} .. {}", first, last)),
    ];
    frame.render_widget(Paragraph::new(summary), summary_area);

    let data: Vec<u64> = points.iter().map(|p| p.count).collect();
    frame.render_widget(
        Sparkline::default().data(&data).style(Style::default().fg(Color::Cyan)),
        chart_area,
    );
}

fn render_chat(view: &mut ChatView, input_mode: InputMode, animation_frame: u8, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    let hyde_tag = if view.session.use_hyde() { " [HyDE]" } else { "" };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat{} ", hyde_tag));

    let store = view.session.store();
    let lines = if store.is_empty() && !store.is_pending() {
        vec![Line::from(Span::styled(
            "Ask a question about your documents...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        transcript_lines(store.messages(), store.is_pending(), animation_frame)
    };

    // Inner size minus borders, for scroll bounds
    let inner_width = chat_area.width.saturating_sub(2);
    let inner_height = chat_area.height.saturating_sub(2);
    view.max_scroll = wrapped_height(&lines, inner_width).saturating_sub(inner_height);
    view.scroll = if view.follow { view.max_scroll } else { view.scroll.min(view.max_scroll) };

    let chat = Paragraph::new(lines)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = input_mode == InputMode::Editing;
    let pending = store.is_pending();
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(format!(" {} ", store.submit_label()));

    let (visible_text, cursor_x) = view.input.visible(input_area.width.saturating_sub(2) as usize);
    let input_style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    frame.render_widget(Paragraph::new(visible_text).style(input_style).block(input_block), input_area);

    // Show cursor when editing
    if editing && !pending {
        frame.set_cursor_position((input_area.x + cursor_x as u16 + 1, input_area.y + 1));
    }
}

fn render_analytics(view: &mut AnalyticsView, frame: &mut Frame, area: Rect) {
    let [clusters_area, bottom] =
        Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);
    let [sentiment_area, timeseries_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(bottom);

    let block = titled_block("Topic clusters");
    match view.clusters.state() {
        Remote::Ready(clusters) if !clusters.is_empty() => {
            let header = Row::new(vec!["ID", "Docs", "Top source", "Sample"])
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rows: Vec<Row> = clusters
                .iter()
                .map(|c| {
                    Row::new(vec![
                        c.id.to_string(),
                        c.count.to_string(),
                        c.top_source.clone(),
                        c.sample_text.replace('\n', " "),
                    ])
                })
                .collect();
            let table = Table::new(
                rows,
                [
                    Constraint::Length(4),
                    Constraint::Length(6),
                    Constraint::Percentage(25),
                    Constraint::Min(10),
                ],
            )
            .header(header)
            .block(block)
            .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black));
            frame.render_stateful_widget(table, clusters_area, &mut view.cluster_state);
        }
        state => {
            let text = placeholder(state).unwrap_or_else(|| {
                Text::from(Span::styled(NO_CLUSTERS, Style::default().fg(Color::DarkGray)))
            });
            frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), clusters_area);
        }
    }

    render_sentiment_chart(view.sentiment.state(), frame, sentiment_area);
    render_timeseries(view.timeseries.state(), frame, timeseries_area);
}

fn render_sentiment_chart(state: &Remote<Sentiment>, frame: &mut Frame, area: Rect) {
    let block = titled_block("Sentiment");
    if let Some(text) = placeholder(state) {
        frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
        return;
    }
    let Some(sentiment) = state.ready() else {
        return;
    };

    let bars: Vec<Bar> = [
        ("pos", sentiment.positive, Color::Green),
        ("neu", sentiment.neutral, Color::Gray),
        ("neg", sentiment.negative, Color::Red),
    ]
    .into_iter()
    .map(|(label, value, color)| {
        let percent = sentiment.percent(value);
        Bar::default()
            .value(percent.round() as u64)
            .text_value(format!("{:.0}%", percent))
            .label(Line::from(label))
            .style(Style::default().fg(color))
    })
    .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .max(100)
        .bar_width(5)
        .bar_gap(2);
    frame.render_widget(chart, area);
}

fn render_documents(view: &mut DocumentsView, frame: &mut Frame, area: Rect) {
    let block = titled_block("Library");

    let text = placeholder(view.status.state()).unwrap_or_else(|| {
        let mut lines = library_lines(view.status.ready());
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Pipeline", Style::default().fg(Color::Yellow).bold())));
        if let Some(status) = view.status.ready() {
            lines.extend(pipeline_lines(status));
        }
        Text::from(lines)
    });

    let max_scroll = (text.height() as u16).saturating_sub(area.height.saturating_sub(2));
    view.scroll = view.scroll.min(max_scroll);

    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }).scroll((view.scroll, 0)),
        area,
    );
}

#[allow(clippy::too_many_arguments)]
fn render_settings(
    view: &SettingsView,
    input_mode: InputMode,
    animation_frame: u8,
    use_hyde: bool,
    backend_url: &str,
    frame: &mut Frame,
    area: Rect,
) {
    let [form_area, status_area] =
        Layout::vertical([Constraint::Length(SettingsField::ALL.len() as u16 + 4), Constraint::Min(0)])
            .areas(area);

    let form_block = titled_block("Pipeline");
    let form_inner = form_block.inner(form_area);
    frame.render_widget(form_block, form_area);

    let value_width = form_inner.width.saturating_sub(LABEL_WIDTH + 2) as usize;
    let selected = view.selected_field();
    let editing = input_mode == InputMode::Editing;

    let mut lines = Vec::new();
    if let Some(text) = placeholder(view.status.state()).filter(|_| !view.prefilled) {
        lines.extend(text.lines);
    } else {
        lines.push(Line::default());
    }

    let mut cursor = None;
    for (row, field) in SettingsField::ALL.iter().enumerate() {
        // The ingest folder sits one line below the pipeline fields
        let row = if *field == SettingsField::IngestPath { row + 2 } else { row + 1 };
        if *field == SettingsField::IngestPath {
            lines.push(Line::default());
        }

        let is_selected = *field == selected;
        let marker = if is_selected { "> " } else { "  " };
        let label_style = if is_selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let value_style = if is_selected && editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let (visible, cursor_x) = view.field(*field).visible(value_width);
        lines.push(Line::from(vec![
            Span::styled(marker, label_style),
            Span::styled(format!("{:<width$}", field.label(), width = LABEL_WIDTH as usize), label_style),
            Span::styled(visible, value_style),
        ]));

        if is_selected && editing {
            cursor = Some((
                form_inner.x + 2 + LABEL_WIDTH + cursor_x as u16,
                form_inner.y + row as u16,
            ));
        }
    }
    frame.render_widget(Paragraph::new(lines), form_inner);
    if let Some(position) = cursor {
        frame.set_cursor_position(position);
    }

    let mut status_lines = vec![
        field_line("Backend", backend_url.to_string()),
        field_line("HyDE retrieval", if use_hyde { "on".to_string() } else { "off".to_string() }),
        Line::default(),
    ];

    if view.ingest.is_running() {
        let dots = ".".repeat((animation_frame as usize % 3) + 1);
        status_lines.push(Line::from(Span::styled(
            format!("Ingesting{}", dots),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(outcome) = &view.ingest_outcome {
        status_lines.push(outcome_line(outcome));
    }
    if view.config_update.is_running() {
        status_lines.push(Line::from(Span::styled(
            "Applying configuration…",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }

    frame.render_widget(
        Paragraph::new(status_lines).block(titled_block("Status")).wrap(Wrap { trim: true }),
        status_area,
    );
}

fn outcome_line(outcome: &ActionOutcome) -> Line<'static> {
    let color = if outcome.is_success() { Color::Green } else { Color::Red };
    Line::from(Span::styled(outcome.text().to_string(), Style::default().fg(color)))
}

fn render_notice(notice: &ActionOutcome, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);
    let popup_x = area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.height.saturating_sub(popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let (title, color) = if notice.is_success() {
        (" Done ", Color::Green)
    } else {
        (" Failed ", Color::Red)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let text = vec![
        outcome_line(notice),
        Line::default(),
        Line::from(Span::styled("Press any key", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        popup_area,
    );
}
