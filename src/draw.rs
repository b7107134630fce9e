use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::state::app_state::{ChatView, Inbox, SummaryState};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use chrono::Local;
use pitchside_api::DirectMessage;

static TABS: &[&str; 2] = &["Chat", "Summary"];

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    terminal
        .draw(|f| {
            layout.update(f.area(), app.settings.full_screen);

            if !app.settings.full_screen {
                draw_tabs(f, layout.tab_bar, app);
            }

            match app.state.active_tab {
                MenuItem::Chat => draw_chat(f, layout.main, app),
                MenuItem::Summary => draw_summary(f, layout.main, app),
                MenuItem::Help => draw_placeholder(
                    f,
                    layout.main,
                    "Help: q=quit  1=Chat  2=Summary  i/Enter=type  Esc=cancel  J/K=conversation  j/k=scroll  s=summarize  \"=logs",
                ),
            }

            if app.state.show_logs {
                draw_logs(f, layout.main);
            }

            draw_loading_spinner(f, f.area(), app, loading);
        })
        .unwrap();
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Chat => 0,
        MenuItem::Summary => 1,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_chat(f: &mut Frame, area: Rect, app: &App) {
    let title = match &app.state.chat {
        ChatView::Inbox(_) => " Inbox ",
        ChatView::Direct(_) => " Support Chat ",
    };
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 3 {
        return;
    }

    let (sidebar, thread_area) = match &app.state.chat {
        ChatView::Inbox(_) => LayoutAreas::split_chat(inner),
        ChatView::Direct(_) => (None, inner),
    };

    if let (Some(sidebar), Some(inbox)) = (sidebar, app.state.chat.inbox()) {
        draw_inbox_sidebar(f, sidebar, inbox);
    }

    draw_thread(f, thread_area, app);
}

fn draw_inbox_sidebar(f: &mut Frame, area: Rect, inbox: &Inbox) {
    let block = default_border(Color::DarkGray).title(" Conversations ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inbox.conversations.is_empty() {
        f.render_widget(
            Paragraph::new("No conversations yet")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let mut lines = Vec::with_capacity(inbox.conversations.len());
    for conversation in inbox.conversations.iter().take(inner.height as usize) {
        let selected = inbox.selected_peer.as_deref() == Some(conversation.peer_id.as_str());
        let marker = if selected { '>' } else { ' ' };
        let badge = if conversation.unread_count > 0 {
            format!(" ({})", conversation.unread_count)
        } else {
            String::new()
        };
        let name_width = (inner.width as usize).saturating_sub(2 + badge.chars().count());
        let name: String = conversation.display_name.chars().take(name_width).collect();

        let name_style = if selected {
            Style::default().fg(Color::Yellow)
        } else if conversation.unread_count > 0 {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker} ")),
            Span::styled(name, name_style),
            Span::styled(badge, Style::default().fg(Color::Green)),
        ]));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_thread(f: &mut Frame, area: Rect, app: &App) {
    let [messages_area, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(2)]).areas(area);

    let thread = app.state.chat.thread();
    let mut lines = Vec::new();

    let status = if app.state.connected { "online" } else { "offline" };
    let mut header = vec![
        Span::styled("status ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            status,
            Style::default().fg(if app.state.connected { Color::Green } else { Color::Red }),
        ),
    ];
    if let Some(inbox) = app.state.chat.inbox()
        && let Some(conversation) = inbox.selected_conversation()
    {
        header.push(Span::styled("  with ", Style::default().fg(Color::DarkGray)));
        header.push(Span::styled(
            conversation.display_name.clone(),
            Style::default().fg(Color::Gray),
        ));
    }
    lines.push(Line::from(header));
    if let Some(note) = app.state.status.as_deref() {
        lines.push(Line::from(Span::styled(
            note.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));

    if thread.messages.is_empty() {
        let hint = if app.state.chat.inbox().is_some_and(|i| i.loading_thread) {
            "Loading messages..."
        } else {
            "No messages yet"
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
    }

    let me = app.identity.as_ref().map(|i| i.id.as_str()).unwrap_or("");
    for msg in &thread.messages {
        lines.push(message_line(msg, me, app, messages_area.width));
    }

    let visible = messages_area.height as usize;
    let total = lines.len();
    let offset = thread.scroll_offset as usize;
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(visible);
    let window = if start < end { lines[start..end].to_vec() } else { Vec::new() };
    f.render_widget(Paragraph::new(window), messages_area);

    let mode = if thread.composing { "typing" } else { "idle" };
    let input = if thread.composing {
        format!("> {}_", thread.input)
    } else {
        "Press Enter/i to type. Esc cancel. j/k scroll. J/K switch conversation.".to_string()
    };
    let input_style = if thread.composing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_block = default_border(Color::DarkGray).title(format!(" {} ", mode));
    let input_inner = input_block.inner(input_area);
    f.render_widget(input_block, input_area);
    f.render_widget(Paragraph::new(input).style(input_style), input_inner);
}

fn message_line(msg: &DirectMessage, me: &str, app: &App, width: u16) -> Line<'static> {
    let author = if msg.sender_id == me {
        "me".to_string()
    } else if let Some(inbox) = app.state.chat.inbox() {
        inbox
            .conversations
            .iter()
            .find(|c| c.peer_id == msg.sender_id)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| pitchside_api::Conversation::placeholder_name(&msg.sender_id))
    } else {
        "admin".to_string()
    };

    let stamp = msg.created_at.with_timezone(&Local).format("%H:%M");
    let prefix = format!("[{stamp}] {author}: ");
    let style = if msg.is_optimistic() {
        // Awaiting the server echo.
        Style::default().fg(Color::DarkGray)
    } else if msg.sender_id == me {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    };
    let body_width = width.saturating_sub(prefix.chars().count() as u16).max(8) as usize;
    let clipped: String = msg.body.chars().take(body_width).collect();
    Line::from(vec![Span::styled(prefix, style), Span::styled(clipped, style)])
}

fn draw_summary(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Match Summary ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 4 {
        return;
    }

    let [form_area, response_area] = Layout::vertical([
        Constraint::Length(SummaryState::FIELD_COUNT as u16 + 3),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let summary = &app.state.summary;
    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        "Keys: j/k=field  i/Enter=edit  Esc=done  s=generate",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    for idx in 0..SummaryState::FIELD_COUNT {
        let selected = idx == summary.selected_field;
        let marker = if selected { '>' } else { ' ' };
        let value = summary.field(idx);
        let value = if selected && summary.editing {
            format!("{value}_")
        } else {
            value.to_string()
        };
        let style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {:<10} {value}", SummaryState::field_label(idx)),
            style,
        )));
    }
    f.render_widget(Paragraph::new(lines), form_area);

    let response_block = default_border(Color::DarkGray).title(" Generated ");
    let response_inner = response_block.inner(response_area);
    f.render_widget(response_block, response_area);

    let (text, style) = if summary.requesting {
        ("Generating summary...".to_string(), Style::default().fg(Color::DarkGray))
    } else if let Some(text) = summary.response.as_deref() {
        (text.to_string(), Style::default().fg(Color::White))
    } else if let Some(err) = app.state.last_error.as_deref() {
        (format!("Summary failed:\n{err}"), Style::default().fg(Color::Red))
    } else {
        ("Fill the form and press s.".to_string(), Style::default().fg(Color::DarkGray))
    };
    f.render_widget(
        Paragraph::new(text).style(style).wrap(tui::widgets::Wrap { trim: false }),
        response_inner,
    );
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let [_, logs_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(10)]).areas(area);
    f.render_widget(Clear, logs_area);
    let widget = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(widget, logs_area);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
