use chrono::{Local, Utc};
use expertbot_core::{Message, Sender};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConnectionStatus, Focus};

const SIDEBAR_WIDTH: u16 = 32;
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

struct Theme {
    background: Color,
    text: Color,
    muted: Color,
    border: Color,
    focused: Color,
    user: Color,
    bot: Color,
    highlight: Color,
}

impl Theme {
    fn new(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                background: Color::Black,
                text: Color::Gray,
                muted: Color::DarkGray,
                border: Color::DarkGray,
                focused: Color::LightBlue,
                user: Color::LightCyan,
                bot: Color::LightGreen,
                highlight: Color::Rgb(55, 65, 81),
            }
        } else {
            Self {
                background: Color::Reset,
                text: Color::Black,
                muted: Color::Gray,
                border: Color::Blue,
                focused: Color::Cyan,
                user: Color::Blue,
                bot: Color::Green,
                highlight: Color::Rgb(219, 234, 254),
            }
        }
    }

    fn block<'a>(&self, title: &'a str, focused: bool) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(if focused { self.focused } else { self.border }))
            .style(Style::default().bg(self.background))
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let theme = Theme::new(app.dark_mode);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Body
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    let options = app.dispatcher.file_options().len() as u16;
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if options > 0 {
            [Constraint::Min(5), Constraint::Length(options + 2)]
        } else {
            [Constraint::Min(5), Constraint::Length(0)]
        })
        .split(body[1]);

    draw_header(f, app, &theme, chunks[0]);
    draw_sidebar(f, app, &theme, body[0]);
    draw_messages(f, app, &theme, main[0]);
    if options > 0 {
        draw_file_options(f, app, &theme, main[1]);
    }
    draw_input(f, app, &theme, chunks[2]);
    draw_status_bar(f, app, chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let status_color = match app.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected | ConnectionStatus::Error => Color::Red,
        ConnectionStatus::Connecting => Color::Yellow,
    };

    let mut spans = vec![
        Span::styled(
            " ExpertBot",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(theme.focused),
        ),
        Span::styled("  |  ", Style::default().fg(theme.muted)),
        Span::styled(app.status.to_string(), Style::default().fg(status_color)),
    ];
    if app.is_loading() {
        let frame = SPINNER[(app.tick % SPINNER.len() as u64) as usize];
        spans.push(Span::styled(
            format!("  {} Thinking...", frame),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        if app.dark_mode { "  |  dark" } else { "  |  light" },
        Style::default().fg(theme.muted),
    ));

    let header = Paragraph::new(Line::from(spans))
        .block(theme.block("", false))
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_sidebar(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let block = theme.block("Recent Chats", focused);
    let sessions = app.dispatcher.sessions();

    if sessions.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No recent chats",
            Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let bound = app.dispatcher.controller().bound_id();
    let title_width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = sessions
        .iter()
        .map(|session| {
            let style = if bound == Some(session.id.as_str()) {
                Style::default().fg(theme.focused).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            ListItem::new(Text::from(vec![
                Line::from(Span::styled(fit_width(&session.title, title_width), style)),
                Line::from(Span::styled(
                    session.activity_label(now),
                    Style::default().fg(theme.muted),
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.highlight))
        .highlight_symbol(if focused { "> " } else { "  " });

    let mut state = ListState::default();
    state.select(Some(app.sidebar_index.min(sessions.len() - 1)));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_messages(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = app
        .dispatcher
        .messages()
        .iter()
        .flat_map(|msg| format_message(msg, theme))
        .collect();

    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let visible = area.height.saturating_sub(2);
    let total = wrapped_height(&lines, inner_width);
    let scroll = total
        .saturating_sub(visible)
        .saturating_sub(app.scroll_back);

    let messages = Paragraph::new(lines)
        .block(theme.block("Conversation", app.focus == Focus::Input))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    f.render_widget(messages, area);
}

fn format_message<'a>(msg: &'a Message, theme: &Theme) -> Vec<Line<'a>> {
    let (who, color) = match msg.sender {
        Sender::User => ("You", theme.user),
        Sender::Bot => ("ExpertBot", theme.bot),
    };
    let time = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();

    let mut lines = vec![Line::from(vec![
        Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", time), Style::default().fg(theme.muted)),
    ])];
    lines.extend(
        msg.content
            .lines()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(theme.text)))),
    );
    lines.push(Line::from(""));
    lines
}

fn draw_file_options(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::FileOptions;
    let items: Vec<ListItem> = app
        .dispatcher
        .file_options()
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", idx + 1), Style::default().fg(theme.muted)),
                Span::styled(option.name.as_str(), Style::default().fg(theme.text)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(theme.block("Select a file", focused))
        .highlight_style(Style::default().bg(theme.highlight).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if focused {
        state.select(Some(app.option_index));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_input(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let input_text = if app.is_loading() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::styled(
                "Waiting for the knowledge base...",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ),
        ])
    } else if app.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.bot)),
            Span::styled(
                "Type your question and press Enter...",
                Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.bot)),
            Span::styled(app.input.as_str(), Style::default().fg(theme.text)),
            Span::styled("▌", Style::default().fg(theme.bot)),
        ])
    };

    let input = Paragraph::new(input_text)
        .block(theme.block("Message", app.focus == Focus::Input))
        .wrap(Wrap { trim: true });

    f.render_widget(input, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.focus {
        Focus::Input => "[Enter] Send  [Tab] Focus  [Up/Down] Scroll  [Ctrl+N] New  [Ctrl+T] Theme  [Ctrl+C] Quit",
        Focus::Sidebar => "[Enter] Open  [Up/Down] Move  [d/Del] Delete  [Tab] Focus  [Ctrl+C] Quit",
        Focus::FileOptions => "[Enter] Select file  [Up/Down] Move  [Tab] Focus  [Ctrl+C] Quit",
    };

    let status = format!(
        " Messages: {} | Chats: {} | {}",
        app.dispatcher.messages().len(),
        app.dispatcher.sessions().len(),
        help_text
    );

    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED));

    f.render_widget(status_bar, area);
}

/// Rows `lines` occupy once wrapped at `width` columns.
fn wrapped_height(lines: &[Line], width: usize) -> u16 {
    let rows: usize = lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            w.max(1).div_ceil(width)
        })
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Cut `text` to `width` display columns, marking the cut with `…`.
fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width("short", 10), "short");
        assert_eq!(fit_width("a longer chat title", 8), "a longe…");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdefghij"), Line::from(""), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
    }
}
