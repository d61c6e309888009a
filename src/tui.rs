// tui.rs

use crate::alarm::Sound;
use crate::api::TaskApi;
use crate::app::{App, InputMode, LoginStep, format_due, format_reminder, local_now};
use crate::filter::{Filter, local_today};
use crate::notify::Notifier;
use crate::task::{Priority, Task};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io;
use std::time::{Duration, Instant};

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()>
where
    std::io::Error: From<<B as Backend>::Error>,
{
    loop {
        app.tick(local_now(), Instant::now());
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if !handle_key(app, key) {
                    return Ok(());
                }
            }
        }
    }
}

/// Applies one key press. Returns false when the user asked to quit.
pub fn handle_key<A: TaskApi + 'static, N: Notifier, S: Sound>(app: &mut App<A, N, S>, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Enter | KeyCode::Char('x') if !app.alerts().is_empty() => {
                app.dismiss_alert();
            }
            KeyCode::Char('a') => app.begin_add(),
            KeyCode::Char('e') => app.begin_edit_selected(),
            KeyCode::Char('d') | KeyCode::Char(' ') => app.toggle_selected(),
            KeyCode::Char('R') => app.delete_selected(),
            KeyCode::Char('r') => app.refresh(),
            KeyCode::Char('/') | KeyCode::Char('?') => {
                app.input_mode = InputMode::Searching;
            }
            KeyCode::Char('L') => app.start_login(),
            KeyCode::Char('O') => app.logout(),
            KeyCode::Char(c @ '1'..='7') => {
                let i = c as usize - '1' as usize;
                app.set_filter(Filter::ALL[i]);
            }
            KeyCode::Tab | KeyCode::Char(']') => app.set_filter(app.filter.next()),
            KeyCode::BackTab | KeyCode::Char('[') => app.set_filter(app.filter.prev()),
            KeyCode::Down | KeyCode::Char('j') => {
                if app.selected < app.visible().len().saturating_sub(1) {
                    app.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.selected = app.selected.saturating_sub(1);
            }
            KeyCode::Esc => {
                app.search_query.clear();
                app.selected = 0;
            }
            _ => {}
        },
        InputMode::EditingTitle
        | InputMode::EditingDescription
        | InputMode::EditingDueDate
        | InputMode::EditingReminder => match key.code {
            KeyCode::Enter => app.advance_form(local_now()),
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Tab => app.form.priority = app.form.priority.next(),
            KeyCode::Backspace => {
                form_field(app).pop();
            }
            KeyCode::Char(c) => form_field(app).push(c),
            _ => {}
        },
        InputMode::Searching => match key.code {
            KeyCode::Enter => app.input_mode = InputMode::Normal,
            KeyCode::Esc => {
                app.search_query.clear();
                app.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                app.search_query.pop();
                app.selected = 0;
            }
            KeyCode::Char(c) => {
                app.search_query.push(c);
                app.selected = 0;
            }
            _ => {}
        },
        InputMode::Login => match key.code {
            KeyCode::Enter => app.submit_login(),
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Backspace => {
                app.input_login.pop();
            }
            KeyCode::Char(c) => app.input_login.push(c),
            _ => {}
        },
    }
    true
}

fn form_field<A, N, S>(app: &mut App<A, N, S>) -> &mut String {
    match app.input_mode {
        InputMode::EditingDescription => &mut app.form.description,
        InputMode::EditingDueDate => &mut app.form.due,
        InputMode::EditingReminder => &mut app.form.reminder,
        _ => &mut app.form.title,
    }
}

fn ui(f: &mut Frame<'_>, app: &App) {
    let size = f.area();
    let editing = app.input_mode != InputMode::Normal;

    let mut constraints = vec![
        Constraint::Length(1), // title
        Constraint::Length(2), // help
        Constraint::Min(5),    // sidebar + list
    ];
    if editing {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(1)); // status line

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(size);

    let mut title_text = format!("taskdeck - {}", app.filter.label());
    if !app.search_query.is_empty() {
        title_text = format!("{}  (search: \"{}\")", title_text, app.search_query);
    }
    if app.in_flight() > 0 {
        title_text = format!("{}  ⇅{}", title_text, app.in_flight());
    }
    let title = Paragraph::new(Line::from(Span::styled(
        title_text,
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let b = Style::default().add_modifier(Modifier::BOLD);
    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("a", b), Span::raw(" add, "),
            Span::styled("e", b), Span::raw(" edit, "),
            Span::styled("d", b), Span::raw(" done/reopen, "),
            Span::raw("Shift+"), Span::styled("R", b), Span::raw(" delete, "),
            Span::styled("r", b), Span::raw(" refresh, "),
            Span::styled("/", b), Span::raw(" search"),
        ]),
        Line::from(vec![
            Span::styled("Tab", b), Span::raw("/"), Span::styled("1-7", b), Span::raw(" filter, "),
            Span::styled("x", b), Span::raw(" dismiss alarm, "),
            Span::styled("L", b), Span::raw(" login, "),
            Span::styled("O", b), Span::raw(" logout, "),
            Span::styled("q", b), Span::raw(" quit"),
        ]),
    ])
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(20)])
        .split(chunks[2]);
    render_sidebar(f, app, body[0]);
    render_tasks(f, app, body[1]);

    if editing {
        render_input(f, app, chunks[3]);
    }

    if let Some(ref msg) = app.message {
        let color = if msg.is_error { Color::Red } else { Color::Green };
        let status = Paragraph::new(msg.text.as_str())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        f.render_widget(status, chunks[chunks.len() - 1]);
    }

    if !app.alerts().is_empty() {
        render_alerts(f, app, size);
    }
}

fn render_sidebar(f: &mut Frame<'_>, app: &App, area: Rect) {
    let counts = app.counts();
    let items: Vec<ListItem> = Filter::ALL
        .iter()
        .enumerate()
        .map(|(i, filter)| {
            let style = if *filter == app.filter {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(
                format!("{} {:<16}{:>3}", i + 1, filter.label(), counts.get(*filter)),
                style,
            )))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Filters"));
    f.render_widget(list, area);
}

fn task_color(task: &Task) -> Color {
    if task.is_completed() {
        Color::Green
    } else if task.due_date.is_some_and(|d| d < local_today()) {
        Color::Red
    } else if task.priority == Priority::High {
        Color::Magenta
    } else {
        Color::Yellow
    }
}

fn render_tasks(f: &mut Frame<'_>, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .visible()
        .iter()
        .map(|t| {
            let mark = if t.is_completed() { "[x]" } else { "[ ]" };
            let mut text = format!("{} {}", mark, t.title);
            if t.priority != Priority::Medium {
                text.push_str(&format!("  !{}", t.priority));
            }
            if let Some(due) = t.due_date {
                text.push_str(&format!("  (Due: {})", format_due(due)));
            }
            if let Some(at) = t.reminder_time {
                let bell = if t.is_reminded { "🔕" } else { "⏰" };
                text.push_str(&format!("  {} {}", bell, format_reminder(at)));
            }
            let mut lines = vec![Line::from(Span::styled(text, Style::default().fg(task_color(t))))];
            if let Some(ref d) = t.description {
                lines.push(Line::from(Span::styled(
                    format!("    {}", d),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(app.selected.min(items.len() - 1)));
    }
    let empty = items.is_empty();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut state);

    if empty {
        let hint = if app.search_query.is_empty() {
            format!("No tasks in {}. Press 'a' to add one.", app.filter.label())
        } else {
            "No tasks match your search.".to_string()
        };
        let inner = Rect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)).alignment(Alignment::Center),
            inner,
        );
    }
}

fn render_input(f: &mut Frame<'_>, app: &App, area: Rect) {
    let caret = "▏";
    let (label, value) = match app.input_mode {
        InputMode::EditingTitle => ("Title", app.form.title.as_str()),
        InputMode::EditingDescription => ("Description (optional)", app.form.description.as_str()),
        InputMode::EditingDueDate => ("Due date (optional: today, fri, 2026-03-01)", app.form.due.as_str()),
        InputMode::EditingReminder => ("Reminder (optional: in 10 min, tomorrow 09:00)", app.form.reminder.as_str()),
        InputMode::Searching => ("Search", app.search_query.as_str()),
        InputMode::Login => match app.login_step {
            Some(LoginStep::Token) => ("Login - token", ""),
            _ => ("Login - user id", app.input_login.as_str()),
        },
        InputMode::Normal => ("", ""),
    };
    let title = match app.input_mode {
        InputMode::Searching | InputMode::Login => label.to_string(),
        _ => {
            let verb = if app.form.editing.is_some() { "Edit" } else { "New" };
            format!("{} task [{}, Tab to change] - {}", verb, app.form.priority, label)
        }
    };
    // token input is masked
    let shown = if app.login_step == Some(LoginStep::Token) {
        "*".repeat(app.input_login.chars().count())
    } else {
        value.to_string()
    };
    let widget = Paragraph::new(format!("{}{}", shown, caret))
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn render_alerts(f: &mut Frame<'_>, app: &App, size: Rect) {
    let alerts = app.alerts();
    let height = (alerts.len() as u16 + 4).min(size.height);
    let width = size.width.min(60);
    let area = Rect {
        x: size.x + (size.width - width) / 2,
        y: size.y + 1,
        width,
        height,
    };
    let mut lines: Vec<Line> = alerts
        .iter()
        .map(|a| {
            let when = a.reminder_time.map(format_reminder).unwrap_or_default();
            Line::from(vec![
                Span::styled("⏰ ", Style::default()),
                Span::styled(a.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("  {}", when)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter / x to dismiss",
        Style::default().fg(Color::Gray),
    )));
    let popup = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Reminder! "))
        .style(Style::default().fg(Color::White).bg(Color::Red))
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}
