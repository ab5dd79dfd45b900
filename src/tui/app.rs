#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs,
    Wrap,
};

use crate::config::{self, Config, StartTab};
use crate::task::calendar::{format_iso, parse_date};
use crate::task::view::StatsRange;
use crate::task::{Priority, Task, TaskId, TaskStore};
use crate::tui;
use crate::tui::editor::{EditorField, TaskEditor};
use crate::tui::input::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Today,
    Upcoming,
    History,
    Stats,
    Help,
}

impl TabId {
    const ALL: [TabId; 5] = [
        TabId::Today,
        TabId::Upcoming,
        TabId::History,
        TabId::Stats,
        TabId::Help,
    ];

    fn title(self) -> &'static str {
        match self {
            TabId::Today => "Today",
            TabId::Upcoming => "Upcoming",
            TabId::History => "History",
            TabId::Stats => "Stats",
            TabId::Help => "Help",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl From<StartTab> for TabId {
    fn from(t: StartTab) -> Self {
        match t {
            StartTab::Today => TabId::Today,
            StartTab::Upcoming => TabId::Upcoming,
            StartTab::History => TabId::History,
            StartTab::Stats => TabId::Stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Editor,
    Confirm,
}

#[derive(Debug, Clone)]
struct ConfirmDialog {
    title: String,
    message: String,
    yes_label: String,
    no_label: String,
    action: ConfirmAction,
}

#[derive(Debug, Clone)]
enum ConfirmAction {
    DeleteTask { id: TaskId, title: String },
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    until: Instant,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

/// One line of a task list: a section header, a task, or an empty-state note.
enum ListRow<'a> {
    Header(Line<'a>),
    Task(&'a Task),
    Note(&'static str),
}

struct AppState {
    cfg: Config,
    store: TaskStore,

    tab: TabId,
    /// Index into the tasks visible on the current tab.
    selected: usize,
    list_state: ListState,
    show_late: bool,
    stats_range: StatsRange,

    editor: Option<TaskEditor>,
    confirm: Option<ConfirmDialog>,
    toast: Option<Toast>,
    last_error: Option<String>,
    should_quit: bool,
}

impl AppState {
    fn new(cfg: Config, store: TaskStore) -> Self {
        let tab = TabId::from(cfg.ui.start_tab);
        let show_late = cfg.ui.show_late;
        let stats_range = cfg.stats.default_range;
        Self {
            cfg,
            store,
            tab,
            selected: 0,
            list_state: ListState::default(),
            show_late,
            stats_range,
            editor: None,
            confirm: None,
            toast: None,
            last_error: None,
            should_quit: false,
        }
    }

    fn mode(&self) -> Mode {
        if self.confirm.is_some() {
            Mode::Confirm
        } else if self.editor.is_some() {
            Mode::Editor
        } else {
            Mode::Normal
        }
    }

    fn set_tab(&mut self, tab: TabId) {
        if self.tab != tab {
            self.tab = tab;
            self.selected = 0;
        }
    }

    fn visible_tasks(&self) -> Vec<TaskId> {
        tab_rows(&self.store, self.tab, self.show_late)
            .into_iter()
            .filter_map(|row| match row {
                ListRow::Task(t) => Some(t.id),
                _ => None,
            })
            .collect()
    }

    fn selected_task(&self) -> Option<&Task> {
        let id = self.visible_tasks().get(self.selected).copied()?;
        self.store.get(id)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.visible_tasks().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let cur = i64::try_from(self.selected).unwrap_or(0);
        let max = i64::try_from(len - 1).unwrap_or(0);
        self.selected = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
    }

    fn select_task(&mut self, id: TaskId) {
        if let Some(pos) = self.visible_tasks().iter().position(|t| *t == id) {
            self.selected = pos;
        } else {
            self.clamp_selection();
        }
    }
}

pub fn run(cfg: Config, store: TaskStore) -> anyhow::Result<()> {
    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg, store);
    tracing::info!(tasks = app.store.len(), tab = app.tab.title(), "tui started");

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        {
            let Some(terminal) = guard.terminal.as_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(key, &mut app);
        }
    }

    tracing::info!(tasks = app.store.len(), "tui exited");
    Ok(())
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_tabs(f, root[0], app);
    draw_body(f, root[1], app);
    draw_footer(f, root[2], app);

    if let Some(editor) = &app.editor {
        draw_editor_popup(f, editor);

        let popup = editor_popup_rect(area);
        let inner = Block::default()
            .borders(Borders::ALL)
            .title(editor.heading())
            .inner(popup);
        let (line_idx, input) = match editor.field {
            EditorField::Title => (0u16, Some(&editor.title)),
            EditorField::Description => (1u16, Some(&editor.description)),
            EditorField::Due => (2u16, Some(&editor.due)),
            EditorField::Priority => (3u16, None),
        };
        if let Some(input) = input
            && app.confirm.is_none()
            && inner.width > 0
        {
            let (_, col) = input.window(field_value_width(inner));
            let prefix = u16::try_from(FIELD_PREFIX_WIDTH).unwrap_or(0);
            let x = inner
                .x
                .saturating_add(prefix)
                .saturating_add(col)
                .min(inner.x + inner.width - 1);
            f.set_cursor_position((x, inner.y + line_idx));
        }
    }

    if let Some(confirm) = &app.confirm {
        draw_confirm(f, confirm);
    }
}

fn draw_tabs(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let titles: Vec<Line> = TabId::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let idx = i + 1;
            let mut title = format!("{} [{idx}]", t.title());
            match t {
                TabId::Today => {
                    title = format!("{title} ({})", app.store.today_view().pending());
                }
                TabId::Upcoming => {
                    title = format!("{title} ({})", app.store.upcoming_view().task_count());
                }
                TabId::History => {
                    title = format!("{title} ({})", app.store.history_view().len());
                }
                _ => {}
            }
            Line::from(title)
        })
        .collect();

    let selected = TabId::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");

    f.render_widget(tabs, chunks[0]);

    let today = format!(
        "{} ({})",
        app.store.today_label(),
        format_iso(app.store.today())
    );
    let date = Paragraph::new(Line::from(today))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(date, chunks[1]);
}

fn draw_body(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    match app.tab {
        TabId::Today | TabId::Upcoming | TabId::History => draw_task_tab(f, area, app),
        TabId::Stats => draw_stats_tab(f, area, app),
        TabId::Help => draw_help_tab(f, area),
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut left = match app.mode() {
        Mode::Normal => match app.tab {
            TabId::Today => "q quit • 1-5 tabs • j/k move • n new • Enter edit • space done • d delete • L late".to_owned(),
            TabId::Upcoming => "q quit • 1-5 tabs • j/k move • n new • Enter edit • space done • d delete".to_owned(),
            TabId::History => "q quit • 1-5 tabs • j/k move • Enter edit • space reopen • d delete".to_owned(),
            TabId::Stats => "q quit • 1-5 tabs • r range".to_owned(),
            TabId::Help => "q quit • 1-5 tabs".to_owned(),
        },
        Mode::Editor => {
            let mut keys = "Enter next/save • Tab switch field • Ctrl-S save • Esc cancel".to_owned();
            if app.editor.as_ref().is_some_and(|e| e.editing().is_some()) {
                keys.push_str(" • Ctrl-D delete");
            }
            keys
        }
        Mode::Confirm => match app.confirm.as_ref().map(|c| &c.action) {
            Some(ConfirmAction::DeleteTask { .. }) => "y delete • n cancel".to_owned(),
            None => "y confirm • n cancel".to_owned(),
        },
    };

    if let Some(err) = &app.last_error {
        left = format!("Error: {err}");
    } else if let Some(toast) = &app.toast {
        left.clone_from(&toast.message);
    }

    let right = match app.tab {
        TabId::Today => format!("Late: {}", if app.show_late { "shown" } else { "hidden" }),
        TabId::Stats => format!("Range: {}", app.stats_range.label()),
        _ => String::new(),
    };

    let spans = vec![
        Span::styled(left, Style::default().fg(Color::White).bg(Color::Blue)),
        Span::raw(" "),
        Span::styled(
            right,
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::DIM),
        ),
    ];

    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue));
    f.render_widget(p, area);
}

fn tab_rows(store: &TaskStore, tab: TabId, show_late: bool) -> Vec<ListRow<'_>> {
    let mut rows = Vec::new();
    match tab {
        TabId::Today => {
            let view = store.today_view();
            if view.is_empty() {
                rows.push(ListRow::Note("Nothing left for today."));
                return rows;
            }
            if !view.late.is_empty() {
                let marker = if show_late { "▾" } else { "▸" };
                rows.push(ListRow::Header(Line::styled(
                    format!("{marker} Late ({})", view.late.len()),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
                if show_late {
                    rows.extend(view.late.iter().copied().map(ListRow::Task));
                }
            }
            rows.push(ListRow::Header(Line::styled(
                format!("Today ({})", view.today.len()),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            if view.today.is_empty() {
                rows.push(ListRow::Note("Nothing due today."));
            }
            rows.extend(view.today.iter().copied().map(ListRow::Task));
        }
        TabId::Upcoming => {
            let view = store.upcoming_view();
            if view.is_empty() {
                rows.push(ListRow::Note("Nothing scheduled."));
            }
            for group in view.groups {
                rows.push(ListRow::Header(Line::styled(
                    group.label.to_uppercase(),
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                )));
                rows.extend(group.tasks.into_iter().map(ListRow::Task));
            }
        }
        TabId::History => {
            let done = store.history_view();
            if done.is_empty() {
                rows.push(ListRow::Note("No completed tasks."));
            }
            rows.extend(done.into_iter().map(ListRow::Task));
        }
        TabId::Stats | TabId::Help => {}
    }
    rows
}

fn draw_task_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let title = match app.tab {
        TabId::Today => format!(
            "Today • {} • {} pending",
            app.store.today_label(),
            app.store.today_view().pending()
        ),
        TabId::Upcoming => "Upcoming".to_owned(),
        _ => "History".to_owned(),
    };

    let rows = tab_rows(&app.store, app.tab, app.show_late);
    let icons = app.cfg.ui.icons;

    let mut task_idx = 0usize;
    let mut highlighted = None;
    let items: Vec<ListItem> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            ListRow::Header(line) => ListItem::new(line),
            ListRow::Note(msg) => ListItem::new(Line::styled(
                msg,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            ListRow::Task(task) => {
                if task_idx == app.selected {
                    highlighted = Some(i);
                }
                task_idx += 1;
                ListItem::new(task_line(task, icons))
            }
        })
        .collect();

    app.list_state.select(highlighted);

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn task_line(task: &Task, icons: bool) -> Line<'_> {
    let check = match (icons, task.completed) {
        (true, true) => "✔ ",
        (true, false) => "○ ",
        (false, true) => "[x] ",
        (false, false) => "[ ] ",
    };
    let pill = if task.completed {
        Color::DarkGray
    } else {
        hex_color(&task.color)
    };
    let title_style = if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let date_style = if task.is_overdue() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut spans = vec![
        Span::raw(check),
        Span::styled("▌", Style::default().fg(pill)),
        Span::raw(" "),
        Span::styled(task.title.as_str(), title_style),
    ];
    if let Some(desc) = task.description() {
        spans.push(Span::styled(
            format!("  {desc}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::styled(format!("  {}", task.date_label), date_style));
    if !task.completed {
        spans.push(Span::styled(
            format!("  P{}", task.priority.value()),
            Style::default().fg(pill),
        ));
    }
    Line::from(spans)
}

fn hex_color(hex: &str) -> Color {
    hex.parse::<Color>().unwrap_or(Color::Gray)
}

fn draw_stats_tab(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let stats = app.store.stats_view(app.stats_range);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let mut range_spans = Vec::new();
    for range in StatsRange::ALL {
        let style = if range == stats.range {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        range_spans.push(Span::styled(format!(" {} ", range.label()), style));
        range_spans.push(Span::raw(" "));
    }

    let header = vec![
        Line::from(vec![
            Span::styled(
                stats.completed.to_string(),
                Style::default()
                    .fg(Color::LightGreen)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" COMPLETED"),
        ]),
        Line::from(""),
        Line::from(range_spans),
    ];
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title("Productivity")),
        chunks[0],
    );

    let bars: Vec<Bar> = stats
        .series
        .iter()
        .map(|p| {
            let style = if p.is_today {
                Style::default().fg(Color::LightBlue)
            } else {
                Style::default().fg(Color::Blue)
            };
            Bar::default()
                .value(u64::from(p.value))
                .text_value(format!("{}%", p.value))
                .label(Line::from(p.label.clone()))
                .style(style)
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Last 7 days"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(2)
        .max(100);
    f.render_widget(chart, chunks[1]);

    if stats.series_is_sample {
        let caption = Paragraph::new(Line::from(
            "sample data: the chart is not derived from your tasks",
        ))
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );
        f.render_widget(caption, chunks[2]);
    }
}

fn draw_help_tab(f: &mut Frame<'_>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let config_path = config::default_paths().map_or_else(
        |e| e.to_string(),
        |p| config::tilde_path(&p.config_file.to_string_lossy()),
    );

    let lines = vec![
        Line::from("daybook: today, upcoming and done"),
        Line::from(""),
        Line::from("Global keys:"),
        Line::from("  1-5 / h/l   Switch tabs (Tab / Shift-Tab too)"),
        Line::from("  ?           Help"),
        Line::from("  q / Ctrl-C  Quit"),
        Line::from(""),
        Line::from("Task lists:"),
        Line::from("  j/k, ↑/↓    Move selection"),
        Line::from("  g/G         First/last task"),
        Line::from("  n           New task (Today, Upcoming)"),
        Line::from("  Enter / e   Edit selected task"),
        Line::from("  space / x   Toggle done"),
        Line::from("  d           Delete selected task"),
        Line::from("  L           Show/hide late tasks (Today)"),
        Line::from(""),
        Line::from("Editor:"),
        Line::from("  Tab/↑/↓     Switch field"),
        Line::from("  + / -       Move the date by a day"),
        Line::from("  ←/→ / p     Change priority (1-4 jumps)"),
        Line::from("  Ctrl-S      Save"),
        Line::from("  Ctrl-D      Delete (when editing)"),
        Line::from(""),
        Line::from("Stats tab:"),
        Line::from("  r           Cycle range"),
        Line::from(""),
        Line::from(format!("Config: {config_path}")),
        Line::from("Tasks live in memory only and are gone when you quit."),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

const FIELD_PREFIX_WIDTH: usize = 13;

fn editor_popup_rect(area: Rect) -> Rect {
    centered_rect(70, 50, area)
}

/// Columns left for a field's value after its label; values scroll within it.
fn field_value_width(inner: Rect) -> usize {
    usize::from(inner.width).saturating_sub(FIELD_PREFIX_WIDTH)
}

fn draw_editor_popup(f: &mut Frame<'_>, editor: &TaskEditor) {
    let area = editor_popup_rect(f.area());
    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(editor.heading());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let active_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().add_modifier(Modifier::BOLD);
    let hint_style = Style::default().fg(Color::DarkGray);
    let error_style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);

    let field_style = |field: EditorField| {
        if editor.field == field {
            active_style
        } else {
            Style::default()
        }
    };
    let field_label = |field: EditorField| {
        Span::styled(
            format!("{:<width$}", format!("{}:", field.label()), width = FIELD_PREFIX_WIDTH),
            label_style,
        )
    };

    let value_width = field_value_width(inner);
    let value = |field: EditorField, input: &TextInput| {
        Span::styled(input.window(value_width).0, field_style(field))
    };

    let priority = editor.priority;
    let mut lines = vec![
        Line::from(vec![
            field_label(EditorField::Title),
            value(EditorField::Title, &editor.title),
        ]),
        Line::from(vec![
            field_label(EditorField::Description),
            value(EditorField::Description, &editor.description),
        ]),
        Line::from(vec![
            field_label(EditorField::Due),
            value(EditorField::Due, &editor.due),
            Span::styled("  YYYY-MM-DD, +/- a day", hint_style),
        ]),
        Line::from(vec![
            field_label(EditorField::Priority),
            Span::styled("● ", Style::default().fg(hex_color(priority.color()))),
            Span::styled(priority.label(), field_style(EditorField::Priority)),
            Span::styled("  ←/→", hint_style),
        ]),
    ];

    // Field rows never wrap so the cursor row stays put; the error gets its
    // own row under the fields.
    lines.push(match editor.error.as_deref() {
        Some(err) => Line::from(vec![
            Span::raw(" ".repeat(FIELD_PREFIX_WIDTH)),
            Span::styled(format!("{}: {err}", editor.field.label()), error_style),
        ]),
        None => Line::from(""),
    });
    lines.push(Line::from(Span::styled(
        "Enter on Priority or Ctrl-S saves",
        hint_style,
    )));

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_confirm(f: &mut Frame<'_>, confirm: &ConfirmDialog) {
    let area = centered_rect(60, 25, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(confirm.title.as_str());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(confirm.message.clone()),
        Line::from(""),
        Line::from(format!(
            "[y] {}    [n] {}",
            confirm.yes_label, confirm.no_label
        )),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn handle_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return;
    }

    // Modals take precedence
    match app.mode() {
        Mode::Confirm => {
            handle_confirm_key(key, app);
            return;
        }
        Mode::Editor => {
            handle_editor_key(key, app);
            return;
        }
        Mode::Normal => {}
    }

    app.last_error = None;

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?' | '5') => app.set_tab(TabId::Help),
        KeyCode::Char('1') => app.set_tab(TabId::Today),
        KeyCode::Char('2') => app.set_tab(TabId::Upcoming),
        KeyCode::Char('3') => app.set_tab(TabId::History),
        KeyCode::Char('4') => app.set_tab(TabId::Stats),
        KeyCode::Char('h') | KeyCode::BackTab => app.set_tab(app.tab.prev()),
        KeyCode::Char('l') | KeyCode::Tab => app.set_tab(app.tab.next()),
        _ => {}
    }

    match app.tab {
        TabId::Today | TabId::Upcoming | TabId::History => handle_task_list_key(key, app),
        TabId::Stats => {
            if matches!(key.code, KeyCode::Char('r')) {
                app.stats_range = app.stats_range.next();
            }
        }
        TabId::Help => {}
    }
}

fn handle_task_list_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char('g') | KeyCode::Home => app.selected = 0,
        KeyCode::Char('G') | KeyCode::End => {
            app.selected = app.visible_tasks().len().saturating_sub(1);
        }
        KeyCode::Char('n') if matches!(app.tab, TabId::Today | TabId::Upcoming) => {
            let priority = app.cfg.tasks.default_priority();
            app.editor = Some(TaskEditor::create(app.store.today(), priority));
        }
        KeyCode::Enter | KeyCode::Char('e') => {
            if let Some(editor) = app.selected_task().map(TaskEditor::edit) {
                app.editor = Some(editor);
            }
        }
        KeyCode::Char(' ' | 'x') => toggle_selected_task(app),
        KeyCode::Char('d') => {
            if let Some(confirm) = app.selected_task().map(|t| delete_confirm(t.id, &t.title)) {
                app.confirm = Some(confirm);
            }
        }
        KeyCode::Char('L') if app.tab == TabId::Today => {
            app.show_late = !app.show_late;
            app.clamp_selection();
        }
        _ => {}
    }
}

fn toggle_selected_task(app: &mut AppState) {
    let Some(id) = app.selected_task().map(|t| t.id) else {
        return;
    };
    match app.store.toggle_completion(id) {
        Ok(task) => {
            let verb = if task.completed { "Done" } else { "Reopened" };
            app.toast = Some(Toast::info(format!("{verb}: {}", task.title)));
            app.clamp_selection();
        }
        Err(e) => app.last_error = Some(e.to_string()),
    }
}

fn delete_confirm(id: TaskId, title: &str) -> ConfirmDialog {
    ConfirmDialog {
        title: "Delete task".to_owned(),
        message: format!("Delete \"{title}\"? This cannot be undone."),
        yes_label: "Delete".to_owned(),
        no_label: "Cancel".to_owned(),
        action: ConfirmAction::DeleteTask {
            id,
            title: title.to_owned(),
        },
    }
}

fn handle_confirm_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('n') | KeyCode::Esc => {
            app.confirm = None;
        }
        KeyCode::Char('y') => {
            let Some(confirm) = app.confirm.take() else {
                return;
            };
            match confirm.action {
                ConfirmAction::DeleteTask { id, title } => {
                    // Deleting from inside the editor closes it too.
                    if app.editor.as_ref().and_then(TaskEditor::editing) == Some(id) {
                        app.editor = None;
                    }
                    match app.store.delete(id) {
                        Ok(_) => {
                            app.last_error = None;
                            app.toast = Some(Toast::info(format!("Deleted: {title}")));
                            app.clamp_selection();
                        }
                        Err(e) => app.last_error = Some(e.to_string()),
                    }
                }
            }
        }
        _ => {}
    }
}

fn handle_editor_key(key: KeyEvent, app: &mut AppState) {
    let today = app.store.today();
    let Some(editor) = app.editor.as_mut() else {
        return;
    };

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            app.editor = None;
            return;
        }
        KeyCode::Char('s') if ctrl => {
            submit_editor(app);
            return;
        }
        KeyCode::Char('d') if ctrl => {
            if let Some(id) = editor.editing() {
                let title = app
                    .store
                    .get(id)
                    .map_or_else(|| editor.title.as_str().to_owned(), |t| t.title.clone());
                app.confirm = Some(delete_confirm(id, &title));
            }
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            editor.focus_next();
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            editor.focus_prev();
            return;
        }
        KeyCode::Enter => {
            if editor.field == EditorField::Priority {
                submit_editor(app);
            } else {
                editor.focus_next();
            }
            return;
        }
        _ => {}
    }

    match editor.field {
        EditorField::Priority => match key.code {
            KeyCode::Left => editor.cycle_priority(false),
            KeyCode::Right | KeyCode::Char(' ' | 'p') => editor.cycle_priority(true),
            KeyCode::Char(c @ '1'..='4') => {
                if let Ok(p) = c.to_string().parse::<Priority>() {
                    editor.priority = p;
                }
            }
            _ => {}
        },
        // `+`/`-` step the date only while it parses; otherwise `-` is typed.
        EditorField::Due
            if matches!(key.code, KeyCode::Char('+' | '=' | '-'))
                && parse_date(editor.due.as_str(), today).is_ok() =>
        {
            let days = if matches!(key.code, KeyCode::Char('-')) { -1 } else { 1 };
            editor.step_due(days, today);
        }
        _ => {
            if let Some(input) = editor.focused_input()
                && input.handle_key(key)
            {
                editor.error = None;
            }
        }
    }
}

fn submit_editor(app: &mut AppState) {
    let Some(editor) = app.editor.as_mut() else {
        return;
    };
    let is_new = editor.editing().is_none();
    match editor.submit(&mut app.store) {
        Ok(Some(task)) => {
            app.editor = None;
            app.last_error = None;
            let verb = if is_new { "Created" } else { "Saved" };
            app.toast = Some(Toast::info(format!("{verb}: {}", task.title)));
            app.select_task(task.id);
        }
        Ok(None) => {}
        Err(e) => {
            app.editor = None;
            app.last_error = Some(e.to_string());
            app.clamp_selection();
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

struct TerminalGuard {
    terminal: Option<tui::CrosstermTerminal>,
}

impl TerminalGuard {
    fn new(terminal: tui::CrosstermTerminal) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = tui::restore_terminal(terminal);
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use time::Date;
    use time::macros::date;

    use super::*;
    use crate::task::TaskDraft;
    use crate::task::calendar::{DateLocale, FixedClock, add_days};

    const TODAY: Date = date!(2026 - 10 - 19);

    fn empty_app() -> AppState {
        let store = TaskStore::new(Box::new(FixedClock(TODAY)), DateLocale::EnUs);
        AppState::new(Config::default(), store)
    }

    fn demo_app() -> AppState {
        let store = TaskStore::new(Box::new(FixedClock(TODAY)), DateLocale::EnUs)
            .with_demo_tasks()
            .unwrap();
        AppState::new(Config::default(), store)
    }

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), app);
    }

    fn ctrl(app: &mut AppState, c: char) {
        handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL), app);
    }

    fn type_str(app: &mut AppState, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn render(app: &mut AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn tabs_cycle_and_jump() {
        let mut app = empty_app();
        assert_eq!(app.tab, TabId::Today);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.tab, TabId::Upcoming);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.tab, TabId::Help);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.tab, TabId::Stats);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.stats_range, StatsRange::Month);
    }

    #[test]
    fn start_tab_comes_from_config() {
        let mut cfg = Config::default();
        cfg.ui.start_tab = StartTab::History;
        cfg.ui.show_late = false;
        let app = AppState::new(
            cfg,
            TaskStore::new(Box::new(FixedClock(TODAY)), DateLocale::EnUs),
        );
        assert_eq!(app.tab, TabId::History);
        assert!(!app.show_late);
    }

    #[test]
    fn new_task_from_keyboard_lands_in_today() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode(), Mode::Editor);
        type_str(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode(), Mode::Normal);
        let today = app.store.today_view();
        assert_eq!(today.today.len(), 1);
        assert_eq!(today.today[0].title, "Buy milk");
        assert_eq!(today.today[0].priority, Priority::P2);
        assert!(app.toast.as_ref().unwrap().message.contains("Buy milk"));
    }

    #[test]
    fn new_task_is_unavailable_on_history() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('n'));
        assert!(app.editor.is_none());
    }

    #[test]
    fn empty_title_keeps_editor_open() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('n'));
        ctrl(&mut app, 's');

        let editor = app.editor.as_ref().unwrap();
        assert_eq!(editor.error.as_deref(), Some("Enter a task name"));
        assert!(app.store.is_empty());
        assert!(render(&mut app).contains("Enter a task name"));
    }

    #[test]
    fn long_title_scrolls_inside_the_editor() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('n'));
        type_str(&mut app, &"a".repeat(199));
        type_str(&mut app, "Z");

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let inner = Block::default()
            .borders(Borders::ALL)
            .inner(editor_popup_rect(Rect::new(0, 0, 100, 30)));
        let cursor = terminal.get_cursor_position().unwrap();
        assert!(cursor.x >= inner.x && cursor.x < inner.x + inner.width);
        assert_eq!(cursor.y, inner.y);

        let text = render(&mut app);
        let rows: Vec<&str> = text.lines().collect();
        let top = usize::from(inner.y);
        assert!(rows[top].contains("aZ"));
        assert!(rows[top + 3].contains("Priority:"));
    }

    #[test]
    fn priority_marker_hidden_once_completed() {
        let mut app = empty_app();
        let task = app
            .store
            .create(TaskDraft::new("Gym", TODAY).priority(Priority::P2))
            .unwrap();
        let text = |t: &Task| -> String {
            task_line(t, true)
                .spans
                .iter()
                .map(|s| s.content.as_ref())
                .collect()
        };
        assert!(text(&task).ends_with("P2"));

        let done = app.store.toggle_completion(task.id).unwrap();
        assert!(!text(&done).contains("P2"));
        assert!(text(&done).starts_with("✔ "));
    }

    #[test]
    fn date_field_steps_and_accepts_typed_dashes() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.editor.as_ref().unwrap().due.as_str(), "2026-10-20");

        for _ in 0..10 {
            press(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "2026-11-02");
        assert_eq!(app.editor.as_ref().unwrap().due.as_str(), "2026-11-02");
    }

    #[test]
    fn toggle_moves_task_to_history() {
        let mut app = demo_app();
        let first = app.selected_task().unwrap().id;
        press(&mut app, KeyCode::Char(' '));

        assert!(app.store.get(first).unwrap().completed);
        assert!(!app.visible_tasks().contains(&first));
        press(&mut app, KeyCode::Char('3'));
        assert!(app.visible_tasks().contains(&first));
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = demo_app();
        let before = app.store.len();
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode(), Mode::Confirm);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store.len(), before);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.store.len(), before - 1);
        assert!(app.toast.as_ref().unwrap().message.starts_with("Deleted"));
    }

    #[test]
    fn ctrl_d_in_editor_deletes_and_closes() {
        let mut app = demo_app();
        let id = app.selected_task().unwrap().id;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.editor.as_ref().unwrap().editing(), Some(id));
        ctrl(&mut app, 'd');
        press(&mut app, KeyCode::Char('y'));

        assert!(app.editor.is_none());
        assert!(app.store.get(id).is_none());
    }

    #[test]
    fn late_section_collapses() {
        let mut app = empty_app();
        app.store
            .create(TaskDraft::new("Overdue", add_days(TODAY, -2)))
            .unwrap();
        app.store.create(TaskDraft::new("Now", TODAY)).unwrap();
        assert_eq!(app.visible_tasks().len(), 2);

        press(&mut app, KeyCode::Char('L'));
        assert!(!app.show_late);
        assert_eq!(app.visible_tasks().len(), 1);
        assert!(render(&mut app).contains("▸ Late (1)"));
    }

    #[test]
    fn renders_every_tab() {
        let mut app = demo_app();
        let today = render(&mut app);
        assert!(today.contains("Project meeting"));
        assert!(today.contains("3 pending"));

        press(&mut app, KeyCode::Char('2'));
        let upcoming = render(&mut app);
        assert!(upcoming.contains("OCT 20"));
        assert!(upcoming.contains("Q2 planning"));

        press(&mut app, KeyCode::Char('3'));
        assert!(render(&mut app).contains("Pay the power bill"));

        press(&mut app, KeyCode::Char('4'));
        let stats = render(&mut app);
        assert!(stats.contains("2 COMPLETED"));
        assert!(stats.contains("sample data"));
    }

    #[test]
    fn empty_states_render_messages() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('2'));
        assert!(render(&mut app).contains("Nothing scheduled."));
        press(&mut app, KeyCode::Char('3'));
        assert!(render(&mut app).contains("No completed tasks."));
    }
}
