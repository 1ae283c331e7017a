use crate::action::{Change, Confirmation};
use crate::model::{Category, TodoError, TodoId, TodoItem};
use crate::store::TodoStore;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub fn run(store: TodoStore, location: PathBuf) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    info!("tui closed");
    result
}

struct App {
    store: TodoStore,
    location: PathBuf,
    selected: usize,
    status: String,
    mode: Mode,
    input: FieldValue,
    edit: FieldValue,
    last_save: Option<Instant>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum Mode {
    Normal,
    Input,
    Editing { id: TodoId },
    ConfirmDelete { id: TodoId },
}

#[derive(Clone, Default)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    /// Applies an editing key; true when the value changed.
    fn apply_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => {
                let before = self.value.len();
                self.backspace();
                return self.value.len() != before;
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c);
                return true;
            }
            _ => {}
        }
        false
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(store: TodoStore, location: PathBuf) -> Self {
        let status = format!("Loaded todos from {}", location.display());
        let input = FieldValue::new(store.draft_text());
        App {
            store,
            location,
            selected: 0,
            status,
            mode: Mode::Normal,
            input,
            edit: FieldValue::default(),
            last_save: None,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        self.store.flush();
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode.clone() {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Input => self.handle_input_key(key),
            Mode::Editing { id } => self.handle_edit_key(id, key),
            Mode::ConfirmDelete { id } => self.handle_confirm_key(id, key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Char('h')
            | KeyCode::Char('l') => {
                let next = self.store.active_category().other();
                self.switch_category(next);
            }
            KeyCode::Char('w') => self.switch_category(Category::Work),
            KeyCode::Char('t') => self.switch_category(Category::Travel),
            KeyCode::Char('i') | KeyCode::Char('a') => {
                self.mode = Mode::Input;
                self.status = "Type a todo (Enter add, Esc leave)".into();
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.toggle_complete(id.clone());
                    self.settle(result, "Toggled");
                }
            }
            KeyCode::Char('e') => match self.selected_item().cloned() {
                Some(item) => {
                    let result = self.store.start_edit(item.id.clone(), item.text.clone());
                    if result.is_ok() {
                        self.edit = FieldValue::new(&item.text);
                        self.mode = Mode::Editing { id: item.id };
                    }
                    self.settle(result, "Editing (Enter save, Esc cancel)");
                }
                None => self.status = "No todo selected to edit".into(),
            },
            KeyCode::Char('d') => match self.selected_item().cloned() {
                Some(item) => {
                    self.status =
                        format!("Delete \"{}\"? (y to confirm, n/Esc to cancel)", item.text);
                    self.mode = Mode::ConfirmDelete { id: item.id };
                }
                None => self.status = "No todo selected to delete".into(),
            },
            _ => {}
        }
        self.clamp_selection();
        false
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Input closed".into();
            }
            KeyCode::Enter => match self.store.add_todo() {
                Ok(id) => {
                    self.input = FieldValue::default();
                    self.mark_saved(format!("Added {}", id));
                    self.selected = self.store.visible().count().saturating_sub(1);
                }
                Err(TodoError::EmptyText) => self.status = "Nothing to add".into(),
                Err(err) => self.status = format!("Could not add: {}", err),
            },
            _ => {
                if self.input.apply_key(key) {
                    let result = self.store.set_draft_text(self.input.value.clone());
                    self.settle(result, "");
                }
            }
        }
    }

    fn handle_edit_key(&mut self, id: TodoId, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                let result = self.store.cancel_edit();
                self.mode = Mode::Normal;
                self.settle(result, "Edit canceled");
            }
            KeyCode::Enter => match self.store.save_edit(id.clone()) {
                Ok(_) => {
                    self.mode = Mode::Normal;
                    self.mark_saved(format!("Updated {}", id));
                }
                Err(TodoError::EmptyText) => self.status = "Text cannot be empty".into(),
                Err(err) => {
                    self.mode = Mode::Normal;
                    self.status = format!("Could not save: {}", err);
                }
            },
            _ => {
                if self.edit.apply_key(key) {
                    let result = self.store.update_edit_draft(self.edit.value.clone());
                    self.settle(result, "");
                }
            }
        }
    }

    fn handle_confirm_key(&mut self, id: TodoId, key: KeyEvent) {
        let confirmation = match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Confirmation::Confirm,
            KeyCode::Char('n') | KeyCode::Esc => Confirmation::Cancel,
            _ => return,
        };
        self.mode = Mode::Normal;
        match self.store.delete_todo(id.clone(), confirmation) {
            Ok(Change::Removed(_)) => self.mark_saved(format!("Deleted {}", id)),
            Ok(_) => self.status = "Delete canceled".into(),
            Err(err) => self.status = format!("Delete failed: {}", err),
        }
        self.clamp_selection();
    }

    fn switch_category(&mut self, category: Category) {
        let result = self.store.set_active_category(category);
        self.selected = 0;
        self.settle(result, &format!("Switched to {}", category));
    }

    /// Folds a dispatch result into the status line.
    fn settle(&mut self, result: Result<Change, TodoError>, message: &str) {
        match result {
            Ok(change) if change.is_persisted() => self.mark_saved(message.to_string()),
            Ok(_) => {
                if !message.is_empty() {
                    self.status = message.to_string();
                }
            }
            Err(err) => {
                debug!("ignored: {}", err);
                self.status = err.to_string();
            }
        }
    }

    fn mark_saved(&mut self, message: String) {
        self.last_save = Some(Instant::now());
        self.status = message;
    }

    fn selected_item(&self) -> Option<&TodoItem> {
        self.store.visible().nth(self.selected)
    }

    fn selected_id(&self) -> Option<TodoId> {
        self.selected_item().map(|item| item.id.clone())
    }

    fn clamp_selection(&mut self) {
        let count = self.store.visible().count();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_input(f, layout[1]);
        self.draw_list(f, layout[2]);
        self.draw_footer(f, layout[3]);

        if let Mode::ConfirmDelete { id } = &self.mode {
            self.draw_confirm(f, id);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let active = self.store.active_category();
        let mut tabs = Vec::new();
        for category in Category::ALL {
            let (total, done) = self.store.counts(category);
            let style = if category == active {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            tabs.push(Span::styled(category.label(), style));
            tabs.push(Span::styled(
                format!(" {}/{}", done, total),
                Style::default().fg(Color::Gray),
            ));
            tabs.push(Span::raw("      "));
        }
        let meta = Line::from(vec![
            Span::styled(
                "errand ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}", self.location.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format_elapsed(self.last_save),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(vec![Line::from(tabs), meta])
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_input(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.mode == Mode::Input;
        let line = if focused {
            Line::from(Span::styled(
                self.input.with_caret(),
                Style::default().fg(Color::Cyan),
            ))
        } else if self.input.value.is_empty() {
            Line::from(Span::styled(
                self.store.active_category().placeholder(),
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::raw(self.input.value.clone())
        };
        let border = if focused { Color::Cyan } else { Color::Gray };
        let input = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        );
        f.render_widget(input, area);
    }

    fn draw_list(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let editing_id = match &self.mode {
            Mode::Editing { id } => Some(id.as_str()),
            _ => None,
        };
        let items = self
            .store
            .visible()
            .map(|item| {
                if editing_id == Some(item.id.as_str()) {
                    edit_item(&self.edit)
                } else {
                    todo_item(item)
                }
            })
            .collect::<Vec<_>>();

        let title = format!("{} ({})", self.store.active_category(), items.len());
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        if items.is_empty() {
            let empty = Paragraph::new("Nothing here yet. Press i to add one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let mut state = ListState::default();
        state.select(Some(self.selected.min(items.len() - 1)));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::Rgb(52, 56, 66))
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = Style::default().fg(Color::LightCyan);
        let pairs: &[(&str, &str)] = match self.mode {
            Mode::Normal => &[
                ("Tab / w t", " category  "),
                ("i", " add  "),
                ("↑↓ / j k", " select  "),
                ("Space", " done  "),
                ("e", " edit  "),
                ("d", " delete  "),
                ("q", " quit"),
            ],
            Mode::Input => &[("Enter", " add  "), ("Esc", " leave")],
            Mode::Editing { .. } => &[("Enter", " save  "), ("Esc", " cancel")],
            Mode::ConfirmDelete { .. } => &[("y", " confirm  "), ("n / Esc", " cancel")],
        };
        let spans = pairs
            .iter()
            .flat_map(|(k, label)| [Span::styled(*k, key), Span::raw(*label)])
            .collect::<Vec<_>>();
        Line::from(spans)
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, id: &str) {
        let area = centered_rect(50, 30, f.size());
        let text = self
            .store
            .get(id)
            .map(|item| item.text.clone())
            .unwrap_or_else(|| id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", text),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        "Delete todo",
                        Style::default()
                            .fg(Color::LightRed)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
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

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn todo_item(item: &TodoItem) -> ListItem<'static> {
    let (check, style) = if item.completed {
        (
            "[x] ",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else {
        ("[ ] ", Style::default().fg(Color::White))
    };
    ListItem::new(Line::from(vec![
        Span::styled(check, Style::default().fg(Color::Gray)),
        Span::styled(item.text.clone(), style),
    ]))
}

fn edit_item(field: &FieldValue) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled("[~] ", Style::default().fg(Color::Cyan)),
        Span::styled(
            field.with_caret(),
            Style::default().fg(Color::Cyan).bg(Color::Rgb(22, 24, 30)),
        ),
    ]))
}

fn format_elapsed(last: Option<Instant>) -> String {
    let secs = match last {
        Some(at) => at.elapsed().as_secs(),
        None => return "no changes yet".into(),
    };
    if secs < 60 {
        format!("saved {}s ago", secs)
    } else if secs < 3600 {
        format!("saved {}m ago", secs / 60)
    } else {
        format!("saved {}h ago", secs / 3600)
    }
}
