use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Row, Table, Wrap};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};

use crate::browser::classify::satisfies_record_api_requirements;
use crate::browser::{BrowserStatus, DeleteOutcome, TableBrowserController};
use crate::errors::AdminError;
use crate::export::export_page_to_csv;
use crate::models::schema::{ListSchemasResponse, Relation, TableKind};
use crate::AdminManager;

const PAGE_SIZE_STEP: usize = 10;

pub struct AdminClientUI {
    manager: Arc<AdminManager>,
    current_screen: ScreenState,
    input_mode: InputMode,
    schemas: ListSchemasResponse,
    relations: Vec<Relation>,
    selected_relation: usize,
    browser: Option<TableBrowserController>,
    filter_input: String,
    selected_row: usize,
    marked_rows: BTreeSet<String>,
    message: Option<String>,
}

enum ScreenState {
    RelationList,
    RowView,
    SchemaView,
}

#[derive(PartialEq)]
enum InputMode {
    Normal,
    Filter,
}

impl AdminClientUI {
    pub fn new(manager: Arc<AdminManager>) -> Self {
        Self {
            manager,
            current_screen: ScreenState::RelationList,
            input_mode: InputMode::Normal,
            schemas: ListSchemasResponse::default(),
            relations: Vec::new(),
            selected_relation: 0,
            browser: None,
            filter_input: String::new(),
            selected_row: 0,
            marked_rows: BTreeSet::new(),
            message: None,
        }
    }

    pub async fn run(&mut self) -> Result<(), io::Error> {
        let _guard = TerminalGuard;
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.reload_schemas().await;
        let result = self.ui_loop(&mut terminal).await;

        terminal.show_cursor()?;

        result
    }

    async fn ui_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        loop {
            match self.current_screen {
                ScreenState::RelationList => self.relation_list_screen(terminal)?,
                ScreenState::RowView => self.row_view_screen(terminal)?,
                ScreenState::SchemaView => self.schema_screen(terminal)?,
            }

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                let quit = match self.current_screen {
                    ScreenState::RelationList => self.handle_relation_list_input(key.code).await,
                    ScreenState::RowView => match self.input_mode {
                        InputMode::Filter => {
                            self.handle_filter_input(key.code);
                            false
                        }
                        InputMode::Normal => self.handle_row_view_input(key.code).await,
                    },
                    ScreenState::SchemaView => {
                        if matches!(key.code, KeyCode::Esc | KeyCode::Char('s')) {
                            self.current_screen = ScreenState::RowView;
                        }
                        false
                    }
                };
                if quit {
                    return Ok(());
                }
            }

            self.sync_browser().await;
        }
    }

    async fn reload_schemas(&mut self) {
        match self.manager.list_schemas().await {
            Ok(schemas) => {
                self.relations = schemas.relations();
                if let Some(browser) = self.browser.as_mut() {
                    let current = browser.selected();
                    if let Some(fresh) = self.relations.iter().find(|r| r.name() == current.name()) {
                        browser.select_table(fresh.clone());
                    }
                }
                self.schemas = schemas;
                self.selected_relation = self
                    .selected_relation
                    .min(self.relations.len().saturating_sub(1));
            }
            Err(err) => {
                error!("failed to list schemas: {}", err);
                self.message = Some(format!("Failed to list tables: {}", err));
            }
        }
    }

    async fn sync_browser(&mut self) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        match browser.sync().await {
            Ok(true) => {
                let rows = browser.state().map(|s| s.response.rows.len()).unwrap_or(0);
                self.selected_row = self.selected_row.min(rows.saturating_sub(1));
            }
            Ok(false) => {}
            Err(err) => self.message = Some(describe_error(&err)),
        }
    }

    fn open_selected_relation(&mut self) {
        let Some(relation) = self.relations.get(self.selected_relation).cloned() else {
            return;
        };

        match self.browser.as_mut() {
            Some(browser) => browser.select_table(relation),
            None => self.browser = Some(self.manager.open_browser(relation)),
        }

        self.filter_input = self
            .browser
            .as_ref()
            .and_then(|b| b.filter())
            .unwrap_or_default();
        self.selected_row = 0;
        self.marked_rows.clear();
        self.message = None;
        self.current_screen = ScreenState::RowView;
    }

    async fn handle_relation_list_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Up => {
                if self.selected_relation > 0 {
                    self.selected_relation -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_relation + 1 < self.relations.len() {
                    self.selected_relation += 1;
                }
            }
            KeyCode::Enter => self.open_selected_relation(),
            KeyCode::Char('r') => self.reload_schemas().await,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            _ => {}
        }
        false
    }

    fn handle_filter_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) => self.filter_input.push(c),
            KeyCode::Backspace => {
                self.filter_input.pop();
            }
            KeyCode::Enter => {
                if let Some(browser) = self.browser.as_mut() {
                    browser.submit_filter(&self.filter_input);
                }
                self.selected_row = 0;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                self.filter_input = self
                    .browser
                    .as_ref()
                    .and_then(|b| b.filter())
                    .unwrap_or_default();
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    async fn handle_row_view_input(&mut self, key: KeyCode) -> bool {
        let Some(browser) = self.browser.as_mut() else {
            self.current_screen = ScreenState::RelationList;
            return false;
        };
        let row_count = browser
            .state()
            .map(|s| s.response.rows.len())
            .unwrap_or(0);

        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => self.current_screen = ScreenState::RelationList,
            KeyCode::Char('/') => self.input_mode = InputMode::Filter,
            KeyCode::Char('r') => browser.request_refresh(),
            KeyCode::Char('n') | KeyCode::Right => {
                browser.next_page();
                self.selected_row = 0;
            }
            KeyCode::Char('p') | KeyCode::Left => {
                browser.previous_page();
                self.selected_row = 0;
            }
            KeyCode::Char('+') => {
                let size = browser.pagination().page_size + PAGE_SIZE_STEP;
                browser.set_page_size(size);
            }
            KeyCode::Char('-') => {
                let size = browser.pagination().page_size.saturating_sub(PAGE_SIZE_STEP);
                browser.set_page_size(size);
            }
            KeyCode::Up => {
                if self.selected_row > 0 {
                    self.selected_row -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_row + 1 < row_count {
                    self.selected_row += 1;
                }
            }
            KeyCode::Char(' ') => {
                if !browser.selected().is_mutable() {
                    return false;
                }
                if let Some(pk) = browser.state().and_then(|s| s.pk_value(self.selected_row)) {
                    if !self.marked_rows.remove(&pk) {
                        self.marked_rows.insert(pk);
                    }
                }
            }
            KeyCode::Char('d') => {
                let values: Vec<String> = self.marked_rows.iter().cloned().collect();
                match browser.delete_rows(values).await {
                    Ok(DeleteOutcome::Deleted(_)) => {
                        self.message = Some(format!("Deleted {} row(s)", self.marked_rows.len()));
                        self.marked_rows.clear();
                    }
                    Ok(DeleteOutcome::Noop) => {}
                    Err(err) => {
                        self.message = Some(format!("Delete failed: {}", describe_error(&err)))
                    }
                }
            }
            KeyCode::Char('x') => {
                if let Some(state) = browser.state() {
                    let path = PathBuf::from(format!(
                        "{}_page{}.csv",
                        browser.selected().name(),
                        browser.pagination().page_index + 1
                    ));
                    self.message = Some(match export_page_to_csv(&state, &path) {
                        Ok(()) => {
                            info!("exported page to {}", path.display());
                            format!("Exported to {}", path.display())
                        }
                        Err(err) => format!("Export failed: {}", err),
                    });
                }
            }
            KeyCode::Char('s') => {
                if browser.selected().kind() == TableKind::Table {
                    self.current_screen = ScreenState::SchemaView;
                }
            }
            _ => {}
        }
        false
    }

    fn relation_list_screen(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let items: Vec<ListItem> = self
            .relations
            .iter()
            .enumerate()
            .map(|(i, relation)| {
                let kind = match relation.kind() {
                    TableKind::Table => "Table",
                    TableKind::View => "View",
                    TableKind::VirtualTable => "Virtual Table",
                };
                let api = if satisfies_record_api_requirements(relation) {
                    " [API]"
                } else {
                    ""
                };
                let label = format!("{} ({}){}", relation.name(), kind, api);

                let style = if i == self.selected_relation {
                    Style::default()
                        .bg(Color::Yellow)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD)
                } else if relation.is_hidden() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                };
                ListItem::new(label).style(style)
            })
            .collect();
        let message = self.message.clone().unwrap_or_default();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Percentage(10),
                        Constraint::Percentage(70),
                        Constraint::Percentage(20),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let block = Block::default()
                .title("Tables & Views")
                .borders(Borders::ALL)
                .title_alignment(Alignment::Center);
            f.render_widget(List::new(items).block(block), centered_rect(60, chunks[1]));

            let help = vec![
                Line::from(vec![
                    key_span("Up/Down", Color::Yellow),
                    Span::raw(" to navigate, "),
                    key_span("Enter", Color::Green),
                    Span::raw(" to browse, "),
                    key_span("r", Color::Yellow),
                    Span::raw(" to reload, "),
                    key_span("q", Color::Red),
                    Span::raw(" to quit"),
                ]),
                Line::from(Span::styled(message, Style::default().fg(Color::Red))),
            ];
            f.render_widget(
                Paragraph::new(help)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                chunks[2],
            );
        })?;

        Ok(())
    }

    fn row_view_screen(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let Some(browser) = self.browser.as_ref() else {
            return Ok(());
        };

        let relation = browser.selected();
        let pagination = browser.pagination();
        let state = browser.state();
        let (status_text, status_color) = match browser.status() {
            BrowserStatus::Idle | BrowserStatus::Loading => ("Loading...".to_string(), Color::Yellow),
            BrowserStatus::Ready(_) => (String::new(), Color::White),
            BrowserStatus::Error { message, .. } => {
                (format!("Failed to fetch rows: {}", message), Color::Red)
            }
        };
        let page_info = match (&state, browser.page_count()) {
            (Some(state), Some(count)) => format!(
                "Page {}/{} · {} rows · {} per page",
                pagination.page_index + 1,
                count.max(1),
                state.response.total_row_count,
                pagination.page_size
            ),
            _ => format!("Page {}", pagination.page_index + 1),
        };

        let mut header_cells = vec![Cell::from(" ")];
        let mut rows = Vec::new();
        let mut widths = vec![Constraint::Length(1)];
        if let Some(state) = &state {
            header_cells.extend(state.column_defs.iter().map(|def| Cell::from(def.header.clone())));
            widths.extend(state.column_defs.iter().map(|_| Constraint::Min(8)));

            for row_index in 0..state.response.rows.len() {
                let marked = state
                    .pk_value(row_index)
                    .map(|pk| self.marked_rows.contains(&pk))
                    .unwrap_or(false);
                let mut cells = vec![Cell::from(if marked { "*" } else { " " })];
                match state.render_row(row_index) {
                    Ok(rendered) => cells.extend(rendered.iter().map(|c| Cell::from(c.to_string()))),
                    Err(err) => cells.push(Cell::from(err.to_string())),
                }

                let style = if row_index == self.selected_row {
                    Style::default().bg(Color::Yellow).fg(Color::Black)
                } else {
                    Style::default().fg(Color::White)
                };
                rows.push(Row::new(cells).style(style));
            }
        }

        let filter_style = if self.input_mode == InputMode::Filter {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let filter_text = if self.filter_input.is_empty() && self.input_mode == InputMode::Normal {
            "e.g. \"latency[lt]=2 AND status=200\"".to_string()
        } else {
            self.filter_input.clone()
        };
        let message = self.message.clone().unwrap_or_default();
        let mutable = relation.is_mutable();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(5),
                        Constraint::Length(4),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let filter = Paragraph::new(filter_text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Filter")
                    .border_style(filter_style),
            );
            f.render_widget(filter, chunks[0]);

            let table = Table::new(rows, widths)
                .header(
                    Row::new(header_cells)
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                )
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(relation.name().to_string()),
                );
            f.render_widget(table, chunks[1]);

            let mut help = vec![
                key_span("n/p", Color::Yellow),
                Span::raw(" page, "),
                key_span("+/-", Color::Yellow),
                Span::raw(" size, "),
                key_span("/", Color::Yellow),
                Span::raw(" filter, "),
                key_span("r", Color::Yellow),
                Span::raw(" refresh, "),
                key_span("x", Color::Yellow),
                Span::raw(" export, "),
            ];
            if mutable {
                help.extend([
                    key_span("Space", Color::Yellow),
                    Span::raw(" mark, "),
                    key_span("d", Color::Red),
                    Span::raw(" delete marked, "),
                    key_span("s", Color::Yellow),
                    Span::raw(" schema, "),
                ]);
            }
            help.extend([key_span("Esc", Color::Red), Span::raw(" back")]);

            let footer = vec![
                Line::from(vec![
                    Span::raw(page_info),
                    Span::raw("  "),
                    Span::styled(status_text, Style::default().fg(status_color)),
                ]),
                Line::from(Span::styled(message, Style::default().fg(Color::Cyan))),
                Line::from(help),
            ];
            f.render_widget(Paragraph::new(footer).wrap(Wrap { trim: true }), chunks[2]);
        })?;

        Ok(())
    }

    fn schema_screen(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let Some(browser) = self.browser.as_ref() else {
            return Ok(());
        };
        let relation = browser.selected();

        let index_items: Vec<ListItem> = self
            .schemas
            .indexes_for(relation.name())
            .into_iter()
            .map(|idx| {
                let mut line = format!(
                    "{} ({}){}",
                    idx.name,
                    idx.column_list(),
                    if idx.unique { " UNIQUE" } else { "" }
                );
                if let Some(predicate) = idx.display_predicate() {
                    line.push_str(&format!(" WHERE {}", predicate));
                }
                ListItem::new(line)
            })
            .collect();
        let trigger_items: Vec<ListItem> = self
            .schemas
            .triggers_for(relation.name())
            .into_iter()
            .map(|trig| ListItem::new(format!("{}: {}", trig.name, trig.sql)))
            .collect();
        let column_items: Vec<ListItem> = relation
            .columns()
            .iter()
            .map(|col| ListItem::new(format!("{}: {} {:?}", col.name, col.data_type, col.options)))
            .collect();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Percentage(40),
                        Constraint::Percentage(30),
                        Constraint::Percentage(30),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let columns = List::new(column_items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} columns", relation.name())),
            );
            let indexes =
                List::new(index_items).block(Block::default().borders(Borders::ALL).title("Indexes"));
            let triggers = List::new(trigger_items)
                .block(Block::default().borders(Borders::ALL).title("Triggers"));

            f.render_widget(columns, chunks[0]);
            f.render_widget(indexes, chunks[1]);
            f.render_widget(triggers, chunks[2]);
        })?;

        Ok(())
    }
}

fn describe_error(err: &AdminError) -> String {
    if err.is_fetch_error() {
        format!("Server unreachable or returned an error: {}", err)
    } else {
        err.to_string()
    }
}

fn key_span(key: &'static str, color: Color) -> Span<'static> {
    Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
    }
}

fn centered_rect(percent_x: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    popup_layout[1]
}
