// 🖥️ Terminal Viewer - merged entities, policy summary, gap charts
use anyhow::Result;
use broker_privacy::{GapPoint, MergedEntity, MergedTable, SummaryRow};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Entities,
    PolicySummary,
    Gap,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Entities => Page::PolicySummary,
            Page::PolicySummary => Page::Gap,
            Page::Gap => Page::Entities,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Entities => Page::Gap,
            Page::PolicySummary => Page::Entities,
            Page::Gap => Page::PolicySummary,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Entities => "Brokers",
            Page::PolicySummary => "Policy Summary",
            Page::Gap => "Gap Analysis",
        }
    }
}

/// A titled set of gap points (one per dumbbell chart)
pub struct GapView {
    pub title: String,
    pub points: Vec<GapPoint>,
}

pub struct App {
    pub merged: MergedTable,
    pub summary: Vec<SummaryRow>,
    pub response_order: Vec<String>,
    pub response_colors: Vec<String>,
    pub gaps: Vec<GapView>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,

    /// Selected question on the summary page, selected view on the gap page
    pub question_index: usize,
    pub gap_index: usize,
}

impl App {
    pub fn new(merged: MergedTable) -> Self {
        let mut state = TableState::default();
        if !merged.is_empty() {
            state.select(Some(0));
        }

        Self {
            merged,
            summary: Vec::new(),
            response_order: Vec::new(),
            response_colors: Vec::new(),
            gaps: Vec::new(),
            state,
            current_page: Page::Entities,
            show_detail: false,
            question_index: 0,
            gap_index: 0,
        }
    }

    pub fn with_summary(mut self, summary: Vec<SummaryRow>, order: Vec<String>, colors: Vec<String>) -> Self {
        self.summary = summary;
        self.response_order = order;
        self.response_colors = colors;
        self
    }

    pub fn with_gap(mut self, title: &str, points: Vec<GapPoint>) -> Self {
        self.gaps.push(GapView {
            title: title.to_string(),
            points,
        });
        self
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_entity(&self) -> Option<&MergedEntity> {
        self.state.selected().and_then(|i| self.merged.entities.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Questions present in the summary, in first-seen order
    pub fn questions(&self) -> Vec<&str> {
        let mut questions: Vec<&str> = Vec::new();
        for row in &self.summary {
            if !questions.contains(&row.question.as_str()) {
                questions.push(&row.question);
            }
        }
        questions
    }

    /// Cycle the question (summary page) or the gap view (gap page)
    pub fn next_view(&mut self) {
        match self.current_page {
            Page::PolicySummary => {
                let n = self.questions().len();
                if n > 0 {
                    self.question_index = (self.question_index + 1) % n;
                }
            }
            Page::Gap => {
                if !self.gaps.is_empty() {
                    self.gap_index = (self.gap_index + 1) % self.gaps.len();
                }
            }
            Page::Entities => {}
        }
    }

    pub fn previous_view(&mut self) {
        match self.current_page {
            Page::PolicySummary => {
                let n = self.questions().len();
                if n > 0 {
                    self.question_index = (self.question_index + n - 1) % n;
                }
            }
            Page::Gap => {
                let n = self.gaps.len();
                if n > 0 {
                    self.gap_index = (self.gap_index + n - 1) % n;
                }
            }
            Page::Entities => {}
        }
    }

    pub fn next(&mut self) {
        let len = self.merged.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.merged.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.merged.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_STEP).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_STEP))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    /// Registry sources that list an entity
    pub fn entity_sources<'a>(&'a self, entity: &MergedEntity) -> Vec<&'a str> {
        self.merged
            .schema
            .registry_sources
            .iter()
            .zip(&entity.sources)
            .filter(|(_, flag)| **flag)
            .map(|(source, _)| source.as_str())
            .collect()
    }

    /// `Collects*` columns an entity reports collecting
    pub fn entity_collects<'a>(&'a self, entity: &MergedEntity) -> Vec<&'a str> {
        self.merged
            .schema
            .collects_columns
            .iter()
            .zip(&entity.collects)
            .filter(|(_, value)| **value == 1.0)
            .map(|(column, _)| column.as_str())
            .collect()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Right | KeyCode::Char('l') => app.next_view(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_view(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.merged.is_empty() {
                        app.state.select(Some(app.merged.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Entities if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_entities(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Entities => render_entities(f, chunks[1], app),
        Page::PolicySummary => render_policy_summary(f, chunks[1], app),
        Page::Gap => render_gap(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Entities, Page::PolicySummary, Page::Gap];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let members: usize = app.merged.entities.iter().map(|e| e.member_count).sum();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entities: {}", app.merged.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Rows merged: {}", members),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_entities(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Name", "Rows", "Sources", "Collects"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .merged
        .entities
        .iter()
        .map(|entity| {
            let sources = app.entity_sources(entity).join(", ");
            let collects = app.entity_collects(entity).len();
            let color = if entity.member_count > 1 {
                Color::Cyan
            } else {
                Color::White
            };

            Row::new(vec![
                Cell::from(truncate(&entity.name, 40)),
                Cell::from(entity.member_count.to_string()).style(Style::default().fg(color)),
                Cell::from(truncate(&sources, 30)),
                Cell::from(format!("{}/{}", collects, app.merged.schema.collects_columns.len())),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(42),
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Merged Brokers "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(entity) = app.selected_entity() else {
        let empty = Paragraph::new("No broker selected")
            .block(Block::default().borders(Borders::ALL).title(" Details "));
        f.render_widget(empty, area);
        return;
    };

    let label = Style::default().fg(Color::Yellow);
    let mut lines = vec![
        Line::from(Span::styled(
            entity.name.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Registry rows: ", label),
            Span::raw(entity.member_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Sources: ", label),
            Span::raw(app.entity_sources(entity).join(", ")),
        ]),
        Line::from(""),
        Line::from(Span::styled("Collects:", label)),
    ];

    for (column, value) in app.merged.schema.collects_columns.iter().zip(&entity.collects) {
        let (mark, color) = match *value {
            v if v == 1.0 => ("yes", Color::Red),
            v if v == 0.0 => ("no", Color::Green),
            _ => ("not reported", Color::DarkGray),
        };
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<32}", truncate(column, 32))),
            Span::styled(mark, Style::default().fg(color)),
        ]));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Details "),
    );

    f.render_widget(panel, area);
}

fn response_color(app: &App, label: &str) -> Color {
    app.response_order
        .iter()
        .position(|l| l == label)
        .and_then(|i| app.response_colors.get(i))
        .and_then(|hex| hex.parse::<Color>().ok())
        .unwrap_or(Color::White)
}

fn render_policy_summary(f: &mut Frame, area: Rect, app: &App) {
    let questions = app.questions();
    let Some(question) = questions.get(app.question_index).copied() else {
        render_placeholder(f, area, " Policy Summary ", "No LLM results loaded (pass --llm)");
        return;
    };

    // one group per category, one bar per response label (share in %)
    let mut groups: Vec<(String, Vec<&SummaryRow>)> = Vec::new();
    for row in app.summary.iter().filter(|r| r.question == question) {
        match groups.iter_mut().find(|(c, _)| *c == row.category_label) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((row.category_label.clone(), vec![row])),
        }
    }

    let mut chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ({}/{}) ", question, app.question_index + 1, questions.len())),
        )
        .bar_width(5)
        .bar_gap(1)
        .group_gap(3)
        .max(100);

    for (category, rows) in &groups {
        let bars: Vec<Bar> = rows
            .iter()
            .map(|row| {
                let pct = (row.share * 100.0).round() as u64;
                Bar::default()
                    .value(pct)
                    .text_value(format!("{}%", pct))
                    .label(Line::from(abbreviate(&row.response_label)))
                    .style(Style::default().fg(response_color(app, &row.response_label)))
            })
            .collect();
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(truncate(category, 18)))
                .bars(&bars),
        );
    }

    f.render_widget(chart, area);
}

fn render_gap(f: &mut Frame, area: Rect, app: &App) {
    let Some(view) = app.gaps.get(app.gap_index) else {
        render_placeholder(f, area, " Gap Analysis ", "No survey loaded (pass --survey)");
        return;
    };

    let mut categories: Vec<&str> = Vec::new();
    for point in &view.points {
        if !categories.contains(&point.category.as_str()) {
            categories.push(&point.category);
        }
    }

    let mut chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ({}/{}) ", view.title, app.gap_index + 1, app.gaps.len())),
        )
        .bar_width(6)
        .bar_gap(1)
        .group_gap(3)
        .max(100);

    for category in categories {
        let bars: Vec<Bar> = view
            .points
            .iter()
            .filter(|p| p.category == category)
            .map(|p| {
                let color = if p.source.starts_with("Data Brokers") {
                    Color::Blue
                } else {
                    Color::Red
                };
                Bar::default()
                    .value(p.percentage.round().max(0.0) as u64)
                    .text_value(format!("{:.1}", p.percentage))
                    .label(Line::from(abbreviate(&p.source)))
                    .style(Style::default().fg(color))
            })
            .collect();
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(truncate(category, 18)))
                .bars(&bars),
        );
    }

    f.render_widget(chart, area);
}

fn render_placeholder(f: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", message), Style::default().fg(Color::DarkGray))),
    ])
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if app.current_page == Page::Entities {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.merged.len()),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Details | "));
        status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Nav | "));
        status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Fast | "));
    } else {
        status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Chart | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Initials for bar labels ("Not Mentioned" → "NM")
fn abbreviate(label: &str) -> String {
    let words: Vec<&str> = label.split_whitespace().collect();
    if words.len() <= 1 {
        return truncate(label, 5);
    }
    words
        .iter()
        .filter_map(|w| w.chars().find(|c| c.is_alphanumeric()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_privacy::BrokerSchema;

    fn merged() -> MergedTable {
        MergedTable {
            schema: BrokerSchema {
                collects_columns: vec!["CollectsA".to_string(), "CollectsB".to_string()],
                registry_sources: vec!["CA".to_string(), "VT".to_string()],
                passthrough_columns: vec![],
            },
            entities: vec![
                MergedEntity {
                    name: "ACME".to_string(),
                    sources: vec![true, true],
                    collects: vec![1.0, 2.0],
                    passthrough: vec![],
                    member_count: 2,
                },
                MergedEntity {
                    name: "BETA".to_string(),
                    sources: vec![false, true],
                    collects: vec![0.0, 1.0],
                    passthrough: vec![],
                    member_count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = App::new(merged());
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(1));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_entity_sources_and_collects() {
        let app = App::new(merged());
        let acme = &app.merged.entities[0];
        assert_eq!(app.entity_sources(acme), vec!["CA", "VT"]);
        assert_eq!(app.entity_collects(acme), vec!["CollectsA"]);
    }

    #[test]
    fn test_gap_view_cycles() {
        let mut app = App::new(MergedTable::empty())
            .with_gap("Data Types", vec![])
            .with_gap("Use Cases", vec![]);
        app.current_page = Page::Gap;
        app.next_view();
        assert_eq!(app.gap_index, 1);
        app.next_view();
        assert_eq!(app.gap_index, 0);
        app.previous_view();
        assert_eq!(app.gap_index, 1);
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("Not Mentioned"), "NM");
        assert_eq!(abbreviate("Data Brokers (Reported)"), "DBR");
        assert_eq!(abbreviate("Yes"), "Yes");
    }
}
