use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame, Terminal,
};
use std::io;

use snackonomics::{classify, filter_by_period, Category, Observation, Period, TrendReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Observations,
    Trends,
    Advisor,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Observations => Page::Trends,
            Page::Trends => Page::Advisor,
            Page::Advisor => Page::Observations,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Observations => Page::Advisor,
            Page::Trends => Page::Observations,
            Page::Advisor => Page::Trends,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Observations => "Observations",
            Page::Trends => "Trends",
            Page::Advisor => "Advisor",
        }
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Warning => Color::Yellow,
        Category::Success => Color::Green,
        Category::Info => Color::Cyan,
    }
}

pub struct App {
    pub observations: Vec<Observation>,
    pub filtered: Vec<Observation>,
    pub state: TableState,
    pub total_count: i64,
    pub current_page: Page,
    pub period: Period,
}

impl App {
    pub fn new(observations: Vec<Observation>, total_count: i64) -> Self {
        let mut state = TableState::default();
        if !observations.is_empty() {
            state.select(Some(0));
        }

        let filtered = observations.clone();

        Self {
            observations,
            filtered,
            state,
            total_count,
            current_page: Page::Observations,
            period: Period::All,
        }
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.filtered = filter_by_period(&self.observations, period);

        if self.filtered.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn report(&self) -> TrendReport {
        TrendReport::new(self.filtered.clone())
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(c @ '1'..='7') if app.current_page == Page::Trends => {
                    let index = c as usize - '1' as usize;
                    app.set_period(Period::ALL[index]);
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => {
                    if !app.filtered.is_empty() {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !app.filtered.is_empty() {
                        app.state.select(Some(app.filtered.len() - 1));
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
        Page::Observations => render_observations(f, chunks[1], app),
        Page::Trends => render_trends(f, chunks[1], app),
        Page::Advisor => render_advisor(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Observations, Page::Trends, Page::Advisor];

    let mut tab_spans = vec![Span::raw(" 🥪 ")];
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

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Records: {}", app.total_count),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Period: {}", app.period.label()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Snack Counter Pricing "),
    );

    f.render_widget(header, area);
}

fn render_observations(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "P start", "P end", "Q start", "Q end", "EPD", "Reading"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|obs| {
        let verdict = classify(obs.elasticity);
        let color = category_color(verdict.category);

        let epd_cell = match obs.elasticity {
            Some(epd) => Cell::from(format!("{:.2}", epd)).style(Style::default().fg(color)),
            None => Cell::from("—").style(Style::default().fg(Color::DarkGray)),
        };

        let reading = if obs.elasticity.is_some() {
            verdict.category.as_str()
        } else {
            "pending"
        };

        let cells = vec![
            Cell::from(obs.recorded_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(format!("{:.2}", obs.price_start)),
            Cell::from(format!("{:.2}", obs.price_end)),
            Cell::from(format!("{:.0}", obs.quantity_start)),
            Cell::from(format!("{:.0}", obs.quantity_end)),
            epd_cell,
            Cell::from(reading).style(Style::default().fg(color)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Price Experiments "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_trends(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let report = app.report();

    render_elasticity_chart(f, top[0], &report);
    render_quantity_chart(f, top[1], &report);
    render_histogram(f, bottom[0], &report);
    render_price_chart(f, bottom[1], &report);
}

/// Axis bounds with a little headroom; never zero-width.
fn bounds(values: &[f64]) -> [f64; 2] {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if values.is_empty() {
        return [0.0, 1.0];
    }
    if (max - min).abs() < f64::EPSILON {
        return [min - 1.0, max + 1.0];
    }
    let pad = (max - min) * 0.1;
    [min - pad, max + pad]
}

fn axis_labels(range: [f64; 2]) -> Vec<Span<'static>> {
    vec![
        Span::raw(format!("{:.1}", range[0])),
        Span::raw(format!("{:.1}", (range[0] + range[1]) / 2.0)),
        Span::raw(format!("{:.1}", range[1])),
    ]
}

fn render_elasticity_chart(f: &mut Frame, area: Rect, report: &TrendReport) {
    let points: Vec<(f64, f64)> = report
        .elasticity_series()
        .iter()
        .enumerate()
        .map(|(i, (_, epd))| (i as f64 + 1.0, *epd))
        .collect();

    if points.is_empty() {
        render_empty_chart(f, area, " Elasticity Trend ", "No computed elasticity yet");
        return;
    }

    let x_bounds = [1.0, (points.len() as f64).max(2.0)];
    let y_values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let y_bounds = bounds(&y_values);

    let datasets = vec![Dataset::default()
        .name("EPD")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Elasticity Trend "),
        )
        .x_axis(
            Axis::default()
                .title("observation")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw("1"),
                    Span::raw(format!("{}", points.len())),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("EPD")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );

    f.render_widget(chart, area);
}

fn render_quantity_chart(f: &mut Frame, area: Rect, report: &TrendReport) {
    let series = report.quantity_series();
    if series.is_empty() {
        render_empty_chart(f, area, " Sales Comparison ", "No observations in this period");
        return;
    }

    let start_points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, start, _))| (i as f64 + 1.0, *start))
        .collect();
    let end_points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, _, end))| (i as f64 + 1.0, *end))
        .collect();

    let all_values: Vec<f64> = series.iter().flat_map(|(_, s, e)| [*s, *e]).collect();
    let y_bounds = bounds(&all_values);
    let x_bounds = [1.0, (series.len() as f64).max(2.0)];

    let datasets = vec![
        Dataset::default()
            .name("before")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&start_points),
        Dataset::default()
            .name("after")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Magenta))
            .data(&end_points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Sales Comparison "),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw("1"),
                    Span::raw(format!("{}", series.len())),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("units")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );

    f.render_widget(chart, area);
}

fn render_histogram(f: &mut Frame, area: Rect, report: &TrendReport) {
    let histogram = report.sensitivity_histogram(0.5);
    if histogram.is_empty() {
        render_empty_chart(f, area, " Sensitivity Profile ", "No computed elasticity yet");
        return;
    }

    let labels: Vec<String> = histogram
        .iter()
        .map(|(bound, _)| format!("{:.1}", bound))
        .collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(histogram.iter())
        .map(|(label, (_, count))| (label.as_str(), *count as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Sensitivity Profile "),
        )
        .data(&data)
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(chart, area);
}

fn render_price_chart(f: &mut Frame, area: Rect, report: &TrendReport) {
    let series = report.price_series();
    if series.is_empty() {
        render_empty_chart(f, area, " Price Evolution ", "No observations in this period");
        return;
    }

    let start_points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, start, _))| (i as f64 + 1.0, *start))
        .collect();
    let end_points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, _, end))| (i as f64 + 1.0, *end))
        .collect();

    let all_values: Vec<f64> = series.iter().flat_map(|(_, s, e)| [*s, *e]).collect();
    let y_bounds = bounds(&all_values);
    let x_bounds = [1.0, (series.len() as f64).max(2.0)];

    let datasets = vec![
        Dataset::default()
            .name("start")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&start_points),
        Dataset::default()
            .name("end")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&end_points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Price Evolution "),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw("1"),
                    Span::raw(format!("{}", series.len())),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("price")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );

    f.render_widget(chart, area);
}

fn render_empty_chart(f: &mut Frame, area: Rect, title: &str, message: &str) {
    let placeholder = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(placeholder, area);
}

fn render_advisor(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Latest observation
            Constraint::Length(6), // Classification
            Constraint::Min(0),    // Overall stats
        ])
        .split(area);

    // Latest observation
    let latest_lines = match app.latest() {
        Some(obs) => vec![
            Line::from(format!(
                "Recorded: {}",
                obs.recorded_at.format("%Y-%m-%d %H:%M")
            )),
            Line::from(format!(
                "Price:    {:.2} → {:.2}",
                obs.price_start, obs.price_end
            )),
            Line::from(format!(
                "Sales:    {:.0} → {:.0}",
                obs.quantity_start, obs.quantity_end
            )),
            Line::from(match obs.elasticity {
                Some(epd) => format!("EPD:      {:.2}", epd),
                None => "EPD:      not computed yet (run `snackonomics analyze`)".to_string(),
            }),
        ],
        None => vec![Line::from("No observations recorded yet.")],
    };

    let latest = Paragraph::new(latest_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Latest Experiment "),
    );
    f.render_widget(latest, chunks[0]);

    // Classification of the latest computed elasticity
    let verdict = classify(app.latest().and_then(|obs| obs.elasticity));
    let color = category_color(verdict.category);

    let advice = Paragraph::new(vec![
        Line::from(Span::styled(
            verdict.category.as_str().to_uppercase(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(verdict.message),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(" Advice "),
    );
    f.render_widget(advice, chunks[1]);

    // Overall stats across the selected period
    let summary = app.report().summary();
    let mean_line = match summary.mean_elasticity {
        Some(mean) => format!("Mean elasticity:      {:.2}", mean),
        None => "Mean elasticity:      n/a".to_string(),
    };

    let stats = Paragraph::new(vec![
        Line::from(format!("Period:               {}", app.period.label())),
        Line::from(format!(
            "Observations:         {}",
            summary.total_observations
        )),
        Line::from(format!(
            "With elasticity:      {}",
            summary.with_elasticity
        )),
        Line::from(mean_line),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Statistics "));
    f.render_widget(stats, chunks[2]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.filtered.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if app.current_page == Page::Trends {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("1-7", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Period"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Quit"));

    let status = Paragraph::new(vec![Line::from(status_spans)])
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Vec<Observation> {
        (0..n)
            .map(|i| {
                let mut obs =
                    Observation::new(5.0, 6.0, 100.0 + i as f64, 80.0 + i as f64);
                obs.elasticity = Some(-1.0 - i as f64 * 0.1);
                obs
            })
            .collect()
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Observations.next(), Page::Trends);
        assert_eq!(Page::Trends.next(), Page::Advisor);
        assert_eq!(Page::Advisor.next(), Page::Observations);
        assert_eq!(Page::Observations.previous(), Page::Advisor);
    }

    #[test]
    fn test_row_navigation_wraps() {
        let mut app = App::new(sample(3), 3);

        assert_eq!(app.state.selected(), Some(0));
        app.next();
        app.next();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
    }

    #[test]
    fn test_set_period_refilters() {
        let mut app = App::new(sample(3), 3);
        // All samples were recorded just now, so every period keeps them
        app.set_period(Period::LastWeek);
        assert_eq!(app.filtered.len(), 3);
        assert_eq!(app.period, Period::LastWeek);
    }

    #[test]
    fn test_empty_app_has_no_selection() {
        let app = App::new(Vec::new(), 0);
        assert_eq!(app.state.selected(), None);
        assert!(app.latest().is_none());
    }

    #[test]
    fn test_bounds_padding() {
        assert_eq!(bounds(&[]), [0.0, 1.0]);
        assert_eq!(bounds(&[2.0, 2.0]), [1.0, 3.0]);
        let [lo, hi] = bounds(&[0.0, 10.0]);
        assert!(lo < 0.0 && hi > 10.0);
    }
}
