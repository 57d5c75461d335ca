//! Ratatui widgets for the arbitrage dashboard

use ratatui::{
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use super::state::Dashboard;
use super::views::Direction;
use crate::shared::spreads::CellClass;
use crate::shared::websocket::ConnectionStatus;
use std::collections::HashMap;

const C_BUY: Color = Color::Rgb(100, 220, 100);
const C_SELL: Color = Color::Rgb(220, 100, 100);
const C_NEUTRAL: Color = Color::Rgb(180, 180, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

// One color per chart slot, cycled
const SERIES_COLORS: [Color; 10] = [
    Color::Rgb(240, 185, 11),
    Color::Rgb(247, 166, 0),
    Color::Rgb(80, 227, 194),
    Color::Rgb(87, 65, 217),
    Color::Rgb(200, 200, 200),
    Color::Rgb(35, 135, 255),
    Color::Rgb(255, 105, 180),
    Color::Rgb(255, 215, 0),
    Color::Rgb(255, 140, 0),
    Color::Rgb(153, 69, 255),
];

/// Per-frame state owned by the terminal loop rather than the dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContext<'a> {
    pub fps: usize,
    /// Symbol being typed, when the symbol editor is open
    pub symbol_input: Option<&'a str>,
}

pub fn render_dashboard(f: &mut Frame, dashboard: &Dashboard, ctx: FrameContext<'_>) {
    let rows = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(50),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(f.area());

    let middle = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    render_header(f, rows[0], dashboard, ctx);
    render_chart(f, middle[0], dashboard);
    render_sources(f, middle[1], dashboard);
    render_opportunities(f, bottom[0], dashboard);
    render_spreads(f, bottom[1], dashboard);
    render_footer(f, rows[3], ctx);
}

fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Connected => C_BUY,
        ConnectionStatus::Connecting => C_NEUTRAL,
        ConnectionStatus::Disconnected | ConnectionStatus::Error => C_SELL,
    }
}

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.abs() >= 1000.0 => format!("{:.2}", p),
        Some(p) => format!("{:.4}", p),
        None => "--".to_string(),
    }
}

fn render_header(f: &mut Frame, area: Rect, dashboard: &Dashboard, ctx: FrameContext<'_>) {
    let status = dashboard.status();
    let block = Block::default()
        .title(" ARB SCANNER ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(status_color(status)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let symbol = match ctx.symbol_input {
        Some(input) => Span::styled(
            format!("Symbol: {}_", input),
            Style::default().fg(C_NEUTRAL).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled(
            dashboard.symbol().to_string(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
    };

    let line = Line::from(vec![
        Span::styled("● ", Style::default().fg(status_color(status))),
        Span::styled(status.label(), Style::default().fg(status_color(status))),
        Span::raw("  "),
        symbol,
        Span::raw("  "),
        Span::styled(dashboard.connected_summary(), Style::default().fg(C_DIM)),
        Span::raw("  "),
        Span::styled(
            format!("min {:.2}%", dashboard.min_profit_pct()),
            Style::default().fg(C_ACCENT),
        ),
        Span::raw("  "),
        Span::styled(format!("{} FPS", ctx.fps), Style::default().fg(C_DIM)),
    ]);
    f.render_widget(Paragraph::new(line), inner);
}

fn render_chart(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let chart = dashboard.chart();
    let datasets: Vec<Dataset> = chart
        .series
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.points.is_empty())
        .map(|(i, s)| {
            Dataset::default()
                .name(s.source.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(&s.points)
        })
        .collect();

    let [x_min, x_max] = chart.x_bounds;
    let [y_min, y_max] = chart.y_bounds;
    let x_labels = vec![
        Span::styled(format_clock(x_min), Style::default().fg(C_DIM)),
        Span::styled(format_clock(x_max), Style::default().fg(C_DIM)),
    ];
    let y_labels = vec![
        Span::styled(format!("{:.2}", y_min), Style::default().fg(C_DIM)),
        Span::styled(format!("{:.2}", (y_min + y_max) / 2.0), Style::default().fg(C_DIM)),
        Span::styled(format!("{:.2}", y_max), Style::default().fg(C_DIM)),
    ];

    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!(" {} ", chart.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_ACCENT)),
        )
        .x_axis(Axis::default().bounds(chart.x_bounds).labels(x_labels))
        .y_axis(Axis::default().bounds(chart.y_bounds).labels(y_labels));

    f.render_widget(widget, area);
}

/// `HH:MM:SS` UTC for an epoch-seconds axis value
fn format_clock(secs: f64) -> String {
    chrono::DateTime::from_timestamp_millis((secs * 1000.0) as i64)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn render_sources(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let block = Block::default()
        .title(" SOURCES ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let lines: Vec<Line> = dashboard
        .source_rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let hotkey = if i < 10 { format!("{}", (i + 1) % 10) } else { " ".to_string() };
            let change_color = match row.direction {
                Direction::Up => C_BUY,
                Direction::Down => C_SELL,
            };
            let arrow = match row.direction {
                Direction::Up => "▲",
                Direction::Down => "▼",
            };

            let mut spans = vec![
                Span::styled(format!("{} ", hotkey), Style::default().fg(C_DIM)),
                Span::styled(
                    format!("{:<20}", row.display_name),
                    Style::default().fg(C_BRIGHT),
                ),
                Span::styled(format!("{:>12}", format_price(row.price)), Style::default().fg(C_BRIGHT)),
            ];
            if row.price.is_some() {
                spans.push(Span::styled(
                    format!(" {}{:+.3}%", arrow, row.percent_change),
                    Style::default().fg(change_color),
                ));
            }

            let line = Line::from(spans);
            if row.enabled {
                line
            } else {
                line.style(Style::default().fg(C_DIM).add_modifier(Modifier::DIM | Modifier::CROSSED_OUT))
            }
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_opportunities(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let (field, direction) = dashboard.sort();
    let header = Row::new(
        ["Time", "Symbol", "Buy", "Buy Price", "Sell", "Sell Price", "Profit %"]
            .iter()
            .map(|h| {
                let label = if *h == field.label() {
                    format!("{} {}", h, direction.arrow())
                } else {
                    h.to_string()
                };
                Cell::from(label).style(Style::default().fg(C_NEUTRAL).add_modifier(Modifier::BOLD))
            }),
    )
    .height(1);

    let rows = dashboard.opportunity_rows().iter().map(|row| {
        let o = &row.opportunity;
        let style = if row.fresh {
            Style::default().fg(C_BUY).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_BRIGHT)
        };
        let time = chrono::DateTime::from_timestamp_millis(o.timestamp)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--".to_string());

        Row::new(vec![
            Cell::from(time),
            Cell::from(o.symbol.clone()),
            Cell::from(o.buy_source.clone()),
            Cell::from(format_price(Some(o.buy_price))),
            Cell::from(o.sell_source.clone()),
            Cell::from(format_price(Some(o.sell_price))),
            Cell::from(format!("{:.3}", o.profit_pct)),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(
                " OPPORTUNITIES ({}) ≥ {:.2}% ",
                dashboard.opportunity_rows().len(),
                dashboard.min_profit_pct()
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_ACCENT)),
    );

    f.render_widget(table, area);
}

fn cell_style(class: CellClass) -> Style {
    match class {
        CellClass::Opportunity => Style::default().fg(C_BUY).add_modifier(Modifier::BOLD),
        CellClass::Positive => Style::default().fg(C_BUY),
        CellClass::Negative => Style::default().fg(C_SELL),
        CellClass::Neutral => Style::default().fg(C_DIM),
    }
}

/// Short column label: exchange prefix plus the initial of each market word,
/// eg/ `binance_futures` -> `BINF`, `bybit_spot` -> `BYBS`
fn abbreviate(source: &str) -> String {
    let mut parts = source.split('_');
    let exchange: String = parts.next().unwrap_or_default().chars().take(3).collect();
    parts
        .filter_map(|part| part.chars().next())
        .fold(exchange, |mut label, c| {
            label.push(c);
            label
        })
        .to_uppercase()
}

/// One label per source, numbered on collision so every row and column is distinct
fn matrix_labels(sources: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    sources
        .iter()
        .map(|source| {
            let label = abbreviate(source);
            let count = seen.entry(label.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                label
            } else {
                format!("{label}{count}")
            }
        })
        .collect()
}

fn render_spreads(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let grid = dashboard.spread_grid();
    let block = Block::default()
        .title(format!(" SPREADS {} ", grid.symbol))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    if grid.is_empty() {
        let placeholder = Line::from(Span::styled("Waiting for spreads...", Style::default().fg(C_DIM)));
        f.render_widget(Paragraph::new(placeholder).block(block), area);
        return;
    }

    let labels = matrix_labels(&grid.sources);
    let header = Row::new(
        std::iter::once(Cell::from("buy\\sell"))
            .chain(labels.iter().map(|l| Cell::from(l.as_str())))
            .map(|c| c.style(Style::default().fg(C_NEUTRAL).add_modifier(Modifier::BOLD))),
    );

    let rows = labels.iter().zip(&grid.cells).map(|(label, cells)| {
        let mut row = vec![Cell::from(label.as_str()).style(Style::default().fg(C_NEUTRAL))];
        row.extend(cells.iter().map(|cell| {
            let text = match cell.value {
                Some(v) => format!("{:+.3}", v),
                None => "·".to_string(),
            };
            Cell::from(text).style(cell_style(cell.class))
        }));
        Row::new(row)
    });

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(9))
        .chain(grid.sources.iter().map(|_| Constraint::Length(7)))
        .collect();

    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect, ctx: FrameContext<'_>) {
    let help = if ctx.symbol_input.is_some() {
        "Enter apply  Esc cancel"
    } else {
        "q quit  / symbol  1-0 toggle source  +/- threshold  o sort  d direction  x clear  r reconnect  c chart"
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(help, Style::default().fg(C_DIM)))),
        area,
    );
}
