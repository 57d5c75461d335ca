/// Arbitrage Scanner TUI
///
/// Streams quotes, spreads and arbitrage alerts from the scanner backend and
/// renders a live multi-source price chart, source list, alert table and
/// spread matrix.
use std::{
    error::Error,
    io,
    sync::Mutex,
    time::{Duration, Instant},
};

use arb_scanner_tui::{
    dashboard::{render_dashboard, FpsCounter, FrameContext},
    ConnectionManager, Dashboard, FileStore, MessageBatcher, Now, ScannerConfig, ViewKind,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rustls::crypto::ring::default_provider;
use tokio::sync::mpsc;
use tracing::{info, warn};

const MIN_PROFIT_STEP: f64 = 0.01;

/// Wake-up cadence when nothing is scheduled, keeps freshness and FPS current
const IDLE_TICK: Duration = Duration::from_secs(1);

fn init_logging() -> Result<(), Box<dyn Error>> {
    let path = std::env::var("ARB_SCANNER_LOG").unwrap_or_else(|_| "arb-scanner.log".to_string());
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Read terminal input on a dedicated thread; exits once the receiver is gone
fn spawn_key_reader() -> mpsc::Receiver<KeyEvent> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(250)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.blocking_send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read terminal event");
                    break;
                }
            },
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll terminal events");
                break;
            }
        }
    });
    rx
}

enum KeyOutcome {
    Continue,
    Quit,
    Reconnect,
}

fn handle_key(
    key: KeyEvent,
    dashboard: &mut Dashboard,
    symbol_input: &mut Option<String>,
) -> KeyOutcome {
    let now = Now::current();

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    // Symbol editor owns the keyboard while open
    if let Some(input) = symbol_input.as_mut() {
        match key.code {
            KeyCode::Enter => {
                let symbol = input.clone();
                *symbol_input = None;
                dashboard.change_symbol(&symbol, now);
            }
            KeyCode::Esc => *symbol_input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_alphanumeric() => input.push(c.to_ascii_uppercase()),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('/') => *symbol_input = Some(String::new()),
        KeyCode::Char(c @ '0'..='9') => {
            // 1..9 then 0 for the tenth source
            let index = c.to_digit(10).map(|d| (d as usize + 9) % 10).unwrap_or(0);
            if let Some((source, enabled)) = dashboard.toggle_source_at(index, now) {
                info!(%source, enabled, "Toggled source from keyboard");
            }
        }
        KeyCode::Char('+') | KeyCode::Char('=') => dashboard.adjust_min_profit(MIN_PROFIT_STEP, now),
        KeyCode::Char('-') => dashboard.adjust_min_profit(-MIN_PROFIT_STEP, now),
        KeyCode::Char('o') => dashboard.cycle_sort_field(now),
        KeyCode::Char('d') => dashboard.toggle_sort_direction(now),
        KeyCode::Char('x') => dashboard.clear_opportunities(now),
        KeyCode::Char('c') => dashboard.toggle_chart_metric(now),
        KeyCode::Char('r') => return KeyOutcome::Reconnect,
        _ => {}
    }
    KeyOutcome::Continue
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    // Install rustls crypto provider (required for wss:// feeds)
    let _ = default_provider().install_default();

    let config = ScannerConfig::from_env();
    info!(url = %config.connection.url, symbol = %config.symbol, "Starting arb-scanner");

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let store = FileStore::new(config.prefs_dir.clone());
    let mut dashboard = Dashboard::new(&config, Box::new(store));
    let mut batcher = MessageBatcher::new(config.flush_delay);

    let (mut manager, mut event_rx, mut status_rx) = ConnectionManager::new(config.connection.clone());
    manager.connect();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut key_rx = spawn_key_reader();
    let mut fps = FpsCounter::new();
    let mut symbol_input: Option<String> = None;
    let mut dirty = true;

    loop {
        if dirty {
            let now = Instant::now();
            fps.record(now);
            let ctx = FrameContext {
                fps: fps.fps(now),
                symbol_input: symbol_input.as_deref(),
            };
            terminal.draw(|f| render_dashboard(f, &dashboard, ctx))?;
            dirty = false;
        }

        let wake = [batcher.flush_deadline(), dashboard.next_deadline()]
            .into_iter()
            .flatten()
            .min();
        let idle = wake.is_none();
        let wake = wake.unwrap_or_else(|| Instant::now() + IDLE_TICK);

        tokio::select! {
            Some(inbound) = event_rx.recv() => {
                batcher.enqueue(inbound, Instant::now());
            }
            changed = status_rx.changed() => {
                if changed.is_ok() {
                    let status = *status_rx.borrow_and_update();
                    info!(status = status.label(), "Connection status changed");
                    dashboard.set_connection_status(status);
                    dirty = true;
                }
            }
            Some(key) = key_rx.recv() => {
                match handle_key(key, &mut dashboard, &mut symbol_input) {
                    KeyOutcome::Quit => break,
                    KeyOutcome::Reconnect => {
                        info!("Manual reconnect requested");
                        manager.connect();
                    }
                    KeyOutcome::Continue => {}
                }
                dirty = true;
            }
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(wake)) => {
                if idle {
                    dashboard.request_refresh(ViewKind::OpportunityTable, Now::current());
                    dirty = true;
                }
            }
        }

        let now = Now::current();
        if batcher.is_due(now.instant) {
            dashboard.apply_batch(batcher.flush(), now);
        }
        if !dashboard.run_due(now).is_empty() {
            dirty = true;
        }
    }

    manager.shutdown();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!(events = dashboard.events_processed(), "Shutting down");
    Ok(())
}
