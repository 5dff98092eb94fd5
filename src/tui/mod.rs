use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use kioskflow::scan::ChannelScanner;
use kioskflow::{AppConfig, Kiosk};

mod app;
mod event;
mod theme;
mod ui;

pub use app::App;
pub use event::EventHandler;

const TICK_RATE: Duration = Duration::from_millis(100);
const SCAN_QUEUE: usize = 16;

/// Run the kiosk screen until the operator quits
pub async fn run_tui(config: &AppConfig) -> Result<()> {
    let scanner = Arc::new(ChannelScanner::new(SCAN_QUEUE));
    let scan_feed = scanner.feed();
    let kiosk = Kiosk::from_config(config, scanner)?;
    let mut app = App::new(kiosk, scan_feed);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;
    app.kiosk.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("Kiosk screen exited with error: {:?}", err);
    }
    info!("Kiosk screen closed");
    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut event_handler = EventHandler::new(TICK_RATE);

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        tokio::select! {
            event = event_handler.next() => match event {
                Some(event) => {
                    if !app.handle_event(event) {
                        break;
                    }
                }
                None => break,
            },
            Some(flow_event) = app.kiosk.next_event() => {
                app.kiosk.handle(flow_event);
            }
        }
    }

    Ok(())
}
