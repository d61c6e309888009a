// main.rs

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use taskdeck::app::build_app;
use taskdeck::config::{self, ClientConfig, FileSession};
use taskdeck::tui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TASKDECK_LOG";

/// Logs go to a file: stdout belongs to the terminal UI.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let path = config::data_dir().join("taskdeck.log");
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("taskdeck=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let dir = config::config_dir();
    let cfg = ClientConfig::load(&dir)?;
    let sessions = Arc::new(FileSession::new(&dir));
    let mut app = build_app(&cfg, sessions)?;
    info!(server = %cfg.server_url, "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.init_notifications();
    app.refresh();

    let res = tui::run_app(&mut terminal, &mut app);

    // Restore terminal state
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "event loop failed");
        eprintln!("Application error: {}", err);
    }
    info!("exiting");
    Ok(())
}
