use anyhow::Result;
use hrayfi_core::Config;
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // A broken log directory should not keep the assistant from starting
    let log_path = logging::init().ok();

    let config = Config::load();
    if !config.has_api_key() {
        warn!(
            "no API key configured; set {} or add api_key to the config file",
            hrayfi_core::config::API_KEY_ENV
        );
    }
    info!(
        model = config.model(),
        endpoint = config.endpoint(),
        log = ?log_path,
        "starting assistant"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(&config);
    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }

        app.poll_reply().await;
    }

    Ok(())
}
