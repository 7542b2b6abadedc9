use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expertbot_chat::ChatDispatcher;
use expertbot_client::HttpBackend;
use expertbot_config::{expand_tilde, ConfigManager, CONFIG_ENV};
use expertbot_observability::{LogManager, LogTarget};
use expertbot_session::{FileSlotStorage, SessionController, SessionStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod app;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "expertbot-tui")]
#[command(about = "Terminal chat client for the ExpertBot expert system")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => ConfigManager::default_config_path()?,
    };
    let manager = ConfigManager::load(&config_path).await?;
    let mut config = manager.snapshot().await;
    if let Some(base_url) = args.base_url {
        config.backend.base_url = base_url.trim_end_matches('/').to_string();
        ConfigManager::validate(&config)?;
    }

    // The terminal belongs to the UI, so logs go to a file.
    let log_path = config
        .logging
        .file
        .as_deref()
        .and_then(expand_tilde)
        .or_else(expertbot_config::default_log_path);
    let _log = match log_path {
        Some(path) => LogManager::init(&config.logging, LogTarget::File(path))
            .map_err(|e| eprintln!("Logging disabled: {}", e))
            .ok(),
        None => None,
    };

    let storage_path = config
        .storage
        .path
        .as_deref()
        .and_then(expand_tilde)
        .or_else(expertbot_config::default_storage_dir)
        .unwrap_or_else(|| PathBuf::from(".expertbot"));
    let store = SessionStore::new(Arc::new(FileSlotStorage::new(&storage_path).await?));
    let dark_mode = store.load_dark_mode().await.unwrap_or(config.ui.dark_mode);

    let controller = SessionController::open(store).await;
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let dispatcher = ChatDispatcher::new(controller, backend, Box::new(StdRng::from_entropy()))
        .with_probe(config.backend.probe_test_endpoint);
    let mut app = App::new(dispatcher, dark_mode);

    info!("Starting TUI against {}", config.backend.base_url);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.check_connection().await;

    let tick_rate = tokio::time::Duration::from_millis(config.ui.tick_rate_ms);
    let res = run_app(&mut terminal, &mut app, tick_rate).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("TUI exited with error: {:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick_rate: tokio::time::Duration,
) -> io::Result<()> {
    let mut last_tick = tokio::time::Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| tokio::time::Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press && handle_key_event(app, key).await {
                    return Ok(());
                }
            }
        }

        // Apply answers from requests running in the background
        app.process_completions().await;

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = tokio::time::Instant::now();
        }
    }
}

/// Returns `true` when the user asked to quit.
async fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return true,
        KeyCode::Char('n') if ctrl => app.new_chat().await,
        KeyCode::Char('t') if ctrl => app.toggle_dark_mode().await,
        KeyCode::Enter => app.submit().await,
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Up => app.move_up(),
        KeyCode::Down => app.move_down(),
        KeyCode::PageUp => app.scroll_page_up(),
        KeyCode::PageDown => app.scroll_page_down(),
        KeyCode::Delete => app.delete_selected_session().await,
        KeyCode::Char('d') if app.focus == app::Focus::Sidebar => {
            app.delete_selected_session().await
        }
        KeyCode::Char(c) if app.focus == app::Focus::Input => app.push_input(c),
        KeyCode::Backspace if app.focus == app::Focus::Input => app.pop_input(),
        _ => {}
    }
    false
}
