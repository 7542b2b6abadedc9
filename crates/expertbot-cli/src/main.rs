use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use expertbot_chat::{ChatDispatcher, DispatchOutcome};
use expertbot_client::{ExpertBackend, HttpBackend, QueryRequest};
use expertbot_config::{expand_tilde, Config, ConfigManager, LogLevel, CONFIG_ENV};
use expertbot_core::{Message, Sender};
use expertbot_observability::{LogManager, LogTarget};
use expertbot_session::{FileSlotStorage, SessionController, SessionStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "expertbot")]
#[command(about = "Command-line client for the ExpertBot expert system")]
#[command(version)]
struct Cli {
    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Config file path
    #[arg(long, env = CONFIG_ENV)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question in a new conversation
    Ask {
        /// The question
        query: String,
        /// Answer from this file if the question matches several
        #[arg(long)]
        file: Option<String>,
    },
    /// Start an interactive chat
    Chat,
    /// Manage archived conversations
    Sessions(SessionsArgs),
    /// Check that the backend is reachable
    Ping,
    /// Configuration management
    Config(ConfigArgs),
    /// Show or change the dark mode preference
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeMode>,
    },
}

#[derive(Args, Clone)]
struct SessionsArgs {
    #[command(subcommand)]
    command: SessionsCommands,
}

#[derive(Subcommand, Clone)]
enum SessionsCommands {
    /// List archived conversations, most recent first
    List,
    /// Print one conversation
    Show { id: String },
    /// Delete one conversation
    Delete { id: String },
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Get a config value
    Get {
        /// Dotted key (e.g. backend.base_url, ui.dark_mode)
        key: String,
    },
    /// Set a config value
    Set {
        /// Dotted key (e.g. backend.base_url, ui.dark_mode)
        key: String,
        value: String,
    },
    /// Write the default config
    Init {
        /// Overwrite an existing config
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// Print the current config
    Show,
}

#[derive(ValueEnum, Clone, Copy)]
enum ThemeMode {
    On,
    Off,
    Toggle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref())?;

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    let command = match cli.command {
        Commands::Config(args) => return handle_config(args, &config_path).await,
        command => command,
    };

    let mut config = ConfigManager::load(&config_path).await?.snapshot().await;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.backend.base_url = base_url.trim_end_matches('/').to_string();
        ConfigManager::validate(&config)?;
    }
    let _log = init_logging(&config, cli.debug);

    if cli.debug {
        eprintln!("{}", format!("[DEBUG] Backend: {}", config.backend.base_url).dimmed());
    }

    match command {
        Commands::Ask { query, file } => ask(&config, &query, file.as_deref(), cli.debug).await,
        Commands::Chat => run_interactive_chat(&config, cli.debug).await,
        Commands::Sessions(args) => handle_sessions(args, &config).await,
        Commands::Ping => ping(&config, cli.debug).await,
        Commands::Theme { mode } => handle_theme(mode, &config).await,
        Commands::Config(_) => Ok(()),
    }
}

fn resolve_config_path(arg: Option<&str>) -> anyhow::Result<PathBuf> {
    match arg {
        Some(path) => Ok(expand_tilde(path).unwrap_or_else(|| PathBuf::from(path))),
        None => Ok(ConfigManager::default_config_path()?),
    }
}

/// Warnings only unless `--debug`; `RUST_LOG` still wins.
fn init_logging(config: &Config, debug: bool) -> Option<LogManager> {
    let mut logging = config.logging.clone();
    logging.level = if debug { LogLevel::Debug } else { LogLevel::Warn };
    match LogManager::init(&logging, LogTarget::Stderr) {
        Ok(manager) => Some(manager),
        Err(e) => {
            eprintln!("{}", format!("⚠️  Logging disabled: {}", e).yellow());
            None
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<SessionStore> {
    let path = config
        .storage
        .path
        .as_deref()
        .and_then(expand_tilde)
        .or_else(expertbot_config::default_storage_dir)
        .unwrap_or_else(|| PathBuf::from(".expertbot"));
    let storage = FileSlotStorage::new(&path).await?;
    Ok(SessionStore::new(Arc::new(storage)))
}

async fn open_dispatcher(config: &Config) -> anyhow::Result<ChatDispatcher> {
    let controller = SessionController::open(open_store(config).await?).await;
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    Ok(
        ChatDispatcher::new(controller, backend, Box::new(StdRng::from_entropy()))
            .with_probe(config.backend.probe_test_endpoint),
    )
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::User => println!("{} {}", "You:".cyan().bold(), message.content),
        Sender::Bot => {
            println!("{}", "ExpertBot:".green().bold());
            println!("{}", message.content);
        }
    }
}

/// Print what the dispatcher appended for `outcome`.
fn print_outcome(dispatcher: &ChatDispatcher, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Busy | DispatchOutcome::Ignored => return,
        DispatchOutcome::Failed => {
            if let Some(last) = dispatcher.messages().last() {
                println!("{}", "ExpertBot:".green().bold());
                println!("{}", last.content.red());
            }
            return;
        }
        _ => {}
    }

    if let Some(last) = dispatcher.messages().last() {
        print_message(last);
    }

    if let DispatchOutcome::Disambiguation(_) = outcome {
        for (idx, option) in dispatcher.file_options().iter().enumerate() {
            println!(
                "  {} {} {}",
                format!("[{}]", idx + 1).yellow(),
                option.name,
                format!("({})", option.id).dimmed()
            );
        }
    }
}

async fn ask(config: &Config, query: &str, file: Option<&str>, debug: bool) -> anyhow::Result<()> {
    let mut dispatcher = open_dispatcher(config).await?;
    info!("Asking {}", config.backend.base_url);

    let start = Instant::now();
    let outcome = dispatcher.send(query).await;
    if debug {
        eprintln!("{}", format!("[DEBUG] {:?} in {:?}", outcome, start.elapsed()).dimmed());
    }
    print_outcome(&dispatcher, &outcome);

    match (&outcome, file) {
        (DispatchOutcome::Disambiguation(_), Some(file_id)) => {
            println!();
            let outcome = dispatcher.select_file(file_id).await;
            print_outcome(&dispatcher, &outcome);
        }
        (DispatchOutcome::Disambiguation(_), None) => {
            println!();
            println!(
                "{}",
                "Re-run with --file <id> to answer from one of these files".dimmed()
            );
        }
        (_, Some(_)) => {
            println!("{}", "Only one source matched; --file was not needed".dimmed());
        }
        _ => {}
    }

    Ok(())
}

async fn run_interactive_chat(config: &Config, debug: bool) -> anyhow::Result<()> {
    let mut dispatcher = open_dispatcher(config).await?;

    println!("{}", "🤖 ExpertBot Interactive Chat".cyan().bold());
    println!(
        "{}",
        "Commands: /new /list /open <n> /delete <n> /pick <n> /quit".dimmed()
    );
    println!();
    if let Some(welcome) = dispatcher.messages().first() {
        print_message(welcome);
    }
    println!();

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        let (command, arg) = match input.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (input, ""),
        };

        match command {
            "/quit" | "/exit" | "exit" | "quit" => break,
            "/new" => {
                dispatcher.new_chat().await;
                println!("{}", "✨ Started a new conversation".cyan());
            }
            "/list" => print_session_list(&dispatcher),
            "/open" => match pick(arg, dispatcher.sessions().len()) {
                Some(idx) => {
                    let id = dispatcher.sessions()[idx].id.clone();
                    dispatcher.open_session(&id).await;
                    for message in dispatcher.messages() {
                        print_message(message);
                    }
                }
                None => println!("{}", "❌ Usage: /open <n> (see /list)".red()),
            },
            "/delete" => match pick(arg, dispatcher.sessions().len()) {
                Some(idx) => {
                    let session = &dispatcher.sessions()[idx];
                    let (id, title) = (session.id.clone(), session.title.clone());
                    dispatcher.delete_session(&id).await;
                    println!("{}", format!("🗑️  Deleted \"{}\"", title).yellow());
                }
                None => println!("{}", "❌ Usage: /delete <n> (see /list)".red()),
            },
            "/pick" => match pick(arg, dispatcher.file_options().len()) {
                Some(idx) => {
                    let file_id = dispatcher.file_options()[idx].id.clone();
                    let outcome = dispatcher.select_file(&file_id).await;
                    if debug {
                        eprintln!("{}", format!("[DEBUG] {:?}", outcome).dimmed());
                    }
                    print_outcome(&dispatcher, &outcome);
                }
                None => println!("{}", "❌ No file with that number is on offer".red()),
            },
            _ => {
                let start = Instant::now();
                let outcome = dispatcher.send(input).await;
                if debug {
                    eprintln!(
                        "{}",
                        format!("[DEBUG] {:?} in {:?}", outcome, start.elapsed()).dimmed()
                    );
                }
                print_outcome(&dispatcher, &outcome);
                if let DispatchOutcome::Disambiguation(_) = outcome {
                    println!("{}", "Choose one with /pick <n>".dimmed());
                }
            }
        }
        println!();
    }

    println!("{}", "👋 Goodbye!".cyan());
    Ok(())
}

/// 1-based index typed by the user, checked against `len`.
fn pick(arg: &str, len: usize) -> Option<usize> {
    arg.parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

fn print_session_list(dispatcher: &ChatDispatcher) {
    let sessions = dispatcher.sessions();
    if sessions.is_empty() {
        println!("{}", "No recent chats".dimmed());
        return;
    }

    let now = Utc::now();
    let bound = dispatcher.controller().bound_id();
    for (idx, session) in sessions.iter().enumerate() {
        let marker = if bound == Some(session.id.as_str()) { "*" } else { " " };
        println!(
            "{} {} {} {}",
            marker,
            format!("{:>3}.", idx + 1).yellow(),
            session.title,
            format!("({})", session.activity_label(now)).dimmed()
        );
    }
}

async fn handle_sessions(args: SessionsArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    match args.command {
        SessionsCommands::List => {
            let sessions = store.load().await;
            if sessions.is_empty() {
                println!("{}", "No recent chats".dimmed());
                return Ok(());
            }

            let now = Utc::now();
            println!("{}", "📚 Recent Chats:".cyan().bold());
            for session in &sessions {
                println!(
                    "  {}  {}  {}",
                    session.id.dimmed(),
                    session.title,
                    format!(
                        "({}, {} messages)",
                        session.activity_label(now),
                        session.messages.len()
                    )
                    .dimmed()
                );
            }
        }
        SessionsCommands::Show { id } => {
            let sessions = store.load().await;
            let Some(session) = sessions.iter().find(|s| s.id == id) else {
                println!("{}", format!("❌ Session not found: {}", id).red());
                std::process::exit(1);
            };

            println!("{}", session.title.cyan().bold());
            println!("{}", session.activity_label(Utc::now()).dimmed());
            println!();
            for message in &session.messages {
                let time = message.timestamp.with_timezone(&Local).format("%H:%M");
                println!("{}", format!("[{}]", time).dimmed());
                print_message(message);
                println!();
            }
        }
        SessionsCommands::Delete { id } => {
            let mut controller = SessionController::open(store).await;
            if controller.session(&id).is_none() {
                println!("{}", format!("❌ Session not found: {}", id).red());
                std::process::exit(1);
            }
            controller.delete_session(&id).await;
            println!("{}", format!("✅ Deleted {}", id).green());
        }
    }

    Ok(())
}

async fn ping(config: &Config, debug: bool) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    debug!("Pinging {}", backend.base_url());

    let start = Instant::now();
    if backend.health_check().await {
        println!(
            "{}",
            format!("✅ {} is up ({:?})", backend.base_url(), start.elapsed()).green()
        );
    } else {
        println!(
            "{}",
            format!("❌ {} is not reachable", backend.base_url()).red()
        );
        std::process::exit(1);
    }

    let request = QueryRequest::new("ping");
    if debug {
        eprintln!(
            "{}",
            format!("[DEBUG] Request body: {}", serde_json::to_string(&request)?).dimmed()
        );
    }
    match backend.probe(&request).await {
        Ok(echo) => {
            println!("{}", "📡 /api/test echoed:".cyan());
            println!("{}", serde_json::to_string_pretty(&echo)?);
        }
        Err(e) => println!("{}", format!("⚠️  /api/test failed: {}", e).yellow()),
    }

    Ok(())
}

async fn handle_theme(mode: Option<ThemeMode>, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let current = store.load_dark_mode().await.unwrap_or(config.ui.dark_mode);

    let dark_mode = match mode {
        None => current,
        Some(ThemeMode::On) => true,
        Some(ThemeMode::Off) => false,
        Some(ThemeMode::Toggle) => !current,
    };
    if mode.is_some() {
        store.save_dark_mode(dark_mode).await?;
    }

    println!(
        "{}",
        format!("🎨 Dark mode: {}", if dark_mode { "on" } else { "off" }).cyan()
    );
    Ok(())
}

async fn handle_config(args: ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    println!("{}", format!("❌ Key not found: {}", key).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(config_path).await?;

            if let Err(e) = manager
                .update(|config| config.set_value(&key, &value))
                .await
            {
                eprintln!("{}", format!("❌ Failed to set value: {}", e).red());
                std::process::exit(1);
            }
            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!(
                    "{}",
                    format!("⚠️  Config already exists at {:?}", config_path).yellow()
                );
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            expertbot_config::init_expertbot_dirs().await?;

            let manager = ConfigManager::new(Config::default(), config_path.to_path_buf());
            manager.save().await?;

            println!(
                "{}",
                format!("✅ Config initialized at {:?}", config_path).green()
            );
            println!(
                "{}",
                "You can edit this file to customize your settings".dimmed()
            );
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
