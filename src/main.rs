use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use codechat::{Config, Controller, GeminiClient, OpenEditors, Router, Workspace};
use codechat::session::ChatRole;
use codechat::transport;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "codechat")]
#[command(version, about = "Chat with Gemini about your workspace, with @file mentions and code edits")]
struct Cli {
    /// Workspace folder (repeatable; file operations use the first). Defaults to the current directory
    #[arg(short, long = "workspace", global = true)]
    workspaces: Vec<PathBuf>,

    /// File treated as an open editor, offered for a summary on startup (repeatable)
    #[arg(short, long = "open", global = true)]
    open: Vec<PathBuf>,

    /// Gemini model to use for this run
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat panel (default)
    Chat,
    /// Send one message and print the replies
    Ask {
        /// Your message; may mention files with @path
        message: String,
    },
    /// List the files the assistant can see in the workspace
    Files,
    /// Save the default model to the config file
    SetModel {
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = codechat::logging::init()?;
    info!("logging to {}", log_path.display());

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }

    match cli.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => run_chat(&cli, &config).await,
        Commands::Ask { message } => run_ask(&cli, &config, message).await,
        Commands::Files => list_files(&cli, &config).await,
        Commands::SetModel { model } => {
            Config::save_model(model)?;
            println!("Default model set to {}", model);
            Ok(())
        }
    }
}

fn workspace_roots(cli: &Cli) -> Result<Vec<PathBuf>> {
    if !cli.workspaces.is_empty() {
        return Ok(cli.workspaces.clone());
    }
    Ok(vec![std::env::current_dir()?])
}

fn build_router(cli: &Cli, config: &Config) -> Result<Router> {
    let workspace = Workspace::new(workspace_roots(cli)?);
    let editors = OpenEditors::new(cli.open.clone());
    let gemini = config
        .api_key
        .as_deref()
        .map(|key| GeminiClient::new(key, &config.model, &config.api_url, config.request_timeout()))
        .transpose()?;
    if gemini.is_none() {
        info!("no Gemini API key configured");
    }
    Ok(Router::new(workspace, Box::new(editors), gemini))
}

async fn run_chat(cli: &Cli, config: &Config) -> Result<()> {
    let router = Arc::new(build_router(cli, config)?);
    let (panel, host) = transport::channel();
    tokio::spawn(codechat::router::serve(router, host));

    let (poster, inbox) = panel.split();
    let controller = Controller::new(config.follow_ups, config.request_timeout());
    let workspace_label = workspace_roots(cli)?
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut app = App::new(controller, poster, config.model.clone(), workspace_label);
    app.start();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(inbox);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn run_ask(cli: &Cli, config: &Config, message: &str) -> Result<()> {
    let router = Arc::new(build_router(cli, config)?);
    let (panel, host) = transport::channel();
    tokio::spawn(codechat::router::serve(router, host));

    let (poster, mut inbox) = panel.split();
    let mut controller = Controller::new(false, config.request_timeout());

    for command in controller.send(message, None) {
        poster.post(&command);
    }

    // Skip the user message and the placeholder it was answered into
    let mut printed = 1;
    let poll = Duration::from_millis(500);
    while controller.has_outstanding() {
        match tokio::time::timeout(poll, inbox.recv()).await {
            Ok(Some(result)) => {
                for command in controller.reconcile(result) {
                    poster.post(&command);
                }
            }
            Ok(None) => break,
            Err(_) => {
                controller.expire_stale(Instant::now());
            }
        }
        printed = print_new_replies(&controller, printed);
    }
    print_new_replies(&controller, printed);

    Ok(())
}

fn print_new_replies(controller: &Controller, from: usize) -> usize {
    let transcript = controller.transcript();
    let mut next = from;
    for message in &transcript[from.min(transcript.len())..] {
        if message.is_placeholder() {
            break;
        }
        if message.role == ChatRole::Assistant {
            println!("{}\n", message.content);
        }
        next += 1;
    }
    next
}

async fn list_files(cli: &Cli, config: &Config) -> Result<()> {
    let router = build_router(cli, config)?;
    let result = router
        .dispatch(codechat::Command::GetWorkspaceFiles { request_id: None })
        .await;

    if let codechat::HostMessage::WorkspaceFiles { files, error, .. } = result {
        if let Some(error) = error {
            eprintln!("{}", error);
        }
        for file in files {
            println!("{}", file);
        }
    }
    Ok(())
}
