mod cli;
mod terminal;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use voicio_chat::{event_channel, ChatCommand, ChatSession, ProxyClient, SessionOptions, SessionPorts};
use voicio_core::{NoClipboard, VoicioConfig};
use voicio_session::{CaptureBackend, NoSynthesizer, SpeechSynthesizer, UnsupportedCapture};
use voicio_storage::{ConversationRepository, Database, SqliteKeyValueStore};

use cli::CliArgs;
use terminal::{parse_line, render, ConsoleSynthesizer, Input, TerminalCapture, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match VoicioConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (VoicioConfig::default(), Some(e)),
    };
    args.apply(&mut config);

    if args.write_config {
        config.save(&config_file)?;
        println!("Wrote {}", config_file.display());
        return Ok(());
    }

    // Tracing goes to stderr so it does not interleave with the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Voicio v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Storage.
    let db_path = config.database_path();
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let store = Arc::new(ConversationRepository::new(Arc::clone(&db)));
    match store.count() {
        Ok(saved) => tracing::info!(saved, "Conversation store ready"),
        Err(e) => tracing::warn!("Could not count saved conversations: {}", e),
    }
    let storage = Arc::new(SqliteKeyValueStore::new(db));

    // Language-model proxy.
    let model = Arc::new(ProxyClient::new(&config.proxy)?);
    tracing::info!(url = %model.url(), "Proxy client ready");

    // Voice backends.
    let (events_tx, events_rx) = event_channel();
    let mic = TerminalCapture::new(events_tx.clone());
    let (capture, synth): (Box<dyn CaptureBackend>, Box<dyn SpeechSynthesizer>) = if args.no_voice {
        tracing::info!("Voice disabled");
        (Box::new(UnsupportedCapture), Box::new(NoSynthesizer))
    } else {
        tracing::info!(language = %config.session.language, "Typed voice capture enabled");
        (
            Box::new(mic.clone()),
            Box::new(ConsoleSynthesizer::new(events_tx.clone())),
        )
    };

    let ports = SessionPorts {
        capture,
        synth,
        model,
        store,
        storage,
        clipboard: Arc::new(NoClipboard),
    };
    let (session, mut updates) =
        ChatSession::new(SessionOptions::from_config(&config), ports, (events_tx, events_rx));

    let (commands, commands_rx) = mpsc::channel(32);
    let session_task = tokio::spawn(session.run(commands_rx));

    let printer = tokio::spawn(async move {
        let mut message_count = 0;
        while let Some(update) = updates.recv().await {
            if let Some(text) = render(&update, &mut message_count) {
                println!("{}", text);
            }
        }
    });

    println!("Voicio ready. Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Input::Command(command) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Input::Say(text) => {
                if !mic.hear(&text) {
                    println!("! not listening, use /listen first");
                }
            }
            Input::Help => println!("{}", HELP),
            Input::Quit => break,
            Input::Invalid(usage) => println!("! {}", usage),
            Input::Empty => {}
        }
    }

    let _ = commands.send(ChatCommand::Shutdown).await;
    session_task.await?;
    printer.await?;
    tracing::info!("Voicio stopped");
    Ok(())
}
