use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tasklane_core::text::prepare_for_speech;
use tasklane_core::types::ExternalIdentity;
use tasklane_engine::identity::IdentityBridge;
use tasklane_engine::traits::{CaptureEvent, CaptureProvider};
use tasklane_engine::voice::{VoiceCallbacks, VoiceCaptureEngine};
use tasklane_runtime::capture::ReplayCaptureProvider;
use tasklane_runtime::config_store::ConfigStore;
use tasklane_runtime::runtime_bridge::build_bridge_from_config;

#[derive(Parser)]
#[command(name = "tasklane")]
#[command(about = "Task manager client: account session and speech helpers", long_about = None)]
struct Cli {
    /// Path to the client config (JSON).
    #[arg(long, env = "TASKLANE_CONFIG", default_value = "tasklane.json")]
    config: PathBuf,

    /// Overrides `api_base_url` from the config.
    #[arg(long, env = "TASKLANE_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a backend account and sign in
    SignUp {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKLANE_PASSWORD")]
        password: String,
    },
    /// Sign in with email (or username) and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKLANE_PASSWORD")]
        password: String,
    },
    /// Forget the stored session
    SignOut,
    /// Print the current session, if any
    Whoami,
    /// Make sure a backend account exists for an external identity
    Sync {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Clean text for text-to-speech (reads stdin when TEXT is omitted)
    Speak { text: Option<String> },
    /// Run an utterance through the voice capture engine without a microphone
    Dictate { utterance: String },
}

fn open_bridge(cli: &Cli) -> anyhow::Result<IdentityBridge> {
    let store = ConfigStore::at_path(&cli.config);
    let mut cfg = store.load_or_default()?;
    if let Some(url) = &cli.api_url {
        cfg.api_base_url = url.clone();
    }
    let session_path = store.session_path(&cfg);
    log::debug!(
        "backend {} session file {}",
        cfg.api_base_url,
        session_path.display()
    );
    build_bridge_from_config(&cfg, session_path)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn dictate(cli: &Cli, utterance: &str) -> anyhow::Result<()> {
    let cfg = ConfigStore::at_path(&cli.config).load_or_default()?;
    let (provider, mut events) = ReplayCaptureProvider::new(utterance);
    let provider: Arc<dyn CaptureProvider> = Arc::new(provider);

    let callbacks = VoiceCallbacks::new()
        .on_result(|text, is_final| {
            let tag = if is_final { "final" } else { "interim" };
            println!("[{tag}] {text}");
        })
        .on_error(|message| eprintln!("error: {message}"));
    let mut engine = VoiceCaptureEngine::new(Some(provider), &cfg.capture, callbacks);

    engine.start();
    while let Some(event) = events.recv().await {
        let done = matches!(event, CaptureEvent::Ended | CaptureEvent::Error(_));
        engine.ingest(event);
        if done {
            break;
        }
    }

    println!("{}", prepare_for_speech(engine.transcript().finalized()));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::SignUp {
            name,
            email,
            password,
        } => {
            let bridge = open_bridge(&cli)?;
            match bridge.sign_up(name, email, password).await {
                Ok(session) => print_json(&session)?,
                Err(e) => {
                    print_json(&e)?;
                    std::process::exit(1);
                }
            }
        }
        Commands::SignIn { email, password } => {
            let bridge = open_bridge(&cli)?;
            match bridge.sign_in(email, password).await {
                Ok(session) => print_json(&session)?,
                Err(e) => {
                    print_json(&e)?;
                    std::process::exit(1);
                }
            }
        }
        Commands::SignOut => open_bridge(&cli)?.sign_out(),
        Commands::Whoami => match open_bridge(&cli)?.current_session() {
            Some(session) => print_json(&session.user)?,
            None => println!("not signed in"),
        },
        Commands::Sync { id, email, name } => {
            let identity = ExternalIdentity {
                id: id.clone(),
                email: email.clone(),
                name: name.clone(),
            };
            let user = open_bridge(&cli)?
                .sync_registration(&identity)
                .await
                .context("sync external identity")?;
            print_json(&user)?;
        }
        Commands::Speak { text } => {
            let text = match text {
                Some(t) => t.clone(),
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("read stdin")?;
                    buf
                }
            };
            println!("{}", prepare_for_speech(&text));
        }
        Commands::Dictate { utterance } => dictate(&cli, utterance).await?,
    }

    Ok(())
}
