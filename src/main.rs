use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use om_core::{Persona, SessionConfig, SessionConfigInput, Transcript, Turn};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use om_coach::api::{self, SecurityConfig};
use om_coach::config::AppConfig;
use om_coach::services::{CertificateRequest, Services};
use om_coach::session::SessionRegistry;

#[derive(Parser)]
#[command(name = "om")]
#[command(about = "Guided meditation sessions with phase timing, narration and certificates")]
struct Cli {
    /// Config file (defaults to om.toml in the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(short, long)]
        address: Option<String>,

        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the built-in guides
    Personas,
    /// Render a certificate offline from a saved session
    Certificate {
        /// JSON file with persona, intent, mantra, minutes and transcript
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the PDF
        #[arg(short, long, default_value = "om-certificate.pdf")]
        output: PathBuf,
    },
}

/// A finished session as saved by a client.
#[derive(Debug, Deserialize)]
struct SavedSession {
    #[serde(flatten)]
    config: SessionConfigInput,
    #[serde(default)]
    transcript: Vec<Turn>,
}

/// Initialize tracing with output to stderr (for one-shot commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "om_coach=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Keep stdout clean for command output
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Serve { address, port }) => {
            if let Some(address) = address {
                config.server.address = address;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }
        None => serve(config).await?,
        Some(Commands::Personas) => {
            for persona in Persona::catalog() {
                let voice = persona.voice.as_deref().unwrap_or("silent");
                println!("{:<12} {:<8} {}", persona.key, voice, persona.name);
            }
        }
        Some(Commands::Certificate { input, output }) => {
            render_certificate(&config, &input, &output).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let address = config.bind_address();
    tracing::info!("Starting Om server on {}", address);

    let services = Services::from_config(&config);
    let registry = SessionRegistry::new(services, config.session.clone());
    let app = api::create_router(registry, SecurityConfig::from_server(&config.server));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Om server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn render_certificate(
    config: &AppConfig,
    input: &std::path::Path,
    output: &std::path::Path,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let saved: SavedSession = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid session file {}", input.display()))?;
    let session_config = SessionConfig::try_from(saved.config)?;
    let transcript = Transcript::from(saved.transcript);

    let request = CertificateRequest::new(
        &session_config,
        &transcript,
        config.session.certificate_window,
        chrono::Local::now().date_naive(),
    );
    let services = Services::from_config(config);
    let rendered = services.certificates.render(&request).await?;
    for warning in &rendered.warnings {
        eprintln!("warning: {warning}");
    }

    std::fs::write(output, &rendered.pdf)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Wrote {} ({} bytes, via {})",
        output.display(),
        rendered.pdf.len(),
        rendered.provider
    );
    Ok(())
}
