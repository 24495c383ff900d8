use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod controller;
mod media;
mod model;
mod shell;
#[cfg(test)]
mod test_support;
mod view;

use config::{load_settings, CameraKind};
use shell::{Application, Collaborators};

/// Webcam filter demo driven from the terminal.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the companion server.
    #[arg(long)]
    server_url: Option<String>,
    /// Real-time channel namespace.
    #[arg(long)]
    namespace: Option<String>,
    #[arg(long, value_enum)]
    camera: Option<CameraKind>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(namespace) = args.namespace {
        settings.namespace = namespace;
    }
    if let Some(camera) = args.camera {
        settings.camera = camera;
    }
    info!(server_url = %settings.server_url, namespace = %settings.namespace, camera = %settings.camera, "loaded");

    let app = Application::new(Collaborators::from_settings(&settings));
    app.bootstrap().await.context("bootstrap failed")?;
    println!("{}", app.document().outline().trim_end());
    println!("type 'help' for commands");

    app.run(BufReader::new(stdin()), stdout()).await
}
