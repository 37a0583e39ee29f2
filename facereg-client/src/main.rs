//! facereg - capture client for the facereg API server

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facereg_client::camera::DirectoryCamera;
use facereg_client::capture::{CaptureSession, FRAME_INTERVAL};
use facereg_client::frame::encode_data_uri;
use facereg_client::overlay::{label_for, Overlay};
use facereg_client::{ApiClient, PushClient, Transcript};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Parser)]
#[command(name = "facereg", about = "Face registration and recognition client")]
#[command(version)]
struct Cli {
    /// API server base URL
    #[arg(long, global = true, env = "FACEREG_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Log filter directive
    #[arg(long, global = true, env = "FACEREG_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the face in an image under a name
    Register {
        #[arg(short, long)]
        name: String,
        /// Image file containing exactly one face
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Recognize faces in a single image
    Recognize {
        #[arg(short, long)]
        image: PathBuf,
        /// Write a copy of the image with the overlay drawn on it
        #[arg(long)]
        annotate: Option<PathBuf>,
    },
    /// List registered faces, newest first
    List,
    /// Stream frames from a directory and print recognitions as they arrive
    Watch {
        /// Directory of .jpg/.png frames, replayed in name order
        #[arg(short, long)]
        dir: PathBuf,
        /// Sampling interval in milliseconds
        #[arg(long, default_value_t = FRAME_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
        /// Stop after this many results (runs until Ctrl+C otherwise)
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Ask the chat service a question
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level.as_deref() {
        Some(directive) => tracing_subscriber::EnvFilter::new(directive),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "facereg_client=info,facereg=info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api = ApiClient::new(&cli.server).context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Register { name, image } => {
            let frame = load_frame(&image)?;
            match api.register(&name, &frame).await {
                Ok(response) => println!(
                    "{} ({} at {})",
                    response.message, response.registration.name, response.registration.registered_at
                ),
                Err(e) => bail!(e.display_message()),
            }
        }
        Commands::Recognize { image, annotate } => {
            let frame = load_frame(&image)?;
            let faces = api
                .recognize(&frame)
                .await
                .map_err(|e| anyhow::anyhow!(e.display_message()))?;

            if faces.is_empty() {
                println!("No faces found");
            }
            for face in &faces {
                println!("{}", label_for(face));
            }

            if let Some(out) = annotate {
                let mut picture = image::open(&image)
                    .with_context(|| format!("Failed to read {}", image.display()))?
                    .to_rgb8();
                Overlay::from_faces(&faces).draw(&mut picture);
                picture
                    .save(&out)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                println!("Annotated image written to {}", out.display());
            }
        }
        Commands::List => {
            let records = api
                .registrations()
                .await
                .map_err(|e| anyhow::anyhow!(e.display_message()))?;
            if records.is_empty() {
                println!("No registered faces");
            }
            for record in records {
                println!(
                    "{:>5}  {:<24}  {}  ({} dims)",
                    record.id,
                    record.name,
                    record.registered_at,
                    record.encoding.len()
                );
            }
        }
        Commands::Watch {
            dir,
            interval_ms,
            frames,
        } => watch(&api, dir, Duration::from_millis(interval_ms), frames).await?,
        Commands::Chat { message } => {
            let message = message.join(" ");
            let push = PushClient::connect(&api.push_url())
                .await
                .map_err(|e| anyhow::anyhow!(e.display_message()))?;

            let mut transcript = Transcript::new();
            transcript.push_user(&message);
            match push.ask(&message).await? {
                Ok(answer) => transcript.push_answer(answer),
                Err(error) => transcript.push_error(error),
            }

            if let Some(reply) = transcript.last() {
                println!("{}", reply.text);
                for source in &reply.sources {
                    println!("  - {}", source);
                }
            }
        }
    }

    Ok(())
}

fn load_frame(path: &Path) -> Result<String> {
    let picture =
        image::open(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    encode_data_uri(&picture).context("Failed to encode frame")
}

async fn watch(
    api: &ApiClient,
    dir: PathBuf,
    interval: Duration,
    limit: Option<usize>,
) -> Result<()> {
    let push = PushClient::connect(&api.push_url())
        .await
        .map_err(|e| anyhow::anyhow!(e.display_message()))?;

    let (results_tx, mut results) = mpsc::channel(8);
    let mut session = CaptureSession::new(Arc::new(push), results_tx).with_interval(interval);
    let mut camera = DirectoryCamera::new(dir);

    if let Err(e) = session.start(&mut camera) {
        bail!("{}", e);
    }

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            outcome = results.recv() => {
                let Some(outcome) = outcome else { break };
                match outcome {
                    Ok(faces) => println!("{}", Overlay::from_faces(&faces).caption()),
                    Err(e) => warn!("Recognition failed: {}", e.display_message()),
                }
                seen += 1;
                if limit.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }

    let stats = session.stats();
    session.stop().await;
    println!(
        "{} frames submitted, {} dropped while a frame was pending",
        stats.submitted(),
        stats.dropped()
    );
    Ok(())
}
