use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use faceverify_core::{compare_faces, face_distance, FaceEncoder, DEFAULT_TOLERANCE};
use serde_json::json;

#[derive(Parser)]
#[command(name = "faceverify", about = "faceverify face verification CLI", version)]
struct Cli {
    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true, env = "FACEVERIFY_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and encode the faces in a photo
    Encode {
        image: PathBuf,
    },
    /// Compare the first face of two photos locally
    Compare {
        known: PathBuf,
        candidate: PathBuf,
        /// Maximum Euclidean distance accepted as a match
        #[arg(short, long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f32,
    },
    /// Verify a photo against a user's stored photo on a running faceverifyd
    Verify {
        #[arg(short, long)]
        user_id: u64,
        #[arg(short, long)]
        image: PathBuf,
        #[arg(long, default_value = "http://127.0.0.1:9000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let model_dir = cli.model_dir.unwrap_or_else(faceverify_core::default_model_dir);

    match cli.command {
        Commands::Encode { image } => {
            let mut encoder = load_encoder(&model_dir)?;
            let encodings = encoder.encode(&read(&image)?)?;
            let first = encodings.first().map(|e| json!({ "dim": e.dim(), "norm": e.norm() }));
            println!("{:#}", json!({ "faces": encodings.len(), "first": first }));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compare { known, candidate, tolerance } => {
            let mut encoder = load_encoder(&model_dir)?;
            let Some(known_enc) = encoder.encode(&read(&known)?)?.into_iter().next() else {
                eprintln!("no face detected in {}", known.display());
                return Ok(ExitCode::FAILURE);
            };
            let Some(candidate_enc) = encoder.encode(&read(&candidate)?)?.into_iter().next() else {
                eprintln!("no face detected in {}", candidate.display());
                return Ok(ExitCode::FAILURE);
            };
            let matched = compare_faces(&known_enc, &candidate_enc, tolerance);
            println!(
                "{:#}",
                json!({
                    "distance": face_distance(&known_enc, &candidate_enc),
                    "tolerance": tolerance,
                    "matched": matched,
                })
            );
            Ok(if matched { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Verify { user_id, image, server } => {
            let body = json!({
                "user_id": user_id,
                "image": base64::engine::general_purpose::STANDARD.encode(read(&image)?),
            });
            let url = compare_url(&server);
            tracing::debug!(%url, user_id, "posting verification request");

            let response = reqwest::Client::new()
                .post(&url)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("POST {url}"))?;
            let status = response.status();
            let reply: serde_json::Value = response
                .json()
                .await
                .with_context(|| format!("reading response from {url} ({status})"))?;

            println!("{reply:#}");
            let verified = status.is_success() && reply["success"] == true;
            Ok(if verified { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn load_encoder(model_dir: &Path) -> Result<FaceEncoder> {
    FaceEncoder::load(model_dir)
        .with_context(|| format!("loading face models from {}", model_dir.display()))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn compare_url(server: &str) -> String {
    format!("{}/compare-image", server.trim_end_matches('/'))
}
