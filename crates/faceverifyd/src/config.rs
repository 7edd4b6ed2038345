use std::net::SocketAddr;
use std::path::PathBuf;

use crate::db::DbConfig;

const DEFAULT_BIND: ([u8; 4], u16) = ([0, 0, 0, 0], 9000);

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// MySQL connection settings (`DB_*`).
    pub database: DbConfig,
    /// Listen address (default: 0.0.0.0:9000).
    pub bind_addr: SocketAddr,
    /// Directory holding the stored reference photos.
    pub image_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance between encodings still accepted as a match.
    pub match_tolerance: f32,
}

impl Config {
    /// Load configuration from the process environment with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database = DbConfig {
            host: var("DB_HOST", "127.0.0.1"),
            port: parse_or(lookup("DB_PORT"), 3306),
            name: var("DB_NAME", "erp"),
            user: var("DB_USER", "root"),
            password: var("DB_PASSWORD", ""),
        };

        let model_dir = lookup("FACEVERIFY_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(faceverify_core::default_model_dir);

        let match_tolerance = parse_or(
            lookup("FACEVERIFY_MATCH_TOLERANCE"),
            faceverify_core::DEFAULT_TOLERANCE,
        );

        Self {
            database,
            bind_addr: parse_or(lookup("FACEVERIFY_BIND"), SocketAddr::from(DEFAULT_BIND)),
            image_dir: PathBuf::from(var("FACEVERIFY_IMAGE_DIR", "public/user_images")),
            model_dir,
            match_tolerance: if match_tolerance.is_finite() && match_tolerance >= 0.0 {
                match_tolerance
            } else {
                tracing::warn!(match_tolerance, "ignoring invalid match tolerance");
                faceverify_core::DEFAULT_TOLERANCE
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
