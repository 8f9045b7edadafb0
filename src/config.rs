//! Server configuration, read once from the environment at startup.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, ServerError};

const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Holds the SQLite database and the `media/` directory
    pub data_dir: PathBuf,
    pub admin_password: String,
    pub session_ttl: Duration,
    pub max_image_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir = match env::var("RECIPES_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let dir = env::temp_dir().join("recipe-catalog");
                info!("RECIPES_DATA_DIR not set, using default: {}", dir.display());
                dir
            }
        };

        let admin_password = env::var("RECIPES_ADMIN_PASSWORD").unwrap_or_else(|_| {
            warn!("RECIPES_ADMIN_PASSWORD not set, the bootstrap admin password is \"admin\"");
            "admin".to_string()
        });

        let session_hours: u64 = try_load("RECIPES_SESSION_HOURS", "24")?;

        Ok(Self {
            bind_addr: try_load("RECIPES_BIND_ADDR", "127.0.0.1:8080")?,
            data_dir,
            admin_password,
            session_ttl: Duration::from_secs(session_hours * 60 * 60),
            max_image_bytes: try_load(
                "RECIPES_MAX_IMAGE_BYTES",
                &DEFAULT_MAX_IMAGE_BYTES.to_string(),
            )?,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("recipes.db")
    }

    pub fn media_path(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: env::temp_dir().join("recipe-catalog"),
            admin_password: "admin".to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid {key} value {raw:?}: {e}")))
}
