//! Configuration module for the gallery.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Passphrase unlocking owner mode when none is configured.
pub const DEFAULT_OWNER_PASSPHRASE: &str = "admin";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite file holding the `clients` / `isOwner` entries
    pub meta_db_path: PathBuf,
    /// Path to the SQLite file holding video payloads
    pub video_db_path: PathBuf,
    /// Shared secret that switches the session to owner mode
    pub owner_passphrase: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
    /// Origins other than the server's own that may call the API
    pub allowed_origins: Vec<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let meta_db_path = env::var("GALLERY_META_DB_PATH")
            .unwrap_or_else(|_| "./data/gallery.sqlite".to_string())
            .into();

        let video_db_path = env::var("GALLERY_VIDEO_DB_PATH")
            .unwrap_or_else(|_| "./data/videos.sqlite".to_string())
            .into();

        let owner_passphrase = env::var("GALLERY_OWNER_PASSPHRASE")
            .unwrap_or_else(|_| DEFAULT_OWNER_PASSPHRASE.to_string());

        let bind_addr = env::var("GALLERY_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let max_upload_bytes = env::var("GALLERY_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let allowed_origins = env::var("GALLERY_ALLOWED_ORIGIN")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let log_level = env::var("GALLERY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            meta_db_path,
            video_db_path,
            owner_passphrase,
            bind_addr,
            max_upload_bytes,
            allowed_origins,
            log_level,
        }
    }
}

/// Comma-separated origins, blanks dropped.
fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("GALLERY_META_DB_PATH");
        env::remove_var("GALLERY_VIDEO_DB_PATH");
        env::remove_var("GALLERY_OWNER_PASSPHRASE");
        env::remove_var("GALLERY_BIND_ADDR");
        env::remove_var("GALLERY_MAX_UPLOAD_BYTES");
        env::remove_var("GALLERY_ALLOWED_ORIGIN");
        env::remove_var("GALLERY_LOG_LEVEL");

        let config = Config::from_env();

        assert_eq!(config.meta_db_path, PathBuf::from("./data/gallery.sqlite"));
        assert_eq!(config.video_db_path, PathBuf::from("./data/videos.sqlite"));
        assert_eq!(config.owner_passphrase, "admin");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_upload_bytes, 512 * 1024 * 1024);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://a.example/ ,, http://localhost:3000"),
            vec!["https://a.example", "http://localhost:3000"]
        );
        assert!(parse_origins("  ").is_empty());
    }
}
