use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

/// 3 MiB, the largest request body accepted by any route.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 3 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Lowercase extensions accepted for cover images, without the dot.
    pub cover_extensions: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "3000".to_string()).parse().context("PORT")?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://reviewbox.db?mode=rwc".to_string());

        let upload_dir = var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static").join("img"));

        let max_upload_bytes: usize = var("MAX_UPLOAD_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let cover_extensions = var("COVER_EXTENSIONS")
            .map(|s| parse_extensions(&s))
            .unwrap_or_else(default_cover_extensions);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            upload_dir,
            max_upload_bytes,
            cover_extensions,
        })
    }
}

pub fn default_cover_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string()]
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
