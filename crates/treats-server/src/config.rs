use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `TREATS_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    /// Snapshot file. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    pub public_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("TREATS_HOST", "0.0.0.0");
        let port: u16 = var("TREATS_PORT", "3200")
            .parse()
            .context("TREATS_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let jwt_secret = var("TREATS_JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("TREATS_JWT_SECRET is not set; using the development secret");
        }

        let data_path = var("TREATS_DATA_PATH", "treats-data.json");
        let data_path = (!data_path.is_empty()).then(|| PathBuf::from(data_path));

        let public_url = var("TREATS_PUBLIC_URL", &format!("http://localhost:{}", port));

        Ok(Self {
            addr,
            jwt_secret,
            data_path,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Profile image handed to every new user.
    pub fn default_profile_img_url(&self) -> String {
        format!("{}/imgurl/default.jpg", self.public_url)
    }
}
