use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// When set, announcements live in Postgres; otherwise in the local cache file.
    pub database_url: Option<String>,
    pub cache_dir: PathBuf,
    pub cache_key: String,
    pub app_base_url: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let cache_key = env::var("CACHE_KEY").unwrap_or_else(|_| "announcements".into());
        if !is_valid_cache_key(&cache_key) {
            anyhow::bail!("Invalid CACHE_KEY: {cache_key}");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            cache_dir: env::var("CACHE_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            cache_key,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".into()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
        })
    }

    /// Path of the single serialized announcement list.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.cache_key))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// The key becomes a file name, so only a conservative character set is allowed.
fn is_valid_cache_key(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
