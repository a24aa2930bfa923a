use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Cron expressions for the three periodic collection triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub collect_all: String,
    pub update_all: String,
    pub process_unprocessed: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub channels_path: PathBuf,
    pub youtube_api_key: Option<String>,
    pub youtube_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub youtube_timeout_secs: u64,
    pub youtube_max_retries: u32,
    pub youtube_backoff_base_ms: u64,
    pub collect_video_limit: u32,
    pub update_video_limit: u32,
    pub home_country: String,
    pub detection_queue_capacity: usize,
    pub schedule: ScheduleConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("channels_path", &self.channels_path)
            .field("database_url", &"[redacted]")
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("youtube_base_url", &self.youtube_base_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("youtube_timeout_secs", &self.youtube_timeout_secs)
            .field("youtube_max_retries", &self.youtube_max_retries)
            .field("youtube_backoff_base_ms", &self.youtube_backoff_base_ms)
            .field("collect_video_limit", &self.collect_video_limit)
            .field("update_video_limit", &self.update_video_limit)
            .field("home_country", &self.home_country)
            .field("detection_queue_capacity", &self.detection_queue_capacity)
            .field("schedule", &self.schedule)
            .finish()
    }
}
