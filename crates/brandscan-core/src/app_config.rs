use std::net::SocketAddr;

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

/// How the pipeline waits for the external analysis job.
///
/// `Inline` keeps the job's task alive and polls until the run settles;
/// `Deferred` returns once the job handle is persisted and leaves progress to
/// the re-check sweep or externally triggered status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Inline,
    Deferred,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Inline => write!(f, "inline"),
            AnalysisMode::Deferred => write!(f, "deferred"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub fetch_max_attempts: u32,
    pub fetch_backoff_base_ms: u64,
    pub search_delay_ms: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub assistant_id: String,
    pub analysis_mode: AnalysisMode,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub recheck_cron: String,
    pub stale_processing_minutes: i64,
    /// Age after which a job still waiting on the analysis service is failed.
    pub stale_analyzing_minutes: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("search_delay_ms", &self.search_delay_ms)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("assistant_id", &self.assistant_id)
            .field("analysis_mode", &self.analysis_mode)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("recheck_cron", &self.recheck_cron)
            .field("stale_processing_minutes", &self.stale_processing_minutes)
            .field("stale_analyzing_minutes", &self.stale_analyzing_minutes)
            .finish()
    }
}
