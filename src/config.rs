use serde::Deserialize;

/// Category key used for FASTag billers when `BBPS_CATEGORY_KEY` is unset.
pub const DEFAULT_CATEGORY_KEY: &str = "C10";
/// Page size used when a listing request omits `recordsPerPage`.
pub const DEFAULT_PAGE_SIZE: u32 = 9;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bbps_base_url: String,
    pub bbps_api_key: Option<String>,
    pub category_key: String,
    pub page_size: u32,
    pub upstream_timeout_secs: Option<u64>,
    pub wizard_session_ttl_secs: u64,
    pub wizard_max_sessions: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            bbps_base_url: std::env::var("BBPS_API_BASE_URL")
                .map_err(|_| anyhow::anyhow!("BBPS_API_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("BBPS_API_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("BBPS_API_BASE_URL must start with http:// or https://");
                    }
                    url::Url::parse(&url)
                        .map_err(|e| anyhow::anyhow!("BBPS_API_BASE_URL is not a valid URL: {}", e))?;
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            bbps_api_key: std::env::var("BBPS_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            category_key: std::env::var("BBPS_CATEGORY_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY_KEY.to_string()),
            page_size: std::env::var("BBPS_PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BBPS_PAGE_SIZE must be a positive number"))
                .and_then(|size: u32| {
                    if size == 0 || size > 100 {
                        anyhow::bail!("BBPS_PAGE_SIZE must be between 1 and 100");
                    }
                    Ok(size)
                })?,
            upstream_timeout_secs: match std::env::var("BBPS_TIMEOUT_SECS") {
                Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("BBPS_TIMEOUT_SECS must be a number of seconds")
                })?),
                _ => None,
            },
            wizard_session_ttl_secs: std::env::var("WIZARD_SESSION_TTL_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WIZARD_SESSION_TTL_SECS must be a number"))?,
            wizard_max_sessions: std::env::var("WIZARD_MAX_SESSIONS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WIZARD_MAX_SESSIONS must be a number"))?,
        };

        // Log successful configuration load (without the API key)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("BBPS Base URL: {}", config.bbps_base_url);
        tracing::debug!("Category key: {}", config.category_key);
        if config.bbps_api_key.is_none() {
            tracing::warn!("BBPS_API_KEY not set, upstream calls will be unauthenticated");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds a configuration pointing at `base_url` with every other value defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            port: 3000,
            bbps_base_url: base_url.into(),
            bbps_api_key: None,
            category_key: DEFAULT_CATEGORY_KEY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            upstream_timeout_secs: None,
            wizard_session_ttl_secs: 1800,
            wizard_max_sessions: 10_000,
        }
    }
}
