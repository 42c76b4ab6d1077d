use std::time::Duration;

pub const DEFAULT_PORTAL_BASE_URL: &str = "https://dealer.unifi.com.my/portal/esales/api";
pub const DEFAULT_SIGN_SECRET: &str = "32BytesString";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_SPREADSHEET_ID: &str = "1G-wMt-gB36Kh8yLAJS3MCKvdIhhgT73MnBNctdKbAQY";
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:Z";
pub const DEFAULT_CREDENTIALS_FILE: &str = "tdcollector-cdc227d8c4e8.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub cookie: String,
    pub portal_base_url: String,
    pub sign_secret: String,
    pub page_size: usize,
    pub calls_per_second: f64,
    pub detail_retry_tries: u32,
    pub detail_retry_delay: Duration,
    pub http_timeout: Duration,
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub range: String,
    pub credentials_file: String,
    pub access_token: Option<String>,
    pub chunk_rows: usize,
    pub clear_before_write: bool,
}

impl Config {
    /// Portal settings with every tunable at its default.
    pub fn new(cookie: impl Into<String>, portal_base_url: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            portal_base_url: portal_base_url.into(),
            sign_secret: DEFAULT_SIGN_SECRET.to_string(),
            page_size: 50,
            calls_per_second: 1.0,
            detail_retry_tries: 5,
            detail_retry_delay: Duration::from_secs(10),
            http_timeout: Duration::from_secs(30),
            sheets: SheetsConfig::default(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            cookie: std::env::var("COOKIE")
                .map_err(|_| anyhow::anyhow!("COOKIE environment variable required"))
                .and_then(|cookie| {
                    if cookie.trim().is_empty() {
                        anyhow::bail!("COOKIE cannot be empty");
                    }
                    Ok(cookie)
                })?,
            portal_base_url: std::env::var("PORTAL_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("PORTAL_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })
                .transpose()?
                .unwrap_or_else(|| DEFAULT_PORTAL_BASE_URL.to_string()),
            sign_secret: env_or("SIGN_SECRET", DEFAULT_SIGN_SECRET),
            page_size: parse_env("PAGE_SIZE", 50usize)
                .and_then(|n| {
                    if n == 0 {
                        anyhow::bail!("PAGE_SIZE must be at least 1");
                    }
                    Ok(n)
                })?,
            calls_per_second: parse_env("CALLS_PER_SECOND", 1.0f64).and_then(|rate| {
                if !(rate.is_finite() && rate > 0.0) {
                    anyhow::bail!("CALLS_PER_SECOND must be a positive number");
                }
                Ok(rate)
            })?,
            detail_retry_tries: parse_env("DETAIL_RETRY_TRIES", 5u32).and_then(|n| {
                if n == 0 {
                    anyhow::bail!("DETAIL_RETRY_TRIES must be at least 1");
                }
                Ok(n)
            })?,
            detail_retry_delay: Duration::from_secs(parse_env("DETAIL_RETRY_DELAY_SECS", 10u64)?),
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30u64)?),
            sheets: SheetsConfig {
                base_url: env_or("GSHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                spreadsheet_id: env_or("GSHEET_SPREADSHEET_ID", DEFAULT_SPREADSHEET_ID),
                range: env_or("GSHEET_RANGE", DEFAULT_SHEET_RANGE),
                credentials_file: env_or("GSHEET_CREDENTIALS", DEFAULT_CREDENTIALS_FILE),
                access_token: std::env::var("GSHEET_ACCESS_TOKEN")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                chunk_rows: parse_env("GSHEET_CHUNK_ROWS", 500usize).and_then(|n| {
                    if n == 0 {
                        anyhow::bail!("GSHEET_CHUNK_ROWS must be at least 1");
                    }
                    Ok(n)
                })?,
                clear_before_write: parse_env("GSHEET_CLEAR_BEFORE_WRITE", false)?,
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Portal Base URL: {}", config.portal_base_url);
        tracing::debug!(
            "Page size: {}, rate: {}/s, detail retries: {} x {:?}",
            config.page_size,
            config.calls_per_second,
            config.detail_retry_tries,
            config.detail_retry_delay
        );
        tracing::debug!(
            "Spreadsheet {} range {}",
            config.sheets.spreadsheet_id,
            config.sheets.range
        );

        Ok(config)
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            range: DEFAULT_SHEET_RANGE.to_string(),
            credentials_file: DEFAULT_CREDENTIALS_FILE.to_string(),
            access_token: None,
            chunk_rows: 500,
            clear_before_write: false,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}
