use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// The request never produced a response (connect, timeout, body read).
    Transport(String),
    /// The server answered with a non-success status.
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },
    /// The portal envelope had no `data` key. Carries the raw response.
    MissingData(String),
    /// A response could not be decoded into the expected shape.
    Decode(String),
    /// Malformed A1 range specification.
    InvalidRange(String),
    /// Caller-supplied input was rejected.
    InvalidInput(String),
    /// Google Sheets request failed.
    Sheet(String),
    /// Local workbook could not be read or written.
    Workbook(String),
    /// Credential loading or token exchange failed.
    Auth(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// True for the error class the detail fetch retries on.
    pub fn is_http_status(&self) -> bool {
        match self {
            AppError::HttpStatus { .. } => true,
            AppError::WithContext { source, .. } => source.is_http_status(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Transport(msg) => write!(f, "Request failed: {}", msg),
            AppError::HttpStatus { status, body } => {
                write!(f, "Portal returned {}: {}", status, body)
            }
            AppError::MissingData(raw) => write!(f, "Response missing 'data': {}", raw),
            AppError::Decode(msg) => write!(f, "Decode error: {}", msg),
            AppError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Sheet(msg) => write!(f, "Sheets API error: {}", msg),
            AppError::Workbook(msg) => write!(f, "Workbook error: {}", msg),
            AppError::Auth(msg) => write!(f, "Auth error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Workbook(err.to_string())
    }
}

impl From<calamine::XlsxError> for AppError {
    fn from(err: calamine::XlsxError) -> Self {
        AppError::Workbook(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
