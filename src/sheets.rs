use crate::config::SheetsConfig;
use crate::errors::AppError;
use crate::table::{A1Range, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Tokens are refreshed this long before Google says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a Google service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Auth(format!("Failed to read credentials {}: {}", path, e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Auth(format!("Invalid credentials file {}: {}", path, e)))
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Where the bearer token for Sheets calls comes from.
enum TokenSource {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

/// Google Sheets v4 values API bound to one spreadsheet and range.
pub struct SheetStore {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    chunk_rows: usize,
    clear_before_write: bool,
    token: TokenSource,
}

impl SheetStore {
    /// Builds a store from configuration. A configured access token wins
    /// over the service-account key file.
    pub fn new(config: &SheetsConfig) -> Result<Self, AppError> {
        let token = match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::ServiceAccount {
                key: ServiceAccountKey::from_file(&config.credentials_file)?,
                cached: Mutex::new(None),
            },
        };
        Self::with_token_source(config, token)
    }

    /// Store authenticated by a fixed bearer token.
    pub fn with_access_token(config: &SheetsConfig, token: impl Into<String>) -> Result<Self, AppError> {
        Self::with_token_source(config, TokenSource::Static(token.into()))
    }

    fn with_token_source(config: &SheetsConfig, token: TokenSource) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Sheet(format!("Failed to create Sheets client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            chunk_rows: config.chunk_rows.max(1),
            clear_before_write: config.clear_before_write,
            token,
        })
    }

    /// Reads the configured range as a table. An empty sheet gives an
    /// empty table.
    pub async fn read(&self) -> Result<Table, AppError> {
        let url = self.values_url(&self.range, None)?;
        let token = self.access_token().await?;
        tracing::debug!("Reading sheet range {}", self.range);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Sheet(format!("Sheets read failed: {}", e)))?;
        let body: Value = Self::json_or_error(response, "read").await?;

        let values = parse_values(&body);
        if values.is_empty() {
            tracing::info!("No data found in {}", self.range);
        }
        Ok(Table::from_values(values))
    }

    /// Writes to the configured range with the configured options.
    pub async fn write(&self, table: &Table) -> Result<(), AppError> {
        self.write_range(table, &self.range, self.clear_before_write, self.chunk_rows)
            .await
    }

    /// Writes header and rows starting at the top-left cell of `range`,
    /// at most `chunk_rows` rows per request.
    pub async fn write_range(
        &self,
        table: &Table,
        range: &str,
        clear_before_write: bool,
        chunk_rows: usize,
    ) -> Result<(), AppError> {
        if table.rows.is_empty() {
            return Err(AppError::InvalidInput(
                "Table is empty; nothing to write".to_string(),
            ));
        }
        let start = A1Range::parse(range)?;
        let values = table.to_values();
        let cols = values.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let token = self.access_token().await?;

        if clear_before_write {
            let url = self.values_url(range, Some(":clear"))?;
            tracing::info!("Clearing sheet range {}", range);
            let response = self
                .client
                .post(url)
                .bearer_auth(&token)
                .json(&json!({}))
                .send()
                .await
                .map_err(|e| AppError::Sheet(format!("Sheets clear failed: {}", e)))?;
            let _: Value = Self::json_or_error(response, "clear").await?;
        }

        let mut offset = 0u32;
        for chunk in values.chunks(chunk_rows.max(1)) {
            let block = start.block(offset, chunk.len() as u32, cols);
            let mut url = self.values_url(&block, None)?;
            url.query_pairs_mut().append_pair("valueInputOption", "RAW");
            tracing::debug!("Writing {} rows to {}", chunk.len(), block);

            let response = self
                .client
                .put(url)
                .bearer_auth(&token)
                .json(&json!({
                    "range": block,
                    "majorDimension": "ROWS",
                    "values": chunk,
                }))
                .send()
                .await
                .map_err(|e| AppError::Sheet(format!("Sheets write to {} failed: {}", block, e)))?;
            let _: Value = Self::json_or_error(response, "write").await?;
            offset += chunk.len() as u32;
        }

        tracing::info!("✓ Wrote {} rows to {}", values.len(), range);
        Ok(())
    }

    fn values_url(&self, range: &str, suffix: Option<&str>) -> Result<reqwest::Url, AppError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AppError::Sheet(format!("Invalid Sheets base URL: {}", e)))?;
        let segment = format!("{}{}", range, suffix.unwrap_or(""));
        url.path_segments_mut()
            .map_err(|_| AppError::Sheet("Sheets base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", segment.as_str()]);
        Ok(url)
    }

    async fn json_or_error(response: reqwest::Response, action: &str) -> Result<Value, AppError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Sheet(format!(
                "Sheets {} returned {}: {}",
                action, status, error_text
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Sheet(format!("Failed to parse Sheets {} response: {}", action, e)))
    }

    async fn access_token(&self) -> Result<String, AppError> {
        let (key, cached) = match &self.token {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount { key, cached } => (key, cached),
        };

        {
            let guard = cached.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((token, expires_at)) = guard.as_ref() {
                if Instant::now() < *expires_at {
                    return Ok(token.clone());
                }
            }
        }

        let (token, lifetime) = self.exchange_jwt(key).await?;
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached.lock().unwrap_or_else(|e| e.into_inner()) = Some((token.clone(), expires_at));
        Ok(token)
    }

    async fn exchange_jwt(&self, key: &ServiceAccountKey) -> Result<(String, Duration), AppError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Auth(format!("System clock before epoch: {}", e)))?
            .as_secs();
        let claims = JwtClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat,
            exp: iat + 3600,
        };
        let signing_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::Auth(format!("Invalid service account key: {}", e)))?;
        let assertion = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &signing_key,
        )
        .map_err(|e| AppError::Auth(format!("Failed to sign token request: {}", e)))?;

        tracing::debug!("Requesting Sheets access token for {}", key.client_email);
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;
        Ok((
            token.access_token,
            Duration::from_secs(token.expires_in.unwrap_or(3600)),
        ))
    }
}

/// Extracts `values` as strings. Missing `values` means an empty range.
fn parse_values(body: &Value) -> Vec<Vec<String>> {
    body.get("values")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|cell| match cell {
                                    Value::String(s) => s.clone(),
                                    Value::Null => String::new(),
                                    other => other.to_string(),
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_values_handles_missing_and_mixed_cells() {
        assert!(parse_values(&json!({"range": "Sheet1!A1:Z1000"})).is_empty());
        let values = parse_values(&json!({"values": [["a", 1, null], []]}));
        assert_eq!(values, vec![vec!["a", "1", ""], vec![]]);
    }

    #[test]
    fn values_url_encodes_range() {
        let config = SheetsConfig {
            base_url: "https://sheets.example.com/v4".to_string(),
            spreadsheet_id: "abc".to_string(),
            ..SheetsConfig::default()
        };
        let store = SheetStore::with_access_token(&config, "t").unwrap();
        let url = store.values_url("'My Sheet'!A1:B2", Some(":clear")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example.com/v4/spreadsheets/abc/values/'My%20Sheet'!A1:B2:clear"
        );
    }

    #[tokio::test]
    async fn refuses_empty_table() {
        let store = SheetStore::with_access_token(&SheetsConfig::default(), "t").unwrap();
        let err = store
            .write_range(&Table::default(), "Sheet1!A1", false, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
