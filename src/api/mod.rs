use crate::error::{Error, Result};
use crate::models::asset::TICKER_FIELD;
use crate::models::{AssetRecord, Snapshot};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;

/// Source of asset records, keyed by ticker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load_assets(&self) -> Result<Snapshot>;
}

#[derive(Debug, Clone)]
enum SourceMode {
    Fixture(PathBuf),
    Live { client: Client, url: String },
}

/// Reads asset records from a local fixture file or the live endpoint.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    mode: SourceMode,
}

impl AssetFetcher {
    pub fn fixture(path: impl Into<PathBuf>) -> Self {
        Self { mode: SourceMode::Fixture(path.into()) }
    }

    pub fn live(url: impl Into<String>) -> Self {
        Self::live_with_client(Client::new(), url)
    }

    pub fn live_with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            mode: SourceMode::Live { client, url: url.into() },
        }
    }

    /// Builds the fetcher for the requested mode.
    pub fn for_mode(test_mode: bool, fixture_path: impl Into<PathBuf>, api_url: Option<String>) -> Result<Self> {
        if test_mode {
            return Ok(Self::fixture(fixture_path));
        }
        match api_url {
            Some(url) if !url.trim().is_empty() => Ok(Self::live(url)),
            _ => Err(Error::ConfigError("live mode requires an assets API URL".to_string())),
        }
    }

    pub fn is_test_mode(&self) -> bool {
        matches!(self.mode, SourceMode::Fixture(_))
    }

    async fn fetch_payload(&self) -> Result<Value> {
        match &self.mode {
            SourceMode::Fixture(path) => {
                debug!("Reading test assets from {}", path.display());
                let raw = tokio::fs::read(path).await?;
                Ok(serde_json::from_slice(&raw)?)
            }
            SourceMode::Live { client, url } => {
                debug!("Fetching assets from {}", url);
                let response = client.get(url).send().await?.error_for_status()?;
                let body = response.bytes().await?;
                Ok(serde_json::from_slice(&body)?)
            }
        }
    }
}

#[async_trait]
impl AssetSource for AssetFetcher {
    async fn load_assets(&self) -> Result<Snapshot> {
        let payload = self.fetch_payload().await?;
        let snapshot = normalize(payload)?;
        info!("Loaded {} assets", snapshot.len());
        Ok(snapshot)
    }
}

/// Keys a sequence of records on their ticker field. Records without a
/// ticker are dropped; a repeated ticker keeps the last record.
pub fn normalize(payload: Value) -> Result<Snapshot> {
    let items = match payload {
        Value::Array(items) => items,
        other => {
            return Err(Error::ParseError(format!(
                "expected a list of asset records, got {}",
                type_name(&other)
            )))
        }
    };

    let mut snapshot = Snapshot::new();
    for item in items {
        let record = match item {
            Value::Object(fields) => AssetRecord::from_map(fields),
            other => {
                warn!("Skipping non-object asset entry: {}", other);
                continue;
            }
        };
        match record.ticker() {
            Some(ticker) => snapshot.insert(ticker, record),
            _ => debug!("Skipping asset record without {}", TICKER_FIELD),
        }
    }
    Ok(snapshot)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
