use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field holding the ticker symbol of an asset record.
pub const TICKER_FIELD: &str = "asset_ticker";
pub const EPOCH_FIELD: &str = "epoch";
pub const EPOCH_START_FIELD: &str = "epoch_start";
pub const CAP_FIELD: &str = "lst_cap";
pub const TVL_FIELD: &str = "lst_tvl";
pub const APY_FIELD: &str = "lst_apy";
pub const ICON_FIELD: &str = "asset_icon";
pub const FALLBACK_ICON_FIELD: &str = "lst_icon";

/// Named fields of one tracked asset, as returned by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRecord(Map<String, Value>);

impl AssetRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value with absent fields read as null.
    pub fn field(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&Value::Null)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Ticker symbol in its display form, if the record carries one.
    pub fn ticker(&self) -> Option<String> {
        self.get(TICKER_FIELD).map(display_value)
    }
}

impl From<Value> for AssetRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::new(),
        }
    }
}

/// All tracked assets as of one poll, keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, AssetRecord>);

impl Snapshot {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, ticker: &str) -> Option<&AssetRecord> {
        self.0.get(ticker)
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut AssetRecord> {
        self.0.get_mut(ticker)
    }

    pub fn insert(&mut self, ticker: impl Into<String>, record: AssetRecord) {
        self.0.insert(ticker.into(), record);
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.0.contains_key(ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AssetRecord)> {
        self.0.iter()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Copy of this snapshot restricted to the given tickers.
    pub fn restricted_to<S: AsRef<str>>(&self, tickers: &[S]) -> Snapshot {
        let mut restricted = Snapshot::new();
        for ticker in tickers {
            if let Some(record) = self.get(ticker.as_ref()) {
                restricted.insert(ticker.as_ref(), record.clone());
            }
        }
        restricted
    }
}

impl FromIterator<(String, AssetRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, AssetRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// String form used when a JSON value is shown to users.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Numeric reading of a JSON value; numeric strings are accepted.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Truthiness of a JSON value: null, false, zero and empty values are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
