#![allow(dead_code)]

use async_trait::async_trait;
use lst_notifier::delivery::DeliverySink;
use lst_notifier::error::Result;
use lst_notifier::models::{DeliveryTarget, DisplayUnit};
use lst_notifier::templates::TemplateSet;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;

pub const TEST_CHAT_ID: i64 = -100123;

pub const TEST_TEMPLATES: &str = r#"
epoch_change: "{{asset_ticker}} moved to epoch {{epoch_change}} after {{epoch_duration}}s"
cap_change: "{{asset_ticker}} cap {{lst_cap}}$ ({{cap_diff}})"
tvl_change: "{{asset_ticker}} TVL {{lst_tvl}}$ ({{tvl_diff}})"
stats: "{{asset_ticker}} epoch {{epoch}} cap {{lst_cap}}$ TVL {{lst_tvl}}$ APY {{lst_apy}}%"
status: "{{asset_ticker}} epoch {{epoch}}"
"#;

/// Sink that keeps every delivered unit in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<DisplayUnit>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|units| units.iter().map(|u| u.text.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn resolve_target(&self) -> Result<DeliveryTarget> {
        Ok(DeliveryTarget {
            chat_id: TEST_CHAT_ID,
            title: Some("lst-alerts".to_string()),
        })
    }

    async fn deliver(&self, _target: &DeliveryTarget, unit: &DisplayUnit) -> Result<()> {
        if let Ok(mut units) = self.delivered.lock() {
            units.push(unit.clone());
        }
        Ok(())
    }
}

pub fn test_templates() -> TemplateSet {
    TemplateSet::from_yaml_str(TEST_TEMPLATES).unwrap()
}

pub fn asset(ticker: &str, epoch: i64, epoch_start: i64, cap: f64, tvl: f64) -> Value {
    json!({
        "asset_ticker": ticker,
        "asset_icon": format!("https://icons.example.com/{}.png", ticker.to_lowercase()),
        "epoch": epoch,
        "epoch_start": epoch_start,
        "lst_cap": cap,
        "lst_tvl": tvl,
        "lst_apy": 7.256
    })
}

pub fn write_fixture(path: &Path, assets: &[Value]) {
    std::fs::write(path, serde_json::to_vec_pretty(&Value::Array(assets.to_vec())).unwrap()).unwrap();
}
