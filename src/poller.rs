use crate::api::AssetSource;
use crate::delivery::DeliverySink;
use crate::detector::detect;
use crate::metrics::PollMetrics;
use crate::models::asset::display_value;
use crate::models::{AssetRecord, ChangeKind, DeliveryTarget, Snapshot};
use crate::storage::SnapshotStore;
use crate::templates::{render, SharedTemplates};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

/// Last observed snapshot, shared between the poll loop and chat commands.
pub type SharedSnapshot = Arc<RwLock<Snapshot>>;

pub fn shared_snapshot(snapshot: Snapshot) -> SharedSnapshot {
    Arc::new(RwLock::new(snapshot))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No delivery target could be resolved; nothing was fetched.
    Skipped,
    /// The asset source failed; the previous snapshot is kept.
    FetchFailed,
    Completed { notifications: usize, persisted: bool },
}

/// Drives the fetch, detect, notify and persist cycle.
pub struct Poller {
    source: Arc<dyn AssetSource>,
    sink: Arc<dyn DeliverySink>,
    templates: SharedTemplates,
    snapshot: SharedSnapshot,
    store: SnapshotStore,
    tracked: Vec<String>,
    target: Option<DeliveryTarget>,
    metrics: PollMetrics,
}

impl Poller {
    pub fn new(
        source: Arc<dyn AssetSource>,
        sink: Arc<dyn DeliverySink>,
        templates: SharedTemplates,
        snapshot: SharedSnapshot,
        store: SnapshotStore,
        tracked: Vec<String>,
        metrics: PollMetrics,
    ) -> Self {
        Self {
            source,
            sink,
            templates,
            snapshot,
            store,
            tracked,
            target: None,
            metrics,
        }
    }

    /// Seeds the target cache, e.g. with a target resolved at startup.
    pub fn with_target(mut self, target: DeliveryTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn target(&self) -> Option<&DeliveryTarget> {
        self.target.as_ref()
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    /// Runs a cycle on every tick of `period`, starting immediately. Cycles
    /// never overlap; ticks missed by a slow cycle are skipped.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Polling {} tickers every {:?}", self.tracked.len(), period);

        loop {
            ticker.tick().await;
            let outcome = self.run_cycle().await;
            debug!("Poll cycle outcome: {:?}", outcome);
        }
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.metrics.cycles.inc();

        let target = match self.resolve_target().await {
            Some(target) => target,
            None => {
                self.metrics.skipped.inc();
                return CycleOutcome::Skipped;
            }
        };

        let fetched = match self.source.load_assets().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to fetch assets: {}", e);
                self.metrics.fetch_failures.inc();
                return CycleOutcome::FetchFailed;
            }
        };
        let mut current = fetched.restricted_to(&self.tracked);
        let previous = self.snapshot.read().await.clone();

        let changes = detect(&previous, &current);
        if !changes.is_empty() {
            info!("Detected changes for {} of {} assets", changes.len(), current.len());
        }

        let empty = AssetRecord::new();
        let mut notifications = 0;
        for ticker in &self.tracked {
            let kinds = match changes.get(ticker) {
                Some(kinds) => kinds,
                None => continue,
            };
            let prev_record = previous.get(ticker).unwrap_or(&empty);

            for kind in kinds {
                let record = match current.get_mut(ticker) {
                    Some(record) => record,
                    None => continue,
                };
                inject_change_fields(record, prev_record, *kind);

                let template = match self.templates.read().await.get(kind.template_key()) {
                    Ok(template) => template.to_string(),
                    Err(e) => {
                        error!("Cannot announce {} for {}: {}", kind, ticker, e);
                        continue;
                    }
                };
                let unit = render(&template, record, prev_record);

                match self.sink.deliver(&target, &unit).await {
                    Ok(()) => {
                        info!("Announced {} for {}", kind, ticker);
                        notifications += 1;
                        self.metrics.notifications_sent.inc();
                    }
                    Err(e) => {
                        warn!("Failed to deliver {} for {}: {}", kind, ticker, e);
                        self.metrics.delivery_failures.inc();
                    }
                }
            }
        }

        self.metrics.tracked_assets.set(current.len() as i64);
        *self.snapshot.write().await = current.clone();

        let persisted = match self.store.save(&current).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist snapshot to {}: {}", self.store.path().display(), e);
                self.metrics.persist_failures.inc();
                false
            }
        };

        CycleOutcome::Completed { notifications, persisted }
    }

    async fn resolve_target(&mut self) -> Option<DeliveryTarget> {
        if let Some(target) = &self.target {
            return Some(target.clone());
        }
        match self.sink.resolve_target().await {
            Ok(target) => {
                info!("Delivering notifications to chat {}", target.chat_id);
                self.target = Some(target.clone());
                Some(target)
            }
            Err(e) => {
                warn!("Cannot resolve delivery target, skipping cycle: {}", e);
                None
            }
        }
    }
}

/// Adds the display fields describing `kind` to the current record:
/// `cap_diff`/`cap_diff_raw`, `tvl_diff`/`tvl_diff_raw` or `epoch_change`.
pub fn inject_change_fields(record: &mut AssetRecord, previous: &AssetRecord, kind: ChangeKind) {
    let field = kind.field();
    let (current_value, previous_value) = (record.field(field).clone(), previous.field(field));
    if current_value.is_null() || previous_value.is_null() {
        return;
    }

    match kind {
        ChangeKind::EpochChange => {
            let arrow = format!("{} → {}", display_value(previous_value), display_value(&current_value));
            record.insert(kind.as_str(), arrow);
        }
        ChangeKind::CapChange | ChangeKind::TvlChange => {
            let prefix = if kind == ChangeKind::CapChange { "cap" } else { "tvl" };
            match signed_difference(&current_value, previous_value) {
                Some((text, raw)) => {
                    record.insert(format!("{prefix}_diff"), text);
                    record.insert(format!("{prefix}_diff_raw"), raw);
                }
                None => debug!("Non-numeric {} values, no difference computed", field),
            }
        }
    }
}

fn signed_difference(current: &Value, previous: &Value) -> Option<(String, Value)> {
    let (current, previous) = match (current, previous) {
        (Value::Number(current), Value::Number(previous)) => (current, previous),
        _ => return None,
    };
    if let (Some(c), Some(p)) = (current.as_i64(), previous.as_i64()) {
        if let Some(diff) = c.checked_sub(p) {
            return Some((format!("{:+}", diff), Value::from(diff)));
        }
    }
    let diff = current.as_f64()? - previous.as_f64()?;
    // Floats keep a fractional part in text, e.g. "+100.0".
    let sign = if diff.is_sign_negative() { "" } else { "+" };
    Some((format!("{}{:?}", sign, diff), Value::from(diff)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{normalize, MockAssetSource};
    use crate::delivery::MockDeliverySink;
    use crate::error::Error;
    use crate::models::DisplayUnit;
    use crate::templates::{shared, TemplateSet};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    const TEMPLATES: &str = r#"
stats: "{{asset_ticker}} stats"
status: "{{asset_ticker}} status"
epoch_change: "{{asset_ticker}} epoch {{epoch_change}}"
cap_change: "{{asset_ticker}} cap {{prev.lst_cap}} -> {{lst_cap}} ({{cap_diff}})"
tvl_change: "{{asset_ticker}} tvl {{tvl_diff}}"
"#;

    fn snapshot(value: Value) -> Snapshot {
        serde_json::from_value(value).unwrap()
    }

    fn target() -> DeliveryTarget {
        DeliveryTarget { chat_id: -100, title: Some("alerts".to_string()) }
    }

    fn resolving_sink() -> MockDeliverySink {
        let mut sink = MockDeliverySink::new();
        sink.expect_resolve_target().returning(|| Ok(target()));
        sink
    }

    fn recording(sink: &mut MockDeliverySink) -> Arc<Mutex<Vec<DisplayUnit>>> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let log = sent.clone();
        sink.expect_deliver().returning(move |_, unit| {
            log.lock().unwrap().push(unit.clone());
            Ok(())
        });
        sent
    }

    fn source_returning(value: Value) -> MockAssetSource {
        let mut source = MockAssetSource::new();
        source
            .expect_load_assets()
            .returning(move || normalize(value.clone()));
        source
    }

    fn poller(source: MockAssetSource, sink: MockDeliverySink, previous: Snapshot) -> (Poller, TempDir) {
        let dir = tempdir().unwrap();
        let poller = Poller::new(
            Arc::new(source),
            Arc::new(sink),
            shared(TemplateSet::from_yaml_str(TEMPLATES).unwrap()),
            shared_snapshot(previous),
            SnapshotStore::new(dir.path().join("last_snapshot.json")),
            vec!["USDC".to_string(), "SPYx".to_string(), "JITOSOL".to_string()],
            PollMetrics::unregistered().unwrap(),
        );
        (poller, dir)
    }

    #[test_log::test(tokio::test)]
    async fn test_unresolved_target_skips_cycle() {
        let mut sink = MockDeliverySink::new();
        sink.expect_resolve_target()
            .times(1)
            .returning(|| Err(Error::TargetNotFound("chat -100".to_string())));
        sink.expect_deliver().never();
        let mut source = MockAssetSource::new();
        source.expect_load_assets().never();

        let (mut poller, dir) = poller(source, sink, Snapshot::new());
        assert_eq!(poller.run_cycle().await, CycleOutcome::Skipped);
        assert!(poller.target().is_none());
        assert!(!dir.path().join("last_snapshot.json").exists());
        assert_eq!(poller.metrics.skipped.get(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_epoch_change_is_announced_and_persisted() {
        let previous = snapshot(json!({"USDC": {"asset_ticker": "USDC", "epoch": 500, "lst_cap": 1000, "lst_tvl": 900}}));
        let source = source_returning(json!([
            {"asset_ticker": "USDC", "epoch": 501, "lst_cap": 1000, "lst_tvl": 900}
        ]));
        let mut sink = resolving_sink();
        let sent = recording(&mut sink);

        let (mut poller, _dir) = poller(source, sink, previous);
        let outcome = poller.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Completed { notifications: 1, persisted: true });
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "USDC epoch 500 → 501");
        assert_eq!(sent[0].footer, "USDC");

        let stored = poller.store.load().await;
        let usdc = stored.get("USDC").unwrap();
        assert_eq!(usdc.field("epoch"), &json!(501));
        assert_eq!(usdc.field("epoch_change"), &json!("500 → 501"));
        assert_eq!(*poller.snapshot.read().await, stored);
    }

    #[test_log::test(tokio::test)]
    async fn test_each_change_kind_is_a_separate_notification() {
        let previous = snapshot(json!({"USDC": {"asset_ticker": "USDC", "epoch": 7, "lst_cap": 1000, "lst_tvl": 900.5}}));
        let source = source_returning(json!([
            {"asset_ticker": "USDC", "epoch": 7, "lst_cap": 1100, "lst_tvl": 880.25}
        ]));
        let mut sink = resolving_sink();
        let sent = recording(&mut sink);

        let (mut poller, _dir) = poller(source, sink, previous);
        let outcome = poller.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Completed { notifications: 2, persisted: true });
        let texts: Vec<String> = sent.lock().unwrap().iter().map(|u| u.text.clone()).collect();
        assert_eq!(texts, vec!["USDC cap 1000 -> 1100 (+100.00)", "USDC tvl -20.25"]);

        let current = poller.snapshot.read().await;
        let usdc = current.get("USDC").unwrap();
        assert_eq!(usdc.field("cap_diff"), &json!("+100"));
        assert_eq!(usdc.field("cap_diff_raw"), &json!(100));
        assert_eq!(usdc.field("tvl_diff"), &json!("-20.25"));
    }

    #[test_log::test(tokio::test)]
    async fn test_cold_start_is_silent_but_persists() {
        let source = source_returning(json!([
            {"asset_ticker": "USDC", "epoch": 1, "lst_cap": 1, "lst_tvl": 1},
            {"asset_ticker": "BONK", "epoch": 9, "lst_cap": 9, "lst_tvl": 9}
        ]));
        let mut sink = resolving_sink();
        sink.expect_deliver().never();

        let (mut poller, _dir) = poller(source, sink, Snapshot::new());
        let outcome = poller.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Completed { notifications: 0, persisted: true });
        let stored = poller.store.load().await;
        assert!(stored.contains("USDC"));
        assert!(!stored.contains("BONK"));
        assert_eq!(poller.metrics.tracked_assets.get(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let previous = snapshot(json!({"USDC": {"asset_ticker": "USDC", "epoch": 500}}));
        let mut source = MockAssetSource::new();
        source
            .expect_load_assets()
            .returning(|| Err(Error::ParseError("unexpected payload".to_string())));
        let mut sink = resolving_sink();
        sink.expect_deliver().never();

        let (mut poller, dir) = poller(source, sink, previous.clone());
        assert_eq!(poller.run_cycle().await, CycleOutcome::FetchFailed);
        assert_eq!(*poller.snapshot.read().await, previous);
        assert!(!dir.path().join("last_snapshot.json").exists());
        assert_eq!(poller.target(), Some(&target()));
        assert_eq!(poller.metrics.fetch_failures.get(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_target_is_resolved_once() {
        let mut sink = MockDeliverySink::new();
        sink.expect_resolve_target().times(1).returning(|| Ok(target()));
        sink.expect_deliver().never();
        let source = source_returning(json!([{"asset_ticker": "SPYx", "epoch": 3}]));

        let (mut poller, _dir) = poller(source, sink, Snapshot::new());
        poller.run_cycle().await;
        let outcome = poller.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Completed { notifications: 0, persisted: true });
    }

    #[test_log::test(tokio::test)]
    async fn test_delivery_failure_does_not_abort_cycle() {
        let previous = snapshot(json!({"JITOSOL": {"asset_ticker": "JITOSOL", "epoch": 1, "lst_cap": 5, "lst_tvl": 5}}));
        let source = source_returning(json!([
            {"asset_ticker": "JITOSOL", "epoch": 2, "lst_cap": 6, "lst_tvl": 5}
        ]));
        let mut sink = resolving_sink();
        let attempts = Arc::new(Mutex::new(0));
        let counter = attempts.clone();
        sink.expect_deliver().times(2).returning(move |_, _| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            if *n == 1 {
                Err(Error::DeliveryError("flood control".to_string()))
            } else {
                Ok(())
            }
        });

        let (mut poller, _dir) = poller(source, sink, previous);
        let outcome = poller.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Completed { notifications: 1, persisted: true });
        assert_eq!(poller.metrics.delivery_failures.get(), 1);
    }

    #[test]
    fn test_inject_change_fields() {
        let previous = AssetRecord::from(json!({"epoch": 500, "lst_cap": 1000, "lst_tvl": "900"}));
        let mut record = AssetRecord::from(json!({"epoch": 501, "lst_cap": 1100, "lst_tvl": 950}));

        inject_change_fields(&mut record, &previous, ChangeKind::EpochChange);
        inject_change_fields(&mut record, &previous, ChangeKind::CapChange);
        inject_change_fields(&mut record, &previous, ChangeKind::TvlChange);

        assert_eq!(record.field("epoch_change"), &json!("500 → 501"));
        assert_eq!(record.field("cap_diff"), &json!("+100"));
        assert_eq!(record.field("cap_diff_raw"), &json!(100));
        assert!(!record.contains("tvl_diff"));
        assert!(!record.contains("tvl_diff_raw"));
    }

    #[test]
    fn test_inject_skips_missing_previous_value() {
        let mut record = AssetRecord::from(json!({"lst_cap": 10.5}));
        inject_change_fields(&mut record, &AssetRecord::new(), ChangeKind::CapChange);
        assert!(!record.contains("cap_diff"));

        let previous = AssetRecord::from(json!({"lst_cap": 10}));
        inject_change_fields(&mut record, &previous, ChangeKind::CapChange);
        assert_eq!(record.field("cap_diff"), &json!("+0.5"));
        assert_eq!(record.field("cap_diff_raw"), &json!(0.5));
    }

    #[test]
    fn test_float_differences_keep_decimal_text() {
        let previous = AssetRecord::from(json!({"lst_cap": 1000.0, "lst_tvl": 900.5}));
        let mut record = AssetRecord::from(json!({"lst_cap": 1100.0, "lst_tvl": 850}));

        inject_change_fields(&mut record, &previous, ChangeKind::CapChange);
        inject_change_fields(&mut record, &previous, ChangeKind::TvlChange);

        assert_eq!(record.field("cap_diff"), &json!("+100.0"));
        assert_eq!(record.field("cap_diff_raw"), &json!(100.0));
        assert_eq!(record.field("tvl_diff"), &json!("-50.5"));
    }
}
