use crate::models::{ChangeKind, Snapshot};
use serde_json::Value;
use std::collections::BTreeMap;

/// Change kinds observed per ticker, in detection order.
pub type ChangeSet = BTreeMap<String, Vec<ChangeKind>>;

/// Compares two snapshots and reports, per ticker of `current`, which of
/// epoch, capacity and TVL moved.
///
/// Tickers missing (or empty) in `previous` are skipped so a cold start does
/// not announce every asset. Tickers without changes are left out.
pub fn detect(previous: &Snapshot, current: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (ticker, record) in current.iter() {
        let prev = match previous.get(ticker) {
            Some(prev) if !prev.is_empty() => prev,
            _ => continue,
        };

        let kinds: Vec<ChangeKind> = ChangeKind::ALL
            .iter()
            .copied()
            .filter(|kind| !same_value(record.field(kind.field()), prev.field(kind.field())))
            .collect();

        if !kinds.is_empty() {
            changes.insert(ticker.clone(), kinds);
        }
    }

    changes
}

/// Numbers compare by value, so `1000` and `1000.0` are equal. Anything else,
/// including a number against a numeric string, compares structurally.
fn same_value(current: &Value, previous: &Value) -> bool {
    match (current, previous) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => a.as_f64() == b.as_f64(),
        _ => current == previous,
    }
}
