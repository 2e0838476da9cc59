//! XP totals read straight from progress records, plus the level curve.
//!
//! Nothing is cached: the key space is small and a fresh scan cannot go stale.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::store::{keys, RecordStore, StoreExt};

/// Upper bound on the XP a single section or quiz can award.
pub const MAX_SECTION_XP: i64 = 10_000;

/// Clamp client-reported XP into `0..=MAX_SECTION_XP`.
pub fn clamp_awarded(xp: i64) -> i64 {
    xp.clamp(0, MAX_SECTION_XP)
}

/// `xpAwarded` of one stored record, or 0 when missing or not an integer.
fn xp_of(value: &Value) -> i64 {
    value.get("xpAwarded").and_then(Value::as_i64).unwrap_or(0)
}

/// XP for one subject, or across all subjects when `subject` is `None`.
/// An unknown subject simply has no keys and sums to 0.
pub fn total_xp(store: &dyn RecordStore, subject: Option<&str>) -> i64 {
    let prefix = match subject {
        Some(s) => keys::subject_prefix(s),
        None => keys::PROGRESS_PREFIX.to_string(),
    };
    store
        .list_keys_with_prefix(&prefix)
        .iter()
        .filter_map(|k| store.get(k))
        .map(|v| xp_of(&v))
        .fold(0i64, i64::saturating_add)
}

/// XP per subject key, for the dashboard breakdown.
pub fn xp_by_subject(store: &dyn RecordStore) -> BTreeMap<String, i64> {
    let mut out = BTreeMap::new();
    for key in store.list_keys_with_prefix(keys::PROGRESS_PREFIX) {
        let Some(subject) = keys::subject_of(&key) else { continue };
        let xp = store.get(&key).map(|v| xp_of(&v)).unwrap_or(0);
        let total = out.entry(subject.to_string()).or_insert(0i64);
        *total = total.saturating_add(xp);
    }
    out
}

/// XP needed to advance from `level` to `level + 1`. Grows as a power curve so
/// later levels take noticeably longer.
pub fn xp_for_level(level: u32) -> i64 {
    let l = f64::from(level.max(1));
    (100.0 * l.powf(1.5)).round() as i64
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned inside the current level.
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
}

/// Level reached with `total` XP, starting from level 1.
pub fn level_for_xp(total: i64) -> LevelProgress {
    let mut level = 1;
    let mut remaining = total.max(0);
    let mut needed = xp_for_level(level);
    while remaining >= needed {
        remaining -= needed;
        level += 1;
        needed = xp_for_level(level);
    }
    LevelProgress { level, xp_into_level: remaining, xp_for_next_level: needed }
}
