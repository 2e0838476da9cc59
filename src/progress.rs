//! Progress records on top of the record store: section activity, the bookmark
//! list and the recent-visit list.
//!
//! Writes are best-effort. A failed write is logged and the caller carries on
//! with the in-memory result, so the UI still reflects the action this session.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::domain::{ActivityRecord, Bookmark, DotpointRef, RecentVisit};
use crate::store::{keys, RecordStore, StoreExt};

/// Most recent visits kept.
pub const MAX_RECENT_VISITS: usize = 20;

fn best_effort<T: serde::Serialize + ?Sized>(store: &mut dyn RecordStore, key: &str, value: &T) {
  if let Err(e) = store.put_json(key, value) {
    warn!(target: "progress", %key, error = %e, "Storage write failed; change kept for this session only");
  }
}

// -------- Activity --------

/// Store `record` under its progress key, replacing any earlier record for the
/// same section.
#[instrument(level = "debug", skip_all, fields(subject = %record.subject_key, dotpoint = %record.dotpoint_id, section = %record.section_id))]
pub fn record_activity(store: &mut dyn RecordStore, record: &ActivityRecord) {
  let key = keys::progress(&record.subject_key, record.module_number, &record.dotpoint_id, &record.section_id);
  best_effort(store, &key, record);
}

/// Every stored activity record, optionally for one subject. Records that no
/// longer parse are skipped.
pub fn activity_records(store: &dyn RecordStore, subject: Option<&str>) -> Vec<ActivityRecord> {
  let prefix = match subject {
    Some(s) => keys::subject_prefix(s),
    None => keys::PROGRESS_PREFIX.to_string(),
  };
  store
    .list_keys_with_prefix(&prefix)
    .iter()
    .filter_map(|k| store.get_json::<ActivityRecord>(k))
    .collect()
}

// -------- Bookmarks --------

pub fn bookmarks(store: &dyn RecordStore) -> Vec<Bookmark> {
  store.get_json(keys::BOOKMARKS).unwrap_or_default()
}

pub fn is_bookmarked(store: &dyn RecordStore, target: &DotpointRef) -> bool {
  bookmarks(store).iter().any(|b| &b.target == target)
}

/// Add `bookmark` unless its dotpoint is already bookmarked. Returns true if added.
pub fn add_bookmark(store: &mut dyn RecordStore, bookmark: Bookmark) -> bool {
  let mut list = bookmarks(store);
  if list.iter().any(|b| b.target == bookmark.target) {
    debug!(target: "progress", dotpoint = %bookmark.target.dotpoint_id, "Bookmark already present");
    return false;
  }
  list.push(bookmark);
  best_effort(store, keys::BOOKMARKS, &list);
  true
}

/// Returns true if a bookmark was removed.
pub fn remove_bookmark(store: &mut dyn RecordStore, target: &DotpointRef) -> bool {
  let mut list = bookmarks(store);
  let before = list.len();
  list.retain(|b| &b.target != target);
  if list.len() == before {
    return false;
  }
  best_effort(store, keys::BOOKMARKS, &list);
  true
}

/// Flip the bookmark state of a dotpoint. Returns the new state.
pub fn toggle_bookmark(store: &mut dyn RecordStore, bookmark: Bookmark) -> bool {
  if remove_bookmark(store, &bookmark.target) {
    false
  } else {
    add_bookmark(store, bookmark)
  }
}

// -------- Recent visits --------

pub fn recent_visits(store: &dyn RecordStore) -> Vec<RecentVisit> {
  store.get_json(keys::RECENT_VISITS).unwrap_or_default()
}

/// Put `visit` at the front of the list, dropping an older entry for the same
/// dotpoint and trimming to `MAX_RECENT_VISITS`.
pub fn record_visit(store: &mut dyn RecordStore, visit: RecentVisit) -> Vec<RecentVisit> {
  let mut list = recent_visits(store);
  list.retain(|v| v.target != visit.target);
  list.insert(0, visit);
  list.truncate(MAX_RECENT_VISITS);
  best_effort(store, keys::RECENT_VISITS, &list);
  list
}

/// Convenience constructor used by handlers and tests.
pub fn bookmark_for(target: DotpointRef, title: &str, subject_name: &str, at: DateTime<Utc>) -> Bookmark {
  Bookmark { target, title: title.to_string(), subject_name: subject_name.to_string(), created_at: at }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use chrono::TimeZone;

  fn at(min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 9, min, 0).unwrap()
  }

  fn target(id: &str) -> DotpointRef {
    DotpointRef { subject_key: "biology".into(), module_number: 5, dotpoint_id: id.into() }
  }

  fn visit(id: &str, min: u32) -> RecentVisit {
    RecentVisit { target: target(id), title: id.into(), subject_name: "Biology".into(), visited_at: at(min) }
  }

  fn activity(section: &str, xp: i64) -> ActivityRecord {
    ActivityRecord {
      subject_key: "biology".into(),
      module_number: 5,
      dotpoint_id: "b1".into(),
      section_id: section.into(),
      completed: true,
      xp_awarded: xp,
      occurred_at: at(0),
    }
  }

  #[test]
  fn test_bookmark_added_once() {
    let mut store = MemoryStore::new();
    assert!(add_bookmark(&mut store, bookmark_for(target("b1"), "DNA", "Biology", at(1))));
    assert!(!add_bookmark(&mut store, bookmark_for(target("b1"), "DNA", "Biology", at(2))));

    let list = bookmarks(&store);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].created_at, at(1));
  }

  #[test]
  fn test_toggle_bookmark() {
    let mut store = MemoryStore::new();
    let b = bookmark_for(target("b1"), "DNA", "Biology", at(1));

    assert!(toggle_bookmark(&mut store, b.clone()));
    assert!(is_bookmarked(&store, &target("b1")));
    assert!(!toggle_bookmark(&mut store, b));
    assert!(bookmarks(&store).is_empty());
  }

  #[test]
  fn test_same_dotpoint_in_other_module_is_distinct() {
    let mut store = MemoryStore::new();
    let mut other = target("b1");
    other.module_number = 6;
    add_bookmark(&mut store, bookmark_for(target("b1"), "DNA", "Biology", at(1)));
    add_bookmark(&mut store, bookmark_for(other, "DNA", "Biology", at(1)));
    assert_eq!(bookmarks(&store).len(), 2);
  }

  #[test]
  fn test_recent_visit_dedup_and_reorder() {
    let mut store = MemoryStore::new();
    record_visit(&mut store, visit("a", 1));
    record_visit(&mut store, visit("b", 2));
    let list = record_visit(&mut store, visit("a", 3));

    let ids: Vec<_> = list.iter().map(|v| v.target.dotpoint_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(list[0].visited_at, at(3));
    assert_eq!(recent_visits(&store), list);
  }

  #[test]
  fn test_recent_visits_capped() {
    let mut store = MemoryStore::new();
    for i in 0..25u32 {
      record_visit(&mut store, visit(&format!("d{i}"), i));
    }
    let list = recent_visits(&store);
    assert_eq!(list.len(), MAX_RECENT_VISITS);
    assert_eq!(list[0].target.dotpoint_id, "d24");
    assert_eq!(list[MAX_RECENT_VISITS - 1].target.dotpoint_id, "d5");
  }

  #[test]
  fn test_activity_superseded_by_later_write() {
    let mut store = MemoryStore::new();
    record_activity(&mut store, &activity("notes", 10));
    record_activity(&mut store, &activity("notes", 25));
    record_activity(&mut store, &activity("quiz", 5));

    let records = activity_records(&store, Some("biology"));
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().map(|r| r.xp_awarded).sum::<i64>(), 30);
    assert!(activity_records(&store, Some("physics")).is_empty());
  }

  #[test]
  fn test_corrupt_bookmark_list_reads_empty() {
    let mut store = MemoryStore::new();
    store.put_raw(keys::BOOKMARKS, "not-json".into()).unwrap();
    assert!(bookmarks(&store).is_empty());
    // and the next add repairs it
    assert!(add_bookmark(&mut store, bookmark_for(target("b1"), "DNA", "Biology", at(1))));
    assert_eq!(bookmarks(&store).len(), 1);
  }

  #[test]
  fn test_write_failure_is_not_fatal() {
    let mut store = MemoryStore::with_quota(4);
    let list = record_visit(&mut store, visit("a", 1));
    assert_eq!(list.len(), 1);
    assert!(recent_visits(&store).is_empty());
  }
}
