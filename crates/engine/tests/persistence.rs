use std::{fs, io, path::PathBuf};

use engine::{
    ACTIVE_ITEMS_KEY, ConsumptionSession, DEFAULT_HISTORY_PHOTO_WINDOW, EngineOptions, FileStore,
    HISTORY_KEY, KeyValueStore, Ledger, MemoryStore, Money, Persistence, Photo, SaveOutcome,
    StoreError, Tracker, finalize, strip_old_photos,
};
use uuid::Uuid;

const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8U";

fn test_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/test_stores")
        .join(Uuid::new_v4().to_string())
}

/// Eight sessions, most recent first, each with two photographed items.
fn photographed_sessions() -> Vec<ConsumptionSession> {
    (0..8)
        .map(|n| {
            let mut ledger = Ledger::new();
            ledger
                .add_item(&format!("Beer {n}"), Money::new(1000 + n), Some(Photo::from_data_url(PHOTO)))
                .unwrap();
            ledger
                .add_item("Fries", Money::new(1800), Some(Photo::from_data_url(PHOTO)))
                .unwrap();
            finalize(&ledger, 2, n % 2 == 0, Some("Boteco")).unwrap()
        })
        .collect()
}

#[test]
fn empty_ledger_round_trips() {
    let mut persistence = Persistence::new(MemoryStore::new(), DEFAULT_HISTORY_PHOTO_WINDOW);

    assert_eq!(persistence.save_items(&[]), SaveOutcome::Saved);
    assert_eq!(persistence.save_history(&[]), SaveOutcome::Saved);

    let snapshot = persistence.load();
    assert!(snapshot.items.is_empty());
    assert!(snapshot.history.is_empty());
}

#[test]
fn history_with_photos_round_trips() {
    let sessions = photographed_sessions();
    let mut persistence = Persistence::new(MemoryStore::new(), DEFAULT_HISTORY_PHOTO_WINDOW);

    assert_eq!(persistence.save_history(&sessions), SaveOutcome::Saved);
    assert_eq!(persistence.load().history, sessions);
}

#[test]
fn history_over_quota_keeps_recent_photos() {
    let sessions = photographed_sessions();
    let reduced = serde_json::to_string(&strip_old_photos(&sessions, 5)).unwrap();
    let full = serde_json::to_string(&sessions).unwrap();
    assert!(reduced.len() < full.len());

    let store = MemoryStore::with_capacity(HISTORY_KEY.len() + reduced.len());
    let mut persistence = Persistence::new(store, 5);

    assert_eq!(
        persistence.save_history(&sessions),
        SaveOutcome::Degraded { stripped: 3 }
    );

    let stored = persistence.load().history;
    assert_eq!(stored.len(), 8);
    for (index, (stored, original)) in stored.iter().zip(&sessions).enumerate() {
        if index < 5 {
            assert_eq!(stored, original);
        } else {
            assert!(stored.items.iter().all(|item| item.photo.is_none()));
            assert_eq!(stored.id, original.id);
            assert_eq!(stored.date, original.date);
            assert_eq!(stored.total, original.total);
            assert_eq!(stored.tip_amount, original.tip_amount);
            assert_eq!(stored.total_per_person, original.total_per_person);
            assert_eq!(stored.location, original.location);
            let names: Vec<_> = stored.items.iter().map(|item| &item.name).collect();
            let original_names: Vec<_> = original.items.iter().map(|item| &item.name).collect();
            assert_eq!(names, original_names);
        }
    }
}

#[test]
fn history_dropped_when_nothing_fits() {
    let sessions = photographed_sessions();
    let mut store = MemoryStore::with_capacity(64);
    store.set(HISTORY_KEY, "[]").unwrap();
    let mut persistence = Persistence::new(store, 5);

    assert_eq!(persistence.save_history(&sessions), SaveOutcome::Dropped);
    // The previous value is still there.
    assert_eq!(
        persistence.store().get(HISTORY_KEY).unwrap().as_deref(),
        Some("[]")
    );
}

#[test]
fn tracker_keeps_state_in_memory_when_store_is_full() {
    let mut tracker = Tracker::init(MemoryStore::with_capacity(32), EngineOptions::default());

    tracker
        .add_item("Beer", Money::new(1000), Some(Photo::from_data_url(PHOTO)))
        .unwrap();
    assert_eq!(tracker.saves().items, Some(SaveOutcome::Dropped));
    assert_eq!(tracker.ledger().len(), 1);

    tracker.finish_session(1, true).unwrap();
    assert_eq!(tracker.saves().history, Some(SaveOutcome::Dropped));
    assert_eq!(tracker.history().len(), 1);
    assert!(tracker.ledger().is_empty());
}

/// Store failing every write with an I/O error.
#[derive(Default)]
struct BrokenStore {
    writes: usize,
}

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        self.writes += 1;
        Err(io::Error::other("disk unplugged").into())
    }

    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[test]
fn io_errors_are_not_retried() {
    let mut persistence = Persistence::new(BrokenStore::default(), 5);

    assert_eq!(
        persistence.save_history(&photographed_sessions()),
        SaveOutcome::Dropped
    );
    assert_eq!(persistence.store().writes, 1);
}

#[test]
fn file_store_survives_restart() {
    let dir = test_dir();
    let store = FileStore::open(&dir, None).unwrap();
    let mut tracker = Tracker::init(store, EngineOptions::default());

    tracker.set_budget_limit(Money::new(20000)).unwrap();
    tracker
        .add_item("Beer", Money::new(1000), Some(Photo::from_data_url(PHOTO)))
        .unwrap();
    tracker.finish_session(2, true).unwrap();
    tracker.add_item("Wings", Money::new(1500), None).unwrap();
    let ledger = tracker.ledger().clone();
    let history = tracker.history().clone();
    drop(tracker);

    let reopened = Tracker::init(FileStore::open(&dir, None).unwrap(), EngineOptions::default());

    assert_eq!(reopened.ledger(), &ledger);
    assert_eq!(reopened.history(), &history);
    assert_eq!(reopened.budget().limit, Money::new(20000));
    assert!(dir.join(ACTIVE_ITEMS_KEY).is_file());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn file_store_quota_degrades_history() {
    let dir = test_dir();
    let sessions = photographed_sessions();
    let reduced = serde_json::to_string(&strip_old_photos(&sessions, 5)).unwrap();
    let store = FileStore::open(&dir, Some(reduced.len() as u64)).unwrap();
    let mut persistence = Persistence::new(store, 5);

    assert_eq!(
        persistence.save_history(&sessions),
        SaveOutcome::Degraded { stripped: 3 }
    );
    assert_eq!(persistence.load().history.len(), 8);
    let _ = fs::remove_dir_all(dir);
}
