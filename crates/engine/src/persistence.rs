//! The module contains the persistence service: durable round-trip of the
//! active items, the history and the budget configuration.
//!
//! Loading is best effort per key: a missing or unreadable value falls back to
//! its empty default without affecting the other keys. Saving never fails to
//! the caller; the [`SaveOutcome`] says what actually reached the store.
//!
//! When the history does not fit, it is written again with the photos of every
//! session past the most recent `history_photo_window` removed. If that also
//! fails the history only lives in memory until the next successful save.
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    BudgetConfig, ConsumptionItem, ConsumptionSession, KeyValueStore, Money, StoreError,
};

pub const ACTIVE_ITEMS_KEY: &str = "bar_active_items";
pub const HISTORY_KEY: &str = "bar_history";
pub const BUDGET_LIMIT_KEY: &str = "bar_budget_limit";
pub const BUDGET_LOCATION_KEY: &str = "bar_budget_location";

/// Number of most recent sessions keeping their photos under quota pressure.
pub const DEFAULT_HISTORY_PHOTO_WINDOW: usize = 5;

/// Result of a save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Saved after removing photos from `stripped` sessions.
    Degraded { stripped: usize },
    /// Nothing was written; the data is only in memory.
    Dropped,
}

/// Everything read back at boot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub items: Vec<ConsumptionItem>,
    pub history: Vec<ConsumptionSession>,
    pub budget: BudgetConfig,
}

#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
    history_photo_window: usize,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S, history_photo_window: usize) -> Self {
        Self {
            store,
            history_photo_window,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load(&self) -> Snapshot {
        let items = self.load_json(ACTIVE_ITEMS_KEY).unwrap_or_default();
        let history = self.load_json(HISTORY_KEY).unwrap_or_default();
        let limit = self
            .load_raw(BUDGET_LIMIT_KEY)
            .and_then(|raw| parse_limit(&raw))
            .unwrap_or_default();
        let location = self
            .load_raw(BUDGET_LOCATION_KEY)
            .map(|raw| raw.trim().to_string())
            .filter(|location| !location.is_empty());

        Snapshot {
            items,
            history,
            budget: BudgetConfig { limit, location },
        }
    }

    pub fn save_items(&mut self, items: &[ConsumptionItem]) -> SaveOutcome {
        match self.write_json(ACTIVE_ITEMS_KEY, &items) {
            Ok(()) => SaveOutcome::Saved,
            Err(err) => dropped(ACTIVE_ITEMS_KEY, &err),
        }
    }

    pub fn save_history(&mut self, sessions: &[ConsumptionSession]) -> SaveOutcome {
        let err = match self.write_json(HISTORY_KEY, &sessions) {
            Ok(()) => return SaveOutcome::Saved,
            Err(err) if err.is_quota() => err,
            Err(err) => return dropped(HISTORY_KEY, &err),
        };

        let window = self.history_photo_window;
        tracing::warn!("{err}; retrying without photos past the {window} most recent sessions");
        let reduced = strip_old_photos(sessions, window);
        let stripped = sessions.len().saturating_sub(window);
        match self.write_json(HISTORY_KEY, &reduced) {
            Ok(()) => SaveOutcome::Degraded { stripped },
            Err(err) => dropped(HISTORY_KEY, &err),
        }
    }

    /// Writes the location, then the limit. `Dropped` means the limit did not
    /// reach the store.
    pub fn save_budget(&mut self, budget: &BudgetConfig) -> SaveOutcome {
        let location = match &budget.location {
            Some(location) => self.store.set(BUDGET_LOCATION_KEY, location),
            None => self.store.remove(BUDGET_LOCATION_KEY),
        };
        if let Err(err) = location {
            return dropped(BUDGET_LOCATION_KEY, &err);
        }
        let limit = budget.limit.to_major().to_string();
        match self.store.set(BUDGET_LIMIT_KEY, &limit) {
            Ok(()) => SaveOutcome::Saved,
            Err(err) => dropped(BUDGET_LIMIT_KEY, &err),
        }
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("failed to read \"{key}\": {err}");
                None
            }
        }
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("discarding unreadable \"{key}\": {err}");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)?;
        self.store.set(key, &payload)?;
        tracing::debug!("saved \"{key}\" ({} bytes)", payload.len());
        Ok(())
    }
}

fn dropped(key: &str, err: &StoreError) -> SaveOutcome {
    tracing::warn!("could not save \"{key}\", keeping it in memory only: {err}");
    SaveOutcome::Dropped
}

fn parse_limit(raw: &str) -> Option<Money> {
    let value: f64 = raw.trim().parse().ok()?;
    match Money::from_major(value) {
        Ok(limit) if !limit.is_negative() => Some(limit),
        _ => {
            tracing::warn!("discarding invalid budget limit \"{raw}\"");
            None
        }
    }
}

/// Copy of `sessions` where every session at index `window` or later has no
/// item photos. Every other field is left untouched.
pub fn strip_old_photos(sessions: &[ConsumptionSession], window: usize) -> Vec<ConsumptionSession> {
    sessions
        .iter()
        .enumerate()
        .map(|(index, session)| {
            if index < window {
                session.clone()
            } else {
                session.without_photos()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn empty_store_loads_defaults() {
        let persistence = Persistence::new(MemoryStore::new(), DEFAULT_HISTORY_PHOTO_WINDOW);
        assert_eq!(persistence.load(), Snapshot::default());
    }

    #[test]
    fn corrupted_key_does_not_block_others() {
        let mut store = MemoryStore::new();
        store.set(ACTIVE_ITEMS_KEY, "{not json").unwrap();
        store.set(HISTORY_KEY, "[]").unwrap();
        store.set(BUDGET_LIMIT_KEY, "300").unwrap();
        store.set(BUDGET_LOCATION_KEY, "Bar do Zé").unwrap();

        let snapshot = Persistence::new(store, DEFAULT_HISTORY_PHOTO_WINDOW).load();

        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.budget.limit, Money::new(30000));
        assert_eq!(snapshot.budget.location.as_deref(), Some("Bar do Zé"));
    }

    #[test]
    fn invalid_limits_fall_back_to_zero() {
        for raw in ["abc", "-5", "NaN", ""] {
            let mut store = MemoryStore::new();
            store.set(BUDGET_LIMIT_KEY, raw).unwrap();
            let snapshot = Persistence::new(store, DEFAULT_HISTORY_PHOTO_WINDOW).load();
            assert_eq!(snapshot.budget.limit, Money::ZERO, "limit {raw:?}");
        }
    }

    #[test]
    fn budget_is_written_as_plain_text() {
        let mut persistence = Persistence::new(MemoryStore::new(), DEFAULT_HISTORY_PHOTO_WINDOW);
        let budget = BudgetConfig {
            limit: Money::new(1250),
            location: Some("Boteco".to_string()),
        };

        assert_eq!(persistence.save_budget(&budget), SaveOutcome::Saved);
        assert_eq!(
            persistence.store().get(BUDGET_LIMIT_KEY).unwrap().as_deref(),
            Some("12.5")
        );
        assert_eq!(
            persistence.store().get(BUDGET_LOCATION_KEY).unwrap().as_deref(),
            Some("Boteco")
        );

        persistence.save_budget(&BudgetConfig::default());
        assert_eq!(
            persistence.store().get(BUDGET_LIMIT_KEY).unwrap().as_deref(),
            Some("0")
        );
        assert_eq!(persistence.store().get(BUDGET_LOCATION_KEY).unwrap(), None);
    }

    #[test]
    fn budget_not_fitting_writes_nothing() {
        let limit_only = BUDGET_LIMIT_KEY.len() + "12.5".len();
        let mut persistence = Persistence::new(
            MemoryStore::with_capacity(limit_only),
            DEFAULT_HISTORY_PHOTO_WINDOW,
        );
        let budget = BudgetConfig {
            limit: Money::new(1250),
            location: Some("Boteco do Largo da Batata".to_string()),
        };

        assert_eq!(persistence.save_budget(&budget), SaveOutcome::Dropped);
        assert_eq!(persistence.store().get(BUDGET_LIMIT_KEY).unwrap(), None);
        assert_eq!(persistence.store().get(BUDGET_LOCATION_KEY).unwrap(), None);

        let budget = BudgetConfig {
            location: None,
            ..budget
        };
        assert_eq!(persistence.save_budget(&budget), SaveOutcome::Saved);
        assert_eq!(
            persistence.store().get(BUDGET_LIMIT_KEY).unwrap().as_deref(),
            Some("12.5")
        );
    }

    #[test]
    fn items_over_quota_are_dropped() {
        let mut persistence =
            Persistence::new(MemoryStore::with_capacity(8), DEFAULT_HISTORY_PHOTO_WINDOW);
        let items = vec![ConsumptionItem::new("Beer".to_string(), Money::new(1000), None)];

        assert_eq!(persistence.save_items(&items), SaveOutcome::Dropped);
        assert_eq!(persistence.store().get(ACTIVE_ITEMS_KEY).unwrap(), None);
    }
}
