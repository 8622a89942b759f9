//! Consumption ledger and session lifecycle for a night out.
//!
//! The [`Tracker`] is the application state: the active [`Ledger`], the
//! [`History`] of closed tabs and the [`BudgetConfig`], backed by a
//! [`KeyValueStore`]. Every mutation goes through it and is persisted right
//! away, one key at a time, in call order.
use serde::{Deserialize, Serialize};

pub use budget::{BudgetConfig, BudgetStatus, BudgetTier, evaluate};
pub use capture::{
    Acquisition, CameraDevice, CaptureSession, CaptureState, CaptureStrategy,
    DeviceCameraStrategy, Facing, FrameSource, LiveStream, PhotoPicker, PickerStrategy,
    StaticPhotoStrategy, StrategyKind, StreamRequest,
};
pub use error::{CaptureError, EngineError, StoreError};
pub use items::{ConsumptionItem, ItemDraft};
pub use ledger::Ledger;
pub use money::Money;
pub use persistence::{
    ACTIVE_ITEMS_KEY, BUDGET_LIMIT_KEY, BUDGET_LOCATION_KEY, DEFAULT_HISTORY_PHOTO_WINDOW,
    HISTORY_KEY, Persistence, SaveOutcome, Snapshot, strip_old_photos,
};
pub use photo::{Photo, PhotoOptions};
pub use sessions::{ConsumptionSession, History, TIP_PERCENT, finalize};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

mod budget;
mod capture;
mod error;
mod items;
mod ledger;
mod money;
mod persistence;
pub mod photo;
mod sessions;
mod storage;

type ResultEngine<T> = Result<T, EngineError>;

/// Tunables for the engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Sessions keeping their photos when the history has to be shrunk.
    pub history_photo_window: usize,
    pub photo: PhotoOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_photo_window: DEFAULT_HISTORY_PHOTO_WINDOW,
            photo: PhotoOptions::default(),
        }
    }
}

/// Outcome of the latest save of each persisted slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub items: Option<SaveOutcome>,
    pub history: Option<SaveOutcome>,
    pub budget: Option<SaveOutcome>,
}

#[derive(Debug)]
pub struct Tracker<S> {
    ledger: Ledger,
    history: History,
    budget: BudgetConfig,
    options: EngineOptions,
    persistence: Persistence<S>,
    saves: SaveReport,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Boot from whatever the store holds. Unreadable keys start empty.
    pub fn init(store: S, options: EngineOptions) -> Self {
        let persistence = Persistence::new(store, options.history_photo_window);
        let snapshot = persistence.load();
        tracing::info!(
            "loaded {} active items, {} sessions, budget limit {}",
            snapshot.items.len(),
            snapshot.history.len(),
            snapshot.budget.limit
        );

        Self {
            ledger: Ledger::from_items(snapshot.items),
            history: History::from_sessions(snapshot.history),
            budget: snapshot.budget,
            options,
            persistence,
            saves: SaveReport::default(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn budget(&self) -> &BudgetConfig {
        &self.budget
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.persistence.store_mut()
    }

    /// What the latest saves since boot actually wrote.
    pub fn saves(&self) -> SaveReport {
        self.saves
    }

    pub fn budget_status(&self) -> BudgetStatus {
        evaluate(self.ledger.total(), self.budget.limit)
    }

    /// A capture session using the configured photo settings.
    pub fn capture_session(&self, strategies: Vec<Box<dyn CaptureStrategy>>) -> CaptureSession {
        CaptureSession::new(strategies, self.options.photo)
    }

    pub fn add_item(
        &mut self,
        name: &str,
        price: Money,
        photo: Option<Photo>,
    ) -> ResultEngine<ConsumptionItem> {
        let item = self.ledger.add_item(name, price, photo)?.clone();
        self.save_items();
        Ok(item)
    }

    pub fn edit_item(
        &mut self,
        id: &str,
        name: &str,
        price: Money,
        photo: Option<Photo>,
    ) -> ResultEngine<ConsumptionItem> {
        let item = self.ledger.edit_item(id, name, price, photo)?.clone();
        self.save_items();
        Ok(item)
    }

    pub fn duplicate_item(&mut self, id: &str) -> ResultEngine<ConsumptionItem> {
        let item = self.ledger.duplicate_item(id)?.clone();
        self.save_items();
        Ok(item)
    }

    /// Remove an item. Unknown ids are a no-op and nothing is written.
    pub fn remove_item(&mut self, id: &str) -> Option<ConsumptionItem> {
        let removed = self.ledger.remove_item(id)?;
        self.save_items();
        Some(removed)
    }

    /// Commit an add form.
    pub fn commit_new(&mut self, draft: ItemDraft) -> ResultEngine<ConsumptionItem> {
        let (name, price, photo) = draft.parse()?;
        self.add_item(&name, price, photo)
    }

    /// Commit an edit form for item `id`.
    pub fn commit_edit(&mut self, id: &str, draft: ItemDraft) -> ResultEngine<ConsumptionItem> {
        if self.ledger.item(id).is_none() {
            return Err(EngineError::NotFound(id.to_string()));
        }
        let (name, price, photo) = draft.parse()?;
        self.edit_item(id, &name, price, photo)
    }

    pub fn set_budget_limit(&mut self, limit: Money) -> ResultEngine<()> {
        if limit.is_negative() {
            return Err(EngineError::Validation(format!(
                "budget limit must be >= 0, got {limit}"
            )));
        }
        self.budget.limit = limit;
        self.save_budget();
        Ok(())
    }

    pub fn set_location(&mut self, location: Option<&str>) {
        self.budget.location = location
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .map(str::to_string);
        self.save_budget();
    }

    /// Close the tab: record a session, then start over with an empty ledger.
    pub fn finish_session(
        &mut self,
        split_count: u32,
        include_tip: bool,
    ) -> ResultEngine<&ConsumptionSession> {
        if self.ledger.is_empty() {
            return Err(EngineError::Validation(
                "cannot close an empty tab".to_string(),
            ));
        }
        let session = finalize(
            &self.ledger,
            split_count,
            include_tip,
            self.budget.location.as_deref(),
        )?;
        tracing::info!(
            "closed tab {}: {} items, total {}, tip {}, {} x {}",
            session.id,
            session.items.len(),
            session.total,
            session.tip_amount,
            session.split_count,
            session.total_per_person
        );

        self.history.prepend(session);
        self.ledger.clear();
        self.save_history();
        self.save_items();
        Ok(&self.history.sessions()[0])
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.save_history();
    }

    fn save_items(&mut self) {
        self.saves.items = Some(self.persistence.save_items(self.ledger.items()));
    }

    fn save_history(&mut self) {
        self.saves.history = Some(self.persistence.save_history(self.history.sessions()));
    }

    fn save_budget(&mut self) {
        self.saves.budget = Some(self.persistence.save_budget(&self.budget));
    }
}
