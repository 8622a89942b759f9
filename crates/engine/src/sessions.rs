//! The module contains the closed-out tab (`ConsumptionSession`), the
//! `History` of past tabs and the finalizer turning a ledger into a session.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Ledger, Money, ResultEngine,
    items::{ConsumptionItem, now},
};

/// Service charge added when the tip is included, in percent.
pub const TIP_PERCENT: i64 = 10;

/// A closed tab. Created once by [`finalize`] and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionSession {
    pub id: String,
    pub items: Vec<ConsumptionItem>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub total: Money,
    pub split_count: u32,
    pub has_tip: bool,
    pub tip_amount: Money,
    pub total_per_person: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ConsumptionSession {
    /// Total plus service charge.
    pub fn grand_total(&self) -> Money {
        self.total + self.tip_amount
    }

    /// Copy of the session without item photos.
    pub(crate) fn without_photos(&self) -> Self {
        let mut session = self.clone();
        for item in &mut session.items {
            item.photo = None;
        }
        session
    }
}

/// Stored representation. Fields added after the first release are optional
/// so older records keep loading.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: String,
    #[serde(default)]
    items: Vec<ConsumptionItem>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    date: DateTime<Utc>,
    total: Money,
    #[serde(default = "default_split_count")]
    split_count: i64,
    #[serde(default)]
    has_tip: bool,
    #[serde(default)]
    tip_amount: Money,
    #[serde(default)]
    total_per_person: Option<Money>,
    #[serde(default)]
    location: Option<String>,
}

fn default_split_count() -> i64 {
    1
}

impl From<SessionRecord> for ConsumptionSession {
    fn from(record: SessionRecord) -> Self {
        let split_count = record.split_count.clamp(1, i64::from(u32::MAX)) as u32;
        let total_per_person = record.total_per_person.unwrap_or_else(|| {
            (record.total + record.tip_amount)
                .split(split_count)
                .unwrap_or(record.total)
        });
        Self {
            id: record.id,
            items: record.items,
            date: record.date,
            total: record.total,
            split_count,
            has_tip: record.has_tip,
            tip_amount: record.tip_amount,
            total_per_person,
            location: record.location,
        }
    }
}

impl<'de> Deserialize<'de> for ConsumptionSession {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SessionRecord::deserialize(deserializer).map(Into::into)
    }
}

/// Close the ledger into a session.
///
/// Pure computation over its inputs: the ledger is only read. Clearing it and
/// recording the session in the history is up to the caller.
pub fn finalize(
    ledger: &Ledger,
    split_count: u32,
    include_tip: bool,
    location: Option<&str>,
) -> ResultEngine<ConsumptionSession> {
    if split_count < 1 {
        return Err(EngineError::Validation(
            "split count must be at least 1".to_string(),
        ));
    }

    let total = ledger.total();
    let tip_amount = if include_tip {
        total.percent(TIP_PERCENT)
    } else {
        Money::ZERO
    };
    let total_per_person = total
        .checked_add(tip_amount)
        .ok_or_else(|| EngineError::Validation(format!("tab total {total} is too large")))?
        .split(split_count)
        .ok_or_else(|| EngineError::Validation("split count must be at least 1".to_string()))?;

    Ok(ConsumptionSession {
        id: Uuid::new_v4().to_string(),
        items: ledger.items().to_vec(),
        date: now(),
        total,
        split_count,
        has_tip: include_tip,
        tip_amount,
        total_per_person,
        location: location.map(str::to_string),
    })
}

/// Closed sessions, most recent first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    sessions: Vec<ConsumptionSession>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_sessions(sessions: Vec<ConsumptionSession>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &[ConsumptionSession] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&ConsumptionSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub(crate) fn prepend(&mut self, session: ConsumptionSession) {
        self.sessions.insert(0, session);
    }

    pub(crate) fn clear(&mut self) {
        self.sessions.clear();
    }
}
