//! The module contains the `ConsumptionItem` type, one thing ordered during an
//! outing, and the `ItemDraft` used while the item is being written.
use core::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Photo, ResultEngine};

/// A consumed item.
///
/// Serialized with the camelCase shape persisted records have always used;
/// `timestamp` is milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

impl ConsumptionItem {
    pub(crate) fn new(name: String, price: Money, photo: Option<Photo>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            price,
            timestamp: now(),
            photo,
        }
    }
}

impl fmt::Display for ConsumptionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.price)
    }
}

/// Current time at the precision records are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Validate a name/price pair before it touches the ledger.
pub(crate) fn validate_fields(name: &str, price: Money) -> ResultEngine<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation(
            "item name must not be empty".to_string(),
        ));
    }
    if price.is_negative() {
        return Err(EngineError::Validation(format!(
            "price must be >= 0, got {price}"
        )));
    }
    if price > Money::MAX {
        return Err(EngineError::Validation(format!(
            "price must be <= {}, got {price}",
            Money::MAX
        )));
    }
    Ok(name.to_string())
}

/// The in-progress add/edit form.
///
/// The price is kept as raw text until the draft is committed. A captured
/// photo lives here until then and is dropped with the draft if the form is
/// abandoned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub price: String,
    photo: Option<Photo>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            photo: None,
        }
    }

    /// Pre-fill a draft to edit an existing item.
    pub fn from_item(item: &ConsumptionItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price.to_string(),
            photo: item.photo.clone(),
        }
    }

    pub fn attach_photo(&mut self, photo: Photo) {
        self.photo = Some(photo);
    }

    pub fn clear_photo(&mut self) {
        self.photo = None;
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    /// Parse the draft into the fields a ledger operation takes.
    pub fn parse(&self) -> ResultEngine<(String, Money, Option<Photo>)> {
        let price: Money = self.price.parse()?;
        let name = validate_fields(&self.name, price)?;
        Ok((name, price, self.photo.clone()))
    }
}
