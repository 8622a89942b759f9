//! The module contains the `Ledger`, the ordered list of items consumed during
//! the current outing.
//!
//! New items are prepended, so the most recent is always first. The total is
//! recomputed on every call and never cached. A mutation that would take the
//! total past [`Money::MAX`] is rejected.
use uuid::Uuid;

use crate::{
    EngineError, Money, Photo, ResultEngine,
    items::{ConsumptionItem, now, validate_fields},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    items: Vec<ConsumptionItem>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_items(items: Vec<ConsumptionItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ConsumptionItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&ConsumptionItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all item prices.
    pub fn total(&self) -> Money {
        let cents: i128 = self
            .items
            .iter()
            .map(|item| i128::from(item.price.cents()))
            .sum();
        // Clamping only matters for a tampered store; mutations keep it within MAX.
        Money::new(cents.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    pub fn add_item(
        &mut self,
        name: &str,
        price: Money,
        photo: Option<Photo>,
    ) -> ResultEngine<&ConsumptionItem> {
        let name = validate_fields(name, price)?;
        self.ensure_total_fits(price, Money::ZERO)?;
        self.items
            .insert(0, ConsumptionItem::new(name, price, photo));
        tracing::debug!("added item {} ({price})", self.items[0].id);
        Ok(&self.items[0])
    }

    /// Replace name, price and photo of an item. Id and timestamp are kept.
    pub fn edit_item(
        &mut self,
        id: &str,
        name: &str,
        price: Money,
        photo: Option<Photo>,
    ) -> ResultEngine<&ConsumptionItem> {
        let index = self.position(id)?;
        let name = validate_fields(name, price)?;
        self.ensure_total_fits(price, self.items[index].price)?;
        let item = &mut self.items[index];
        item.name = name;
        item.price = price;
        item.photo = photo;
        tracing::debug!("edited item {id}");
        Ok(&self.items[index])
    }

    /// Copy an item under a fresh id and timestamp, placing the copy first.
    pub fn duplicate_item(&mut self, id: &str) -> ResultEngine<&ConsumptionItem> {
        let index = self.position(id)?;
        self.ensure_total_fits(self.items[index].price, Money::ZERO)?;
        let mut copy = self.items[index].clone();
        copy.id = Uuid::new_v4().to_string();
        copy.timestamp = now();
        self.items.insert(0, copy);
        tracing::debug!("duplicated item {id} as {}", self.items[0].id);
        Ok(&self.items[0])
    }

    /// Remove an item. Unknown ids are ignored; returns the removed item.
    pub fn remove_item(&mut self, id: &str) -> Option<ConsumptionItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        tracing::debug!("removed item {id}");
        Some(self.items.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    /// Check the total stays within [`Money::MAX`] once `replaced` gives way
    /// to `added`.
    fn ensure_total_fits(&self, added: Money, replaced: Money) -> ResultEngine<()> {
        let total = i128::from(self.total().cents()) - i128::from(replaced.cents())
            + i128::from(added.cents());
        if total > i128::from(Money::MAX.cents()) {
            return Err(EngineError::Validation(format!(
                "tab total cannot exceed {}",
                Money::MAX
            )));
        }
        Ok(())
    }

    fn position(&self, id: &str) -> ResultEngine<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }
}
