//! Generic record storage used by the fleet domain features.
//!
//! Records live under a string key as an ordered JSON array, each record
//! carrying a unique `id`. The access-control core does not use this module.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::RwLock};
use thiserror::Error;
use tracing::warn;

/// Keys for the fleet domain collections.
pub mod keys {
    pub const VEHICLES: &str = "vehicles";
    pub const DRIVERS: &str = "drivers";
    pub const BILLING_PARTIES: &str = "billingParties";
    pub const TRANSPORTERS: &str = "transporters";
    pub const EXPENSE_CATEGORIES: &str = "expenseCategories";
    pub const PAYMENT_MODES: &str = "paymentModes";
    pub const STOCK_ITEMS: &str = "stockItems";
    pub const TRIPS: &str = "trips";
    pub const TRIP_BOOKS: &str = "tripBooks";
    pub const DRIVER_ADVANCES: &str = "driverAdvances";
    pub const EXPENSES: &str = "expenses";
    pub const RETURN_TRIPS: &str = "returnTrips";
    pub const PARTY_PAYMENTS: &str = "partyPayments";
    pub const MARKET_VEH_PAYMENTS: &str = "marketVehPayments";
    pub const STOCK_ENTRIES: &str = "stockEntries";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("record update must be a JSON object")]
    InvalidUpdate,
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A stored record, identified by a unique `id`.
pub trait Record {
    fn id(&self) -> &str;
}

/// Key/value backend holding one serialized collection per key. The CRUD
/// operations are provided on top of `load` and `save`.
pub trait RecordStore {
    /// Raw serialized collection for `key`, if any.
    ///
    /// # Errors
    /// Backend failures.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the serialized collection for `key`.
    ///
    /// # Errors
    /// Backend failures.
    fn save(&self, key: &str, raw: String) -> Result<(), StoreError>;

    /// All records under `key`. Missing or unreadable data reads as empty.
    ///
    /// # Errors
    /// Backend failures.
    fn get_items<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let Some(raw) = self.load(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(key, "Ignoring unreadable collection: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// # Errors
    /// Serialization or backend failures.
    fn set_items<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        self.save(key, serde_json::to_string(items)?)
    }

    /// Append `item` and return the updated collection.
    ///
    /// # Errors
    /// Serialization or backend failures.
    fn add_item<T>(&self, key: &str, item: T) -> Result<Vec<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        let mut items: Vec<T> = self.get_items(key)?;
        items.push(item);
        self.set_items(key, &items)?;
        Ok(items)
    }

    /// Merge the fields of `updates` into the record with `id`. An unknown id
    /// leaves the collection untouched.
    ///
    /// # Errors
    /// `InvalidUpdate` if `updates` is not an object, or when the merged
    /// record no longer deserializes as `T`.
    fn update_item<T>(&self, key: &str, id: &str, updates: &Value) -> Result<Vec<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        let Value::Object(fields) = updates else {
            return Err(StoreError::InvalidUpdate);
        };

        let mut items: Vec<T> = self.get_items(key)?;
        let Some(index) = items.iter().position(|item| item.id() == id) else {
            return Ok(items);
        };

        let mut merged = serde_json::to_value(&items[index])?;
        if let Value::Object(record) = &mut merged {
            for (name, value) in fields {
                record.insert(name.clone(), value.clone());
            }
        }
        items[index] = serde_json::from_value(merged)?;

        self.set_items(key, &items)?;
        Ok(items)
    }

    /// Remove the record with `id` and return what is left.
    ///
    /// # Errors
    /// Serialization or backend failures.
    fn delete_item<T>(&self, key: &str, id: &str) -> Result<Vec<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        let mut items: Vec<T> = self.get_items(key)?;
        items.retain(|item| item.id() != id);
        self.set_items(key, &items)?;
        Ok(items)
    }

    /// # Errors
    /// Backend failures.
    fn get_item_by_id<T>(&self, key: &str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: Record + DeserializeOwned,
    {
        let items: Vec<T> = self.get_items(key)?;
        Ok(items.into_iter().find(|item| item.id() == id))
    }
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections.get(key).cloned())
    }

    fn save(&self, key: &str, raw: String) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        collections.insert(key.to_string(), raw);
        Ok(())
    }
}
