//! Persistence store and the draft bridge on top of it
use crate::draft::Draft;
use crate::error::StoreError;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// String key-value storage that survives reloads.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// In-process store, for tests and hosts without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Store backed by a sled tree.
pub struct SledStore {
    instance: Arc<sled::Db>,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.instance.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|_| StoreError::NotUtf8(key.to_string())),
            None => Ok(None),
        }
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.instance.insert(key.as_bytes(), value.as_bytes())?;
        self.instance.flush()?;
        Ok(())
    }
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.instance.remove(key.as_bytes())?;
        self.instance.flush()?;
        Ok(())
    }
}

/// Key names of the three logical entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    pub draft: String,
    pub submitted: String,
    pub reference: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            draft: "msmeFormData".into(),
            submitted: "msmeFormSubmitted".into(),
            reference: "applicationNumber".into(),
        }
    }
}

const SUBMITTED: &str = "true";

/// Loads and saves the draft and tracks whether it has been submitted.
pub struct DraftStore<S> {
    store: S,
    keys: StoreKeys,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: S, keys: StoreKeys) -> Self {
        Self { store, keys }
    }

    /// The stored draft, or defaults when there is none or it is unreadable.
    pub fn load(&self) -> Draft {
        let blob = match self.store.get(&self.keys.draft) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Draft::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored draft, starting fresh");
                return Draft::default();
            }
        };
        match Draft::from_blob(&blob) {
            Ok(draft) => {
                tracing::debug!("restored draft from store");
                draft
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored draft is unreadable, starting fresh");
                Draft::default()
            }
        }
    }

    /// Stores the draft unless the application was already submitted.
    pub fn save(&self, draft: &Draft) -> Result<(), StoreError> {
        if self.is_submitted() {
            return Ok(());
        }
        let blob = draft
            .to_blob()
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.store.set(&self.keys.draft, &blob)
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.store.get(&self.keys.submitted), Ok(Some(flag)) if flag == SUBMITTED)
    }

    pub fn reference_id(&self) -> Option<String> {
        self.store.get(&self.keys.reference).ok().flatten()
    }

    pub fn mark_submitted(&self, reference_id: &str) -> Result<(), StoreError> {
        self.store.set(&self.keys.submitted, SUBMITTED)?;
        self.store.set(&self.keys.reference, reference_id)?;
        self.store.delete(&self.keys.draft)
    }

    /// Drops a submitted flag left behind without a completed submission.
    pub fn clear_submitted_flag(&self) -> Result<(), StoreError> {
        self.store.delete(&self.keys.submitted)
    }

    pub fn has_draft(&self) -> bool {
        matches!(self.store.get(&self.keys.draft), Ok(Some(_)))
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.delete(&self.keys.draft)?;
        self.store.delete(&self.keys.submitted)?;
        self.store.delete(&self.keys.reference)
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }
}
