use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use web_sys::window;

/// A durable string-keyed store.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str);
}

/// The browser's `window.localStorage`.
#[derive(Clone, Copy, Default, Debug)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        window()?.local_storage().ok()?
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let storage = Self::storage().ok_or_else(|| anyhow!("localStorage unavailable"))?;
        storage
            .set_item(key, value)
            .map_err(|e| anyhow!("localStorage rejected write: {:?}", e))
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-memory store shared between clones. Used off-browser and in tests.
#[derive(Clone, Default, Debug)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<Cell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every write while set, like a browser store over quota.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.read_only.get() {
            return Err(anyhow!("storage quota exceeded"));
        }
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// JSON layer over a [`KeyValueStore`]. Plain reads never fail: unparseable
/// data reads as absent. Writes are best effort and only logged on failure.
/// Read-modify-write updates never overwrite a value they could not parse.
#[derive(Clone, Debug)]
pub struct JsonStore<S> {
    store: S,
}

impl<S: KeyValueStore> JsonStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the key is absent, `Err` when it holds unparseable data.
    pub fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get_item(key) {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| anyhow!("unparseable value under {}: {}", key, e)),
        }
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        match self.load(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unparseable stored value");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to serialize value");
                return;
            }
        };
        if let Err(e) = self.store.set_item(key, &json) {
            tracing::error!(key, error = %e, "error saving to storage");
        }
    }

    pub fn remove(&self, key: &str) {
        self.store.remove_item(key);
    }

    pub fn get_vec<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Vec<T> {
        self.get(key).unwrap_or_default()
    }

    /// Loads the list under `key`, applies `f` and writes it back. A stored
    /// value that does not parse is left untouched and `false` is returned.
    pub fn update_vec<T, F>(&self, key: &str, f: F) -> bool
    where
        T: Serialize + for<'de> Deserialize<'de>,
        F: FnOnce(&mut Vec<T>),
    {
        let mut vec: Vec<T> = match self.load(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::error!(key, error = %e, "refusing to overwrite unparseable stored list");
                return false;
            }
        };
        f(&mut vec);
        self.set(key, &vec);
        true
    }

    pub fn push_vec<T: Serialize + for<'de> Deserialize<'de>>(&self, key: &str, item: T) -> bool {
        self.update_vec(key, |vec| vec.push(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_corrupted_values_read_as_absent() {
        let kv = MemoryStorage::new();
        let store = JsonStore::new(kv.clone());
        assert_eq!(store.get::<Vec<u32>>("k"), None);

        kv.set_item("k", "{not json").unwrap();
        assert_eq!(store.get::<Vec<u32>>("k"), None);
        assert!(store.get_vec::<u32>("k").is_empty());
    }

    #[test]
    fn set_get_remove() {
        let store = JsonStore::new(MemoryStorage::new());
        store.set("k", &vec![1, 2, 3]);
        assert_eq!(store.get_vec::<u32>("k"), vec![1, 2, 3]);
        assert!(store.push_vec("k", 4u32));
        assert_eq!(store.get_vec::<u32>("k"), vec![1, 2, 3, 4]);
        store.remove("k");
        assert_eq!(store.get::<Vec<u32>>("k"), None);
    }

    #[test]
    fn load_tells_absent_from_unparseable() {
        let kv = MemoryStorage::new();
        let store = JsonStore::new(kv.clone());
        assert!(matches!(store.load::<Vec<u32>>("k"), Ok(None)));

        kv.set_item("k", "[1,").unwrap();
        assert!(store.load::<Vec<u32>>("k").is_err());
    }

    #[test]
    fn updates_leave_unparseable_lists_untouched() {
        let kv = MemoryStorage::new();
        let store = JsonStore::new(kv.clone());
        kv.set_item("k", "[1,").unwrap();

        assert!(!store.push_vec("k", 2u32));
        assert!(!store.update_vec::<u32, _>("k", |v| v.clear()));
        assert_eq!(kv.get_item("k").as_deref(), Some("[1,"));

        assert!(store.push_vec("fresh", 7u32));
        assert_eq!(store.get_vec::<u32>("fresh"), vec![7]);
    }

    #[test]
    fn write_failures_are_swallowed() {
        let kv = MemoryStorage::new();
        let store = JsonStore::new(kv.clone());
        store.set("k", &1u32);

        kv.set_read_only(true);
        store.set("k", &2u32);
        assert_eq!(store.get::<u32>("k"), Some(1));
    }

    #[test]
    fn clones_share_contents() {
        let kv = MemoryStorage::new();
        let other = kv.clone();
        kv.set_item("a", "1").unwrap();
        assert_eq!(other.get_item("a").as_deref(), Some("1"));
    }
}
