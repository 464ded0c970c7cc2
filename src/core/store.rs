//! Document storage used by every handler.
//!
//! Documents are JSON values addressed by string keys, the same model as the
//! Spin key/value store. Besides plain get/set/delete, the trait offers two
//! primitives the handlers rely on for their invariants:
//!
//! - [`DocumentStore::insert_new`] writes only when the key is absent, which is
//!   how the `username:` and `email:` unique indexes are reserved.
//! - [`DocumentStore::update_json`] runs a read-modify-write on one document,
//!   used by the like toggle and post edits. It is a single unit on
//!   [`MemoryStore`], and never writes when the document is left unchanged.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use spin_sdk::key_value::Store;

pub trait DocumentStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;

    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Stores `value` under `key` unless the key is already taken.
    /// Returns `false` (and writes nothing) when it was.
    fn insert_new<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool>;

    /// Loads the document at `key` (if any), hands it to `f`, then persists any
    /// change: a modified `Some` is written back, `None` deletes the key.
    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Option<T>) -> R;
}

/// What an update closure did to its document.
pub(crate) enum Change {
    Unchanged,
    Set(Vec<u8>),
    Delete,
}

/// Runs `f` over `doc` and reports the write it calls for. A document that
/// serializes the same before and after is left alone, so rejected edits and
/// misses never write back a stale copy.
pub(crate) fn run_update<T, R, F>(mut doc: Option<T>, f: F) -> anyhow::Result<(R, Change)>
where
    T: Serialize,
    F: FnOnce(&mut Option<T>) -> R,
{
    let before = doc.as_ref().map(serde_json::to_vec).transpose()?;
    let result = f(&mut doc);
    let after = doc.as_ref().map(serde_json::to_vec).transpose()?;

    let change = match after {
        after if after == before => Change::Unchanged,
        Some(bytes) => Change::Set(bytes),
        None => Change::Delete,
    };
    Ok((result, change))
}

/// Spin key/value backend.
///
/// The Spin key/value API has no compare-and-swap, so the compound primitives
/// are get-then-set here. Concurrent instances can still interleave two
/// writing updates of one key; updates that change nothing never write.
impl DocumentStore for Store {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        Ok(Store::get_json(self, key)?)
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        Ok(Store::set_json(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(Store::delete(self, key)?)
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(Store::exists(self, key)?)
    }

    fn insert_new<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool> {
        if Store::exists(self, key)? {
            return Ok(false);
        }
        Store::set_json(self, key, value)?;
        Ok(true)
    }

    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Option<T>) -> R,
    {
        let doc: Option<T> = Store::get_json(self, key)?;
        let (result, change) = run_update(doc, f)?;
        match change {
            Change::Unchanged => {}
            Change::Set(bytes) => Store::set(self, key, &bytes)?,
            Change::Delete => Store::delete(self, key)?,
        }
        Ok(result)
    }
}

/// In-process backend for the native server and tests.
///
/// Values are kept as serialized JSON so both backends see identical
/// encode/decode behaviour. Each primitive holds the lock for its whole
/// duration.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

fn decode<T: DeserializeOwned>(raw: Option<&Vec<u8>>) -> anyhow::Result<Option<T>> {
    raw.map(|bytes| serde_json::from_slice(bytes))
        .transpose()
        .map_err(Into::into)
}

impl DocumentStore for MemoryStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let entries = self.lock()?;
        decode(entries.get(key))
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.lock()?.insert(key.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    fn insert_new<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.lock()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), bytes);
        Ok(true)
    }

    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Option<T>) -> R,
    {
        let mut entries = self.lock()?;
        let doc: Option<T> = decode(entries.get(key))?;
        let (result, change) = run_update(doc, f)?;
        match change {
            Change::Unchanged => {}
            Change::Set(bytes) => {
                entries.insert(key.to_string(), bytes);
            }
            Change::Delete => {
                entries.remove(key);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get_json::<String>("k").unwrap(), None);

        store.set_json("k", &"v".to_string()).unwrap();
        assert_eq!(store.get_json::<String>("k").unwrap().as_deref(), Some("v"));
        assert!(store.exists("k").unwrap());

        store.delete("k").unwrap();
        assert!(!store.exists("k").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn insert_new_refuses_taken_keys() {
        let store = MemoryStore::new();
        assert!(store.insert_new("email:a@x.com", &"first").unwrap());
        assert!(!store.insert_new("email:a@x.com", &"second").unwrap());
        assert_eq!(
            store.get_json::<String>("email:a@x.com").unwrap().as_deref(),
            Some("first")
        );
    }

    #[test]
    fn update_creates_modifies_and_deletes() {
        let store = MemoryStore::new();

        store
            .update_json("list", |list: &mut Option<Vec<u32>>| {
                list.get_or_insert_with(Vec::new).push(1)
            })
            .unwrap();
        let len = store
            .update_json("list", |list: &mut Option<Vec<u32>>| {
                let list = list.get_or_insert_with(Vec::new);
                list.push(2);
                list.len()
            })
            .unwrap();
        assert_eq!(len, 2);
        assert_eq!(store.get_json::<Vec<u32>>("list").unwrap(), Some(vec![1, 2]));

        store
            .update_json("list", |list: &mut Option<Vec<u32>>| *list = None)
            .unwrap();
        assert!(!store.exists("list").unwrap());
    }

    #[test]
    fn unchanged_documents_are_not_written_back() {
        let (seen, change) = run_update(Some(vec![1u32, 2]), |list| list.as_ref().map(Vec::len)).unwrap();
        assert_eq!(seen, Some(2));
        assert!(matches!(change, Change::Unchanged));

        let (_, change) = run_update(None::<Vec<u32>>, |_| ()).unwrap();
        assert!(matches!(change, Change::Unchanged));

        let (_, change) = run_update(Some(vec![1u32]), |list| {
            if let Some(list) = list {
                list.push(2);
            }
        })
        .unwrap();
        assert!(matches!(change, Change::Set(bytes) if bytes == b"[1,2]"));

        let (_, change) = run_update(Some(vec![1u32]), |list| *list = None).unwrap();
        assert!(matches!(change, Change::Delete));
    }

    #[test]
    fn failed_lookups_leave_the_store_untouched() {
        let store = MemoryStore::new();
        let found = store
            .update_json("missing", |doc: &mut Option<String>| doc.is_some())
            .unwrap();
        assert!(!found);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .update_json("counter", |n: &mut Option<u64>| {
                                *n = Some(n.unwrap_or(0) + 1)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_json::<u64>("counter").unwrap(), Some(400));
    }
}
