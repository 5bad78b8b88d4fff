//! Directory-backed key-value store of JSON blobs.
//!
//! Each key is one file, `<data_dir>/<key>.json`. This mirrors browser local storage: values
//! are whole documents, read and rewritten wholesale, with no indexing.
//!
//! Writes go to a temporary sibling file which is then renamed over the target, so readers
//! never observe a half-written document. Writers within one process are serialised by a
//! store-wide lock; [`LocalStore::update`] holds it across the read-modify-write.

use crate::constants::STORE_FILE_EXTENSION;
use crate::validation::validate_store_key;
use crate::{RxError, RxResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug)]
pub struct LocalStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    /// Opens the store rooted at `dir`, creating the directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RxError::StorageDirCreation` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> RxResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(RxError::StorageDirCreation)?;

        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> RxResult<PathBuf> {
        validate_store_key(key)?;
        Ok(self.dir.join(format!("{key}.{STORE_FILE_EXTENSION}")))
    }

    fn lock(&self) -> RxResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| RxError::StoreLockPoisoned)
    }

    /// Reads the value stored under `key`.
    ///
    /// A missing key is `Ok(None)`. A present entry that does not parse as `T` is an error,
    /// not a silent default.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> RxResult<Option<T>> {
        let path = self.path_for(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RxError::FileRead(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| RxError::Deserialization {
                key: key.to_string(),
                source,
            })
    }

    /// Reads the value stored under `key`, falling back to `T::default()` when absent.
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> RxResult<T> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    /// Replaces the value stored under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> RxResult<()> {
        let _guard = self.lock()?;
        self.write_unlocked(key, value)
    }

    /// Deletes `key`. Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> RxResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RxError::FileWrite(e)),
        }
    }

    /// Read-modify-write of `key` under the store lock.
    ///
    /// `f` receives the current value (or `T::default()`). The value is written back only when
    /// `f` returns `Ok`; an error leaves the stored document untouched.
    pub fn update<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> RxResult<R>) -> RxResult<R>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let _guard = self.lock()?;
        let mut value: T = self.get_or_default(key)?;
        let out = f(&mut value)?;
        self.write_unlocked(key, &value)?;
        Ok(out)
    }

    fn write_unlocked<T: Serialize>(&self, key: &str, value: &T) -> RxResult<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(value).map_err(|source| {
            RxError::Serialization {
                key: key.to_string(),
                source,
            }
        })?;

        let tmp = path.with_extension(format!("{STORE_FILE_EXTENSION}.tmp"));
        fs::write(&tmp, json).map_err(RxError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(RxError::FileWrite)?;

        tracing::debug!(key, "store entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, LocalStore) {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        (temp, store)
    }

    #[test]
    fn missing_key_reads_as_none_or_default() {
        let (_temp, store) = open_temp();

        assert_eq!(store.get::<Vec<String>>("users").unwrap(), None);
        assert!(store.get_or_default::<Vec<String>>("users").unwrap().is_empty());
        assert!(store
            .get_or_default::<BTreeMap<String, Vec<String>>>("reminderTimes")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn set_then_get_and_remove() {
        let (temp, store) = open_temp();

        store.set("users", &vec!["a".to_string()]).unwrap();
        assert!(temp.path().join("users.json").is_file());
        assert_eq!(
            store.get::<Vec<String>>("users").unwrap(),
            Some(vec!["a".to_string()])
        );

        store.remove("users").unwrap();
        assert_eq!(store.get::<Vec<String>>("users").unwrap(), None);
        store.remove("users").expect("removing twice is fine");
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let (temp, store) = open_temp();
        fs::write(temp.path().join("prescriptions.json"), "{not json").unwrap();

        let err = store.get::<Vec<String>>("prescriptions").unwrap_err();
        assert!(matches!(err, RxError::Deserialization { ref key, .. } if key == "prescriptions"));
    }

    #[test]
    fn update_writes_only_on_success() {
        let (_temp, store) = open_temp();

        store
            .update::<Vec<u32>, _>("counts", |v| {
                v.push(1);
                Ok(())
            })
            .unwrap();

        let err = store
            .update::<Vec<u32>, ()>("counts", |v| {
                v.push(2);
                Err(RxError::InvalidInput("nope".into()))
            })
            .unwrap_err();
        assert!(matches!(err, RxError::InvalidInput(_)));

        assert_eq!(store.get::<Vec<u32>>("counts").unwrap(), Some(vec![1]));
    }

    #[test]
    fn rejects_unsafe_keys() {
        let (_temp, store) = open_temp();
        assert!(matches!(
            store.set("../escape", &1),
            Err(RxError::InvalidStoreKey(_))
        ));
        assert!(matches!(
            store.get::<u32>("a/b"),
            Err(RxError::InvalidStoreKey(_))
        ));
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() {
        let (_temp, store) = open_temp();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update::<u32, _>("counter", |n| {
                                *n += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get::<u32>("counter").unwrap(), Some(200));
    }
}
