//! Sinks and stores that streams commonly talk to: UI property binders and a
//! persistent key/value cache.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{scheduler::Scheduler, util::LockExt, CacheError};

/// A setter that receives values on a fixed scheduler.
///
/// Stands in for a UI property: `bind_to` delivers every value of a stream to
/// the setter in order, always on the binder's scheduler.
pub struct Binder<T> {
    setter: Arc<dyn Fn(T) + Send + Sync>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T> Clone for Binder<T> {
    fn clone(&self) -> Self {
        Binder {
            setter: Arc::clone(&self.setter),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<T: Send + 'static> Binder<T> {
    /// Creates a binder that runs `setter` on `scheduler`.
    pub fn new<S: Scheduler>(scheduler: S, setter: impl Fn(T) + Send + Sync + 'static) -> Self {
        Binder {
            setter: Arc::new(setter),
            scheduler: Arc::new(scheduler),
        }
    }

    /// Schedules the setter with `v`.
    pub fn on_next(&self, v: T) {
        let setter = Arc::clone(&self.setter);
        self.scheduler.schedule(Box::new(move || setter(v)));
    }
}

/// Byte oriented persistent store keyed by string.
pub trait KeyValueCache: Send + Sync {
    /// Returns the stored bytes, or `None` if `key` was never written.
    ///
    /// # Errors
    ///
    /// Fails on invalid keys and storage failures.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Fails on invalid keys and storage failures.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Deletes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Fails on invalid keys and storage failures.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_owned()))
    }
}

/// In-process cache, mostly for tests.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        validate_key(key)?;
        Ok(self.entries.locked().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        validate_key(key)?;
        self.entries.locked().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        validate_key(key)?;
        self.entries.locked().remove(key);
        Ok(())
    }
}

/// Stores one file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the target, so readers
/// never observe a partially written value.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Uses `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(FileCache { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        key: key.to_owned(),
        source,
    }
}

impl KeyValueCache for FileCache {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let target = self.path(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value).map_err(io_error(key))?;
        fs::rename(&tmp, &target).map_err(io_error(key))?;
        tracing::trace!(key, bytes = value.len(), "cache entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ImmediateScheduler;

    fn exercise(cache: &dyn KeyValueCache) {
        assert_eq!(cache.read("events.json").unwrap(), None);
        cache.write("events.json", b"[1,2]").unwrap();
        assert_eq!(cache.read("events.json").unwrap(), Some(b"[1,2]".to_vec()));
        cache.write("events.json", b"[3]").unwrap();
        assert_eq!(cache.read("events.json").unwrap(), Some(b"[3]".to_vec()));
        cache.remove("events.json").unwrap();
        cache.remove("events.json").unwrap();
        assert_eq!(cache.read("events.json").unwrap(), None);
    }

    #[test]
    fn memory_cache_round_trip() {
        exercise(&MemoryCache::new());
    }

    #[test]
    fn file_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("rxcore-cache-{}", std::process::id()));
        let cache = FileCache::new(&dir).unwrap();
        exercise(&cache);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_path_like_keys() {
        let cache = MemoryCache::new();
        for key in ["", "..", "a/b", "x\\y"] {
            assert!(matches!(
                cache.write(key, b"v"),
                Err(CacheError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn binder_runs_setter_on_its_scheduler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = Arc::clone(&seen);
        let binder = Binder::new(ImmediateScheduler, move |v: String| {
            seen_c.lock().unwrap().push(v)
        });

        binder.on_next("a".to_owned());
        binder.clone().on_next("b".to_owned());

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}
