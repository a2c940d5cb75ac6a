//! Load-once cache for read-only resources

use crate::error::Result;
use std::sync::{Arc, RwLock};

/// Holds a resource after its first successful load. Failed loads are not
/// cached, so a later call retries.
#[derive(Debug)]
pub struct LazyLoad<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Default for LazyLoad<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyLoad<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Cached value, if loaded
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }

    /// Return the cached value or run `load` under the write lock
    pub fn get_or_try_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have loaded it while we waited
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(load()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_loads_once() {
        let cache = LazyLoad::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };

        assert_eq!(*cache.get_or_try_load(load).unwrap(), 7);
        assert_eq!(*cache.get_or_try_load(load).unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache: LazyLoad<u32> = LazyLoad::new();
        let err = cache
            .get_or_try_load(|| Err(AdvisorError::EmptyDataset("none".to_string())))
            .unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyDataset(_)));
        assert!(!cache.is_loaded());

        assert_eq!(*cache.get_or_try_load(|| Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(LazyLoad::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    *cache
                        .get_or_try_load(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(42u64)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
