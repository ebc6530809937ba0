use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::compile::compiled::CompiledSequence;
use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::node::Node;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct CacheCell {
    compiled: Mutex<Option<Arc<CompiledSequence>>>,
}

/// Counters describing cache traffic since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from an installed compiled sequence.
    pub hits: u64,
    /// Lookups that had to build.
    pub misses: u64,
    /// Successful builds installed into the cache.
    pub builds: u64,
    /// Builds that failed; nothing was installed for them.
    pub failures: u64,
}

/// In-process cache of compiled sequences keyed by template identity.
///
/// Lifecycle is explicit: create one at process start, pass it to whatever renders, and drop
/// entries with [`StaticCache::invalidate`] or [`StaticCache::clear`]. Nothing is evicted
/// implicitly. Each key has its own build barrier: concurrent first requests for the same key
/// build once, the others wait and then share the result. Different keys build in parallel.
pub struct StaticCache<K> {
    entries: Mutex<HashMap<K, Arc<CacheCell>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
}

impl<K> Default for StaticCache<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }
}

impl<K> StaticCache<K> {
    /// Snapshot of the traffic counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl<K> fmt::Debug for StaticCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCache")
            .field("keys", &lock(&self.entries).len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<K> StaticCache<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &K) -> Arc<CacheCell> {
        let mut map = lock(&self.entries);
        Arc::clone(map.entry(key.clone()).or_default())
    }

    /// Return the compiled sequence for `key`, building it from `build()` on first use.
    ///
    /// A failed build (construction or compilation) installs nothing; the next call retries.
    pub fn get_or_build<F>(&self, key: K, build: F) -> SluiceResult<Arc<CompiledSequence>>
    where
        F: FnOnce() -> SluiceResult<Node>,
    {
        let cell = self.cell(&key);
        let mut slot = lock(&cell.compiled);
        if let Some(compiled) = slot.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(compiled));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let built = build().and_then(|node| CompiledSequence::build(&node));
        match built {
            Ok(compiled) => {
                let compiled = Arc::new(compiled);
                *slot = Some(Arc::clone(&compiled));
                self.builds.fetch_add(1, Ordering::Relaxed);
                debug!(?key, fingerprint = %compiled.fingerprint(), "installed compiled template");
                Ok(compiled)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(?key, error = %err, "template build failed, nothing cached");
                Err(err)
            }
        }
    }

    /// Installed compiled sequence for `key`, without building.
    pub fn get(&self, key: &K) -> Option<Arc<CompiledSequence>> {
        let cell = lock(&self.entries).get(key).cloned()?;
        let slot = lock(&cell.compiled);
        slot.clone()
    }

    /// Compile-once then replay against `ctx`.
    pub fn render<F>(
        &self,
        key: K,
        build: F,
        ctx: &RenderContext,
        out: &mut dyn Write,
    ) -> SluiceResult<()>
    where
        F: FnOnce() -> SluiceResult<Node>,
    {
        self.get_or_build(key, build)?.render(ctx, out)
    }

    /// Drop the entry for `key`. Returns `true` when something was cached.
    ///
    /// Sequences already handed out stay valid; they are reference counted.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = lock(&self.entries).remove(key);
        removed.is_some_and(|cell| lock(&cell.compiled).is_some())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Number of keys with an installed compiled sequence.
    pub fn len(&self) -> usize {
        let cells: Vec<Arc<CacheCell>> = lock(&self.entries).values().cloned().collect();
        cells
            .iter()
            .filter(|cell| lock(&cell.compiled).is_some())
            .count()
    }

    /// `true` when nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> StaticCache<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync,
{
    /// Build many templates up front on the rayon pool.
    ///
    /// Returns the keys whose build failed, with their errors. Successful builds are installed.
    pub fn prewarm<F>(&self, entries: Vec<(K, F)>) -> Vec<(K, SluiceError)>
    where
        F: FnOnce() -> SluiceResult<Node> + Send,
    {
        entries
            .into_par_iter()
            .filter_map(|(key, build)| {
                self.get_or_build(key.clone(), build)
                    .err()
                    .map(|err| (key, err))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/cache.rs"]
mod tests;
