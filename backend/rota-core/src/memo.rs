// src/memo.rs
use sha2::{Digest, Sha256};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info};

use crate::models::{DriverId, ScheduleEntry};

pub const DEFAULT_CACHE_KEY_MAX_LEN: usize = 100;
/// Entries kept per table by [`MemoTable::new`]: only the latest input snapshot.
pub const DEFAULT_MEMO_CAPACITY: usize = 1;

// --- Composite Key Building ---

/// Builds a composite memo key from named parts.
///
/// Parts are joined in the order given; callers are responsible for sorting
/// anything whose order must not matter. Keys longer than `max_len` keep a
/// readable prefix and a SHA-256 suffix. `_` and `\` inside values are
/// escaped so a value can never read as the start of another part.
pub fn composite_key(parts: &[(&str, String)], max_len: usize) -> String {
    let mut key = String::new();
    for (name, value) in parts {
        key.push_str("__");
        key.push_str(name);
        key.push('_');
        key.push_str(&escape(value, &['_']));
    }

    if key.len() > max_len {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        let prefix_len = floor_char_boundary(&key, max_len / 2);
        key = format!("{}_{}", &key[..prefix_len], hex::encode(&hash[..16]));
    }
    key
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Backslash-escapes `\` and every char in `special`.
fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

const ID_SEPARATORS: [char; 2] = [',', '@'];

/// Sorted, comma-separated driver ids.
pub fn driver_ids_part<'a>(ids: impl IntoIterator<Item = &'a DriverId>) -> String {
    let mut ids: Vec<String> = ids
        .into_iter()
        .map(|id| escape(id, &ID_SEPARATORS))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(",")
}

/// Sorted `scheduleId@YYYY-MM-DD` pairs.
pub fn schedule_part(schedules: &[ScheduleEntry]) -> String {
    let mut pairs: Vec<String> = schedules
        .iter()
        .map(|s| {
            format!(
                "{}@{}",
                escape(&s.id, &ID_SEPARATORS),
                crate::dates::date_key(s.day)
            )
        })
        .collect();
    pairs.sort_unstable();
    pairs.join(",")
}

// --- Memo Table ---

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct MemoInner<V> {
    entries: HashMap<String, Arc<V>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    stats: MemoStats,
}

/// Shared memo table keyed by composite string keys.
///
/// Values are computed at most once per key. A changed key is a new entry and
/// the oldest entries are evicted once `capacity` is exceeded.
#[derive(Debug)]
pub struct MemoTable<V> {
    name: &'static str,
    capacity: usize,
    inner: Arc<Mutex<MemoInner<V>>>,
}

impl<V> Clone for MemoTable<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            capacity: self.capacity,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> MemoTable<V> {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_MEMO_CAPACITY)
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            inner: Arc::new(Mutex::new(MemoInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                stats: MemoStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoInner<V>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        {
            let mut guard = self.lock();
            if let Some(value) = guard.entries.get(key).cloned() {
                guard.stats.hits += 1;
                debug!("Memo HIT [{}]: {}", self.name, key);
                return value;
            }
        }

        debug!("Memo MISS [{}]: {}. Computing...", self.name, key);
        let computed = Arc::new(compute());

        let mut guard = self.lock();
        guard.stats.misses += 1;
        if let Some(existing) = guard.entries.get(key).cloned() {
            return existing;
        }
        guard.entries.insert(key.to_string(), Arc::clone(&computed));
        guard.order.push_back(key.to_string());
        while guard.order.len() > self.capacity {
            if let Some(oldest) = guard.order.pop_front() {
                guard.entries.remove(&oldest);
                debug!("Memo EVICTED [{}]: {}", self.name, oldest);
            }
        }
        computed
    }

    /// Fallible variant; errors are returned and never cached.
    pub fn try_get_or_compute<F, E>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let computed = compute()?;
        Ok(self.get_or_compute(key, || computed))
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        let mut guard = self.lock();
        let value = guard.entries.get(key).cloned();
        if value.is_some() {
            guard.stats.hits += 1;
            debug!("Memo HIT [{}]: {}", self.name, key);
        }
        value
    }

    pub fn invalidate(&self, key: &str) {
        let mut guard = self.lock();
        if guard.entries.remove(key).is_some() {
            guard.order.retain(|k| k != key);
            info!("Memo INVALIDATED [{}]: {}", self.name, key);
        }
    }

    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.entries.clear();
        guard.order.clear();
        info!("Memo CLEARED [{}]", self.name);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MemoStats {
        self.lock().stats
    }
}
