//! Query Result Cache
//!
//! Wraps a [`NormalizedStore`] with per-query result lists that stay valid for
//! a TTL window. A query is identified by a canonical string built from its
//! parameters, so `{a:1,b:2}` and `{b:2,a:1}` hit the same entry.
//!
//! Policy is coarse on purpose: any successful mutation calls
//! [`CacheManager::invalidate_all`]. Nothing here returns an error; a miss just
//! means the caller fetches.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::entity::Entity;
use crate::store::NormalizedStore;

/// Key used when a query has no parameters
pub const ALL_KEY: &str = "all";

/// Default freshness window: 5 minutes
pub const DEFAULT_TTL_MS: i64 = 300_000;

pub fn default_ttl() -> TimeDelta {
    TimeDelta::milliseconds(DEFAULT_TTL_MS)
}

// ========================
// Clock
// ========================

/// Source of "now" for freshness checks
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

// ========================
// Keys & Freshness
// ========================

/// Canonical cache key for a parameter set
///
/// `None`, `null`, `{}` and objects whose fields are all null map to
/// [`ALL_KEY`]. Object keys are sorted at every depth before serializing.
pub fn key_for<P: Serialize + ?Sized>(params: Option<&P>) -> String {
    let Some(params) = params else {
        return ALL_KEY.to_string();
    };
    let value = match serde_json::to_value(params) {
        Ok(value) => canonicalize(value),
        // Unserializable params cannot be keyed; never share their results
        Err(err) => return format!("unkeyed:{}", err),
    };
    match &value {
        Value::Null => ALL_KEY.to_string(),
        Value::Object(map) if map.is_empty() => ALL_KEY.to_string(),
        _ => value.to_string(),
    }
}

/// Sort object keys recursively and drop null-valued fields
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// One cached query result
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<Id> {
    pub ids: Vec<Id>,
    pub fetched_at: DateTime<Utc>,
}

/// `now - fetched_at < ttl`
pub fn is_fresh<Id>(entry: &CacheEntry<Id>, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
    now - entry.fetched_at < ttl
}

// ========================
// Cache Manager
// ========================

/// Normalized store plus TTL-windowed query results
pub struct CacheManager<T: Entity> {
    store: NormalizedStore<T>,
    entries: HashMap<String, CacheEntry<T::Id>>,
    ttl: TimeDelta,
    clock: Rc<dyn Clock>,
}

impl<T: Entity> CacheManager<T> {
    pub fn new(ttl: TimeDelta, clock: Rc<dyn Clock>) -> Self {
        Self {
            store: NormalizedStore::new(),
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn with_system_clock(ttl: TimeDelta) -> Self {
        Self::new(ttl, Rc::new(SystemClock))
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn store(&self) -> &NormalizedStore<T> {
        &self.store
    }

    /// Direct store access for optimistic edits; callers invalidate after
    pub fn store_mut(&mut self) -> &mut NormalizedStore<T> {
        &mut self.store
    }

    /// Cached entities for `params` if fresh, `None` on a miss
    ///
    /// An entry naming an id the store no longer holds counts as a miss.
    pub fn read<P: Serialize + ?Sized>(&self, params: Option<&P>) -> Option<Vec<T>> {
        let key = key_for(params);
        let entry = self.entries.get(&key)?;

        if !is_fresh(entry, self.clock.now(), self.ttl) {
            debug!(key = %key, "cache entry stale");
            return None;
        }
        let hit = self.store.resolve(&entry.ids);
        if hit.is_none() {
            debug!(key = %key, "cache entry references evicted ids");
        }
        hit
    }

    /// Upsert `entities` and record them as the result for `params`
    pub fn write<P: Serialize + ?Sized>(&mut self, params: Option<&P>, entities: Vec<T>) -> Vec<T> {
        let key = key_for(params);
        let ids = entities.iter().map(Entity::id).collect();
        self.store.add_all(entities.iter().cloned());
        debug!(key = %key, count = entities.len(), "cache write");
        self.entries.insert(
            key,
            CacheEntry {
                ids,
                fetched_at: self.clock.now(),
            },
        );
        entities
    }

    pub fn entry<P: Serialize + ?Sized>(&self, params: Option<&P>) -> Option<&CacheEntry<T::Id>> {
        self.entries.get(&key_for(params))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Forget one query result
    pub fn invalidate<P: Serialize + ?Sized>(&mut self, params: Option<&P>) {
        self.entries.remove(&key_for(params));
    }

    /// Forget every query result; entities stay in the store
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "cache invalidated");
        }
        self.entries.clear();
    }

    /// Drop entities and query results
    pub fn clear(&mut self) {
        self.store.clear();
        self.entries.clear();
    }
}
