//! Exchange-rate cache keyed by `(pair, date)`, optionally backed by a JSON file.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Days, NaiveDate, Utc};
use log::{debug, error, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::RateError;
use super::provider::CurrencyPair;

/// One cached rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCacheEntry {
    pub pair: CurrencyPair,
    /// Requested date; part of the key.
    pub date: NaiveDate,
    pub rate: Decimal,
    /// Date the source reported for the rate.
    pub rate_date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
}

type Key = (CurrencyPair, NaiveDate);

/// Shared rate cache.
///
/// Readers get a consistent snapshot; concurrent writers for the same key
/// are last-writer-wins. With a backing file every insert rewrites it
/// through a temporary file and a rename, so a crash never leaves a
/// half-written cache behind.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: RwLock<HashMap<Key, RateCacheEntry>>,
    path: Option<PathBuf>,
    persist: Mutex<()>,
}

impl RateCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed cache. A missing file starts empty; an unreadable
    /// or corrupt one is logged and ignored.
    ///
    /// # Errors
    ///
    /// [`RateError::Cache`] when the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RateError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<Vec<RateCacheEntry>>(&json) {
                Ok(list) => list,
                Err(e) => {
                    error!("ignoring corrupt rate cache {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(e) if e.kind() == IoErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(RateError::Cache(format!("cannot read {}: {e}", path.display())));
            }
        };
        debug!("loaded {} cached rates from {}", entries.len(), path.display());

        let map = entries
            .into_iter()
            .map(|e| ((e.pair.clone(), e.date), e))
            .collect();
        Ok(Self {
            entries: RwLock::new(map),
            path: Some(path),
            persist: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, pair: &CurrencyPair, date: NaiveDate) -> Option<RateCacheEntry> {
        self.read().get(&(pair.clone(), date)).cloned()
    }

    /// Most recent entry for `pair` whose date lies in
    /// `[date − window_days, date]`, regardless of when it was fetched.
    pub fn latest_in_window(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
        window_days: u64,
    ) -> Option<RateCacheEntry> {
        let earliest = date.checked_sub_days(Days::new(window_days))?;
        self.read()
            .values()
            .filter(|e| &e.pair == pair && (earliest..=date).contains(&e.date))
            .max_by_key(|e| (e.date, e.fetched_at))
            .cloned()
    }

    /// Store `entry` and, for a file-backed cache, persist.
    ///
    /// The in-memory entry is kept even when persisting fails.
    ///
    /// # Errors
    ///
    /// [`RateError::Cache`] when the backing file cannot be written.
    pub fn insert(&self, entry: RateCacheEntry) -> Result<(), RateError> {
        {
            let mut entries = self.write();
            entries.insert((entry.pair.clone(), entry.date), entry);
        }
        self.save()
    }

    /// Drop entries whose date is before `older_than`. Returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// [`RateError::Cache`] when the backing file cannot be written.
    pub fn prune(&self, older_than: NaiveDate) -> Result<usize, RateError> {
        let removed = {
            let mut entries = self.write();
            let before = entries.len();
            entries.retain(|(_, date), _| *date >= older_than);
            before - entries.len()
        };
        if removed > 0 {
            debug!("pruned {removed} cached rates older than {older_than}");
            self.save()?;
        }
        Ok(removed)
    }

    /// Snapshot of all entries, ordered by pair and date.
    pub fn entries(&self) -> Vec<RateCacheEntry> {
        let mut list: Vec<RateCacheEntry> = self.read().values().cloned().collect();
        list.sort_by(|a, b| (&a.pair, a.date).cmp(&(&b.pair, b.date)));
        list
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Key, RateCacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Key, RateCacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self) -> Result<(), RateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // one writer at a time; the snapshot is taken under this lock so the
        // last rename always carries the newest state
        let _guard = self.persist.lock().unwrap_or_else(PoisonError::into_inner);
        let json = serde_json::to_string_pretty(&self.entries())
            .map_err(|e| RateError::Cache(format!("cannot serialize cache: {e}")))?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| RateError::Cache(format!("cannot create {}: {e}", dir.display())))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| RateError::Cache(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path).map_err(|e| {
            warn!("leaving temporary cache file {}", tmp.display());
            RateError::Cache(format!("cannot replace {}: {e}", path.display()))
        })
    }
}
