//! Two-tier per-date result cache.
//!
//! Memory entries expire after the memory TTL; durable entries live in
//! `<dir>/<dd-mm-yyyy>.json` and expire based on file modification time.
//! The current calendar day is never cached because its listing is still
//! growing.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::CacheEntry;
use crate::config::CacheConfig;
use crate::models::ScrapeResult;
use crate::services::calendar::{Calendar, ValidatedDate};

const INDEX_FILE: &str = "index.json";
const FILE_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Summary of one durable cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDate {
    /// `dd/mm/yyyy`
    pub date: String,
    pub total_awards: usize,
    pub total_value_crores: f64,
    pub stored_at: DateTime<Utc>,
}

pub struct ResultCache {
    dir: PathBuf,
    memory: RwLock<HashMap<String, CacheEntry<Arc<ScrapeResult>>>>,
    /// Serializes read-modify-write of the date index.
    index_lock: Mutex<()>,
    memory_ttl: Duration,
    durable_ttl: Duration,
    calendar: Calendar,
}

impl ResultCache {
    pub fn new(config: &CacheConfig, calendar: Calendar) -> Self {
        Self {
            dir: config.dir.clone(),
            memory: RwLock::new(HashMap::new()),
            index_lock: Mutex::new(()),
            memory_ttl: Duration::from_secs(config.memory_ttl_minutes * 60),
            durable_ttl: Duration::from_secs(config.durable_ttl_minutes * 60),
            calendar,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, date: &ValidatedDate) -> PathBuf {
        self.dir
            .join(format!("{}.json", date.date.format(FILE_DATE_FORMAT)))
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
        move |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Look up a finished result, memory first.
    pub fn get(&self, date: &ValidatedDate) -> Option<Arc<ScrapeResult>> {
        if self.calendar.is_today(&date.display) {
            return None;
        }

        if let Some(hit) = self
            .memory
            .read()
            .ok()
            .and_then(|guard| guard.get(&date.display).and_then(|e| e.get()))
        {
            debug!("Memory cache hit for {}", date.display);
            return Some(hit);
        }

        let result = Arc::new(self.load_durable(date)?);
        debug!("Disk cache hit for {}", date.display);
        self.remember(&date.display, Arc::clone(&result));
        Some(result)
    }

    fn load_durable(&self, date: &ValidatedDate) -> Option<ScrapeResult> {
        let path = self.entry_path(date);
        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()?
            .elapsed()
            .unwrap_or_default();
        if age > self.durable_ttl {
            debug!("Disk cache entry for {} expired", date.display);
            return None;
        }

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn remember(&self, key: &str, result: Arc<ScrapeResult>) {
        if let Ok(mut guard) = self.memory.write() {
            guard.insert(key.to_string(), CacheEntry::new(result, self.memory_ttl));
            guard.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Store a successful result in both tiers.
    ///
    /// Returns `Ok(false)` when the result is not cacheable (the current
    /// day, or an unsuccessful result).
    pub fn put(&self, date: &ValidatedDate, result: &ScrapeResult) -> Result<bool, CacheError> {
        if self.calendar.is_today(&date.display) || !result.success {
            return Ok(false);
        }

        self.remember(&date.display, Arc::new(result.clone()));

        fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;
        let path = self.entry_path(date);
        self.write_atomic(&path, &serde_json::to_vec_pretty(result)?)?;
        self.update_index(date, result)?;
        debug!("Cached {} awards for {}", result.total_awards, date.display);
        Ok(true)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(Self::io_err(&self.dir))?;
        tmp.write_all(bytes).map_err(Self::io_err(path))?;
        tmp.persist(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn read_index(&self) -> BTreeMap<String, CachedDate> {
        let path = self.dir.join(INDEX_FILE);
        fs::read(&path)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .unwrap_or_default()
    }

    fn update_index(&self, date: &ValidatedDate, result: &ScrapeResult) -> Result<(), CacheError> {
        let _guard = self.index_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut index = self.read_index();
        index.insert(
            date.date.to_string(),
            CachedDate {
                date: date.display.clone(),
                total_awards: result.total_awards,
                total_value_crores: result.total_value_crores,
                stored_at: Utc::now(),
            },
        );
        let path = self.dir.join(INDEX_FILE);
        self.write_atomic(&path, &serde_json::to_vec_pretty(&index)?)
    }

    /// Durable entries, newest date first.
    pub fn list(&self) -> Vec<CachedDate> {
        self.read_index().into_values().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarConfig;
    use crate::models::{AnnouncementCandidate, NOT_PARSED, NO_SUMMARY};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn calendar() -> Calendar {
        Calendar::new(&CalendarConfig::default())
            .with_today(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap())
    }

    fn cache_in(dir: &Path) -> ResultCache {
        let config = CacheConfig {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        ResultCache::new(&config, calendar())
    }

    fn result_for(date: &ValidatedDate) -> ScrapeResult {
        let order = AnnouncementCandidate {
            page: 1,
            announcement_num: 1,
            company: "Acme".to_string(),
            raw_company: "ACME".to_string(),
            title: "Award of Order".to_string(),
            summary: NO_SUMMARY.to_string(),
            pdf_link: "https://www.bseindia.com/a.pdf".to_string(),
            order_values: Vec::new(),
            total_value_crores: 12.5,
            pdf_extract: NOT_PARSED.to_string(),
        };
        ScrapeResult::finalize(date.display.clone(), vec![order], 40)
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let date = calendar().validate("2024-03-15").unwrap();
        let result = result_for(&date);

        assert!(cache_in(dir.path()).put(&date, &result).unwrap());
        assert!(dir.path().join("15-03-2024.json").exists());

        // A fresh instance has an empty memory tier.
        let cached = cache_in(dir.path()).get(&date).unwrap();
        assert_eq!(*cached, result);
    }

    #[test]
    fn test_today_is_never_cached() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(dir.path());
        let today = calendar().validate("2024-03-20").unwrap();

        assert!(!cache.put(&today, &result_for(&today)).unwrap());
        assert!(cache.get(&today).is_none());
        assert!(!dir.path().join("20-03-2024.json").exists());
    }

    #[test]
    fn test_today_entry_on_disk_is_ignored() {
        let dir = TempDir::new().unwrap();
        let today = calendar().validate("2024-03-20").unwrap();
        let earlier = Calendar::new(&CalendarConfig::default())
            .with_today(NaiveDate::from_ymd_opt(2024, 3, 21).unwrap());
        let writer = ResultCache::new(
            &CacheConfig {
                dir: dir.path().to_path_buf(),
                ..Default::default()
            },
            earlier,
        );
        assert!(writer.put(&today, &result_for(&today)).unwrap());

        assert!(cache_in(dir.path()).get(&today).is_none());
    }

    #[test]
    fn test_expired_disk_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig {
            dir: dir.path().to_path_buf(),
            memory_ttl_minutes: 0,
            durable_ttl_minutes: 0,
        };
        let cache = ResultCache::new(&config, calendar());
        let date = calendar().validate("2024-03-15").unwrap();
        cache.put(&date, &result_for(&date)).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(&date).is_none());
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("15-03-2024.json"), b"{not json").unwrap();
        let date = calendar().validate("2024-03-15").unwrap();
        assert!(cache_in(dir.path()).get(&date).is_none());
    }

    #[test]
    fn test_unsuccessful_results_are_skipped() {
        let dir = TempDir::new().unwrap();
        let date = calendar().validate("2024-03-15").unwrap();
        let mut result = result_for(&date);
        result.success = false;
        assert!(!cache_in(dir.path()).put(&date, &result).unwrap());
    }

    #[test]
    fn test_index_lists_newest_first() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(dir.path());
        for day in ["2024-03-01", "2024-03-15", "2024-02-10"] {
            let date = calendar().validate(day).unwrap();
            cache.put(&date, &result_for(&date)).unwrap();
        }
        let dates: Vec<String> = cache.list().into_iter().map(|c| c.date).collect();
        assert_eq!(dates, vec!["15/03/2024", "01/03/2024", "10/02/2024"]);
    }

    #[test]
    fn test_concurrent_puts_keep_every_date_in_index() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(cache_in(dir.path()));

        let handles: Vec<_> = (1..=16)
            .map(|day| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let date = calendar().validate(&format!("2024-03-{:02}", day)).unwrap();
                    cache.put(&date, &result_for(&date)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.list().len(), 16);
        assert_eq!(cache_in(dir.path()).list().len(), 16);
    }

    #[test]
    fn test_failed_disk_write_still_fills_memory() {
        let dir = TempDir::new().unwrap();
        // A plain file where the cache directory should be.
        let blocked = dir.path().join("cache");
        fs::write(&blocked, b"").unwrap();
        let cache = cache_in(&blocked);
        let date = calendar().validate("2024-03-15").unwrap();
        let result = result_for(&date);

        assert!(cache.put(&date, &result).is_err());
        assert_eq!(*cache.get(&date).unwrap(), result);
    }
}
