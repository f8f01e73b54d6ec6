use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tracing::{debug, warn};

use super::CachedData;
use crate::api::{ApiError, ApiResponse};
use crate::models::{AttendanceRecord, MonthKey};

/// Records of one month, shared between the cache and its readers.
pub type MonthRecords = Arc<Vec<AttendanceRecord>>;

/// Per-month state. `gate` is held for the whole fetch and remembers the
/// last failure together with the attempt number that produced it.
#[derive(Debug, Default)]
struct Slot {
    data: OnceCell<CachedData<MonthRecords>>,
    failed_attempts: AtomicU64,
    gate: AsyncMutex<Option<(u64, anyhow::Error)>>,
}

/// Copy of a fetch error for callers that waited on the same attempt.
/// Rejections keep their type so callers can still match on them.
fn share_failure(err: &anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Rejected { code, msg }) => ApiError::Rejected {
            code: code.clone(),
            msg: msg.clone(),
        }
        .into(),
        _ => anyhow!("{:#}", err),
    }
}

/// Attendance records by month. Entries are written once and only dropped
/// by [`MonthCache::clear`].
#[derive(Debug, Default)]
pub struct MonthCache {
    entries: Mutex<HashMap<MonthKey, Arc<Slot>>>,
}

impl MonthCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: MonthKey) -> Arc<Slot> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_default().clone()
    }

    fn filled(&self, key: &MonthKey) -> Option<CachedData<MonthRecords>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).and_then(|slot| slot.data.get().cloned())
    }

    /// Return the records for `key`, calling `fetcher` only when the month
    /// has not been loaded yet.
    ///
    /// Concurrent calls for the same month share a single fetch, whatever its
    /// outcome. A response with `ok == false` is returned as
    /// `ApiError::Rejected` to every waiter and leaves the month absent, so
    /// the next call made after the failure fetches again.
    pub async fn get_month<F, Fut>(&self, key: MonthKey, fetcher: F) -> Result<MonthRecords>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let slot = self.slot(key);
        if let Some(hit) = slot.data.get() {
            debug!(month = %key, "Month cache hit");
            return Ok(hit.data.clone());
        }

        let seen = slot.failed_attempts.load(Ordering::Acquire);
        let mut last_failure = slot.gate.lock().await;

        if let Some(hit) = slot.data.get() {
            debug!(month = %key, "Month loaded while waiting");
            return Ok(hit.data.clone());
        }
        if let Some((attempt, ref err)) = *last_failure {
            if attempt > seen {
                debug!(month = %key, "Month fetch failed while waiting");
                return Err(share_failure(err));
            }
        }

        debug!(month = %key, "Month cache miss, fetching");
        match Self::fetch(key, fetcher).await {
            Ok(records) => {
                let entry = CachedData::new(records.clone());
                // Only the gate holder writes, so the cell is still empty
                let _ = slot.data.set(entry);
                *last_failure = None;
                Ok(records)
            }
            Err(e) => {
                let attempt = slot.failed_attempts.fetch_add(1, Ordering::AcqRel) + 1;
                *last_failure = Some((attempt, share_failure(&e)));
                Err(e)
            }
        }
    }

    async fn fetch<F, Fut>(key: MonthKey, fetcher: F) -> Result<MonthRecords>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let response = fetcher().await?;
        if !response.ok {
            warn!(month = %key, code = ?response.code, msg = ?response.msg, "Month fetch rejected, not caching");
            return Err(response.rejection().into());
        }
        let records = response.data_as::<Vec<AttendanceRecord>>()?.unwrap_or_default();
        debug!(month = %key, count = records.len(), "Caching month records");
        Ok(Arc::new(records))
    }

    /// Peek without fetching
    pub fn get(&self, key: &MonthKey) -> Option<MonthRecords> {
        self.filled(key).map(|c| c.data)
    }

    pub fn age_display(&self, key: &MonthKey) -> Option<String> {
        self.filled(key).map(|c| c.age_display())
    }

    pub fn contains(&self, key: &MonthKey) -> bool {
        self.filled(key).is_some()
    }

    /// Number of loaded months
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|slot| slot.data.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every month
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        debug!(months = entries.len(), "Clearing month cache");
        entries.clear();
    }
}
