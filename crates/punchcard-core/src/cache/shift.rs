use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::CachedData;
use crate::api::ApiResponse;
use crate::models::{ShiftRange, ShiftSnapshot, WeekSchedule};

/// Seconds a week listing is trusted after capture.
pub const WEEK_FRESHNESS_SECS: i64 = 60;

/// Whether an entry captured at `captured_at` may still be served at `now`.
pub fn is_fresh(now: DateTime<Utc>, captured_at: DateTime<Utc>) -> bool {
    now - captured_at < Duration::seconds(WEEK_FRESHNESS_SECS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Fresh,
    Stale,
}

type WeekEntry = CachedData<(ShiftRange, Arc<WeekSchedule>)>;

/// Today's shift and the upcoming week for the signed-in employee.
///
/// Policies differ on purpose. Today's slot only keeps successful answers
/// and lives until [`ShiftCache::clear`]. The week slot keeps whatever the
/// server answered, failures included, for [`WEEK_FRESHNESS_SECS`].
#[derive(Debug, Default)]
pub struct ShiftCache {
    today: Mutex<Option<CachedData<ShiftSnapshot>>>,
    week: Mutex<Option<WeekEntry>>,
}

impl ShiftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Today's shift, fetched at most once until cleared.
    ///
    /// A rejected response is returned as an error and not kept.
    pub async fn get_today_shift<F, Fut>(&self, fetcher: F) -> Result<ShiftSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let mut slot = self.today.lock().await;
        if let Some(ref cached) = *slot {
            debug!("Today shift cache hit");
            return Ok(cached.data.clone());
        }

        let response = fetcher().await?;
        let response = response.into_success()?;
        let snapshot = ShiftSnapshot::from_response(&response)?;
        debug!(has_shift = snapshot.shift().is_some(), "Caching today shift");
        *slot = Some(CachedData::new(snapshot.clone()));
        Ok(snapshot)
    }

    pub async fn get_week_shift<F, Fut>(&self, range: ShiftRange, fetcher: F) -> Result<Arc<WeekSchedule>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        self.get_week_shift_at(range, Utc::now(), fetcher).await
    }

    /// Week listing for `range` as of `now`.
    ///
    /// The cached listing is reused only for the same range within the
    /// freshness window; otherwise it is dropped and `fetcher` runs. Any
    /// decoded answer is stored, including `ok == false`. Transport errors
    /// leave the slot empty.
    pub async fn get_week_shift_at<F, Fut>(
        &self,
        range: ShiftRange,
        now: DateTime<Utc>,
        fetcher: F,
    ) -> Result<Arc<WeekSchedule>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let mut slot = self.week.lock().await;
        if let Some(ref cached) = *slot {
            let (cached_range, ref schedule) = cached.data;
            if cached_range == range && is_fresh(now, cached.cached_at) {
                debug!(start = %range.start, end = %range.end, "Week shift cache hit");
                return Ok(schedule.clone());
            }
        }

        debug!(start = %range.start, end = %range.end, "Week shift cache stale or empty, fetching");
        *slot = None;
        let response = fetcher().await?;
        let schedule = Arc::new(WeekSchedule::from_response(&response)?);
        *slot = Some(CachedData::captured_at((range, schedule.clone()), now));
        Ok(schedule)
    }

    pub async fn week_state_at(&self, range: ShiftRange, now: DateTime<Utc>) -> EntryState {
        match *self.week.lock().await {
            None => EntryState::Empty,
            Some(ref cached) if cached.data.0 == range && is_fresh(now, cached.cached_at) => EntryState::Fresh,
            Some(_) => EntryState::Stale,
        }
    }

    pub async fn has_today(&self) -> bool {
        self.today.lock().await.is_some()
    }

    /// Forget both slots so the next reads fetch current shift state.
    pub async fn clear(&self) {
        debug!("Clearing shift caches");
        *self.today.lock().await = None;
        *self.week.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    use crate::api::ApiError;

    fn range(start_day: u32) -> ShiftRange {
        let start = NaiveDate::from_ymd_opt(2025, 6, start_day).unwrap();
        ShiftRange::upcoming_week(start)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn week_response() -> ApiResponse {
        ApiResponse::from_value(json!({
            "ok": true,
            "data": [
                {"date": "2025-06-02", "shiftType": "Morning", "startTime": "09:00", "endTime": "17:00"},
                {"date": "2025-06-03", "shiftType": "Night", "startTime": "21:00", "endTime": "05:00"}
            ]
        }))
    }

    fn today_response() -> ApiResponse {
        ApiResponse::from_value(json!({
            "success": true,
            "hasShift": true,
            "data": {"shiftType": "Morning", "startTime": "09:00", "endTime": "17:00", "location": "HQ"}
        }))
    }

    #[test]
    fn test_is_fresh_boundary() {
        let t = t0();
        assert!(is_fresh(t + Duration::seconds(59), t));
        assert!(!is_fresh(t + Duration::seconds(60), t));
        assert!(!is_fresh(t + Duration::seconds(61), t));
    }

    #[tokio::test]
    async fn test_week_reused_within_window_and_refetched_after() {
        let cache = ShiftCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(week_response())
        };

        let first = cache.get_week_shift_at(range(1), t0(), fetch).await.unwrap();
        assert_eq!(first.shifts.len(), 2);

        let at_59 = cache
            .get_week_shift_at(range(1), t0() + Duration::seconds(59), fetch)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &at_59));

        let at_61 = cache
            .get_week_shift_at(range(1), t0() + Duration::seconds(61), fetch)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &at_61));
    }

    #[tokio::test]
    async fn test_week_range_change_forces_refetch() {
        let cache = ShiftCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(week_response())
        };

        cache.get_week_shift_at(range(1), t0(), fetch).await.unwrap();
        cache
            .get_week_shift_at(range(2), t0() + Duration::seconds(1), fetch)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.week_state_at(range(1), t0() + Duration::seconds(2)).await, EntryState::Stale);
        assert_eq!(cache.week_state_at(range(2), t0() + Duration::seconds(2)).await, EntryState::Fresh);
    }

    #[tokio::test]
    async fn test_week_state_machine() {
        let cache = ShiftCache::new();
        assert_eq!(cache.week_state_at(range(1), t0()).await, EntryState::Empty);
        cache
            .get_week_shift_at(range(1), t0(), || async { Ok(week_response()) })
            .await
            .unwrap();
        assert_eq!(cache.week_state_at(range(1), t0()).await, EntryState::Fresh);
        let later = t0() + Duration::seconds(90);
        assert_eq!(cache.week_state_at(range(1), later).await, EntryState::Stale);
        cache
            .get_week_shift_at(range(1), later, || async { Ok(week_response()) })
            .await
            .unwrap();
        assert_eq!(cache.week_state_at(range(1), later).await, EntryState::Fresh);
    }

    /// Unlike the month cache, a failed week listing is served from cache
    /// for the rest of the freshness window.
    #[tokio::test]
    async fn test_week_failure_is_cached_unlike_month_cache() {
        let cache = ShiftCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::from_value(json!({"ok": false, "msg": "quota"})))
        };

        let first = cache.get_week_shift_at(range(1), t0(), fetch).await.unwrap();
        assert!(!first.ok);
        let again = cache
            .get_week_shift_at(range(1), t0() + Duration::seconds(30), fetch)
            .await
            .unwrap();
        assert!(!again.ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_week_transport_error_leaves_slot_empty() {
        let cache = ShiftCache::new();
        let result = cache
            .get_week_shift_at(range(1), t0(), || async { Err(ApiError::RateLimited.into()) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.week_state_at(range(1), t0()).await, EntryState::Empty);
    }

    #[tokio::test]
    async fn test_today_cached_until_cleared() {
        let cache = ShiftCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(today_response())
        };

        let snap = cache.get_today_shift(fetch).await.unwrap();
        assert_eq!(snap.shift().map(|s| s.shift_type.as_str()), Some("Morning"));
        cache.get_today_shift(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.clear().await;
        assert!(!cache.has_today().await);
        cache.get_today_shift(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_today_no_shift_is_cached() {
        let cache = ShiftCache::new();
        let snap = cache
            .get_today_shift(|| async { Ok(ApiResponse::from_value(json!({"ok": true, "hasShift": false}))) })
            .await
            .unwrap();
        assert_eq!(snap, ShiftSnapshot::NoShift);
        assert!(cache.has_today().await);
    }

    #[tokio::test]
    async fn test_today_rejection_is_not_cached() {
        let cache = ShiftCache::new();
        let err = cache
            .get_today_shift(|| async { Ok(ApiResponse::from_value(json!({"ok": false, "code": "ERR_SHEET"}))) })
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Rejected { .. })));
        assert!(!cache.has_today().await);
    }
}
