//! In-memory caches for one session.
//!
//! - `MonthCache`: attendance records per `YYYY-MM`, filled on first
//!   successful fetch and kept for the whole session
//! - `ShiftCache`: today's shift (single slot) and the upcoming week, the
//!   latter trusted for 60 seconds
//!
//! Both are owned by the session context and shared by reference. Concurrent
//! requests for the same entry share one fetch.

pub mod month;
pub mod shift;

use chrono::{DateTime, Duration, Utc};

pub use month::MonthCache;
pub use shift::{is_fresh, ShiftCache, WEEK_FRESHNESS_SECS};

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self::captured_at(data, Utc::now())
    }

    pub fn captured_at(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }

    pub fn age_display(&self) -> String {
        let seconds = self.age_at(Utc::now()).num_seconds();
        if seconds < 60 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }
}
