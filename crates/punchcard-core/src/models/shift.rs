use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResponse};

/// Length of the upcoming-shift window, in days after today.
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Minutes before or after a shift start beyond which a punch is flagged.
pub const PUNCH_TOLERANCE_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftInfo {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "shiftType", default)]
    pub shift_type: String,
    #[serde(rename = "startTime", default)]
    pub start_time: String,
    #[serde(rename = "endTime", default)]
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl ShiftInfo {
    pub fn time_span(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }

    pub fn start(&self) -> Option<NaiveTime> {
        parse_hhmm(&self.start_time)
    }
}

/// Today's shift state.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftSnapshot {
    NoShift,
    Shift(ShiftInfo),
}

impl ShiftSnapshot {
    /// Read a successful `getEmployeeShiftForDate` response.
    pub fn from_response(response: &ApiResponse) -> Result<Self, ApiError> {
        if !response.flag("hasShift") {
            return Ok(ShiftSnapshot::NoShift);
        }
        Ok(match response.data_as::<ShiftInfo>()? {
            Some(info) => ShiftSnapshot::Shift(info),
            None => ShiftSnapshot::NoShift,
        })
    }

    pub fn shift(&self) -> Option<&ShiftInfo> {
        match self {
            ShiftSnapshot::Shift(info) => Some(info),
            ShiftSnapshot::NoShift => None,
        }
    }
}

/// Inclusive date range of a shift listing; the week cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShiftRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ShiftRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Today through today + 7 days.
    pub fn upcoming_week(today: NaiveDate) -> Self {
        Self::new(today, today + Duration::days(WEEK_WINDOW_DAYS))
    }

    /// JSON `filters` parameter of `getShifts`
    pub fn filters_json(&self, employee_id: &str) -> String {
        serde_json::json!({
            "employeeId": employee_id,
            "startDate": self.start.format("%Y-%m-%d").to_string(),
            "endDate": self.end.format("%Y-%m-%d").to_string(),
        })
        .to_string()
    }
}

/// Outcome of a shift listing, kept whole so failures can be cached too.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekSchedule {
    pub ok: bool,
    pub shifts: Vec<ShiftInfo>,
    pub msg: Option<String>,
}

impl WeekSchedule {
    pub fn from_response(response: &ApiResponse) -> Result<Self, ApiError> {
        let shifts = if response.ok {
            response.data_as::<Vec<ShiftInfo>>()?.unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(Self {
            ok: response.ok,
            shifts,
            msg: response.msg.clone().or_else(|| response.code.clone()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchTiming {
    Early,
    OnTime,
    Late,
}

impl PunchTiming {
    /// Compare a punch time with the scheduled start.
    pub fn evaluate(now: NaiveTime, shift_start: NaiveTime) -> Self {
        let diff = minutes_between(now, shift_start);
        if diff < -PUNCH_TOLERANCE_MINUTES {
            PunchTiming::Early
        } else if diff > PUNCH_TOLERANCE_MINUTES {
            PunchTiming::Late
        } else {
            PunchTiming::OnTime
        }
    }

    pub fn warning_key(&self) -> Option<&'static str> {
        match self {
            PunchTiming::Early => Some("EARLY_PUNCH_WARNING"),
            PunchTiming::Late => Some("LATE_PUNCH_WARNING"),
            PunchTiming::OnTime => None,
        }
    }
}

/// Signed minutes from `b` to `a`; positive when `a` is later.
pub fn minutes_between(a: NaiveTime, b: NaiveTime) -> i64 {
    (a - b).num_minutes()
}

pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .ok()
}
