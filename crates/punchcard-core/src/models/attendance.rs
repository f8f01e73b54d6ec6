use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::api::ApiError;
use crate::utils::null_as_default;

// ============================================================================
// MonthKey
// ============================================================================

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ApiError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ApiError::InvalidMonthKey(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Validated in the constructors
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.next().first_day();
        (next - self.first_day()).num_days() as u32
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl FromStr for MonthKey {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ApiError::InvalidMonthKey(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Punches
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PunchType {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "out")]
    Out,
}

/// Records carry whatever label the sheet holds. Only `in`/`上班` reads as
/// a punch in; every other label, `null` included, is treated as a punch out.
impl<'de> Deserialize<'de> for PunchType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match label.trim() {
            "上班" => PunchType::In,
            l if l.eq_ignore_ascii_case("in") => PunchType::In,
            _ => PunchType::Out,
        })
    }
}

impl PunchType {
    /// Label the backend expects in the `type` parameter.
    pub fn wire_value(&self) -> &'static str {
        match self {
            PunchType::In => "上班",
            PunchType::Out => "下班",
        }
    }

    /// Localization key for display
    pub fn label_key(&self) -> &'static str {
        match self {
            PunchType::In => "PUNCH_IN",
            PunchType::Out => "PUNCH_OUT",
        }
    }

    /// Default time used when requesting an adjustment.
    pub fn default_adjust_time(&self) -> &'static str {
        match self {
            PunchType::In => "09:00:00",
            PunchType::Out => "18:00:00",
        }
    }
}

impl FromStr for PunchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "上班" => Ok(PunchType::In),
            "out" | "下班" => Ok(PunchType::Out),
            other => Err(format!("unknown punch type: {}", other)),
        }
    }
}

impl fmt::Display for PunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunchType::In => write!(f, "in"),
            PunchType::Out => write!(f, "out"),
        }
    }
}

fn default_punch_type() -> PunchType {
    PunchType::Out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchEvent {
    #[serde(rename = "type", default = "default_punch_type")]
    pub punch_type: PunchType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Reason codes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonCode {
    PunchNormal,
    PunchInMissing,
    PunchOutMissing,
    RepairPending,
    RepairApproved,
    RepairRejected,
    Other(String),
}

impl ReasonCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "STATUS_PUNCH_NORMAL" => ReasonCode::PunchNormal,
            "STATUS_PUNCH_IN_MISSING" => ReasonCode::PunchInMissing,
            "STATUS_PUNCH_OUT_MISSING" => ReasonCode::PunchOutMissing,
            "STATUS_REPAIR_PENDING" => ReasonCode::RepairPending,
            "STATUS_REPAIR_APPROVED" => ReasonCode::RepairApproved,
            "STATUS_REPAIR_REJECTED" => ReasonCode::RepairRejected,
            other => ReasonCode::Other(other.to_string()),
        }
    }

    /// Whether the employee may file an adjustment for this day.
    pub fn needs_adjustment(&self) -> bool {
        matches!(
            self,
            ReasonCode::PunchInMissing | ReasonCode::PunchOutMissing | ReasonCode::RepairRejected
        )
    }
}

// ============================================================================
// AttendanceRecord
// ============================================================================

/// One work day of punches plus the backend's verdict on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub record: Vec<PunchEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    /// Adjustment label such as "punch in under review"; abnormal listings only.
    #[serde(rename = "punchTypes", default, skip_serializing_if = "Option::is_none")]
    pub punch_types: Option<String>,
}

impl AttendanceRecord {
    pub fn reason_code(&self) -> ReasonCode {
        ReasonCode::parse(&self.reason)
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.get(..10).unwrap_or(&self.date), "%Y-%m-%d").ok()
    }

    /// Punch type an adjustment for this record should carry.
    /// Rejected repairs reuse the direction named in `punch_types`.
    pub fn adjustment_type(&self) -> Option<PunchType> {
        match self.reason_code() {
            ReasonCode::PunchInMissing => Some(PunchType::In),
            ReasonCode::PunchOutMissing => Some(PunchType::Out),
            ReasonCode::RepairRejected => {
                let is_in = self
                    .punch_types
                    .as_deref()
                    .map(|p| p.contains("上班") || p.to_ascii_lowercase().contains("in"))
                    .unwrap_or(false);
                Some(if is_in { PunchType::In } else { PunchType::Out })
            }
            _ => None,
        }
    }
}

/// Sort records newest first. Unparseable dates sort last.
pub fn sort_newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| b.parsed_date().cmp(&a.parsed_date()));
}
