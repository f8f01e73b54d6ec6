//! Month grid and per-day status derived from attendance records.

use chrono::{Datelike, NaiveDate};

use crate::models::{AttendanceRecord, MonthKey, ReasonCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Normal,
    /// A punch is missing
    Abnormal,
    RepairPending,
    RepairApproved,
    /// Any other annotated day
    PendingAdjustment,
    NoRecord,
}

impl DayStatus {
    /// Status of a day from its records. The first record decides.
    pub fn classify(records: &[&AttendanceRecord]) -> Self {
        let Some(first) = records.first() else {
            return DayStatus::NoRecord;
        };
        match first.reason_code() {
            ReasonCode::PunchInMissing | ReasonCode::PunchOutMissing => DayStatus::Abnormal,
            ReasonCode::PunchNormal => DayStatus::Normal,
            ReasonCode::RepairPending => DayStatus::RepairPending,
            ReasonCode::RepairApproved => DayStatus::RepairApproved,
            ReasonCode::Other(ref s) if s.is_empty() => DayStatus::Normal,
            ReasonCode::RepairRejected | ReasonCode::Other(_) => DayStatus::PendingAdjustment,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            DayStatus::Normal => "STATUS_PUNCH_NORMAL",
            DayStatus::Abnormal => "STATUS_ABNORMAL",
            DayStatus::RepairPending => "STATUS_REPAIR_PENDING",
            DayStatus::RepairApproved => "STATUS_REPAIR_APPROVED",
            DayStatus::PendingAdjustment => "STATUS_PENDING_ADJUSTMENT",
            DayStatus::NoRecord => "NO_RECORDS",
        }
    }
}

/// Records whose date falls on `date`, in their original order.
pub fn records_for_day<'a>(records: &'a [AttendanceRecord], date: NaiveDate) -> Vec<&'a AttendanceRecord> {
    records.iter().filter(|r| r.parsed_date() == Some(date)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub is_today: bool,
    pub is_future: bool,
    pub records: Vec<AttendanceRecord>,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Future days are shown but cannot be opened.
    pub fn is_selectable(&self) -> bool {
        !self.is_future
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthCalendar {
    pub month: MonthKey,
    /// Blank cells before the 1st in a Sunday-first week
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

impl MonthCalendar {
    pub fn build(month: MonthKey, records: &[AttendanceRecord], today: NaiveDate) -> Self {
        let first = month.first_day();
        let leading_blanks = first.weekday().num_days_from_sunday();

        let days = (0..month.days_in_month())
            .filter_map(|offset| first.checked_add_days(chrono::Days::new(offset as u64)))
            .map(|date| {
                let day_records = records_for_day(records, date);
                DayCell {
                    date,
                    status: DayStatus::classify(&day_records),
                    is_today: date == today,
                    is_future: date > today,
                    records: day_records.into_iter().cloned().collect(),
                }
            })
            .collect();

        Self {
            month,
            leading_blanks,
            days,
        }
    }

    pub fn day(&self, day: u32) -> Option<&DayCell> {
        self.days.get(day.checked_sub(1)? as usize)
    }

    /// Cells grouped into Sunday-first weeks; `None` pads the first week.
    pub fn weeks(&self) -> Vec<Vec<Option<&DayCell>>> {
        let cells: Vec<Option<&DayCell>> = std::iter::repeat(None)
            .take(self.leading_blanks as usize)
            .chain(self.days.iter().map(Some))
            .collect();
        cells.chunks(7).map(<[_]>::to_vec).collect()
    }

    pub fn count(&self, status: DayStatus) -> usize {
        self.days.iter().filter(|d| !d.is_future && d.status == status).count()
    }
}
