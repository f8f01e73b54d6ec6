//! Data models for the attendance backend.
//!
//! - `AttendanceRecord`, `PunchEvent`, `MonthKey`: monthly punch history
//! - `ShiftInfo`, `ShiftSnapshot`, `ShiftRange`, `WeekSchedule`: schedules
//! - `SalaryRecord`: payroll rows
//! - `SalaryConfig`, `SalaryCalculation`: payroll administration
//! - `ReviewRequest`, `PunchLocation`, `UserProfile`: admin and session data

pub mod attendance;
pub mod location;
pub mod payroll;
pub mod review;
pub mod salary;
pub mod shift;
pub mod user;

pub use attendance::{sort_newest_first, AttendanceRecord, MonthKey, PunchEvent, PunchType, ReasonCode};
pub use location::PunchLocation;
pub use payroll::{SalaryCalculation, SalaryConfig};
pub use review::{ReviewDecision, ReviewRequest};
pub use salary::SalaryRecord;
pub use shift::{PunchTiming, ShiftInfo, ShiftRange, ShiftSnapshot, WeekSchedule};
pub use user::{AppBootstrap, UserProfile};
