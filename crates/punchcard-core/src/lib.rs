//! Punchcard Core - client library for a script-hosted attendance backend.
//!
//! This crate provides:
//! - Request dispatch and response normalization (`api`)
//! - Session-scoped month and shift caches (`cache`)
//! - Data models for attendance, shifts, salary, reviews and locations (`models`)
//! - The session context exposing every domain operation (`service`)
//! - Calendar classification, translations, configuration and persisted state

pub mod api;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod i18n;
pub mod models;
pub mod service;
pub mod utils;

pub use api::{Action, ApiClient, ApiError, ApiResponse, HttpTransport, NoticeLevel, Transport, UiHooks};
pub use auth::ClientState;
pub use cache::{MonthCache, ShiftCache};
pub use calendar::{DayStatus, MonthCalendar};
pub use config::Config;
pub use i18n::{I18n, Translations};
pub use service::AttendanceService;
