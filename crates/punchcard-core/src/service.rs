//! Session context: one client, one set of caches, one signed-in employee.
//!
//! Constructed once at start-up and passed by reference to whatever renders
//! its results. Every domain operation goes through here so cache policy
//! stays in one place.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{Action, ApiClient, ApiError, ApiResponse, HttpTransport, NoticeLevel, Transport};
use crate::auth::ClientState;
use crate::cache::month::MonthRecords;
use crate::cache::{MonthCache, ShiftCache};
use crate::calendar::{records_for_day, MonthCalendar};
use crate::i18n::{I18n, Translations};
use crate::models::{
    sort_newest_first, AppBootstrap, AttendanceRecord, MonthKey, PunchLocation, PunchTiming, PunchType,
    ReviewDecision, ReviewRequest, SalaryCalculation, SalaryConfig, SalaryRecord, ShiftInfo, ShiftRange, ShiftSnapshot, UserProfile,
    WeekSchedule,
};

/// Months warmed up in parallel by [`AttendanceService::prefetch_months`]
const MAX_CONCURRENT_PREFETCH: usize = 3;

/// Months of salary history requested when the caller does not say.
pub const DEFAULT_SALARY_HISTORY: u32 = 12;

const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

pub struct AttendanceService<T: Transport = HttpTransport> {
    client: ApiClient<T>,
    months: MonthCache,
    shifts: ShiftCache,
    state: Mutex<ClientState>,
    i18n: Arc<I18n>,
}

impl<T: Transport> AttendanceService<T> {
    /// Wrap a client, restoring the stored token onto it if there is one.
    pub fn new(client: ApiClient<T>, state: ClientState, i18n: Arc<I18n>) -> Self {
        if let Some(token) = state.token() {
            client.set_token(Some(token.to_string()));
        }
        Self {
            client,
            months: MonthCache::new(),
            shifts: ShiftCache::new(),
            state: Mutex::new(state),
            i18n,
        }
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn months(&self) -> &MonthCache {
        &self.months
    }

    pub fn shifts(&self) -> &ShiftCache {
        &self.shifts
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    pub fn is_signed_in(&self) -> bool {
        self.client.has_token()
    }

    pub fn user_id(&self) -> Result<String> {
        self.state()
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| ApiError::NotSignedIn.into())
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Store a session token obtained from the login page.
    pub fn sign_in(&self, token: &str) -> Result<()> {
        let mut state = self.state();
        state.set_token(Some(token.trim().to_string()));
        self.client.set_token(state.token().map(str::to_string));
        state.save()
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.client.set_token(None);
        self.shifts.clear().await;
        self.months.clear();
        self.state().clear_session()
    }

    /// Switch the display language and remember the choice.
    pub fn set_language(&self, table: Translations) -> Result<()> {
        let lang = table.lang().to_string();
        self.i18n.swap(table);
        let mut state = self.state();
        state.set_lang(lang);
        state.save()
    }

    /// Start-up call: the signed-in profile and outstanding abnormal days.
    pub async fn init_app(&self) -> Result<AppBootstrap> {
        let response = self.client.call("initApp", None).await?.into_success()?;
        let user: UserProfile = response
            .field_as("user")?
            .ok_or_else(|| ApiError::InvalidResponse("initApp without user".to_string()))?;
        let mut abnormal_records: Vec<AttendanceRecord> = response.field_as("abnormalRecords")?.unwrap_or_default();
        sort_newest_first(&mut abnormal_records);

        {
            let mut state = self.state();
            state.set_user_id(Some(user.user_id.clone()));
            state.save().context("Failed to remember user id")?;
        }
        info!(user = %user.user_id, admin = user.is_admin(), abnormal = abnormal_records.len(), "Session initialized");
        self.client.hooks().notify(&self.i18n.t("LOGIN_SUCCESS"), NoticeLevel::Success);

        Ok(AppBootstrap { user, abnormal_records })
    }

    /// The profile behind the current token, or `None` when the session is
    /// no longer valid.
    pub async fn check_session(&self) -> Result<Option<UserProfile>> {
        let response = self.client.call("checkSession", None).await?;
        if !response.ok {
            debug!(code = ?response.code, "Session check failed");
            return Ok(None);
        }
        Ok(response.field_as("user")?)
    }

    // ------------------------------------------------------------------
    // Punching
    // ------------------------------------------------------------------

    /// Punch in or out at the given coordinates.
    ///
    /// The outcome is announced through the notice hook either way. A
    /// successful punch-in clears the shift caches.
    pub async fn punch(&self, punch_type: PunchType, lat: f64, lng: f64, note: &str) -> Result<ApiResponse> {
        let action = Action::new("punch")
            .param("type", punch_type.wire_value())
            .param("lat", lat)
            .param("lng", lng)
            .param("note", note);
        let response = self.client.call(action, Some("punch-loading")).await?;
        self.announce(&response, UNKNOWN_ERROR);

        if response.ok && punch_type == PunchType::In {
            self.shifts.clear().await;
        }
        info!(punch = %punch_type, ok = response.ok, "Punch submitted");
        Ok(response)
    }

    /// Compare `now` with today's shift start. `None` when there is no
    /// shift or its start time is unreadable.
    pub async fn punch_timing(&self, today: NaiveDate, now: NaiveTime) -> Result<Option<(PunchTiming, ShiftInfo)>> {
        let snapshot = self.today_shift(today).await?;
        Ok(snapshot.shift().and_then(|info| {
            let start = info.start()?;
            Some((PunchTiming::evaluate(now, start), info.clone()))
        }))
    }

    /// Localized early/late warning for a punch at `now`, if one applies.
    pub async fn punch_warning(&self, today: NaiveDate, now: NaiveTime) -> Result<Option<String>> {
        let Some((timing, info)) = self.punch_timing(today, now).await? else {
            return Ok(None);
        };
        Ok(timing.warning_key().map(|key| {
            self.i18n
                .t_with(key, &[("start", info.start_time.as_str()), ("shift", info.shift_type.as_str())])
        }))
    }

    /// File an adjustment for a missed punch. The time defaults by type.
    pub async fn adjust_punch(
        &self,
        date: NaiveDate,
        punch_type: PunchType,
        lat: f64,
        lng: f64,
        note: Option<&str>,
    ) -> Result<ApiResponse> {
        let datetime = format!("{}T{}", date.format("%Y-%m-%d"), punch_type.default_adjust_time());
        let note = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => format!("補打卡 - {}", punch_type.wire_value()),
        };
        let action = Action::new("adjustPunch")
            .param("type", punch_type.wire_value())
            .param("lat", lat)
            .param("lng", lng)
            .param("datetime", &datetime)
            .param("note", note);
        let response = self.client.call(action, None).await?;
        self.announce(&response, "ADJUST_PUNCH_SUCCESS");
        info!(date = %date, punch = %punch_type, ok = response.ok, "Adjustment submitted");
        Ok(response)
    }

    // ------------------------------------------------------------------
    // Attendance history
    // ------------------------------------------------------------------

    /// Records of one month, served from the month cache after the first
    /// successful load.
    pub async fn month_records(&self, month: MonthKey) -> Result<MonthRecords> {
        let user_id = self.user_id()?;
        let action = Action::new("getAttendanceDetails")
            .param("month", month)
            .param("userId", &user_id);
        let client = &self.client;
        self.months
            .get_month(month, move || async move { client.call(action, None).await })
            .await
    }

    /// Load several months with bounded concurrency. Returns how many are
    /// now cached; failures are logged and skipped.
    pub async fn prefetch_months(&self, months: &[MonthKey]) -> usize {
        stream::iter(months.iter().copied())
            .map(|month| async move { (month, self.month_records(month).await) })
            .buffer_unordered(MAX_CONCURRENT_PREFETCH)
            .fold(0, |loaded, (month, result)| async move {
                match result {
                    Ok(records) => {
                        debug!(month = %month, count = records.len(), "Prefetched month");
                        loaded + 1
                    }
                    Err(e) => {
                        warn!(month = %month, error = %e, "Prefetch failed");
                        loaded
                    }
                }
            })
            .await
    }

    /// Records of a single day, from the cached month.
    pub async fn daily_records(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let records = self.month_records(MonthKey::from_date(date)).await?;
        Ok(records_for_day(&records, date).into_iter().cloned().collect())
    }

    pub async fn month_calendar(&self, month: MonthKey, today: NaiveDate) -> Result<MonthCalendar> {
        let records = self.month_records(month).await?;
        Ok(MonthCalendar::build(month, &records, today))
    }

    /// Days of `month` that need attention, newest first. Not cached.
    pub async fn abnormal_records(&self, month: MonthKey) -> Result<Vec<AttendanceRecord>> {
        let user_id = self.user_id()?;
        let action = Action::new("getAbnormalRecords")
            .param("month", month)
            .param("userId", &user_id);
        let response = self.client.call(action, Some("abnormal-records-loading")).await?.into_success()?;
        let mut records: Vec<AttendanceRecord> = response.data_as()?.unwrap_or_default();
        sort_newest_first(&mut records);
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Shifts
    // ------------------------------------------------------------------

    pub async fn today_shift(&self, today: NaiveDate) -> Result<ShiftSnapshot> {
        let user_id = self.user_id()?;
        let action = Action::new("getEmployeeShiftForDate")
            .param("employeeId", &user_id)
            .param("date", today.format("%Y-%m-%d"));
        let client = &self.client;
        self.shifts
            .get_today_shift(move || async move { client.call(action, Some("today-shift-loading")).await })
            .await
    }

    /// Shifts from `today` through one week later.
    pub async fn week_shift(&self, today: NaiveDate) -> Result<Arc<WeekSchedule>> {
        let user_id = self.user_id()?;
        let range = ShiftRange::upcoming_week(today);
        let action = Action::new("getShifts").param("filters", range.filters_json(&user_id));
        let client = &self.client;
        self.shifts
            .get_week_shift(range, move || async move { client.call(action, Some("week-shift-loading")).await })
            .await
    }

    // ------------------------------------------------------------------
    // Salary
    // ------------------------------------------------------------------

    /// Payroll row for `month`, or `None` when the backend has none.
    pub async fn salary(&self, month: MonthKey) -> Result<Option<SalaryRecord>> {
        let action = Action::new("getMySalary").param("yearMonth", month);
        let response = self.client.call(action, Some("salary-loading")).await?;
        if !response.ok {
            debug!(month = %month, msg = ?response.msg, "No salary record");
            return Ok(None);
        }
        Ok(response.data_as()?)
    }

    pub async fn salary_history(&self, limit: u32) -> Result<Vec<SalaryRecord>> {
        let action = Action::new("getMySalaryHistory").param("limit", limit);
        let response = self.client.call(action, Some("salary-history-loading")).await?;
        if !response.ok {
            return Ok(Vec::new());
        }
        Ok(response.data_as()?.unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub async fn review_requests(&self) -> Result<Vec<ReviewRequest>> {
        let response = self.client.call("getReviewRequest", Some("requests-loading")).await?.into_success()?;
        Ok(response.field_as("reviewRequest")?.unwrap_or_default())
    }

    pub async fn approve_review(&self, id: &str) -> Result<ApiResponse> {
        self.decide_review(id, ReviewDecision::Approve).await
    }

    pub async fn reject_review(&self, id: &str) -> Result<ApiResponse> {
        self.decide_review(id, ReviewDecision::Reject).await
    }

    async fn decide_review(&self, id: &str, decision: ReviewDecision) -> Result<ApiResponse> {
        let action = Action::new(decision.action_name()).param("id", id);
        let response = self.client.call(action, None).await?;
        self.announce(&response, decision.success_key());
        info!(id = id, decision = ?decision, ok = response.ok, "Review decided");
        Ok(response)
    }

    pub async fn locations(&self) -> Result<Vec<PunchLocation>> {
        let response = self.client.call("getLocations", None).await?.into_success()?;
        Ok(response.field_as("locations")?.unwrap_or_default())
    }

    pub async fn add_location(&self, name: &str, lat: f64, lng: f64) -> Result<ApiResponse> {
        let action = Action::new("addLocation")
            .param("name", name)
            .param("lat", lat)
            .param("lng", lng);
        let response = self.client.call(action, None).await?;
        self.announce(&response, "LOCATION_ADD_SUCCESS");
        Ok(response)
    }

    // ------------------------------------------------------------------
    // Payroll administration
    // ------------------------------------------------------------------

    /// Store an employee's standing salary settings. Settings without an
    /// id, a name or a positive base salary are refused before any request.
    pub async fn set_employee_salary(&self, config: &SalaryConfig) -> Result<ApiResponse> {
        if !config.is_complete() {
            self.client
                .hooks()
                .notify(&self.i18n.t("SALARY_FILL_REQUIRED"), NoticeLevel::Error);
            bail!("Employee id, name and a positive base salary are required");
        }
        let action = with_pairs(Action::new("setEmployeeSalaryTW"), config.query_pairs());
        let response = self.client.call(action, None).await?;
        self.announce_outcome(&response, "SALARY_SAVE_SUCCESS", "SALARY_SAVE_FAILED");
        info!(employee = %config.employee_id, ok = response.ok, "Salary settings submitted");
        Ok(response)
    }

    /// Compute one employee's pay for `month`. `None` when the backend
    /// could not produce a calculation.
    pub async fn calculate_salary(&self, employee_id: &str, month: MonthKey) -> Result<Option<SalaryCalculation>> {
        let action = Action::new("calculateMonthlySalary")
            .param("employeeId", employee_id.trim())
            .param("yearMonth", month);
        let response = self.client.call(action, None).await?;
        let calculation: Option<SalaryCalculation> = if response.ok {
            response.data_as()?
        } else {
            None
        };

        match calculation {
            Some(ref calc) => {
                debug!(employee = employee_id, month = %month, net = calc.net_salary, "Salary calculated");
                self.client
                    .hooks()
                    .notify(&self.i18n.t("SALARY_CALC_SUCCESS"), NoticeLevel::Success);
            }
            None => {
                let text = self.i18n.t_with("SALARY_CALC_FAILED", &[("msg", failure_msg(&response))]);
                self.client.hooks().notify(&text, NoticeLevel::Error);
            }
        }
        Ok(calculation)
    }

    /// Save a reviewed calculation as the month's payslip.
    pub async fn save_monthly_salary(&self, calculation: &SalaryCalculation) -> Result<ApiResponse> {
        let action = with_pairs(Action::new("saveMonthlySalary"), calculation.query_pairs());
        let response = self.client.call(action, None).await?;
        self.announce_outcome(&response, "SALARY_RECORD_SAVE_SUCCESS", "SALARY_RECORD_SAVE_FAILED");
        info!(
            employee = %calculation.employee_id,
            month = %calculation.year_month,
            ok = response.ok,
            "Payslip submitted"
        );
        Ok(response)
    }

    /// Payroll rows of every employee for `month`.
    pub async fn all_monthly_salary(&self, month: MonthKey) -> Result<Vec<SalaryRecord>> {
        let action = Action::new("getAllMonthlySalary").param("yearMonth", month);
        let response = self.client.call(action, Some("all-salary-loading-list")).await?;
        if !response.ok {
            debug!(month = %month, msg = ?response.msg, "No payroll rows");
            return Ok(Vec::new());
        }
        Ok(response.data_as()?.unwrap_or_default())
    }

    /// Fixed success notice, or the failure template filled with the
    /// backend's message.
    fn announce_outcome(&self, response: &ApiResponse, success_key: &str, failure_key: &str) {
        if response.ok {
            self.client.hooks().notify(&self.i18n.t(success_key), NoticeLevel::Success);
        } else {
            let text = self.i18n.t_with(failure_key, &[("msg", failure_msg(response))]);
            self.client.hooks().notify(&text, NoticeLevel::Error);
        }
    }

    /// Notify the outcome of a write action. Success uses the response code
    /// when present, else `success_key`; failure uses the code or a generic
    /// error.
    fn announce(&self, response: &ApiResponse, success_key: &str) {
        let params = message_params(response.params.as_ref());
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        if response.ok {
            let text = self.i18n.t_with(response.code_or(success_key), &params);
            self.client.hooks().notify(&text, NoticeLevel::Success);
        } else {
            let text = match (response.code.as_deref(), response.msg.as_deref()) {
                (Some(code), _) => self.i18n.t_with(code, &params),
                (None, Some(msg)) => msg.to_string(),
                (None, None) => self.i18n.t(UNKNOWN_ERROR),
            };
            self.client.hooks().notify(&text, NoticeLevel::Error);
        }
    }
}

fn with_pairs(action: Action, pairs: Vec<(&'static str, String)>) -> Action {
    pairs.into_iter().fold(action, |action, (key, value)| action.param(key, value))
}

fn failure_msg(response: &ApiResponse) -> &str {
    response.msg.as_deref().or(response.code.as_deref()).unwrap_or("")
}

/// Flatten a `params` object into template substitutions.
fn message_params(params: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = params else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}
