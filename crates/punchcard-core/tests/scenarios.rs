//! End-to-end flows through the public API with an in-memory backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use reqwest::Url;

use punchcard_core::api::TransportResponse;
use punchcard_core::{
    ApiClient, ApiError, AttendanceService, ClientState, DayStatus, I18n, MonthCalendar, MonthCache, NoticeLevel,
    Transport, Translations, UiHooks,
};

#[derive(Default)]
struct ScriptedBackend {
    bodies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(bodies: &[&str]) -> Self {
        Self {
            bodies: Mutex::new(bodies.iter().map(|b| b.to_string()).collect()),
            seen: Mutex::default(),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for ScriptedBackend {
    async fn get(&self, url: &Url) -> Result<TransportResponse, ApiError> {
        self.seen.lock().unwrap().push(url.query().unwrap_or_default().to_string());
        match self.bodies.lock().unwrap().pop_front() {
            Some(body) => Ok(TransportResponse { status: 200, body }),
            None => Err(ApiError::InvalidResponse("backend script exhausted".to_string())),
        }
    }
}

#[derive(Default)]
struct Notices(Mutex<Vec<(String, NoticeLevel)>>);

impl UiHooks for Notices {
    fn notify(&self, message: &str, level: NoticeLevel) {
        self.0.lock().unwrap().push((message.to_string(), level));
    }
}

fn i18n() -> Arc<I18n> {
    Arc::new(I18n::new(Translations::default()))
}

fn client(backend: ScriptedBackend, hooks: Arc<Notices>) -> ApiClient<ScriptedBackend> {
    let client = ApiClient::new("https://backend.test/macros/exec", backend, hooks, i18n()).unwrap();
    client.set_token(Some("session-token".to_string()));
    client
}

#[tokio::test]
async fn salary_not_found_shows_empty_state() {
    let backend = ScriptedBackend::new(&[r#"{"success": false, "msg": "not found"}"#]);
    let hooks = Arc::new(Notices::default());
    let client = client(backend, hooks.clone());

    let response = client.call("getMySalary&yearMonth=2025-06", None).await.unwrap();
    assert!(!response.ok);
    assert!(response.data.is_none());
    assert_eq!(response.msg.as_deref(), Some("not found"));
    // Application failure is not a connection problem
    assert!(hooks.0.lock().unwrap().is_empty());
    assert_eq!(
        client.transport().queries(),
        vec!["action=getMySalary&yearMonth=2025-06&token=session-token".to_string()]
    );
}

#[tokio::test]
async fn salary_service_reports_no_record() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(&[r#"{"success": false, "msg": "not found"}"#]);
    let service = AttendanceService::new(
        client(backend, Arc::new(Notices::default())),
        ClientState::new(dir.path().join("state.json")),
        i18n(),
    );
    let salary = service.salary("2025-06".parse().unwrap()).await.unwrap();
    assert!(salary.is_none());
}

const JUNE: &str = r#"{"ok": true, "records": [{
    "date": "2025-06-01",
    "record": [{"type": "in", "time": "09:00"}, {"type": "out", "time": "18:00"}],
    "reason": "STATUS_PUNCH_NORMAL"
}]}"#;

#[tokio::test]
async fn attendance_month_is_cached_and_rendered_normal() {
    let backend = ScriptedBackend::new(&[JUNE]);
    let client = client(backend, Arc::new(Notices::default()));
    let cache = MonthCache::new();
    let key = "2025-06".parse().unwrap();

    let records = cache
        .get_month(key, || client.call("getAttendanceDetails&month=2025-06&userId=U1", None))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(cache.contains(&key));
    assert_eq!(cache.get(&key).unwrap()[0].date, "2025-06-01");

    let today = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
    let calendar = MonthCalendar::build(key, &records, today);
    let june_first = calendar.day(1).unwrap();
    assert_eq!(june_first.status, DayStatus::Normal);
    assert_eq!(june_first.records[0].record.len(), 2);
}

#[tokio::test]
async fn service_calendar_reads_through_the_month_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = ClientState::new(dir.path().join("state.json"));
    state.set_user_id(Some("U1".to_string()));
    let service = AttendanceService::new(
        client(ScriptedBackend::new(&[JUNE]), Arc::new(Notices::default())),
        state,
        i18n(),
    );
    let key = "2025-06".parse().unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();

    let calendar = service.month_calendar(key, today).await.unwrap();
    assert_eq!(calendar.day(1).unwrap().status, DayStatus::Normal);
    let day = service.daily_records(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).await.unwrap();
    assert_eq!(day.len(), 1);

    assert_eq!(
        service.client().transport().queries(),
        vec!["action=getAttendanceDetails&token=session-token&month=2025-06&userId=U1".to_string()]
    );
}

#[tokio::test]
async fn connection_failure_is_announced() {
    let hooks = Arc::new(Notices::default());
    let client = client(ScriptedBackend::new(&[]), hooks.clone());
    let err = client.call("getLocations", None).await.unwrap_err();
    assert!(err.downcast_ref::<ApiError>().is_some_and(ApiError::is_transport));
    // Empty table renders the key itself
    assert_eq!(
        *hooks.0.lock().unwrap(),
        vec![("CONNECTION_FAILED".to_string(), NoticeLevel::Error)]
    );
}
