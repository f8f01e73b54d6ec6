//! Request dispatcher for the attendance backend.
//!
//! Every action is one HTTP GET against a single endpoint:
//! `<base>?action=<name>&token=<session token>&<params>`. The body is
//! decoded as JSON and normalized before it is handed back.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Action, ApiError, ApiResponse};
use crate::i18n::I18n;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
/// Script-hosted backends can take several seconds on a cold start.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Indicator toggled when the caller does not name one.
pub const DEFAULT_LOADING_ID: &str = "loading";

/// Localization key of the generic transport failure notice.
const CONNECTION_FAILED: &str = "CONNECTION_FAILED";

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// One GET round trip. Implemented over reqwest for real use and in memory
/// for tests.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send;
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<TransportResponse, ApiError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

// ============================================================================
// UI collaborators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Presentation side effects the dispatcher and service trigger.
/// Both default to doing nothing; an unknown indicator is not an error.
pub trait UiHooks: Send + Sync {
    fn set_loading(&self, _indicator: &str, _visible: bool) {}

    fn notify(&self, _message: &str, _level: NoticeLevel) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl UiHooks for NoopHooks {}

/// Shows an indicator on creation and always hides it on drop.
struct LoadingGuard<'a> {
    hooks: &'a dyn UiHooks,
    indicator: &'a str,
}

impl<'a> LoadingGuard<'a> {
    fn show(hooks: &'a dyn UiHooks, indicator: &'a str) -> Self {
        hooks.set_loading(indicator, true);
        Self { hooks, indicator }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.hooks.set_loading(self.indicator, false);
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct ApiClient<T = HttpTransport> {
    base_url: Url,
    transport: T,
    token: RwLock<Option<String>>,
    hooks: Arc<dyn UiHooks>,
    i18n: Arc<I18n>,
}

impl ApiClient<HttpTransport> {
    /// Create a client over HTTP for the given endpoint
    pub fn http(base_url: &str, timeout_secs: u64, hooks: Arc<dyn UiHooks>, i18n: Arc<I18n>) -> Result<Self> {
        Self::new(base_url, HttpTransport::new(timeout_secs)?, hooks, i18n)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: &str, transport: T, hooks: Arc<dyn UiHooks>, i18n: Arc<I18n>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API endpoint: {}", base_url))?;
        Ok(Self {
            base_url,
            transport,
            token: RwLock::new(None),
            hooks,
            i18n,
        })
    }

    /// Set the session token attached to every request
    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn hooks(&self) -> &dyn UiHooks {
        self.hooks.as_ref()
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build `<base>?action=<head>&token=<token>&<typed params>`.
    /// The action head is used verbatim; typed params are percent-encoded.
    /// Without a session token the `token` pair is left out.
    pub fn build_url(&self, action: &Action) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!("action={}", action.head())));
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = self.token() {
                pairs.append_pair("token", &token);
            }
            for (key, value) in action.params() {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Perform one request and return the normalized response.
    ///
    /// Transport failures (non-success status, undecodable body, network
    /// error) raise a localized notice and are returned as `ApiError`.
    /// The response's own outcome is not interpreted here.
    pub async fn call(&self, action: impl Into<Action>, loading: Option<&str>) -> Result<ApiResponse> {
        let action = action.into();
        let url = self.build_url(&action);
        let _loading = LoadingGuard::show(self.hooks.as_ref(), loading.unwrap_or(DEFAULT_LOADING_ID));

        debug!(action = %action, "Dispatching request");
        match self.dispatch(&url).await {
            Ok(response) => {
                debug!(action = %action, ok = response.ok, "Response received");
                Ok(response)
            }
            Err(e) => {
                warn!(action = %action, error = %e, "API call failed");
                self.hooks.notify(&self.i18n.t(CONNECTION_FAILED), NoticeLevel::Error);
                Err(e.into())
            }
        }
    }

    async fn dispatch(&self, url: &Url) -> Result<ApiResponse, ApiError> {
        let response = self.transport.get(url).await?;
        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        let value: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e)))?;
        Ok(ApiResponse::from_value(value))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::i18n::Translations;

    /// Canned responses served in order; every requested URL is recorded.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, ApiError>>>,
        pub(crate) requests: Mutex<Vec<Url>>,
    }

    impl MockTransport {
        pub(crate) fn with_json(bodies: &[&str]) -> Self {
            let mock = Self::default();
            for body in bodies {
                mock.push(200, body);
            }
            mock
        }

        pub(crate) fn push(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(TransportResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub(crate) fn push_err(&self, err: ApiError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn last_query(&self) -> String {
            self.requests
                .lock()
                .unwrap()
                .last()
                .and_then(|u| u.query().map(str::to_string))
                .unwrap_or_default()
        }
    }

    impl Transport for MockTransport {
        async fn get(&self, url: &Url) -> Result<TransportResponse, ApiError> {
            self.requests.lock().unwrap().push(url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::InvalidResponse("no canned response".to_string())))
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingHooks {
        pub(crate) loading: Mutex<Vec<(String, bool)>>,
        pub(crate) notices: Mutex<Vec<(String, NoticeLevel)>>,
    }

    impl UiHooks for RecordingHooks {
        fn set_loading(&self, indicator: &str, visible: bool) {
            self.loading.lock().unwrap().push((indicator.to_string(), visible));
        }

        fn notify(&self, message: &str, level: NoticeLevel) {
            self.notices.lock().unwrap().push((message.to_string(), level));
        }
    }

    pub(crate) fn test_i18n() -> Arc<I18n> {
        Arc::new(I18n::new(
            Translations::from_json("en", r#"{"CONNECTION_FAILED": "Connection failed"}"#).unwrap(),
        ))
    }

    fn client(mock: MockTransport) -> (ApiClient<MockTransport>, Arc<RecordingHooks>) {
        let hooks = Arc::new(RecordingHooks::default());
        let client = ApiClient::new("https://example.test/exec", mock, hooks.clone(), test_i18n()).unwrap();
        (client, hooks)
    }

    #[test]
    fn test_build_url_orders_action_token_params() {
        let (client, _) = client(MockTransport::default());
        client.set_token(Some("tok123".to_string()));
        let url = client.build_url(
            &Action::new("adjustPunch")
                .param("note", "late bus & rain")
                .param("datetime", "2025-06-02T09:00:00"),
        );
        assert_eq!(
            url.query(),
            Some("action=adjustPunch&token=tok123&note=late+bus+%26+rain&datetime=2025-06-02T09%3A00%3A00")
        );
    }

    #[test]
    fn test_build_url_keeps_raw_action_verbatim() {
        let (client, _) = client(MockTransport::default());
        client.set_token(Some("t".to_string()));
        let url = client.build_url(&Action::raw("getMySalary&yearMonth=2025-06"));
        assert_eq!(url.query(), Some("action=getMySalary&yearMonth=2025-06&token=t"));
    }

    #[test]
    fn test_build_url_without_token() {
        let (client, _) = client(MockTransport::default());
        let url = client.build_url(&Action::new("getLoginUrl"));
        assert_eq!(url.query(), Some("action=getLoginUrl"));
        assert!(!client.has_token());
    }

    #[tokio::test]
    async fn test_call_normalizes_and_toggles_loading() {
        let (client, hooks) = client(MockTransport::with_json(&[r#"{"success": true, "data": [1]}"#]));
        let resp = client.call("checkSession", Some("session-loading")).await.unwrap();
        assert!(resp.ok);
        assert_eq!(resp.raw()["records"], serde_json::json!([1]));
        assert_eq!(
            *hooks.loading.lock().unwrap(),
            vec![("session-loading".to_string(), true), ("session-loading".to_string(), false)]
        );
        assert!(hooks.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_does_not_interpret_outcome() {
        let (client, hooks) = client(MockTransport::with_json(&[r#"{"ok": false, "code": "ERR_X"}"#]));
        let resp = client.call("punch", None).await.unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.code.as_deref(), Some("ERR_X"));
        assert!(hooks.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_notifies_and_fails() {
        let mock = MockTransport::default();
        mock.push(500, "boom");
        let (client, hooks) = client(mock);
        let err = client.call("getLocations", None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::ServerError(_))));
        assert_eq!(
            *hooks.notices.lock().unwrap(),
            vec![("Connection failed".to_string(), NoticeLevel::Error)]
        );
        // Indicator is reset on the failure path too
        assert_eq!(hooks.loading.lock().unwrap().last(), Some(&("loading".to_string(), false)));
    }

    #[tokio::test]
    async fn test_undecodable_body_fails() {
        let (client, hooks) = client(MockTransport::with_json(&["<html>not json</html>"]));
        let err = client.call("getLocations", None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::InvalidResponse(_))));
        assert_eq!(hooks.notices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exactly_one_round_trip_without_retry() {
        let mock = MockTransport::default();
        mock.push_err(ApiError::RateLimited);
        let (client, _) = client(mock);
        assert!(client.call("getLocations", None).await.is_err());
        assert_eq!(client.transport().request_count(), 1);
    }
}
