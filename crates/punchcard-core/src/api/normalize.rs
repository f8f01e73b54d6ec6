//! Response normalization at the network boundary.
//!
//! The backend has answered with two naming conventions over time:
//! `ok`/`data` and `success`/`records`. [`normalize`] backfills whichever
//! half of each pair is missing so the raw value can be read either way, and
//! [`ApiResponse`] is the single canonical shape the rest of the crate uses.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ApiError;

/// Backfill the redundant outcome and payload fields of a decoded response.
///
/// Non-object values are returned unchanged. A pair with neither side
/// present stays absent.
pub fn normalize(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        backfill(map, "success", "ok");
        backfill(map, "ok", "success");
        backfill(map, "data", "records");
        backfill(map, "records", "data");
    }
    value
}

fn backfill(map: &mut Map<String, Value>, from: &str, to: &str) {
    if map.contains_key(to) {
        return;
    }
    if let Some(v) = map.get(from).cloned() {
        map.insert(to.to_string(), v);
    }
}

/// Canonical response: one outcome flag, one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub ok: bool,
    pub data: Option<Value>,
    pub msg: Option<String>,
    pub code: Option<String>,
    pub params: Option<Value>,
    raw: Value,
}

impl ApiResponse {
    /// Normalize a decoded body and adapt it to the canonical shape.
    ///
    /// A missing or non-boolean outcome reads as failure.
    pub fn from_value(value: Value) -> Self {
        let raw = normalize(value);
        let ok = raw.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let data = raw.get("data").filter(|v| !v.is_null()).cloned();
        let msg = raw
            .get("msg")
            .or_else(|| raw.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let code = raw.get("code").and_then(Value::as_str).map(str::to_string);
        let params = raw.get("params").filter(|v| !v.is_null()).cloned();

        Self {
            ok,
            data,
            msg,
            code,
            params,
            raw,
        }
    }

    /// The normalized body, with both naming conventions populated.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Decode the payload, if any.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ApiError> {
        match self.data {
            Some(ref v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| ApiError::InvalidResponse(format!("payload: {}", e))),
            None => Ok(None),
        }
    }

    /// Decode an action-specific top level field such as `user` or `locations`.
    pub fn field_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.raw.get(name).filter(|v| !v.is_null()) {
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| ApiError::InvalidResponse(format!("field {}: {}", name, e))),
            None => Ok(None),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.raw.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Convert an unsuccessful response into an error carrying its detail.
    pub fn into_success(self) -> Result<Self, ApiError> {
        if self.ok {
            Ok(self)
        } else {
            Err(self.rejection())
        }
    }

    pub fn rejection(&self) -> ApiError {
        ApiError::Rejected {
            code: self.code.clone(),
            msg: self.msg.clone(),
        }
    }

    /// Localization key describing the outcome, falling back to `default`.
    pub fn code_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.code.as_deref().unwrap_or(default)
    }
}
