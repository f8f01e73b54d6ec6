use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session token may be invalid")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered, but reported the action as failed.
    #[error("Request rejected: {}", rejection_detail(.code, .msg))]
    Rejected {
        code: Option<String>,
        msg: Option<String>,
    },

    #[error("API endpoint is not configured")]
    NotConfigured,

    #[error("No employee id known - sign in first")]
    NotSignedIn,

    #[error("Invalid month key: {0} (expected YYYY-MM)")]
    InvalidMonthKey(String),
}

fn rejection_detail<'a>(code: &'a Option<String>, msg: &'a Option<String>) -> &'a str {
    msg.as_deref().or(code.as_deref()).unwrap_or("no detail")
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True for failures of the transport layer (status, decode, network),
    /// as opposed to application-level rejections.
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            ApiError::Rejected { .. }
                | ApiError::NotConfigured
                | ApiError::NotSignedIn
                | ApiError::InvalidMonthKey(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(403, "no"), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(429, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(502, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(302, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "打".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated, 1200 total bytes"));
    }

    #[test]
    fn test_rejected_display_prefers_msg() {
        let err = ApiError::Rejected {
            code: Some("ERR_NO_DATA".to_string()),
            msg: Some("not found".to_string()),
        };
        assert_eq!(err.to_string(), "Request rejected: not found");

        let err = ApiError::Rejected {
            code: Some("ERR_NO_DATA".to_string()),
            msg: None,
        };
        assert_eq!(err.to_string(), "Request rejected: ERR_NO_DATA");
        assert!(!err.is_transport());
    }
}
