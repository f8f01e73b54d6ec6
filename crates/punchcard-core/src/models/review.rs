use serde::{Deserialize, Serialize};

/// A pending adjustment or leave request awaiting an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    #[serde(deserialize_with = "crate::utils::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(rename = "applicationPeriod", default)]
    pub application_period: String,
    /// Localization key of the request type
    #[serde(rename = "type", default)]
    pub request_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn action_name(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approveReview",
            ReviewDecision::Reject => "rejectReview",
        }
    }

    pub fn success_key(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "REQUEST_APPROVED",
            ReviewDecision::Reject => "REQUEST_REJECTED",
        }
    }
}
