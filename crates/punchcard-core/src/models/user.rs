use serde::{Deserialize, Serialize};

use super::AttendanceRecord;

/// Department value the backend uses for administrators.
pub const ADMIN_DEPT: &str = "管理員";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId", deserialize_with = "crate::utils::string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dept: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.dept.as_deref() == Some(ADMIN_DEPT)
    }
}

/// Result of the combined start-up call.
#[derive(Debug, Clone, PartialEq)]
pub struct AppBootstrap {
    pub user: UserProfile,
    pub abnormal_records: Vec<AttendanceRecord>,
}
