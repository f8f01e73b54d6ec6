use std::fmt;

/// One remote operation: the action name (with any caller-encoded query
/// text appended) plus typed parameters that are percent-encoded when the
/// request URL is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    head: String,
    params: Vec<(String, String)>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            head: name.into(),
            params: Vec::new(),
        }
    }

    /// Use an already encoded `name&key=value...` string verbatim.
    pub fn raw(action_and_query: impl Into<String>) -> Self {
        Self::new(action_and_query)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// The action name, without any query text.
    pub fn name(&self) -> &str {
        self.head.split('&').next().unwrap_or(&self.head)
    }

    pub(crate) fn head(&self) -> &str {
        &self.head
    }

    pub(crate) fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        Action::raw(s)
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Action::raw(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_strips_query_text() {
        let action = Action::raw("getMySalary&yearMonth=2025-06");
        assert_eq!(action.name(), "getMySalary");
        assert_eq!(action.head(), "getMySalary&yearMonth=2025-06");
        assert_eq!(action.to_string(), "getMySalary");
    }

    #[test]
    fn test_typed_params_keep_order() {
        let action = Action::new("getAttendanceDetails")
            .param("month", "2025-06")
            .param("userId", "U1");
        assert_eq!(
            action.params(),
            &[
                ("month".to_string(), "2025-06".to_string()),
                ("userId".to_string(), "U1".to_string())
            ]
        );
    }
}
