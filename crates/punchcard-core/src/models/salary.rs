use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column names of the payroll sheet as the backend returns them.
pub mod fields {
    pub const YEAR_MONTH: &str = "年月";
    pub const STATUS: &str = "狀態";
    pub const GROSS: &str = "應發總額";
    pub const NET: &str = "實發金額";
    pub const BASE_SALARY: &str = "基本薪資";
    pub const EMPLOYEE_ID: &str = "員工ID";
    pub const EMPLOYEE_NAME: &str = "員工姓名";
    pub const BANK_CODE: &str = "銀行代碼";
    pub const BANK_ACCOUNT: &str = "銀行帳號";

    pub const LABOR_INSURANCE: &str = "勞保費";
    pub const HEALTH_INSURANCE: &str = "健保費";
    pub const EMPLOYMENT_INSURANCE: &str = "就業保險費";
    pub const PENSION_SELF: &str = "勞退自提";
    pub const INCOME_TAX: &str = "所得稅";
    pub const LEAVE_DEDUCTION: &str = "請假扣款";
    pub const WELFARE: &str = "福利金";
    pub const DORMITORY: &str = "宿舍費用";
    pub const GROUP_INSURANCE: &str = "團保費用";
    pub const OTHER_DEDUCTION: &str = "其他扣款";
}

const STATUTORY_DEDUCTIONS: [&str; 6] = [
    fields::LABOR_INSURANCE,
    fields::HEALTH_INSURANCE,
    fields::EMPLOYMENT_INSURANCE,
    fields::PENSION_SELF,
    fields::INCOME_TAX,
    fields::LEAVE_DEDUCTION,
];

const OTHER_DEDUCTIONS: [&str; 4] = [
    fields::WELFARE,
    fields::DORMITORY,
    fields::GROUP_INSURANCE,
    fields::OTHER_DEDUCTION,
];

/// One month of payroll, kept as the sheet row the backend sends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalaryRecord(pub Map<String, Value>);

impl SalaryRecord {
    /// Numeric value of a column; blanks and non-numbers count as zero.
    pub fn amount(&self, field: &str) -> f64 {
        match self.0.get(field) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn year_month(&self) -> Option<String> {
        self.text(fields::YEAR_MONTH)
    }

    pub fn status(&self) -> Option<String> {
        self.text(fields::STATUS)
    }

    pub fn employee_id(&self) -> Option<String> {
        self.text(fields::EMPLOYEE_ID)
    }

    pub fn employee_name(&self) -> Option<String> {
        self.text(fields::EMPLOYEE_NAME)
    }

    pub fn gross(&self) -> f64 {
        self.amount(fields::GROSS)
    }

    pub fn net(&self) -> f64 {
        self.amount(fields::NET)
    }

    pub fn other_deductions(&self) -> f64 {
        OTHER_DEDUCTIONS.iter().map(|f| self.amount(f)).sum()
    }

    pub fn total_deductions(&self) -> f64 {
        STATUTORY_DEDUCTIONS.iter().map(|f| self.amount(f)).sum::<f64>() + self.other_deductions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> SalaryRecord {
        serde_json::from_value(json!({
            "年月": "2025-06",
            "應發總額": 42000,
            "實發金額": "38,500",
            "勞保費": "1000",
            "健保費": 700,
            "所得稅": "",
            "福利金": 100,
            "其他扣款": "abc",
            "宿舍費用": 1700
        }))
        .unwrap()
    }

    #[test]
    fn test_amounts_are_lenient() {
        let r = record();
        assert_eq!(r.gross(), 42000.0);
        assert_eq!(r.net(), 38500.0);
        assert_eq!(r.amount(fields::INCOME_TAX), 0.0);
        assert_eq!(r.amount("missing"), 0.0);
    }

    #[test]
    fn test_deduction_totals() {
        let r = record();
        assert_eq!(r.other_deductions(), 1800.0);
        assert_eq!(r.total_deductions(), 3500.0);
    }

    #[test]
    fn test_text_fields() {
        let r = record();
        assert_eq!(r.year_month().as_deref(), Some("2025-06"));
        assert_eq!(r.status(), None);
    }
}
