//! Payroll administration: per-employee salary settings and the monthly
//! calculation an administrator reviews before saving it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Day of the month salaries are paid when the form leaves it blank.
pub const DEFAULT_PAYMENT_DAY: u32 = 5;

/// Amounts arrive as numbers, numeric strings, blanks or `null`.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Amounts go on the wire without a trailing `.0`.
fn amount_param(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Standing salary settings of one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryConfig {
    pub employee_id: String,
    pub employee_name: String,
    pub base_salary: f64,

    #[serde(default)]
    pub position_allowance: f64,
    #[serde(default)]
    pub meal_allowance: f64,
    #[serde(default)]
    pub transport_allowance: f64,
    #[serde(default)]
    pub attendance_bonus: f64,
    #[serde(default)]
    pub performance_bonus: f64,
    #[serde(default)]
    pub other_allowances: f64,

    #[serde(default)]
    pub labor_fee: f64,
    #[serde(default)]
    pub health_fee: f64,
    #[serde(default)]
    pub employment_fee: f64,
    #[serde(default)]
    pub pension_self: f64,
    #[serde(default)]
    pub income_tax: f64,
    #[serde(default)]
    pub pension_self_rate: f64,

    #[serde(default)]
    pub welfare_fee: f64,
    #[serde(default)]
    pub dormitory_fee: f64,
    #[serde(default)]
    pub group_insurance: f64,
    #[serde(default)]
    pub other_deductions: f64,

    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub employee_type: String,
    #[serde(default)]
    pub salary_type: String,
    #[serde(default)]
    pub bank_code: String,
    #[serde(default)]
    pub bank_account: String,
    #[serde(default)]
    pub hire_date: String,
    #[serde(default = "default_payment_day")]
    pub payment_day: u32,
    #[serde(default)]
    pub note: String,
}

fn default_payment_day() -> u32 {
    DEFAULT_PAYMENT_DAY
}

impl SalaryConfig {
    /// Settings with every optional amount at zero.
    pub fn new(employee_id: impl Into<String>, employee_name: impl Into<String>, base_salary: f64) -> Self {
        Self {
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            base_salary,
            position_allowance: 0.0,
            meal_allowance: 0.0,
            transport_allowance: 0.0,
            attendance_bonus: 0.0,
            performance_bonus: 0.0,
            other_allowances: 0.0,
            labor_fee: 0.0,
            health_fee: 0.0,
            employment_fee: 0.0,
            pension_self: 0.0,
            income_tax: 0.0,
            pension_self_rate: 0.0,
            welfare_fee: 0.0,
            dormitory_fee: 0.0,
            group_insurance: 0.0,
            other_deductions: 0.0,
            id_number: String::new(),
            employee_type: String::new(),
            salary_type: String::new(),
            bank_code: String::new(),
            bank_account: String::new(),
            hire_date: String::new(),
            payment_day: DEFAULT_PAYMENT_DAY,
            note: String::new(),
        }
    }

    /// Employee id, name and a positive base salary are mandatory.
    pub fn is_complete(&self) -> bool {
        !self.employee_id.trim().is_empty() && !self.employee_name.trim().is_empty() && self.base_salary > 0.0
    }

    /// Request parameters in the order the backend documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("employeeId", self.employee_id.trim().to_string()),
            ("employeeName", self.employee_name.trim().to_string()),
            ("baseSalary", amount_param(self.base_salary)),
            ("positionAllowance", amount_param(self.position_allowance)),
            ("mealAllowance", amount_param(self.meal_allowance)),
            ("transportAllowance", amount_param(self.transport_allowance)),
            ("attendanceBonus", amount_param(self.attendance_bonus)),
            ("performanceBonus", amount_param(self.performance_bonus)),
            ("otherAllowances", amount_param(self.other_allowances)),
            ("laborFee", amount_param(self.labor_fee)),
            ("healthFee", amount_param(self.health_fee)),
            ("employmentFee", amount_param(self.employment_fee)),
            ("pensionSelf", amount_param(self.pension_self)),
            ("incomeTax", amount_param(self.income_tax)),
            ("pensionSelfRate", amount_param(self.pension_self_rate)),
            ("welfareFee", amount_param(self.welfare_fee)),
            ("dormitoryFee", amount_param(self.dormitory_fee)),
            ("groupInsurance", amount_param(self.group_insurance)),
            ("otherDeductions", amount_param(self.other_deductions)),
            ("idNumber", self.id_number.clone()),
            ("employeeType", self.employee_type.clone()),
            ("salaryType", self.salary_type.clone()),
            ("bankCode", self.bank_code.clone()),
            ("bankAccount", self.bank_account.clone()),
            ("hireDate", self.hire_date.clone()),
            ("paymentDay", self.payment_day.to_string()),
            ("note", self.note.clone()),
        ]
    }
}

/// One employee's computed pay for a month, as `calculateMonthlySalary`
/// returns it. Missing amounts read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryCalculation {
    #[serde(deserialize_with = "lenient_text")]
    pub employee_id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub employee_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub year_month: String,

    #[serde(deserialize_with = "lenient_amount")]
    pub base_salary: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub position_allowance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub meal_allowance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub transport_allowance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub attendance_bonus: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub performance_bonus: f64,

    #[serde(deserialize_with = "lenient_amount")]
    pub weekday_overtime_pay: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub restday_overtime_pay: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub holiday_overtime_pay: f64,

    #[serde(deserialize_with = "lenient_amount")]
    pub labor_fee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub health_fee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub employment_fee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub pension_self: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub income_tax: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub leave_deduction: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub welfare_fee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub dormitory_fee: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub group_insurance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub other_deductions: f64,

    #[serde(deserialize_with = "lenient_amount")]
    pub gross_salary: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub net_salary: f64,

    #[serde(deserialize_with = "lenient_text")]
    pub bank_code: String,
    #[serde(deserialize_with = "lenient_text")]
    pub bank_account: String,
}

impl SalaryCalculation {
    pub fn total_deductions(&self) -> f64 {
        self.labor_fee
            + self.health_fee
            + self.employment_fee
            + self.pension_self
            + self.income_tax
            + self.leave_deduction
            + self.welfare_fee
            + self.dormitory_fee
            + self.group_insurance
            + self.other_deductions
    }

    pub fn overtime_pay(&self) -> f64 {
        self.weekday_overtime_pay + self.restday_overtime_pay + self.holiday_overtime_pay
    }

    /// Parameters of `saveMonthlySalary`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("employeeId", self.employee_id.clone()),
            ("employeeName", self.employee_name.clone()),
            ("yearMonth", self.year_month.clone()),
            ("baseSalary", amount_param(self.base_salary)),
            ("positionAllowance", amount_param(self.position_allowance)),
            ("mealAllowance", amount_param(self.meal_allowance)),
            ("transportAllowance", amount_param(self.transport_allowance)),
            ("attendanceBonus", amount_param(self.attendance_bonus)),
            ("performanceBonus", amount_param(self.performance_bonus)),
            ("weekdayOvertimePay", amount_param(self.weekday_overtime_pay)),
            ("restdayOvertimePay", amount_param(self.restday_overtime_pay)),
            ("holidayOvertimePay", amount_param(self.holiday_overtime_pay)),
            ("laborFee", amount_param(self.labor_fee)),
            ("healthFee", amount_param(self.health_fee)),
            ("employmentFee", amount_param(self.employment_fee)),
            ("pensionSelf", amount_param(self.pension_self)),
            ("incomeTax", amount_param(self.income_tax)),
            ("leaveDeduction", amount_param(self.leave_deduction)),
            ("welfareFee", amount_param(self.welfare_fee)),
            ("dormitoryFee", amount_param(self.dormitory_fee)),
            ("groupInsurance", amount_param(self.group_insurance)),
            ("otherDeductions", amount_param(self.other_deductions)),
            ("grossSalary", amount_param(self.gross_salary)),
            ("netSalary", amount_param(self.net_salary)),
            ("bankCode", self.bank_code.clone()),
            ("bankAccount", self.bank_account.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_requires_id_name_and_positive_base() {
        assert!(SalaryConfig::new("E1", "Lin", 30000.0).is_complete());
        assert!(!SalaryConfig::new("", "Lin", 30000.0).is_complete());
        assert!(!SalaryConfig::new("E1", "  ", 30000.0).is_complete());
        assert!(!SalaryConfig::new("E1", "Lin", 0.0).is_complete());
    }

    #[test]
    fn test_config_defaults_payment_day() {
        let config: SalaryConfig =
            serde_json::from_value(json!({"employeeId": "E1", "employeeName": "Lin", "baseSalary": 30000})).unwrap();
        assert_eq!(config.payment_day, DEFAULT_PAYMENT_DAY);
        let pairs = config.query_pairs();
        assert_eq!(pairs[2], ("baseSalary", "30000".to_string()));
        assert!(pairs.contains(&("paymentDay", "5".to_string())));
        assert_eq!(pairs.last().map(|p| p.0), Some("note"));
    }

    #[test]
    fn test_calculation_tolerates_strings_and_gaps() {
        let calc: SalaryCalculation = serde_json::from_value(json!({
            "employeeId": "E1",
            "employeeName": "Lin",
            "yearMonth": "2025-06",
            "baseSalary": "30,000",
            "laborFee": 700,
            "healthFee": null,
            "leaveDeduction": "500",
            "weekdayOvertimePay": 1200.5,
            "grossSalary": 31200.5,
            "netSalary": 30000.5,
            "bankCode": 812
        }))
        .unwrap();

        assert_eq!(calc.base_salary, 30000.0);
        assert_eq!(calc.health_fee, 0.0);
        assert_eq!(calc.total_deductions(), 1200.0);
        assert_eq!(calc.overtime_pay(), 1200.5);
        assert_eq!(calc.bank_code, "812");
        assert_eq!(calc.bank_account, "");

        let pairs = calc.query_pairs();
        assert!(pairs.contains(&("mealAllowance", "0".to_string())));
        assert!(pairs.contains(&("netSalary", "30000.5".to_string())));
    }
}
