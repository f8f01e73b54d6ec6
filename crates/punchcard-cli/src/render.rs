//! Plain text output for each command.

use chrono::NaiveDate;

use punchcard_core::models::{
    AttendanceRecord, PunchLocation, ReviewRequest, SalaryCalculation, SalaryRecord, ShiftSnapshot, UserProfile,
    WeekSchedule,
};
use punchcard_core::utils::{format_currency, format_shift_date, truncate_string};
use punchcard_core::{DayStatus, I18n, MonthCalendar};

const REMARK_WIDTH: usize = 30;

pub fn print_profile(user: &UserProfile, i18n: &I18n) {
    println!("{} ({})", user.name, user.user_id);
    if let Some(ref dept) = user.dept {
        println!("{}: {}", i18n.t("DEPARTMENT"), dept);
    }
    if user.is_admin() {
        println!("{}", i18n.t("ADMIN_ACCESS"));
    }
}

/// One character per status in the grid
fn status_mark(status: DayStatus) -> char {
    match status {
        DayStatus::Normal => ' ',
        DayStatus::Abnormal => '!',
        DayStatus::RepairPending => '?',
        DayStatus::RepairApproved => '+',
        DayStatus::PendingAdjustment => '~',
        DayStatus::NoRecord => ' ',
    }
}

pub fn print_calendar(calendar: &MonthCalendar, i18n: &I18n) {
    println!(
        "{}",
        i18n.t_with(
            "MONTH_YEAR_TEMPLATE",
            &[
                ("year", calendar.month.year().to_string().as_str()),
                ("month", calendar.month.month().to_string().as_str()),
            ],
        )
    );
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");
    for week in calendar.weeks() {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                None => "    ".to_string(),
                Some(day) if day.is_today => format!("[{:>2}]", day.day()),
                Some(day) if day.is_future => format!(" {:>2} ", day.day()),
                Some(day) => format!(" {:>2}{}", day.day(), status_mark(day.status)),
            })
            .collect();
        println!("{}", line.trim_end());
    }

    let legend = [
        DayStatus::Abnormal,
        DayStatus::RepairPending,
        DayStatus::RepairApproved,
        DayStatus::PendingAdjustment,
    ];
    for status in legend {
        let count = calendar.count(status);
        if count > 0 {
            println!("{} {} x{}", status_mark(status), i18n.t(status.label_key()), count);
        }
    }
}

pub fn print_day(date: NaiveDate, records: &[AttendanceRecord], i18n: &I18n) {
    println!("{}", date.format("%Y-%m-%d"));
    if records.is_empty() {
        println!("  {}", i18n.t("NO_RECORDS"));
        return;
    }
    for record in records {
        for punch in &record.record {
            let location = punch.location.as_deref().unwrap_or("");
            println!("  {:<6} {:<8} {}", i18n.t(punch.punch_type.label_key()), punch.time, location);
        }
        if !record.reason.is_empty() {
            println!("  {}", i18n.t(&record.reason));
        }
    }
}

pub fn print_abnormal(records: &[AttendanceRecord], i18n: &I18n) {
    if records.is_empty() {
        println!("{}", i18n.t("NO_ABNORMAL_RECORDS"));
        return;
    }
    for record in records {
        let label = record.punch_types.as_deref().unwrap_or(&record.reason);
        let hint = match record.adjustment_type() {
            Some(t) if record.reason_code().needs_adjustment() => format!("  -> adjust {}", t),
            _ => String::new(),
        };
        println!("{}  {}{}", record.date, i18n.t(label), hint);
    }
}

pub fn print_today_shift(snapshot: &ShiftSnapshot, i18n: &I18n) {
    match snapshot.shift() {
        Some(info) => {
            println!("{}  {}", info.shift_type, info.time_span());
            if let Some(ref location) = info.location {
                println!("{}", location);
            }
        }
        None => println!("{}", i18n.t("NO_SHIFT_TODAY")),
    }
}

pub fn print_week(week: &WeekSchedule, i18n: &I18n) {
    if !week.ok {
        let reason = week.msg.as_deref().unwrap_or("UNKNOWN_ERROR");
        println!("{}", i18n.t(reason));
        return;
    }
    if week.is_empty() {
        println!("{}", i18n.t("NO_UPCOMING_SHIFTS"));
        return;
    }
    for shift in &week.shifts {
        let date = shift.date.as_deref().map(format_shift_date).unwrap_or_default();
        println!("{:<12} {:<10} {}", date, shift.shift_type, shift.time_span());
    }
}

pub fn print_salary(record: &SalaryRecord, i18n: &I18n) {
    println!(
        "{}  {}",
        record.year_month().unwrap_or_default(),
        record.status().unwrap_or_default()
    );
    println!("  {:<12} {:>12}", i18n.t("GROSS_PAY"), format_currency(record.gross()));
    println!("  {:<12} {:>12}", i18n.t("TOTAL_DEDUCTIONS"), format_currency(-record.total_deductions()));
    println!("  {:<12} {:>12}", i18n.t("NET_PAY"), format_currency(record.net()));
}

pub fn print_salary_history(history: &[SalaryRecord], i18n: &I18n) {
    if history.is_empty() {
        println!("{}", i18n.t("NO_SALARY_HISTORY"));
        return;
    }
    for record in history {
        println!(
            "{:<8} {:>12}  {}",
            record.year_month().unwrap_or_default(),
            format_currency(record.net()),
            record.status().unwrap_or_default()
        );
    }
}

pub fn print_salary_calculation(calc: &SalaryCalculation, i18n: &I18n) {
    println!("{} ({})  {}", calc.employee_name, calc.employee_id, calc.year_month);
    let rows = [
        ("SALARY_BASE", calc.base_salary),
        ("SALARY_OVERTIME", calc.overtime_pay()),
        ("SALARY_GROSS", calc.gross_salary),
        ("SALARY_DEDUCTIONS", -calc.total_deductions()),
        ("SALARY_NET", calc.net_salary),
    ];
    for (key, amount) in rows {
        println!("  {:<12} {:>12}", i18n.t(key), format_currency(amount));
    }
}

pub fn print_payroll(rows: &[SalaryRecord], i18n: &I18n) {
    if rows.is_empty() {
        println!("{}", i18n.t("SALARY_NO_HISTORY"));
        return;
    }
    for row in rows {
        println!(
            "{:<10} {:<8} {:<8} {:>12}  {}",
            row.employee_name().unwrap_or_else(|| "--".to_string()),
            row.employee_id().unwrap_or_else(|| "--".to_string()),
            row.year_month().unwrap_or_default(),
            format_currency(row.net()),
            row.status().unwrap_or_default()
        );
    }
}

pub fn print_reviews(requests: &[ReviewRequest], i18n: &I18n) {
    if requests.is_empty() {
        println!("{}", i18n.t("NO_PENDING_REQUESTS"));
        return;
    }
    for req in requests {
        println!(
            "#{:<5} {:<10} {:<18} {:<14} {}",
            req.id,
            req.name,
            req.application_period,
            i18n.t(&req.request_type),
            truncate_string(&req.remark, REMARK_WIDTH)
        );
    }
}

pub fn print_locations(locations: &[PunchLocation], i18n: &I18n) {
    if locations.is_empty() {
        println!("{}", i18n.t("NO_LOCATIONS"));
        return;
    }
    for loc in locations {
        println!("{:<16} {:>10.5} {:>11.5}  {}m", loc.name, loc.lat, loc.lng, loc.radius_m());
    }
}
