//! Punchcard - command line client for the attendance backend.
//!
//! Punch in and out, browse attendance history, shifts and payslips, and
//! handle adjustment reviews from a terminal.

mod hooks;
mod render;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use punchcard_core::api::HttpTransport;
use punchcard_core::models::{MonthKey, PunchType, SalaryConfig};
use punchcard_core::service::DEFAULT_SALARY_HISTORY;
use punchcard_core::{ApiClient, AttendanceService, ClientState, Config, I18n, Translations};

use hooks::TerminalHooks;

/// Months loaded by `prefetch` when no count is given
const DEFAULT_PREFETCH_MONTHS: u32 = 3;

#[derive(Parser)]
#[command(name = "punchcard")]
#[command(version)]
#[command(about = "Attendance, shifts and payroll from the terminal", long_about = None)]
struct Cli {
    /// Also write logs to a daily rotating file
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session token and load the profile
    Login {
        #[arg(short, long)]
        token: String,
    },
    /// Forget the session token
    Logout,
    /// Show who the stored session belongs to
    Status,
    /// Punch in or out
    Punch {
        /// in or out
        punch_type: PunchType,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(short, long, default_value = "punchcard-cli")]
        note: String,
    },
    /// Request an adjustment for a missed punch
    Adjust {
        /// Day of the missed punch (YYYY-MM-DD)
        date: NaiveDate,
        punch_type: PunchType,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Month calendar colored by attendance status
    Calendar {
        /// YYYY-MM, defaults to the current month
        #[arg(short, long)]
        month: Option<MonthKey>,
    },
    /// Punches of one day
    Day { date: NaiveDate },
    /// Days that need an adjustment
    Abnormal {
        #[arg(short, long)]
        month: Option<MonthKey>,
    },
    /// Load recent months ahead of time
    Prefetch {
        #[arg(short, long, default_value_t = DEFAULT_PREFETCH_MONTHS)]
        months: u32,
    },
    /// Scheduled shifts
    Shift {
        #[command(subcommand)]
        which: ShiftCommand,
    },
    /// Payslip for a month
    Salary {
        #[arg(short, long)]
        month: Option<MonthKey>,
    },
    /// Recent payslips
    SalaryHistory {
        #[arg(short, long, default_value_t = DEFAULT_SALARY_HISTORY)]
        limit: u32,
    },
    /// Pending adjustment requests (administrators)
    Review {
        #[command(subcommand)]
        action: ReviewCommand,
    },
    /// Salary settings and monthly payslips (administrators)
    Payroll {
        #[command(subcommand)]
        action: PayrollCommand,
    },
    /// Allowed punch locations
    Locations {
        #[command(subcommand)]
        action: LocationCommand,
    },
    /// Switch the display language
    Lang { code: String },
}

#[derive(Subcommand)]
enum ShiftCommand {
    Today,
    Week,
}

#[derive(Subcommand)]
enum ReviewCommand {
    List,
    Approve { id: String },
    Reject { id: String },
}

#[derive(Subcommand)]
enum PayrollCommand {
    /// Store an employee's standing salary settings
    Set(SalaryArgs),
    /// Calculate an employee's pay for a month
    Calc {
        employee_id: String,
        #[arg(short, long)]
        month: Option<MonthKey>,
        /// Save the result as the month's payslip
        #[arg(long)]
        save: bool,
    },
    /// Payslips of every employee for a month
    List {
        #[arg(short, long)]
        month: Option<MonthKey>,
    },
}

#[derive(clap::Args)]
struct SalaryArgs {
    employee_id: String,
    employee_name: String,
    #[arg(long)]
    base: f64,
    #[arg(long, default_value_t = 0.0)]
    position_allowance: f64,
    #[arg(long, default_value_t = 0.0)]
    meal_allowance: f64,
    #[arg(long, default_value_t = 0.0)]
    transport_allowance: f64,
    #[arg(long, default_value_t = 0.0)]
    attendance_bonus: f64,
    #[arg(long, default_value_t = 0.0)]
    performance_bonus: f64,
    #[arg(long, default_value_t = 0.0)]
    other_allowances: f64,
    #[arg(long, default_value_t = 0.0)]
    labor_fee: f64,
    #[arg(long, default_value_t = 0.0)]
    health_fee: f64,
    #[arg(long, default_value_t = 0.0)]
    employment_fee: f64,
    #[arg(long, default_value_t = 0.0)]
    pension_self: f64,
    #[arg(long, default_value_t = 0.0)]
    income_tax: f64,
    #[arg(long, default_value_t = 0.0)]
    pension_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    welfare_fee: f64,
    #[arg(long, default_value_t = 0.0)]
    dormitory_fee: f64,
    #[arg(long, default_value_t = 0.0)]
    group_insurance: f64,
    #[arg(long, default_value_t = 0.0)]
    other_deductions: f64,
    #[arg(long, default_value = "")]
    bank_code: String,
    #[arg(long, default_value = "")]
    bank_account: String,
    #[arg(long, default_value = "")]
    hire_date: String,
    #[arg(long, default_value_t = punchcard_core::models::payroll::DEFAULT_PAYMENT_DAY)]
    payment_day: u32,
    #[arg(long, default_value = "")]
    note: String,
}

impl From<SalaryArgs> for SalaryConfig {
    fn from(a: SalaryArgs) -> Self {
        SalaryConfig {
            position_allowance: a.position_allowance,
            meal_allowance: a.meal_allowance,
            transport_allowance: a.transport_allowance,
            attendance_bonus: a.attendance_bonus,
            performance_bonus: a.performance_bonus,
            other_allowances: a.other_allowances,
            labor_fee: a.labor_fee,
            health_fee: a.health_fee,
            employment_fee: a.employment_fee,
            pension_self: a.pension_self,
            income_tax: a.income_tax,
            pension_self_rate: a.pension_rate,
            welfare_fee: a.welfare_fee,
            dormitory_fee: a.dormitory_fee,
            group_insurance: a.group_insurance,
            other_deductions: a.other_deductions,
            bank_code: a.bank_code,
            bank_account: a.bank_account,
            hire_date: a.hire_date,
            payment_day: a.payment_day,
            note: a.note,
            ..SalaryConfig::new(a.employee_id, a.employee_name, a.base)
        }
    }
}

#[derive(Subcommand)]
enum LocationCommand {
    List,
    Add {
        name: String,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lng: f64,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    let (file_layer, guard) = match log_file.then(Config::log_dir) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, "punchcard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Log file disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

/// Translation table for `lang`: local directory first, then the remote
/// base URL, else an empty table that renders keys as-is.
async fn load_translations(config: &Config, transport: &HttpTransport, lang: &str) -> Translations {
    if let Some(ref dir) = config.i18n_dir {
        match Translations::load(dir, lang) {
            Ok(table) => return table,
            Err(e) => warn!(lang = lang, error = %e, "Local translations unavailable"),
        }
    }
    if let Some(ref url) = config.i18n_url {
        match Translations::fetch(transport.client(), url, lang).await {
            Ok(table) => return table,
            Err(e) => warn!(lang = lang, error = %e, "Remote translations unavailable"),
        }
    }
    Translations::new(lang, HashMap::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file);

    let config = Config::load().context("Failed to load configuration")?;
    let state = ClientState::open(Config::state_path()?)?;
    let lang = state.lang().unwrap_or(&config.default_lang).to_string();

    let transport = HttpTransport::new(config.request_timeout_secs)?;
    let i18n = Arc::new(I18n::new(load_translations(&config, &transport, &lang).await));
    let client = ApiClient::new(config.require_api_url()?, transport.clone(), Arc::new(TerminalHooks), i18n.clone())?;
    let service = AttendanceService::new(client, state, i18n);

    info!(lang = %lang, signed_in = service.is_signed_in(), "Punchcard starting");
    run(&service, &config, &transport, cli.command).await
}

async fn run(service: &AttendanceService, config: &Config, transport: &HttpTransport, command: Commands) -> Result<()> {
    let today = Local::now().date_naive();
    let this_month = MonthKey::from_date(today);
    let i18n = service.i18n();

    match command {
        Commands::Login { token } => {
            service.sign_in(&token)?;
            let boot = service.init_app().await?;
            render::print_profile(&boot.user, i18n);
            if !boot.abnormal_records.is_empty() {
                println!();
                render::print_abnormal(&boot.abnormal_records, i18n);
            }
        }
        Commands::Logout => {
            service.sign_out().await?;
            println!("{}", i18n.t("LOGOUT_SUCCESS"));
        }
        Commands::Status => match service.check_session().await? {
            Some(user) => render::print_profile(&user, i18n),
            None => println!("{}", i18n.t("SESSION_EXPIRED")),
        },
        Commands::Punch {
            punch_type,
            lat,
            lng,
            note,
        } => {
            // A failed shift lookup must not block punching
            match service.punch_warning(today, Local::now().time()).await {
                Ok(Some(warning)) => eprintln!("{}", warning),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Shift check failed, punching anyway"),
            }
            service.punch(punch_type, lat, lng, &note).await?;
        }
        Commands::Adjust {
            date,
            punch_type,
            lat,
            lng,
            note,
        } => {
            service.adjust_punch(date, punch_type, lat, lng, note.as_deref()).await?;
        }
        Commands::Calendar { month } => {
            let calendar = service.month_calendar(month.unwrap_or(this_month), today).await?;
            render::print_calendar(&calendar, i18n);
        }
        Commands::Day { date } => {
            let records = service.daily_records(date).await?;
            render::print_day(date, &records, i18n);
        }
        Commands::Abnormal { month } => {
            let records = service.abnormal_records(month.unwrap_or(this_month)).await?;
            render::print_abnormal(&records, i18n);
        }
        Commands::Prefetch { months } => {
            let keys: Vec<MonthKey> = std::iter::successors(Some(this_month), |m| Some(m.prev()))
                .take(months as usize)
                .collect();
            let loaded = service.prefetch_months(&keys).await;
            println!("{}/{}", loaded, keys.len());
        }
        Commands::Shift { which } => match which {
            ShiftCommand::Today => {
                let snapshot = service.today_shift(today).await?;
                render::print_today_shift(&snapshot, i18n);
            }
            ShiftCommand::Week => {
                let week = service.week_shift(today).await?;
                render::print_week(&week, i18n);
            }
        },
        Commands::Salary { month } => {
            let month = month.unwrap_or(this_month);
            match service.salary(month).await? {
                Some(record) => render::print_salary(&record, i18n),
                None => println!("{}", i18n.t_with("NO_SALARY_RECORD", &[("month", month.to_string().as_str())])),
            }
        }
        Commands::SalaryHistory { limit } => {
            let history = service.salary_history(limit).await?;
            render::print_salary_history(&history, i18n);
        }
        Commands::Review { action } => match action {
            ReviewCommand::List => {
                let requests = service.review_requests().await?;
                render::print_reviews(&requests, i18n);
            }
            ReviewCommand::Approve { id } => {
                service.approve_review(&id).await?;
            }
            ReviewCommand::Reject { id } => {
                service.reject_review(&id).await?;
            }
        },
        Commands::Payroll { action } => match action {
            PayrollCommand::Set(args) => {
                let config = SalaryConfig::from(args);
                service.set_employee_salary(&config).await?;
            }
            PayrollCommand::Calc { employee_id, month, save } => {
                let month = month.unwrap_or(this_month);
                if let Some(calc) = service.calculate_salary(&employee_id, month).await? {
                    render::print_salary_calculation(&calc, i18n);
                    if save {
                        service.save_monthly_salary(&calc).await?;
                    }
                }
            }
            PayrollCommand::List { month } => {
                let rows = service.all_monthly_salary(month.unwrap_or(this_month)).await?;
                render::print_payroll(&rows, i18n);
            }
        },
        Commands::Locations { action } => match action {
            LocationCommand::List => {
                let locations = service.locations().await?;
                render::print_locations(&locations, i18n);
            }
            LocationCommand::Add { name, lat, lng } => {
                service.add_location(&name, lat, lng).await?;
            }
        },
        Commands::Lang { code } => {
            let table = load_translations(config, transport, &code).await;
            service.set_language(table)?;
            println!("{}", service.i18n().lang());
        }
    }
    Ok(())
}
