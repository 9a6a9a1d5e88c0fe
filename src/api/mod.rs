use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Account, CalculatorSettings, Expense, FilingStatus, Household, InputError, OtherIncome,
    ProjectionDetail, ProjectionInputs, ScenarioSummary, SpecialExpense,
    SweepGrid, TaxMode, WithdrawalStrategy, run_sweep, try_run_projection, validate_grid,
    validate_inputs,
};

const DEFAULT_SWEEP_RETIREMENT_AGES: [u32; 5] = [60, 62, 65, 67, 70];
const DEFAULT_SWEEP_GROWTH_RATES: [f64; 3] = [0.04, 0.06, 0.08];

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HouseholdPayload {
    birth_year: Option<i32>,
    life_expectancy: Option<u32>,
    include_spouse: Option<bool>,
    spouse_birth_year: Option<i32>,
    spouse_life_expectancy: Option<u32>,
    include_ssa: Option<bool>,
    include_spouse_ssa: Option<bool>,
    annual_income: Option<f64>,
    spouse_annual_income: Option<f64>,
    ssa_benefit: Option<f64>,
    spouse_ssa_benefit: Option<f64>,
}

/// Settings overrides. A present-but-empty object means "use every default"; an absent
/// one means settings were never configured.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPayload {
    current_year: Option<i32>,
    retirement_age: Option<u32>,
    years_to_retirement: Option<u32>,
    annual_retirement_expense: Option<f64>,
    pre_retirement_growth_rate: Option<f64>,
    post_retirement_growth_rate: Option<f64>,
    capital_gains_tax_rate: Option<f64>,
    income_tax_rate: Option<f64>,
    inflation_rate: Option<f64>,
    enable_borrowing: Option<bool>,
    borrowing_rate: Option<f64>,
    ssa_start_age: Option<u32>,
    withdrawal_strategy: Option<WithdrawalStrategy>,
    secondary_withdrawal_strategy: Option<WithdrawalStrategy>,
    filing_status: Option<FilingStatus>,
    tax_mode: Option<TaxMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionPayload {
    household: HouseholdPayload,
    settings: Option<SettingsPayload>,
    accounts: Vec<Account>,
    expenses: Vec<Expense>,
    other_income: Vec<OtherIncome>,
    special_expenses: Vec<SpecialExpense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenariosPayload {
    #[serde(flatten)]
    projection: ProjectionPayload,
    retirement_ages: Option<Vec<u32>>,
    pre_retirement_growth_rates: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub projections: Vec<ProjectionDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosResponse {
    pub scenarios: Vec<ScenarioSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn household_from_payload(payload: HouseholdPayload) -> Household {
    let mut household = Household::default();

    household.birth_year = payload.birth_year;
    if let Some(v) = payload.life_expectancy {
        household.life_expectancy = v;
    }
    if let Some(v) = payload.include_spouse {
        household.include_spouse = v;
    }
    household.spouse_birth_year = payload.spouse_birth_year;
    household.spouse_life_expectancy = payload.spouse_life_expectancy;
    if let Some(v) = payload.include_ssa {
        household.include_ssa = v;
    }
    if let Some(v) = payload.include_spouse_ssa {
        household.include_spouse_ssa = v;
    }
    if let Some(v) = payload.annual_income {
        household.annual_income = v;
    }
    if let Some(v) = payload.spouse_annual_income {
        household.spouse_annual_income = v;
    }
    household.ssa_benefit = payload.ssa_benefit;
    household.spouse_ssa_benefit = payload.spouse_ssa_benefit;

    household
}

fn settings_from_payload(payload: SettingsPayload) -> CalculatorSettings {
    let mut settings = CalculatorSettings::default();

    if let Some(v) = payload.current_year {
        settings.current_year = v;
    }
    if payload.retirement_age.is_some() || payload.years_to_retirement.is_some() {
        settings.retirement_age = payload.retirement_age;
        settings.years_to_retirement = payload.years_to_retirement;
    }
    if let Some(v) = payload.annual_retirement_expense {
        settings.annual_retirement_expense = v;
    }
    if let Some(v) = payload.pre_retirement_growth_rate {
        settings.pre_retirement_growth_rate = v;
    }
    if let Some(v) = payload.post_retirement_growth_rate {
        settings.post_retirement_growth_rate = v;
    }
    if let Some(v) = payload.capital_gains_tax_rate {
        settings.capital_gains_tax_rate = v;
    }
    if let Some(v) = payload.income_tax_rate {
        settings.income_tax_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        settings.inflation_rate = v;
    }
    if let Some(v) = payload.enable_borrowing {
        settings.enable_borrowing = v;
    }
    if let Some(v) = payload.borrowing_rate {
        settings.borrowing_rate = v;
    }
    if let Some(v) = payload.ssa_start_age {
        settings.ssa_start_age = v;
    }
    if let Some(v) = payload.withdrawal_strategy {
        settings.withdrawal_strategy = v;
    }
    if let Some(v) = payload.secondary_withdrawal_strategy {
        settings.secondary_withdrawal_strategy = v;
    }
    settings.filing_status = payload.filing_status;
    if let Some(v) = payload.tax_mode {
        settings.tax_mode = v;
    }

    settings
}

impl ProjectionPayload {
    pub fn into_inputs(self) -> Result<ProjectionInputs, InputError> {
        let inputs = ProjectionInputs {
            household: household_from_payload(self.household),
            settings: self.settings.map(settings_from_payload),
            accounts: self.accounts,
            expenses: self.expenses,
            other_income: self.other_income,
            special_expenses: self.special_expenses,
        };
        validate_inputs(&inputs)?;
        Ok(inputs)
    }
}

impl ScenariosPayload {
    pub fn into_request(self) -> Result<(ProjectionInputs, SweepGrid), InputError> {
        let grid = SweepGrid {
            retirement_ages: self
                .retirement_ages
                .unwrap_or_else(|| DEFAULT_SWEEP_RETIREMENT_AGES.to_vec()),
            pre_retirement_growth_rates: self
                .pre_retirement_growth_rates
                .unwrap_or_else(|| DEFAULT_SWEEP_GROWTH_RATES.to_vec()),
        };
        validate_grid(&grid)?;
        Ok((self.projection.into_inputs()?, grid))
    }
}

/// Projection for an already-validated request. Missing prerequisites are not an error
/// for callers: they get an empty projection and a message saying what to configure.
pub fn build_projection_response(inputs: &ProjectionInputs) -> ProjectionResponse {
    match try_run_projection(inputs) {
        Ok(projections) => ProjectionResponse {
            projections,
            message: None,
        },
        Err(err) => {
            warn!("{err}");
            ProjectionResponse {
                projections: Vec::new(),
                message: Some(err.to_string()),
            }
        }
    }
}

pub fn build_scenarios_response(inputs: &ProjectionInputs, grid: &SweepGrid) -> ScenariosResponse {
    match run_sweep(inputs, grid) {
        Ok(scenarios) => ScenariosResponse {
            scenarios,
            message: None,
        },
        Err(err) => ScenariosResponse {
            scenarios: Vec::new(),
            message: Some(err.to_string()),
        },
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/api/projection", post(projection_handler))
        .route("/api/scenarios", post(scenarios_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("retirement projection API listening on http://{addr}");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    info!("POST /api/projection");
    let inputs = match payload.into_inputs() {
        Ok(inputs) => inputs,
        Err(err) => {
            warn!("rejected projection payload: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    json_response(StatusCode::OK, build_projection_response(&inputs))
}

async fn scenarios_handler(Json(payload): Json<ScenariosPayload>) -> Response {
    info!("POST /api/scenarios");
    let (inputs, grid) = match payload.into_request() {
        Ok(request) => request,
        Err(err) => {
            warn!("rejected scenarios payload: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    json_response(StatusCode::OK, build_scenarios_response(&inputs, &grid))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
