mod error;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use error::InputError;

use crate::core::{
    AmortizationResult, DEFAULT_PREPAYMENT_TOLERANCE, LoanOffer, LoanParameters,
    PrepaymentSearchConfig, PrepaymentSolveResult, ScenarioComparison,
    YearSummary, compare_loan_offers, compare_prepayment_scenarios, monthly_installment,
    simulate_amortization, solve_required_prepayment_with, yearly_summary,
};

const MAX_TENURE_YEARS: u32 = 40;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliView {
    Monthly,
    Yearly,
    Compare,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiView {
    #[serde(alias = "month", alias = "schedule")]
    Monthly,
    #[serde(alias = "year", alias = "annual")]
    Yearly,
    #[serde(alias = "comparison")]
    Compare,
}

impl From<ApiView> for CliView {
    fn from(value: ApiView) -> Self {
        match value {
            ApiView::Monthly => CliView::Monthly,
            ApiView::Yearly => CliView::Yearly,
            ApiView::Compare => CliView::Compare,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoanPayload {
    loan_amount: Option<f64>,
    interest_rate: Option<f64>,
    tenure: Option<u32>,
    annual_prepayment: Option<f64>,
    prepayment_increase: Option<f64>,
    emi_increase: Option<f64>,
    target_tenure: Option<u32>,
    tolerance: Option<f64>,
    view: Option<ApiView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferPayload {
    #[serde(default)]
    name: Option<String>,
    loan_amount: f64,
    interest_rate: f64,
    tenure: u32,
}

#[derive(Debug, Deserialize)]
struct OffersPayload {
    offers: Vec<OfferPayload>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "emi",
    about = "Loan EMI calculator with amortization schedules and prepayment planning"
)]
struct Cli {
    #[arg(long, default_value_t = 5_000_000.0, help = "Loan principal")]
    loan_amount: f64,
    #[arg(
        long,
        default_value_t = 8.5,
        help = "Nominal annual interest rate in percent, e.g. 8.5"
    )]
    interest_rate: f64,
    #[arg(long, default_value_t = 20, help = "Loan tenure in years")]
    tenure: u32,
    #[arg(
        long,
        default_value_t = 100_000.0,
        help = "Lumpsum prepaid at the end of every loan year"
    )]
    annual_prepayment: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Yearly growth of the prepayment in percent"
    )]
    prepayment_increase: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Yearly growth of the monthly installment in percent"
    )]
    emi_increase: f64,
    #[arg(
        long,
        help = "Solve for the flat annual prepayment that closes the loan in this many years"
    )]
    target_tenure: Option<u32>,
    #[arg(
        long,
        default_value_t = DEFAULT_PREPAYMENT_TOLERANCE,
        help = "Prepayment search stops once the bracket is this narrow"
    )]
    tolerance: f64,
    #[arg(long, value_enum, default_value_t = CliView::Monthly)]
    view: CliView,
}

#[derive(Debug, Clone)]
struct LoanRequest {
    params: LoanParameters,
    search: PrepaymentSearchConfig,
    view: CliView,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallmentResponse {
    monthly_installment: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    monthly_installment: f64,
    #[serde(flatten)]
    result: AmortizationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    yearly: Option<Vec<YearSummary>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliReport {
    #[serde(flatten)]
    body: CliBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_prepayment: Option<PrepaymentSolveResult>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CliBody {
    Schedule(ScheduleResponse),
    Compare(ScenarioComparison),
}

fn check_finite(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::field(field, "must be a finite number"))
    }
}

fn validate_loan(
    amount_field: &'static str,
    amount: f64,
    rate_field: &'static str,
    rate: f64,
    tenure_field: &'static str,
    tenure: u32,
) -> Result<(), InputError> {
    check_finite(amount_field, amount)?;
    if amount <= 0.0 {
        return Err(InputError::field(amount_field, "must be > 0"));
    }

    check_finite(rate_field, rate)?;
    if !(0.0..=100.0).contains(&rate) {
        return Err(InputError::field(rate_field, "must be between 0 and 100"));
    }

    if !(1..=MAX_TENURE_YEARS).contains(&tenure) {
        return Err(InputError::field(
            tenure_field,
            format!("must be between 1 and {MAX_TENURE_YEARS} years"),
        ));
    }
    Ok(())
}

fn build_params(cli: &Cli) -> Result<LoanRequest, InputError> {
    validate_loan(
        "--loan-amount",
        cli.loan_amount,
        "--interest-rate",
        cli.interest_rate,
        "--tenure",
        cli.tenure,
    )?;

    check_finite("--annual-prepayment", cli.annual_prepayment)?;
    if cli.annual_prepayment < 0.0 {
        return Err(InputError::field("--annual-prepayment", "must be >= 0"));
    }

    for (field, value) in [
        ("--prepayment-increase", cli.prepayment_increase),
        ("--emi-increase", cli.emi_increase),
    ] {
        check_finite(field, value)?;
        if value <= -100.0 {
            return Err(InputError::field(field, "must be > -100"));
        }
    }

    if cli.target_tenure == Some(0) {
        return Err(InputError::field("--target-tenure", "must be >= 1"));
    }

    check_finite("--tolerance", cli.tolerance)?;
    if cli.tolerance <= 0.0 {
        return Err(InputError::field("--tolerance", "must be > 0"));
    }

    let mut params = LoanParameters::new(cli.loan_amount, cli.interest_rate, cli.tenure)
        .with_prepayment(cli.annual_prepayment, cli.prepayment_increase)
        .with_emi_increase(cli.emi_increase);
    if let Some(target) = cli.target_tenure {
        params = params.with_target_tenure(target);
    }

    Ok(LoanRequest {
        params,
        search: PrepaymentSearchConfig {
            tolerance: cli.tolerance,
            ..Default::default()
        },
        view: cli.view,
    })
}

fn build_offers(payload: OffersPayload) -> Result<Vec<LoanOffer>, InputError> {
    payload
        .offers
        .into_iter()
        .enumerate()
        .map(|(index, offer)| {
            validate_loan(
                "offers[].loanAmount",
                offer.loan_amount,
                "offers[].interestRate",
                offer.interest_rate,
                "offers[].tenure",
                offer.tenure,
            )?;
            Ok(LoanOffer {
                name: offer
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| format!("Offer {}", index + 1)),
                principal: offer.loan_amount,
                annual_rate_percent: offer.interest_rate,
                tenure_years: offer.tenure,
            })
        })
        .collect()
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/emi", get(emi_get_handler).post(emi_post_handler))
        .route(
            "/api/schedule",
            get(schedule_get_handler).post(schedule_post_handler),
        )
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route(
            "/api/required-prepayment",
            get(required_prepayment_get_handler).post(required_prepayment_post_handler),
        )
        .route("/api/offers", post(offers_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("EMI HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/emi");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

type QueryPayload<T> = Result<Query<T>, QueryRejection>;
type JsonPayload<T> = Result<Json<T>, JsonRejection>;

fn from_query<T>(payload: QueryPayload<T>) -> Result<T, InputError> {
    payload
        .map(|Query(payload)| payload)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()))
}

fn from_json<T>(payload: JsonPayload<T>) -> Result<T, InputError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| InputError::InvalidPayload(rejection.body_text()))
}

async fn emi_get_handler(payload: QueryPayload<LoanPayload>) -> Response {
    emi_handler_impl(from_query(payload))
}

async fn emi_post_handler(payload: JsonPayload<LoanPayload>) -> Response {
    emi_handler_impl(from_json(payload))
}

async fn schedule_get_handler(payload: QueryPayload<LoanPayload>) -> Response {
    schedule_handler_impl(from_query(payload))
}

async fn schedule_post_handler(payload: JsonPayload<LoanPayload>) -> Response {
    schedule_handler_impl(from_json(payload))
}

async fn compare_get_handler(payload: QueryPayload<LoanPayload>) -> Response {
    compare_handler_impl(from_query(payload))
}

async fn compare_post_handler(payload: JsonPayload<LoanPayload>) -> Response {
    compare_handler_impl(from_json(payload))
}

async fn required_prepayment_get_handler(payload: QueryPayload<LoanPayload>) -> Response {
    required_prepayment_handler_impl(from_query(payload))
}

async fn required_prepayment_post_handler(payload: JsonPayload<LoanPayload>) -> Response {
    required_prepayment_handler_impl(from_json(payload))
}

async fn offers_handler(payload: JsonPayload<OffersPayload>) -> Response {
    match from_json(payload).and_then(build_offers) {
        Ok(offers) => json_response(StatusCode::OK, compare_loan_offers(&offers)),
        Err(err) => reject(err),
    }
}

fn emi_handler_impl(payload: Result<LoanPayload, InputError>) -> Response {
    match payload.and_then(loan_request_from_payload) {
        Ok(request) => json_response(StatusCode::OK, build_installment_response(&request)),
        Err(err) => reject(err),
    }
}

fn schedule_handler_impl(payload: Result<LoanPayload, InputError>) -> Response {
    match payload.and_then(loan_request_from_payload) {
        Ok(request) => json_response(StatusCode::OK, build_schedule_response(&request)),
        Err(err) => reject(err),
    }
}

fn compare_handler_impl(payload: Result<LoanPayload, InputError>) -> Response {
    match payload.and_then(loan_request_from_payload) {
        Ok(request) => json_response(
            StatusCode::OK,
            compare_prepayment_scenarios(&request.params),
        ),
        Err(err) => reject(err),
    }
}

fn required_prepayment_handler_impl(payload: Result<LoanPayload, InputError>) -> Response {
    match payload.and_then(required_prepayment_from_payload) {
        Ok(solved) => json_response(StatusCode::OK, solved),
        Err(err) => reject(err),
    }
}

fn required_prepayment_from_payload(
    payload: LoanPayload,
) -> Result<PrepaymentSolveResult, InputError> {
    let request = loan_request_from_payload(payload)?;
    if request.params.target_tenure_years.is_none() {
        return Err(InputError::field("targetTenure", "is required"));
    }
    solve_for_target(&request)
}

fn reject(err: InputError) -> Response {
    log::warn!("rejected request: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
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

#[cfg(test)]
fn loan_request_from_json(json: &str) -> Result<LoanRequest, InputError> {
    let payload = serde_json::from_str::<LoanPayload>(json)
        .map_err(|e| InputError::InvalidPayload(e.to_string()))?;
    loan_request_from_payload(payload)
}

fn loan_request_from_payload(payload: LoanPayload) -> Result<LoanRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.loan_amount {
        cli.loan_amount = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.tenure {
        cli.tenure = v;
    }
    if let Some(v) = payload.annual_prepayment {
        cli.annual_prepayment = v;
    }
    if let Some(v) = payload.prepayment_increase {
        cli.prepayment_increase = v;
    }
    if let Some(v) = payload.emi_increase {
        cli.emi_increase = v;
    }
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }
    if let Some(v) = payload.view {
        cli.view = v.into();
    }
    cli.target_tenure = payload.target_tenure;

    build_params(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        loan_amount: 5_000_000.0,
        interest_rate: 8.5,
        tenure: 20,
        annual_prepayment: 100_000.0,
        prepayment_increase: 0.0,
        emi_increase: 0.0,
        target_tenure: None,
        tolerance: DEFAULT_PREPAYMENT_TOLERANCE,
        view: CliView::Monthly,
    }
}

fn build_installment_response(request: &LoanRequest) -> InstallmentResponse {
    let params = &request.params;
    InstallmentResponse {
        monthly_installment: monthly_installment(
            params.principal,
            params.annual_rate_percent,
            params.tenure_years,
        ),
    }
}

fn build_schedule_response(request: &LoanRequest) -> ScheduleResponse {
    let result = simulate_amortization(&request.params);
    let yearly = (request.view == CliView::Yearly).then(|| yearly_summary(&result.schedule));
    ScheduleResponse {
        monthly_installment: build_installment_response(request).monthly_installment,
        result,
        yearly,
    }
}

fn solve_for_target(request: &LoanRequest) -> Result<PrepaymentSolveResult, InputError> {
    solve_required_prepayment_with(&request.params, request.search).map_err(InputError::from)
}

fn build_cli_report(cli: &Cli) -> Result<CliReport, InputError> {
    let request = build_params(cli)?;
    let body = match request.view {
        CliView::Compare => CliBody::Compare(compare_prepayment_scenarios(&request.params)),
        CliView::Monthly | CliView::Yearly => CliBody::Schedule(build_schedule_response(&request)),
    };
    let required_prepayment = match request.params.target_tenure_years {
        Some(_) => Some(solve_for_target(&request)?),
        None => None,
    };
    Ok(CliReport {
        body,
        required_prepayment,
    })
}

/// Parses process arguments, prints the JSON report and returns the exit code.
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    let report = match build_cli_report(&cli) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err}");
            return 2;
        }
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(err) => {
            eprintln!("error: failed to encode report: {err}");
            1
        }
    }
}
