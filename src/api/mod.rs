use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::core::{
    BudgetSolveConfig, BudgetSolveIteration, BudgetSolveResult, DebtAccount, DebtProgress, Inputs,
    PayoffPlan, Strategy, TimelinePoint, projected_payoff_date, simulate, solve_extra_budget,
};

const DEFAULT_SOLVE_TOLERANCE: f64 = 1.0;
const DEFAULT_SOLVE_MAX_ITERATIONS: u32 = 32;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Snowball,
    Avalanche,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(alias = "lowest-balance-first", alias = "lowestBalanceFirst")]
    Snowball,
    #[serde(alias = "highest-rate-first", alias = "highestRateFirst")]
    Avalanche,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Snowball => CliStrategy::Snowball,
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
        }
    }
}

impl From<Strategy> for ApiStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Snowball => ApiStrategy::Snowball,
            Strategy::Avalanche => ApiStrategy::Avalanche,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebtPayload {
    id: Option<String>,
    name: Option<String>,
    lender: Option<String>,
    principal: Option<f64>,
    balance: f64,
    #[serde(alias = "rate", alias = "annualRate")]
    annual_rate_percent: f64,
    #[serde(alias = "minPayment")]
    minimum_payment: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    debts: Vec<DebtPayload>,
    strategy: Option<ApiStrategy>,
    #[serde(alias = "extraBudget")]
    extra_monthly_budget: Option<f64>,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolveBudgetPayload {
    debts: Vec<DebtPayload>,
    strategy: Option<ApiStrategy>,
    target_months: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    strategy: ApiStrategy,
    total_months: u32,
    truncated: bool,
    total_interest_paid: f64,
    interest_saved_estimate: f64,
    projected_payoff_date: Option<NaiveDate>,
    ordered_debts: Vec<DebtProgress>,
    timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveIterationView {
    iteration: u32,
    lower_bound: f64,
    upper_bound: f64,
    candidate_budget: f64,
    total_months: u32,
}

impl From<&BudgetSolveIteration> for SolveIterationView {
    fn from(value: &BudgetSolveIteration) -> Self {
        Self {
            iteration: value.iteration,
            lower_bound: value.lower_bound,
            upper_bound: value.upper_bound,
            candidate_budget: value.candidate_budget,
            total_months: value.total_months,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveBudgetResponse {
    strategy: ApiStrategy,
    target_months: u32,
    solved_budget: Option<f64>,
    achieved_months: Option<u32>,
    achieved_total_interest: Option<f64>,
    projected_payoff_date: Option<NaiveDate>,
    converged: bool,
    feasible: bool,
    message: String,
    iterations: Vec<SolveIterationView>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt payoff planner (snowball/avalanche amortization simulator); run `payoff serve [port]` for the HTTP API"
)]
pub struct Cli {
    #[arg(long, help = "Path to a JSON array of debt accounts (the stored snapshot)")]
    debts_file: PathBuf,
    #[arg(
        long,
        value_enum,
        default_value_t = CliStrategy::Avalanche,
        help = "Payoff order: smallest balance first (snowball) or highest rate first (avalanche)"
    )]
    strategy: CliStrategy,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Extra amount directed at the top-priority debt each month, on top of all minimum payments"
    )]
    extra_monthly_budget: f64,
    #[arg(long, help = "Anchor date (YYYY-MM-DD) used to project the payoff calendar date")]
    as_of: Option<NaiveDate>,
    #[arg(
        long,
        help = "Solve for the smallest extra monthly budget that clears every debt within this many months, instead of simulating"
    )]
    target_months: Option<u32>,
}

fn build_debts(payloads: Vec<DebtPayload>) -> Vec<DebtAccount> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            let id = payload
                .id
                .unwrap_or_else(|| format!("debt-{}", index + 1));
            DebtAccount {
                name: payload.name.unwrap_or_else(|| id.clone()),
                lender: payload.lender.unwrap_or_default(),
                principal: payload.principal.unwrap_or(payload.balance),
                balance: payload.balance,
                annual_rate_percent: payload.annual_rate_percent,
                minimum_payment: payload.minimum_payment,
                id,
            }
        })
        .collect()
}

fn build_inputs(
    debts: Vec<DebtPayload>,
    strategy: Option<ApiStrategy>,
    extra_monthly_budget: Option<f64>,
) -> Inputs {
    Inputs {
        debts: build_debts(debts),
        strategy: strategy
            .map(|s| CliStrategy::from(s).into())
            .unwrap_or(Strategy::Avalanche),
        extra_monthly_budget: extra_monthly_budget.unwrap_or(0.0),
    }
}

fn default_solve_config(inputs: &Inputs, target_months: u32) -> BudgetSolveConfig {
    let total_balance: f64 = inputs.debts.iter().map(|d| d.balance).sum();
    BudgetSolveConfig {
        target_months,
        search_min: 0.0,
        search_max: total_balance,
        tolerance: DEFAULT_SOLVE_TOLERANCE,
        max_iterations: DEFAULT_SOLVE_MAX_ITERATIONS,
    }
}

fn simulate_response_from_payload(payload: SimulatePayload) -> Result<SimulateResponse, String> {
    let inputs = build_inputs(payload.debts, payload.strategy, payload.extra_monthly_budget);
    let plan = simulate(&inputs).map_err(|e| e.to_string())?;
    Ok(build_simulate_response(inputs.strategy, payload.as_of, plan))
}

fn build_simulate_response(
    strategy: Strategy,
    as_of: Option<NaiveDate>,
    plan: PayoffPlan,
) -> SimulateResponse {
    let projected_payoff_date =
        as_of.and_then(|date| projected_payoff_date(date, plan.total_months));
    SimulateResponse {
        strategy: strategy.into(),
        total_months: plan.total_months,
        truncated: plan.truncated,
        total_interest_paid: plan.total_interest_paid,
        interest_saved_estimate: plan.interest_saved_estimate,
        projected_payoff_date,
        ordered_debts: plan.ordered_debts,
        timeline: plan.timeline,
    }
}

fn solve_response_from_payload(payload: SolveBudgetPayload) -> Result<SolveBudgetResponse, String> {
    let target_months = payload
        .target_months
        .ok_or_else(|| "targetMonths is required".to_string())?;
    let inputs = build_inputs(payload.debts, payload.strategy, None);

    let mut config = default_solve_config(&inputs, target_months);
    if let Some(v) = payload.search_min {
        config.search_min = v;
    }
    if let Some(v) = payload.search_max {
        config.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        config.max_iterations = v;
    }

    let result = solve_extra_budget(&inputs, config).map_err(|e| e.to_string())?;
    Ok(build_solve_response(inputs.strategy, payload.as_of, result))
}

fn build_solve_response(
    strategy: Strategy,
    as_of: Option<NaiveDate>,
    result: BudgetSolveResult,
) -> SolveBudgetResponse {
    let projected_payoff_date = match (as_of, result.achieved_months) {
        (Some(date), Some(months)) => projected_payoff_date(date, months),
        _ => None,
    };
    SolveBudgetResponse {
        strategy: strategy.into(),
        target_months: result.target_months,
        solved_budget: result.solved_budget,
        achieved_months: result.achieved_months,
        achieved_total_interest: result.achieved_total_interest,
        projected_payoff_date,
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
        iterations: result.iterations.iter().map(SolveIterationView::from).collect(),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/simulate", post(simulate_handler))
        .route("/api/solve-budget", post(solve_budget_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("debt payoff API listening on http://{addr}");
    tracing::info!("simulate: POST http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(Json(payload): Json<SimulatePayload>) -> Response {
    match simulate_response_from_payload(payload) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            tracing::debug!("simulate request rejected: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn solve_budget_handler(Json(payload): Json<SolveBudgetPayload>) -> Response {
    match solve_response_from_payload(payload) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            tracing::debug!("solve request rejected: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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

pub fn run_plan(cli: Cli) -> Result<(), String> {
    let raw = std::fs::read_to_string(&cli.debts_file)
        .map_err(|e| format!("failed to read {}: {e}", cli.debts_file.display()))?;
    let payloads: Vec<DebtPayload> = serde_json::from_str(&raw)
        .map_err(|e| format!("invalid debts file {}: {e}", cli.debts_file.display()))?;

    let inputs = Inputs {
        debts: build_debts(payloads),
        strategy: cli.strategy.into(),
        extra_monthly_budget: cli.extra_monthly_budget,
    };

    let rendered = match cli.target_months {
        Some(target_months) => {
            let config = default_solve_config(&inputs, target_months);
            let result = solve_extra_budget(&inputs, config).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&build_solve_response(
                inputs.strategy,
                cli.as_of,
                result,
            ))
        }
        None => {
            let plan = simulate(&inputs).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&build_simulate_response(
                inputs.strategy,
                cli.as_of,
                plan,
            ))
        }
    }
    .map_err(|e| format!("failed to serialize result: {e}"))?;

    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
fn simulate_payload_from_json(json: &str) -> Result<SimulatePayload, String> {
    serde_json::from_str::<SimulatePayload>(json).map_err(|e| format!("Invalid API JSON payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn simulate_payload_parses_camel_case_keys_and_aliases() {
        let json = r#"{
          "debts": [
            {"id": "visa", "name": "Visa card", "lender": "Big Bank", "balance": 500, "rate": 12, "minPayment": 25},
            {"balance": 1500, "annualRatePercent": 8.5, "minimumPayment": 60}
          ],
          "strategy": "snowball",
          "extraMonthlyBudget": 100,
          "asOf": "2026-08-06"
        }"#;
        let payload = simulate_payload_from_json(json).expect("json should parse");
        let inputs = build_inputs(payload.debts, payload.strategy, payload.extra_monthly_budget);

        assert_eq!(inputs.strategy, Strategy::Snowball);
        assert_approx(inputs.extra_monthly_budget, 100.0);
        assert_eq!(inputs.debts.len(), 2);

        let visa = &inputs.debts[0];
        assert_eq!(visa.id, "visa");
        assert_eq!(visa.name, "Visa card");
        assert_eq!(visa.lender, "Big Bank");
        assert_approx(visa.principal, 500.0);
        assert_approx(visa.annual_rate_percent, 12.0);
        assert_approx(visa.minimum_payment, 25.0);

        let unnamed = &inputs.debts[1];
        assert_eq!(unnamed.id, "debt-2");
        assert_eq!(unnamed.name, "debt-2");
        assert_eq!(unnamed.lender, "");
        assert_approx(unnamed.annual_rate_percent, 8.5);
        assert_eq!(payload.as_of, NaiveDate::from_ymd_opt(2026, 8, 6));
    }

    #[test]
    fn strategy_defaults_to_avalanche_when_absent() {
        let payload = simulate_payload_from_json(r#"{"debts": []}"#).expect("json should parse");
        let inputs = build_inputs(payload.debts, payload.strategy, payload.extra_monthly_budget);
        assert_eq!(inputs.strategy, Strategy::Avalanche);
        assert_approx(inputs.extra_monthly_budget, 0.0);
    }

    #[test]
    fn simulate_response_carries_plan_fields_and_projected_date() {
        let json = r#"{
          "debts": [{"id": "loan", "balance": 300, "rate": 0, "minPayment": 100}],
          "asOf": "2026-01-15"
        }"#;
        let payload = simulate_payload_from_json(json).expect("json should parse");
        let response = simulate_response_from_payload(payload).expect("simulation succeeds");

        assert_eq!(response.total_months, 3);
        assert!(!response.truncated);
        assert_approx(response.total_interest_paid, 0.0);
        assert_eq!(
            response.projected_payoff_date,
            NaiveDate::from_ymd_opt(2026, 4, 15)
        );
        assert_eq!(response.ordered_debts.len(), 1);
        assert_eq!(response.ordered_debts[0].payoff_month, 3);
    }

    #[test]
    fn simulate_response_rejects_invalid_debts() {
        let json = r#"{"debts": [{"balance": -10, "rate": 0, "minPayment": 0}]}"#;
        let payload = simulate_payload_from_json(json).expect("json should parse");

        let err = simulate_response_from_payload(payload).expect_err("must reject");
        assert!(err.contains("balance"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let json = r#"{
          "debts": [{"id": "loan", "balance": 300, "rate": 6, "minPayment": 100}],
          "strategy": "avalanche",
          "asOf": "2026-01-15"
        }"#;
        let payload = simulate_payload_from_json(json).expect("json should parse");
        let response = simulate_response_from_payload(payload).expect("simulation succeeds");
        let rendered = serde_json::to_string(&response).expect("response should serialize");

        assert!(rendered.contains("\"strategy\":\"avalanche\""));
        assert!(rendered.contains("\"totalMonths\""));
        assert!(rendered.contains("\"orderedDebts\""));
        assert!(rendered.contains("\"timeline\""));
        assert!(rendered.contains("\"totalInterestPaid\""));
        assert!(rendered.contains("\"interestSavedEstimate\""));
        assert!(rendered.contains("\"projectedPayoffDate\""));
        assert!(rendered.contains("\"payoffMonth\""));
        assert!(rendered.contains("\"totalBalance\""));
    }

    #[test]
    fn solve_response_finds_budget_with_default_bounds() {
        let json = r#"{
          "debts": [{"id": "loan", "balance": 1000, "rate": 0, "minPayment": 0}],
          "targetMonths": 10,
          "asOf": "2026-01-01"
        }"#;
        let payload: SolveBudgetPayload =
            serde_json::from_str(json).expect("json should parse");
        let response = solve_response_from_payload(payload).expect("solve succeeds");

        assert!(response.feasible);
        assert!(response.converged);
        let solved = response.solved_budget.expect("budget expected");
        assert!(solved >= 100.0 - EPS);
        assert!(solved <= 101.0 + EPS);
        assert_eq!(response.achieved_months, Some(10));
        assert_eq!(
            response.projected_payoff_date,
            NaiveDate::from_ymd_opt(2026, 11, 1)
        );
        assert!(!response.iterations.is_empty());
    }

    #[test]
    fn solve_response_requires_target_months() {
        let payload: SolveBudgetPayload =
            serde_json::from_str(r#"{"debts": [{"balance": 100, "rate": 0, "minPayment": 10}]}"#)
                .expect("json should parse");

        let err = solve_response_from_payload(payload).expect_err("must reject");
        assert!(err.contains("targetMonths"));
    }

    #[test]
    fn cli_parses_flags_and_defaults() {
        let cli = Cli::try_parse_from([
            "payoff",
            "--debts-file",
            "debts.json",
            "--strategy",
            "snowball",
            "--extra-monthly-budget",
            "150",
            "--as-of",
            "2026-08-06",
        ])
        .expect("flags should parse");

        assert_eq!(cli.debts_file, PathBuf::from("debts.json"));
        assert_eq!(cli.strategy, CliStrategy::Snowball);
        assert_approx(cli.extra_monthly_budget, 150.0);
        assert_eq!(cli.as_of, NaiveDate::from_ymd_opt(2026, 8, 6));
        assert_eq!(cli.target_months, None);

        let defaults = Cli::try_parse_from(["payoff", "--debts-file", "debts.json"])
            .expect("flags should parse");
        assert_eq!(defaults.strategy, CliStrategy::Avalanche);
        assert_approx(defaults.extra_monthly_budget, 0.0);
    }

    #[test]
    fn run_plan_reads_a_debt_snapshot_file() {
        let path = std::env::temp_dir().join("payoff_cli_snapshot_test.json");
        std::fs::write(
            &path,
            r#"[{"id": "loan", "balance": 300, "rate": 0, "minPayment": 100}]"#,
        )
        .expect("snapshot file written");

        let cli = Cli::try_parse_from([
            "payoff",
            "--debts-file",
            path.to_str().expect("utf-8 path"),
        ])
        .expect("flags should parse");
        run_plan(cli).expect("plan should run");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn run_plan_reports_missing_files() {
        let cli = Cli::try_parse_from([
            "payoff",
            "--debts-file",
            "/nonexistent/payoff-debts.json",
        ])
        .expect("flags should parse");

        let err = run_plan(cli).expect_err("must fail");
        assert!(err.contains("failed to read"));
    }
}
