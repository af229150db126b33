use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    Snowball,
    Avalanche,
}

#[derive(Debug, Clone)]
pub struct DebtAccount {
    pub id: String,
    pub name: String,
    pub lender: String,
    pub principal: f64,
    pub balance: f64,
    pub annual_rate_percent: f64,
    pub minimum_payment: f64,
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub debts: Vec<DebtAccount>,
    pub strategy: Strategy,
    pub extra_monthly_budget: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtProgress {
    pub id: String,
    pub name: String,
    pub lender: String,
    pub starting_balance: f64,
    pub annual_rate_percent: f64,
    pub minimum_payment: f64,
    pub remaining_balance: f64,
    pub interest_paid: f64,
    pub paid_off: bool,
    pub payoff_month: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub month: u32,
    pub total_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffPlan {
    pub ordered_debts: Vec<DebtProgress>,
    pub total_months: u32,
    pub timeline: Vec<TimelinePoint>,
    pub total_interest_paid: f64,
    pub interest_saved_estimate: f64,
    pub truncated: bool,
}
