use chrono::{Months, NaiveDate};

use super::error::SimulationError;
use super::types::{DebtAccount, DebtProgress, Inputs, PayoffPlan, Strategy, TimelinePoint};

pub const MONTH_CAP: u32 = 360;

const PAYOFF_EPSILON: f64 = 0.01;
const DENSE_TIMELINE_MONTHS: u32 = 12;
const TIMELINE_STRIDE: u32 = 3;

#[derive(Debug)]
struct WorkingDebt {
    account: DebtAccount,
    balance: f64,
    interest_paid: f64,
    paid_off: bool,
    payoff_month: u32,
}

impl WorkingDebt {
    fn new(account: DebtAccount) -> Self {
        let balance = account.balance;
        Self {
            account,
            balance,
            interest_paid: 0.0,
            paid_off: false,
            payoff_month: 0,
        }
    }

    fn settle_if_cleared(&mut self, month: u32) {
        if self.balance <= PAYOFF_EPSILON {
            self.balance = 0.0;
            self.paid_off = true;
            self.payoff_month = month;
        }
    }

    fn into_progress(self) -> DebtProgress {
        DebtProgress {
            id: self.account.id,
            name: self.account.name,
            lender: self.account.lender,
            starting_balance: self.account.balance,
            annual_rate_percent: self.account.annual_rate_percent,
            minimum_payment: self.account.minimum_payment,
            remaining_balance: self.balance,
            interest_paid: self.interest_paid,
            paid_off: self.paid_off,
            payoff_month: self.payoff_month,
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
struct MonthTrace {
    month: u32,
    available_budget: f64,
    interest_accrued: f64,
    minimums_paid: f64,
    surplus_paid: f64,
    unspent_budget: f64,
    ending_total_balance: f64,
}

pub fn order_debts(debts: &[DebtAccount], strategy: Strategy) -> Vec<DebtAccount> {
    let mut ordered = debts.to_vec();
    match strategy {
        Strategy::Snowball => ordered.sort_by(|a, b| a.balance.total_cmp(&b.balance)),
        Strategy::Avalanche => {
            ordered.sort_by(|a, b| b.annual_rate_percent.total_cmp(&a.annual_rate_percent))
        }
    }
    ordered
}

pub fn simulate(inputs: &Inputs) -> Result<PayoffPlan, SimulationError> {
    validate_inputs(inputs)?;
    Ok(simulate_inner(inputs, None))
}

pub fn projected_payoff_date(as_of: NaiveDate, months_ahead: u32) -> Option<NaiveDate> {
    as_of.checked_add_months(Months::new(months_ahead))
}

fn validate_inputs(inputs: &Inputs) -> Result<(), SimulationError> {
    for debt in &inputs.debts {
        if !debt.balance.is_finite() || debt.balance < 0.0 {
            return Err(SimulationError::InvalidBalance(debt.id.clone()));
        }
        if !debt.annual_rate_percent.is_finite() || debt.annual_rate_percent < 0.0 {
            return Err(SimulationError::InvalidRate(debt.id.clone()));
        }
        if !debt.minimum_payment.is_finite() || debt.minimum_payment < 0.0 {
            return Err(SimulationError::InvalidMinimumPayment(debt.id.clone()));
        }
    }
    if !inputs.extra_monthly_budget.is_finite() || inputs.extra_monthly_budget < 0.0 {
        return Err(SimulationError::InvalidExtraBudget);
    }
    Ok(())
}

fn simulate_inner(inputs: &Inputs, mut trace: Option<&mut Vec<MonthTrace>>) -> PayoffPlan {
    let ordered = order_debts(&inputs.debts, inputs.strategy);
    let mut debts: Vec<WorkingDebt> = ordered.into_iter().map(WorkingDebt::new).collect();
    if debts.is_empty() {
        return PayoffPlan {
            ordered_debts: Vec::new(),
            total_months: 0,
            timeline: Vec::new(),
            total_interest_paid: 0.0,
            interest_saved_estimate: 0.0,
            truncated: false,
        };
    }

    // The pool is the full minimum sum plus the extra budget every month;
    // whatever the minimum pass does not spend cascades to the surplus target.
    let minimum_total: f64 = debts.iter().map(|d| d.account.minimum_payment).sum();
    let mut total_interest_paid = 0.0;
    let mut timeline = Vec::new();
    let mut month = 0_u32;

    while month < MONTH_CAP && debts.iter().any(|d| !d.paid_off) {
        month += 1;
        let available_budget = minimum_total + inputs.extra_monthly_budget;
        let mut remaining_budget = available_budget;
        let mut interest_accrued = 0.0;
        let mut minimums_paid = 0.0;
        let mut surplus_paid = 0.0;

        for debt in debts.iter_mut().filter(|d| !d.paid_off) {
            // Interest accrues before the payment lands.
            let monthly_interest = monthly_rate(debt.account.annual_rate_percent) * debt.balance;
            debt.balance += monthly_interest;
            debt.interest_paid += monthly_interest;
            total_interest_paid += monthly_interest;
            interest_accrued += monthly_interest;

            let payment = debt.account.minimum_payment.min(debt.balance);
            debt.balance -= payment;
            remaining_budget -= payment;
            minimums_paid += payment;
            debt.settle_if_cleared(month);
        }

        // The entire surplus goes to the first open debt in strategy order;
        // at most one debt receives surplus per month.
        if let Some(target) = debts.iter_mut().find(|d| !d.paid_off) {
            let payment = remaining_budget.min(target.balance).max(0.0);
            target.balance -= payment;
            remaining_budget -= payment;
            surplus_paid += payment;
            target.settle_if_cleared(month);
        }

        let total_balance: f64 = debts.iter().map(|d| d.balance).sum();
        if month <= DENSE_TIMELINE_MONTHS || month % TIMELINE_STRIDE == 0 {
            timeline.push(TimelinePoint {
                month,
                total_balance,
            });
        }

        if let Some(rows) = trace.as_deref_mut() {
            rows.push(MonthTrace {
                month,
                available_budget,
                interest_accrued,
                minimums_paid,
                surplus_paid,
                unspent_budget: remaining_budget,
                ending_total_balance: total_balance,
            });
        }
    }

    if timeline.last().map(|point| point.month) != Some(month) {
        let total_balance: f64 = debts.iter().map(|d| d.balance).sum();
        timeline.push(TimelinePoint {
            month,
            total_balance,
        });
    }

    let truncated = debts.iter().any(|d| !d.paid_off);
    let baseline_interest = minimum_only_interest_baseline(&inputs.debts);

    PayoffPlan {
        ordered_debts: debts.into_iter().map(WorkingDebt::into_progress).collect(),
        total_months: month,
        timeline,
        total_interest_paid,
        interest_saved_estimate: (baseline_interest - total_interest_paid).max(0.0),
        truncated,
    }
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

// Rough minimum-payment-only comparison: no compounding, flat monthly
// interest on the starting balance, halved as an average-balance correction.
// Changing it changes the user-visible "interest saved" number.
fn minimum_only_interest_baseline(debts: &[DebtAccount]) -> f64 {
    debts
        .iter()
        .map(|debt| {
            if debt.balance <= 0.0 {
                return 0.0;
            }
            let months_at_minimum = if debt.minimum_payment > 0.0 {
                (debt.balance / debt.minimum_payment).ceil()
            } else {
                MONTH_CAP as f64
            };
            monthly_rate(debt.annual_rate_percent) * debt.balance * months_at_minimum * 0.5
        })
        .sum()
}
