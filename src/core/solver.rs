use super::engine::{MONTH_CAP, simulate};
use super::error::SimulationError;
use super::types::Inputs;

#[derive(Debug, Clone, Copy)]
pub struct BudgetSolveConfig {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_budget: f64,
    pub total_months: u32,
}

#[derive(Debug, Clone)]
pub struct BudgetSolveResult {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_budget: Option<f64>,
    pub achieved_months: Option<u32>,
    pub achieved_total_interest: Option<f64>,
    pub iterations: Vec<BudgetSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    total_months: u32,
    total_interest_paid: f64,
    truncated: bool,
}

impl CandidateEval {
    fn meets_target(&self, target_months: u32) -> bool {
        !self.truncated && self.total_months <= target_months
    }
}

// Payoff time is monotone non-increasing in the extra budget, so the smallest
// sufficient budget can be bisected.
pub fn solve_extra_budget(
    inputs: &Inputs,
    config: BudgetSolveConfig,
) -> Result<BudgetSolveResult, SimulationError> {
    validate_config(&config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(inputs, config.search_min)?;
    let high_eval = evaluate_candidate(inputs, config.search_max)?;

    let mut solved_budget = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_eval.meets_target(config.target_months) {
        solved_budget = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Target is already met at the lower budget bound.".to_string();
    } else if !high_eval.meets_target(config.target_months) {
        feasible = false;
        message = "No budget within the search bounds pays everything off in time.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(inputs, mid)?;
            iterations.push(BudgetSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_budget: mid,
                total_months: eval.total_months,
            });

            if eval.meets_target(config.target_months) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_budget = Some(hi);
                break;
            }
        }
        if solved_budget.is_none() {
            solved_budget = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved minimum extra monthly budget.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let mut achieved_months = None;
    let mut achieved_total_interest = None;
    if let Some(budget) = solved_budget {
        let final_eval = evaluate_candidate(inputs, budget)?;
        achieved_months = Some(final_eval.total_months);
        achieved_total_interest = Some(final_eval.total_interest_paid);
    }

    Ok(BudgetSolveResult {
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_budget,
        achieved_months,
        achieved_total_interest,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(base_inputs: &Inputs, budget: f64) -> Result<CandidateEval, SimulationError> {
    let mut inputs = base_inputs.clone();
    inputs.extra_monthly_budget = budget.max(0.0);

    let plan = simulate(&inputs)?;
    Ok(CandidateEval {
        total_months: plan.total_months,
        total_interest_paid: plan.total_interest_paid,
        truncated: plan.truncated,
    })
}

fn validate_config(config: &BudgetSolveConfig) -> Result<(), SimulationError> {
    if config.target_months == 0 || config.target_months > MONTH_CAP {
        return Err(SimulationError::SolverConfig(
            "target_months must be between 1 and 360",
        ));
    }
    if !config.search_min.is_finite() || config.search_min < 0.0 {
        return Err(SimulationError::SolverConfig("search_min must be >= 0"));
    }
    if !config.search_max.is_finite() || config.search_max <= config.search_min {
        return Err(SimulationError::SolverConfig(
            "search_max must be greater than search_min",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SimulationError::SolverConfig("tolerance must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(SimulationError::SolverConfig("max_iterations must be > 0"));
    }
    Ok(())
}
