mod engine;
mod error;
mod solver;
mod types;

pub use engine::{MONTH_CAP, order_debts, projected_payoff_date, simulate};
pub use error::SimulationError;
pub use solver::{BudgetSolveConfig, BudgetSolveIteration, BudgetSolveResult, solve_extra_budget};
pub use types::{DebtAccount, DebtProgress, Inputs, PayoffPlan, Strategy, TimelinePoint};
