use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("debt `{0}` has a negative or non-finite balance")]
    InvalidBalance(String),

    #[error("debt `{0}` has a negative or non-finite annual rate")]
    InvalidRate(String),

    #[error("debt `{0}` has a negative or non-finite minimum payment")]
    InvalidMinimumPayment(String),

    #[error("extra monthly budget must be a non-negative finite amount")]
    InvalidExtraBudget,

    #[error("invalid solver config: {0}")]
    SolverConfig(&'static str),
}
