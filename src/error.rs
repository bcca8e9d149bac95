// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("exchange rejected request (http {status}, code {code}): {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("no open orders on {0}")]
    NoOpenOrders(String),

    #[error("malformed exchange response: {0}")]
    Malformed(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

impl GatewayError {
    /// Network-level failures and 5xx responses; anything else is the exchange saying no.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Timeout => true,
            GatewayError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<rust_decimal::Error> for GatewayError {
    fn from(e: rust_decimal::Error) -> Self {
        GatewayError::Malformed(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("indicator computation failed: {0}")]
    Indicator(String),

    #[error("market buy on {0} returned no fills")]
    EmptyFill(String),

    #[error("no free {0} balance left to reconcile against")]
    EmptyBalance(String),

    #[error("quantity reconciliation failed after retry: {0}")]
    Reconciliation(#[source] GatewayError),
}

impl EngineError {
    /// True when the underlying exchange call may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Gateway(e) | EngineError::Reconciliation(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Fatal outcome of the outer fault barrier.
#[derive(Debug, Error)]
#[error("tick failed again after reconnect (first failure: {first})")]
pub struct SupervisorError {
    pub first: EngineError,
    #[source]
    pub retry: EngineError,
}
