pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod strategies;
pub mod types;
pub mod utils;

pub use crate::config::AppConfig;
pub use crate::core::engine::{TradingEngine, Transition};
pub use crate::core::supervisor::{RecoveryPolicy, Supervisor, TickReport};
pub use crate::error::{EngineError, GatewayError, SupervisorError};
