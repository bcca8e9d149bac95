pub mod engine;
pub mod execution;
pub mod risk;
pub mod supervisor;
pub mod window;
