//! XTS market data demo.
//!
//! Orchestrates the workspace crates into one run:
//! - Market data login
//! - OHLC batch download for the configured universe
//! - One CSV file per instrument with data
//! - Sandbox tick stream recorded to a stream log

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, RunReport};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
