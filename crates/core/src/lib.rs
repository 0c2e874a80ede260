//! Core types, traits, and configuration for the wheel-strategy screener.
//!
//! Shared by every other crate in the workspace:
//! - Candle and tri-state field types
//! - Reason-code taxonomy and error taxonomy
//! - Market regime and market-phase classification
//! - Configuration structs and the figment loader

pub mod config;
pub mod config_loader;
pub mod error;
pub mod phase;
pub mod reason;
pub mod types;

pub use config::ScanConfig;
pub use error::ScanError;
pub use phase::MarketPhase;
pub use reason::{ReasonCategory, ReasonCode};
pub use types::{Candle, FieldValue, ModeDecision, OptionRight, Regime, Verdict};
