//! Shared data types for the screener pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar. Sequences are ordered ascending by timestamp and
/// immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Tri-state quality tag for a provider-supplied field.
///
/// A field that is absent from a response is `Missing`; a field whose fetch
/// or parse faulted is `Error`. Neither is ever coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "quality", content = "value", rename_all = "UPPERCASE")]
pub enum FieldValue<T> {
    Valid(T),
    Missing,
    Error,
}

impl<T> FieldValue<T> {
    /// Returns the inner value if the field is `Valid`.
    pub fn valid(&self) -> Option<&T> {
        match self {
            Self::Valid(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Maps the inner value, preserving the quality tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldValue<U> {
        match self {
            Self::Valid(v) => FieldValue::Valid(f(v)),
            Self::Missing => FieldValue::Missing,
            Self::Error => FieldValue::Error,
        }
    }
}

impl<T> From<Option<T>> for FieldValue<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Self::Valid(v),
            None => Self::Missing,
        }
    }
}

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Strategy the screener decided on for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeDecision {
    Csp,
    Cc,
    None,
}

impl ModeDecision {
    #[must_use]
    pub fn right(self) -> Option<OptionRight> {
        match self {
            Self::Csp => Some(OptionRight::Put),
            Self::Cc => Some(OptionRight::Call),
            Self::None => None,
        }
    }
}

/// Market risk regime gating strategy aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    RiskOn,
    RiskOff,
    Neutral,
}

/// Broad trend supplied by the regime collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketTrend {
    Bull,
    Bear,
    Neutral,
}

impl Regime {
    /// Derives the regime from the trend source, with a volatility spike
    /// overriding everything to `RiskOff`.
    #[must_use]
    pub fn from_trend(trend: MarketTrend, volatility_spike: bool) -> Self {
        if volatility_spike {
            return Self::RiskOff;
        }
        match trend {
            MarketTrend::Bull => Self::RiskOn,
            MarketTrend::Bear => Self::RiskOff,
            MarketTrend::Neutral => Self::Neutral,
        }
    }
}

/// Final per-symbol verdict consumed by banding and downstream alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Passed both stages with a selected contract.
    Eligible,
    /// Qualified technically but no contract was chosen.
    Hold,
    /// Hard data gate failed for the symbol.
    Blocked,
    /// Rejected by the technical rules.
    Rejected,
    /// Evaluation faulted before a verdict could be reached.
    Unknown,
}
