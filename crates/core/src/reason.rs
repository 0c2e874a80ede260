//! Reason-code taxonomy for eligibility traces and run summaries.
//!
//! Codes are an explicit tagged enum rather than free-form strings so that
//! every component boundary carries the same vocabulary. Each code belongs
//! to exactly one category.

use serde::{Deserialize, Serialize};

/// Coarse grouping of reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReasonCategory {
    Data,
    Regime,
    Technical,
    Liquidity,
    Budget,
}

/// Specific reason a rule failed, a symbol was excluded, or a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // Data
    MissingQuoteField,
    StaleQuote,
    ProviderError,
    InsufficientHistory,
    EarningsWindow,
    // Regime
    RegimeRiskOff,
    RegimeNeutralCap,
    // Technical
    RsiOutOfWindow,
    AtrTooHigh,
    TooFarFromSupport,
    TooCloseToResistance,
    NoSupportLevel,
    NoResistanceLevel,
    // Liquidity
    NoContractsDiscovered,
    NoContractPassedFilters,
    NoSymbolsWithOptions,
    // Budget
    TimeBudgetExhausted,
    SymbolBudgetExhausted,
}

impl ReasonCode {
    #[must_use]
    pub fn category(self) -> ReasonCategory {
        match self {
            Self::MissingQuoteField
            | Self::StaleQuote
            | Self::ProviderError
            | Self::InsufficientHistory
            | Self::EarningsWindow => ReasonCategory::Data,
            Self::RegimeRiskOff | Self::RegimeNeutralCap => ReasonCategory::Regime,
            Self::RsiOutOfWindow
            | Self::AtrTooHigh
            | Self::TooFarFromSupport
            | Self::TooCloseToResistance
            | Self::NoSupportLevel
            | Self::NoResistanceLevel => ReasonCategory::Technical,
            Self::NoContractsDiscovered
            | Self::NoContractPassedFilters
            | Self::NoSymbolsWithOptions => ReasonCategory::Liquidity,
            Self::TimeBudgetExhausted | Self::SymbolBudgetExhausted => ReasonCategory::Budget,
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Matches the serde representation so logs and payloads agree.
        let s = match self {
            Self::MissingQuoteField => "MISSING_QUOTE_FIELD",
            Self::StaleQuote => "STALE_QUOTE",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::InsufficientHistory => "INSUFFICIENT_HISTORY",
            Self::EarningsWindow => "EARNINGS_WINDOW",
            Self::RegimeRiskOff => "REGIME_RISK_OFF",
            Self::RegimeNeutralCap => "REGIME_NEUTRAL_CAP",
            Self::RsiOutOfWindow => "RSI_OUT_OF_WINDOW",
            Self::AtrTooHigh => "ATR_TOO_HIGH",
            Self::TooFarFromSupport => "TOO_FAR_FROM_SUPPORT",
            Self::TooCloseToResistance => "TOO_CLOSE_TO_RESISTANCE",
            Self::NoSupportLevel => "NO_SUPPORT_LEVEL",
            Self::NoResistanceLevel => "NO_RESISTANCE_LEVEL",
            Self::NoContractsDiscovered => "NO_CONTRACTS_DISCOVERED",
            Self::NoContractPassedFilters => "NO_CONTRACT_PASSED_FILTERS",
            Self::NoSymbolsWithOptions => "NO_SYMBOLS_WITH_OPTIONS",
            Self::TimeBudgetExhausted => "TIME_BUDGET_EXHAUSTED",
            Self::SymbolBudgetExhausted => "SYMBOL_BUDGET_EXHAUSTED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_category() {
        assert_eq!(
            ReasonCode::MissingQuoteField.category(),
            ReasonCategory::Data
        );
        assert_eq!(ReasonCode::RegimeRiskOff.category(), ReasonCategory::Regime);
        assert_eq!(
            ReasonCode::RsiOutOfWindow.category(),
            ReasonCategory::Technical
        );
        assert_eq!(
            ReasonCode::NoSymbolsWithOptions.category(),
            ReasonCategory::Liquidity
        );
        assert_eq!(
            ReasonCode::TimeBudgetExhausted.category(),
            ReasonCategory::Budget
        );
    }

    #[test]
    fn display_matches_serde_representation() {
        let code = ReasonCode::NoSymbolsWithOptions;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, format!("\"{code}\""));
    }

    #[test]
    fn codes_are_hashable_and_distinct() {
        use std::collections::HashSet;
        let set: HashSet<ReasonCode> = [
            ReasonCode::StaleQuote,
            ReasonCode::AtrTooHigh,
            ReasonCode::StaleQuote,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }
}
