//! Two-step chain discovery and enrichment pipeline.
//!
//! Step 1 discovers (expiration, strike, type) tuples for an underlying.
//! Step 2 requests liquidity/greeks strictly by canonical contract-symbol
//! lists, batched at the provider cap. Enrichment with a bare underlying
//! ticker is a caller-contract violation and fails loudly.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use wheel_scan_core::{FieldValue, OptionRight, ScanError};

use crate::cache::CacheStore;
use crate::occ::{build_occ_symbol, normalize_occ_symbol};
use crate::transport::{fetch_cached, ProviderTransport};

/// Provider-imposed ceiling on contract symbols per enrichment call.
pub const ENRICHMENT_BATCH_CAP: usize = 10;

/// A discovered contract before liquidity enrichment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaseContract {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub dte: i64,
    pub occ_symbol: String,
}

/// A contract after the enrichment merge. Liquidity fields carry quality
/// tags; they are never defaulted to zero.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnrichedContract {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub dte: i64,
    pub occ_symbol: String,
    pub bid: FieldValue<Decimal>,
    pub ask: FieldValue<Decimal>,
    pub open_interest: FieldValue<u64>,
    pub volume: FieldValue<u64>,
    pub delta: FieldValue<f64>,
}

/// Discovery + enrichment against the quote provider, through the cache.
pub struct ChainPipeline {
    transport: Arc<dyn ProviderTransport>,
    cache: Arc<CacheStore>,
}

impl ChainPipeline {
    #[must_use]
    pub fn new(transport: Arc<dyn ProviderTransport>, cache: Arc<CacheStore>) -> Self {
        Self { transport, cache }
    }

    /// Step 1: contract tuples available for an underlying.
    ///
    /// # Errors
    ///
    /// Provider errors re-raised unchanged. Malformed tuples are skipped.
    pub async fn discover(
        &self,
        underlying: &str,
        today: NaiveDate,
    ) -> Result<Vec<BaseContract>, ScanError> {
        let underlying = underlying.to_uppercase();
        let params = vec![("symbol".to_string(), underlying.clone())];
        let body = fetch_cached(
            &*self.transport,
            &self.cache,
            "options/chain",
            &underlying,
            &params,
        )
        .await?;

        let tuples = body
            .get("contracts")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut contracts = Vec::new();
        for tuple in &tuples {
            match parse_tuple(&underlying, tuple, today) {
                Some(contract) => contracts.push(contract),
                None => warn!(%underlying, ?tuple, "skipping malformed chain tuple"),
            }
        }
        debug!(%underlying, count = contracts.len(), "discovered contracts");
        Ok(contracts)
    }

    /// Step 2 + merge: liquidity/greeks by exact contract-symbol list.
    ///
    /// # Errors
    ///
    /// `Validation` when any symbol is not a canonical contract symbol
    /// (e.g. a bare underlying ticker); provider errors re-raised
    /// unchanged.
    pub async fn enrich(
        &self,
        contracts: &[BaseContract],
    ) -> Result<Vec<EnrichedContract>, ScanError> {
        // Contract check up front: every requested symbol must parse, and
        // the canonical form becomes both the request symbol and the merge
        // key so a space-padded caller symbol still joins.
        let mut canonical = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let symbol = normalize_occ_symbol(&contract.occ_symbol).map_err(|_| {
                ScanError::Validation(format!(
                    "enrichment requires canonical contract symbols, got {:?}",
                    contract.occ_symbol
                ))
            })?;
            canonical.push(symbol);
        }

        let mut by_symbol: HashMap<String, serde_json::Value> = HashMap::new();
        for (batch, symbols) in contracts
            .chunks(ENRICHMENT_BATCH_CAP)
            .zip(canonical.chunks(ENRICHMENT_BATCH_CAP))
        {
            let underlying = &batch[0].underlying;
            let params = vec![("symbols".to_string(), symbols.join(","))];
            let body = fetch_cached(
                &*self.transport,
                &self.cache,
                "options/quotes",
                underlying,
                &params,
            )
            .await?;

            let records = body
                .get("quotes")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default();
            for record in records {
                let Some(raw) = record.get("symbol").and_then(serde_json::Value::as_str) else {
                    continue;
                };
                match normalize_occ_symbol(raw) {
                    Ok(key) => {
                        by_symbol.insert(key, record);
                    }
                    Err(_) => warn!(symbol = raw, "unparseable symbol in enrichment response"),
                }
            }
        }

        Ok(contracts
            .iter()
            .zip(&canonical)
            .map(|(base, key)| merge(base, by_symbol.get(key)))
            .collect())
    }
}

fn parse_tuple(
    underlying: &str,
    tuple: &serde_json::Value,
    today: NaiveDate,
) -> Option<BaseContract> {
    let expiration = tuple
        .get("expiration")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
    let strike = tuple
        .get("strike")
        .and_then(serde_json::Value::as_f64)
        .and_then(Decimal::from_f64)?;
    let right = match tuple.get("type").and_then(serde_json::Value::as_str)? {
        "put" => OptionRight::Put,
        "call" => OptionRight::Call,
        _ => return None,
    };

    let occ_symbol = build_occ_symbol(underlying, expiration, right, strike).ok()?;
    Some(BaseContract {
        underlying: underlying.to_string(),
        expiration,
        strike,
        right,
        dte: (expiration - today).num_days(),
        occ_symbol,
    })
}

/// Joins one base contract with its enrichment record. An absent record or
/// field tags `Missing`; a present-but-unparseable field tags `Error`.
fn merge(base: &BaseContract, record: Option<&serde_json::Value>) -> EnrichedContract {
    let (bid, ask, open_interest, volume, delta) = match record {
        Some(r) => (
            field_decimal(r, "bid"),
            field_decimal(r, "ask"),
            field_u64(r, "open_interest"),
            field_u64(r, "volume"),
            field_f64(r, "delta"),
        ),
        None => (
            FieldValue::Missing,
            FieldValue::Missing,
            FieldValue::Missing,
            FieldValue::Missing,
            FieldValue::Missing,
        ),
    };

    EnrichedContract {
        underlying: base.underlying.clone(),
        expiration: base.expiration,
        strike: base.strike,
        right: base.right,
        dte: base.dte,
        occ_symbol: base.occ_symbol.clone(),
        bid,
        ask,
        open_interest,
        volume,
        delta,
    }
}

fn field_decimal(record: &serde_json::Value, name: &str) -> FieldValue<Decimal> {
    match record.get(name) {
        None | Some(serde_json::Value::Null) => FieldValue::Missing,
        Some(v) => v
            .as_f64()
            .and_then(Decimal::from_f64)
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .map_or(FieldValue::Error, FieldValue::Valid),
    }
}

fn field_u64(record: &serde_json::Value, name: &str) -> FieldValue<u64> {
    match record.get(name) {
        None | Some(serde_json::Value::Null) => FieldValue::Missing,
        Some(v) => v.as_u64().map_or(FieldValue::Error, FieldValue::Valid),
    }
}

fn field_f64(record: &serde_json::Value, name: &str) -> FieldValue<f64> {
    match record.get(name) {
        None | Some(serde_json::Value::Null) => FieldValue::Missing,
        Some(v) => v.as_f64().map_or(FieldValue::Error, FieldValue::Valid),
    }
}
