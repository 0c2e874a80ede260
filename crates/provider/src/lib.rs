//! Options-quote provider integration.
//!
//! The transport is a trait so the pipeline can run against an in-memory
//! implementation in tests. Every fetch passes through the TTL cache store;
//! failed fetches are never cached.

pub mod cache;
pub mod chain;
pub mod occ;
pub mod quotes;
pub mod transport;

pub use cache::{CacheKey, CacheStats, CacheStore};
pub use chain::{BaseContract, ChainPipeline, EnrichedContract, ENRICHMENT_BATCH_CAP};
pub use occ::{build_occ_symbol, normalize_occ_symbol, parse_occ_symbol, OccSymbol};
pub use quotes::{EquityQuote, MarketDataClient};
pub use transport::{HttpTransport, ProviderTransport};
