//! Persisted oracle records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Dec, Height, Result, TypesError, UnixMillis, UnixSeconds};

/// Default number of blocks between tallies.
pub const DEFAULT_VOTE_PERIOD: u64 = 5;

/// Default slash window in blocks (one week of 6-second blocks).
pub const DEFAULT_SLASH_WINDOW: u64 = 100_800;

/// Default snapshot retention in seconds.
pub const DEFAULT_LOOKBACK_DURATION: u64 = 3600;

/// Check a denom against `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denom(denom: &str) -> Result<()> {
    let bytes = denom.as_bytes();
    let valid = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(TypesError::InvalidDenom(denom.to_string()))
    }
}

/// Module parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Blocks between vote tallies.
    pub vote_period: u64,
    /// Blocks per penalty window.
    pub slash_window: u64,
    /// Seconds of snapshot history retained; also the longest TWAP window.
    pub lookback_duration: u64,
    /// Denoms seeded as vote targets at genesis.
    #[serde(default)]
    pub whitelist: Vec<Denom>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            vote_period: DEFAULT_VOTE_PERIOD,
            slash_window: DEFAULT_SLASH_WINDOW,
            lookback_duration: DEFAULT_LOOKBACK_DURATION,
            whitelist: Vec::new(),
        }
    }
}

impl Params {
    /// Validate parameter ranges and the whitelist.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidParams`] for zero periods or a slash window
    ///   shorter than one vote period
    /// - [`TypesError::InvalidDenom`] / [`TypesError::DuplicateDenom`] for
    ///   whitelist problems
    pub fn validate(&self) -> Result<()> {
        if self.vote_period == 0 {
            return Err(TypesError::InvalidParams(
                "vote period must be positive".to_string(),
            ));
        }
        if self.slash_window == 0 {
            return Err(TypesError::InvalidParams(
                "slash window must be positive".to_string(),
            ));
        }
        if self.slash_window < self.vote_period {
            return Err(TypesError::InvalidParams(format!(
                "slash window {} is shorter than vote period {}",
                self.slash_window, self.vote_period
            )));
        }
        if self.lookback_duration == 0 {
            return Err(TypesError::InvalidParams(
                "lookback duration must be positive".to_string(),
            ));
        }
        if i64::try_from(self.lookback_duration).is_err() {
            return Err(TypesError::InvalidParams(format!(
                "lookback duration {} exceeds i64 seconds",
                self.lookback_duration
            )));
        }

        let mut seen = BTreeSet::new();
        for denom in &self.whitelist {
            validate_denom(&denom.name)?;
            if !seen.insert(denom.name.as_str()) {
                return Err(TypesError::DuplicateDenom(denom.name.clone()));
            }
        }
        Ok(())
    }
}

/// A denom entry in the vote-target set or the whitelist.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Denom {
    pub name: String,
}

impl Denom {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The current accepted price of one denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleExchangeRate {
    /// Always strictly positive once stored.
    pub exchange_rate: Dec,
    /// Block height of the last update.
    pub last_update: Height,
    pub last_update_timestamp: UnixMillis,
}

/// Denom paired with its current rate, as returned by rate listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomOracleExchangeRate {
    pub denom: String,
    pub oracle_exchange_rate: OracleExchangeRate,
}

/// One row of a price snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshotItem {
    pub denom: String,
    pub oracle_exchange_rate: OracleExchangeRate,
}

/// Cross-section of accepted rates at one block timestamp.
///
/// The zero value (`PriceSnapshot::default()`) means "no data", not an
/// empty but valid price set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub snapshot_timestamp: UnixSeconds,
    pub price_snapshot_items: Vec<PriceSnapshotItem>,
}

impl PriceSnapshot {
    pub fn new(snapshot_timestamp: UnixSeconds, price_snapshot_items: Vec<PriceSnapshotItem>) -> Self {
        Self {
            snapshot_timestamp,
            price_snapshot_items,
        }
    }

    /// True for the zero value returned when no snapshot exists.
    pub fn is_empty(&self) -> bool {
        self.snapshot_timestamp == 0 && self.price_snapshot_items.is_empty()
    }

    /// Every row must name a valid, unique denom with a positive rate.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for item in &self.price_snapshot_items {
            validate_denom(&item.denom)?;
            if !item.oracle_exchange_rate.exchange_rate.is_positive() {
                return Err(TypesError::InvalidExchangeRate {
                    denom: item.denom.clone(),
                    rate: item.oracle_exchange_rate.exchange_rate,
                });
            }
            if !seen.insert(item.denom.as_str()) {
                return Err(TypesError::DuplicateDenom(item.denom.clone()));
            }
        }
        Ok(())
    }
}

/// Per-validator participation counters for the current slash window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePenaltyCounter {
    pub miss_count: u64,
    pub abstain_count: u64,
    pub success_count: u64,
}

/// Time-weighted average price of one denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleTwap {
    pub denom: String,
    pub twap: Dec,
    /// Seconds of history that actually contributed for this denom.
    pub lookback_seconds: i64,
}
