//! TWAP (Time-Weighted Average Price) over the snapshot history.
//!
//! Snapshots are walked newest first. Each snapshot's rate is treated as
//! having held from its own timestamp until the next newer snapshot of the
//! same denom (or the current block time for the newest one):
//!
//! ```text
//! TWAP = sum(rate_i * held_i) / sum(held_i)
//! ```
//!
//! The walk stops at the first snapshot older than `now - lookback`; that
//! snapshot's timestamp is clamped to the window start, so it contributes
//! only the part of its interval that lies inside the window. Snapshots
//! stamped after the current block time are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use tessera_store::KvStore;
use tessera_types::{Dec, OracleTwap, PriceSnapshot, WeightedSum};

use crate::context::BlockContext;
use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

/// Lookback must be in `[1, max_lookback]`.
pub fn validate_lookback_seconds(lookback_seconds: u64, max_lookback: u64) -> Result<()> {
    if lookback_seconds == 0 || lookback_seconds > max_lookback {
        return Err(OracleError::InvalidTwapLookback {
            requested: lookback_seconds,
            max: max_lookback,
        });
    }
    Ok(())
}

/// Running sum for one denom.
#[derive(Debug, Default)]
struct Accumulator {
    weighted_sum: WeightedSum,
    /// Seconds between the current time and the oldest point reached so far.
    duration: i64,
}

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    /// TWAP of every vote-target denom over the last `lookback_seconds`,
    /// ordered by denom.
    ///
    /// A denom's TWAP covers only the history that actually exists for it;
    /// `lookback_seconds` in each result reports that span. A denom whose
    /// only data sits exactly at the current time gets a TWAP of zero over
    /// zero seconds.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidTwapLookback`] if the lookback is zero or
    ///   exceeds `lookback_duration`
    /// - [`OracleError::NoTwapData`] if no vote-target denom has data
    pub fn calculate_twaps(
        &self,
        ctx: &BlockContext,
        lookback_seconds: u64,
    ) -> Result<Vec<OracleTwap>> {
        let params = self.params()?;
        validate_lookback_seconds(lookback_seconds, params.lookback_duration)?;
        let lookback = i64::try_from(lookback_seconds).map_err(|_| {
            OracleError::InvalidTwapLookback {
                requested: lookback_seconds,
                max: params.lookback_duration,
            }
        })?;

        let current_time = ctx.unix_secs();
        let window_start = current_time.saturating_sub(lookback);
        let targets: BTreeSet<String> = self.vote_targets()?.into_iter().collect();
        let mut accumulators: BTreeMap<String, Accumulator> = BTreeMap::new();

        self.iterate_price_snapshots_reverse(|snapshot: PriceSnapshot| {
            if snapshot.snapshot_timestamp > current_time {
                return Ok(ControlFlow::Continue(()));
            }
            let (effective, flow) = if snapshot.snapshot_timestamp < window_start {
                (window_start, ControlFlow::Break(()))
            } else {
                (snapshot.snapshot_timestamp, ControlFlow::Continue(()))
            };
            let time_traversed = current_time - effective;

            for item in snapshot.price_snapshot_items {
                if !targets.contains(&item.denom) {
                    continue;
                }
                let acc = accumulators.entry(item.denom).or_default();
                let held = time_traversed - acc.duration;
                acc.weighted_sum
                    .add_weighted(item.oracle_exchange_rate.exchange_rate, held)?;
                acc.duration = time_traversed;
            }
            Ok(flow)
        })?;

        if accumulators.is_empty() {
            return Err(OracleError::NoTwapData);
        }

        accumulators
            .into_iter()
            .map(|(denom, acc)| -> Result<OracleTwap> {
                let twap = if acc.duration == 0 {
                    Dec::zero()
                } else {
                    acc.weighted_sum.checked_quo_int(acc.duration)?
                };
                Ok(OracleTwap {
                    denom,
                    twap,
                    lookback_seconds: acc.duration,
                })
            })
            .collect()
    }
}
