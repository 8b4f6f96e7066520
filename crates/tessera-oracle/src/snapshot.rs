//! Price snapshot history.
//!
//! One snapshot per block timestamp, keyed by unix seconds so that key order
//! is time order. Appending a snapshot prunes everything that has fallen out
//! of the lookback window, so the history never grows past
//! `lookback_duration` seconds.

use std::ops::ControlFlow;

use tessera_store::{KvStore, Order};
use tessera_types::{OracleEvent, PriceSnapshot, UnixSeconds};

use crate::context::BlockContext;
use crate::keeper::{Keeper, PRICE_SNAPSHOTS};
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    pub fn price_snapshot(&self, timestamp: UnixSeconds) -> Result<Option<PriceSnapshot>> {
        Ok(PRICE_SNAPSHOTS.get(&self.store, &timestamp)?)
    }

    /// The snapshot at `timestamp`, or the empty zero value when absent.
    pub fn price_snapshot_or_default(&self, timestamp: UnixSeconds) -> Result<PriceSnapshot> {
        Ok(self.price_snapshot(timestamp)?.unwrap_or_default())
    }

    /// Store a snapshot under its own timestamp, overwriting any existing
    /// one. Does not prune.
    pub fn set_price_snapshot(&mut self, snapshot: &PriceSnapshot) -> Result<()> {
        snapshot.validate()?;
        PRICE_SNAPSHOTS.set(&mut self.store, &snapshot.snapshot_timestamp, snapshot)?;
        Ok(())
    }

    /// Record the snapshot for the current block, then prune history older
    /// than the lookback window relative to the block time.
    ///
    /// Returns the pruned timestamps, oldest first.
    pub fn append_price_snapshot(
        &mut self,
        ctx: &BlockContext,
        snapshot: &PriceSnapshot,
    ) -> Result<Vec<UnixSeconds>> {
        if PRICE_SNAPSHOTS.has(&self.store, &snapshot.snapshot_timestamp)? {
            return Err(OracleError::DuplicateSnapshot(snapshot.snapshot_timestamp));
        }
        let params = self.params()?;
        self.set_price_snapshot(snapshot)?;

        let pruned = self.prune_price_snapshots(ctx.unix_secs(), params.lookback_duration)?;
        tracing::debug!(
            timestamp = snapshot.snapshot_timestamp,
            items = snapshot.price_snapshot_items.len(),
            pruned = pruned.len(),
            "price snapshot appended"
        );
        if !pruned.is_empty() {
            self.emit(OracleEvent::PriceSnapshotPruned {
                timestamps: pruned.clone(),
            });
        }
        Ok(pruned)
    }

    /// Delete snapshots with `timestamp + lookback < now`, oldest first,
    /// stopping at the first one still inside the window.
    pub fn prune_price_snapshots(
        &mut self,
        now: UnixSeconds,
        lookback_duration: u64,
    ) -> Result<Vec<UnixSeconds>> {
        let lookback = i64::try_from(lookback_duration).unwrap_or(i64::MAX);
        let mut expired = Vec::new();
        PRICE_SNAPSHOTS.walk(
            &self.store,
            Order::Ascending,
            |timestamp: UnixSeconds, _: PriceSnapshot| -> Result<ControlFlow<()>> {
                if timestamp.saturating_add(lookback) < now {
                    expired.push(timestamp);
                    Ok(ControlFlow::Continue(()))
                } else {
                    Ok(ControlFlow::Break(()))
                }
            },
        )?;
        for timestamp in &expired {
            PRICE_SNAPSHOTS.remove(&mut self.store, timestamp)?;
        }
        Ok(expired)
    }

    /// Visit snapshots newest first until `f` breaks or returns an error.
    pub fn iterate_price_snapshots_reverse<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(PriceSnapshot) -> Result<ControlFlow<()>>,
    {
        PRICE_SNAPSHOTS.walk(
            &self.store,
            Order::Descending,
            |_: UnixSeconds, snapshot: PriceSnapshot| f(snapshot),
        )
    }

    /// Full retained history, oldest first.
    pub fn price_snapshots(&self) -> Result<Vec<PriceSnapshot>> {
        Ok(PRICE_SNAPSHOTS
            .entries(&self.store)?
            .into_iter()
            .map(|(_, snapshot)| snapshot)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_keeper, MockStaking};
    use tessera_store::MemStore;
    use tessera_types::{Dec, OracleExchangeRate, PriceSnapshotItem};

    fn snapshot(ts: UnixSeconds, rate: i64) -> PriceSnapshot {
        PriceSnapshot::new(
            ts,
            vec![PriceSnapshotItem {
                denom: "uatom".into(),
                oracle_exchange_rate: OracleExchangeRate {
                    exchange_rate: Dec::from(rate),
                    last_update: ts,
                    last_update_timestamp: ts * 1000,
                },
            }],
        )
    }

    fn timestamps<S: KvStore, K: StakingKeeper>(keeper: &Keeper<S, K>) -> Vec<UnixSeconds> {
        keeper
            .price_snapshots()
            .expect("history")
            .iter()
            .map(|s| s.snapshot_timestamp)
            .collect()
    }

    #[test]
    fn test_missing_snapshot_is_zero_value() {
        let keeper = test_keeper();
        let snap = keeper.price_snapshot_or_default(123).expect("get");
        assert!(snap.is_empty());
        assert_eq!(snap, PriceSnapshot::default());
    }

    #[test]
    fn test_append_prunes_outside_window() {
        let mut keeper = test_keeper();
        let mut params = keeper.params().expect("params");
        params.lookback_duration = 100;
        keeper.set_params(&params).expect("set params");

        for ts in [10, 50, 100] {
            keeper
                .append_price_snapshot(&BlockContext::at_secs(ts, ts), &snapshot(ts, 1))
                .expect("append");
        }
        assert_eq!(timestamps(&keeper), vec![10, 50, 100]);

        // now = 155: 10 + 100 < 155 is pruned, 50 + 100 = 150 < 155 too.
        let pruned = keeper
            .append_price_snapshot(&BlockContext::at_secs(155, 155), &snapshot(155, 2))
            .expect("append");
        assert_eq!(pruned, vec![10, 50]);
        assert_eq!(timestamps(&keeper), vec![100, 155]);

        let events = keeper.take_events();
        assert_eq!(
            events.last(),
            Some(&OracleEvent::PriceSnapshotPruned {
                timestamps: vec![10, 50],
            })
        );
    }

    #[test]
    fn test_boundary_snapshot_retained() {
        let mut keeper = test_keeper();
        keeper.set_price_snapshot(&snapshot(0, 1)).expect("set");
        // 0 + 3600 == 3600 is not older than the window.
        let pruned = keeper
            .prune_price_snapshots(3600, 3600)
            .expect("prune");
        assert!(pruned.is_empty());
        let pruned = keeper
            .prune_price_snapshots(3601, 3600)
            .expect("prune");
        assert_eq!(pruned, vec![0]);
    }

    #[test]
    fn test_append_duplicate_rejected() {
        let mut keeper = test_keeper();
        let ctx = BlockContext::at_secs(1, 100);
        keeper
            .append_price_snapshot(&ctx, &snapshot(100, 1))
            .expect("append");
        let err = keeper
            .append_price_snapshot(&ctx, &snapshot(100, 2))
            .unwrap_err();
        assert!(matches!(err, OracleError::DuplicateSnapshot(100)));

        // The raw setter overwrites.
        keeper.set_price_snapshot(&snapshot(100, 3)).expect("set");
        let stored = keeper.price_snapshot(100).expect("get").expect("present");
        assert_eq!(
            stored.price_snapshot_items[0].oracle_exchange_rate.exchange_rate,
            Dec::from(3)
        );
    }

    #[test]
    fn test_append_without_params_writes_nothing() {
        let mut keeper = Keeper::new(MemStore::new(), MockStaking::new());
        let err = keeper
            .append_price_snapshot(&BlockContext::at_secs(1, 100), &snapshot(100, 1))
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFound(_)));
        assert!(keeper.price_snapshot(100).expect("get").is_none());
        assert_eq!(keeper.store().len(), 0);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let mut keeper = test_keeper();
        let mut snap = snapshot(5, 1);
        snap.price_snapshot_items[0].oracle_exchange_rate.exchange_rate = Dec::zero();
        let err = keeper.set_price_snapshot(&snap).unwrap_err();
        assert!(matches!(err, OracleError::InvalidExchangeRate { .. }));
    }

    #[test]
    fn test_reverse_iteration_stops() {
        let mut keeper = test_keeper();
        for ts in [-5, 0, 7, 300] {
            keeper.set_price_snapshot(&snapshot(ts, 1)).expect("set");
        }

        let mut seen = Vec::new();
        keeper
            .iterate_price_snapshots_reverse(|snap| {
                seen.push(snap.snapshot_timestamp);
                if snap.snapshot_timestamp <= 0 {
                    Ok(ControlFlow::Break(()))
                } else {
                    Ok(ControlFlow::Continue(()))
                }
            })
            .expect("iterate");
        assert_eq!(seen, vec![300, 7, 0]);
    }

    #[test]
    fn test_reverse_iteration_propagates_error() {
        let mut keeper = test_keeper();
        keeper.set_price_snapshot(&snapshot(1, 1)).expect("set");
        let err = keeper
            .iterate_price_snapshots_reverse(|_| Err(OracleError::NoTwapData))
            .unwrap_err();
        assert!(matches!(err, OracleError::NoTwapData));
    }

    #[test]
    fn test_retention_invariant_over_many_blocks() {
        let mut keeper = test_keeper();
        let lookback = keeper.params().expect("params").lookback_duration as i64;
        let mut now = 1_000;
        for height in 1..=400 {
            now += 7 + (height % 13);
            keeper
                .append_price_snapshot(&BlockContext::at_secs(height, now), &snapshot(now, height))
                .expect("append");
            for ts in timestamps(&keeper) {
                assert!(ts >= now - lookback, "snapshot {ts} outlived window at {now}");
            }
        }
    }
}
