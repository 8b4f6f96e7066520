//! Events emitted by the oracle keeper.

use serde::{Deserialize, Serialize};

use crate::{AccAddress, Dec, UnixSeconds, ValAddress};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A denom's current rate was (re)written.
    ExchangeRateUpdate { denom: String, exchange_rate: Dec },

    /// A validator delegated its feeding right.
    FeedDelegate {
        operator: ValAddress,
        feeder: AccAddress,
    },

    /// A validator's aggregate vote was accepted.
    AggregateVote {
        voter: ValAddress,
        feeder: AccAddress,
        exchange_rates: String,
    },

    /// Snapshots dropped by retention pruning, oldest first.
    PriceSnapshotPruned { timestamps: Vec<UnixSeconds> },
}
