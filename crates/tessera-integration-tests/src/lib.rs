//! Integration test crate for the tessera oracle.
//!
//! Holds the fixtures shared by the end-to-end tests in `tests/`: logging
//! setup, a whitelisted genesis and a toy tally that turns stored votes
//! into accepted rates and a price snapshot.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tessera-integration-tests
//! ```

use std::collections::BTreeMap;

use tessera_oracle::testutil::val_addr;
use tessera_oracle::{BlockContext, GenesisState, Keeper, Result, StakingKeeper, VoteOutcome};
use tessera_store::KvStore;
use tessera_types::{Dec, Denom, Params, PriceSnapshot, PriceSnapshotItem, ValAddress};

/// Install a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Denoms whitelisted by [`test_genesis`].
pub const DENOMS: [&str; 3] = ["uatom", "ubtc", "ueth"];

/// Genesis with a short vote period and slash window for fast tests.
pub fn test_genesis() -> GenesisState {
    GenesisState {
        params: Params {
            vote_period: 2,
            slash_window: 10,
            lookback_duration: 600,
            whitelist: DENOMS.into_iter().map(Denom::new).collect(),
        },
        ..GenesisState::default()
    }
}

/// Validators 1..=n.
pub fn validators(n: u8) -> Vec<ValAddress> {
    (1..=n).map(val_addr).collect()
}

/// End-of-period tally used by the tests.
///
/// Takes the lowest submitted rate per denom as the accepted price, writes
/// it, snapshots all current rates at the block time, records who voted and
/// clears the votes. Returns the denoms that got a new rate.
pub fn tally<S: KvStore, K: StakingKeeper>(
    keeper: &mut Keeper<S, K>,
    ctx: &BlockContext,
) -> Result<Vec<String>> {
    let votes = keeper.aggregate_votes()?;
    let mut accepted: BTreeMap<String, Dec> = BTreeMap::new();
    let mut outcomes = BTreeMap::new();
    for vote in &votes {
        for tuple in &vote.exchange_rate_tuples {
            accepted
                .entry(tuple.denom.clone())
                .and_modify(|rate| *rate = (*rate).min(tuple.exchange_rate))
                .or_insert(tuple.exchange_rate);
        }
        let outcome = if vote.exchange_rate_tuples.is_empty() {
            VoteOutcome::Abstain
        } else {
            VoteOutcome::Success
        };
        outcomes.insert(vote.voter.clone(), outcome);
    }

    for (denom, rate) in &accepted {
        keeper.set_exchange_rate(ctx, denom, *rate)?;
    }

    let items = keeper
        .exchange_rates()?
        .into_iter()
        .map(|(denom, oracle_exchange_rate)| PriceSnapshotItem {
            denom,
            oracle_exchange_rate,
        })
        .collect();
    keeper.append_price_snapshot(ctx, &PriceSnapshot::new(ctx.unix_secs(), items))?;

    keeper.record_participation(&outcomes)?;
    for vote in &votes {
        keeper.remove_aggregate_vote(&vote.voter)?;
    }
    Ok(accepted.into_keys().collect())
}
