//! Integration test: votes flow through tally and snapshots into TWAPs.
//!
//! 1. Initialize from genesis with three whitelisted denoms
//! 2. One validator delegates its feeding right
//! 3. Validators vote each period; a tally writes rates and snapshots
//! 4. TWAPs, participation counters and slash-window progress are queried
//! 5. A denom is de-listed and its rate is pruned

use tessera_integration_tests::{init_tracing, tally, test_genesis, validators};
use tessera_oracle::testutil::{acc_addr, MockStaking};
use tessera_oracle::{BlockContext, Keeper, OracleError, QueryServer};
use tessera_store::MemStore;
use tessera_types::{AccAddress, Dec, OracleEvent};

/// Block time of height 1.
const GENESIS_TIME: i64 = 1_700_000_000;

/// Seconds per block.
const BLOCK_SECS: i64 = 6;

fn ctx_at(height: i64) -> BlockContext {
    BlockContext::at_secs(height, GENESIS_TIME + (height - 1) * BLOCK_SECS)
}

fn dec(s: &str) -> Dec {
    s.parse().expect("valid decimal")
}

#[test]
fn votes_to_twap_and_penalties() {
    init_tracing();

    let vals = validators(3);
    let mut keeper = Keeper::new(MemStore::new(), MockStaking::with_bonded(vals.clone()));
    keeper.init_genesis(&test_genesis()).expect("genesis");

    // Validator 3 hands feeding to a separate account.
    let feeder3 = acc_addr(30);
    keeper
        .delegate_feed_consent(&vals[2], &feeder3)
        .expect("delegate");

    // Four vote periods (vote_period = 2): votes at odd heights, tally at even.
    let uatom = ["10", "20", "30", "40"];
    for (period, price) in uatom.iter().enumerate() {
        let vote_height = 1 + 2 * period as i64;
        let vote_ctx = ctx_at(vote_height);

        let rates = format!("{price}uatom,5ubtc");
        keeper
            .aggregate_exchange_rate_vote(&vote_ctx, &AccAddress::from(&vals[0]), &vals[0], &rates)
            .expect("validator 1 votes");
        // Validator 2 only votes in the first two periods.
        if period < 2 {
            keeper
                .aggregate_exchange_rate_vote(&vote_ctx, &AccAddress::from(&vals[1]), &vals[1], "")
                .expect("validator 2 abstains");
        }
        keeper
            .aggregate_exchange_rate_vote(&vote_ctx, &feeder3, &vals[2], &rates)
            .expect("delegate votes");

        let accepted = tally(&mut keeper, &ctx_at(vote_height + 1)).expect("tally");
        assert_eq!(accepted, vec!["uatom", "ubtc"]);
    }

    // Snapshots at heights 2, 4, 6, 8 => 6s, 18s, 30s, 42s after genesis.
    let now = ctx_at(8);
    let query = QueryServer::new(&keeper, now);
    let history = query.price_snapshot_history().expect("history");
    assert_eq!(history.price_snapshots.len(), 4);

    // Window of 24s from t=42 starts at t=18: 30 held 12s, 20 held 12s.
    let twaps = query.twaps(24).expect("twaps").oracle_twaps;
    assert_eq!(twaps.len(), 2);
    assert_eq!(twaps[0].denom, "uatom");
    assert_eq!(twaps[0].twap, dec("25"));
    assert_eq!(twaps[0].lookback_seconds, 24);
    assert_eq!(twaps[1].denom, "ubtc");
    assert_eq!(twaps[1].twap, dec("5"));

    // Window larger than the history: only 36s of data exist.
    let twaps = query.twaps(600).expect("twaps").oracle_twaps;
    assert_eq!(twaps[0].lookback_seconds, 36);
    assert_eq!(twaps[0].twap, dec("20"));

    let counter = |i: usize| {
        query
            .vote_penalty_counter(&vals[i].to_string())
            .expect("counter")
            .vote_penalty_counter
    };
    assert_eq!(counter(0).success_count, 4);
    assert_eq!(counter(1).abstain_count, 2);
    assert_eq!(counter(1).miss_count, 2);
    assert_eq!(counter(2).success_count, 4);

    assert_eq!(
        query
            .feeder_delegation(&vals[2].to_string())
            .expect("delegation")
            .feeder_address,
        feeder3
    );
    // Height 8 with slash window 10 and vote period 2.
    assert_eq!(query.slash_window().expect("progress").window_progress, 4);

    let events = keeper.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, OracleEvent::FeedDelegate { .. })));
    let rate_updates = events
        .iter()
        .filter(|e| matches!(e, OracleEvent::ExchangeRateUpdate { .. }))
        .count();
    assert_eq!(rate_updates, 8);

    // De-list ubtc and garbage-collect its rate.
    keeper.remove_vote_target("ubtc").expect("de-list");
    assert_eq!(keeper.remove_excess_feeds().expect("prune"), vec!["ubtc"]);
    let query = QueryServer::new(&keeper, now);
    assert_eq!(query.actives().expect("actives").actives, vec!["uatom"]);
    assert!(matches!(
        query.exchange_rate("ubtc"),
        Err(OracleError::NotFound(_))
    ));
}

#[test]
fn rejected_votes_leave_no_trace() {
    init_tracing();

    let vals = validators(2);
    let mut keeper = Keeper::new(MemStore::new(), MockStaking::with_bonded(vals.clone()));
    keeper.init_genesis(&test_genesis()).expect("genesis");
    let before = tessera_store::state_hash(keeper.store()).expect("hash");

    let ctx = ctx_at(1);
    let attempts: [(AccAddress, &str); 4] = [
        (acc_addr(99), "1uatom"),
        (AccAddress::from(&vals[0]), "1uatom,2uatom"),
        (AccAddress::from(&vals[0]), "1uosmo"),
        (AccAddress::from(&vals[0]), "0uatom"),
    ];
    for (feeder, rates) in &attempts {
        let result = keeper.aggregate_exchange_rate_vote(&ctx, feeder, &vals[0], rates);
        assert!(result.is_err(), "{rates} from {feeder} should be rejected");
    }

    assert_eq!(
        tessera_store::state_hash(keeper.store()).expect("hash"),
        before
    );
    assert!(keeper.take_events().is_empty());
}
