//! Oracle keeper: state layout and the plain record accessors.
//!
//! Each collection lives under its own one-byte prefix. The prefixes are part
//! of the consensus state layout and must never be reassigned.
//!
//! | Prefix | Collection            | Key          | Value                       |
//! |--------|-----------------------|--------------|-----------------------------|
//! | `0x01` | params                | (none)       | `Params`                    |
//! | `0x02` | exchange rates        | denom        | `OracleExchangeRate`        |
//! | `0x03` | feeder delegations    | validator    | `AccAddress`                |
//! | `0x04` | vote penalty counters | validator    | `VotePenaltyCounter`        |
//! | `0x05` | aggregate votes       | validator    | `AggregateExchangeRateVote` |
//! | `0x06` | vote targets          | denom        | `Denom`                     |
//! | `0x07` | price snapshots       | unix seconds | `PriceSnapshot`             |
//! | `0x08` | spam prevention       | validator    | last vote height            |

use tessera_store::{Item, KvStore, Map};
use tessera_types::{
    validate_denom, AccAddress, AggregateExchangeRateVote, Dec, Denom, Height, OracleEvent,
    OracleExchangeRate, Params, PriceSnapshot, UnixSeconds, ValAddress, VotePenaltyCounter,
};

use crate::context::BlockContext;
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

pub(crate) const PARAMS: Item<Params> = Item::new(0x01, "params");
pub(crate) const EXCHANGE_RATES: Map<String, OracleExchangeRate> = Map::new(0x02, "exchange_rate");
pub(crate) const FEEDER_DELEGATIONS: Map<ValAddress, AccAddress> =
    Map::new(0x03, "feeder_delegation");
pub(crate) const VOTE_PENALTY_COUNTERS: Map<ValAddress, VotePenaltyCounter> =
    Map::new(0x04, "vote_penalty_counter");
pub(crate) const AGGREGATE_VOTES: Map<ValAddress, AggregateExchangeRateVote> =
    Map::new(0x05, "aggregate_vote");
pub(crate) const VOTE_TARGETS: Map<String, Denom> = Map::new(0x06, "vote_target");
pub(crate) const PRICE_SNAPSHOTS: Map<UnixSeconds, PriceSnapshot> =
    Map::new(0x07, "price_snapshot");
pub(crate) const SPAM_PREVENTION: Map<ValAddress, Height> = Map::new(0x08, "spam_prevention");

/// The oracle keeper.
///
/// Owns the injected key-value store and a handle to the staking module.
/// Events produced while executing a block are buffered until the host
/// drains them with [`Keeper::take_events`].
pub struct Keeper<S, K> {
    pub(crate) store: S,
    pub(crate) staking: K,
    events: Vec<OracleEvent>,
}

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    pub fn new(store: S, staking: K) -> Self {
        Self {
            store,
            staking,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn staking(&self) -> &K {
        &self.staking
    }

    pub fn staking_mut(&mut self) -> &mut K {
        &mut self.staking
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Drain the events emitted since the last call, in emission order.
    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: OracleEvent) {
        self.events.push(event);
    }

    // -- Params --

    /// Current module parameters. Absent only before genesis.
    pub fn params(&self) -> Result<Params> {
        PARAMS
            .get(&self.store)?
            .ok_or_else(|| OracleError::NotFound("params".into()))
    }

    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        params.validate()?;
        PARAMS.set(&mut self.store, params)?;
        Ok(())
    }

    // -- Exchange rates --

    pub fn exchange_rate(&self, denom: &str) -> Result<Option<OracleExchangeRate>> {
        Ok(EXCHANGE_RATES.get(&self.store, &denom.to_owned())?)
    }

    /// Store `rate` as the current price of `denom`, stamped with the block,
    /// and emit an `ExchangeRateUpdate` event.
    pub fn set_exchange_rate(&mut self, ctx: &BlockContext, denom: &str, rate: Dec) -> Result<()> {
        let record = OracleExchangeRate {
            exchange_rate: rate,
            last_update: ctx.height,
            last_update_timestamp: ctx.time_ms,
        };
        self.set_exchange_rate_record(denom, &record)?;
        tracing::debug!(denom, rate = %rate, height = ctx.height, "exchange rate set");
        self.emit(OracleEvent::ExchangeRateUpdate {
            denom: denom.to_owned(),
            exchange_rate: rate,
        });
        Ok(())
    }

    /// Write a full rate record as-is (genesis import).
    pub fn set_exchange_rate_record(
        &mut self,
        denom: &str,
        record: &OracleExchangeRate,
    ) -> Result<()> {
        validate_denom(denom)?;
        if !record.exchange_rate.is_positive() {
            return Err(OracleError::InvalidExchangeRate {
                denom: denom.to_owned(),
                rate: record.exchange_rate,
            });
        }
        EXCHANGE_RATES.set(&mut self.store, &denom.to_owned(), record)?;
        Ok(())
    }

    pub fn remove_exchange_rate(&mut self, denom: &str) -> Result<()> {
        EXCHANGE_RATES.remove(&mut self.store, &denom.to_owned())?;
        Ok(())
    }

    /// All current rates, ordered by denom.
    pub fn exchange_rates(&self) -> Result<Vec<(String, OracleExchangeRate)>> {
        Ok(EXCHANGE_RATES.entries(&self.store)?)
    }

    /// Denoms that currently have a rate, ordered.
    pub fn active_denoms(&self) -> Result<Vec<String>> {
        Ok(EXCHANGE_RATES.keys(&self.store)?)
    }

    // -- Vote targets --

    pub fn set_vote_target(&mut self, denom: &str) -> Result<()> {
        validate_denom(denom)?;
        VOTE_TARGETS.set(&mut self.store, &denom.to_owned(), &Denom::new(denom))?;
        Ok(())
    }

    pub fn remove_vote_target(&mut self, denom: &str) -> Result<()> {
        VOTE_TARGETS.remove(&mut self.store, &denom.to_owned())?;
        Ok(())
    }

    pub fn is_vote_target(&self, denom: &str) -> Result<bool> {
        Ok(VOTE_TARGETS.has(&self.store, &denom.to_owned())?)
    }

    /// Denoms validators are expected to vote on, ordered.
    pub fn vote_targets(&self) -> Result<Vec<String>> {
        Ok(VOTE_TARGETS.keys(&self.store)?)
    }

    pub fn clear_vote_targets(&mut self) -> Result<()> {
        for denom in VOTE_TARGETS.keys(&self.store)? {
            VOTE_TARGETS.remove(&mut self.store, &denom)?;
        }
        Ok(())
    }

    // -- Aggregate votes --

    pub fn aggregate_vote(&self, voter: &ValAddress) -> Result<Option<AggregateExchangeRateVote>> {
        Ok(AGGREGATE_VOTES.get(&self.store, voter)?)
    }

    pub fn set_aggregate_vote(
        &mut self,
        voter: &ValAddress,
        vote: &AggregateExchangeRateVote,
    ) -> Result<()> {
        AGGREGATE_VOTES.set(&mut self.store, voter, vote)?;
        Ok(())
    }

    pub fn remove_aggregate_vote(&mut self, voter: &ValAddress) -> Result<()> {
        AGGREGATE_VOTES.remove(&mut self.store, voter)?;
        Ok(())
    }

    /// All pending votes, ordered by voter.
    pub fn aggregate_votes(&self) -> Result<Vec<AggregateExchangeRateVote>> {
        Ok(AGGREGATE_VOTES
            .entries(&self.store)?
            .into_iter()
            .map(|(_, vote)| vote)
            .collect())
    }

    // -- Spam prevention --

    /// Height of the validator's last accepted vote, if any.
    pub fn spam_prevention_counter(&self, validator: &ValAddress) -> Result<Option<Height>> {
        Ok(SPAM_PREVENTION.get(&self.store, validator)?)
    }

    pub fn set_spam_prevention_counter(
        &mut self,
        ctx: &BlockContext,
        validator: &ValAddress,
    ) -> Result<()> {
        SPAM_PREVENTION.set(&mut self.store, validator, &ctx.height)?;
        Ok(())
    }

    /// At most one vote per validator per block.
    pub fn check_spam_prevention(&self, ctx: &BlockContext, validator: &ValAddress) -> Result<()> {
        match self.spam_prevention_counter(validator)? {
            Some(height) if height == ctx.height => Err(OracleError::AlreadyVoted {
                validator: validator.clone(),
                height,
            }),
            _ => Ok(()),
        }
    }
}
