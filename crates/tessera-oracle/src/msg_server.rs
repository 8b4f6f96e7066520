//! Validator-facing messages.
//!
//! Messages are checked statelessly with `validate_basic` and then applied
//! against the keeper with the block context.

use serde::{Deserialize, Serialize};
use tessera_store::KvStore;
use tessera_types::{
    parse_exchange_rate_tuples, AccAddress, AggregateExchangeRateVote, OracleEvent, Params,
    ValAddress,
};

use crate::context::BlockContext;
use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

/// Register `delegate` as the feeder for `operator`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegateFeedConsent {
    pub operator: ValAddress,
    pub delegate: AccAddress,
}

/// Submit a full set of exchange rates for one validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAggregateExchangeRateVote {
    /// Comma-separated `<amount><denom>` list, e.g. `"12.5uatom,0.3ueth"`.
    pub exchange_rates: String,
    pub feeder: AccAddress,
    pub validator: ValAddress,
}

impl MsgAggregateExchangeRateVote {
    /// Stateless checks: the rate list parses without duplicates.
    pub fn validate_basic(&self) -> Result<()> {
        parse_exchange_rate_tuples(&self.exchange_rates)?;
        Ok(())
    }
}

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    pub fn handle_delegate_feed_consent(&mut self, msg: &MsgDelegateFeedConsent) -> Result<()> {
        self.delegate_feed_consent(&msg.operator, &msg.delegate)
    }

    pub fn handle_aggregate_exchange_rate_vote(
        &mut self,
        ctx: &BlockContext,
        msg: &MsgAggregateExchangeRateVote,
    ) -> Result<()> {
        self.aggregate_exchange_rate_vote(ctx, &msg.feeder, &msg.validator, &msg.exchange_rates)
    }

    /// Accept a validator's vote for this block.
    ///
    /// The feeder must be authorized, the validator must not have voted in
    /// this block yet, every denom must be a current vote target and every
    /// rate must be positive. Any failure leaves the state untouched.
    pub fn aggregate_exchange_rate_vote(
        &mut self,
        ctx: &BlockContext,
        feeder: &AccAddress,
        validator: &ValAddress,
        exchange_rates: &str,
    ) -> Result<()> {
        if let Err(err) = self.validate_feeder(feeder, validator) {
            tracing::warn!(%feeder, %validator, error = %err, "rejected oracle vote");
            return Err(err);
        }
        self.check_spam_prevention(ctx, validator)?;

        let tuples = parse_exchange_rate_tuples(exchange_rates)?;
        for tuple in &tuples {
            if !self.is_vote_target(&tuple.denom)? {
                return Err(OracleError::UnknownDenom(tuple.denom.clone()));
            }
        }
        let vote = AggregateExchangeRateVote::new(tuples, validator.clone())?;

        self.set_aggregate_vote(validator, &vote)?;
        self.set_spam_prevention_counter(ctx, validator)?;
        tracing::debug!(
            %validator,
            %feeder,
            height = ctx.height,
            denoms = vote.exchange_rate_tuples.len(),
            "aggregate vote accepted"
        );
        self.emit(OracleEvent::AggregateVote {
            voter: validator.clone(),
            feeder: feeder.clone(),
            exchange_rates: exchange_rates.to_owned(),
        });
        Ok(())
    }

    /// Replace the module parameters after validation.
    pub fn update_params(&mut self, params: &Params) -> Result<()> {
        self.set_params(params)?;
        tracing::info!(
            vote_period = params.vote_period,
            slash_window = params.slash_window,
            lookback_duration = params.lookback_duration,
            "oracle params updated"
        );
        Ok(())
    }
}
