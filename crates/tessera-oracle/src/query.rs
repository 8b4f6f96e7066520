//! Read-only query surface.
//!
//! Addresses arrive as hex text and are parsed here; a malformed address is
//! an [`OracleError::InvalidRequest`]. Responses are serde types so hosts
//! can hand them out as JSON unchanged.

use serde::{Deserialize, Serialize};
use tessera_store::KvStore;
use tessera_types::{
    AccAddress, AggregateExchangeRateVote, DenomOracleExchangeRate, OracleExchangeRate,
    OracleTwap, Params, PriceSnapshot, ValAddress, VotePenaltyCounter,
};

use crate::context::BlockContext;
use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsResponse {
    pub params: Params,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateResponse {
    pub oracle_exchange_rate: OracleExchangeRate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRatesResponse {
    pub denom_oracle_exchange_rates: Vec<DenomOracleExchangeRate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivesResponse {
    pub actives: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTargetsResponse {
    pub vote_targets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshotHistoryResponse {
    pub price_snapshots: Vec<PriceSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapsResponse {
    pub oracle_twaps: Vec<OracleTwap>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederDelegationResponse {
    pub feeder_address: AccAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePenaltyCounterResponse {
    pub vote_penalty_counter: VotePenaltyCounter,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateVoteResponse {
    pub aggregate_vote: AggregateExchangeRateVote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashWindowResponse {
    /// Vote periods elapsed in the current slash window.
    pub window_progress: u64,
}

/// Queries against a keeper at a fixed block.
pub struct QueryServer<'k, S, K> {
    keeper: &'k Keeper<S, K>,
    ctx: BlockContext,
}

impl<'k, S: KvStore, K: StakingKeeper> QueryServer<'k, S, K> {
    pub fn new(keeper: &'k Keeper<S, K>, ctx: BlockContext) -> Self {
        Self { keeper, ctx }
    }

    pub fn params(&self) -> Result<ParamsResponse> {
        Ok(ParamsResponse {
            params: self.keeper.params()?,
        })
    }

    pub fn exchange_rate(&self, denom: &str) -> Result<ExchangeRateResponse> {
        if denom.is_empty() {
            return Err(OracleError::InvalidRequest("empty denom".into()));
        }
        let oracle_exchange_rate = self
            .keeper
            .exchange_rate(denom)?
            .ok_or_else(|| OracleError::NotFound(format!("exchange rate for {denom}")))?;
        Ok(ExchangeRateResponse {
            oracle_exchange_rate,
        })
    }

    pub fn exchange_rates(&self) -> Result<ExchangeRatesResponse> {
        let denom_oracle_exchange_rates = self
            .keeper
            .exchange_rates()?
            .into_iter()
            .map(|(denom, oracle_exchange_rate)| DenomOracleExchangeRate {
                denom,
                oracle_exchange_rate,
            })
            .collect();
        Ok(ExchangeRatesResponse {
            denom_oracle_exchange_rates,
        })
    }

    /// Denoms that currently have a rate.
    pub fn actives(&self) -> Result<ActivesResponse> {
        Ok(ActivesResponse {
            actives: self.keeper.active_denoms()?,
        })
    }

    pub fn vote_targets(&self) -> Result<VoteTargetsResponse> {
        Ok(VoteTargetsResponse {
            vote_targets: self.keeper.vote_targets()?,
        })
    }

    pub fn price_snapshot_history(&self) -> Result<PriceSnapshotHistoryResponse> {
        Ok(PriceSnapshotHistoryResponse {
            price_snapshots: self.keeper.price_snapshots()?,
        })
    }

    pub fn twaps(&self, lookback_seconds: u64) -> Result<TwapsResponse> {
        Ok(TwapsResponse {
            oracle_twaps: self.keeper.calculate_twaps(&self.ctx, lookback_seconds)?,
        })
    }

    /// The validator's feeder; its own account when it never delegated.
    pub fn feeder_delegation(&self, validator: &str) -> Result<FeederDelegationResponse> {
        let validator = parse_validator(validator)?;
        Ok(FeederDelegationResponse {
            feeder_address: self.keeper.feeder_delegation_or_default(&validator)?,
        })
    }

    pub fn vote_penalty_counter(&self, validator: &str) -> Result<VotePenaltyCounterResponse> {
        let validator = parse_validator(validator)?;
        Ok(VotePenaltyCounterResponse {
            vote_penalty_counter: self.keeper.vote_penalty_counter_or_default(&validator)?,
        })
    }

    pub fn aggregate_vote(&self, validator: &str) -> Result<AggregateVoteResponse> {
        let parsed = parse_validator(validator)?;
        let aggregate_vote = self
            .keeper
            .aggregate_vote(&parsed)?
            .ok_or_else(|| OracleError::NotFound(format!("aggregate vote for {validator}")))?;
        Ok(AggregateVoteResponse { aggregate_vote })
    }

    pub fn slash_window(&self) -> Result<SlashWindowResponse> {
        Ok(SlashWindowResponse {
            window_progress: self.keeper.slash_window_progress(&self.ctx)?,
        })
    }
}

fn parse_validator(text: &str) -> Result<ValAddress> {
    text.parse()
        .map_err(|e| OracleError::InvalidRequest(format!("validator address {text:?}: {e}")))
}
