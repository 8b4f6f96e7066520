//! Genesis state: import, export and TOML loading.
//!
//! Every section defaults to empty, so a genesis file only needs the parts
//! it actually sets. Vote targets fall back to the params whitelist when
//! the file omits them; an explicit empty list stays empty.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_store::KvStore;
use tessera_types::{
    validate_denom, AccAddress, AggregateExchangeRateVote, DenomOracleExchangeRate, Params,
    PriceSnapshot, ValAddress, VotePenaltyCounter,
};

use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

/// Complete module state at a chain boundary.
///
/// Plain arrays come before tables so the struct serializes to TOML in
/// field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Explicit vote targets. `None` means "use `params.whitelist`".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_targets: Option<Vec<String>>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub exchange_rates: Vec<DenomOracleExchangeRate>,
    #[serde(default)]
    pub feeder_delegations: Vec<FeederDelegation>,
    #[serde(default)]
    pub penalty_counters: Vec<PenaltyCounter>,
    #[serde(default)]
    pub aggregate_votes: Vec<AggregateExchangeRateVote>,
    #[serde(default)]
    pub price_snapshots: Vec<PriceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederDelegation {
    pub validator_address: ValAddress,
    pub feeder_address: AccAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyCounter {
    pub validator_address: ValAddress,
    pub vote_penalty_counter: VotePenaltyCounter,
}

impl GenesisState {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let genesis: GenesisState =
            toml::from_str(content).map_err(|e| OracleError::InvalidGenesis(e.to_string()))?;
        genesis.validate()?;
        Ok(genesis)
    }

    /// Read and validate a genesis file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OracleError::InvalidGenesis(format!("read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| OracleError::InvalidGenesis(e.to_string()))
    }

    /// Check every section before anything is written.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        let targets = self.vote_targets.as_deref().unwrap_or_default();
        unique("vote target", targets.iter())?;
        for denom in targets {
            validate_denom(denom)?;
        }

        unique("exchange rate denom", self.exchange_rates.iter().map(|r| &r.denom))?;
        for entry in &self.exchange_rates {
            validate_denom(&entry.denom)?;
            let rate = entry.oracle_exchange_rate.exchange_rate;
            if !rate.is_positive() {
                return Err(OracleError::InvalidExchangeRate {
                    denom: entry.denom.clone(),
                    rate,
                });
            }
        }

        unique(
            "feeder delegation",
            self.feeder_delegations.iter().map(|d| &d.validator_address),
        )?;
        unique(
            "penalty counter",
            self.penalty_counters.iter().map(|c| &c.validator_address),
        )?;

        unique("aggregate vote", self.aggregate_votes.iter().map(|v| &v.voter))?;
        for vote in &self.aggregate_votes {
            AggregateExchangeRateVote::new(vote.exchange_rate_tuples.clone(), vote.voter.clone())?;
        }

        unique(
            "price snapshot timestamp",
            self.price_snapshots.iter().map(|s| &s.snapshot_timestamp),
        )?;
        for snapshot in &self.price_snapshots {
            snapshot.validate()?;
        }
        Ok(())
    }
}

fn unique<'a, T: Ord + std::fmt::Debug + 'a>(
    what: &str,
    items: impl Iterator<Item = &'a T>,
) -> Result<()> {
    let mut seen = BTreeSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(OracleError::InvalidGenesis(format!("duplicate {what} {item:?}")));
        }
    }
    Ok(())
}

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    /// Load `genesis` into the store after validating it.
    pub fn init_genesis(&mut self, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;
        self.set_params(&genesis.params)?;

        match &genesis.vote_targets {
            Some(targets) => {
                for denom in targets {
                    self.set_vote_target(denom)?;
                }
            }
            None => {
                for denom in &genesis.params.whitelist {
                    self.set_vote_target(&denom.name)?;
                }
            }
        }

        for entry in &genesis.exchange_rates {
            self.set_exchange_rate_record(&entry.denom, &entry.oracle_exchange_rate)?;
        }
        for entry in &genesis.feeder_delegations {
            self.set_feeder_delegation(&entry.validator_address, &entry.feeder_address)?;
        }
        for entry in &genesis.penalty_counters {
            self.set_vote_penalty_counter(&entry.validator_address, &entry.vote_penalty_counter)?;
        }
        for vote in &genesis.aggregate_votes {
            self.set_aggregate_vote(&vote.voter, vote)?;
        }
        for snapshot in &genesis.price_snapshots {
            self.set_price_snapshot(snapshot)?;
        }

        tracing::info!(
            vote_targets = self.vote_targets()?.len(),
            exchange_rates = genesis.exchange_rates.len(),
            price_snapshots = genesis.price_snapshots.len(),
            "oracle genesis initialized"
        );
        Ok(())
    }

    /// Read the full module state back out, each section in key order.
    pub fn export_genesis(&self) -> Result<GenesisState> {
        Ok(GenesisState {
            vote_targets: Some(self.vote_targets()?),
            params: self.params()?,
            exchange_rates: self
                .exchange_rates()?
                .into_iter()
                .map(|(denom, oracle_exchange_rate)| DenomOracleExchangeRate {
                    denom,
                    oracle_exchange_rate,
                })
                .collect(),
            feeder_delegations: self
                .feeder_delegations()?
                .into_iter()
                .map(|(validator_address, feeder_address)| FeederDelegation {
                    validator_address,
                    feeder_address,
                })
                .collect(),
            penalty_counters: self
                .vote_penalty_counters()?
                .into_iter()
                .map(|(validator_address, vote_penalty_counter)| PenaltyCounter {
                    validator_address,
                    vote_penalty_counter,
                })
                .collect(),
            aggregate_votes: self.aggregate_votes()?,
            price_snapshots: self.price_snapshots()?,
        })
    }
}
