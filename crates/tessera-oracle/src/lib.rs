//! # tessera-oracle
//!
//! Price-oracle keeper for a replicated state machine.
//!
//! Validators (or feeders they delegate to) submit exchange-rate votes; an
//! external end-of-block tally turns them into one accepted rate per denom.
//! This crate owns the state around that tally: who may vote, the current
//! rates, a bounded history of per-block price snapshots, time-weighted
//! average prices over that history, and per-validator participation
//! counters consumed by slashing.
//!
//! Every operation is a pure function of the stored state, the
//! [`BlockContext`] and its explicit arguments. There is no clock, no
//! randomness and no floating point, so all replicas derive identical state.
//!
//! ## Modules
//!
//! - [`keeper`] — state layout, params, exchange rates, vote targets, votes
//! - [`feeder`] — feeder delegation and vote authorization
//! - [`snapshot`] — price snapshot history with retention pruning
//! - [`twap`] — time-weighted average prices over the snapshot history
//! - [`penalty`] — participation counters and slash-window progress
//! - [`prune`] — removal of rates for de-listed denoms
//! - [`msg_server`] — validator-facing messages
//! - [`query`] — read-only query surface
//! - [`genesis`] — genesis import/export and TOML loading

pub mod context;
pub mod feeder;
pub mod genesis;
pub mod keeper;
pub mod msg_server;
pub mod penalty;
pub mod prune;
pub mod query;
pub mod snapshot;
pub mod staking;
pub mod twap;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use context::BlockContext;
pub use genesis::GenesisState;
pub use keeper::Keeper;
pub use msg_server::{MsgAggregateExchangeRateVote, MsgDelegateFeedConsent};
pub use penalty::VoteOutcome;
pub use query::QueryServer;
pub use staking::{BondStatus, StakingKeeper, ValidatorInfo};
pub use twap::validate_lookback_seconds;

use tessera_store::StoreError;
use tessera_types::{AccAddress, AddressError, Dec, DecimalError, Height, TypesError, ValAddress};

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The feeder is neither the validator nor its registered delegate.
    #[error("feeder {feeder} has no voting permission for validator {validator}")]
    NoVotingPermission {
        /// Account that signed the vote.
        feeder: AccAddress,
        /// Validator the vote was submitted for.
        validator: ValAddress,
    },

    /// The staking module has no record of the validator.
    #[error("validator {0} not found")]
    ValidatorNotFound(ValAddress),

    /// The validator exists but is not bonded.
    #[error("validator {0} is not in the active set")]
    ValidatorNotActive(ValAddress),

    /// A rate that must be positive was zero or negative.
    #[error("exchange rate for denom {denom} must be greater than zero, got {rate}")]
    InvalidExchangeRate {
        /// Denom the rate was given for.
        denom: String,
        /// The rejected rate.
        rate: Dec,
    },

    /// The same denom appeared twice in one rate list.
    #[error("duplicate denom {0}")]
    DuplicateDenom(String),

    /// A vote named a denom that is not currently a vote target.
    #[error("denom {0} is not a vote target")]
    UnknownDenom(String),

    /// Denom is empty, too long or contains disallowed characters.
    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),

    /// An `<amount><denom>` entry in a vote could not be parsed.
    #[error("malformed exchange rate {coin:?}: {reason}")]
    MalformedExchangeRate {
        /// The offending entry as submitted.
        coin: String,
        /// Why it was rejected.
        reason: String,
    },

    /// TWAP lookback outside `[1, lookback_duration]`.
    #[error("invalid twap lookback {requested}s: must be between 1 and {max}")]
    InvalidTwapLookback {
        /// Lookback asked for, in seconds.
        requested: u64,
        /// Configured `lookback_duration`, in seconds.
        max: u64,
    },

    /// No vote-target denom has a snapshot in the lookback window.
    #[error("no twap data in the requested window")]
    NoTwapData,

    /// A snapshot is already stored at this unix timestamp.
    #[error("price snapshot already exists at timestamp {0}")]
    DuplicateSnapshot(i64),

    /// A second vote from the same validator within one block.
    #[error("validator {validator} already voted at height {height}")]
    AlreadyVoted {
        /// Validator that voted twice.
        validator: ValAddress,
        /// Height of the earlier vote.
        height: Height,
    },

    /// Params failed validation.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// A query or message argument is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A queried record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Genesis file could not be read, parsed or validated.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Address parsing or length error.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Decimal parsing or arithmetic error.
    #[error(transparent)]
    Decimal(#[from] DecimalError),

    /// Underlying key-value store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OracleError {
    /// Stable numeric code, identical on every replica.
    pub fn code(&self) -> u32 {
        match self {
            OracleError::NoVotingPermission { .. } => 1,
            OracleError::ValidatorNotFound(_) => 2,
            OracleError::ValidatorNotActive(_) => 3,
            OracleError::InvalidExchangeRate { .. } => 4,
            OracleError::DuplicateDenom(_) => 5,
            OracleError::UnknownDenom(_) => 6,
            OracleError::InvalidDenom(_) => 7,
            OracleError::MalformedExchangeRate { .. } => 8,
            OracleError::InvalidTwapLookback { .. } => 9,
            OracleError::NoTwapData => 10,
            OracleError::DuplicateSnapshot(_) => 11,
            OracleError::AlreadyVoted { .. } => 12,
            OracleError::InvalidParams(_) => 13,
            OracleError::InvalidRequest(_) => 14,
            OracleError::NotFound(_) => 15,
            OracleError::InvalidGenesis(_) => 16,
            OracleError::Address(_) => 17,
            OracleError::Decimal(_) => 18,
            OracleError::Store(_) => 19,
        }
    }
}

impl From<TypesError> for OracleError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::InvalidDenom(denom) => OracleError::InvalidDenom(denom),
            TypesError::InvalidExchangeRate { denom, rate } => {
                OracleError::InvalidExchangeRate { denom, rate }
            }
            TypesError::DuplicateDenom(denom) => OracleError::DuplicateDenom(denom),
            TypesError::MalformedCoin { coin, reason } => {
                OracleError::MalformedExchangeRate { coin, reason }
            }
            TypesError::InvalidParams(detail) => OracleError::InvalidParams(detail),
        }
    }
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_error_mapping() {
        let err: OracleError = TypesError::DuplicateDenom("ubtc".into()).into();
        assert!(matches!(err, OracleError::DuplicateDenom(ref d) if d == "ubtc"));
        assert_eq!(err.code(), 5);

        let err: OracleError = TypesError::InvalidParams("x".into()).into();
        assert_eq!(err.code(), 13);
    }

    #[test]
    fn test_error_messages() {
        let err = OracleError::InvalidTwapLookback {
            requested: 0,
            max: 3600,
        };
        assert_eq!(
            err.to_string(),
            "invalid twap lookback 0s: must be between 1 and 3600"
        );
        assert_eq!(OracleError::NoTwapData.code(), 10);
    }
}
