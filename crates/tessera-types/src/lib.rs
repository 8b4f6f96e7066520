//! # tessera-types
//!
//! Shared domain types for the tessera price oracle.
//!
//! Everything here is plain data plus validation: the decimal type, the two
//! address forms, the persisted oracle records, vote tuples and the events
//! the keeper emits. State access lives in `tessera-oracle`.

pub mod address;
pub mod decimal;
pub mod events;
pub mod oracle;
pub mod vote;

pub use address::{AccAddress, AddressError, ValAddress};
pub use decimal::{Dec, DecimalError, WeightedSum};
pub use events::OracleEvent;
pub use oracle::{
    validate_denom, Denom, DenomOracleExchangeRate, OracleExchangeRate, OracleTwap, Params,
    PriceSnapshot, PriceSnapshotItem, VotePenaltyCounter,
};
pub use vote::{parse_exchange_rate_tuples, AggregateExchangeRateVote, ExchangeRateTuple};

/// Block height.
pub type Height = i64;

/// Unix time in whole seconds.
pub type UnixSeconds = i64;

/// Unix time in milliseconds.
pub type UnixMillis = i64;

/// Validation errors raised while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),

    /// Exchange rates must be strictly positive.
    #[error("exchange rate for denom {denom} must be greater than zero, got {rate}")]
    InvalidExchangeRate { denom: String, rate: Dec },

    #[error("duplicate denom {0}")]
    DuplicateDenom(String),

    #[error("invalid coin {coin:?}: {reason}")]
    MalformedCoin { coin: String, reason: String },

    #[error("invalid params: {0}")]
    InvalidParams(String),
}

/// Convenience result type for type validation.
pub type Result<T> = std::result::Result<T, TypesError>;
