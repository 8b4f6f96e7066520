//! Exchange-rate votes.
//!
//! A validator (or its feeder) submits a comma-separated list of decimal
//! coins, e.g. `"12.00uatom,1234.12ueth"`. Parsing accepts zero rates, which
//! signal abstention to the tally; an [`AggregateExchangeRateVote`] stored
//! for tallying must only hold strictly positive rates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::oracle::validate_denom;
use crate::{Dec, Result, TypesError, ValAddress};

/// One `(denom, rate)` pair of a vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateTuple {
    pub denom: String,
    pub exchange_rate: Dec,
}

impl ExchangeRateTuple {
    pub fn new(denom: impl Into<String>, exchange_rate: Dec) -> Self {
        Self {
            denom: denom.into(),
            exchange_rate,
        }
    }
}

/// The last set of rates a validator submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateExchangeRateVote {
    pub voter: ValAddress,
    pub exchange_rate_tuples: Vec<ExchangeRateTuple>,
}

impl AggregateExchangeRateVote {
    /// Build a vote, checking its shape.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidDenom`] for a malformed denom
    /// - [`TypesError::InvalidExchangeRate`] if any rate is zero or negative
    /// - [`TypesError::DuplicateDenom`] if a denom appears twice
    pub fn new(exchange_rate_tuples: Vec<ExchangeRateTuple>, voter: ValAddress) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for tuple in &exchange_rate_tuples {
            validate_denom(&tuple.denom)?;
            if !tuple.exchange_rate.is_positive() {
                return Err(TypesError::InvalidExchangeRate {
                    denom: tuple.denom.clone(),
                    rate: tuple.exchange_rate,
                });
            }
            if !seen.insert(tuple.denom.as_str()) {
                return Err(TypesError::DuplicateDenom(tuple.denom.clone()));
            }
        }
        Ok(Self {
            voter,
            exchange_rate_tuples,
        })
    }
}

/// Parse `"<amount><denom>,<amount><denom>,..."` into tuples.
///
/// Surrounding whitespace is ignored and an empty string yields no tuples.
///
/// # Errors
///
/// - [`TypesError::MalformedCoin`] if a coin has no amount, a negative or
///   unparsable amount, or no denom
/// - [`TypesError::InvalidDenom`] for a malformed denom
/// - [`TypesError::DuplicateDenom`] if a denom appears twice
pub fn parse_exchange_rate_tuples(input: &str) -> Result<Vec<ExchangeRateTuple>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = BTreeSet::new();
    let mut tuples = Vec::new();
    for coin in input.split(',') {
        let tuple = parse_dec_coin(coin)?;
        if !seen.insert(tuple.denom.clone()) {
            return Err(TypesError::DuplicateDenom(tuple.denom));
        }
        tuples.push(tuple);
    }
    Ok(tuples)
}

fn parse_dec_coin(coin: &str) -> Result<ExchangeRateTuple> {
    let coin = coin.trim();
    let malformed = |reason: &str| TypesError::MalformedCoin {
        coin: coin.to_string(),
        reason: reason.to_string(),
    };

    let split = coin
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| malformed("missing denom"))?;
    let (amount, denom) = coin.split_at(split);
    let amount = amount.trim_end();

    if amount.is_empty() {
        return Err(malformed("missing amount"));
    }
    if !amount.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(malformed("amount must be a non-negative decimal"));
    }
    let exchange_rate: Dec = amount.parse().map_err(|e| malformed(&format!("{e}")))?;
    validate_denom(denom)?;

    Ok(ExchangeRateTuple::new(denom, exchange_rate))
}
