//! Participation counters and slash-window progress.
//!
//! Each bonded validator gets one outcome per vote period: it voted with the
//! accepted set, it abstained, or it missed. The counters are read by the
//! slashing logic at the end of each slash window.

use std::collections::BTreeMap;

use tessera_store::KvStore;
use tessera_types::{ValAddress, VotePenaltyCounter};

use crate::context::BlockContext;
use crate::keeper::{Keeper, VOTE_PENALTY_COUNTERS};
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

/// A validator's result for one vote period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Success,
    Abstain,
    Miss,
}

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    pub fn vote_penalty_counter(&self, validator: &ValAddress) -> Result<Option<VotePenaltyCounter>> {
        Ok(VOTE_PENALTY_COUNTERS.get(&self.store, validator)?)
    }

    /// The validator's counters, all zero when none are stored.
    pub fn vote_penalty_counter_or_default(
        &self,
        validator: &ValAddress,
    ) -> Result<VotePenaltyCounter> {
        Ok(self.vote_penalty_counter(validator)?.unwrap_or_default())
    }

    pub fn set_vote_penalty_counter(
        &mut self,
        validator: &ValAddress,
        counter: &VotePenaltyCounter,
    ) -> Result<()> {
        VOTE_PENALTY_COUNTERS.set(&mut self.store, validator, counter)?;
        Ok(())
    }

    pub fn remove_vote_penalty_counter(&mut self, validator: &ValAddress) -> Result<()> {
        VOTE_PENALTY_COUNTERS.remove(&mut self.store, validator)?;
        Ok(())
    }

    /// All stored counters, ordered by validator.
    pub fn vote_penalty_counters(&self) -> Result<Vec<(ValAddress, VotePenaltyCounter)>> {
        Ok(VOTE_PENALTY_COUNTERS.entries(&self.store)?)
    }

    pub fn increment_miss_count(&mut self, validator: &ValAddress) -> Result<VotePenaltyCounter> {
        self.update_penalty_counter(validator, |c| c.miss_count = c.miss_count.saturating_add(1))
    }

    pub fn increment_abstain_count(&mut self, validator: &ValAddress) -> Result<VotePenaltyCounter> {
        self.update_penalty_counter(validator, |c| {
            c.abstain_count = c.abstain_count.saturating_add(1)
        })
    }

    pub fn increment_success_count(&mut self, validator: &ValAddress) -> Result<VotePenaltyCounter> {
        self.update_penalty_counter(validator, |c| {
            c.success_count = c.success_count.saturating_add(1)
        })
    }

    fn update_penalty_counter(
        &mut self,
        validator: &ValAddress,
        update: impl FnOnce(&mut VotePenaltyCounter),
    ) -> Result<VotePenaltyCounter> {
        let mut counter = self.vote_penalty_counter_or_default(validator)?;
        update(&mut counter);
        self.set_vote_penalty_counter(validator, &counter)?;
        Ok(counter)
    }

    /// Apply one vote period's outcomes. Every bonded validator without an
    /// entry in `outcomes` is counted as a miss. Outcomes for validators
    /// that are not bonded are ignored.
    pub fn record_participation(
        &mut self,
        outcomes: &BTreeMap<ValAddress, VoteOutcome>,
    ) -> Result<()> {
        let bonded = self.staking.bonded_validators();
        for info in &bonded {
            match outcomes.get(&info.operator).copied().unwrap_or(VoteOutcome::Miss) {
                VoteOutcome::Success => self.increment_success_count(&info.operator)?,
                VoteOutcome::Abstain => self.increment_abstain_count(&info.operator)?,
                VoteOutcome::Miss => self.increment_miss_count(&info.operator)?,
            };
        }
        tracing::debug!(validators = bonded.len(), "participation recorded");
        Ok(())
    }

    /// Clear every counter at the end of a slash window.
    pub fn reset_vote_penalty_counters(&mut self) -> Result<()> {
        for validator in VOTE_PENALTY_COUNTERS.keys(&self.store)? {
            VOTE_PENALTY_COUNTERS.remove(&mut self.store, &validator)?;
        }
        Ok(())
    }

    /// Number of vote periods already elapsed in the current slash window.
    pub fn slash_window_progress(&self, ctx: &BlockContext) -> Result<u64> {
        let params = self.params()?;
        slash_window_progress(ctx.height, params.slash_window, params.vote_period)
    }
}

/// `(height mod slash_window) / vote_period`.
pub fn slash_window_progress(height: i64, slash_window: u64, vote_period: u64) -> Result<u64> {
    let height = u64::try_from(height)
        .map_err(|_| OracleError::InvalidRequest(format!("negative block height {height}")))?;
    height
        .checked_rem(slash_window)
        .and_then(|offset| offset.checked_div(vote_period))
        .ok_or_else(|| OracleError::InvalidParams("slash_window and vote_period must be positive".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::BondStatus;
    use crate::testutil::{test_keeper, val_addr};

    #[test]
    fn test_missing_counter_is_zero() {
        let keeper = test_keeper();
        assert_eq!(
            keeper
                .vote_penalty_counter_or_default(&val_addr(1))
                .expect("counter"),
            VotePenaltyCounter::default()
        );
        assert!(keeper.vote_penalty_counter(&val_addr(1)).expect("get").is_none());
    }

    #[test]
    fn test_increments_touch_one_field() {
        let mut keeper = test_keeper();
        let val = val_addr(1);

        keeper.increment_miss_count(&val).expect("miss");
        keeper.increment_miss_count(&val).expect("miss");
        keeper.increment_abstain_count(&val).expect("abstain");
        let counter = keeper.increment_success_count(&val).expect("success");

        assert_eq!(
            counter,
            VotePenaltyCounter {
                miss_count: 2,
                abstain_count: 1,
                success_count: 1,
            }
        );
        assert_eq!(
            keeper.vote_penalty_counter(&val).expect("get"),
            Some(counter)
        );
        // Other validators are untouched.
        assert!(keeper.vote_penalty_counter(&val_addr(2)).expect("get").is_none());
    }

    #[test]
    fn test_record_participation() {
        let mut keeper = test_keeper();
        keeper
            .staking_mut()
            .set_status(&val_addr(3), BondStatus::Unbonded);

        let mut outcomes = BTreeMap::new();
        outcomes.insert(val_addr(1), VoteOutcome::Success);
        outcomes.insert(val_addr(3), VoteOutcome::Abstain);
        keeper.record_participation(&outcomes).expect("record");

        let one = keeper.vote_penalty_counter_or_default(&val_addr(1)).expect("1");
        let two = keeper.vote_penalty_counter_or_default(&val_addr(2)).expect("2");
        let three = keeper.vote_penalty_counter(&val_addr(3)).expect("3");
        assert_eq!(one.success_count, 1);
        assert_eq!(two.miss_count, 1);
        assert!(three.is_none());
    }

    #[test]
    fn test_reset_counters() {
        let mut keeper = test_keeper();
        keeper.increment_miss_count(&val_addr(1)).expect("miss");
        keeper.increment_miss_count(&val_addr(2)).expect("miss");
        keeper.reset_vote_penalty_counters().expect("reset");
        assert!(keeper.vote_penalty_counters().expect("list").is_empty());
    }

    #[test]
    fn test_slash_window_progress() {
        assert_eq!(slash_window_progress(0, 100, 5).expect("progress"), 0);
        assert_eq!(slash_window_progress(99, 100, 5).expect("progress"), 19);
        assert_eq!(slash_window_progress(100, 100, 5).expect("progress"), 0);
        assert_eq!(slash_window_progress(212, 100, 5).expect("progress"), 2);
        assert!(matches!(
            slash_window_progress(10, 0, 5),
            Err(OracleError::InvalidParams(_))
        ));
        assert!(matches!(
            slash_window_progress(-1, 100, 5),
            Err(OracleError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_slash_window_progress_from_params() {
        let keeper = test_keeper();
        // Defaults: slash window 100_800, vote period 5.
        let ctx = BlockContext::at_secs(100_800 + 27, 0);
        assert_eq!(keeper.slash_window_progress(&ctx).expect("progress"), 5);
    }
}
