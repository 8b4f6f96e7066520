//! Staking collaborator interface.
//!
//! The oracle does not own validator state; it only asks whether a
//! validator exists and is bonded.

use tessera_types::ValAddress;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub operator: ValAddress,
    pub status: BondStatus,
    /// Consensus voting power.
    pub power: u64,
}

impl ValidatorInfo {
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }
}

/// Read access to the staking module.
pub trait StakingKeeper {
    /// Look up a validator by operator address.
    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo>;

    /// Bonded validators, ordered by operator address.
    fn bonded_validators(&self) -> Vec<ValidatorInfo>;
}

impl<T: StakingKeeper + ?Sized> StakingKeeper for &T {
    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        (**self).validator(operator)
    }

    fn bonded_validators(&self) -> Vec<ValidatorInfo> {
        (**self).bonded_validators()
    }
}
