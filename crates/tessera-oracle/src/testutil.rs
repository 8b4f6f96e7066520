//! Test fixtures: an in-memory staking module and deterministic addresses.

use std::collections::BTreeMap;

use tessera_store::MemStore;
use tessera_types::{AccAddress, Denom, Params, ValAddress};

use crate::keeper::Keeper;
use crate::staking::{BondStatus, StakingKeeper, ValidatorInfo};

/// Staking module backed by a map.
#[derive(Clone, Debug, Default)]
pub struct MockStaking {
    validators: BTreeMap<ValAddress, ValidatorInfo>,
}

impl MockStaking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staking state with every given operator bonded at power 1.
    pub fn with_bonded(operators: impl IntoIterator<Item = ValAddress>) -> Self {
        let mut staking = Self::new();
        for operator in operators {
            staking.insert(operator, BondStatus::Bonded, 1);
        }
        staking
    }

    pub fn insert(&mut self, operator: ValAddress, status: BondStatus, power: u64) {
        self.validators.insert(
            operator.clone(),
            ValidatorInfo {
                operator,
                status,
                power,
            },
        );
    }

    pub fn set_status(&mut self, operator: &ValAddress, status: BondStatus) {
        if let Some(info) = self.validators.get_mut(operator) {
            info.status = status;
        }
    }

    pub fn remove(&mut self, operator: &ValAddress) {
        self.validators.remove(operator);
    }
}

impl StakingKeeper for MockStaking {
    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        self.validators.get(operator).cloned()
    }

    fn bonded_validators(&self) -> Vec<ValidatorInfo> {
        self.validators
            .values()
            .filter(|info| info.is_bonded())
            .cloned()
            .collect()
    }
}

/// 20-byte validator address filled with `seed`.
pub fn val_addr(seed: u8) -> ValAddress {
    ValAddress::new(vec![seed; 20]).expect("non-empty address")
}

/// 20-byte account address filled with `seed`, distinct from `val_addr(seed)`
/// by its last byte.
pub fn acc_addr(seed: u8) -> AccAddress {
    let mut bytes = vec![seed; 20];
    bytes[19] = seed.wrapping_add(0x80);
    AccAddress::new(bytes).expect("non-empty address")
}

/// Params used by the keeper tests: 1h lookback, three whitelisted denoms.
pub fn test_params() -> Params {
    Params {
        whitelist: ["uatom", "ubtc", "ueth"].into_iter().map(Denom::new).collect(),
        ..Params::default()
    }
}

/// A keeper over a fresh `MemStore` with [`test_params`], the whitelist
/// installed as vote targets and validators 1..=3 bonded.
pub fn test_keeper() -> Keeper<MemStore, MockStaking> {
    let staking = MockStaking::with_bonded((1..=3).map(val_addr));
    let mut keeper = Keeper::new(MemStore::new(), staking);
    let params = test_params();
    keeper.set_params(&params).expect("valid params");
    for denom in &params.whitelist {
        keeper.set_vote_target(&denom.name).expect("valid denom");
    }
    keeper
}
