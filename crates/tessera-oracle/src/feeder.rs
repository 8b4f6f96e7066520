//! Feeder delegation and vote authorization.
//!
//! A validator may hand its price-feeding right to one other account. Without
//! a delegation the validator's own account is the feeder. Authorization
//! first checks the delegation, then that the validator is bonded.

use tessera_store::KvStore;
use tessera_types::{AccAddress, OracleEvent, ValAddress};

use crate::keeper::{Keeper, FEEDER_DELEGATIONS};
use crate::staking::StakingKeeper;
use crate::{OracleError, Result};

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    /// The stored delegate for `validator`, if one was registered.
    pub fn feeder_delegation(&self, validator: &ValAddress) -> Result<Option<AccAddress>> {
        Ok(FEEDER_DELEGATIONS.get(&self.store, validator)?)
    }

    /// The account allowed to feed for `validator`: its delegate, or the
    /// validator's own account when none is set.
    pub fn feeder_delegation_or_default(&self, validator: &ValAddress) -> Result<AccAddress> {
        Ok(self
            .feeder_delegation(validator)?
            .unwrap_or_else(|| AccAddress::from(validator)))
    }

    pub fn set_feeder_delegation(
        &mut self,
        validator: &ValAddress,
        delegate: &AccAddress,
    ) -> Result<()> {
        FEEDER_DELEGATIONS.set(&mut self.store, validator, delegate)?;
        Ok(())
    }

    /// All explicit delegations, ordered by validator.
    pub fn feeder_delegations(&self) -> Result<Vec<(ValAddress, AccAddress)>> {
        Ok(FEEDER_DELEGATIONS.entries(&self.store)?)
    }

    /// Register `delegate` as the feeder for `operator`, replacing any
    /// previous delegate. The operator must be a known validator.
    pub fn delegate_feed_consent(
        &mut self,
        operator: &ValAddress,
        delegate: &AccAddress,
    ) -> Result<()> {
        if self.staking.validator(operator).is_none() {
            return Err(OracleError::ValidatorNotFound(operator.clone()));
        }
        self.set_feeder_delegation(operator, delegate)?;
        tracing::info!(%operator, %delegate, "feeder delegated");
        self.emit(OracleEvent::FeedDelegate {
            operator: operator.clone(),
            feeder: delegate.clone(),
        });
        Ok(())
    }

    /// Check that `feeder` may submit prices for `validator`.
    ///
    /// A feeder that is not the validator itself must match the stored
    /// delegate. The validator itself always passes this step, even after
    /// delegating. The validator must then exist and be bonded.
    pub fn validate_feeder(&self, feeder: &AccAddress, validator: &ValAddress) -> Result<()> {
        if *feeder != *validator {
            let delegate = self.feeder_delegation_or_default(validator)?;
            if delegate != *feeder {
                return Err(OracleError::NoVotingPermission {
                    feeder: feeder.clone(),
                    validator: validator.clone(),
                });
            }
        }

        match self.staking.validator(validator) {
            None => Err(OracleError::ValidatorNotFound(validator.clone())),
            Some(info) if !info.is_bonded() => {
                Err(OracleError::ValidatorNotActive(validator.clone()))
            }
            Some(_) => Ok(()),
        }
    }
}
