//! Removal of rates for denoms that are no longer vote targets.

use std::collections::BTreeSet;

use tessera_store::KvStore;

use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::Result;

impl<S: KvStore, K: StakingKeeper> Keeper<S, K> {
    /// Delete the stored rate of every denom that is not a vote target.
    ///
    /// Returns the removed denoms in ascending order.
    pub fn remove_excess_feeds(&mut self) -> Result<Vec<String>> {
        let targets: BTreeSet<String> = self.vote_targets()?.into_iter().collect();
        let excess: Vec<String> = self
            .active_denoms()?
            .into_iter()
            .filter(|denom| !targets.contains(denom))
            .collect();

        for denom in &excess {
            self.remove_exchange_rate(denom)?;
        }
        if !excess.is_empty() {
            tracing::info!(removed = ?excess, "removed rates for de-listed denoms");
        }
        Ok(excess)
    }
}
