// crates/lmine-engine/src/registry.rs
//
// Pool registry and allocation weights.
//
// Every registered pool carries a weight out of a fixed `total_numerator`.
// Weights are replaced only as a whole: an update must name exactly the set
// of registered pools and its weights must sum to the numerator. A new
// setting takes effect from the epoch after the one in which it was made, so
// the budget split of an epoch is fixed once that epoch has started.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use lmine_core::{EpochId, MiningError, PoolId};

/// One complete weight assignment and the first epoch it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSetting {
    pub effective_from: EpochId,
    pub weights: BTreeMap<PoolId, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRegistry {
    total_numerator: u64,
    pools: BTreeSet<PoolId>,
    /// Ordered by `effective_from`, strictly increasing.
    settings: Vec<AllocationSetting>,
}

impl AllocationRegistry {
    pub fn new(total_numerator: u64) -> Self {
        Self {
            total_numerator,
            pools: BTreeSet::new(),
            settings: Vec::new(),
        }
    }

    pub fn total_numerator(&self) -> u64 {
        self.total_numerator
    }

    pub fn pools(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.pools.iter().copied()
    }

    pub fn contains(&self, pool: PoolId) -> bool {
        self.pools.contains(&pool)
    }

    /// Register a pool. The first pool receives the whole numerator; later
    /// pools join every recorded setting with weight 0, which leaves both the
    /// sum and every other pool's budget unchanged.
    ///
    /// # Errors
    /// Returns `MiningError::DuplicatePool` if the id is already registered.
    pub fn register(&mut self, pool: PoolId) -> Result<(), MiningError> {
        if self.pools.contains(&pool) {
            return Err(MiningError::DuplicatePool(pool));
        }
        if self.settings.is_empty() {
            let mut weights = BTreeMap::new();
            weights.insert(pool, self.total_numerator);
            self.settings.push(AllocationSetting {
                effective_from: 1,
                weights,
            });
        } else {
            for setting in &mut self.settings {
                setting.weights.insert(pool, 0);
            }
        }
        self.pools.insert(pool);
        Ok(())
    }

    /// Validate a full replacement of the weight set without applying it.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidAllocationSetting` if the lists differ in
    /// length, a pool is repeated, the pools are not exactly the registered
    /// set, or the weights do not sum to the numerator.
    pub fn validate(&self, pools: &[PoolId], weights: &[u64]) -> Result<(), MiningError> {
        if pools.len() != weights.len() {
            return Err(MiningError::InvalidAllocationSetting(format!(
                "{} pools but {} weights",
                pools.len(),
                weights.len()
            )));
        }
        let named: BTreeSet<PoolId> = pools.iter().copied().collect();
        if named.len() != pools.len() {
            return Err(MiningError::InvalidAllocationSetting(
                "duplicate pool in setting".to_string(),
            ));
        }
        if named != self.pools {
            return Err(MiningError::InvalidAllocationSetting(format!(
                "setting names pools {:?} but registered pools are {:?}",
                named, self.pools
            )));
        }
        let sum: u128 = weights.iter().map(|&w| w as u128).sum();
        if sum != self.total_numerator as u128 {
            return Err(MiningError::InvalidAllocationSetting(format!(
                "weights sum to {} but must sum to {}",
                sum, self.total_numerator
            )));
        }
        Ok(())
    }

    /// Replace every pool's weight from `effective_from` onwards.
    ///
    /// A setting already recorded for the same epoch is overwritten.
    ///
    /// # Errors
    /// Same conditions as `validate`, plus `InvalidAllocationSetting` if
    /// `effective_from` precedes the latest recorded setting.
    pub fn set(
        &mut self,
        pools: &[PoolId],
        weights: &[u64],
        effective_from: EpochId,
    ) -> Result<(), MiningError> {
        self.validate(pools, weights)?;
        if let Some(latest) = self.settings.last() {
            if effective_from < latest.effective_from {
                return Err(MiningError::InvalidAllocationSetting(format!(
                    "setting for epoch {} precedes the latest setting for epoch {}",
                    effective_from, latest.effective_from
                )));
            }
        }

        let setting = AllocationSetting {
            effective_from,
            weights: pools.iter().copied().zip(weights.iter().copied()).collect(),
        };
        match self.settings.last_mut() {
            Some(latest) if latest.effective_from == effective_from => *latest = setting,
            _ => self.settings.push(setting),
        }
        Ok(())
    }

    /// Weight of `pool` in force during `epoch` (0 if unknown).
    pub fn weight_for_epoch(&self, pool: PoolId, epoch: EpochId) -> u64 {
        self.settings
            .iter()
            .rev()
            .find(|s| s.effective_from <= epoch)
            .and_then(|s| s.weights.get(&pool).copied())
            .unwrap_or(0)
    }

    /// The most recently recorded weight set, which may not be in force yet.
    pub fn current_weights(&self) -> BTreeMap<PoolId, u64> {
        self.settings
            .last()
            .map(|s| s.weights.clone())
            .unwrap_or_default()
    }

    pub fn settings(&self) -> &[AllocationSetting] {
        &self.settings
    }
}
