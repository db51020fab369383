// crates/lmine-engine/src/vesting.rs
//
// Vesting of settled allocations.
//
// An allocation A settled for epoch e is released over the next V epochs:
// each of e+1 ..= e+V receives floor(A / V), and the remainder A mod V is
// added to the first bucket (e+1), so the buckets always sum to exactly A.
//
// Buckets from different epochs that mature in the same epoch are merged.
// Redemption removes every bucket whose target epoch has been reached, which
// is what makes a second redemption in the same epoch pay nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, UserId};

use crate::math::checked_add;

/// An amount that becomes redeemable once `target_epoch` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingBucket {
    pub target_epoch: EpochId,
    pub amount: Amount,
}

/// Split `allocation` settled in `epoch` into `vesting_epochs` buckets.
///
/// Returns an empty list for a zero allocation or a zero vesting span.
pub fn split_allocation(epoch: EpochId, allocation: Amount, vesting_epochs: u64) -> Vec<VestingBucket> {
    if allocation == 0 || vesting_epochs == 0 {
        return Vec::new();
    }
    let base = allocation / vesting_epochs;
    let remainder = allocation % vesting_epochs;
    (1..=vesting_epochs)
        .map(|offset| VestingBucket {
            target_epoch: epoch.saturating_add(offset),
            amount: if offset == 1 { base + remainder } else { base },
        })
        .collect()
}

/// Claimed total and still-pending buckets for one user in one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccount {
    /// Everything paid out so far.
    pub claimed_total: Amount,
    /// Unclaimed amounts keyed by the epoch they mature in.
    pub buckets: BTreeMap<EpochId, Amount>,
}

impl RewardAccount {
    /// Sum of buckets matured by `current_epoch`.
    pub fn matured(&self, current_epoch: EpochId) -> Amount {
        self.buckets
            .range(..=current_epoch)
            .fold(0, |acc: Amount, (_, amount)| acc.saturating_add(*amount))
    }

    /// Buckets that are still locked at `current_epoch`.
    pub fn locked(&self, current_epoch: EpochId) -> Vec<VestingBucket> {
        self.buckets
            .range(current_epoch.saturating_add(1)..)
            .map(|(&target_epoch, &amount)| VestingBucket {
                target_epoch,
                amount,
            })
            .collect()
    }
}

/// Reward accounts of every user in one pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VestingBook {
    accounts: BTreeMap<UserId, RewardAccount>,
}

impl VestingBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add buckets to `user`'s pending balance.
    ///
    /// Bucket totals never exceed the rewards funded for the pool, which fit
    /// in `Amount`, so the merge saturates rather than fails.
    pub fn credit(&mut self, user: &UserId, buckets: &[VestingBucket]) {
        if buckets.is_empty() {
            return;
        }
        let account = self.accounts.entry(user.clone()).or_default();
        for bucket in buckets {
            let slot = account.buckets.entry(bucket.target_epoch).or_insert(0);
            *slot = slot.saturating_add(bucket.amount);
        }
    }

    /// Claim every bucket of `user` matured by `current_epoch`.
    ///
    /// Returns the amount claimed (0 when nothing has matured).
    ///
    /// # Errors
    /// Returns `MiningError::ArithmeticOverflow` if the claimed total would
    /// overflow; nothing is claimed in that case.
    pub fn redeem(&mut self, user: &UserId, current_epoch: EpochId) -> Result<Amount, MiningError> {
        let Some(account) = self.accounts.get_mut(user) else {
            return Ok(0);
        };
        let payout = account.matured(current_epoch);
        if payout == 0 {
            return Ok(0);
        }
        checked_add(account.claimed_total, payout, "claimed total")?;
        Ok(self.claim(user, current_epoch))
    }

    /// Remove every matured bucket of `user` and add it to the claimed total.
    /// Callers check the claimed total for overflow first.
    pub(crate) fn claim(&mut self, user: &UserId, current_epoch: EpochId) -> Amount {
        let Some(account) = self.accounts.get_mut(user) else {
            return 0;
        };
        let payout = account.matured(current_epoch);
        let still_locked = account.buckets.split_off(&current_epoch.saturating_add(1));
        account.buckets = still_locked;
        account.claimed_total = account.claimed_total.saturating_add(payout);
        payout
    }

    pub fn account(&self, user: &UserId) -> Option<&RewardAccount> {
        self.accounts.get(user)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&UserId, &RewardAccount)> {
        self.accounts.iter()
    }

    /// Vested-but-unclaimed amount for `user` at `current_epoch`.
    pub fn pending(&self, user: &UserId, current_epoch: EpochId) -> Amount {
        self.accounts
            .get(user)
            .map(|a| a.matured(current_epoch))
            .unwrap_or(0)
    }

    pub fn claimed_total(&self, user: &UserId) -> Amount {
        self.accounts.get(user).map(|a| a.claimed_total).unwrap_or(0)
    }
}
