// crates/lmine-engine/src/schedule.rs
//
// Global reward budget per epoch (REWARDS_PER_EPOCH).
//
// Budgets are written by an operator ahead of time. Once an epoch has
// started its budget is frozen; unfunded epochs emit nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, RewardBudgetSource, Timestamp};

use crate::clock::EpochClock;
use crate::math::checked_add;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardSchedule {
    per_epoch: BTreeMap<EpochId, Amount>,
    total_funded: Amount,
}

impl RewardSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the budget of a single epoch.
    ///
    /// # Errors
    /// Returns `MiningError::RewardsLocked` if `epoch` has already started at
    /// `now` (or is epoch 0), and `MiningError::ArithmeticOverflow` if the
    /// funded total would overflow.
    pub fn set_epoch_rewards(
        &mut self,
        clock: &EpochClock,
        epoch: EpochId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), MiningError> {
        self.fund_epochs(clock, epoch, &[amount], now)
    }

    /// Set the budgets of consecutive epochs starting at `first_epoch`.
    /// Either every epoch is written or none is.
    ///
    /// # Errors
    /// Same conditions as `set_epoch_rewards`, checked for every epoch.
    pub fn fund_epochs(
        &mut self,
        clock: &EpochClock,
        first_epoch: EpochId,
        amounts: &[Amount],
        now: Timestamp,
    ) -> Result<(), MiningError> {
        let current_epoch = clock.epoch_or_zero(now);
        if first_epoch == 0 || first_epoch <= current_epoch {
            return Err(MiningError::RewardsLocked {
                epoch: first_epoch,
                current_epoch,
            });
        }

        let mut total = self.total_funded;
        for (offset, &amount) in amounts.iter().enumerate() {
            let epoch = first_epoch + offset as EpochId;
            let previous = self.per_epoch.get(&epoch).copied().unwrap_or(0);
            total = checked_add(total - previous, amount, "funded rewards")?;
        }

        for (offset, &amount) in amounts.iter().enumerate() {
            self.per_epoch.insert(first_epoch + offset as EpochId, amount);
        }
        self.total_funded = total;
        Ok(())
    }

    /// Sum of every epoch's budget.
    pub fn total_funded(&self) -> Amount {
        self.total_funded
    }

    /// Last epoch with a non-zero budget, if any.
    pub fn last_funded_epoch(&self) -> Option<EpochId> {
        self.per_epoch
            .iter()
            .rev()
            .find(|(_, &amount)| amount > 0)
            .map(|(&epoch, _)| epoch)
    }
}

impl RewardBudgetSource for RewardSchedule {
    fn rewards_for_epoch(&self, epoch: EpochId) -> Amount {
        self.per_epoch.get(&epoch).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Timestamp = 10_000;
    const EPOCH: u64 = 100;

    fn clock() -> EpochClock {
        EpochClock::new(START, EPOCH).unwrap()
    }

    #[test]
    fn test_fund_before_start() {
        let mut schedule = RewardSchedule::new();
        schedule.fund_epochs(&clock(), 1, &[10, 20, 30], 0).unwrap();
        assert_eq!(schedule.rewards_for_epoch(1), 10);
        assert_eq!(schedule.rewards_for_epoch(3), 30);
        assert_eq!(schedule.rewards_for_epoch(4), 0);
        assert_eq!(schedule.total_funded(), 60);
        assert_eq!(schedule.last_funded_epoch(), Some(3));
    }

    #[test]
    fn test_started_epoch_is_locked() {
        let mut schedule = RewardSchedule::new();
        let c = clock();
        let err = schedule.set_epoch_rewards(&c, 2, 5, c.start(2)).unwrap_err();
        assert_eq!(
            err,
            MiningError::RewardsLocked {
                epoch: 2,
                current_epoch: 2
            }
        );
        assert!(schedule.set_epoch_rewards(&c, 3, 5, c.start(2)).is_ok());
    }

    #[test]
    fn test_epoch_zero_rejected() {
        let mut schedule = RewardSchedule::new();
        assert!(schedule.set_epoch_rewards(&clock(), 0, 5, 0).is_err());
    }

    #[test]
    fn test_overwrite_future_epoch_adjusts_total() {
        let mut schedule = RewardSchedule::new();
        let c = clock();
        schedule.fund_epochs(&c, 1, &[10, 20], 0).unwrap();
        schedule.set_epoch_rewards(&c, 2, 5, 0).unwrap();
        assert_eq!(schedule.rewards_for_epoch(2), 5);
        assert_eq!(schedule.total_funded(), 15);
    }

    #[test]
    fn test_overflow_leaves_schedule_untouched() {
        let mut schedule = RewardSchedule::new();
        let c = clock();
        schedule.set_epoch_rewards(&c, 1, u64::MAX, 0).unwrap();
        assert!(schedule.fund_epochs(&c, 2, &[1, 1], 0).is_err());
        assert_eq!(schedule.rewards_for_epoch(2), 0);
        assert_eq!(schedule.total_funded(), u64::MAX);
    }
}
