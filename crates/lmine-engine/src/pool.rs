// crates/lmine-engine/src/pool.rs
//
// Per-pool state: the stake ledger, the settlement cache, and the vesting
// book of one staking market.
//
// Every mutating call validates first, then settles each epoch that has fully
// elapsed (see `settlement.rs`), and only then records the new action. A
// ledger change therefore never lands inside an epoch that is already
// settled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, PoolId, RewardBudgetSource, Timestamp, UserId};

use crate::ledger::StakeLedger;
use crate::settlement::{EpochSettlement, SettlementContext};
use crate::vesting::VestingBook;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolState {
    pub(crate) pool_id: PoolId,
    pub(crate) ledger: StakeLedger,
    pub(crate) settlements: BTreeMap<EpochId, EpochSettlement>,
    pub(crate) last_settled_epoch: EpochId,
    pub(crate) vesting: VestingBook,
    pub(crate) distributed_total: Amount,
    pub(crate) foregone_dust: Amount,
    pub(crate) latest_time: Timestamp,
}

impl PoolState {
    pub fn new(pool_id: PoolId) -> Self {
        Self {
            pool_id,
            ledger: StakeLedger::new(),
            settlements: BTreeMap::new(),
            last_settled_epoch: 0,
            vesting: VestingBook::new(),
            distributed_total: 0,
            foregone_dust: 0,
            latest_time: 0,
        }
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Stake `amount` for `user` at `now`.
    ///
    /// # Errors
    /// `ClockNotStarted` before epoch 1, `NonMonotonicTime` for a stale
    /// `now`, `InvalidAmount` for zero, plus any settlement error. The pool is
    /// unchanged on error.
    pub fn stake<B: RewardBudgetSource>(
        &mut self,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<(), MiningError> {
        let epoch = ctx.clock.epoch_of(now)?;
        self.check_time(now, ctx)?;
        self.ledger.check_stake(user, amount)?;

        self.catch_up(now, ctx)?;
        self.ledger.stake(user, amount, now)?;
        self.latest_time = now;

        tracing::debug!(
            "Pool {}: {} staked {} in epoch {} (balance {})",
            self.pool_id,
            user,
            amount,
            epoch,
            self.ledger.balance_of(user)
        );
        Ok(())
    }

    /// Withdraw `amount` of `user`'s stake at `now`.
    ///
    /// # Errors
    /// `ClockNotStarted` before epoch 1, `NonMonotonicTime` for a stale
    /// `now`, `InvalidAmount` for zero, `InsufficientBalance` above the live
    /// balance, plus any settlement error. The pool is unchanged on error.
    pub fn withdraw<B: RewardBudgetSource>(
        &mut self,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<(), MiningError> {
        let epoch = ctx.clock.epoch_of(now)?;
        self.check_time(now, ctx)?;
        self.ledger.check_withdraw(user, amount)?;

        self.catch_up(now, ctx)?;
        self.ledger.withdraw(user, amount, now)?;
        self.latest_time = now;

        tracing::debug!(
            "Pool {}: {} withdrew {} in epoch {} (balance {})",
            self.pool_id,
            user,
            amount,
            epoch,
            self.ledger.balance_of(user)
        );
        Ok(())
    }

    /// Reject a mutating call whose time precedes what the pool has already
    /// processed, or falls inside an epoch that is already settled.
    pub(crate) fn check_time<B: RewardBudgetSource>(
        &self,
        now: Timestamp,
        ctx: &SettlementContext<'_, B>,
    ) -> Result<(), MiningError> {
        let mut latest = self.latest_time;
        if self.last_settled_epoch > 0 {
            latest = latest.max(ctx.clock.end(self.last_settled_epoch));
        }
        if now < latest {
            return Err(MiningError::NonMonotonicTime { time: now, latest });
        }
        Ok(())
    }

    pub fn balance_of(&self, user: &UserId) -> Amount {
        self.ledger.balance_of(user)
    }

    pub fn total_staked(&self) -> Amount {
        self.ledger.total_staked()
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn vesting(&self) -> &VestingBook {
        &self.vesting
    }

    pub fn last_settled_epoch(&self) -> EpochId {
        self.last_settled_epoch
    }

    /// Cached settlement of `epoch`, if it has been settled.
    pub fn settlement(&self, epoch: EpochId) -> Option<&EpochSettlement> {
        self.settlements.get(&epoch)
    }

    pub fn settlements(&self) -> impl Iterator<Item = &EpochSettlement> {
        self.settlements.values()
    }

    /// Rewards allocated to users across every settled epoch.
    pub fn distributed_total(&self) -> Amount {
        self.distributed_total
    }

    /// Budget never handed out: empty epochs plus truncation remainders.
    pub fn foregone_dust(&self) -> Amount {
        self.foregone_dust
    }

    pub fn claimed_total(&self, user: &UserId) -> Amount {
        self.vesting.claimed_total(user)
    }

    /// Every user that has ever staked or earned in this pool.
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.ledger.accounts().map(|(u, _)| u.clone()).collect();
        for (user, _) in self.vesting.accounts() {
            if self.ledger.account(user).is_none() {
                users.push(user.clone());
            }
        }
        users.sort();
        users
    }
}
