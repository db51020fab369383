// crates/lmine-engine/src/ledger.rs
//
// Stake ledger: per-user balances in one pool, plus the ordered actions not
// yet folded into a settled epoch.
//
// Each user carries two balances:
//   - `balance`: the live balance after every recorded action.
//   - `settled_balance`: the balance at the end of the last settled epoch,
//     i.e. the starting point the accumulator replays `pending` from.
//
// The ledger never settles anything itself. Callers (see `pool.rs`) must
// settle every fully-elapsed epoch before recording a new action.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, MiningError, Timestamp, UserId};

use crate::accumulator::ReplayCursor;
use crate::math::checked_add;

/// A single balance change recorded against a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAction {
    /// When the change took effect.
    pub timestamp: Timestamp,
    /// Amount added to the balance.
    pub amount: Amount,
    /// `true` for a stake, `false` for a withdrawal.
    pub is_stake: bool,
}

impl StakeAction {
    /// Apply this action to `balance`.
    pub fn apply(&self, balance: Amount) -> Amount {
        if self.is_stake {
            balance.saturating_add(self.amount)
        } else {
            balance.saturating_sub(self.amount)
        }
    }
}

/// One user's position in a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    /// Live balance including every pending action.
    pub balance: Amount,
    /// Balance at the end of the last settled epoch.
    pub settled_balance: Amount,
    /// Actions recorded after the last settled epoch, in timestamp order.
    pub pending: Vec<StakeAction>,
}

/// Balances and unsettled actions for every user of one pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StakeLedger {
    accounts: BTreeMap<UserId, UserStake>,
    pub(crate) total_staked: Amount,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `amount` can be staked by `user` without mutating anything.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidAmount` for a zero amount and
    /// `MiningError::ArithmeticOverflow` if a balance would overflow.
    pub fn check_stake(&self, user: &UserId, amount: Amount) -> Result<(), MiningError> {
        if amount == 0 {
            return Err(MiningError::InvalidAmount(
                "stake amount must be greater than zero".to_string(),
            ));
        }
        checked_add(self.balance_of(user), amount, "user balance")?;
        checked_add(self.total_staked, amount, "pool total")?;
        Ok(())
    }

    /// Check that `user` can withdraw `amount` without mutating anything.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidAmount` for a zero amount and
    /// `MiningError::InsufficientBalance` if `amount` exceeds the live balance.
    pub fn check_withdraw(&self, user: &UserId, amount: Amount) -> Result<(), MiningError> {
        if amount == 0 {
            return Err(MiningError::InvalidAmount(
                "withdraw amount must be greater than zero".to_string(),
            ));
        }
        let available = self.balance_of(user);
        if amount > available {
            return Err(MiningError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Record a stake.
    ///
    /// # Errors
    /// Same conditions as `check_stake`; nothing is mutated on error.
    pub fn stake(
        &mut self,
        user: &UserId,
        amount: Amount,
        time: Timestamp,
    ) -> Result<(), MiningError> {
        self.check_stake(user, amount)?;
        self.record(user, StakeAction {
            timestamp: time,
            amount,
            is_stake: true,
        });
        Ok(())
    }

    /// Record a withdrawal.
    ///
    /// # Errors
    /// Same conditions as `check_withdraw`; nothing is mutated on error.
    pub fn withdraw(
        &mut self,
        user: &UserId,
        amount: Amount,
        time: Timestamp,
    ) -> Result<(), MiningError> {
        self.check_withdraw(user, amount)?;
        self.record(user, StakeAction {
            timestamp: time,
            amount,
            is_stake: false,
        });
        Ok(())
    }

    fn record(&mut self, user: &UserId, action: StakeAction) {
        let account = self.accounts.entry(user.clone()).or_default();
        account.balance = action.apply(account.balance);
        account.pending.push(action);
        self.total_staked = action.apply(self.total_staked);
    }

    /// Fold replayed actions into the settled state.
    ///
    /// For each cursor, the first `consumed` pending actions are dropped and
    /// the settled balance becomes the cursor's balance.
    pub(crate) fn commit_replay(&mut self, cursors: BTreeMap<UserId, ReplayCursor>) {
        for (user, cursor) in cursors {
            if let Some(account) = self.accounts.get_mut(&user) {
                account.pending.drain(..cursor.consumed);
                account.settled_balance = cursor.balance;
            }
        }
    }

    /// Live balance of `user` (0 if unknown).
    pub fn balance_of(&self, user: &UserId) -> Amount {
        self.accounts.get(user).map(|a| a.balance).unwrap_or(0)
    }

    /// Sum of every user's live balance.
    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn account(&self, user: &UserId) -> Option<&UserStake> {
        self.accounts.get(user)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&UserId, &UserStake)> {
        self.accounts.iter()
    }
}
