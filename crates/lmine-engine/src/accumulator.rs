// crates/lmine-engine/src/accumulator.rs
//
// Stake-seconds accumulation for completed epochs.
//
// For epoch e with window [start(e), end(e)), each user's pending actions are
// replayed from the balance held at start(e). Between consecutive actions the
// balance is constant, so the user's stake-seconds are
//
//   sum over intervals of (balance during interval) x (interval length)
//
// clipped to the window. Actions stamped at or after end(e) belong to a later
// epoch and are left for the next replay step.
//
// The accumulator only reads the ledger. It tracks its own replay cursors so
// several consecutive epochs can be measured before anything is committed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EpochId, MiningError, StakeSeconds, Timestamp, UserId};

use crate::clock::EpochClock;
use crate::ledger::StakeLedger;
use crate::math::checked_add_u128;

/// Replay position for one user: the balance reached so far and how many
/// pending actions have been folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCursor {
    pub balance: Amount,
    pub consumed: usize,
}

/// Stake-seconds measured over one fully elapsed epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochStakeSeconds {
    pub epoch: EpochId,
    /// Users with non-zero participation only.
    pub per_user: BTreeMap<UserId, StakeSeconds>,
    pub total: StakeSeconds,
}

impl EpochStakeSeconds {
    pub fn of(&self, user: &UserId) -> StakeSeconds {
        self.per_user.get(user).copied().unwrap_or(0)
    }
}

/// Replays a ledger epoch by epoch, starting right after the last settled one.
pub struct StakeSecondsAccumulator<'a> {
    ledger: &'a StakeLedger,
    clock: &'a EpochClock,
    next_epoch: EpochId,
    cursors: BTreeMap<UserId, ReplayCursor>,
}

impl<'a> StakeSecondsAccumulator<'a> {
    /// Start a replay at `first_epoch`, which must be the epoch following the
    /// ledger's last settled one.
    pub fn new(ledger: &'a StakeLedger, clock: &'a EpochClock, first_epoch: EpochId) -> Self {
        let cursors = ledger
            .accounts()
            .map(|(user, account)| {
                (
                    user.clone(),
                    ReplayCursor {
                        balance: account.settled_balance,
                        consumed: 0,
                    },
                )
            })
            .collect();
        Self {
            ledger,
            clock,
            next_epoch: first_epoch.max(1),
            cursors,
        }
    }

    /// The epoch the next call to `accumulate_next` will measure.
    pub fn next_epoch(&self) -> EpochId {
        self.next_epoch
    }

    /// Measure the next epoch and advance the replay past it.
    ///
    /// # Errors
    /// Returns `MiningError::EpochNotYetComplete` if the epoch has not ended
    /// by `now`, and `MiningError::ArithmeticOverflow` if a total overflows.
    /// The replay does not advance on error.
    pub fn accumulate_next(&mut self, now: Timestamp) -> Result<EpochStakeSeconds, MiningError> {
        let epoch = self.next_epoch;
        let start = self.clock.start(epoch);
        let end = self.clock.end(epoch);
        if end > now {
            return Err(MiningError::EpochNotYetComplete { epoch, end, now });
        }

        let mut advanced = Vec::new();
        let mut per_user = BTreeMap::new();
        let mut total: StakeSeconds = 0;

        for (user, account) in self.ledger.accounts() {
            let Some(cursor) = self.cursors.get(user) else {
                continue;
            };
            let mut balance = cursor.balance;
            let mut consumed = cursor.consumed;
            let mut last = start;
            let mut stake_seconds: StakeSeconds = 0;

            while let Some(action) = account.pending.get(consumed) {
                if action.timestamp >= end {
                    break;
                }
                let at = action.timestamp.max(start);
                stake_seconds = checked_add_u128(
                    stake_seconds,
                    interval(balance, at.saturating_sub(last)),
                    "user stake-seconds",
                )?;
                balance = action.apply(balance);
                last = at;
                consumed += 1;
            }
            stake_seconds = checked_add_u128(
                stake_seconds,
                interval(balance, end - last),
                "user stake-seconds",
            )?;

            total = checked_add_u128(total, stake_seconds, "total stake-seconds")?;
            if stake_seconds > 0 {
                per_user.insert(user.clone(), stake_seconds);
            }
            advanced.push((user.clone(), ReplayCursor { balance, consumed }));
        }

        for (user, cursor) in advanced {
            self.cursors.insert(user, cursor);
        }
        self.next_epoch += 1;

        Ok(EpochStakeSeconds {
            epoch,
            per_user,
            total,
        })
    }

    /// Hand back the replay positions for committing into the ledger.
    pub fn into_cursors(self) -> BTreeMap<UserId, ReplayCursor> {
        self.cursors
    }
}

fn interval(balance: Amount, seconds: u64) -> StakeSeconds {
    balance as StakeSeconds * seconds as StakeSeconds
}
