// crates/lmine-engine/src/mining.rs
//
// LiquidityMining: the multi-pool engine facade.
//
// Owns the epoch clock, the global reward schedule, the pool registry with
// its allocation weights, and one `PoolState` per registered pool. All
// state is explicit and owned here; time is always a parameter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lmine_core::{Amount, EngineParams, EpochId, MiningError, PoolId, StakeSeconds, Timestamp, UserId};

use crate::allocator::PoolBudget;
use crate::clock::EpochClock;
use crate::pool::PoolState;
use crate::registry::AllocationRegistry;
use crate::schedule::RewardSchedule;
use crate::settlement::{EpochSettlement, SettlementContext};
use crate::vesting::VestingBucket;

/// Payouts of one `redeem_rewards_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionSummary {
    pub per_pool: BTreeMap<PoolId, Amount>,
    pub total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityMining {
    params: EngineParams,
    clock: EpochClock,
    registry: AllocationRegistry,
    schedule: RewardSchedule,
    pools: BTreeMap<PoolId, PoolState>,
}

impl LiquidityMining {
    /// Create an engine with no pools and no funded epochs.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidParams` if `params` fail validation.
    pub fn new(params: EngineParams) -> Result<Self, MiningError> {
        params.validate()?;
        let clock = EpochClock::from_params(&params)?;
        Ok(Self {
            registry: AllocationRegistry::new(params.total_numerator),
            schedule: RewardSchedule::new(),
            pools: BTreeMap::new(),
            clock,
            params,
        })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    pub fn registry(&self) -> &AllocationRegistry {
        &self.registry
    }

    // ---------------------------------------------------------------
    // Operator surface: pools, budgets, weights
    // ---------------------------------------------------------------

    /// Register a new pool. The first pool receives the whole weight; later
    /// pools start at weight 0 until `set_allocation_setting` says otherwise.
    ///
    /// # Errors
    /// Returns `MiningError::DuplicatePool` if `pool` is already registered.
    pub fn register_pool(&mut self, pool: PoolId) -> Result<(), MiningError> {
        self.registry.register(pool)?;
        self.pools.insert(pool, PoolState::new(pool));
        tracing::info!("Registered pool {}", pool);
        Ok(())
    }

    /// Fund consecutive epochs starting at `first_epoch`.
    ///
    /// # Errors
    /// Returns `MiningError::RewardsLocked` if any of them has started and
    /// `NonMonotonicTime` if `now` is behind any pool.
    pub fn fund_epochs(
        &mut self,
        first_epoch: EpochId,
        amounts: &[Amount],
        now: Timestamp,
    ) -> Result<(), MiningError> {
        self.check_time_all(now)?;
        self.schedule.fund_epochs(&self.clock, first_epoch, amounts, now)?;
        tracing::info!(
            "Funded {} epochs from epoch {} (total funded {})",
            amounts.len(),
            first_epoch,
            self.schedule.total_funded()
        );
        Ok(())
    }

    /// Set the budget of one epoch that has not started yet.
    pub fn set_epoch_rewards(
        &mut self,
        epoch: EpochId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), MiningError> {
        self.check_time_all(now)?;
        self.schedule.set_epoch_rewards(&self.clock, epoch, amount, now)
    }

    /// Replace every pool's weight. The new weights apply from the epoch
    /// after the one containing `now` (epoch 1 before the clock starts).
    /// Returns that first effective epoch.
    ///
    /// # Errors
    /// Returns `MiningError::InvalidAllocationSetting` unless `pools` is
    /// exactly the registered set and `weights` sum to the numerator, and
    /// `NonMonotonicTime` if `now` is behind any pool. The previous weights
    /// stay in place on error.
    pub fn set_allocation_setting(
        &mut self,
        pools: &[PoolId],
        weights: &[u64],
        now: Timestamp,
    ) -> Result<EpochId, MiningError> {
        self.check_time_all(now)?;
        let effective_from = self.clock.epoch_or_zero(now) + 1;
        self.registry.set(pools, weights, effective_from)?;
        tracing::info!(
            "Allocation setting updated for {} pools, effective from epoch {}",
            pools.len(),
            effective_from
        );
        Ok(effective_from)
    }

    /// The most recently recorded weights (possibly not in force yet).
    pub fn current_weights(&self) -> BTreeMap<PoolId, u64> {
        self.registry.current_weights()
    }

    pub fn weight_for_epoch(&self, pool: PoolId, epoch: EpochId) -> u64 {
        self.registry.weight_for_epoch(pool, epoch)
    }

    // ---------------------------------------------------------------
    // Depositor surface
    // ---------------------------------------------------------------

    pub fn stake(
        &mut self,
        pool: PoolId,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), MiningError> {
        let (ctx, state) = self.split(pool)?;
        state.stake(user, amount, now, &ctx)
    }

    pub fn withdraw(
        &mut self,
        pool: PoolId,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), MiningError> {
        let (ctx, state) = self.split(pool)?;
        state.withdraw(user, amount, now, &ctx)
    }

    /// Redeem `user`'s vested rewards in one pool. Returns the payout.
    pub fn redeem_rewards(
        &mut self,
        pool: PoolId,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Amount, MiningError> {
        let (ctx, state) = self.split(pool)?;
        state.redeem_rewards(user, now, &ctx)
    }

    /// Redeem `user`'s vested rewards in every registered pool.
    ///
    /// Every pool is prepared before any is touched, so a failure in one
    /// pool leaves all of them unchanged.
    pub fn redeem_rewards_all(
        &mut self,
        user: &UserId,
        now: Timestamp,
    ) -> Result<RedemptionSummary, MiningError> {
        self.clock.epoch_of(now)?;
        self.check_time_all(now)?;

        let mut prepared = Vec::with_capacity(self.pools.len());
        for (&pool, state) in &self.pools {
            prepared.push((pool, state.prepare_redemption(user, now, &self.context(pool))?));
        }
        let total = prepared
            .iter()
            .try_fold(0, |acc: Amount, (_, p)| acc.checked_add(p.payout()))
            .ok_or_else(|| {
                MiningError::ArithmeticOverflow("redemption total exceeds u64".to_string())
            })?;

        let mut summary = RedemptionSummary {
            total,
            ..RedemptionSummary::default()
        };
        let vesting_epochs = self.params.vesting_epochs;
        for (pool, redemption) in prepared {
            if let Some(state) = self.pools.get_mut(&pool) {
                let payout = state.complete_redemption(user, redemption, now, vesting_epochs);
                summary.per_pool.insert(pool, payout);
            }
        }
        Ok(summary)
    }

    /// Settle `epoch` of `pool` on demand and return the cached result.
    pub fn settle_epoch(
        &mut self,
        pool: PoolId,
        epoch: EpochId,
        now: Timestamp,
    ) -> Result<&EpochSettlement, MiningError> {
        let (ctx, state) = self.split(pool)?;
        state.settle_epoch(epoch, now, &ctx)
    }

    /// Vested-but-unclaimed rewards of `user` in `pool` at `now`.
    pub fn pending_rewards(
        &self,
        pool: PoolId,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Amount, MiningError> {
        self.pool(pool)?.pending_rewards(user, now, &self.context(pool))
    }

    /// Buckets of `user` in `pool` that are still locked at `now`.
    pub fn vesting_schedule(
        &self,
        pool: PoolId,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Vec<VestingBucket>, MiningError> {
        self.pool(pool)?.vesting_schedule(user, now, &self.context(pool))
    }

    // ---------------------------------------------------------------
    // Read-only queries
    // ---------------------------------------------------------------

    pub fn pool(&self, pool: PoolId) -> Result<&PoolState, MiningError> {
        self.pools.get(&pool).ok_or(MiningError::PoolNotFound(pool))
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolState> {
        self.pools.values()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.keys().copied().collect()
    }

    pub fn balance_of(&self, pool: PoolId, user: &UserId) -> Result<Amount, MiningError> {
        Ok(self.pool(pool)?.balance_of(user))
    }

    pub fn total_staked(&self, pool: PoolId) -> Result<Amount, MiningError> {
        Ok(self.pool(pool)?.total_staked())
    }

    /// Cached settlement, or `None` while the epoch is unsettled.
    pub fn settlement(
        &self,
        pool: PoolId,
        epoch: EpochId,
    ) -> Result<Option<&EpochSettlement>, MiningError> {
        Ok(self.pool(pool)?.settlement(epoch))
    }

    /// Settled stake-seconds of `user`, or `None` while the epoch is unsettled.
    pub fn user_stake_seconds(
        &self,
        pool: PoolId,
        epoch: EpochId,
        user: &UserId,
    ) -> Result<Option<StakeSeconds>, MiningError> {
        Ok(self
            .pool(pool)?
            .settlement(epoch)
            .map(|s| s.stake_seconds_of(user)))
    }

    pub fn claimed_total(&self, pool: PoolId, user: &UserId) -> Result<Amount, MiningError> {
        Ok(self.pool(pool)?.claimed_total(user))
    }

    pub fn foregone_dust(&self, pool: PoolId) -> Result<Amount, MiningError> {
        Ok(self.pool(pool)?.foregone_dust())
    }

    pub fn last_settled_epoch(&self, pool: PoolId) -> Result<EpochId, MiningError> {
        Ok(self.pool(pool)?.last_settled_epoch())
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    /// Serialize the complete engine state.
    pub fn to_json(&self) -> Result<String, MiningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore an engine from `to_json` output.
    ///
    /// # Errors
    /// Returns `MiningError::Serialization` for malformed input and
    /// `MiningError::InvalidParams` if the embedded parameters are invalid.
    pub fn from_json(json: &str) -> Result<Self, MiningError> {
        let engine: Self = serde_json::from_str(json)?;
        engine.params.validate()?;
        Ok(engine)
    }

    /// Borrow one pool mutably alongside the shared settlement context.
    fn split(
        &mut self,
        pool: PoolId,
    ) -> Result<(SettlementContext<'_, RewardSchedule>, &mut PoolState), MiningError> {
        let state = self.pools.get_mut(&pool).ok_or(MiningError::PoolNotFound(pool))?;
        let ctx = SettlementContext {
            clock: &self.clock,
            vesting_epochs: self.params.vesting_epochs,
            budget: PoolBudget::new(&self.schedule, &self.registry, pool),
        };
        Ok((ctx, state))
    }

    /// Operator writes must not reach behind any pool's processed time.
    fn check_time_all(&self, now: Timestamp) -> Result<(), MiningError> {
        for (&pool, state) in &self.pools {
            state.check_time(now, &self.context(pool))?;
        }
        Ok(())
    }

    fn context(&self, pool: PoolId) -> SettlementContext<'_, RewardSchedule> {
        SettlementContext {
            clock: &self.clock,
            vesting_epochs: self.params.vesting_epochs,
            budget: PoolBudget::new(&self.schedule, &self.registry, pool),
        }
    }
}
