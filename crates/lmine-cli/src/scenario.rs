// crates/lmine-cli/src/scenario.rs
//
// Scenario files for `lmine simulate`.
//
// A scenario names the engine parameters, the pools (optionally with
// weights), the reward budget per epoch, and an ordered list of steps. The
// runner replays the steps against a fresh `LiquidityMining`; a step that
// fails is recorded and has no effect on the engine.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use lmine_core::{Amount, EngineParams, EpochId, MiningError, PoolId, Timestamp, UserId};
use lmine_engine::{check_invariants, LiquidityMining};

use crate::error::CliError;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Overrides the `[engine]` block of the CLI config.
    #[serde(default)]
    pub engine: Option<EngineParams>,

    pub pools: Vec<ScenarioPool>,

    #[serde(default)]
    pub rewards: Option<ScenarioRewards>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioPool {
    pub id: PoolId,
    /// Either every pool carries a weight or none does.
    #[serde(default)]
    pub weight: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRewards {
    #[serde(default = "default_first_epoch")]
    pub first_epoch: EpochId,
    pub amounts: Vec<Amount>,
}

fn default_first_epoch() -> EpochId {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Stake {
        time: Timestamp,
        pool: PoolId,
        user: UserId,
        amount: Amount,
    },
    Withdraw {
        time: Timestamp,
        pool: PoolId,
        user: UserId,
        amount: Amount,
    },
    /// Without `pool`, redeems across every pool.
    Redeem {
        time: Timestamp,
        #[serde(default)]
        pool: Option<PoolId>,
        user: UserId,
    },
    Settle {
        time: Timestamp,
        pool: PoolId,
        epoch: EpochId,
    },
    SetAllocation {
        time: Timestamp,
        pools: Vec<PoolId>,
        weights: Vec<u64>,
    },
}

impl Step {
    pub fn time(&self) -> Timestamp {
        match self {
            Step::Stake { time, .. }
            | Step::Withdraw { time, .. }
            | Step::Redeem { time, .. }
            | Step::Settle { time, .. }
            | Step::SetAllocation { time, .. } => *time,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            Step::Stake { .. } => "stake",
            Step::Withdraw { .. } => "withdraw",
            Step::Redeem { .. } => "redeem",
            Step::Settle { .. } => "settle",
            Step::SetAllocation { .. } => "set_allocation",
        }
    }

    fn target(&self) -> String {
        match self {
            Step::Stake { pool, user, amount, .. } | Step::Withdraw { pool, user, amount, .. } => {
                format!("pool {} / {} / {}", pool, user, amount)
            }
            Step::Redeem { pool: Some(pool), user, .. } => format!("pool {} / {}", pool, user),
            Step::Redeem { pool: None, user, .. } => format!("all pools / {}", user),
            Step::Settle { pool, epoch, .. } => format!("pool {} / epoch {}", pool, epoch),
            Step::SetAllocation { pools, weights, .. } => format!("{:?} <- {:?}", pools, weights),
        }
    }

    /// Apply the step. Returns a short description of what happened.
    fn apply(&self, engine: &mut LiquidityMining) -> Result<String, MiningError> {
        match self {
            Step::Stake { time, pool, user, amount } => {
                engine.stake(*pool, user, *amount, *time)?;
                Ok("ok".to_string())
            }
            Step::Withdraw { time, pool, user, amount } => {
                engine.withdraw(*pool, user, *amount, *time)?;
                Ok("ok".to_string())
            }
            Step::Redeem { time, pool: Some(pool), user } => {
                let payout = engine.redeem_rewards(*pool, user, *time)?;
                Ok(format!("paid {}", payout))
            }
            Step::Redeem { time, pool: None, user } => {
                let summary = engine.redeem_rewards_all(user, *time)?;
                Ok(format!("paid {}", summary.total))
            }
            Step::Settle { time, pool, epoch } => {
                let settlement = engine.settle_epoch(*pool, *epoch, *time)?;
                Ok(format!(
                    "budget {}, dust {}",
                    settlement.pool_budget, settlement.dust
                ))
            }
            Step::SetAllocation { time, pools, weights } => {
                let effective = engine.set_allocation_setting(pools, weights, *time)?;
                Ok(format!("effective from epoch {}", effective))
            }
        }
    }
}

impl Scenario {
    pub fn parse(contents: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the engine with pools registered, weighted, and funded.
    ///
    /// Setup happens one second before epoch 1 so that epoch 1 can still be
    /// funded and weighted.
    pub fn build_engine(&self, fallback: Option<&EngineParams>) -> Result<LiquidityMining, CliError> {
        let params = self
            .engine
            .clone()
            .or_else(|| fallback.cloned())
            .ok_or_else(|| CliError::Scenario("no [engine] parameters given".to_string()))?;
        if params.start_time == 0 {
            return Err(CliError::Scenario(
                "start_time must be after the unix epoch".to_string(),
            ));
        }
        if self.pools.is_empty() {
            return Err(CliError::Scenario("at least one pool is required".to_string()));
        }
        let setup_time = params.start_time - 1;

        let mut engine = LiquidityMining::new(params)?;
        for pool in &self.pools {
            engine.register_pool(pool.id)?;
        }

        let weighted = self.pools.iter().filter(|p| p.weight.is_some()).count();
        if weighted == self.pools.len() {
            let ids: Vec<PoolId> = self.pools.iter().map(|p| p.id).collect();
            let weights: Vec<u64> = self.pools.iter().filter_map(|p| p.weight).collect();
            engine.set_allocation_setting(&ids, &weights, setup_time)?;
        } else if weighted > 0 {
            return Err(CliError::Scenario(
                "either every pool has a weight or none does".to_string(),
            ));
        }

        if let Some(rewards) = &self.rewards {
            engine.fund_epochs(rewards.first_epoch, &rewards.amounts, setup_time)?;
        }
        Ok(engine)
    }

    /// Build the engine and replay every step in file order.
    pub fn run(&self, fallback: Option<&EngineParams>) -> Result<Simulation, CliError> {
        let mut engine = self.build_engine(fallback)?;
        let mut outcomes = Vec::with_capacity(self.steps.len());
        let mut final_time = engine.params().start_time;

        for (index, step) in self.steps.iter().enumerate() {
            final_time = final_time.max(step.time());
            let (ok, result) = match step.apply(&mut engine) {
                Ok(detail) => {
                    tracing::info!("Step {} ({}): {}", index + 1, step.action(), detail);
                    (true, detail)
                }
                Err(e) => {
                    tracing::warn!("Step {} ({}) failed: {}", index + 1, step.action(), e);
                    (false, e.to_string())
                }
            };
            outcomes.push(StepOutcome {
                step: index + 1,
                time: step.time(),
                action: step.action().to_string(),
                target: step.target(),
                ok,
                result,
            });
        }

        Ok(Simulation {
            engine,
            outcomes,
            final_time,
        })
    }
}

/// Result of one replayed step.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StepOutcome {
    #[tabled(rename = "Step")]
    pub step: usize,
    #[tabled(rename = "Time")]
    pub time: Timestamp,
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Ok")]
    pub ok: bool,
    #[tabled(rename = "Result")]
    pub result: String,
}

/// Final state of one user in one pool.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PositionRow {
    #[tabled(rename = "Pool")]
    pub pool: PoolId,
    #[tabled(rename = "User")]
    pub user: UserId,
    #[tabled(rename = "Staked")]
    pub balance: Amount,
    #[tabled(rename = "Redeemable")]
    pub redeemable: Amount,
    #[tabled(rename = "Claimed")]
    pub claimed: Amount,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PoolRow {
    #[tabled(rename = "Pool")]
    pub pool: PoolId,
    #[tabled(rename = "Total Staked")]
    pub total_staked: Amount,
    #[tabled(rename = "Settled Through")]
    pub last_settled_epoch: EpochId,
    #[tabled(rename = "Distributed")]
    pub distributed: Amount,
    #[tabled(rename = "Foregone")]
    pub foregone: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub final_time: Timestamp,
    pub total_funded: Amount,
    /// Last epoch with a non-zero budget.
    pub funded_through: Option<EpochId>,
    pub steps: Vec<StepOutcome>,
    pub pools: Vec<PoolRow>,
    pub positions: Vec<PositionRow>,
    /// "ok", or the first violated invariant.
    pub invariants: String,
}

pub struct Simulation {
    pub engine: LiquidityMining,
    pub outcomes: Vec<StepOutcome>,
    pub final_time: Timestamp,
}

impl Simulation {
    /// Summarize the engine as of the last step's time.
    ///
    /// Redeemable amounts are projected to that time; epochs that elapsed
    /// without activity stay unsettled.
    pub fn report(self) -> SimulationReport {
        let mut positions = Vec::new();
        for pool in self.engine.pool_ids() {
            let users = match self.engine.pool(pool) {
                Ok(state) => state.users(),
                Err(_) => continue,
            };
            for user in users {
                let redeemable = self
                    .engine
                    .pending_rewards(pool, &user, self.final_time)
                    .unwrap_or(0);
                positions.push(PositionRow {
                    pool,
                    balance: self.engine.balance_of(pool, &user).unwrap_or(0),
                    claimed: self.engine.claimed_total(pool, &user).unwrap_or(0),
                    redeemable,
                    user,
                });
            }
        }

        let pools = self
            .engine
            .pools()
            .map(|state| PoolRow {
                pool: state.pool_id(),
                total_staked: state.total_staked(),
                last_settled_epoch: state.last_settled_epoch(),
                distributed: state.distributed_total(),
                foregone: state.foregone_dust(),
            })
            .collect();

        let invariants = match check_invariants(&self.engine) {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                tracing::warn!("Simulation ended in an inconsistent state: {}", e);
                e.to_string()
            }
        };

        SimulationReport {
            final_time: self.final_time,
            total_funded: self.engine.schedule().total_funded(),
            funded_through: self.engine.schedule().last_funded_epoch(),
            steps: self.outcomes,
            pools,
            positions,
            invariants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;
    const START: u64 = 1_700_000_000;

    fn scenario(steps: &str) -> Scenario {
        let text = format!(
            r#"
            [engine]
            start_time = {START}
            epoch_duration = {epoch}
            vesting_epochs = 4
            total_numerator = 1000

            [rewards]
            amounts = [8000, 8000, 8000, 8000]

            [[pools]]
            id = 1
            weight = 500

            [[pools]]
            id = 2
            weight = 500

            {steps}
            "#,
            epoch = 10 * DAY,
        );
        Scenario::parse(&text).unwrap()
    }

    fn step(action: &str, day: u64, rest: &str) -> String {
        format!(
            "[[steps]]\naction = \"{}\"\ntime = {}\n{}\n",
            action,
            START + day * DAY,
            rest
        )
    }

    #[test]
    fn test_replay_and_report() {
        let steps = [
            step("stake", 0, "pool = 1\nuser = \"bob\"\namount = 100"),
            step("redeem", 12, "pool = 1\nuser = \"bob\""),
            step("redeem", 12, "user = \"bob\""),
        ]
        .concat();
        let sim = scenario(&steps).run(None).unwrap();
        assert_eq!(sim.outcomes.len(), 3);
        assert!(sim.outcomes.iter().all(|o| o.ok));
        assert_eq!(sim.outcomes[1].result, "paid 1000");
        assert_eq!(sim.outcomes[2].result, "paid 0");

        let report = sim.report();
        assert_eq!(report.invariants, "ok");
        assert_eq!(report.total_funded, 32_000);
        assert_eq!(report.funded_through, Some(4));
        assert_eq!(report.positions.len(), 1);
        assert_eq!(report.positions[0].claimed, 1_000);
        assert_eq!(report.positions[0].balance, 100);
        assert_eq!(report.pools[0].distributed, 4_000);
        assert_eq!(report.pools[1].foregone, 4_000);
    }

    #[test]
    fn test_failed_step_is_recorded_and_skipped() {
        let steps = [
            step("stake", 0, "pool = 1\nuser = \"bob\"\namount = 100"),
            step("withdraw", 1, "pool = 1\nuser = \"bob\"\namount = 500"),
            step("stake", 2, "pool = 9\nuser = \"bob\"\namount = 1"),
            step("set_allocation", 3, "pools = [1, 2]\nweights = [1, 2]"),
            step("settle", 4, "pool = 1\nepoch = 1"),
            step("withdraw", 5, "pool = 1\nuser = \"bob\"\namount = 100"),
        ]
        .concat();
        let sim = scenario(&steps).run(None).unwrap();
        let ok: Vec<bool> = sim.outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(ok, vec![true, false, false, false, false, true]);
        assert!(sim.outcomes[1].result.contains("Insufficient balance"));
        assert_eq!(sim.engine.balance_of(1, &UserId::from("bob")), Ok(0));
    }

    #[test]
    fn test_engine_falls_back_to_config() {
        let text = r#"
            [[pools]]
            id = 3
        "#;
        let scenario = Scenario::parse(text).unwrap();
        assert!(matches!(scenario.run(None), Err(CliError::Scenario(_))));

        let params = EngineParams::new(START);
        let engine = scenario.build_engine(Some(&params)).unwrap();
        assert_eq!(engine.weight_for_epoch(3, 1), params.total_numerator);
    }

    #[test]
    fn test_partial_weights_rejected() {
        let text = format!(
            r#"
            [engine]
            start_time = {START}

            [[pools]]
            id = 1
            weight = 10

            [[pools]]
            id = 2
            "#
        );
        let scenario = Scenario::parse(&text).unwrap();
        assert!(matches!(scenario.build_engine(None), Err(CliError::Scenario(_))));
    }

    #[test]
    fn test_unknown_action_is_a_parse_error() {
        let text = format!(
            "[engine]\nstart_time = {START}\n[[pools]]\nid = 1\n[[steps]]\naction = \"burn\"\ntime = 1\n"
        );
        assert!(matches!(Scenario::parse(&text), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_demo_scenario() {
        let scenario = Scenario::parse(include_str!("../../../demos/scenario.toml")).unwrap();
        let report = scenario.run(None).unwrap().report();
        let failed: Vec<usize> = report.steps.iter().filter(|s| !s.ok).map(|s| s.step).collect();
        assert_eq!(failed, vec![7]);
        // Epoch 1 in pool 1 at weight 600: 4800 over four buckets.
        assert_eq!(report.steps[2].result, "paid 1200");
        assert_eq!(report.invariants, "ok");
    }
}
