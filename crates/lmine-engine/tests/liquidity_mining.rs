// crates/lmine-engine/tests/liquidity_mining.rs
//
// End-to-end tests for the liquidity-mining engine.
//
// Drives `LiquidityMining` through its public API only: staking across
// epoch boundaries, lazy settlement, vesting maturity, redemption, and
// multi-pool weighting. Every scenario finishes with `check_invariants`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lmine_engine::{
    check_invariants, Amount, EngineParams, LiquidityMining, MiningError, PoolId,
    RewardBudgetSource, Timestamp, UserId, VestingBucket,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DAY: u64 = 86_400;
const START: Timestamp = 1_700_000_000;

fn engine(epoch_duration: u64, vesting_epochs: u64, numerator: u64) -> LiquidityMining {
    let params = EngineParams::new(START)
        .with_epoch_duration(epoch_duration)
        .with_vesting_epochs(vesting_epochs)
        .with_total_numerator(numerator);
    LiquidityMining::new(params).unwrap()
}

fn at(days: u64) -> Timestamp {
    START + days * DAY
}

fn user(name: &str) -> UserId {
    UserId::from(name)
}

// ---------------------------------------------------------------------------
// Single pool
// ---------------------------------------------------------------------------

/// Two depositors with equal stake, one joining halfway through epoch 1.
#[test]
fn test_midpoint_joiner_gets_one_third() {
    let mut engine = engine(30 * DAY, 2, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[1_000], 0).unwrap();

    let (a, b) = (user("a"), user("b"));
    engine.stake(1, &a, 100, at(0)).unwrap();
    engine.stake(1, &b, 100, at(15)).unwrap();

    let settlement = engine.settle_epoch(1, 1, at(30)).unwrap().clone();
    assert_eq!(settlement.stake_seconds_of(&a), 100 * 30 * DAY as u128);
    assert_eq!(settlement.stake_seconds_of(&b), 100 * 15 * DAY as u128);
    assert_eq!(settlement.allocation_of(&a), 666);
    assert_eq!(settlement.allocation_of(&b), 333);
    assert_eq!(settlement.dust, 1);
    assert_eq!(engine.foregone_dust(1), Ok(1));

    // At the start of epoch 2 the first bucket is redeemable, the second locked.
    assert_eq!(engine.pending_rewards(1, &a, at(30)), Ok(333));
    assert_eq!(engine.pending_rewards(1, &b, at(30)), Ok(167));
    assert_eq!(
        engine.vesting_schedule(1, &a, at(30)).unwrap(),
        vec![VestingBucket { target_epoch: 3, amount: 333 }]
    );
    assert_eq!(
        engine.vesting_schedule(1, &b, at(30)).unwrap(),
        vec![VestingBucket { target_epoch: 3, amount: 166 }]
    );

    // Epoch 2: only the first bucket has matured.
    assert_eq!(engine.redeem_rewards(1, &a, at(31)), Ok(333));
    assert_eq!(engine.redeem_rewards(1, &b, at(31)), Ok(167));
    // Epoch 3: the rest.
    assert_eq!(engine.redeem_rewards(1, &a, at(61)), Ok(333));
    assert_eq!(engine.redeem_rewards(1, &b, at(61)), Ok(166));

    assert_eq!(engine.claimed_total(1, &a), Ok(666));
    assert_eq!(engine.claimed_total(1, &b), Ok(333));
    check_invariants(&engine).unwrap();
}

/// Stake, partial withdraw, late joiner, and redemption across four epochs
/// of ten days with a four-epoch vesting span.
fn stake_and_withdraw_scenario(engine: &mut LiquidityMining, pool: PoolId) -> (Amount, Amount) {
    let (bob, alice) = (user("bob"), user("alice"));
    let stake: Amount = 1_000_000;

    engine.stake(pool, &bob, stake, at(0)).unwrap();

    engine.withdraw(pool, &bob, stake / 2, at(15)).unwrap();
    let first = engine.redeem_rewards(pool, &bob, at(15)).unwrap();
    engine.stake(pool, &alice, stake / 2, at(15)).unwrap();

    engine.withdraw(pool, &bob, stake / 2, at(30)).unwrap();
    let second = engine.redeem_rewards(pool, &bob, at(30)).unwrap();
    assert_eq!(engine.balance_of(pool, &bob), Ok(0));
    (first, second)
}

#[test]
fn test_stake_and_withdraw_vests_over_four_epochs() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[8_000; 8], 0).unwrap();

    let (first, second) = stake_and_withdraw_scenario(&mut engine, 1);
    // Epoch 1 (8000, all Bob) vests 2000 per epoch from epoch 2.
    assert_eq!(first, 2_000);
    // At epoch 4: epoch-1 buckets 3 and 4 (4000), epoch-2 buckets 3 and 4
    // (2 x 1500), epoch-3 bucket 4 (1000).
    assert_eq!(second, 8_000);

    let alice = user("alice");
    // Alice earned 2000 in epoch 2 and 4000 in epoch 3.
    assert_eq!(engine.redeem_rewards(1, &alice, at(30)), Ok(500 + 500 + 1_000));
    assert_eq!(engine.last_settled_epoch(1), Ok(3));
    check_invariants(&engine).unwrap();
}

#[test]
fn test_redeem_twice_in_same_epoch_pays_once() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[8_000; 4], 0).unwrap();

    let bob = user("bob");
    engine.stake(1, &bob, 10, at(0)).unwrap();
    assert_eq!(engine.redeem_rewards(1, &bob, at(12)), Ok(2_000));
    assert_eq!(engine.redeem_rewards(1, &bob, at(13)), Ok(0));
    assert_eq!(engine.pending_rewards(1, &bob, at(19)), Ok(0));
    assert_eq!(engine.pending_rewards(1, &bob, at(20)), Ok(2_000 + 2_000));
    assert_eq!(engine.claimed_total(1, &bob), Ok(2_000));
}

#[test]
fn test_settling_twice_changes_nothing() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[8_000; 4], 0).unwrap();
    engine.stake(1, &user("bob"), 10, at(3)).unwrap();

    let first = serde_json::to_string(engine.settle_epoch(1, 1, at(10)).unwrap()).unwrap();
    let snapshot = engine.to_json().unwrap();
    let again = serde_json::to_string(engine.settle_epoch(1, 1, at(25)).unwrap()).unwrap();

    assert_eq!(first, again);
    assert_eq!(engine.to_json().unwrap(), snapshot);
}

#[test]
fn test_unsettleable_epochs() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();

    let err = engine.settle_epoch(1, 1, at(9)).unwrap_err();
    assert!(matches!(err, MiningError::EpochNotYetComplete { epoch: 1, .. }));
    let err = engine.settle_epoch(1, 0, at(50)).unwrap_err();
    assert!(matches!(err, MiningError::EpochNotYetComplete { epoch: 0, .. }));
    let err = engine.stake(1, &user("bob"), 10, START - 1).unwrap_err();
    assert!(matches!(err, MiningError::ClockNotStarted { .. }));
}

#[test]
fn test_empty_epoch_budget_is_foregone() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[8_000, 8_000], 0).unwrap();

    let bob = user("bob");
    engine.stake(1, &bob, 10, at(12)).unwrap();
    let settlement = engine.settle_epoch(1, 2, at(20)).unwrap();
    assert_eq!(settlement.allocation_of(&bob), 8_000);
    assert_eq!(engine.foregone_dust(1), Ok(8_000));
    check_invariants(&engine).unwrap();
}

#[test]
fn test_budget_locked_once_epoch_starts() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[8_000; 2], 0).unwrap();

    let err = engine.set_epoch_rewards(2, 1, at(11)).unwrap_err();
    assert!(matches!(err, MiningError::RewardsLocked { epoch: 2, .. }));
    engine.set_epoch_rewards(3, 4_000, at(11)).unwrap();
    assert_eq!(engine.schedule().rewards_for_epoch(3), 4_000);
}

/// Whole-supply stake against a whole-supply budget over a 30-day epoch.
#[test]
fn test_large_stake_and_budget_settle() {
    let mut engine = engine(30 * DAY, 1, 1_000);
    engine.register_pool(1).unwrap();
    let huge: Amount = 10_000_000_000_000_000_000;
    engine.fund_epochs(1, &[huge], 0).unwrap();

    let whale = user("whale");
    engine.stake(1, &whale, huge, at(0)).unwrap();
    engine.withdraw(1, &whale, 1, at(31)).unwrap();
    assert_eq!(engine.last_settled_epoch(1), Ok(1));
    assert_eq!(engine.settlement(1, 1).unwrap().unwrap().allocation_of(&whale), huge);

    assert_eq!(engine.redeem_rewards(1, &whale, at(32)), Ok(huge));
    assert_eq!(engine.balance_of(1, &whale), Ok(huge - 1));
    check_invariants(&engine).unwrap();
}

/// Looking ahead must not settle epochs that earlier activity still lands in.
#[test]
fn test_lookahead_queries_do_not_settle() {
    let mut engine = engine(30 * DAY, 2, 1_000);
    engine.register_pool(1).unwrap();
    engine.fund_epochs(1, &[1_000; 3], 0).unwrap();

    let (bob, alice) = (user("bob"), user("alice"));
    engine.stake(1, &bob, 100, at(0)).unwrap();

    assert_eq!(engine.pending_rewards(1, &bob, at(95)), Ok(2_500));
    assert_eq!(
        engine.vesting_schedule(1, &bob, at(95)).unwrap(),
        vec![VestingBucket { target_epoch: 5, amount: 500 }]
    );
    assert_eq!(engine.last_settled_epoch(1), Ok(0));
    assert_eq!(engine.settlement(1, 1), Ok(None));

    engine.stake(1, &alice, 100, at(10)).unwrap();
    assert_eq!(engine.redeem_rewards(1, &bob, at(95)), Ok(600 + 500 + 250));
    assert_eq!(engine.redeem_rewards(1, &alice, at(95)), Ok(400 + 500 + 250));
    check_invariants(&engine).unwrap();
}

// ---------------------------------------------------------------------------
// Multiple pools
// ---------------------------------------------------------------------------

#[test]
fn test_two_pools_at_half_weight() {
    let mut engine = engine(10 * DAY, 4, 1_000);
    engine.register_pool(1).unwrap();
    engine.register_pool(2).unwrap();
    engine.set_allocation_setting(&[1, 2], &[500, 500], 0).unwrap();
    engine.fund_epochs(1, &[8_000; 8], 0).unwrap();

    for pool in [1, 2] {
        let (first, second) = stake_and_withdraw_scenario(&mut engine, pool);
        assert_eq!(first, 1_000);
        assert_eq!(second, 4_000);
    }
    check_invariants(&engine).unwrap();
}

#[test]
fn test_weight_change_applies_from_next_epoch() {
    let mut engine = engine(10 * DAY, 1, 100);
    engine.register_pool(1).unwrap();
    engine.register_pool(2).unwrap();
    engine.fund_epochs(1, &[1_000; 4], 0).unwrap();

    let bob = user("bob");
    engine.stake(1, &bob, 10, at(0)).unwrap();
    engine.stake(2, &bob, 10, at(0)).unwrap();

    // A bad setting is rejected and the original 100/0 split stays.
    assert!(engine.set_allocation_setting(&[1, 2], &[30, 30], at(5)).is_err());
    assert_eq!(engine.set_allocation_setting(&[1, 2], &[25, 75], at(5)), Ok(2));

    // Epoch 1 ran at 100/0 and vests in epoch 2.
    let summary = engine.redeem_rewards_all(&bob, at(10)).unwrap();
    assert_eq!(summary.per_pool.get(&1), Some(&1_000));
    assert_eq!(summary.per_pool.get(&2), Some(&0));

    let summary = engine.redeem_rewards_all(&bob, at(10)).unwrap();
    assert_eq!(summary.total, 0);

    // Epoch 2 ran at 25/75.
    let summary = engine.redeem_rewards_all(&bob, at(20)).unwrap();
    assert_eq!(summary.per_pool.get(&1), Some(&250));
    assert_eq!(summary.per_pool.get(&2), Some(&750));
    check_invariants(&engine).unwrap();
}

// ---------------------------------------------------------------------------
// Randomized
// ---------------------------------------------------------------------------

#[test]
fn test_random_activity_conserves_rewards() {
    const EPOCH: u64 = 1_000;
    const EPOCHS: u64 = 12;
    let users: Vec<UserId> = ["u0", "u1", "u2", "u3"].iter().map(|&n| user(n)).collect();
    let pools: [PoolId; 2] = [11, 22];

    let mut rng = StdRng::seed_from_u64(7);
    let mut engine = engine(EPOCH, 3, 1_000);
    for pool in pools {
        engine.register_pool(pool).unwrap();
    }
    engine.set_allocation_setting(&pools, &[600, 400], 0).unwrap();
    let budgets: Vec<Amount> = (0..EPOCHS).map(|_| rng.gen_range(0..50_000)).collect();
    engine.fund_epochs(1, &budgets, 0).unwrap();

    let mut now = START;
    while now < START + (EPOCHS - 1) * EPOCH {
        now += rng.gen_range(0..150);
        let pool = pools[rng.gen_range(0..pools.len())];
        let who = &users[rng.gen_range(0..users.len())];
        match rng.gen_range(0..4) {
            0 | 1 => engine.stake(pool, who, rng.gen_range(1..10_000), now).unwrap(),
            2 => {
                let balance = engine.balance_of(pool, who).unwrap();
                if balance > 0 {
                    let amount = rng.gen_range(1..=balance);
                    engine.withdraw(pool, who, amount, now).unwrap();
                }
            }
            _ => {
                engine.redeem_rewards(pool, who, now).unwrap();
            }
        }
        check_invariants(&engine).unwrap();
    }

    let end = START + EPOCHS * EPOCH;
    for pool in pools {
        engine.settle_epoch(pool, EPOCHS, end).unwrap();
    }
    check_invariants(&engine).unwrap();

    for epoch in 1..=EPOCHS {
        let mut epoch_total: u128 = 0;
        for pool in pools {
            let settlement = engine.settlement(pool, epoch).unwrap().unwrap();
            epoch_total += settlement.pool_budget as u128;
            for (who, &seconds) in &settlement.user_stake_seconds {
                let expected =
                    settlement.pool_budget as u128 * seconds / settlement.total_stake_seconds;
                assert_eq!(settlement.allocation_of(who) as u128, expected);
            }
            // Each user loses less than one unit to flooring.
            if settlement.total_stake_seconds > 0 {
                assert!((settlement.dust as usize) < settlement.user_stake_seconds.len());
            }
        }
        assert!(epoch_total <= engine.schedule().rewards_for_epoch(epoch) as u128);
    }

    // Everything vested by now; redeeming drains every bucket.
    let mut paid: u128 = 0;
    for who in &users {
        let summary = engine.redeem_rewards_all(who, end + 3 * EPOCH).unwrap();
        paid += summary.total as u128;
    }
    let mut distributed: u128 = 0;
    let mut claimed: u128 = 0;
    for pool in pools {
        distributed += engine.pool(pool).unwrap().distributed_total() as u128;
        for who in &users {
            claimed += engine.claimed_total(pool, who).unwrap() as u128;
            assert_eq!(engine.pending_rewards(pool, who, end + 3 * EPOCH), Ok(0));
        }
    }
    assert_eq!(claimed, distributed);
    assert!(paid <= claimed);
    let funded: u128 = budgets.iter().map(|&b| b as u128).sum();
    assert!(distributed <= funded);
}
