// crates/lmine-engine/src/math.rs
//
// Checked integer helpers for the accrual path.
//
// Every proportional split is `floor(a * b / denom)` computed with a 256-bit
// intermediate, so any u128 x u128 product is exact. Only a quotient that
// does not fit in `Amount` (or a zero denominator) is reported.

use primitive_types::U256;

use lmine_core::{Amount, MiningError};

/// `floor(a * b / denom)` with a U256 intermediate, narrowed back to `Amount`.
///
/// # Errors
/// Returns `MiningError::ArithmeticOverflow` if `denom` is zero or the
/// quotient does not fit in `Amount`.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Result<Amount, MiningError> {
    if denom == 0 {
        return Err(MiningError::ArithmeticOverflow(
            "division by zero".to_string(),
        ));
    }
    // u128 x u128 always fits in 256 bits.
    let num = U256::from(a) * U256::from(b);
    let quotient = num / U256::from(denom);
    if quotient > U256::from(Amount::MAX) {
        return Err(MiningError::ArithmeticOverflow(format!(
            "quotient of {} * {} / {} exceeds u64",
            a, b, denom
        )));
    }
    Ok(quotient.low_u64())
}

pub fn checked_add(a: Amount, b: Amount, what: &str) -> Result<Amount, MiningError> {
    a.checked_add(b)
        .ok_or_else(|| MiningError::ArithmeticOverflow(format!("u64 overflow in {}", what)))
}

pub fn checked_add_u128(a: u128, b: u128, what: &str) -> Result<u128, MiningError> {
    a.checked_add(b)
        .ok_or_else(|| MiningError::ArithmeticOverflow(format!("u128 overflow in {}", what)))
}
