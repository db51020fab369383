// crates/lmine-core/src/types.rs
//
// Primitive units shared by every crate in the workspace.
//
// All monetary values are integers in the smallest indivisible unit of the
// token they describe. No floating point is used on the accrual path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of the staked position or of the reward token, in base units.
pub type Amount = u64;

/// Wall-clock time in unix seconds. Always supplied by the caller.
pub type Timestamp = u64;

/// Epoch index. The first epoch is 1.
pub type EpochId = u64;

/// Pool identifier: the expiry/maturity marker of the staking market.
pub type PoolId = u64;

/// Integral of a balance over time (`Amount` x seconds).
///
/// A `u64` balance held for a `u64` number of seconds always fits.
pub type StakeSeconds = u128;

/// Identifier of a depositor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
