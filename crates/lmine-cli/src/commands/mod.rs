// crates/lmine-cli/src/commands/mod.rs
//
// Command module declarations for the lmine CLI.

pub mod epoch;
pub mod simulate;
pub mod split;
