//! Route consolidation engine
//!
//! Compares the current livestock collection routing (every farm trucked
//! separately to its nearest processing plant) against a consolidated plan
//! (one truck visiting the farms in sequence before a shared plant).

pub mod cli;
pub mod config;
pub mod services;
pub mod types;
