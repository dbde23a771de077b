//! Use cases - one struct per operation (or Crud cluster), wired with the
//! port traits they need. HTTP handlers stay thin and delegate here.

pub mod actions;
pub mod config;
pub mod game;
pub mod management;
pub mod streaks;
pub mod views;

/// Retry budget for action writes that lose an optimistic-concurrency race.
pub(crate) const MAX_ACTION_RETRIES: u32 = 3;
