//! Value objects shared across entities.

mod status;

pub use status::EntityStatus;
