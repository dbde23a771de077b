//! HabitQuest Engine library.
//!
//! Server-side code for the HabitQuest progression engine.
//!
//! ## Structure
//!
//! - `infrastructure/` - Port traits and SQLite adapters
//! - `use_cases/` - Operation orchestration over the ports
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
