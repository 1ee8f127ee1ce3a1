//! The planning engine.
//!
//! Everything in here is synchronous and store-agnostic:
//!
//! - [`allocate`]: turn a task registry and budgets into a [`WeeklySchedule`](crate::models::WeeklySchedule)
//! - [`move_hours`]: point-edit an existing schedule
//! - [`project`]: derive renderer-ready per-day segments, including free time
//! - [`ColorCache`]: stable title -> color assignment for one planning session

mod allocate;
mod colors;
mod mutate;
mod projection;

pub use allocate::*;
pub use colors::*;
pub use mutate::*;
pub use projection::*;
