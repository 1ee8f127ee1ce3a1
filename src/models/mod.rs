//! Domain models for weekplan.
//!
//! # Core Concepts
//!
//! ## Registry
//!
//! - [`Task`]: A recurring commitment with a weekly hour budget. Long tasks are
//!   split evenly over `spread_days` distinct days; short tasks are scattered
//!   in sub-two-hour bursts.
//!
//! ## Weekly Schedule
//!
//! - [`WeeklySchedule`]: Seven [`DailySchedule`]s in canonical [`Weekday`] order.
//! - [`ScheduleEntry`]: Hours assigned to one task (or reserved allocation) on one day.
//! - [`ScheduleRow`]: The persisted form of a non-reserved entry.
//!
//! ## Budgets
//!
//! - [`Budgets`]: Fixed daily sleep and meal hours. These are never persisted as
//!   rows; they are re-injected as reserved entries whenever a schedule is built.

mod budget;
mod schedule;
mod task;
mod weekday;

pub use budget::*;
pub use schedule::*;
pub use task::*;
pub use weekday::*;

/// Tolerance used when comparing accumulated hour values.
pub const HOURS_EPSILON: f64 = 1e-9;
