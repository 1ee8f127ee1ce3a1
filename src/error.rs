//! Errors surfaced by planning operations.

use thiserror::Error;

use crate::models::{BudgetError, TaskFieldError, Weekday};
use crate::store::StoreError;

/// Everything a planning operation can report. None of these are fatal;
/// each is recoverable at the call site.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Committed hours exceed what the week can hold. Nothing was changed.
    #[error(
        "there are not that many hours in a week: {committed:.2}h committed, {available:.2}h available"
    )]
    Capacity { committed: f64, available: f64 },

    #[error(transparent)]
    InvalidTask(#[from] TaskFieldError),

    #[error(transparent)]
    InvalidBudget(#[from] BudgetError),

    /// A move that would break hour conservation.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// The referenced day/task combination is not in the schedule. Treated as a no-op.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("only today's ({today}) entries can be marked complete, not {day}'s")]
    NotToday { day: Weekday, today: Weekday },

    /// Another mutation on the same schedule has not finished yet.
    #[error("another schedule operation is still in flight")]
    Busy,

    /// The store call failed. In-memory state is kept as the best-effort result.
    #[error("store request failed: {0}")]
    Transport(#[from] StoreError),
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
