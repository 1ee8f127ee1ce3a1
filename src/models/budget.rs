use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HOURS_PER_DAY: f64 = 24.0;
pub const DAYS_PER_WEEK: usize = 7;

/// Fixed daily allocations injected into every day of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budgets {
    pub sleep_hours: f64,
    pub meal_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    #[error("invalid budget: {name} hours must be a non-negative number, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("invalid budget: sleep ({sleep}h) and meal ({meal}h) exceed a 24h day")]
    ExceedsDay { sleep: f64, meal: f64 },
}

impl Budgets {
    pub fn new(sleep_hours: f64, meal_hours: f64) -> Result<Self, BudgetError> {
        let budgets = Self {
            sleep_hours,
            meal_hours,
        };
        budgets.validate()?;
        Ok(budgets)
    }

    pub fn validate(&self) -> Result<(), BudgetError> {
        for (name, value) in [("sleep", self.sleep_hours), ("meal", self.meal_hours)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BudgetError::Negative { name, value });
            }
        }
        if self.sleep_hours + self.meal_hours > HOURS_PER_DAY {
            return Err(BudgetError::ExceedsDay {
                sleep: self.sleep_hours,
                meal: self.meal_hours,
            });
        }
        Ok(())
    }

    /// Hours per day left after sleep and meals.
    pub fn free_hours_per_day(&self) -> f64 {
        HOURS_PER_DAY - self.sleep_hours - self.meal_hours
    }

    /// Hours per week that tasks may claim.
    pub fn available_week_hours(&self) -> f64 {
        self.free_hours_per_day() * DAYS_PER_WEEK as f64
    }
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            sleep_hours: 8.0,
            meal_hours: 2.0,
        }
    }
}
