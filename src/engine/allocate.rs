use std::collections::HashSet;

use rand::Rng;

use crate::error::{PlanError, PlanResult};
use crate::models::*;

/// Upper bound (exclusive) of a single short-task burst.
pub const MAX_CHUNK_HOURS: f64 = 2.0;
/// Bursts shorter than this are redrawn.
pub const MIN_CHUNK_HOURS: f64 = 0.05;
/// After this many draws the rest of a short task lands on the day just drawn.
pub const MAX_SHORT_DRAWS: usize = 1024;
/// Day draws allowed per long task before the remaining days are filled in order.
pub const MAX_DAY_DRAWS: usize = 256;

/// Distribute every active task over a fresh week.
///
/// Fails without side effects when a task is malformed or when committed
/// hours exceed `budgets.available_week_hours()`. Soft-deleted tasks are
/// ignored. Long tasks are placed before short ones.
pub fn allocate<R: Rng + ?Sized>(
    tasks: &[Task],
    budgets: &Budgets,
    rng: &mut R,
) -> PlanResult<WeeklySchedule> {
    let active: Vec<&Task> = tasks.iter().filter(|t| !t.is_deleted).collect();

    let mut titles = HashSet::new();
    for task in &active {
        task.check_fields()?;
        if !titles.insert(task.title.as_str()) {
            return Err(TaskFieldError::DuplicateTitle(task.title.clone()).into());
        }
    }

    let committed: f64 = active.iter().map(|t| t.duration_hours).sum();
    let available = budgets.available_week_hours();
    if committed > available {
        tracing::warn!(
            "Refusing to allocate {:.2}h into {:.2}h of free time",
            committed,
            available
        );
        return Err(PlanError::Capacity {
            committed,
            available,
        });
    }

    let mut schedule = WeeklySchedule::with_reserved(budgets);

    for task in active.iter().filter(|t| !t.is_short_task) {
        place_long_task(&mut schedule, task, rng);
    }
    for task in active.iter().filter(|t| t.is_short_task) {
        place_short_task(&mut schedule, task, rng);
    }

    tracing::debug!(
        "Allocated {} tasks ({:.2}h of {:.2}h available)",
        active.len(),
        committed,
        available
    );

    Ok(schedule)
}

fn random_day<R: Rng + ?Sized>(rng: &mut R) -> Weekday {
    Weekday::ALL[rng.gen_range(0..Weekday::ALL.len())]
}

/// Even split over `spread_days` distinct days picked by rejection sampling.
fn place_long_task<R: Rng + ?Sized>(schedule: &mut WeeklySchedule, task: &Task, rng: &mut R) {
    let wanted = usize::from(task.spread_days).min(Weekday::ALL.len());
    let mut selected: Vec<Weekday> = Vec::with_capacity(wanted);

    let mut draws = 0;
    while selected.len() < wanted && draws < MAX_DAY_DRAWS {
        draws += 1;
        let day = random_day(rng);
        if !selected.contains(&day) {
            selected.push(day);
        }
    }
    for day in Weekday::ALL {
        if selected.len() >= wanted {
            break;
        }
        if !selected.contains(&day) {
            selected.push(day);
        }
    }

    let per_day = task.hours_per_day();
    for day in selected {
        schedule
            .day_mut(day)
            .insert(task.title.clone(), ScheduleEntry::new(TaskRef::Task(task.id), per_day));
    }
}

/// Random bursts on random days until the whole duration is placed.
fn place_short_task<R: Rng + ?Sized>(schedule: &mut WeeklySchedule, task: &Task, rng: &mut R) {
    let mut remaining = task.duration_hours;
    let mut draws = 0;

    while remaining > 0.0 {
        draws += 1;
        let day = random_day(rng);
        let chunk = if draws >= MAX_SHORT_DRAWS {
            remaining
        } else {
            let drawn = rng.gen_range(0.0..MAX_CHUNK_HOURS);
            if drawn < MIN_CHUNK_HOURS {
                continue;
            }
            drawn.min(remaining)
        };

        let entry = schedule.day_mut(day).entry_or_insert_with(&task.title, || {
            ScheduleEntry::new(TaskRef::Task(task.id), 0.0)
        });
        entry.hours += chunk;
        remaining -= chunk;
    }
}
