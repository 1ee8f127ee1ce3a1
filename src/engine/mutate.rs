use uuid::Uuid;

use crate::error::{PlanError, PlanResult};
use crate::models::*;

/// Move `hours` of a task from `old_day` to `new_day`.
///
/// The old entry is removed when nothing meaningful is left of it; the new
/// entry is created (uncompleted) when the task had nothing on `new_day`.
/// Returns the task's title. On error the schedule is untouched.
pub fn move_hours(
    schedule: &mut WeeklySchedule,
    task_id: Uuid,
    old_day: Weekday,
    new_day: Weekday,
    hours: f64,
) -> PlanResult<String> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(PlanError::InvalidMove(format!(
            "moved hours must be positive, got {}",
            hours
        )));
    }
    if old_day == new_day {
        return Err(PlanError::InvalidMove(format!(
            "cannot move hours from {} onto itself",
            old_day
        )));
    }

    let (title, available) = schedule
        .day(old_day)
        .find_task(task_id)
        .map(|(title, entry)| (title.to_string(), entry.hours))
        .ok_or_else(|| PlanError::NotFound(format!("task {} has no entry on {}", task_id, old_day)))?;

    if hours > available + HOURS_EPSILON {
        return Err(PlanError::InvalidMove(format!(
            "cannot move {} hours of '{}', only {} allocated on {}",
            hours, title, available, old_day
        )));
    }

    let old = schedule.day_mut(old_day);
    let remaining = available - hours;
    if remaining <= HOURS_EPSILON {
        old.remove(&title);
    } else if let Some(entry) = old.get_mut(&title) {
        entry.hours = remaining;
    }

    let entry = schedule
        .day_mut(new_day)
        .entry_or_insert_with(&title, || ScheduleEntry::new(TaskRef::Task(task_id), 0.0));
    entry.hours += hours;

    tracing::debug!("Moved {}h of '{}' from {} to {}", hours, title, old_day, new_day);
    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_with(task_id: Uuid, placements: &[(Weekday, f64)]) -> WeeklySchedule {
        let mut schedule = WeeklySchedule::with_reserved(&Budgets::default());
        for (day, hours) in placements {
            schedule
                .day_mut(*day)
                .insert("Study", ScheduleEntry::new(TaskRef::Task(task_id), *hours));
        }
        schedule
    }

    fn hours_on(schedule: &WeeklySchedule, day: Weekday) -> Option<f64> {
        schedule.day(day).get("Study").map(|e| e.hours)
    }

    #[test]
    fn test_move_there_and_back_restores_hours() {
        let id = Uuid::new_v4();
        let mut schedule = schedule_with(id, &[(Weekday::Monday, 2.0), (Weekday::Tuesday, 2.0)]);

        move_hours(&mut schedule, id, Weekday::Monday, Weekday::Tuesday, 1.5).unwrap();
        assert_eq!(hours_on(&schedule, Weekday::Monday), Some(0.5));
        assert_eq!(hours_on(&schedule, Weekday::Tuesday), Some(3.5));

        move_hours(&mut schedule, id, Weekday::Tuesday, Weekday::Monday, 1.5).unwrap();
        assert_eq!(hours_on(&schedule, Weekday::Monday), Some(2.0));
        assert_eq!(hours_on(&schedule, Weekday::Tuesday), Some(2.0));
    }

    #[test]
    fn test_moving_everything_removes_the_old_entry() {
        let id = Uuid::new_v4();
        let mut schedule = schedule_with(id, &[(Weekday::Monday, 2.0)]);

        let title = move_hours(&mut schedule, id, Weekday::Monday, Weekday::Sunday, 2.0).unwrap();
        assert_eq!(title, "Study");
        assert_eq!(hours_on(&schedule, Weekday::Monday), None);
        assert_eq!(hours_on(&schedule, Weekday::Sunday), Some(2.0));
        assert_eq!(schedule.task_hours(id), 2.0);
    }

    #[test]
    fn test_rejects_moves_that_break_conservation() {
        let id = Uuid::new_v4();
        let mut schedule = schedule_with(id, &[(Weekday::Monday, 2.0)]);
        let before = schedule.clone();

        for hours in [0.0, -1.0, 2.5, f64::NAN] {
            let err = move_hours(&mut schedule, id, Weekday::Monday, Weekday::Friday, hours)
                .unwrap_err();
            assert!(matches!(err, PlanError::InvalidMove(_)), "{}", hours);
        }
        let err =
            move_hours(&mut schedule, id, Weekday::Monday, Weekday::Monday, 1.0).unwrap_err();
        assert!(matches!(err, PlanError::InvalidMove(_)));
        assert_eq!(schedule, before);
    }

    #[test]
    fn test_missing_entry_is_not_found() {
        let id = Uuid::new_v4();
        let mut schedule = schedule_with(id, &[(Weekday::Monday, 2.0)]);
        let err =
            move_hours(&mut schedule, id, Weekday::Wednesday, Weekday::Friday, 1.0).unwrap_err();
        assert!(matches!(err, PlanError::NotFound(_)));
    }
}
