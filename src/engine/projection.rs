use serde::Serialize;

use super::colors::*;
use crate::models::*;

pub const FREE_TIME_LABEL: &str = "Free Time";

/// What a projected segment stands for.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Task,
    Sleep,
    Meal,
    FreeTime,
}

/// One labeled slice of a day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Segment {
    pub label: String,
    pub value: f64,
    pub color: Color,
    pub kind: SegmentKind,
    pub completed: bool,
}

/// Renderer-ready summary of one day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayProjection {
    pub day: Weekday,
    pub segments: Vec<Segment>,
}

impl DayProjection {
    pub fn segment(&self, label: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.label == label)
    }

    /// Hours claimed by tasks, sleep and meals.
    pub fn allocated_hours(&self) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::FreeTime)
            .map(|s| s.value)
            .sum()
    }

    pub fn free_time(&self) -> Option<f64> {
        self.segments
            .iter()
            .find(|s| s.kind == SegmentKind::FreeTime)
            .map(|s| s.value)
    }
}

/// Project every day of `schedule`, in canonical order.
///
/// Sleep and meal segments come from `budgets`, not from the schedule's
/// reserved entries, so a budget change is reflected without reallocating.
pub fn project(
    schedule: &WeeklySchedule,
    colors: &mut ColorCache,
    budgets: &Budgets,
) -> Vec<DayProjection> {
    schedule
        .iter()
        .map(|(day, daily)| project_day(day, daily, colors, budgets))
        .collect()
}

/// Project a single day.
///
/// Task segments keep the day's insertion order, which fixes the order in
/// which unseen titles claim palette slots.
pub fn project_day(
    day: Weekday,
    daily: &DailySchedule,
    colors: &mut ColorCache,
    budgets: &Budgets,
) -> DayProjection {
    let mut segments: Vec<Segment> = daily
        .task_entries()
        .map(|(title, entry)| {
            // First sight is recorded even for completed entries.
            let cached = colors.color_for(title);
            Segment {
                label: title.to_string(),
                value: entry.hours,
                color: if entry.completed { COMPLETED_COLOR } else { cached },
                kind: SegmentKind::Task,
                completed: entry.completed,
            }
        })
        .collect();

    segments.push(Segment {
        label: SLEEP_TITLE.to_string(),
        value: budgets.sleep_hours,
        color: SLEEP_COLOR,
        kind: SegmentKind::Sleep,
        completed: false,
    });
    segments.push(Segment {
        label: MEAL_TITLE.to_string(),
        value: budgets.meal_hours,
        color: MEAL_COLOR,
        kind: SegmentKind::Meal,
        completed: false,
    });

    let allocated: f64 = segments.iter().map(|s| s.value).sum();
    let free = HOURS_PER_DAY - allocated;
    if free > HOURS_EPSILON {
        segments.push(Segment {
            label: FREE_TIME_LABEL.to_string(),
            value: free,
            color: FREE_TIME_COLOR,
            kind: SegmentKind::FreeTime,
            completed: false,
        });
    }

    DayProjection { day, segments }
}
