//! ASCII rendering of a week projection for the terminal.

use crate::engine::{DayProjection, Segment, SegmentKind};
use crate::models::{DayProgress, Weekday};

const TASK: char = '○';
const COMPLETED: char = '●';
const RESERVED: char = '◇';
const FREE: char = '·';

fn segment_symbol(segment: &Segment) -> char {
    match segment.kind {
        SegmentKind::Task if segment.completed => COMPLETED,
        SegmentKind::Task => TASK,
        SegmentKind::Sleep | SegmentKind::Meal => RESERVED,
        SegmentKind::FreeTime => FREE,
    }
}

/// Format hours without trailing zeros: `2h`, `1.5h`, `0.33h`.
pub fn format_hours(hours: f64) -> String {
    let rounded = format!("{:.2}", hours);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{}h", trimmed)
}

/// Render every day as a small tree.
///
/// Example output:
/// ```text
/// Monday
/// ├── ● Study 2h
/// ├── ◇ Sleep 8h
/// ├── ◇ Meal 2h
/// └── · Free Time 12h
/// ```
pub fn render_week(days: &[DayProjection], today: Option<Weekday>) -> String {
    let mut output = String::new();
    for (i, day) in days.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        render_day(&mut output, day, today == Some(day.day));
    }
    output
}

fn render_day(output: &mut String, day: &DayProjection, is_today: bool) {
    output.push_str(day.day.as_str());
    if is_today {
        output.push_str(" (today)");
    }
    output.push('\n');

    for (i, segment) in day.segments.iter().enumerate() {
        let branch = if i == day.segments.len() - 1 { "└── " } else { "├── " };
        output.push_str(branch);
        output.push(segment_symbol(segment));
        output.push(' ');
        output.push_str(&segment.label);
        output.push(' ');
        output.push_str(&format_hours(segment.value));
        output.push('\n');
    }
}

/// Render completion flags per day, skipping days with nothing scheduled.
pub fn render_progress(progress: &[DayProgress]) -> String {
    let mut output = String::new();
    for day in progress.iter().filter(|d| !d.tasks.is_empty()) {
        output.push_str(day.day.as_str());
        output.push('\n');
        for (i, (title, done)) in day.tasks.iter().enumerate() {
            let branch = if i == day.tasks.len() - 1 { "└── " } else { "├── " };
            output.push_str(branch);
            output.push(if *done { COMPLETED } else { TASK });
            output.push(' ');
            output.push_str(title);
            output.push('\n');
        }
    }
    output
}
