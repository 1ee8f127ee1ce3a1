use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::Budgets;
use super::task::Task;
use super::weekday::Weekday;

pub const SLEEP_TITLE: &str = "Sleep";
pub const MEAL_TITLE: &str = "Meal";

/// Whether a title belongs to one of the fixed daily allocations.
pub fn is_reserved_title(title: &str) -> bool {
    title.eq_ignore_ascii_case(SLEEP_TITLE) || title.eq_ignore_ascii_case(MEAL_TITLE)
}

/// What a schedule entry is allocated to.
///
/// Sleep and meal entries are not task rows; they carry a negative id minted
/// fresh each time a schedule is built, so every reserved entry in one
/// schedule is distinct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskRef {
    Task(Uuid),
    Reserved(i64),
}

impl TaskRef {
    pub fn task_id(&self) -> Option<Uuid> {
        match self {
            Self::Task(id) => Some(*id),
            Self::Reserved(_) => None,
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved(_))
    }
}

/// Hours assigned to one task on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub hours: f64,
    #[serde(default)]
    pub completed: bool,
    pub task_ref: TaskRef,
    /// Id of the persisted row this entry was read from, if any.
    #[serde(default)]
    pub row_id: Option<Uuid>,
}

impl ScheduleEntry {
    pub fn new(task_ref: TaskRef, hours: f64) -> Self {
        Self {
            hours,
            completed: false,
            task_ref,
            row_id: None,
        }
    }
}

/// A titled entry within a day, kept in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayEntry {
    pub title: String,
    #[serde(flatten)]
    pub entry: ScheduleEntry,
}

/// One day's allocations: title -> entry, titles unique, insertion-ordered.
///
/// Insertion order is what the projection iterates, which keeps first-sight
/// color assignment stable across re-renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DailySchedule {
    entries: Vec<DayEntry>,
}

impl DailySchedule {
    pub fn get(&self, title: &str) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.title == title)
            .map(|e| &e.entry)
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut ScheduleEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.title == title)
            .map(|e| &mut e.entry)
    }

    /// Insert or replace the entry for `title`. A replaced entry keeps its position.
    pub fn insert(&mut self, title: impl Into<String>, entry: ScheduleEntry) {
        let title = title.into();
        match self.get_mut(&title) {
            Some(existing) => *existing = entry,
            None => self.entries.push(DayEntry { title, entry }),
        }
    }

    /// Returns the entry for `title`, appending one built by `make` if absent.
    pub fn entry_or_insert_with(
        &mut self,
        title: &str,
        make: impl FnOnce() -> ScheduleEntry,
    ) -> &mut ScheduleEntry {
        let pos = match self.entries.iter().position(|e| e.title == title) {
            Some(pos) => pos,
            None => {
                self.entries.push(DayEntry {
                    title: title.to_string(),
                    entry: make(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].entry
    }

    pub fn remove(&mut self, title: &str) -> Option<ScheduleEntry> {
        let pos = self.entries.iter().position(|e| e.title == title)?;
        Some(self.entries.remove(pos).entry)
    }

    /// Finds the entry allocated to a task, returning its title too.
    pub fn find_task(&self, task_id: Uuid) -> Option<(&str, &ScheduleEntry)> {
        self.entries
            .iter()
            .find(|e| e.entry.task_ref == TaskRef::Task(task_id))
            .map(|e| (e.title.as_str(), &e.entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScheduleEntry)> {
        self.entries.iter().map(|e| (e.title.as_str(), &e.entry))
    }

    /// Entries that are not sleep or meal.
    pub fn task_entries(&self) -> impl Iterator<Item = (&str, &ScheduleEntry)> {
        self.iter().filter(|(title, _)| !is_reserved_title(title))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_hours(&self) -> f64 {
        self.entries.iter().map(|e| e.entry.hours).sum()
    }
}

/// The canonical day -> task -> hours structure for one week.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklySchedule {
    days: [DailySchedule; 7],
}

impl WeeklySchedule {
    /// A week with only the reserved sleep and meal entries.
    ///
    /// Reserved ids count down from -1 so that every reserved entry in the
    /// schedule is distinct.
    pub fn with_reserved(budgets: &Budgets) -> Self {
        let mut schedule = Self::default();
        let mut next_reserved_id = -1;
        for day in Weekday::ALL {
            let daily = schedule.day_mut(day);
            daily.insert(
                SLEEP_TITLE,
                ScheduleEntry::new(TaskRef::Reserved(next_reserved_id), budgets.sleep_hours),
            );
            next_reserved_id -= 1;
            daily.insert(
                MEAL_TITLE,
                ScheduleEntry::new(TaskRef::Reserved(next_reserved_id), budgets.meal_hours),
            );
            next_reserved_id -= 1;
        }
        schedule
    }

    /// Rebuild a schedule from persisted rows.
    ///
    /// Rows whose task is not in `tasks` are dropped. Repeated `(day, task)`
    /// rows are merged by summing their hours; the first row's id is kept.
    pub fn from_rows(rows: &[ScheduleRow], tasks: &[Task], budgets: &Budgets) -> Self {
        let titles: HashMap<Uuid, &str> = tasks.iter().map(|t| (t.id, t.title.as_str())).collect();
        let mut schedule = Self::with_reserved(budgets);

        for row in rows {
            let Some(title) = titles.get(&row.task) else {
                tracing::debug!("Dropping schedule row {} for unknown task {}", row.id, row.task);
                continue;
            };
            let entry = schedule.day_mut(row.day).entry_or_insert_with(title, || ScheduleEntry {
                hours: 0.0,
                completed: row.completed,
                task_ref: TaskRef::Task(row.task),
                row_id: Some(row.id),
            });
            entry.hours += row.hours;
        }

        schedule
    }

    pub fn day(&self, day: Weekday) -> &DailySchedule {
        &self.days[day.index()]
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut DailySchedule {
        &mut self.days[day.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DailySchedule)> {
        Weekday::ALL.into_iter().zip(self.days.iter())
    }

    /// Hours allocated to a task across the whole week.
    pub fn task_hours(&self, task_id: Uuid) -> f64 {
        self.days
            .iter()
            .filter_map(|daily| daily.find_task(task_id))
            .map(|(_, entry)| entry.hours)
            .sum()
    }

    /// Days on which a task has an entry.
    pub fn task_days(&self, task_id: Uuid) -> Vec<Weekday> {
        self.iter()
            .filter(|(_, daily)| daily.find_task(task_id).is_some())
            .map(|(day, _)| day)
            .collect()
    }

    /// Flatten non-reserved entries into rows for a bulk write.
    pub fn to_rows(&self) -> Vec<NewScheduleRow> {
        self.iter()
            .flat_map(|(day, daily)| {
                daily.task_entries().filter_map(move |(_, entry)| {
                    entry.task_ref.task_id().map(|task| NewScheduleRow {
                        day,
                        task,
                        hours: entry.hours,
                        completed: entry.completed,
                    })
                })
            })
            .collect()
    }
}

/// A persisted schedule row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub task: Uuid,
    pub day: Weekday,
    pub hours: f64,
    pub completed: bool,
}

/// A row submitted as part of a bulk write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewScheduleRow {
    pub day: Weekday,
    pub task: Uuid,
    pub hours: f64,
    #[serde(default)]
    pub completed: bool,
}

/// Body of a bulk schedule write. Replaces every previously stored row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkScheduleInput {
    pub schedules: Vec<NewScheduleRow>,
}

/// Body of a point move: shift `hours` of a task from one day to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveHoursInput {
    pub task_id: Uuid,
    pub old_day: Weekday,
    pub new_day: Weekday,
    pub hours: f64,
}

/// Completion flags of one day, keyed by task title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayProgress {
    pub day: Weekday,
    pub tasks: BTreeMap<String, bool>,
}

/// Completion flags for the whole week, in canonical day order.
pub type WeeklyProgress = Vec<DayProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(title: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            duration_hours: 4.0,
            spread_days: 2,
            is_short_task: false,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_with_reserved_mints_distinct_negative_ids() {
        let schedule = WeeklySchedule::with_reserved(&Budgets::default());
        let mut ids: Vec<i64> = schedule
            .iter()
            .flat_map(|(_, daily)| daily.iter().map(|(_, e)| e.task_ref))
            .filter_map(|r| match r {
                TaskRef::Reserved(id) => Some(id),
                TaskRef::Task(_) => None,
            })
            .collect();
        assert_eq!(ids.len(), 14);
        assert!(ids.iter().all(|id| *id < 0));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 14);

        let monday = schedule.day(Weekday::Monday);
        assert_eq!(monday.get(SLEEP_TITLE).unwrap().hours, 8.0);
        assert_eq!(monday.get(MEAL_TITLE).unwrap().hours, 2.0);
    }

    #[test]
    fn test_daily_schedule_keeps_insertion_order() {
        let mut daily = DailySchedule::default();
        daily.insert("B", ScheduleEntry::new(TaskRef::Reserved(-1), 1.0));
        daily.insert("A", ScheduleEntry::new(TaskRef::Reserved(-2), 2.0));
        daily.insert("B", ScheduleEntry::new(TaskRef::Reserved(-3), 3.0));

        let titles: Vec<&str> = daily.iter().map(|(t, _)| t).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(daily.get("B").unwrap().hours, 3.0);
        assert!(daily.remove("B").is_some());
        assert!(daily.get("B").is_none());
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn test_to_rows_skips_reserved_entries() {
        let study = task("Study");
        let mut schedule = WeeklySchedule::with_reserved(&Budgets::default());
        schedule
            .day_mut(Weekday::Tuesday)
            .insert("Study", ScheduleEntry::new(TaskRef::Task(study.id), 2.0));

        let rows = schedule.to_rows();
        assert_eq!(
            rows,
            vec![NewScheduleRow {
                day: Weekday::Tuesday,
                task: study.id,
                hours: 2.0,
                completed: false,
            }]
        );
    }

    #[test]
    fn test_from_rows_merges_duplicates_and_drops_unknown_tasks() {
        let study = task("Study");
        let rows = vec![
            ScheduleRow {
                id: Uuid::new_v4(),
                task: study.id,
                day: Weekday::Friday,
                hours: 1.5,
                completed: true,
            },
            ScheduleRow {
                id: Uuid::new_v4(),
                task: study.id,
                day: Weekday::Friday,
                hours: 0.5,
                completed: false,
            },
            ScheduleRow {
                id: Uuid::new_v4(),
                task: Uuid::new_v4(),
                day: Weekday::Friday,
                hours: 3.0,
                completed: false,
            },
        ];

        let schedule = WeeklySchedule::from_rows(&rows, &[study.clone()], &Budgets::default());
        let friday = schedule.day(Weekday::Friday);
        let entry = friday.get("Study").unwrap();
        assert_eq!(entry.hours, 2.0);
        assert!(entry.completed);
        assert_eq!(entry.row_id, Some(rows[0].id));
        assert_eq!(friday.len(), 3);
        assert_eq!(schedule.task_hours(study.id), 2.0);
        assert_eq!(schedule.task_days(study.id), vec![Weekday::Friday]);
    }
}
