//! A planning session: the host-side owner of tasks, schedule and colors.
//!
//! [`Planner`] keeps the in-memory view consistent with the store it was
//! built on. [`SharedPlanner`] wraps one behind a single-flight guard so that
//! overlapping mutations are rejected instead of interleaving store writes.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::engine::{self, ColorCache, DayProjection};
use crate::error::{PlanError, PlanResult};
use crate::models::*;
use crate::store::ScheduleStore;

pub struct Planner<S> {
    store: S,
    budgets: Budgets,
    tasks: Vec<Task>,
    schedule: Option<WeeklySchedule>,
    projection: Vec<DayProjection>,
    colors: ColorCache,
    rng: StdRng,
    today: Option<Weekday>,
}

impl<S: ScheduleStore> Planner<S> {
    pub fn new(store: S, budgets: Budgets) -> Self {
        Self {
            store,
            budgets,
            tasks: Vec::new(),
            schedule: None,
            projection: Vec::new(),
            colors: ColorCache::new(),
            rng: StdRng::from_entropy(),
            today: None,
        }
    }

    /// Use a fixed seed for allocation draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Pin the day considered "today" for completion updates.
    pub fn with_today(mut self, day: Weekday) -> Self {
        self.today = Some(day);
        self
    }

    pub fn today(&self) -> Weekday {
        self.today.unwrap_or_else(Weekday::today)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn budgets(&self) -> Budgets {
        self.budgets
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_by_title(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    pub fn schedule(&self) -> Option<&WeeklySchedule> {
        self.schedule.as_ref()
    }

    pub fn projection(&self) -> &[DayProjection] {
        &self.projection
    }

    pub fn colors(&self) -> &ColorCache {
        &self.colors
    }

    /// Change the sleep and meal budgets used by later runs.
    ///
    /// The projection is redrawn with the new values. The current schedule
    /// keeps the reserved entries it was generated with until the next
    /// `distribute` or reload.
    pub fn set_budgets(&mut self, budgets: Budgets) -> PlanResult<()> {
        budgets.validate()?;
        self.budgets = budgets;
        self.reproject();
        Ok(())
    }

    /// Re-read the active tasks from the store.
    pub async fn refresh_tasks(&mut self) -> PlanResult<&[Task]> {
        self.tasks = self.store.list_tasks(false).await?;
        Ok(&self.tasks)
    }

    /// Allocate every active task over a fresh week and persist it.
    ///
    /// On a capacity or validation failure nothing changes. Once allocation
    /// succeeds the new schedule is installed, even if the store write then
    /// fails with [`PlanError::Transport`].
    pub async fn distribute(&mut self) -> PlanResult<WeeklySchedule> {
        self.refresh_tasks().await?;

        let schedule = engine::allocate(&self.tasks, &self.budgets, &mut self.rng)?;
        let rows = schedule.to_rows();
        self.install(schedule);

        tracing::info!("Distributed {} tasks into {} schedule rows", self.tasks.len(), rows.len());

        let stored = self.store.replace_schedule(&rows).await.map_err(|e| {
            tracing::warn!("Schedule write failed, keeping local schedule: {}", e);
            PlanError::from(e)
        })?;
        self.attach_row_ids(&stored);

        self.current_schedule().cloned()
    }

    /// Rebuild the schedule from the persisted rows.
    pub async fn reload_schedule(&mut self) -> PlanResult<&WeeklySchedule> {
        self.refresh_tasks().await?;
        let rows = self.store.list_schedule_rows().await?;
        let schedule = WeeklySchedule::from_rows(&rows, &self.tasks, &self.budgets);
        self.install(schedule);
        self.current_schedule()
    }

    /// Shift `hours` of a task between two days, locally and in the store.
    pub async fn move_task(
        &mut self,
        task_id: Uuid,
        old_day: Weekday,
        new_day: Weekday,
        hours: f64,
    ) -> PlanResult<()> {
        let schedule = self
            .schedule
            .as_mut()
            .ok_or_else(|| PlanError::NotFound("no schedule loaded".to_string()))?;
        let title = engine::move_hours(schedule, task_id, old_day, new_day, hours)?;

        self.reproject_day(old_day);
        self.reproject_day(new_day);

        tracing::info!("Moving {}h of '{}' from {} to {}", hours, title, old_day, new_day);

        self.store
            .move_hours(&MoveHoursInput {
                task_id,
                old_day,
                new_day,
                hours,
            })
            .await?;
        Ok(())
    }

    /// Mark a task's entry on `day` complete or incomplete.
    ///
    /// Only today's entries are accepted. The row is looked up in a fresh
    /// listing, and the schedule is re-fetched after the update.
    pub async fn set_completion(&mut self, title: &str, day: Weekday, completed: bool) -> PlanResult<()> {
        let row = self.resolve_row(title, day).await?;
        self.store.set_completed(row.id, completed).await?;
        tracing::info!("Marked '{}' on {} as {}", title, day, if completed { "complete" } else { "incomplete" });
        self.reload_schedule().await?;
        Ok(())
    }

    /// Flip the completion flag of a task's entry on `day`. Returns the new value.
    pub async fn toggle_completion(&mut self, title: &str, day: Weekday) -> PlanResult<bool> {
        let row = self.resolve_row(title, day).await?;
        let completed = !row.completed;
        self.store.set_completed(row.id, completed).await?;
        self.reload_schedule().await?;
        Ok(completed)
    }

    async fn resolve_row(&mut self, title: &str, day: Weekday) -> PlanResult<ScheduleRow> {
        let today = self.today();
        if day != today {
            return Err(PlanError::NotToday { day, today });
        }

        if self.task_by_title(title).is_none() {
            self.refresh_tasks().await?;
        }
        let task_id = self
            .task_by_title(title)
            .map(|t| t.id)
            .ok_or_else(|| PlanError::NotFound(format!("no task titled '{}'", title)))?;

        self.store
            .list_schedule_rows()
            .await?
            .into_iter()
            .find(|row| row.task == task_id && row.day == day)
            .ok_or_else(|| PlanError::NotFound(format!("'{}' has no entry on {}", title, day)))
    }

    fn current_schedule(&self) -> PlanResult<&WeeklySchedule> {
        self.schedule
            .as_ref()
            .ok_or_else(|| PlanError::NotFound("no schedule loaded".to_string()))
    }

    fn install(&mut self, schedule: WeeklySchedule) {
        self.schedule = Some(schedule);
        self.reproject();
    }

    fn reproject(&mut self) {
        self.projection = match self.schedule.as_ref() {
            Some(schedule) => engine::project(schedule, &mut self.colors, &self.budgets),
            None => Vec::new(),
        };
    }

    fn reproject_day(&mut self, day: Weekday) {
        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };
        let projected = engine::project_day(day, schedule.day(day), &mut self.colors, &self.budgets);
        match self.projection.get_mut(day.index()) {
            Some(slot) => *slot = projected,
            None => self.reproject(),
        }
    }

    fn attach_row_ids(&mut self, rows: &[ScheduleRow]) {
        let Some(schedule) = self.schedule.as_mut() else {
            return;
        };
        let ids: HashMap<(Uuid, Weekday), Uuid> =
            rows.iter().map(|r| ((r.task, r.day), r.id)).collect();
        for day in Weekday::ALL {
            let daily = schedule.day_mut(day);
            let titles: Vec<(String, Uuid)> = daily
                .task_entries()
                .filter_map(|(title, entry)| entry.task_ref.task_id().map(|id| (title.to_string(), id)))
                .collect();
            for (title, task_id) in titles {
                if let (Some(entry), Some(row_id)) = (daily.get_mut(&title), ids.get(&(task_id, day))) {
                    entry.row_id = Some(*row_id);
                }
            }
        }
    }
}

/// A [`Planner`] shared between concurrent callers.
///
/// Mutations take the session with `try_lock`; a call that overlaps one
/// still in flight fails with [`PlanError::Busy`].
pub struct SharedPlanner<S> {
    inner: Arc<Mutex<Planner<S>>>,
}

impl<S> Clone for SharedPlanner<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ScheduleStore> SharedPlanner<S> {
    pub fn new(planner: Planner<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(planner)),
        }
    }

    /// Wait for the session. For hosts that queue rather than reject.
    pub async fn lock(&self) -> MutexGuard<'_, Planner<S>> {
        self.inner.lock().await
    }

    fn claim(&self) -> PlanResult<MutexGuard<'_, Planner<S>>> {
        self.inner.try_lock().map_err(|_| {
            tracing::debug!("Rejecting overlapping schedule operation");
            PlanError::Busy
        })
    }

    pub async fn distribute(&self) -> PlanResult<WeeklySchedule> {
        self.claim()?.distribute().await
    }

    pub async fn reload_schedule(&self) -> PlanResult<WeeklySchedule> {
        self.claim()?.reload_schedule().await.cloned()
    }

    pub async fn move_task(
        &self,
        task_id: Uuid,
        old_day: Weekday,
        new_day: Weekday,
        hours: f64,
    ) -> PlanResult<()> {
        self.claim()?.move_task(task_id, old_day, new_day, hours).await
    }

    pub async fn set_completion(&self, title: &str, day: Weekday, completed: bool) -> PlanResult<()> {
        self.claim()?.set_completion(title, day, completed).await
    }

    pub async fn toggle_completion(&self, title: &str, day: Weekday) -> PlanResult<bool> {
        self.claim()?.toggle_completion(title, day).await
    }

    pub fn set_budgets(&self, budgets: Budgets) -> PlanResult<()> {
        self.claim()?.set_budgets(budgets)
    }

    pub fn projection(&self) -> PlanResult<Vec<DayProjection>> {
        Ok(self.claim()?.projection().to_vec())
    }
}
