use async_trait::async_trait;
use speculate2::speculate;
use tokio_test::block_on;
use uuid::Uuid;
use weekplan::db::Database;
use weekplan::engine::{COMPLETED_COLOR, FREE_TIME_LABEL, PALETTE};
use weekplan::error::PlanError;
use weekplan::models::*;
use weekplan::planner::{Planner, SharedPlanner};
use weekplan::store::{ScheduleStore, StoreError, StoreResult};

fn setup_db() -> Database {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn add(db: &Database, input: CreateTaskInput) -> Task {
    db.create_task(input).expect("Failed to create task")
}

fn stored_hours(db: &Database, task: &Task) -> f64 {
    db.list_schedule_rows()
        .expect("Query failed")
        .iter()
        .filter(|r| r.task == task.id)
        .map(|r| r.hours)
        .sum()
}

/// Delegates to a database but refuses bulk writes.
struct OfflineWrites(Database);

#[async_trait]
impl ScheduleStore for OfflineWrites {
    async fn list_tasks(&self, include_deleted: bool) -> StoreResult<Vec<Task>> {
        ScheduleStore::list_tasks(&self.0, include_deleted).await
    }

    async fn create_task(&self, input: &CreateTaskInput) -> StoreResult<Task> {
        ScheduleStore::create_task(&self.0, input).await
    }

    async fn update_task(&self, id: Uuid, input: &UpdateTaskInput) -> StoreResult<Task> {
        ScheduleStore::update_task(&self.0, id, input).await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        ScheduleStore::delete_task(&self.0, id).await
    }

    async fn soft_delete_task(&self, id: Uuid) -> StoreResult<()> {
        ScheduleStore::soft_delete_task(&self.0, id).await
    }

    async fn list_schedule_rows(&self) -> StoreResult<Vec<ScheduleRow>> {
        ScheduleStore::list_schedule_rows(&self.0).await
    }

    async fn replace_schedule(&self, _rows: &[NewScheduleRow]) -> StoreResult<Vec<ScheduleRow>> {
        Err(StoreError::Server("503 Service Unavailable".to_string()))
    }

    async fn set_completed(&self, row_id: Uuid, completed: bool) -> StoreResult<()> {
        ScheduleStore::set_completed(&self.0, row_id, completed).await
    }

    async fn move_hours(&self, input: &MoveHoursInput) -> StoreResult<()> {
        ScheduleStore::move_hours(&self.0, input).await
    }

    async fn weekly_progress(&self) -> StoreResult<WeeklyProgress> {
        ScheduleStore::weekly_progress(&self.0).await
    }
}

speculate! {
    before {
        let db = setup_db();
        let mut planner = Planner::new(db.clone(), Budgets::default())
            .with_seed(7)
            .with_today(Weekday::Monday);
    }

    describe "distribute" {
        it "spreads a daily study block around sleep and meals" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));

            let schedule = block_on(planner.distribute()).expect("Distribute failed");

            for (_, daily) in schedule.iter() {
                assert_eq!(daily.get("Study").unwrap().hours, 2.0);
                assert_eq!(daily.get(SLEEP_TITLE).unwrap().hours, 8.0);
                assert_eq!(daily.get(MEAL_TITLE).unwrap().hours, 2.0);
            }
            for day in planner.projection() {
                assert_eq!(day.segment("Study").unwrap().value, 2.0);
                assert_eq!(day.segment(FREE_TIME_LABEL).unwrap().value, 12.0);
            }
            assert_eq!(stored_hours(&db, &study), 14.0);
        }

        it "persists only task rows, never sleep or meals" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            let rows = db.list_schedule_rows().unwrap();
            assert_eq!(rows.len(), 7);
        }

        it "attaches stored row ids to the local schedule" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            let rows = db.list_schedule_rows().unwrap();
            let monday = planner.schedule().unwrap().day(Weekday::Monday);
            let entry = monday.get("Study").unwrap();
            assert!(rows.iter().any(|r| Some(r.id) == entry.row_id && r.day == Weekday::Monday));
        }

        it "keeps short task hours whole" {
            let stretch = add(&db, CreateTaskInput::short("Stretch", 3.0));
            let schedule = block_on(planner.distribute()).expect("Distribute failed");

            assert!((schedule.task_hours(stretch.id) - 3.0).abs() < 1e-9);
            assert!((stored_hours(&db, &stretch) - 3.0).abs() < 1e-9);
        }

        it "does not double-count across repeated runs" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("First run failed");
            block_on(planner.distribute()).expect("Second run failed");

            assert_eq!(stored_hours(&db, &study), 14.0);
        }

        it "refuses an over-committed week and changes nothing" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let before = block_on(planner.distribute()).expect("Distribute failed");
            let rows_before = db.list_schedule_rows().unwrap();

            add(&db, CreateTaskInput::long("Work", 100.0, 5));
            add(&db, CreateTaskInput::long("Side project", 56.0, 7));

            match block_on(planner.distribute()) {
                Err(PlanError::Capacity { committed, available }) => {
                    assert_eq!(committed, 170.0);
                    assert_eq!(available, 98.0);
                }
                other => panic!("expected capacity error, got {:?}", other),
            }
            assert_eq!(planner.schedule(), Some(&before));
            assert_eq!(db.list_schedule_rows().unwrap(), rows_before);
        }

        it "ignores finished tasks" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let old = add(&db, CreateTaskInput::long("Old habit", 90.0, 7));
            db.soft_delete_task(old.id).unwrap();

            let schedule = block_on(planner.distribute()).expect("Distribute failed");
            assert_eq!(schedule.task_hours(study.id), 14.0);
            assert_eq!(schedule.task_hours(old.id), 0.0);
        }

        it "keeps the local schedule when the store write fails" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let mut offline = Planner::new(OfflineWrites(db.clone()), Budgets::default()).with_seed(3);

            let err = block_on(offline.distribute()).unwrap_err();
            assert!(matches!(err, PlanError::Transport(_)));
            assert!(offline.schedule().is_some());
            assert_eq!(offline.projection().len(), 7);
            assert!(db.list_schedule_rows().unwrap().is_empty());
        }
    }

    describe "move_task" {
        it "round trips hours between two days" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            block_on(planner.move_task(study.id, Weekday::Monday, Weekday::Tuesday, 1.5))
                .expect("Move failed");
            let schedule = planner.schedule().unwrap();
            assert_eq!(schedule.day(Weekday::Monday).get("Study").unwrap().hours, 0.5);
            assert_eq!(schedule.day(Weekday::Tuesday).get("Study").unwrap().hours, 3.5);

            block_on(planner.move_task(study.id, Weekday::Tuesday, Weekday::Monday, 1.5))
                .expect("Move back failed");
            let schedule = planner.schedule().unwrap();
            assert_eq!(schedule.day(Weekday::Monday).get("Study").unwrap().hours, 2.0);
            assert_eq!(schedule.day(Weekday::Tuesday).get("Study").unwrap().hours, 2.0);
            assert_eq!(stored_hours(&db, &study), 14.0);
        }

        it "mirrors the move into the projection" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            block_on(planner.move_task(study.id, Weekday::Friday, Weekday::Saturday, 2.0))
                .expect("Move failed");

            let projection = planner.projection();
            let friday = &projection[Weekday::Friday.index()];
            let saturday = &projection[Weekday::Saturday.index()];
            assert!(friday.segment("Study").is_none());
            assert_eq!(friday.free_time(), Some(14.0));
            assert_eq!(saturday.segment("Study").unwrap().value, 4.0);
            assert_eq!(saturday.free_time(), Some(10.0));
            assert_eq!(saturday.segment("Study").unwrap().color, PALETTE[0]);
        }

        it "reports a missing entry without changing anything" {
            let read = add(&db, CreateTaskInput::long("Read", 2.0, 1));
            let schedule = block_on(planner.distribute()).expect("Distribute failed");
            let day = schedule.task_days(read.id)[0];
            let other = Weekday::ALL.into_iter().find(|d| *d != day).unwrap();
            let elsewhere = Weekday::ALL.into_iter().find(|d| *d != day && *d != other).unwrap();

            let err = block_on(planner.move_task(read.id, other, elsewhere, 1.0)).unwrap_err();
            assert!(matches!(err, PlanError::NotFound(_)));
            assert_eq!(planner.schedule(), Some(&schedule));
        }

        it "rejects moving more than is there" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            let err = block_on(planner.move_task(study.id, Weekday::Monday, Weekday::Tuesday, 5.0))
                .unwrap_err();
            assert!(matches!(err, PlanError::InvalidMove(_)));
            assert_eq!(stored_hours(&db, &study), 14.0);
        }

        it "needs a schedule first" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let err = block_on(planner.move_task(study.id, Weekday::Monday, Weekday::Tuesday, 1.0))
                .unwrap_err();
            assert!(matches!(err, PlanError::NotFound(_)));
        }
    }

    describe "completion" {
        it "marks today's entry and re-reads the schedule" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            block_on(planner.set_completion("Study", Weekday::Monday, true))
                .expect("Completion failed");

            let monday = &planner.projection()[0];
            assert_eq!(monday.segment("Study").unwrap().color, COMPLETED_COLOR);
            assert!(planner.schedule().unwrap().day(Weekday::Monday).get("Study").unwrap().completed);
            assert_eq!(planner.colors().get("Study"), Some(PALETTE[0]));

            let rows = db.list_schedule_rows().unwrap();
            assert_eq!(rows.iter().filter(|r| r.completed).count(), 1);
        }

        it "toggles back and forth" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            assert!(block_on(planner.toggle_completion("Study", Weekday::Monday)).unwrap());
            assert!(!block_on(planner.toggle_completion("Study", Weekday::Monday)).unwrap());
            assert!(db.list_schedule_rows().unwrap().iter().all(|r| !r.completed));
        }

        it "only accepts today" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            let err = block_on(planner.set_completion("Study", Weekday::Tuesday, true)).unwrap_err();
            assert!(matches!(
                err,
                PlanError::NotToday { day: Weekday::Tuesday, today: Weekday::Monday }
            ));
        }

        it "is a reported no-op for unknown entries" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            let err = block_on(planner.set_completion("Nap", Weekday::Monday, true)).unwrap_err();
            assert!(matches!(err, PlanError::NotFound(_)));
            assert!(db.list_schedule_rows().unwrap().iter().all(|r| !r.completed));
        }
    }

    describe "reload_schedule" {
        it "rebuilds the week from stored rows" {
            let study = add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let distributed = block_on(planner.distribute()).expect("Distribute failed");

            let mut fresh = Planner::new(db.clone(), Budgets::default());
            let reloaded = block_on(fresh.reload_schedule()).expect("Reload failed").clone();

            assert_eq!(reloaded.task_hours(study.id), distributed.task_hours(study.id));
            assert_eq!(reloaded.task_days(study.id).len(), 7);
            assert_eq!(reloaded.day(Weekday::Sunday).get(SLEEP_TITLE).unwrap().hours, 8.0);
        }
    }

    describe "set_budgets" {
        it "re-projects with the new budgets" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            planner.set_budgets(Budgets::new(9.0, 2.0).unwrap()).expect("Budget change failed");

            for day in planner.projection() {
                assert_eq!(day.segment(SLEEP_TITLE).unwrap().value, 9.0);
                assert_eq!(day.free_time(), Some(11.0));
            }
        }

        it "keeps the reserved entries the schedule was generated with" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            block_on(planner.distribute()).expect("Distribute failed");

            planner.set_budgets(Budgets::new(9.0, 2.0).unwrap()).expect("Budget change failed");

            let schedule = planner.schedule().unwrap();
            for day in Weekday::ALL {
                assert_eq!(schedule.day(day).get(SLEEP_TITLE).unwrap().hours, 8.0);
                assert_eq!(schedule.day(day).get(MEAL_TITLE).unwrap().hours, 2.0);
            }
            assert_eq!(planner.projection()[0].segment(SLEEP_TITLE).unwrap().value, 9.0);
        }

        it "rejects impossible budgets" {
            let err = planner
                .set_budgets(Budgets { sleep_hours: 20.0, meal_hours: 5.0 })
                .unwrap_err();
            assert!(matches!(err, PlanError::InvalidBudget(_)));
            assert_eq!(planner.budgets(), Budgets::default());
        }
    }

    describe "shared planner" {
        it "rejects an operation while another is in flight" {
            add(&db, CreateTaskInput::long("Study", 14.0, 7));
            let shared = SharedPlanner::new(planner);

            block_on(async {
                let guard = shared.lock().await;
                let err = shared.distribute().await.unwrap_err();
                assert!(matches!(err, PlanError::Busy));
                drop(guard);

                shared.distribute().await.expect("Distribute failed");
                assert_eq!(shared.projection().unwrap().len(), 7);
            });
        }
    }
}
