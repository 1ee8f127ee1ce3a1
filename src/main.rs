use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weekplan::api::{self, ApiAuth};
use weekplan::client::StoreClient;
use weekplan::config::PlannerConfig;
use weekplan::db::Database;
use weekplan::models::*;
use weekplan::planner::Planner;
use weekplan::render;
use weekplan::store::ScheduleStore;

#[derive(Parser)]
#[command(name = "wkpl")]
#[command(about = "Spread weekly task budgets across the days of the week")]
struct Cli {
    /// Hours of sleep per day (overrides config)
    #[arg(long, global = true)]
    sleep: Option<f64>,

    /// Hours of meals per day (overrides config)
    #[arg(long, global = true)]
    meal: Option<f64>,

    /// Use the local database instead of a remote store
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the store server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "17020")]
        port: u16,
    },
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Allocate all active tasks over a fresh week
    Distribute,
    /// Show the current week
    Show,
    /// Move hours of a task from one day to another
    Move {
        title: String,
        from: String,
        to: String,
        hours: f64,
    },
    /// Mark today's entry for a task complete
    Complete {
        title: String,
        /// Mark incomplete instead
        #[arg(long)]
        undo: bool,
    },
    /// Show completion per day
    Progress,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// Include finished tasks
        #[arg(long)]
        all: bool,
    },
    /// Add a task
    Add {
        title: String,
        /// Hours per week
        hours: f64,
        /// Number of days to spread a long task over
        #[arg(short, long)]
        days: Option<u8>,
        /// Place in random short bursts instead of an even split
        #[arg(long)]
        short: bool,
    },
    /// Change a task
    Edit {
        title: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(short, long)]
        days: Option<u8>,
        #[arg(long)]
        short: Option<bool>,
    },
    /// Delete a task and its schedule rows
    Delete { title: String },
    /// Retire a task, keeping its history
    Finish { title: String },
}

/// Initialize tracing with output to stderr (for CLI commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "weekplan=info,tower_http=info".into()),
    );

    if use_stderr {
        // Keep stdout clean for rendered output
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database() -> anyhow::Result<Database> {
    let db = Database::open_default()?;
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    let config = PlannerConfig::load();

    if let Commands::Serve { port } = cli.command {
        tracing::info!("Starting weekplan store on port {}", port);

        let app = api::create_router_with_auth(open_database()?, ApiAuth::from_env());

        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
        tracing::info!("weekplan store listening on http://127.0.0.1:{}", port);

        axum::serve(listener, app).await?;
        return Ok(());
    }

    let budgets = Budgets::new(
        cli.sleep.unwrap_or(config.sleep_hours),
        cli.meal.unwrap_or(config.meal_hours),
    )?;

    if cli.local {
        run_command(open_database()?, budgets, cli.command).await
    } else {
        let client = StoreClient::from_config(&config)?;
        tracing::debug!("Using store at {}", client.base_url());
        run_command(client, budgets, cli.command).await
    }
}

async fn run_command<S: ScheduleStore>(
    store: S,
    budgets: Budgets,
    command: Commands,
) -> anyhow::Result<()> {
    let mut planner = Planner::new(store, budgets);

    match command {
        Commands::Serve { .. } => anyhow::bail!("serve does not run against a planner store"),
        Commands::Tasks { command } => run_task_command(&mut planner, command).await?,
        Commands::Distribute => {
            planner.distribute().await?;
            print!("{}", render::render_week(planner.projection(), Some(planner.today())));
        }
        Commands::Show => {
            planner.reload_schedule().await?;
            print!("{}", render::render_week(planner.projection(), Some(planner.today())));
        }
        Commands::Move {
            title,
            from,
            to,
            hours,
        } => {
            let from = Weekday::parse(&from)?;
            let to = Weekday::parse(&to)?;
            planner.reload_schedule().await?;
            let task_id = planner
                .task_by_title(&title)
                .map(|t| t.id)
                .with_context(|| format!("No task titled '{}'", title))?;
            planner.move_task(task_id, from, to, hours).await?;
            println!("Moved {} of '{}' from {} to {}", render::format_hours(hours), title, from, to);
        }
        Commands::Complete { title, undo } => {
            let today = planner.today();
            planner.set_completion(&title, today, !undo).await?;
            let state = if undo { "incomplete" } else { "complete" };
            println!("'{}' marked {} for {}", title, state, today);
        }
        Commands::Progress => {
            let progress = planner.store().weekly_progress().await?;
            print!("{}", render::render_progress(&progress));
        }
    }

    Ok(())
}

async fn run_task_command<S: ScheduleStore>(
    planner: &mut Planner<S>,
    command: TaskCommands,
) -> anyhow::Result<()> {
    match command {
        TaskCommands::List { all } => {
            let tasks = planner.store().list_tasks(all).await?;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                let placement = match task.kind() {
                    TaskKind::Long => format!("over {} days", task.spread_days),
                    TaskKind::Short => "in short bursts".to_string(),
                };
                let finished = if task.is_deleted { " (finished)" } else { "" };
                println!(
                    "{}: {} per week {}{}",
                    task.title,
                    render::format_hours(task.duration_hours),
                    placement,
                    finished
                );
            }
        }
        TaskCommands::Add {
            title,
            hours,
            days,
            short,
        } => {
            let input = CreateTaskInput {
                title,
                duration_hours: hours,
                spread_days: days,
                is_short_task: short,
            };
            let task = planner.store().create_task(&input).await?;
            println!("Added '{}' ({})", task.title, task.id);
        }
        TaskCommands::Edit {
            title,
            rename,
            hours,
            days,
            short,
        } => {
            let id = find_task(planner, &title).await?;
            let input = UpdateTaskInput {
                title: rename,
                duration_hours: hours,
                spread_days: days,
                is_short_task: short,
            };
            let task = planner.store().update_task(id, &input).await?;
            println!("Updated '{}'", task.title);
        }
        TaskCommands::Delete { title } => {
            let id = find_task(planner, &title).await?;
            planner.store().delete_task(id).await?;
            println!("Deleted '{}'", title);
        }
        TaskCommands::Finish { title } => {
            let id = find_task(planner, &title).await?;
            planner.store().soft_delete_task(id).await?;
            println!("Finished '{}'", title);
        }
    }

    Ok(())
}

async fn find_task<S: ScheduleStore>(
    planner: &mut Planner<S>,
    title: &str,
) -> anyhow::Result<uuid::Uuid> {
    planner.refresh_tasks().await?;
    planner
        .task_by_title(title)
        .map(|t| t.id)
        .with_context(|| format!("No task titled '{}'", title))
}
