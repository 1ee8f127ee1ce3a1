//! Weekly hour-budget planning.
//!
//! Tasks carry a weekly hour budget; [`engine::allocate`] spreads them over
//! the days of a week around fixed sleep and meal allocations, and
//! [`engine::project`] turns the result into per-day segments for display.
//! A [`planner::Planner`] ties the engine to a [`store::ScheduleStore`],
//! either the local SQLite [`db::Database`] or a remote
//! [`client::StoreClient`] talking to the [`api`] server.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod planner;
pub mod render;
pub mod store;
