pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod scheduler;

pub use error::{Result, SchedulerError};
pub use models::{
    CardId, CatalogCard, DueReminder, LevelCap, ReviewHorizon, ReviewRecord, ReviewSession,
    SweepReport, ThemeProgress, ThemeSnapshot, UserId,
};
pub use scheduler::Scheduler;
