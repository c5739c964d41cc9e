//! Monthly active user and edit counts exported from an edit log.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use edit_stats::{EditTable, ExportQuery, Metric, PostgresSource, export};
//!
//! let source = PostgresSource::new(edit_stats::db::pool("postgresql://localhost:5432/wiki")?, EditTable::default())?;
//! export(&source, &ExportQuery::new(Metric::ActiveUsers), "monthly_active_users.csv".as_ref()).await?;
//! # Ok(())
//! # }
//! ```

mod aggregate;
pub mod config;
pub mod db;
mod export;
mod model;
mod source;

pub use aggregate::{MonthlyTotals, aggregate};
pub use export::{ExportSummary, export, export_all, write_csv};
pub use model::{EditRecord, ExportQuery, Metric, MonthKey, MonthlyCount, NullTimestamps};
pub use source::{EditSource, EditTable, LogFileSource, PostgresSource};
