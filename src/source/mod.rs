use crate::aggregate::aggregate;
use crate::model::{EditRecord, ExportQuery, MonthlyCount};

mod log_file;
mod postgres;

pub use log_file::LogFileSource;
pub use postgres::{EditTable, PostgresSource};

/// Anything that can produce monthly counts for an [ExportQuery].
///
/// Database-backed sources push the grouping down into SQL; in-memory and file sources group
/// records with [aggregate].
#[allow(async_fn_in_trait)]
pub trait EditSource {
    async fn monthly_counts(&self, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>>;

    /// Runs several queries, returning results in the same order. Sources that scan raw records
    /// override this to read their input once.
    async fn monthly_counts_many(&self, queries: &[ExportQuery]) -> anyhow::Result<Vec<Vec<MonthlyCount>>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.monthly_counts(query).await?);
        }
        Ok(results)
    }
}

impl EditSource for [EditRecord] {
    async fn monthly_counts(&self, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>> {
        aggregate(self, query)
    }
}

impl EditSource for Vec<EditRecord> {
    async fn monthly_counts(&self, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>> {
        aggregate(self, query)
    }
}
