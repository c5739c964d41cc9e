use super::EditSource;
use crate::model::{ExportQuery, Metric, MonthlyCount, NullTimestamps};
use anyhow::Context;
use futures::TryStreamExt;
use tokio_postgres::IsolationLevel;

/// Location of the edit log inside the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTable {
    pub table: String,
    pub user_column: String,
    pub timestamp_column: String,
}

impl Default for EditTable {
    fn default() -> Self {
        Self { table: "edits".to_string(), user_column: "user_id".to_string(), timestamp_column: "edit_time".to_string() }
    }
}

impl EditTable {
    /// Checks that the names are plain SQL identifiers, since they're interpolated into queries.
    pub fn validate(&self) -> anyhow::Result<()> {
        let (schema, table) = match self.table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, self.table.as_str()),
        };
        for name in schema.into_iter().chain([table, self.user_column.as_str(), self.timestamp_column.as_str()]) {
            if !is_identifier(name) {
                anyhow::bail!("invalid SQL identifier {name:?}");
            }
        }
        Ok(())
    }

    pub fn monthly_sql(&self, metric: Metric) -> String {
        let Self { table, user_column, timestamp_column } = self;
        let value = match metric {
            Metric::ActiveUsers => format!("count(DISTINCT {user_column})"),
            Metric::Edits => "count(*)".to_string(),
        };
        format!(
            "SELECT EXTRACT(MONTH FROM {timestamp_column})::int4 AS month, EXTRACT(YEAR FROM {timestamp_column})::int4 AS year, {value} AS {}
            FROM {table}
            WHERE {timestamp_column} IS NOT NULL AND {user_column}::int8 <> ALL($1::int8[])
            GROUP BY 2, 1
            ORDER BY 2, 1",
            metric.column()
        )
    }

    pub fn null_count_sql(&self) -> String {
        let Self { table, user_column, timestamp_column } = self;
        format!("SELECT count(*) FROM {table} WHERE {timestamp_column} IS NULL AND {user_column}::int8 <> ALL($1::int8[])")
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reads the edit log from Postgres, grouping server-side.
pub struct PostgresSource {
    pool: deadpool_postgres::Pool,
    table: EditTable,
}

impl PostgresSource {
    pub fn new(pool: deadpool_postgres::Pool, table: EditTable) -> anyhow::Result<Self> {
        table.validate()?;
        Ok(Self { pool, table })
    }
}

impl EditSource for PostgresSource {
    async fn monthly_counts(&self, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>> {
        let mut db = self.pool.get().await.context("connecting to the database")?;
        // One snapshot for the null check and the aggregate
        let tx = db.build_transaction().isolation_level(IsolationLevel::RepeatableRead).read_only(true).start().await?;
        if query.null_timestamps == NullTimestamps::Reject {
            let sql = self.table.null_count_sql();
            let nulls: i64 = tx.query_one(&tx.prepare_cached(&sql).await?, &[&query.excluded]).await?.get(0);
            if nulls > 0 {
                anyhow::bail!("{nulls} edit records have a null timestamp");
            }
        }

        let sql = self.table.monthly_sql(query.metric);
        tracing::debug!(%sql, excluded = ?query.excluded, "querying monthly {}", query.metric);
        let stmt = tx.prepare_cached(&sql).await?;
        let mut results = Vec::new();
        {
            let rows = tx.query_raw(&stmt, [&query.excluded]).await?;
            futures::pin_mut!(rows);
            while let Some(row) = rows.try_next().await? {
                let month: i32 = row.get(0);
                results.push(MonthlyCount { month: u32::try_from(month)?, year: row.get(1), value: row.get(2) });
            }
        }
        tx.commit().await?;
        Ok(results)
    }
}
