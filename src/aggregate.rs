use crate::model::{EditRecord, ExportQuery, Metric, MonthKey, MonthlyCount, NullTimestamps};
use ahash::{AHashMap, AHashSet};

/// Groups records by calendar month and computes the query's metric for each month.
///
/// Records from excluded users are dropped before anything else, so their null timestamps never
/// trigger [NullTimestamps::Reject]. The result has one row per month, sorted by year then month.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a EditRecord>, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>> {
    let mut totals = MonthlyTotals::new(query.clone());
    for record in records {
        totals.push(record);
    }
    totals.finish()
}

#[derive(Default)]
struct Month {
    edits: i64,
    users: AHashSet<i64>,
}

/// Incremental form of [aggregate], for sources that stream their records.
///
/// Only [Metric::ActiveUsers] keeps the user ids seen each month; edits are plain counters.
pub struct MonthlyTotals {
    query: ExportQuery,
    months: AHashMap<MonthKey, Month>,
    nulls: u64,
}

impl MonthlyTotals {
    pub fn new(query: ExportQuery) -> Self {
        Self { query, months: AHashMap::new(), nulls: 0 }
    }

    pub fn push(&mut self, record: &EditRecord) {
        if self.query.is_excluded(record.user_id) {
            return;
        }
        let Some(edited_at) = record.edited_at else {
            self.nulls += 1;
            return;
        };
        let month = self.months.entry(MonthKey::of(edited_at)).or_default();
        match self.query.metric {
            Metric::ActiveUsers => {
                month.users.insert(record.user_id);
            }
            Metric::Edits => month.edits += 1,
        }
    }

    pub fn finish(self) -> anyhow::Result<Vec<MonthlyCount>> {
        let nulls = self.nulls;
        if nulls > 0 {
            match self.query.null_timestamps {
                NullTimestamps::Skip => tracing::debug!(nulls, "skipped edit records with a null timestamp"),
                NullTimestamps::Reject => anyhow::bail!("{nulls} edit records have a null timestamp"),
            }
        }
        let metric = self.query.metric;
        let mut results: Vec<MonthlyCount> = self
            .months
            .into_iter()
            .map(|(key, month)| {
                let value = match metric {
                    Metric::ActiveUsers => month.users.len() as i64,
                    Metric::Edits => month.edits,
                };
                MonthlyCount { month: key.month, year: key.year, value }
            })
            .collect();
        results.sort_by_key(|row| row.key());
        Ok(results)
    }
}
