use chrono::{DateTime, Datelike, Utc};
use std::fmt;

/// A single logged edit. `edited_at` is `None` when the source column is NULL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditRecord {
    pub user_id: i64,
    pub edited_at: Option<DateTime<Utc>>,
}

impl EditRecord {
    pub fn new(user_id: i64, edited_at: DateTime<Utc>) -> Self {
        Self { user_id, edited_at: Some(edited_at) }
    }
}

/// Calendar month bucket, ordered by year then month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(time: DateTime<Utc>) -> Self {
        Self { year: time.year(), month: time.month() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Distinct users with at least one edit in the month.
    ActiveUsers,
    /// All edits in the month.
    Edits,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::ActiveUsers, Metric::Edits];

    pub fn column(self) -> &'static str {
        match self {
            Metric::ActiveUsers => "active_users",
            Metric::Edits => "edits",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Metric::ActiveUsers => "monthly_active_users.csv",
            Metric::Edits => "monthly_edits.csv",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NullTimestamps {
    #[default]
    Skip,
    Reject,
}

/// One output row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: u32,
    pub year: i32,
    pub value: i64,
}

impl MonthlyCount {
    pub fn key(&self) -> MonthKey {
        MonthKey { year: self.year, month: self.month }
    }
}

/// What to compute, and which users to leave out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportQuery {
    pub metric: Metric,
    pub excluded: Vec<i64>,
    pub null_timestamps: NullTimestamps,
}

impl ExportQuery {
    pub const DEFAULT_EXCLUDED: [i64; 2] = [0, 48];

    pub fn new(metric: Metric) -> Self {
        Self { metric, excluded: Self::DEFAULT_EXCLUDED.to_vec(), null_timestamps: NullTimestamps::default() }
    }

    pub fn excluding(mut self, excluded: &[i64]) -> Self {
        self.excluded = excluded.to_vec();
        self
    }

    pub fn null_timestamps(mut self, policy: NullTimestamps) -> Self {
        self.null_timestamps = policy;
        self
    }

    pub fn is_excluded(&self, user_id: i64) -> bool {
        self.excluded.contains(&user_id)
    }
}
