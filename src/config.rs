use crate::model::{ExportQuery, Metric, NullTimestamps};
use crate::source::{EditTable, LogFileSource};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost:5432/postgres";

/// Export monthly active user and edit counts from an edit log.
#[derive(Debug, Parser)]
#[command(name = "edit-stats", version)]
pub struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Read edits from a CSV dump instead of the database.
    #[arg(long, env = "EDIT_STATS_INPUT")]
    pub input: Option<PathBuf>,

    /// User id column of the `--input` dump.
    #[arg(long, env = "EDIT_STATS_INPUT_USER_COLUMN", default_value = LogFileSource::DEFAULT_USER_COLUMN)]
    pub input_user_column: String,

    /// Timestamp column of the `--input` dump.
    #[arg(long, env = "EDIT_STATS_INPUT_TIMESTAMP_COLUMN", default_value = LogFileSource::DEFAULT_TIMESTAMP_COLUMN)]
    pub input_timestamp_column: String,

    #[arg(long, env = "EDIT_STATS_TABLE", default_value = "edits")]
    pub table: String,

    #[arg(long, env = "EDIT_STATS_USER_COLUMN", default_value = "user_id")]
    pub user_column: String,

    #[arg(long, env = "EDIT_STATS_TIMESTAMP_COLUMN", default_value = "edit_time")]
    pub timestamp_column: String,

    /// User ids left out of every count (system accounts).
    #[arg(long = "exclude", env = "EDIT_STATS_EXCLUDE", value_delimiter = ',', num_args = 1.., default_values_t = ExportQuery::DEFAULT_EXCLUDED)]
    pub excluded: Vec<i64>,

    /// Count every user, including system accounts.
    #[arg(long, conflicts_with = "excluded")]
    pub no_exclude: bool,

    #[arg(long, value_enum, default_value_t = NullPolicy::Skip)]
    pub null_timestamps: NullPolicy,

    #[arg(long, value_enum, default_value_t = MetricArg::All)]
    pub metric: MetricArg,

    #[arg(long, env = "EDIT_STATS_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NullPolicy {
    Skip,
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    ActiveUsers,
    Edits,
    All,
}

impl Cli {
    pub fn edit_table(&self) -> EditTable {
        EditTable { table: self.table.clone(), user_column: self.user_column.clone(), timestamp_column: self.timestamp_column.clone() }
    }

    /// One query per requested metric, each paired with its output path.
    pub fn exports(&self) -> Vec<(ExportQuery, PathBuf)> {
        let metrics: &[Metric] = match self.metric {
            MetricArg::ActiveUsers => &[Metric::ActiveUsers],
            MetricArg::Edits => &[Metric::Edits],
            MetricArg::All => &Metric::ALL,
        };
        let null_timestamps = match self.null_timestamps {
            NullPolicy::Skip => NullTimestamps::Skip,
            NullPolicy::Reject => NullTimestamps::Reject,
        };
        let excluded: &[i64] = if self.no_exclude { &[] } else { &self.excluded };
        metrics
            .iter()
            .map(|&metric| {
                let query = ExportQuery::new(metric).excluding(excluded).null_timestamps(null_timestamps);
                (query, self.out_dir.join(metric.file_name()))
            })
            .collect()
    }
}
