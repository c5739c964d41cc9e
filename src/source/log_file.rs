use super::EditSource;
use crate::aggregate::MonthlyTotals;
use crate::model::{EditRecord, ExportQuery, MonthlyCount};
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Streams a comma-delimited edit dump with a header row.
///
/// The user and timestamp columns are found by name (`editor` and `date_time` unless configured),
/// other columns are ignored. Quoted fields may span lines. Empty, `NULL` and `None` timestamps are
/// nulls; anything else that doesn't parse fails the whole read.
#[derive(Clone, Debug)]
pub struct LogFileSource {
    path: PathBuf,
    user_column: String,
    timestamp_column: String,
}

impl LogFileSource {
    pub const DEFAULT_USER_COLUMN: &'static str = "editor";
    pub const DEFAULT_TIMESTAMP_COLUMN: &'static str = "date_time";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user_column: Self::DEFAULT_USER_COLUMN.to_string(),
            timestamp_column: Self::DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }

    pub fn columns(mut self, user_column: &str, timestamp_column: &str) -> Self {
        self.user_column = user_column.to_string();
        self.timestamp_column = timestamp_column.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses an in-memory dump.
    pub async fn parse(&self, contents: &str) -> anyhow::Result<Vec<EditRecord>> {
        let mut records = Vec::new();
        self.read_records(contents.as_bytes(), |record| records.push(record)).await?;
        Ok(records)
    }

    /// Calls `on_record` for every record in `reader`, one record at a time.
    pub async fn read_records<R: AsyncBufRead + Unpin>(&self, reader: R, mut on_record: impl FnMut(EditRecord)) -> anyhow::Result<()> {
        let mut lines = reader.lines();
        let mut splitter = RecordSplitter::default();
        let mut columns = None;
        let (mut line_number, mut record_line) = (0, 0);
        while let Some(raw) = lines.next_line().await? {
            line_number += 1;
            let mut line = raw.strip_suffix('\r').unwrap_or(raw.as_str());
            if line_number == 1 {
                line = line.strip_prefix('\u{feff}').unwrap_or(line);
            }
            if !splitter.in_progress() {
                if line.trim().is_empty() {
                    continue;
                }
                record_line = line_number;
            }
            let Some(fields) = splitter.feed(line) else {
                continue;
            };
            let Some((user_index, timestamp_index)) = columns else {
                let position = |name: &str| fields.iter().position(|h| h.trim() == name).with_context(|| format!("missing column {name:?}"));
                columns = Some((position(&self.user_column)?, position(&self.timestamp_column)?));
                continue;
            };
            let field = |i: usize| fields.get(i).map(|f| f.trim()).with_context(|| format!("line {record_line}: too few fields"));
            let user = field(user_index)?;
            let user_id = user.parse::<i64>().with_context(|| format!("line {record_line}: malformed user id {user:?}"))?;
            let edited_at = parse_timestamp(field(timestamp_index)?).with_context(|| format!("line {record_line}"))?;
            on_record(EditRecord { user_id, edited_at });
        }
        if splitter.in_progress() {
            anyhow::bail!("line {record_line}: unterminated quoted field");
        }
        if columns.is_none() {
            anyhow::bail!("missing header row");
        }
        Ok(())
    }

    async fn open(&self) -> anyhow::Result<BufReader<tokio::fs::File>> {
        let file = tokio::fs::File::open(&self.path).await.with_context(|| format!("reading {}", self.path.display()))?;
        Ok(BufReader::new(file))
    }
}

impl EditSource for LogFileSource {
    async fn monthly_counts(&self, query: &ExportQuery) -> anyhow::Result<Vec<MonthlyCount>> {
        let mut results = self.monthly_counts_many(std::slice::from_ref(query)).await?;
        Ok(results.remove(0))
    }

    async fn monthly_counts_many(&self, queries: &[ExportQuery]) -> anyhow::Result<Vec<Vec<MonthlyCount>>> {
        let mut totals: Vec<_> = queries.iter().cloned().map(MonthlyTotals::new).collect();
        self.read_records(self.open().await?, |record| totals.iter_mut().for_each(|t| t.push(&record)))
            .await
            .with_context(|| format!("parsing {}", self.path.display()))?;
        totals.into_iter().map(MonthlyTotals::finish).collect()
    }
}

fn parse_timestamp(value: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value == "None" {
        return Ok(None);
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(Some(time.and_utc()));
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(time) => Ok(Some(time.with_timezone(&Utc))),
        Err(_) => anyhow::bail!("malformed timestamp {value:?}"),
    }
}

/// Splits records into fields, honoring double-quoted fields with `""` escapes. A quoted field
/// left open at the end of a line continues on the next one.
#[derive(Default)]
struct RecordSplitter {
    fields: Vec<String>,
    field: String,
    quoted: bool,
}

impl RecordSplitter {
    fn in_progress(&self) -> bool {
        self.quoted
    }

    /// Returns the record's fields once `line` completes it.
    fn feed(&mut self, line: &str) -> Option<Vec<String>> {
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if self.quoted && chars.peek() == Some(&'"') => {
                    self.field.push('"');
                    chars.next();
                }
                '"' => self.quoted = !self.quoted,
                ',' if !self.quoted => self.fields.push(std::mem::take(&mut self.field)),
                _ => self.field.push(c),
            }
        }
        if self.quoted {
            self.field.push('\n');
            return None;
        }
        self.fields.push(std::mem::take(&mut self.field));
        Some(std::mem::take(&mut self.fields))
    }
}
