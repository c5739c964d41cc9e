use crate::model::{ExportQuery, Metric, MonthlyCount};
use crate::source::EditSource;
use anyhow::Context;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// What a completed export wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub metric: Metric,
    pub path: PathBuf,
    pub groups: usize,
    pub total: i64,
}

/// Writes `month,year,<metric>` followed by one line per row.
pub fn write_csv(rows: &[MonthlyCount], metric: Metric, mut writer: impl Write) -> std::io::Result<()> {
    writeln!(writer, "month,year,{}", metric.column())?;
    for MonthlyCount { month, year, value } in rows {
        writeln!(writer, "{month},{year},{value}")?;
    }
    writer.flush()
}

/// Runs the query against `source` and writes the result to `path`.
///
/// The file is first written next to the destination and renamed into place once complete, so a
/// failed export never leaves a truncated file behind.
pub async fn export<S: EditSource + ?Sized>(source: &S, query: &ExportQuery, path: &Path) -> anyhow::Result<ExportSummary> {
    let rows = source.monthly_counts(query).await.with_context(|| format!("querying monthly {}", query.metric))?;
    write_rows(rows, query.metric, path.to_path_buf()).await
}

/// Like [export] for several queries, letting the source answer all of them together.
///
/// Nothing is written unless every query succeeds.
pub async fn export_all<S: EditSource + ?Sized>(source: &S, exports: &[(ExportQuery, PathBuf)]) -> anyhow::Result<Vec<ExportSummary>> {
    let queries: Vec<ExportQuery> = exports.iter().map(|(query, _)| query.clone()).collect();
    let metrics = queries.iter().map(|q| q.metric.column()).collect::<Vec<_>>().join(", ");
    let results = source.monthly_counts_many(&queries).await.with_context(|| format!("querying monthly {metrics}"))?;
    let mut summaries = Vec::with_capacity(exports.len());
    for ((query, path), rows) in exports.iter().zip(results) {
        summaries.push(write_rows(rows, query.metric, path.clone()).await?);
    }
    Ok(summaries)
}

async fn write_rows(rows: Vec<MonthlyCount>, metric: Metric, path: PathBuf) -> anyhow::Result<ExportSummary> {
    let summary = ExportSummary { metric, path, groups: rows.len(), total: rows.iter().map(|r| r.value).sum() };
    let path = summary.path.clone();
    tokio::task::spawn_blocking(move || write_file(&rows, metric, &path)).await??;
    tracing::info!(metric = %summary.metric, path = %summary.path.display(), groups = summary.groups, total = summary.total, "exported");
    Ok(summary)
}

fn write_file(rows: &[MonthlyCount], metric: Metric, path: &Path) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let result = fs::File::create(&tmp)
        .and_then(|file| write_csv(rows, metric, BufWriter::new(&file)).and_then(|_| file.sync_all()))
        .with_context(|| format!("writing {}", tmp.display()))
        .and_then(|_| fs::rename(&tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display())));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
