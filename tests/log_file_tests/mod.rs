use super::{row, ymd_hms};
use edit_stats::{EditRecord, EditSource, ExportQuery, LogFileSource, Metric, NullTimestamps, export, export_all};

const DUMP: &str = "\
articleid,editor,namespace,title,date_time,comment
10,5,0,Person:Ann Lee,2020-03-01 10:00:00,first
10,5,0,Person:Ann Lee,2020-03-15 10:00:00,\"/* Sources */ fixed a, b\"
11,5,1,Talk:Ann Lee,2020-03-31 23:59:59,
11,5,1,Talk:Ann Lee,2020-04-02 00:00:00,
12,48,2,User:Bot,2020-04-03 08:30:00,bot
12,5,2,User:Bot,2020-04-30T12:00:00Z,
";

#[tokio::test]
async fn parse() -> anyhow::Result<()> {
    let records = LogFileSource::new("unused.csv").parse(DUMP).await?;
    assert_eq!(records.len(), 6);
    assert_eq!(records[1], EditRecord::new(5, ymd_hms(2020, 3, 15, 10, 0, 0).unwrap()));
    assert_eq!(records[4], EditRecord::new(48, ymd_hms(2020, 4, 3, 8, 30, 0).unwrap()));
    assert_eq!(records[5].edited_at, ymd_hms(2020, 4, 30, 12, 0, 0));

    // Custom column names, and columns in any order
    let source = LogFileSource::new("unused.csv").columns("user_id", "edit_time");
    let records = source.parse("edit_time,namespace,user_id\n2020-01-02 03:04:05,0,7\nNone,1,8\n").await?;
    assert_eq!(records, vec![EditRecord::new(7, ymd_hms(2020, 1, 2, 3, 4, 5).unwrap()), EditRecord { user_id: 8, edited_at: None }]);
    Ok(())
}

#[tokio::test]
async fn multi_line_comments() -> anyhow::Result<()> {
    let source = LogFileSource::new("unused.csv");
    let dump = "editor,date_time,comment\n5,2020-03-01 10:00:00,\"line one\nline two\"\n5,2020-03-02 10:00:00,ok\n";
    let records = source.parse(dump).await?;
    assert_eq!(
        records,
        vec![EditRecord::new(5, ymd_hms(2020, 3, 1, 10, 0, 0).unwrap()), EditRecord::new(5, ymd_hms(2020, 3, 2, 10, 0, 0).unwrap())]
    );

    // Blank lines and quoted commas inside the comment, and errors point at the record's first line
    let dump = "editor,comment,date_time\n5,\"a,\n\n\"\"b\"\"\",2020-03-01 10:00:00\n6,\"x\ny\",03/02/2020\n";
    let err = source.parse(dump).await.unwrap_err();
    assert_eq!(format!("{err:#}"), "line 5: malformed timestamp \"03/02/2020\"");

    let err = source.parse("editor,date_time,comment\n5,2020-03-01 10:00:00,\"never closed\n").await.unwrap_err();
    assert_eq!(err.to_string(), "line 2: unterminated quoted field");
    Ok(())
}

#[tokio::test]
async fn byte_order_mark_and_crlf() -> anyhow::Result<()> {
    let source = LogFileSource::new("unused.csv").columns("user_id", "edit_time");
    let records = source.parse("\u{feff}user_id,edit_time\n5,2020-03-01 10:00:00\n").await?;
    assert_eq!(records, vec![EditRecord::new(5, ymd_hms(2020, 3, 1, 10, 0, 0).unwrap())]);

    let crlf = DUMP.replace('\n', "\r\n");
    let records = LogFileSource::new("unused.csv").parse(&format!("\u{feff}{crlf}")).await?;
    assert_eq!(records, LogFileSource::new("unused.csv").parse(DUMP).await?);

    // A quoted line break written as CRLF still reads as one record
    let records = source.parse("user_id,comment,edit_time\r\n5,\"a\r\nb\",2020-03-01 10:00:00\r\n").await?;
    assert_eq!(records, vec![EditRecord::new(5, ymd_hms(2020, 3, 1, 10, 0, 0).unwrap())]);
    Ok(())
}

#[tokio::test]
async fn parse_errors() {
    let source = LogFileSource::new("unused.csv").columns("user_id", "edit_time");
    let err = source.parse("").await.unwrap_err();
    assert_eq!(err.to_string(), "missing header row");
    let err = source.parse("user,edit_time\n1,2020-01-01 00:00:00\n").await.unwrap_err();
    assert_eq!(err.to_string(), "missing column \"user_id\"");
    let err = source.parse("user_id,edit_time\n1,2020-01-01 00:00:00\n2\n").await.unwrap_err();
    assert_eq!(err.to_string(), "line 3: too few fields");
    let err = source.parse("user_id,edit_time\nbot,2020-01-01 00:00:00\n").await.unwrap_err();
    assert_eq!(err.to_string(), "line 2: malformed user id \"bot\"");
    let err = source.parse("user_id,edit_time\n1,2020-01-01 00:00:00\n\n1,01/02/2020\n").await.unwrap_err();
    assert_eq!(format!("{err:#}"), "line 4: malformed timestamp \"01/02/2020\"");
}

#[tokio::test]
async fn export_from_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("edits_dump.csv");
    std::fs::write(&input, DUMP)?;
    let source = LogFileSource::new(&input);
    assert_eq!(source.path(), input);

    assert_eq!(source.monthly_counts(&ExportQuery::new(Metric::ActiveUsers)).await?, vec![row(3, 2020, 1), row(4, 2020, 1)]);
    let path = dir.path().join(Metric::Edits.file_name());
    export(&source, &ExportQuery::new(Metric::Edits), &path).await?;
    assert_eq!(std::fs::read_to_string(&path)?, "month,year,edits\n3,2020,3\n4,2020,2\n");

    // Null timestamps are skipped or rejected, malformed ones always fail
    std::fs::write(&input, format!("{DUMP}13,6,0,Page,NULL,\n"))?;
    assert_eq!(source.monthly_counts(&ExportQuery::new(Metric::Edits)).await?, vec![row(3, 2020, 3), row(4, 2020, 2)]);
    let query = ExportQuery::new(Metric::Edits).null_timestamps(NullTimestamps::Reject);
    assert!(source.monthly_counts(&query).await.is_err());
    std::fs::write(&input, format!("{DUMP}13,6,0,Page,2020-04-31 00:00:00,\n"))?;
    let err = source.monthly_counts(&ExportQuery::new(Metric::Edits)).await.unwrap_err();
    assert!(format!("{err:#}").ends_with("line 8: malformed timestamp \"2020-04-31 00:00:00\""), "{err:#}");

    let missing = LogFileSource::new(dir.path().join("missing.csv"));
    let err = missing.monthly_counts(&ExportQuery::new(Metric::Edits)).await.unwrap_err();
    assert!(err.to_string().starts_with("reading "), "{err:#}");
    Ok(())
}

// Every requested metric is computed from a single read of the dump.
#[tokio::test]
async fn one_pass_for_all_metrics() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("edits_dump.csv");
    std::fs::write(&input, DUMP)?;
    let source = LogFileSource::new(&input);
    let queries = [ExportQuery::new(Metric::ActiveUsers), ExportQuery::new(Metric::Edits).excluding(&[])];
    let results = source.monthly_counts_many(&queries).await?;
    assert_eq!(results, vec![vec![row(3, 2020, 1), row(4, 2020, 1)], vec![row(3, 2020, 3), row(4, 2020, 3)]]);

    let exports: Vec<_> = Metric::ALL.into_iter().map(|m| (ExportQuery::new(m), dir.path().join(m.file_name()))).collect();
    let summaries = export_all(&source, &exports).await?;
    assert_eq!(summaries.iter().map(|s| (s.metric, s.groups, s.total)).collect::<Vec<_>>(), vec![(Metric::ActiveUsers, 2, 2), (Metric::Edits, 2, 5)]);
    assert_eq!(std::fs::read_to_string(dir.path().join("monthly_edits.csv"))?, "month,year,edits\n3,2020,3\n4,2020,2\n");

    // A bad record fails every query and writes nothing
    std::fs::write(&input, format!("{DUMP}13,x,0,Page,2020-05-01 00:00:00,\n"))?;
    std::fs::remove_file(dir.path().join("monthly_edits.csv"))?;
    let err = export_all(&source, &exports).await.unwrap_err();
    assert_eq!(err.to_string(), "querying monthly active_users, edits");
    assert!(!dir.path().join("monthly_edits.csv").exists());
    Ok(())
}
