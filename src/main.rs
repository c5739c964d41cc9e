use clap::Parser;
use edit_stats::config::Cli;
use edit_stats::{EditSource, LogFileSource, PostgresSource, export_all};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if std::path::Path::new(".env").exists() {
        dotenvy::dotenv()?;
    }
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match &cli.input {
        Some(path) => {
            let source = LogFileSource::new(path).columns(&cli.input_user_column, &cli.input_timestamp_column);
            run(&cli, &source).await
        }
        None => {
            let source = PostgresSource::new(edit_stats::db::pool(&cli.database_url)?, cli.edit_table())?;
            run(&cli, &source).await
        }
    }
}

async fn run(cli: &Cli, source: &impl EditSource) -> anyhow::Result<()> {
    export_all(source, &cli.exports()).await?;
    Ok(())
}

fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_new(filter)?).with_target(false).init();
    Ok(())
}
