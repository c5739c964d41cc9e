use anyhow::Context;
use std::str::FromStr;

/// Builds a connection pool for `url`.
///
/// Sessions run in UTC so that month boundaries don't depend on the server's time zone.
pub fn pool(url: &str) -> anyhow::Result<deadpool_postgres::Pool> {
    let mut pg_config = tokio_postgres::Config::from_str(url).context("parsing database url")?;
    pg_config.options("-c TimeZone=UTC");
    let mgr_config = deadpool_postgres::ManagerConfig { recycling_method: deadpool_postgres::RecyclingMethod::Fast };
    let mgr = deadpool_postgres::Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
    Ok(deadpool_postgres::Pool::builder(mgr).build()?)
}
