#![allow(dead_code)] // not every test binary uses every helper

use std::time::Duration;

use task_calendar_server::store::{Store, StoreConfig};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn store_config(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<StoreConfig> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let mut config = StoreConfig::new(db_url);
    config.retry_delay = Duration::from_millis(200);
    Ok(config)
}

pub async fn setup_store(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<Store> {
    let store = Store::connect(&store_config(container).await?).await?;
    store.wait_until_ready(10).await?;
    store.ensure_schema().await?;
    Ok(store)
}
