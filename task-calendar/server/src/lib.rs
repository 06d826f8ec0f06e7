pub mod config {
    use serde::Deserialize;
    use std::time::Duration;

    use crate::store::StoreConfig;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub database_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_db_connect_attempts")]
        pub db_connect_attempts: u32,
        #[serde(default = "default_db_retry_delay_ms")]
        pub db_retry_delay_ms: u64,
        #[serde(default = "default_db_max_connections")]
        pub db_max_connections: u32,
        #[serde(default = "default_db_acquire_timeout_ms")]
        pub db_acquire_timeout_ms: u64,
        #[serde(default = "default_cors_origins")]
        pub cors_origins: Vec<String>,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::load(environment())
        }

        /// Loads configuration from an explicit set of environment-style variables.
        pub fn from_vars(vars: config::Map<String, String>) -> anyhow::Result<Self> {
            Self::load(environment().source(Some(vars)))
        }

        fn load(source: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Connection settings for the task store.
        pub fn store_config(&self) -> StoreConfig {
            StoreConfig {
                url: self.database_url.clone(),
                max_connections: self.db_max_connections,
                acquire_timeout: Duration::from_millis(self.db_acquire_timeout_ms),
                retry_delay: Duration::from_millis(self.db_retry_delay_ms),
            }
        }
    }

    fn environment() -> config::Environment {
        config::Environment::default()
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors_origins")
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_db_connect_attempts() -> u32 {
        crate::store::DEFAULT_READY_ATTEMPTS
    }

    fn default_db_retry_delay_ms() -> u64 {
        1000
    }

    fn default_db_max_connections() -> u32 {
        10
    }

    fn default_db_acquire_timeout_ms() -> u64 {
        5000
    }

    fn default_cors_origins() -> Vec<String> {
        vec![
            "http://localhost:8080".to_string(),
            "http://localhost:3000".to_string(),
        ]
    }

}
pub mod entities;
pub mod retry;
pub mod store;
pub mod task;
pub mod web;
