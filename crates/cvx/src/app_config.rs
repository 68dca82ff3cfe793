//! 🔧 App Configuration — the sacred env-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the
//! fridge. In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Layering: `CVX_`-prefixed environment variables form the base (nested
//! sections via double underscore, e.g. `CVX_CATALOG__HOST`), with an
//! optional TOML file merged on top. TOML wins on conflicts. No file is a
//! perfectly fine way to live — containers do it every day.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🐘 Where the films live.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// 📡 Where the documents land.
    #[serde(default)]
    pub sink: SinkConfig,
    /// 🗄️ Where the watermarks sleep between restarts.
    #[serde(default)]
    pub cursor_store: CursorStoreConfig,
    /// 🔧 Knobs. Configurable, unlike my children.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🐘 Postgres connection parameters for the read-only catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "defaults::catalog_host")]
    pub host: String,
    #[serde(default = "defaults::catalog_port")]
    pub port: u16,
    #[serde(default = "defaults::catalog_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "defaults::catalog_dbname")]
    pub dbname: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            host: defaults::catalog_host(),
            port: defaults::catalog_port(),
            user: defaults::catalog_user(),
            password: String::new(),
            dbname: defaults::catalog_dbname(),
        }
    }
}

/// 📡 Elasticsearch target. Auth is optional; the index is not.
#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    #[serde(default = "defaults::sink_url")]
    pub url: String,
    /// 📦 Target index. Every document in a batch goes here, keyed by film id.
    #[serde(default = "defaults::sink_index")]
    pub index: String,
    /// 🔒 Username. The bouncer at the club. Except the club is a cluster.
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 "password123" is not a password. It is a confession.
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key — the velvet rope variant of authentication.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: defaults::sink_url(),
            index: defaults::sink_index(),
            username: None,
            password: None,
            api_key: None,
        }
    }
}

/// 🗄️ Redis, holder of watermarks.
#[derive(Debug, Deserialize, Clone)]
pub struct CursorStoreConfig {
    #[serde(default = "defaults::cursor_store_url")]
    pub url: String,
}

impl Default for CursorStoreConfig {
    fn default() -> Self {
        Self { url: defaults::cursor_store_url() }
    }
}

/// 🔧 Pipeline tuning. The defaults are the numbers this pipeline has
/// always run on: assemble in tens, page change sets in hundreds, sleep ten seconds
/// between passes, back off exponentially forever (but never longer than a
/// minute at a time).
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 📦 Films per assembly query and per bulk request. Policy, not law —
    /// but batching itself is mandatory: it bounds both query and payload.
    #[serde(default = "defaults::assembly_batch_size")]
    pub assembly_batch_size: usize,
    /// 🔄 Change-set rows drained per logged page while streaming.
    #[serde(default = "defaults::changeset_page_size")]
    pub changeset_page_size: usize,
    /// ⏰ Sleep between successful passes, in seconds.
    #[serde(default = "defaults::sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// 🔄 First backoff delay, in milliseconds.
    #[serde(default = "defaults::backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    /// 🔄 Backoff ceiling, in seconds. Growth stops here.
    #[serde(default = "defaults::backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// 🔄 Backoff growth factor per attempt.
    #[serde(default = "defaults::backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// 🔄 Give up after this many attempts. Absent = retry forever, which is
    /// both the default and a lifestyle.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            assembly_batch_size: defaults::assembly_batch_size(),
            changeset_page_size: defaults::changeset_page_size(),
            sync_interval_secs: defaults::sync_interval_secs(),
            backoff_initial_ms: defaults::backoff_initial_ms(),
            backoff_max_secs: defaults::backoff_max_secs(),
            backoff_multiplier: defaults::backoff_multiplier(),
            max_attempts: None,
        }
    }
}

mod defaults {
    pub(super) fn catalog_host() -> String {
        "127.0.0.1".to_string()
    }
    pub(super) fn catalog_port() -> u16 {
        5432
    }
    pub(super) fn catalog_user() -> String {
        "postgres".to_string()
    }
    pub(super) fn catalog_dbname() -> String {
        "movies_database".to_string()
    }
    pub(super) fn sink_url() -> String {
        "http://localhost:9200".to_string()
    }
    pub(super) fn sink_index() -> String {
        "movies".to_string()
    }
    pub(super) fn cursor_store_url() -> String {
        "redis://127.0.0.1:6379".to_string()
    }
    pub(super) fn assembly_batch_size() -> usize {
        10
    }
    pub(super) fn changeset_page_size() -> usize {
        100
    }
    pub(super) fn sync_interval_secs() -> u64 {
        10
    }
    pub(super) fn backoff_initial_ms() -> u64 {
        500
    }
    pub(super) fn backoff_max_secs() -> u64 {
        60
    }
    pub(super) fn backoff_multiplier() -> f64 {
        2.0
    }
}

/// 🚀 Load the config — from env vars, from a TOML file, or from the sheer
/// power of defaults.
///
/// 📐 DESIGN NOTE (tribal knowledge, now written down):
///   - `config_file_name` is None  → env vars + defaults. No file. No assumptions.
///   - `config_file_name` is Some  → env vars + TOML, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable. Check the message though —
/// it's contextual, informative, and written with love. Or despair. Hard to
/// tell at 3am.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ Env vars as the base layer — like a good sourdough starter.
    // ALL CVX_* vars accepted, nested sections split on "__".
    let config = Figment::new().merge(Env::prefixed("CVX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CVX_*). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CVX_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // 🧪 A real file, because Figment wants TOML from disk, like it's method
    // acting. The handle keeps the file alive; dropping it is the cleanup.
    fn write_test_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".toml")
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config. Even /tmp has standards now.");
        file
    }

    #[test]
    fn the_one_where_every_section_parses_from_toml() {
        let config_path = write_test_config(
            r#"
            [catalog]
            host = "db.internal"
            port = 5433
            user = "app"
            password = "hunter2"
            dbname = "movies"

            [sink]
            url = "http://es.internal:9200"
            index = "films-v2"

            [cursor_store]
            url = "redis://cache.internal:6379"

            [runtime]
            assembly_batch_size = 25
            sync_interval_secs = 30
            max_attempts = 5
            "#,
        );

        let config = load_config(Some(config_path.path()))
            .expect("💀 A fully specified config should parse. The schema drift goblin loses today.");

        assert_eq!(config.catalog.host, "db.internal");
        assert_eq!(config.catalog.port, 5433);
        assert_eq!(config.sink.index, "films-v2");
        assert_eq!(config.cursor_store.url, "redis://cache.internal:6379");
        assert_eq!(config.runtime.assembly_batch_size, 25);
        assert_eq!(config.runtime.max_attempts, Some(5));
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let config_path = write_test_config("");

        let config: AppConfig = Figment::new()
            .merge(Toml::file(config_path.path()))
            .extract()
            .expect("💀 An empty config should mean all-defaults. Serde left us on read otherwise.");

        // The house numbers: tens for assembly, hundreds for paging,
        // ten seconds between passes, retry forever.
        assert_eq!(config.runtime.assembly_batch_size, 10);
        assert_eq!(config.runtime.changeset_page_size, 100);
        assert_eq!(config.runtime.sync_interval_secs, 10);
        assert_eq!(config.runtime.max_attempts, None);
        assert_eq!(config.catalog.port, 5432);
        assert_eq!(config.sink.index, "movies");
    }

    #[test]
    fn the_one_where_auth_stays_optional_because_dev_clusters_are_trusting() {
        let config_path = write_test_config(
            r#"
            [sink]
            url = "http://localhost:9200"
            "#,
        );

        let config = load_config(Some(config_path.path())).unwrap();
        assert!(config.sink.username.is_none());
        assert!(config.sink.api_key.is_none());
    }
}
