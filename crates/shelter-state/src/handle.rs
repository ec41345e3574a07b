//! Connection management for the shelter database.
//!
//! Every constructor selects the namespace and database and applies the
//! schema before handing out a [`SurrealHandle`]. Connection failures are
//! returned as [`StateError::Connection`].

use crate::error::StateError;
use crate::migrations;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

const DEFAULT_NAMESPACE: &str = "shelter";
const DEFAULT_DATABASE: &str = "main";

/// Credentials and target for a remote SurrealDB instance.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint, e.g. `wss://shelter.example.cloud`
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    /// Sign in as root rather than as a database user.
    pub is_root: bool,
}

impl CloudConfig {
    /// Database-user credentials against the default namespace and database.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Read `SURREALDB_ENDPOINT`, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD`
    /// (required) plus the optional `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE`
    /// and `SURREALDB_ROOT`.
    pub fn from_env() -> std::result::Result<Self, String> {
        let required = |key: &str| std::env::var(key).map_err(|_| format!("{key} not set"));

        let mut config = Self::new(
            required("SURREALDB_ENDPOINT")?,
            required("SURREALDB_USERNAME")?,
            required("SURREALDB_PASSWORD")?,
        );
        if let Ok(namespace) = std::env::var("SURREALDB_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Ok(database) = std::env::var("SURREALDB_DATABASE") {
            config.database = database;
        }
        config.is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(config)
    }
}

/// SurrealDB connection handle for the shelter store
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

impl SurrealHandle {
    /// In-memory database with the schema applied.
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        Self::setup_url("mem://").await
    }

    /// Connect to any SurrealDB URL (`mem://`, `surrealkv://path`, `ws://host`).
    #[instrument]
    pub async fn setup_url(url: &str) -> Result<Self> {
        let db = connect(url).await?;
        Self::prepare(db, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Connect and sign in to a remote instance.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        let db = connect(&config.endpoint).await?;

        let signed_in = if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map(|_| ())
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map(|_| ())
        };
        signed_in.map_err(|e| {
            StateError::Connection(format!(
                "sign-in as {} (root={}) failed: {e}",
                config.username, config.is_root
            ))
        })?;

        Self::prepare(db, &config.namespace, &config.database).await
    }

    /// Pick a backend from the environment: cloud credentials first, then
    /// `SURREALDB_URL`, then in-memory.
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        match CloudConfig::from_env() {
            Ok(config) => Self::setup_cloud(config).await,
            Err(reason) => match std::env::var("SURREALDB_URL") {
                Ok(url) => Self::setup_url(&url).await,
                Err(_) => {
                    info!(%reason, "no remote database configured, using in-memory store");
                    Self::setup_db().await
                }
            },
        }
    }

    /// The underlying client
    pub fn db(&self) -> &Surreal<Any> {
        &self.db
    }

    async fn prepare(db: Surreal<Any>, namespace: &str, database: &str) -> Result<Self> {
        db.use_ns(namespace).use_db(database).await.map_err(|e| {
            StateError::Connection(format!("selecting {namespace}/{database} failed: {e}"))
        })?;
        migrations::init_schema(&db).await?;
        info!(namespace, database, "shelter schema ready");
        Ok(SurrealHandle { db })
    }
}

async fn connect(url: &str) -> Result<Surreal<Any>> {
    surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("connecting to {url} failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_config_targets_default_database() {
        let config = CloudConfig::new("wss://shelter.example", "intake", "secret");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert!(!config.is_root);
    }
}
