//! SurrealDB schema migrations and initialization
//!
//! Sets up the shelter tables with their indexes. Every statement is a
//! `DEFINE ... IF NOT EXISTS`-style definition, so running it on each
//! connection is idempotent.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all shelter tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing shelter SurrealDB schema");

    init_sensor_readings_table(db).await?;
    init_tasks_table(db).await?;
    init_volunteers_table(db).await?;

    info!("Shelter schema initialization complete");
    Ok(())
}

async fn run(db: &Surreal<Any>, sql: &'static str) -> Result<()> {
    db.query(sql)
        .await
        .and_then(|res| res.check())
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}

/// Initialize `sensor_readings` table
///
/// Schema:
/// ```text
/// TABLE sensor_readings {
///   reading_id:  STRING (unique)
///   subject_id:  INT
///   metric:      STRING (Temperature | Humidity)
///   value:       FLOAT
///   timestamp:   DATETIME
/// }
/// ```
///
/// Readings are append-only: updates and deletes are not permitted.
async fn init_sensor_readings_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing sensor_readings table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS sensor_readings AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_reading_id ON TABLE sensor_readings COLUMNS reading_id UNIQUE;

        -- Window selection: newest readings for one (subject, metric)
        DEFINE INDEX IF NOT EXISTS idx_subject_metric_ts ON TABLE sensor_readings COLUMNS subject_id, metric, timestamp;

        DEFINE INDEX IF NOT EXISTS idx_subject_ts ON TABLE sensor_readings COLUMNS subject_id, timestamp;
    "#;

    run(db, sql).await?;
    info!("✓ sensor_readings table initialized");
    Ok(())
}

/// Initialize `tasks` table
///
/// Schema:
/// ```text
/// TABLE tasks {
///   task_id:      STRING (unique)
///   volunteer_id: INT (indexed)
///   title:        STRING
///   status:       STRING (pending | in_progress | completed)
///   due_date:     STRING? (YYYY-MM-DD)
///   created_at:   DATETIME
///   updated_at:   DATETIME
/// }
/// ```
async fn init_tasks_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing tasks table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS tasks AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_task_id ON TABLE tasks COLUMNS task_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_volunteer_id ON TABLE tasks COLUMNS volunteer_id;
        DEFINE INDEX IF NOT EXISTS idx_volunteer_status ON TABLE tasks COLUMNS volunteer_id, status;
    "#;

    run(db, sql).await?;
    info!("✓ tasks table initialized");
    Ok(())
}

/// Initialize `volunteers` table
async fn init_volunteers_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing volunteers table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS volunteers AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_volunteer_id ON TABLE volunteers COLUMNS volunteer_id UNIQUE;
    "#;

    run(db, sql).await?;
    info!("✓ volunteers table initialized");
    Ok(())
}
