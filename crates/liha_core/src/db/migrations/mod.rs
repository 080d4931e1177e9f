//! SQLite migration registry, executor and schema checks.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations in one transaction.
//! - Verify that a borrowed connection carries the tables repositories need.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Table DDL lives only in the `.sql` files registered here.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "init",
    sql: include_str!("0001_init.sql"),
}];

/// Columns every repository relies on, grouped by table.
pub const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "object_type",
        &[
            "id",
            "name",
            "description",
            "color",
            "icon",
            "fixed",
            "base_object_type",
        ],
    ),
    (
        "property_type",
        &[
            "id",
            "type",
            "name",
            "ai_automated",
            "visibility",
            "icon",
            "default_value",
            "is_object_reference",
            "object_type_id",
        ],
    ),
    (
        "object",
        &[
            "id",
            "name",
            "description",
            "object_type_id",
            "page_customization",
            "contents",
            "pinned",
            "version",
            "last_modified",
        ],
    ),
    (
        "property",
        &[
            "id",
            "object_id",
            "property_type_id",
            "value",
            "value_number",
            "value_boolean",
            "value_date",
            "referenced_object_id",
        ],
    ),
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations and returns the versions applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    for migration in &pending {
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }

    Ok(pending.iter().map(|migration| migration.version).collect())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Checks that `conn` is fully migrated and exposes `REQUIRED_SCHEMA`.
///
/// Repositories call this on construction so a raw, unmigrated connection is
/// rejected up front instead of failing halfway through a transaction.
pub fn verify_schema(conn: &Connection) -> DbResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_SCHEMA {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(DbError::MissingRequiredTable(table));
        }
        if let Some(&column) = columns
            .iter()
            .find(|&&column| !present.iter().any(|current| current == column))
        {
            return Err(DbError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
