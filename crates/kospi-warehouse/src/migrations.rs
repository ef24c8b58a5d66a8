use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "0001_top10_cache",
    sql: r#"
CREATE TABLE IF NOT EXISTS kospi_top10_cache (
    id TEXT PRIMARY KEY,
    "rank" BIGINT NOT NULL,
    seq BIGINT NOT NULL,
    stock_code TEXT NOT NULL,
    company_name TEXT NOT NULL,
    price BIGINT NOT NULL,
    change BIGINT NOT NULL,
    change_pct DOUBLE NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_kospi_top10_cache_rank ON kospi_top10_cache("rank", seq);
"#,
}];

/// Applies pending schema migrations, tracked in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
