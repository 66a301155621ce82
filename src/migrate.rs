//! Schema setup for the SQLite store.
//!
//! Every statement is `IF NOT EXISTS`, so running it again is a no-op.

use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        bucket TEXT NOT NULL,
        object_key TEXT NOT NULL,
        UNIQUE(bucket, object_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        page_number INTEGER NOT NULL,
        position INTEGER NOT NULL,
        FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lines (
        id TEXT PRIMARY KEY,
        page_id TEXT NOT NULL,
        text TEXT NOT NULL,
        position INTEGER NOT NULL,
        FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS coordinates (
        id TEXT PRIMARY KEY,
        line_id TEXT NOT NULL UNIQUE,
        top_left_x REAL NOT NULL,
        top_left_y REAL NOT NULL,
        top_right_x REAL NOT NULL,
        top_right_y REAL NOT NULL,
        bottom_left_x REAL NOT NULL,
        bottom_left_y REAL NOT NULL,
        bottom_right_x REAL NOT NULL,
        bottom_right_y REAL NOT NULL,
        FOREIGN KEY (line_id) REFERENCES lines(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pages_document_id ON pages(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_lines_page_id ON lines(page_id)",
    "CREATE INDEX IF NOT EXISTS idx_lines_text ON lines(text)",
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// `pagegrep init`: create the database file and schema.
pub async fn run_init(config: &crate::config::Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}
